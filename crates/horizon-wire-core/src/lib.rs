//! Name-based method binding and value coercion for Horizon.
//!
//! This crate connects UI events to methods that are named in configuration
//! rather than in code:
//!
//! - **Method Resolution**: Find a method by name and parameter kinds in a
//!   type's [`MetaObject`], with results cached per type in a [`MethodCache`]
//! - **Value Coercion**: Convert textual and loosely typed [`Value`]s to a
//!   parameter's declared [`ValueKind`] with a [`Coercer`]
//! - **Bound Invocation**: Capture a target, method and argument once in a
//!   [`BoundInvoker`] and call it on every event
//! - **Property Setting**: Set `name` through `set_name` with coercion from
//!   text, one property at a time or from a [`PropertySheet`]
//! - **Commands**: A typed [`CommandRegistry`] for symbolic command ids
//!
//! Failures are returned as [`WireError`] and also handed to a
//! [`ReportSink`], which logs them through `tracing` by default.
//!
//! # Example
//!
//! ```
//! use horizon_wire_core::{Dispatcher, MetaObject, Object, Signal, shared};
//! use std::sync::LazyLock;
//!
//! #[derive(Default)]
//! struct Slider {
//!     value: i32,
//! }
//!
//! impl Object for Slider {
//!     fn meta_object(&self) -> &'static MetaObject {
//!         Self::static_meta_object()
//!     }
//!
//!     fn static_meta_object() -> &'static MetaObject {
//!         static META: LazyLock<MetaObject> = LazyLock::new(|| {
//!             MetaObject::builder::<Slider>("Slider")
//!                 .slot1("set_value", |s: &mut Slider, v: i32| s.value = v)
//!                 .slot0("reset", |s: &mut Slider| s.value = 0)
//!                 .build()
//!         });
//!         &META
//!     }
//! }
//!
//! let dispatcher = Dispatcher::new();
//! let slider = shared(Slider::default());
//!
//! // Text from a property sheet is coerced to the setter's parameter kind.
//! assert!(dispatcher.set_property(&mut *slider.lock(), "value", "42", false));
//! assert_eq!(slider.lock().value, 42);
//!
//! // A button press calls a method bound by name.
//! let clicked = Signal::<()>::new();
//! clicked.connect_invoker(dispatcher.bind(&slider, "reset", None).unwrap());
//! clicked.emit(());
//! assert_eq!(slider.lock().value, 0);
//! ```

pub mod cache;
pub mod coerce;
pub mod command;
pub mod config;
pub mod dispatcher;
mod error;
pub mod geometry;
pub mod invoker;
pub mod logging;
pub mod meta;
pub mod object;
pub mod property;
pub mod report;
pub mod signal;
pub mod value;

pub use cache::{CacheStats, MethodCache};
pub use coerce::{decode_color, decode_int, Coercer, CoercionConfig, CoercionError, NumberFormat};
pub use command::{CommandError, CommandRegistry};
pub use config::{ConfigError, ReportingConfig, WireConfig};
pub use dispatcher::Dispatcher;
pub use error::{ErrorKind, Result, WireError};
pub use geometry::{Color, Point, Range, Rect, Size};
pub use invoker::{BoundInvoker, EventInvoker, InvokeError};
pub use meta::{
    MetaObject, MetaObjectBuilder, MethodFn, MethodMeta, MethodSignature, ParamQuery,
    ResolveError, TargetError,
};
pub use object::{object_cast, object_cast_mut, shared, Object, Shared};
pub use property::{
    getter_names, setter_name, to_snake_case, PropertySheet, SheetFailure, SheetReport,
};
pub use report::{CollectingSink, ReportLevel, ReportSink, Reported, SilentSink, TracingSink};
pub use signal::{ConnectionGuard, ConnectionId, Signal};
pub use value::{
    Domain, FromValue, IntoSlotReturn, Opaque, OpaqueKind, OpaqueValue, ParseFn, Value, ValueKind,
};
