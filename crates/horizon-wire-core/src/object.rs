//! The dispatch target trait.
//!
//! Any type with a method table can be the target of a binding. The table is
//! usually generated:
//!
//! ```ignore
//! use horizon_wire_macros::slots;
//!
//! #[derive(Default)]
//! struct Slider {
//!     value: i32,
//! }
//!
//! #[slots]
//! impl Slider {
//!     pub fn set_value(&mut self, value: i32) {
//!         self.value = value;
//!     }
//!
//!     pub fn value(&self) -> i32 {
//!         self.value
//!     }
//! }
//! ```

use std::any::Any;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::meta::MetaObject;

/// A value that can be the target of name-based dispatch.
///
/// # Related
///
/// - [`MetaObject`] - The method table returned by [`meta_object()`](Self::meta_object)
/// - [`object_cast`] - Safe downcasting function
pub trait Object: Any + Send {
    /// The method table of this object's concrete type.
    fn meta_object(&self) -> &'static MetaObject;

    /// The method table of `Self`, available without an instance.
    fn static_meta_object() -> &'static MetaObject
    where
        Self: Sized;
}

/// A dispatch target shared between its owner and the bindings that call it.
///
/// Bindings hold only a weak reference, so dropping the last `Shared` handle
/// ends the target's lifetime.
pub type Shared<T> = Arc<Mutex<T>>;

/// Wrap a value as a [`Shared`] target.
pub fn shared<T: Object>(value: T) -> Shared<T> {
    Arc::new(Mutex::new(value))
}

/// Safe downcast function for [`Object`] trait objects.
///
/// Returns `Some(&T)` if the object is of type `T`, otherwise `None`.
pub fn object_cast<T: Object>(obj: &dyn Object) -> Option<&T> {
    (obj as &dyn Any).downcast_ref::<T>()
}

/// Safe mutable downcast function for [`Object`] trait objects.
pub fn object_cast_mut<T: Object>(obj: &mut dyn Object) -> Option<&mut T> {
    (obj as &mut dyn Any).downcast_mut::<T>()
}
