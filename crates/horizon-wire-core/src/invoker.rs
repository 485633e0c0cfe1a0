//! Bound invocation of resolved methods.
//!
//! A [`BoundInvoker`] is what gets registered with an event source: it holds
//! a resolved method, a weak reference to its target, and an optional fixed
//! argument, and exposes a single `invoke()` that never unwinds into the
//! caller. An [`EventInvoker`] is the same adapter for handlers whose first
//! argument arrives with the event (a slider position, a checkbox state),
//! optionally followed by a fixed argument chosen at binding time.
//!
//! Both are built through [`Dispatcher::bind`](crate::Dispatcher::bind) and
//! [`Dispatcher::bind_event`](crate::Dispatcher::bind_event), which resolve
//! and coerce up front so a misconfigured binding fails at construction.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use thiserror::Error;

use crate::coerce::Coercer;
use crate::error::WireError;
use crate::logging::{span_names, targets};
use crate::meta::{MethodMeta, MethodSignature, TargetError};
use crate::object::Object;
use crate::report::ReportSink;
use crate::value::{Value, ValueKind};

/// Failure of a single invocation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvokeError {
    /// The target was dropped after the binding was made.
    #[error("target of {type_name}::{method} no longer exists")]
    TargetDropped {
        type_name: &'static str,
        method: &'static str,
    },
    /// The target is locked, usually by a call already in progress on it.
    #[error("target of {type_name}::{method} is busy")]
    TargetBusy {
        type_name: &'static str,
        method: &'static str,
    },
    /// The method was called and failed.
    #[error("{type_name}::{method} failed: {source}")]
    Failed {
        type_name: &'static str,
        method: &'static str,
        source: TargetError,
    },
    /// The method panicked.
    #[error("{type_name}::{method} panicked: {message}")]
    Panicked {
        type_name: &'static str,
        method: &'static str,
        message: String,
    },
}

/// Call `method` on `target`, converting failures and panics into errors.
pub(crate) fn invoke_guarded(
    method: &MethodMeta,
    target: &mut dyn Object,
    args: Vec<Value>,
) -> Result<Option<Value>, InvokeError> {
    let span = tracing::trace_span!(
        target: targets::INVOKE,
        span_names::INVOKE,
        type_name = method.declaring_type,
        method = method.name
    );
    let _entered = span.enter();

    match panic::catch_unwind(AssertUnwindSafe(|| method.invoke(target, args))) {
        Ok(Ok(returned)) => Ok(returned),
        Ok(Err(source)) => Err(InvokeError::Failed {
            type_name: method.declaring_type,
            method: method.name,
            source,
        }),
        Err(payload) => Err(InvokeError::Panicked {
            type_name: method.declaring_type,
            method: method.name,
            message: panic_message(payload.as_ref()),
        }),
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_owned()
    }
}

/// A resolved method plus a non-owning reference to its target.
#[derive(Clone)]
struct BoundTarget {
    object: Weak<Mutex<dyn Object>>,
    method: &'static MethodMeta,
}

impl BoundTarget {
    fn call(&self, args: Vec<Value>) -> Result<Option<Value>, InvokeError> {
        let object = self.object.upgrade().ok_or(InvokeError::TargetDropped {
            type_name: self.method.declaring_type,
            method: self.method.name,
        })?;
        let mut guard = object.try_lock().ok_or(InvokeError::TargetBusy {
            type_name: self.method.declaring_type,
            method: self.method.name,
        })?;
        invoke_guarded(self.method, &mut *guard, args)
    }

    fn is_alive(&self) -> bool {
        self.object.strong_count() > 0
    }
}

/// An event handler calling one method with a fixed argument list.
#[derive(Clone)]
pub struct BoundInvoker {
    target: BoundTarget,
    argument: Option<Value>,
    sink: Arc<dyn ReportSink>,
}

impl BoundInvoker {
    /// `argument` must already be of the method's declared parameter kind.
    pub(crate) fn new(
        object: Weak<Mutex<dyn Object>>,
        method: &'static MethodMeta,
        argument: Option<Value>,
        sink: Arc<dyn ReportSink>,
    ) -> Self {
        Self {
            target: BoundTarget { object, method },
            argument,
            sink,
        }
    }

    /// Call the bound method once.
    ///
    /// Failures are reported to the sink and returned; a panicking method is
    /// caught here.
    pub fn invoke(&self) -> Result<Option<Value>, InvokeError> {
        let args = self.argument.iter().cloned().collect();
        self.target.call(args).inspect_err(|err| {
            self.sink.report(
                &format!("invoking {}", self.signature()),
                Some(&WireError::Invoke(err.clone())),
            );
        })
    }

    /// The bound method's signature.
    pub fn signature(&self) -> MethodSignature {
        self.target.method.signature()
    }

    /// The fixed argument, already converted to the declared kind.
    pub fn argument(&self) -> Option<&Value> {
        self.argument.as_ref()
    }

    /// Whether the target still exists.
    pub fn is_alive(&self) -> bool {
        self.target.is_alive()
    }
}

impl fmt::Debug for BoundInvoker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundInvoker")
            .field("method", &self.signature())
            .field("argument", &self.argument)
            .field("alive", &self.is_alive())
            .finish()
    }
}

/// An event handler whose first argument is supplied by the event.
#[derive(Clone)]
pub struct EventInvoker {
    target: BoundTarget,
    param: ValueKind,
    trailing: Option<Value>,
    coercer: Arc<Coercer>,
    sink: Arc<dyn ReportSink>,
}

impl EventInvoker {
    /// `param` is the method's first parameter kind. `trailing`, when given,
    /// fills the second parameter and is already of its declared kind.
    pub(crate) fn new(
        object: Weak<Mutex<dyn Object>>,
        method: &'static MethodMeta,
        param: ValueKind,
        trailing: Option<Value>,
        coercer: Arc<Coercer>,
        sink: Arc<dyn ReportSink>,
    ) -> Self {
        Self {
            target: BoundTarget { object, method },
            param,
            trailing,
            coercer,
            sink,
        }
    }

    /// The declared kind the event value is converted to.
    pub fn param(&self) -> &ValueKind {
        &self.param
    }

    /// The fixed argument passed after the event value.
    pub fn argument(&self) -> Option<&Value> {
        self.trailing.as_ref()
    }

    /// Convert `value` to the declared parameter kind and call the method.
    pub fn invoke_with(&self, value: impl Into<Value>) -> Result<Option<Value>, WireError> {
        let outcome = self
            .coercer
            .coerce(value.into(), &self.param)
            .map_err(WireError::from)
            .and_then(|event| {
                let args = std::iter::once(event)
                    .chain(self.trailing.iter().cloned())
                    .collect();
                self.target.call(args).map_err(WireError::from)
            });
        outcome.inspect_err(|err| {
            self.sink
                .report(&format!("invoking {} from event", self.signature()), Some(err));
        })
    }

    pub fn signature(&self) -> MethodSignature {
        self.target.method.signature()
    }

    pub fn is_alive(&self) -> bool {
        self.target.is_alive()
    }
}

impl fmt::Debug for EventInvoker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventInvoker")
            .field("method", &self.signature())
            .field("argument", &self.trailing)
            .field("alive", &self.is_alive())
            .finish()
    }
}

static_assertions::assert_impl_all!(BoundInvoker: Send, Sync, Clone);
static_assertions::assert_impl_all!(EventInvoker: Send, Sync, Clone);
