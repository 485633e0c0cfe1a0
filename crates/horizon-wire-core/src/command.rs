//! Registry of named commands backed by typed closures.
//!
//! Where name-based binding looks a method up on a target at bind time, a
//! [`CommandRegistry`] maps symbolic command ids to handlers registered at
//! startup. Handler signatures are checked by the compiler, duplicate ids
//! are rejected at registration, and an unknown id is a single lookup miss.
//!
//! ```
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicI32, Ordering};
//! use horizon_wire_core::{CommandRegistry, Value};
//!
//! let zoom = Arc::new(AtomicI32::new(100));
//! let mut commands = CommandRegistry::new();
//! let z = Arc::clone(&zoom);
//! commands
//!     .register1("view.zoom", move |percent: i32| z.store(percent, Ordering::SeqCst))
//!     .unwrap();
//!
//! commands.execute("view.zoom", Some(Value::from("150"))).unwrap();
//! assert_eq!(zoom.load(Ordering::SeqCst), 150);
//! ```

use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use thiserror::Error;

use crate::coerce::Coercer;
use crate::error::WireError;
use crate::invoker::panic_message;
use crate::logging::targets;
use crate::meta::TargetError;
use crate::report::{ReportSink, TracingSink};
use crate::value::{FromValue, IntoSlotReturn, Value, ValueKind};

/// Failure to register or execute a command.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CommandError {
    #[error("unknown command '{0}'")]
    Unknown(String),
    #[error("command '{0}' is already registered")]
    Duplicate(String),
    #[error("command '{id}' needs a {expected} argument")]
    MissingArgument { id: String, expected: &'static str },
    #[error("command '{0}' takes no argument")]
    UnexpectedArgument(String),
    #[error("command '{id}' failed: {source}")]
    Failed { id: String, source: TargetError },
    #[error("command '{id}' panicked: {message}")]
    Panicked { id: String, message: String },
}

type Handler = Box<dyn Fn(Option<Value>) -> Result<Option<Value>, TargetError> + Send + Sync>;

struct Command {
    param: Option<ValueKind>,
    handler: Handler,
}

/// Command id to handler mapping.
pub struct CommandRegistry {
    commands: HashMap<String, Command>,
    coercer: Arc<Coercer>,
    sink: Arc<dyn ReportSink>,
}

impl CommandRegistry {
    /// An empty registry with default coercion that reports through `tracing`.
    pub fn new() -> Self {
        Self::with_parts(Arc::new(Coercer::default()), Arc::new(TracingSink::default()))
    }

    /// An empty registry sharing a coercer and sink, e.g. with a
    /// [`Dispatcher`](crate::Dispatcher).
    pub fn with_parts(coercer: Arc<Coercer>, sink: Arc<dyn ReportSink>) -> Self {
        Self {
            commands: HashMap::new(),
            coercer,
            sink,
        }
    }

    /// Register a command without an argument.
    pub fn register0<R, F>(&mut self, id: impl Into<String>, handler: F) -> Result<(), CommandError>
    where
        R: IntoSlotReturn,
        F: Fn() -> R + Send + Sync + 'static,
    {
        self.insert(id.into(), None, Box::new(move |_: Option<Value>| handler().into_slot_return()))
    }

    /// Register a command taking one argument of type `A`.
    pub fn register1<A, R, F>(&mut self, id: impl Into<String>, handler: F) -> Result<(), CommandError>
    where
        A: FromValue,
        R: IntoSlotReturn,
        F: Fn(A) -> R + Send + Sync + 'static,
    {
        let handler: Handler = Box::new(move |arg: Option<Value>| -> Result<Option<Value>, TargetError> {
            let arg = arg.ok_or(TargetError::ArgumentCount {
                expected: 1,
                found: 0,
            })?;
            handler(A::from_value(arg)?).into_slot_return()
        });
        self.insert(id.into(), Some(A::kind()), handler)
    }

    fn insert(
        &mut self,
        id: String,
        param: Option<ValueKind>,
        handler: Handler,
    ) -> Result<(), CommandError> {
        if self.commands.contains_key(&id) {
            return Err(CommandError::Duplicate(id));
        }
        tracing::trace!(target: targets::COMMAND, id = %id, "command registered");
        self.commands.insert(id, Command { param, handler });
        Ok(())
    }

    /// Remove a command. Returns whether it was registered.
    pub fn unregister(&mut self, id: &str) -> bool {
        self.commands.remove(id).is_some()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.commands.contains_key(id)
    }

    /// The argument kind of a command: `Some(None)` for a command without one.
    pub fn param(&self, id: &str) -> Option<Option<&ValueKind>> {
        self.commands.get(id).map(|command| command.param.as_ref())
    }

    /// Registered command ids, sorted.
    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.commands.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Run a command, converting `argument` to its declared kind.
    ///
    /// Failures are reported and returned.
    pub fn execute(&self, id: &str, argument: Option<Value>) -> Result<Option<Value>, WireError> {
        self.try_execute(id, argument).inspect_err(|err| {
            self.sink
                .report(&format!("executing command '{id}'"), Some(err));
        })
    }

    fn try_execute(&self, id: &str, argument: Option<Value>) -> Result<Option<Value>, WireError> {
        let command = self
            .commands
            .get(id)
            .ok_or_else(|| CommandError::Unknown(id.to_owned()))?;

        let argument = match (&command.param, argument) {
            (Some(kind), Some(value)) => Some(self.coercer.coerce(value, kind)?),
            (Some(kind), None) => {
                return Err(CommandError::MissingArgument {
                    id: id.to_owned(),
                    expected: kind.name(),
                }
                .into());
            }
            (None, Some(_)) => return Err(CommandError::UnexpectedArgument(id.to_owned()).into()),
            (None, None) => None,
        };

        match panic::catch_unwind(AssertUnwindSafe(|| (command.handler)(argument))) {
            Ok(Ok(returned)) => Ok(returned),
            Ok(Err(source)) => Err(CommandError::Failed {
                id: id.to_owned(),
                source,
            }
            .into()),
            Err(payload) => Err(CommandError::Panicked {
                id: id.to_owned(),
                message: panic_message(payload.as_ref()),
            }
            .into()),
        }
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CommandRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandRegistry")
            .field("commands", &self.ids())
            .finish_non_exhaustive()
    }
}

static_assertions::assert_impl_all!(CommandRegistry: Send, Sync);

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use parking_lot::Mutex;

    use super::*;
    use crate::error::ErrorKind;
    use crate::geometry::Color;
    use crate::report::CollectingSink;

    fn registry() -> (CommandRegistry, Arc<CollectingSink>) {
        let sink = Arc::new(CollectingSink::new());
        let registry = CommandRegistry::with_parts(Arc::new(Coercer::default()), sink.clone());
        (registry, sink)
    }

    #[test]
    fn test_register_and_execute() {
        let (mut commands, sink) = registry();
        let hits = Arc::new(AtomicUsize::new(0));
        let color = Arc::new(Mutex::new(Color::BLACK));

        let h = Arc::clone(&hits);
        commands
            .register0("file.refresh", move || {
                h.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        let c = Arc::clone(&color);
        commands
            .register1("view.background", move |value: Color| *c.lock() = value)
            .unwrap();

        commands.execute("file.refresh", None).unwrap();
        commands
            .execute("view.background", Some(Value::from("magenta")))
            .unwrap();

        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(*color.lock(), Color::MAGENTA);
        assert_eq!(commands.ids(), ["file.refresh", "view.background"]);
        assert_eq!(commands.param("file.refresh"), Some(None));
        assert_eq!(commands.param("view.background"), Some(Some(&ValueKind::Color)));
        assert!(sink.is_empty());
    }

    #[test]
    fn test_duplicate_registration_is_rejected() {
        let (mut commands, _sink) = registry();
        commands.register0("quit", || {}).unwrap();
        assert_eq!(
            commands.register0("quit", || {}),
            Err(CommandError::Duplicate("quit".into()))
        );
        assert!(commands.unregister("quit"));
        assert!(commands.register0("quit", || {}).is_ok());
    }

    #[test]
    fn test_execution_failures_are_reported() {
        let (mut commands, sink) = registry();
        commands.register1("zoom", |_: i32| {}).unwrap();
        commands.register0("noop", || {}).unwrap();
        commands
            .register0("save", || -> Result<(), String> { Err("read-only".into()) })
            .unwrap();

        assert!(commands.execute("missing", None).is_err());
        assert!(commands.execute("zoom", None).is_err());
        assert!(commands.execute("noop", Some(Value::Int(1))).is_err());
        let err = commands.execute("zoom", Some(Value::from("big"))).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Coercion);
        let err = commands.execute("save", None).unwrap_err();
        assert_eq!(err.to_string(), "command 'save' failed: read-only");

        let kinds: Vec<_> = sink.entries().into_iter().map(|r| r.kind).collect();
        assert_eq!(
            kinds,
            [
                Some(ErrorKind::Command),
                Some(ErrorKind::Command),
                Some(ErrorKind::Command),
                Some(ErrorKind::Coercion),
                Some(ErrorKind::Command),
            ]
        );
    }

    #[test]
    fn test_panicking_handler_is_contained() {
        let (mut commands, _sink) = registry();
        commands
            .register0("crash", || -> () { panic!("handler crashed") })
            .unwrap();
        let err = commands.execute("crash", None).unwrap_err();
        assert!(err.to_string().contains("handler crashed"));
        assert!(commands.contains("crash"));
    }

    #[test]
    fn test_return_values() {
        let (mut commands, _sink) = registry();
        commands.register1("double", |v: f64| v * 2.0).unwrap();
        assert_eq!(
            commands.execute("double", Some(Value::Int(4))).unwrap(),
            Some(Value::Double(8.0))
        );
    }
}
