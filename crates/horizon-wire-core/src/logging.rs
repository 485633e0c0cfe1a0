//! Logging facilities for Horizon Wire.
//!
//! Horizon Wire uses the `tracing` crate for instrumentation. Resolution and
//! coercion decisions are logged at `trace`/`debug`; failures delivered to a
//! [`ReportSink`](crate::ReportSink) are additionally logged by the
//! [`TracingSink`](crate::TracingSink). To see logs, install a subscriber:
//!
//! ```ignore
//! fn main() {
//!     tracing_subscriber::fmt()
//!         .with_env_filter("horizon_wire_core::invoke=debug")
//!         .init();
//! }
//! ```

/// Span names used throughout Horizon Wire for tracing.
pub mod span_names {
    /// A single bound invocation.
    pub const INVOKE: &str = "horizon_wire::invoke";
    /// Application of a property sheet.
    pub const SHEET: &str = "horizon_wire::sheet";
}

/// Target names for log filtering.
///
/// Use these with `tracing` directives to filter logs by subsystem.
pub mod targets {
    /// Core target.
    pub const CORE: &str = "horizon_wire_core";
    /// Method resolution and the resolution cache.
    pub const RESOLVE: &str = "horizon_wire_core::resolve";
    /// Value coercion.
    pub const COERCE: &str = "horizon_wire_core::coerce";
    /// Bound and event invokers.
    pub const INVOKE: &str = "horizon_wire_core::invoke";
    /// Property setters, getters and sheets.
    pub const PROPERTY: &str = "horizon_wire_core::property";
    /// Command registry.
    pub const COMMAND: &str = "horizon_wire_core::command";
    /// Event sources.
    pub const SIGNAL: &str = "horizon_wire_core::signal";
    /// Failures delivered to the tracing report sink.
    pub const REPORT: &str = "horizon_wire_core::report";
}

/// Macros for common tracing patterns.
///
/// These are wrappers around the `tracing` crate macros with consistent
/// target naming.
#[macro_export]
macro_rules! wire_trace {
    ($($arg:tt)*) => {
        ::tracing::trace!(target: "horizon_wire_core", $($arg)*)
    };
}

#[macro_export]
macro_rules! wire_debug {
    ($($arg:tt)*) => {
        ::tracing::debug!(target: "horizon_wire_core", $($arg)*)
    };
}

#[macro_export]
macro_rules! wire_warn {
    ($($arg:tt)*) => {
        ::tracing::warn!(target: "horizon_wire_core", $($arg)*)
    };
}
