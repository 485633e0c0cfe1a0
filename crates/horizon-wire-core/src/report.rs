//! Failure reporting side channel.
//!
//! Bindings are invoked from an event loop that must not be interrupted by a
//! faulty handler, so every resolution, coercion and invocation failure is
//! delivered to a [`ReportSink`] in addition to being returned.

use parking_lot::Mutex;
use serde::Deserialize;

use crate::error::{ErrorKind, WireError};
use crate::logging::targets;

/// Receiver of failure reports.
pub trait ReportSink: Send + Sync {
    /// Deliver a failure with its context message.
    fn report(&self, message: &str, error: Option<&WireError>);
}

/// Severity at which [`TracingSink`] logs reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportLevel {
    #[default]
    Error,
    Warn,
    Info,
    Debug,
    /// Drop reports.
    Off,
}

/// A sink that logs reports through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink {
    level: ReportLevel,
}

impl TracingSink {
    /// Create a sink logging at `level`.
    pub fn new(level: ReportLevel) -> Self {
        Self { level }
    }

    /// The level reports are logged at.
    pub fn level(&self) -> ReportLevel {
        self.level
    }
}

impl ReportSink for TracingSink {
    fn report(&self, message: &str, error: Option<&WireError>) {
        let kind = error.map(WireError::kind);
        let detail = error.map(ToString::to_string);
        match self.level {
            ReportLevel::Error => {
                tracing::error!(target: targets::REPORT, ?kind, error = detail.as_deref(), "{message}")
            }
            ReportLevel::Warn => {
                tracing::warn!(target: targets::REPORT, ?kind, error = detail.as_deref(), "{message}")
            }
            ReportLevel::Info => {
                tracing::info!(target: targets::REPORT, ?kind, error = detail.as_deref(), "{message}")
            }
            ReportLevel::Debug => {
                tracing::debug!(target: targets::REPORT, ?kind, error = detail.as_deref(), "{message}")
            }
            ReportLevel::Off => {}
        }
    }
}

/// A captured report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reported {
    pub message: String,
    pub kind: Option<ErrorKind>,
    pub detail: Option<String>,
}

/// A sink that keeps every report in memory.
#[derive(Debug, Default)]
pub struct CollectingSink {
    entries: Mutex<Vec<Reported>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A copy of the reports received so far.
    pub fn entries(&self) -> Vec<Reported> {
        self.entries.lock().clone()
    }

    /// Remove and return the reports received so far.
    pub fn take(&self) -> Vec<Reported> {
        std::mem::take(&mut *self.entries.lock())
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl ReportSink for CollectingSink {
    fn report(&self, message: &str, error: Option<&WireError>) {
        self.entries.lock().push(Reported {
            message: message.to_owned(),
            kind: error.map(WireError::kind),
            detail: error.map(ToString::to_string),
        });
    }
}

/// A sink that discards every report.
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentSink;

impl ReportSink for SilentSink {
    fn report(&self, _message: &str, _error: Option<&WireError>) {}
}

static_assertions::assert_impl_all!(TracingSink: Send, Sync);
static_assertions::assert_impl_all!(CollectingSink: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coerce::CoercionError;

    #[test]
    fn test_collecting_sink_records_kind_and_detail() {
        let sink = CollectingSink::new();
        let err = WireError::from(CoercionError::Unsupported {
            from: "string",
            to: "Menu",
        });
        sink.report("binding 'open'", Some(&err));
        sink.report("plain message", None);

        let entries = sink.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].kind, Some(ErrorKind::Coercion));
        assert_eq!(
            entries[0].detail.as_deref(),
            Some("no conversion from string to Menu")
        );
        assert_eq!(entries[1].kind, None);

        assert_eq!(sink.take().len(), 2);
        assert!(sink.is_empty());
    }

    #[test]
    fn test_tracing_sink_emits_at_configured_level() {
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::TRACE)
            .with_test_writer()
            .finish();
        tracing::subscriber::with_default(subscriber, || {
            for level in [
                ReportLevel::Error,
                ReportLevel::Warn,
                ReportLevel::Info,
                ReportLevel::Debug,
                ReportLevel::Off,
            ] {
                TracingSink::new(level).report("handler failed", None);
            }
        });
        assert_eq!(TracingSink::default().level(), ReportLevel::Error);
    }
}
