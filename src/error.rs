//! Error types for capture, recording and configuration.
//!
//! Only a few conditions are errors at all. Empty reads, short reads and
//! garbage bytes are handled inside the framer and never surface here. What
//! remains falls into:
//!
//! - **Transport faults**: the device disconnected or the port was rejected.
//!   Fatal to the capture task.
//! - **Recording faults**: the log could not be created or written. Recording
//!   stops, capture continues.
//! - **Configuration errors**: inconsistent sizes or unreadable config files.
//!
//! ```rust
//! use eeg_monitor::MonitorError;
//!
//! let error = MonitorError::transport_failed("device unplugged");
//! assert!(error.is_fatal_to_capture());
//! for suggestion in error.recovery_suggestions() {
//!     println!("  - {}", suggestion);
//! }
//! ```

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for monitor operations.
pub type Result<T, E = MonitorError> = std::result::Result<T, E>;

/// Main error type for capture and recording.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum MonitorError {
    #[error("Transport fault: {reason}")]
    Transport {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("File error: {path}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration: {details}")]
    Config { details: String },

    #[error("Recording failed: {reason}")]
    Recording {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Operation timed out after {duration:?}")]
    Timeout { duration: Duration },

    #[error("Capture is not running")]
    Closed,

    #[error("Capture is already running")]
    AlreadyRunning,
}

impl MonitorError {
    /// Returns whether this error ends the capture loop.
    pub fn is_fatal_to_capture(&self) -> bool {
        match self {
            MonitorError::Transport { .. } => true,
            MonitorError::Closed => true,
            MonitorError::AlreadyRunning => false,
            MonitorError::File { .. } => false,
            MonitorError::Config { .. } => false,
            MonitorError::Recording { .. } => false,
            MonitorError::Timeout { .. } => false,
        }
    }

    /// Returns suggested operator actions for this error.
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            MonitorError::Transport { .. } => vec![
                "Check the amplifier cable and power",
                "Reconnect the device and restart capture",
                "Verify the serial port name and baud rate",
            ],
            MonitorError::File { .. } => vec![
                "Check the file exists and is readable",
                "Check directory permissions",
                "Ensure sufficient disk space",
            ],
            MonitorError::Config { .. } => vec![
                "Check the configuration values against the packet size",
                "Remove the offending key to fall back to the default",
            ],
            MonitorError::Recording { .. } => vec![
                "Check the recording destination is writable",
                "Ensure sufficient disk space",
                "Toggle recording to start a fresh log",
            ],
            MonitorError::Timeout { .. } => {
                vec!["Check that the device is streaming", "Increase the timeout"]
            }
            MonitorError::Closed => vec!["Start capture before issuing commands"],
            MonitorError::AlreadyRunning => {
                vec!["Stop the current capture before starting another"]
            }
        }
    }

    /// Helper constructor for file errors with path context.
    pub fn file_error(path: PathBuf, source: std::io::Error) -> Self {
        MonitorError::File { path, source }
    }

    /// Helper constructor for transport faults.
    pub fn transport_failed(reason: impl Into<String>) -> Self {
        MonitorError::Transport { reason: reason.into(), source: None }
    }

    /// Helper constructor for transport faults with source.
    pub fn transport_failed_with_source(
        reason: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        MonitorError::Transport { reason: reason.into(), source: Some(source) }
    }

    /// Helper constructor for configuration errors.
    pub fn config_invalid(details: impl Into<String>) -> Self {
        MonitorError::Config { details: details.into() }
    }

    /// Helper constructor for recording errors.
    pub fn recording_failed(reason: impl Into<String>) -> Self {
        MonitorError::Recording { reason: reason.into(), source: None }
    }

    /// Helper constructor for recording errors with source.
    pub fn recording_failed_with_source(
        reason: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        MonitorError::Recording { reason: reason.into(), source: Some(source) }
    }
}

impl From<csv::Error> for MonitorError {
    fn from(err: csv::Error) -> Self {
        MonitorError::recording_failed_with_source(err.to_string(), Box::new(err))
    }
}

impl From<serde_yaml_ng::Error> for MonitorError {
    fn from(err: serde_yaml_ng::Error) -> Self {
        MonitorError::Config { details: err.to_string() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
          #[test]
          fn error_messages_carry_their_context(
            reason in ".*",
            details in ".*",
            duration_ms in 1u64..60000u64
          ) {
            let transport = MonitorError::transport_failed(reason.clone());
            let recording = MonitorError::recording_failed(reason.clone());
            let config = MonitorError::config_invalid(details.clone());
            let timeout = MonitorError::Timeout { duration: Duration::from_millis(duration_ms) };

            prop_assert!(transport.to_string().contains(&reason));
            prop_assert!(recording.to_string().contains(&reason));
            prop_assert!(config.to_string().contains(&details));
            prop_assert!(!timeout.to_string().is_empty());
          }

          #[test]
          fn source_chain_is_preserved(base_message in ".*") {
            let io = std::io::Error::other(base_message.clone());
            let top = MonitorError::transport_failed_with_source("read failed", Box::new(io));

            let source = std::error::Error::source(&top);
            prop_assert!(source.is_some());
            prop_assert_eq!(source.map(|s| s.to_string()), Some(base_message));
          }
        }
    }

    #[test]
    fn fatality_classification() {
        assert!(MonitorError::transport_failed("gone").is_fatal_to_capture());
        assert!(MonitorError::Closed.is_fatal_to_capture());
        assert!(!MonitorError::recording_failed("disk full").is_fatal_to_capture());
        assert!(!MonitorError::config_invalid("bad").is_fatal_to_capture());
    }

    #[test]
    fn error_traits_validation() {
        fn assert_send_sync_static<T: Send + Sync + 'static>() {}
        assert_send_sync_static::<MonitorError>();

        let error = MonitorError::transport_failed("test");
        let _: &dyn std::error::Error = &error;
    }

    #[test]
    fn every_variant_has_suggestions() {
        let errors = [
            MonitorError::transport_failed("x"),
            MonitorError::file_error(PathBuf::from("/x"), std::io::Error::other("x")),
            MonitorError::config_invalid("x"),
            MonitorError::recording_failed("x"),
            MonitorError::Timeout { duration: Duration::from_secs(1) },
            MonitorError::Closed,
            MonitorError::AlreadyRunning,
        ];
        for error in &errors {
            let suggestions = error.recovery_suggestions();
            assert!(!suggestions.is_empty());
            assert!(suggestions.iter().all(|s| s.len() > 5));
        }
    }
}
