// Error taxonomy for the report adapter

use thiserror::Error;

/// Result alias used throughout the adapter
pub type Result<T> = std::result::Result<T, AdapterError>;

/// Errors raised while turning lifecycle events into a report
#[derive(Debug, Error)]
pub enum AdapterError {
    /// Begin/end calls arrived out of the expected nesting order.
    /// The report tree can no longer be trusted.
    #[error("protocol error: {message}")]
    Protocol { message: String },

    /// The event source sent an outcome value the adapter does not know.
    #[error("unrecognized outcome: {value:?}")]
    UnrecognizedOutcome { value: String },

    /// A lifecycle record could not be decoded.
    #[error("undecodable event: {0}")]
    Decode(#[from] serde_json::Error),

    /// The reporting backend rejected or failed a call.
    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl AdapterError {
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    pub fn unrecognized_outcome(value: impl Into<String>) -> Self {
        Self::UnrecognizedOutcome {
            value: value.into(),
        }
    }

    /// Protocol and outcome errors indicate a bug upstream, not a transient condition
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Protocol { .. } | Self::UnrecognizedOutcome { .. } | Self::Decode(_)
        )
    }
}

/// Errors surfaced by a reporting backend
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("backend I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to serialize backend request: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("backend rejected {operation}: {reason}")]
    Rejected {
        operation: &'static str,
        reason: String,
    },

    #[error("backend has no record of {kind} {id}")]
    UnknownId { kind: &'static str, id: String },
}

impl BackendError {
    pub fn rejected(operation: &'static str, reason: impl Into<String>) -> Self {
        Self::Rejected {
            operation,
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_error_display() {
        let err = AdapterError::protocol("end_current called with no open node");
        assert_eq!(
            err.to_string(),
            "protocol error: end_current called with no open node"
        );
        assert!(err.is_fatal());
    }

    #[test]
    fn test_unrecognized_outcome_display() {
        let err = AdapterError::unrecognized_outcome("flaky");
        assert_eq!(err.to_string(), "unrecognized outcome: \"flaky\"");
        assert!(err.is_fatal());
    }

    #[test]
    fn test_decode_error_is_fatal() {
        let err: AdapterError = serde_json::from_str::<u32>("-1").unwrap_err().into();
        assert!(err.to_string().starts_with("undecodable event:"));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_backend_error_is_not_fatal() {
        let err: AdapterError = BackendError::rejected("create_node", "quota exceeded").into();
        assert!(!err.is_fatal());
        assert_eq!(
            err.to_string(),
            "backend rejected create_node: quota exceeded"
        );
    }
}
