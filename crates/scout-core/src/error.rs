use thiserror::Error;

/// Error types for the scout pipeline.
#[derive(Error, Debug)]
pub enum ScoutError {
    /// No API key is stored in any credential namespace.
    #[error("No API key configured")]
    MissingCredential,

    /// The remote endpoint rejected the API key (HTTP 401).
    #[error("API key rejected by the server")]
    InvalidCredential,

    /// The remote endpoint answered with a non-success status other than 401.
    #[error("Server rejected the request (HTTP {status_code}): {message}")]
    RemoteRejected { status_code: u16, message: String },

    /// No response was received (connect failure, DNS, reset).
    #[error("Server unreachable: {0}")]
    Unreachable(String),

    /// A row did not carry enough data to become a load record.
    #[error("Malformed row: {0}")]
    MalformedRow(String),

    /// Reading or writing the credential store failed.
    #[error("Storage error: {0}")]
    StorageError(String),

    /// JSON serialization/deserialization failed.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Invalid configuration value.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// The trigger channel closed or answered the wrong request.
    #[error("Dispatch error: {0}")]
    Dispatch(String),
}

impl ScoutError {
    /// Returns true if a caller-side retry has a chance of succeeding.
    ///
    /// The pipeline itself never retries; this is advisory.
    pub fn is_retryable(&self) -> bool {
        match self {
            ScoutError::Unreachable(_) => true,
            ScoutError::RemoteRejected { status_code, .. } => {
                *status_code == 429 || *status_code >= 500
            }
            _ => false,
        }
    }

    /// Message shown to the user by whatever surface triggered the operation.
    pub fn user_message(&self) -> String {
        match self {
            ScoutError::MissingCredential => {
                "No API key configured. Save your scout API key in the extension settings first."
                    .to_string()
            }
            ScoutError::InvalidCredential => {
                "Your API key was rejected. Regenerate a scout key from your dashboard and save it again."
                    .to_string()
            }
            _ => "Failed to send loads. Refresh the page and try again.".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_errors() {
        assert!(ScoutError::Unreachable("reset".into()).is_retryable());
        assert!(
            ScoutError::RemoteRejected {
                status_code: 503,
                message: "overloaded".into(),
            }
            .is_retryable()
        );
        assert!(
            ScoutError::RemoteRejected {
                status_code: 429,
                message: "slow down".into(),
            }
            .is_retryable()
        );
        assert!(
            !ScoutError::RemoteRejected {
                status_code: 422,
                message: "bad body".into(),
            }
            .is_retryable()
        );
        assert!(!ScoutError::InvalidCredential.is_retryable());
        assert!(!ScoutError::MissingCredential.is_retryable());
    }

    #[test]
    fn test_user_messages_are_distinct() {
        let missing = ScoutError::MissingCredential.user_message();
        let invalid = ScoutError::InvalidCredential.user_message();
        let network = ScoutError::Unreachable("refused".into()).user_message();
        let rejected = ScoutError::RemoteRejected {
            status_code: 500,
            message: String::new(),
        }
        .user_message();

        assert!(missing.contains("No API key"));
        assert!(invalid.contains("Regenerate"));
        assert_ne!(missing, network);
        assert_ne!(invalid, network);
        assert_eq!(network, rejected);
        assert!(network.contains("Refresh the page"));
    }

    #[test]
    fn test_display_carries_status_code() {
        let err = ScoutError::RemoteRejected {
            status_code: 502,
            message: "bad gateway".into(),
        };
        assert_eq!(
            err.to_string(),
            "Server rejected the request (HTTP 502): bad gateway"
        );
    }
}
