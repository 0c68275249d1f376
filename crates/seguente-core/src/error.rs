//! Error taxonomy for the registry core.
//!
//! Client-facing failures (`Decode`, `Validation`, `MissingIdentifier`,
//! `MalformedBody`, `NotFound`) are distinct from storage failures so the
//! enclosing transport can map them to the right status class.

use thiserror::Error;

use crate::store::StoreError;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, RegistryError>;

/// All failures the registry core can surface.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Stored or submitted bytes are not a well-formed descriptor.
    #[error("invalid payload format: {0}")]
    Decode(#[from] serde_json::Error),

    /// Descriptor decoded but is semantically invalid. The message names
    /// the offending field.
    #[error("{0}")]
    Validation(String),

    /// No resolution strategy produced a peer id.
    #[error("missing peerId")]
    MissingIdentifier,

    /// Request body was non-empty but not valid JSON.
    #[error("invalid payload format")]
    MalformedBody,

    /// No record exists for the resolved identifier.
    #[error("value not found")]
    NotFound,

    /// A stored record failed to decode or validate. Unlike `Decode` and
    /// `Validation`, which describe the request, this is a service-side
    /// fault: the caller sent nothing wrong.
    #[error("stored value for key {key} is invalid: {message}")]
    CorruptRecord { key: String, message: String },

    /// Descriptor could not be re-encoded for persistence.
    #[error("failed to encode descriptor: {0}")]
    Encode(#[source] serde_json::Error),

    /// Underlying storage failure, surfaced opaquely.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),
}

impl RegistryError {
    /// Build a validation error with a field-specific message.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// True for failures caused by the request rather than the service.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Decode(_)
                | Self::Validation(_)
                | Self::MissingIdentifier
                | Self::MalformedBody
                | Self::NotFound
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_message_passthrough() {
        let err = RegistryError::validation("peerId is required");
        assert_eq!(err.to_string(), "peerId is required");
    }

    #[test]
    fn client_error_classification() {
        assert!(RegistryError::NotFound.is_client_error());
        assert!(RegistryError::MissingIdentifier.is_client_error());
        assert!(!RegistryError::Store(StoreError::Poisoned).is_client_error());
    }

    #[test]
    fn corrupt_record_is_a_server_error() {
        let err = RegistryError::CorruptRecord {
            key: "/peer/bad".to_string(),
            message: "expected ident".to_string(),
        };
        assert!(!err.is_client_error());
        assert_eq!(
            err.to_string(),
            "stored value for key /peer/bad is invalid: expected ident"
        );
    }
}
