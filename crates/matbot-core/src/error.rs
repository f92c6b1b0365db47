//! Error types for matbot core
//!
//! [`Rejection`] is what a requester sees when an operation is refused; its
//! `Display` output is the reply text. The remaining types are internal
//! failures of the session machine, configuration and delivery.

use crate::session::SessionState;
use matbot_catalog::{CatalogError, ValidationError};

/// Refusal of a dispatch operation
#[derive(Debug, thiserror::Error)]
pub enum Rejection {
    /// Requester is not an administrator
    #[error("You do not have administrator rights.")]
    Forbidden,

    /// Malformed or out-of-range input
    #[error("{}", describe_validation(.0))]
    Validation(#[from] ValidationError),

    /// File sent without an upload session
    #[error("No upload in progress. Start one with /add <task number>.")]
    NoActiveSession,

    /// The catalog could not be saved
    #[error("Could not save the file, please try again later.")]
    Storage(#[source] CatalogError),
}

impl Rejection {
    /// Check if rejection is an authorization failure
    #[inline]
    #[must_use]
    pub fn is_forbidden(&self) -> bool {
        matches!(self, Self::Forbidden)
    }

    /// Check if rejection was caused by requester input
    #[inline]
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Check if the requester may simply try again
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Storage(_))
    }
}

impl From<CatalogError> for Rejection {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::Validation(v) => Self::Validation(v),
            other => Self::Storage(other),
        }
    }
}

fn describe_validation(err: &ValidationError) -> &'static str {
    match err {
        ValidationError::MalformedTask(_) => "Usage: /add <task number> (for example: /add 5)",
        ValidationError::TaskOutOfRange(_) => "Task number must be between 1 and 19.",
        ValidationError::UnknownMediaKind(_) | ValidationError::MissingExternalId => {
            "Could not determine the file type. Please try again."
        }
    }
}

/// Session state machine errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// Event not allowed in the current state
    #[error("illegal session transition: {event} while {from:?}")]
    IllegalTransition {
        /// State the session was in
        from: SessionState,
        /// Event that was refused
        event: &'static str,
    },
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Administrator list entry is not an integer identity
    #[error("invalid administrator id {value:?} in {source_name}")]
    InvalidAdminId {
        /// Offending entry
        value: String,
        /// Where the list came from
        source_name: String,
    },
}

/// Transport-level failure to send one item
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("delivery failed: {0}")]
pub struct DeliveryError(pub String);

impl DeliveryError {
    /// Create delivery error
    #[inline]
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejection_messages() {
        assert!(Rejection::Forbidden.to_string().contains("administrator"));
        assert!(Rejection::NoActiveSession.to_string().contains("/add"));

        let malformed = Rejection::from(ValidationError::MalformedTask("x".into()));
        assert!(malformed.to_string().starts_with("Usage: /add"));
        assert!(malformed.is_validation());

        let range = Rejection::from(ValidationError::TaskOutOfRange(42));
        assert!(range.to_string().contains("between 1 and 19"));
    }

    #[test]
    fn catalog_validation_maps_to_validation() {
        let err = CatalogError::Validation(ValidationError::TaskOutOfRange(0));
        assert!(Rejection::from(err).is_validation());
    }

    #[test]
    fn storage_rejection_is_retryable() {
        let err = CatalogError::Persist {
            path: "materials.json".into(),
            source: std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
        };
        let rejection = Rejection::from(err);
        assert!(rejection.is_retryable());
        assert!(!rejection.to_string().contains("disk full"));
    }
}
