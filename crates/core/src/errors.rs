//! Error taxonomy for the inventory engine.
//!
//! Nothing here is fatal: validation and parse failures abort the single
//! operation that raised them, and persistence failures leave the in-memory
//! state dirty so the next trigger retries.

use thiserror::Error;

/// A rejected mutation. The mutation is not applied and state is unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("SKU is required")]
    EmptySku,

    #[error("Title is required")]
    EmptyTitle,

    #[error("At least one size is required")]
    EmptySizes,

    #[error("Size is required")]
    EmptySize,

    #[error("Field label is required")]
    EmptyLabel,

    #[error("An item must keep at least one size variant")]
    LastVariant,

    #[error("A custom field with id '{0}' already exists")]
    DuplicateCustomField(String),

    #[error("An item with SKU '{0}' already exists")]
    DuplicateSku(String),

    #[error("Unknown item '{0}'")]
    UnknownItem(String),

    #[error("Unknown variant '{0}'")]
    UnknownVariant(String),

    #[error("Unknown custom field '{0}'")]
    UnknownCustomField(String),
}

/// A rejected import. Individual malformed rows are skipped and counted, not
/// escalated; these variants cover files with nothing usable in them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("File is empty or malformed")]
    Empty,

    #[error("No valid data rows found")]
    NoValidData,
}

/// A failed remote read or write. Reported as a non-fatal warning; in-memory
/// state and the local cache are never rolled back because of it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PersistenceError {
    /// Remote store rejected or failed the call.
    #[error("Remote store error: {message}")]
    Remote { status: Option<u16>, message: String },
}

impl PersistenceError {
    /// Create a remote error without an HTTP status.
    pub fn remote(message: impl Into<String>) -> Self {
        Self::Remote {
            status: None,
            message: message.into(),
        }
    }

    /// Create a remote error carrying an HTTP status.
    pub fn remote_with_status(status: u16, message: impl Into<String>) -> Self {
        Self::Remote {
            status: Some(status),
            message: message.into(),
        }
    }

    /// HTTP status if the remote reported one.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Remote { status, .. } => *status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn persistence_error_carries_status() {
        let err = PersistenceError::remote_with_status(503, "upstream unavailable");
        assert_eq!(err.status_code(), Some(503));
        assert_eq!(
            err.to_string(),
            "Remote store error: upstream unavailable"
        );
    }

    #[test]
    fn validation_error_messages_are_user_facing() {
        assert_eq!(
            ValidationError::DuplicateCustomField("purchase_price".to_string()).to_string(),
            "A custom field with id 'purchase_price' already exists"
        );
        assert_eq!(ValidationError::LastVariant.to_string(), "An item must keep at least one size variant");
    }
}
