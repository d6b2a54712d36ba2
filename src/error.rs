//! Error taxonomy for rule management and resolution.
//!
//! Business errors (`InvalidInput`, `DuplicateRuleId`, `NotFound`,
//! `NoFieldsProvided`) are returned to the caller as-is. Storage faults stay
//! wrapped in `Store` so callers can tell infrastructure failures apart.
//! A resolution that finds nothing is `Ok(None)`, never an error.

use thiserror::Error;

use crate::store::StoreError;

/// Errors produced by rule operations.
#[derive(Debug, Error)]
pub enum RouterError {
    /// A required field is missing or a value cannot be encoded.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A rule with the same selector tuple already exists.
    #[error("rule already exists: {0}")]
    DuplicateRuleId(String),

    /// No rule with this id.
    #[error("rule not found: {0}")]
    NotFound(String),

    /// An update patch carried none of the mutable fields.
    #[error("no updatable fields provided (expected `target` and/or `expires_at`)")]
    NoFieldsProvided,

    /// Storage-layer fault.
    #[error("store error: {0}")]
    Store(StoreError),
}

impl RouterError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        RouterError::InvalidInput(msg.into())
    }
}

impl From<StoreError> for RouterError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate(id) => RouterError::DuplicateRuleId(id),
            other => RouterError::Store(other),
        }
    }
}

pub type RouterResult<T> = Result<T, RouterError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_store_error_is_classified() {
        let err: RouterError = StoreError::Duplicate("*.example.com/*".into()).into();
        assert!(matches!(err, RouterError::DuplicateRuleId(id) if id == "*.example.com/*"));
    }

    #[test]
    fn test_infrastructure_errors_pass_through() {
        let err: RouterError = StoreError::Poisoned.into();
        assert!(matches!(err, RouterError::Store(StoreError::Poisoned)));
    }
}
