/// Input validation shared by the services.
use thiserror::Error;

/// Minimum length of an account search query.
pub const MIN_SEARCH_QUERY_LEN: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("account id cannot be empty")]
    EmptyAccountId,
    #[error("account email cannot be empty")]
    EmptyEmail,
    #[error("a valid recipient email address is required")]
    EmptyRecipient,
    #[error("access level must be one of read, write or admin, got {0:?}")]
    InvalidAccessLevel(String),
    #[error("search query must be at least {MIN_SEARCH_QUERY_LEN} characters long")]
    QueryTooShort,
    #[error("no update data provided")]
    EmptyPatch,
}

/// Validate that an account has the minimum required fields.
pub fn validate_account_fields(id: &str, email: &str) -> Result<(), ValidationError> {
    if id.trim().is_empty() {
        return Err(ValidationError::EmptyAccountId);
    }
    if email.trim().is_empty() {
        return Err(ValidationError::EmptyEmail);
    }
    Ok(())
}

pub fn validate_recipient(email: &str) -> Result<(), ValidationError> {
    if email.trim().is_empty() {
        return Err(ValidationError::EmptyRecipient);
    }
    Ok(())
}

pub fn validate_search_query(query: &str) -> Result<(), ValidationError> {
    if query.trim().chars().count() < MIN_SEARCH_QUERY_LEN {
        return Err(ValidationError::QueryTooShort);
    }
    Ok(())
}
