//! Error taxonomy of the document and sharing engine.

use thiserror::Error;

use crate::identity::IdentityError;
use crate::store::StoreError;
use crate::validate::ValidationError;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("invalid email address: {0}")]
    InvalidEmail(String),

    /// Missing, or not visible to the caller. The two cases are deliberately
    /// indistinguishable.
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("forbidden: {0}")]
    Forbidden(&'static str),

    #[error("you cannot share a document with yourself")]
    SelfShare,

    #[error("the document owner's access cannot be changed")]
    OwnerProtected,

    #[error("invalid credential: {0}")]
    InvalidCredential(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<IdentityError> for CoreError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::InvalidEmail(email) => CoreError::InvalidEmail(email),
        }
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
