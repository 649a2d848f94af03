use domain::{DomainError, RepositoryError};
use thiserror::Error;

use crate::rate_limiter::RateLimitError;
use crate::sms::SmsError;

#[derive(Debug, Error)]
pub enum ApplicationError {
    #[error("domain error: {0}")]
    Domain(#[from] DomainError),
    #[error("repository error: {0}")]
    Repository(RepositoryError),
    #[error("sms error: {0}")]
    Sms(#[from] SmsError),
    #[error("rate limited: {0}")]
    RateLimited(#[from] RateLimitError),
    #[error("infrastructure error: {0}")]
    Infrastructure(String),
}

impl ApplicationError {
    pub fn infrastructure(message: impl Into<String>) -> Self {
        ApplicationError::Infrastructure(message.into())
    }
}

impl From<RepositoryError> for ApplicationError {
    fn from(value: RepositoryError) -> Self {
        ApplicationError::Repository(value)
    }
}
