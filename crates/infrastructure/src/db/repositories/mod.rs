mod chat_repository_impl;
mod message_repository_impl;
mod otp_repository_impl;
mod user_repository_impl;

pub use chat_repository_impl::PgChatRepository;
pub use message_repository_impl::PgMessageRepository;
pub use otp_repository_impl::PgOtpRepository;
pub use user_repository_impl::PgUserRepository;

use domain::RepositoryError;

/// sqlx 错误到仓储错误的统一映射。
pub(crate) fn map_sqlx_error(error: sqlx::Error) -> RepositoryError {
    match &error {
        sqlx::Error::RowNotFound => RepositoryError::NotFound,
        sqlx::Error::Database(db_error) if db_error.is_unique_violation() => {
            RepositoryError::Conflict
        }
        _ => RepositoryError::storage(error.to_string()),
    }
}
