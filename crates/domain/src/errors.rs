use thiserror::Error;

/// 领域错误类型
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("{field}: {reason}")]
    InvalidArgument { field: String, reason: String },
    #[error("user not found")]
    UserNotFound,
    #[error("user already exists")]
    UserAlreadyExists,
    #[error("mobile number not verified")]
    MobileNotVerified,
    #[error("chat not found")]
    ChatNotFound,
    #[error("user is not part of this chat")]
    NotAChatParticipant,
    #[error("cannot chat with yourself")]
    SelfChatNotAllowed,
    #[error("message not found")]
    MessageNotFound,
    #[error("only the sender can delete a message")]
    NotMessageSender,
    #[error("message must have either content or at least one attachment")]
    EmptyMessage,
    #[error("invalid otp or otp has expired")]
    OtpInvalid,
    #[error("an active otp already exists for this number")]
    OtpStillPending,
    #[error("operation not allowed")]
    OperationNotAllowed,
}

impl DomainError {
    pub fn invalid_argument(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// 存储层错误，与具体数据库实现解耦。
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("record not found")]
    NotFound,
    #[error("record already exists")]
    Conflict,
    #[error("storage error: {message}")]
    Storage { message: String },
}

impl RepositoryError {
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }
}

pub type DomainResult<T> = Result<T, DomainError>;
