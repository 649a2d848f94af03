//! 聊天系统核心领域模型
//!
//! 包含用户、会话、消息、OTP 挑战等核心实体，以及实时事件定义。

pub mod chat;
pub mod errors;
pub mod events;
pub mod message;
pub mod otp;
pub mod user;
pub mod value_objects;

// 重新导出常用类型
pub use chat::Chat;
pub use errors::{DomainError, DomainResult, RepositoryError};
pub use events::{Envelope, EventKind};
pub use message::{Attachment, AttachmentKind, ChatMessage};
pub use otp::OtpChallenge;
pub use user::User;
pub use value_objects::{
    ChatId, ConnectionId, MessageContent, MessageId, MobileNumber, Timestamp, UserId, Username,
};
