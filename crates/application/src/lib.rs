//! 应用层实现。
//!
//! 这里提供围绕领域模型的用例服务，以及实时核心：连接注册表与事件
//! 网关。对外部适配器（短信发送、令牌校验、持久化）只依赖抽象。

pub mod auth;
pub mod clock;
pub mod error;
pub mod gateway;
pub mod memory;
pub mod rate_limiter;
pub mod registry;
pub mod repository;
pub mod services;
pub mod sms;

pub use auth::{TokenVerifier, VerificationError};
pub use clock::{Clock, SystemClock};
pub use error::ApplicationError;
pub use gateway::EventGateway;
pub use rate_limiter::{OtpRateLimiter, RateLimitError};
pub use registry::ConnectionRegistry;
pub use repository::{ChatRepository, MessageRepository, OtpRepository, UserRepository};
pub use services::{
    ChatService, ChatServiceDependencies, MessageService, MessageServiceDependencies, OtpService,
    OtpServiceDependencies, UserService, UserServiceDependencies,
};
pub use sms::{SmsError, SmsSender};
