//! 连接认证端口
//!
//! 网关把握手里携带的凭证交给外部校验方换取用户身份；校验方内部做
//! 签名解码和用户存在性检查，对网关是黑盒。失败以类型化结果返回，
//! 由连接状态机决定 `Connecting -> Closed` 还是 `-> Authenticated`。

use async_trait::async_trait;
use domain::UserId;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerificationError {
    #[error("Invalid access token: {0}")]
    InvalidToken(String),
    #[error("Unauthorized: User not found")]
    UserNotFound,
    #[error("verification unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<UserId, VerificationError>;
}
