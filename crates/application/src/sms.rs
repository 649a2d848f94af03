use async_trait::async_trait;
use domain::MobileNumber;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SmsError {
    #[error("failed to send OTP: {0}")]
    Delivery(String),
}

impl SmsError {
    pub fn delivery(message: impl Into<String>) -> Self {
        Self::Delivery(message.into())
    }
}

/// 短信发送端口。开发环境用控制台实现，生产环境走短信网关。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SmsSender: Send + Sync {
    async fn send_code(&self, to: &MobileNumber, code: &str) -> Result<(), SmsError>;
}
