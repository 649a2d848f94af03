//! 短信发送适配器
//!
//! `ConsoleSmsSender` 把验证码打到日志里（开发环境）；`HttpSmsSender`
//! 走 Twilio 风格的 REST 网关（生产环境）。

use application::{SmsError, SmsSender};
use async_trait::async_trait;
use domain::MobileNumber;

/// 开发环境：验证码直接写日志。
#[derive(Debug, Default)]
pub struct ConsoleSmsSender;

#[async_trait]
impl SmsSender for ConsoleSmsSender {
    async fn send_code(&self, to: &MobileNumber, code: &str) -> Result<(), SmsError> {
        tracing::info!(mobile_number = %to, "OTP for {}: {}", to, code);
        Ok(())
    }
}

/// 生产环境：通过短信网关的 REST API 下发。
pub struct HttpSmsSender {
    client: reqwest::Client,
    api_base: String,
    account_sid: String,
    auth_token: String,
    from_number: String,
}

impl HttpSmsSender {
    pub fn new(
        api_base: impl Into<String>,
        account_sid: impl Into<String>,
        auth_token: impl Into<String>,
        from_number: impl Into<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base: api_base.into(),
            account_sid: account_sid.into(),
            auth_token: auth_token.into(),
            from_number: from_number.into(),
        }
    }
}

#[async_trait]
impl SmsSender for HttpSmsSender {
    async fn send_code(&self, to: &MobileNumber, code: &str) -> Result<(), SmsError> {
        let url = format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.api_base, self.account_sid
        );
        let body = format!("your otp is : {code}");
        let params = [
            ("To", to.as_str()),
            ("From", self.from_number.as_str()),
            ("Body", body.as_str()),
        ];

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&params)
            .send()
            .await
            .map_err(|err| SmsError::delivery(err.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            tracing::error!(%status, detail, "sms gateway rejected the message");
            return Err(SmsError::delivery(format!(
                "sms gateway returned {status}"
            )));
        }

        tracing::info!(mobile_number = %to, "otp sms dispatched");
        Ok(())
    }
}
