use std::sync::Arc;

use chrono::Duration;
use domain::{DomainError, MobileNumber, OtpChallenge, Timestamp, User};
use rand::Rng;
use uuid::Uuid;

use crate::clock::Clock;
use crate::error::ApplicationError;
use crate::rate_limiter::OtpRateLimiter;
use crate::repository::{OtpRepository, UserRepository};
use crate::sms::SmsSender;

/// 验证码策略。
#[derive(Debug, Clone)]
pub struct OtpPolicy {
    pub code_length: usize,
    pub ttl: Duration,
}

impl Default for OtpPolicy {
    fn default() -> Self {
        Self {
            code_length: 6,
            ttl: Duration::minutes(5),
        }
    }
}

/// 新签发的验证码。是否把明文回显给客户端由接口层按环境决定。
#[derive(Debug, Clone)]
pub struct IssuedOtp {
    pub mobile_number: MobileNumber,
    pub code: String,
    pub expires_at: Timestamp,
}

/// 验证结果：老用户直接登录，新用户继续注册。
#[derive(Debug, Clone)]
pub struct OtpVerification {
    pub mobile_number: MobileNumber,
    pub user: Option<User>,
}

pub struct OtpServiceDependencies {
    pub otp_repository: Arc<dyn OtpRepository>,
    pub user_repository: Arc<dyn UserRepository>,
    pub sms_sender: Arc<dyn SmsSender>,
    pub rate_limiter: Arc<OtpRateLimiter>,
    pub clock: Arc<dyn Clock>,
}

pub struct OtpService {
    deps: OtpServiceDependencies,
    policy: OtpPolicy,
}

impl OtpService {
    pub fn new(deps: OtpServiceDependencies, policy: OtpPolicy) -> Self {
        Self { deps, policy }
    }

    /// 签发验证码并下发短信。
    ///
    /// 同号码存在未过期挑战时拒绝（客户端应等待或走重发接口）。
    pub async fn generate(&self, mobile_number: &str) -> Result<IssuedOtp, ApplicationError> {
        let mobile_number = MobileNumber::parse(mobile_number)?;
        self.deps.rate_limiter.check(mobile_number.as_str())?;

        let now = self.deps.clock.now();
        if self
            .deps
            .otp_repository
            .find_active(&mobile_number, now)
            .await?
            .is_some()
        {
            return Err(DomainError::OtpStillPending.into());
        }

        self.issue(mobile_number, now).await
    }

    /// 作废旧验证码并重新签发。
    pub async fn resend(&self, mobile_number: &str) -> Result<IssuedOtp, ApplicationError> {
        let mobile_number = MobileNumber::parse(mobile_number)?;
        self.deps.rate_limiter.check(mobile_number.as_str())?;

        self.deps.otp_repository.purge(&mobile_number).await?;
        let now = self.deps.clock.now();
        self.issue(mobile_number, now).await
    }

    /// 校验验证码。
    ///
    /// 老用户：核销并消费挑战，返回用户实体供接口层签发令牌。
    /// 新用户：挑战保留核销标记，放行后续注册。
    pub async fn verify(
        &self,
        mobile_number: &str,
        code: &str,
    ) -> Result<OtpVerification, ApplicationError> {
        let mobile_number = MobileNumber::parse(mobile_number)?;
        let now = self.deps.clock.now();

        let mut challenge = self
            .deps
            .otp_repository
            .find_active(&mobile_number, now)
            .await?
            .filter(|challenge| challenge.matches(code))
            .ok_or(DomainError::OtpInvalid)?;

        challenge.mark_verified();
        let challenge = self.deps.otp_repository.update(challenge).await?;

        let user = self
            .deps
            .user_repository
            .find_by_mobile(&mobile_number)
            .await?;

        if user.is_some() {
            // 登录路径走完，挑战即刻消费
            self.deps.otp_repository.delete(challenge.id).await?;
        }

        tracing::info!(
            mobile_number = %mobile_number,
            is_new_user = user.is_none(),
            "otp verified"
        );

        Ok(OtpVerification {
            mobile_number,
            user,
        })
    }

    async fn issue(
        &self,
        mobile_number: MobileNumber,
        now: Timestamp,
    ) -> Result<IssuedOtp, ApplicationError> {
        let code = generate_code(self.policy.code_length);
        let challenge = OtpChallenge::issue(
            Uuid::new_v4(),
            mobile_number.clone(),
            code.clone(),
            self.policy.ttl,
            now,
        );
        let challenge = self.deps.otp_repository.create(challenge).await?;

        if let Err(err) = self.deps.sms_sender.send_code(&mobile_number, &code).await {
            // 短信没发出去，挑战也不能留
            self.deps.otp_repository.delete(challenge.id).await?;
            return Err(err.into());
        }

        tracing::info!(mobile_number = %mobile_number, "otp issued");

        Ok(IssuedOtp {
            mobile_number,
            code,
            expires_at: challenge.expires_at,
        })
    }
}

fn generate_code(length: usize) -> String {
    let mut rng = rand::rng();
    (0..length)
        .map(|_| char::from(b'0' + rng.random_range(0..10u8)))
        .collect()
}
