use chrono::Duration;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::value_objects::{MobileNumber, Timestamp};

/// 一次性验证码挑战。
///
/// 验证通过后 `is_verified` 置位，注册流程据此放行；挑战在注册或登录
/// 完成时被消费删除。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtpChallenge {
    pub id: Uuid,
    pub mobile_number: MobileNumber,
    pub code: String,
    pub is_verified: bool,
    pub expires_at: Timestamp,
    pub created_at: Timestamp,
}

impl OtpChallenge {
    pub fn issue(
        id: Uuid,
        mobile_number: MobileNumber,
        code: impl Into<String>,
        ttl: Duration,
        now: Timestamp,
    ) -> Self {
        Self {
            id,
            mobile_number,
            code: code.into(),
            is_verified: false,
            expires_at: now + ttl,
            created_at: now,
        }
    }

    pub fn is_expired(&self, now: Timestamp) -> bool {
        now >= self.expires_at
    }

    /// 是否仍可用于验证：未过期且未被核销。
    pub fn is_live(&self, now: Timestamp) -> bool {
        !self.is_verified && !self.is_expired(now)
    }

    pub fn matches(&self, code: &str) -> bool {
        self.code == code
    }

    pub fn mark_verified(&mut self) {
        self.is_verified = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn challenge(now: Timestamp) -> OtpChallenge {
        OtpChallenge::issue(
            Uuid::new_v4(),
            MobileNumber::parse("+8613912345678").unwrap(),
            "123456",
            Duration::minutes(5),
            now,
        )
    }

    #[test]
    fn live_until_expiry() {
        let now = chrono::Utc::now();
        let otp = challenge(now);
        assert!(otp.is_live(now));
        assert!(otp.is_live(now + Duration::minutes(4)));
        assert!(!otp.is_live(now + Duration::minutes(5)));
    }

    #[test]
    fn verified_challenge_is_no_longer_live() {
        let now = chrono::Utc::now();
        let mut otp = challenge(now);
        otp.mark_verified();
        assert!(!otp.is_live(now));
        assert!(otp.matches("123456"));
        assert!(!otp.matches("654321"));
    }
}
