use std::sync::Arc;

use domain::{DomainError, MobileNumber, User, UserId, Username};
use uuid::Uuid;

use crate::clock::Clock;
use crate::error::ApplicationError;
use crate::repository::{OtpRepository, UserRepository};

#[derive(Debug, Clone)]
pub struct RegisterUserRequest {
    pub username: String,
    pub mobile_number: String,
    pub avatar_url: Option<String>,
}

pub struct UserServiceDependencies {
    pub user_repository: Arc<dyn UserRepository>,
    pub otp_repository: Arc<dyn OtpRepository>,
    pub clock: Arc<dyn Clock>,
}

pub struct UserService {
    deps: UserServiceDependencies,
}

impl UserService {
    pub fn new(deps: UserServiceDependencies) -> Self {
        Self { deps }
    }

    /// 注册新用户。前提：手机号先通过 OTP 验证。
    pub async fn register(&self, request: RegisterUserRequest) -> Result<User, ApplicationError> {
        let username = Username::parse(request.username)?;
        let mobile_number = MobileNumber::parse(request.mobile_number)?;

        self.deps
            .otp_repository
            .find_verified(&mobile_number)
            .await?
            .ok_or(DomainError::MobileNotVerified)?;

        if self
            .deps
            .user_repository
            .find_by_mobile(&mobile_number)
            .await?
            .is_some()
        {
            return Err(DomainError::UserAlreadyExists.into());
        }

        let now = self.deps.clock.now();
        let user = User::register(
            UserId::from(Uuid::new_v4()),
            username,
            mobile_number.clone(),
            request.avatar_url,
            now,
        );
        let user = self.deps.user_repository.create(user).await?;

        // 注册完成，挑战消费掉
        self.deps.otp_repository.purge(&mobile_number).await?;

        tracing::info!(user_id = %user.id, mobile_number = %mobile_number, "user registered");
        Ok(user)
    }

    /// 把新签发的刷新令牌落到用户记录上（登录 / 注册共用）。
    pub async fn store_refresh_token(
        &self,
        user_id: UserId,
        refresh_token: &str,
    ) -> Result<User, ApplicationError> {
        let mut user = self
            .deps
            .user_repository
            .find_by_id(user_id)
            .await?
            .ok_or(DomainError::UserNotFound)?;
        user.set_refresh_token(refresh_token, self.deps.clock.now());
        Ok(self.deps.user_repository.update(user).await?)
    }

    pub async fn get_by_id(&self, user_id: UserId) -> Result<User, ApplicationError> {
        self.deps
            .user_repository
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| DomainError::UserNotFound.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;
    use crate::memory::{MemoryOtpRepository, MemoryUserRepository};
    use domain::OtpChallenge;

    fn service(otp_repository: Arc<MemoryOtpRepository>) -> UserService {
        UserService::new(UserServiceDependencies {
            user_repository: Arc::new(MemoryUserRepository::new()),
            otp_repository,
            clock: Arc::new(SystemClock),
        })
    }

    async fn verified_challenge(repo: &MemoryOtpRepository, mobile: &str) {
        let mut challenge = OtpChallenge::issue(
            Uuid::new_v4(),
            MobileNumber::parse(mobile).unwrap(),
            "123456",
            chrono::Duration::minutes(5),
            chrono::Utc::now(),
        );
        challenge.mark_verified();
        repo.create(challenge).await.unwrap();
    }

    #[tokio::test]
    async fn register_requires_a_verified_otp() {
        let otp_repository = Arc::new(MemoryOtpRepository::new());
        let service = service(otp_repository);

        let err = service
            .register(RegisterUserRequest {
                username: "alice".to_string(),
                mobile_number: "+8613912345678".to_string(),
                avatar_url: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ApplicationError::Domain(DomainError::MobileNotVerified)
        ));
    }

    #[tokio::test]
    async fn register_creates_the_user_and_consumes_the_challenge() {
        let otp_repository = Arc::new(MemoryOtpRepository::new());
        verified_challenge(&otp_repository, "+8613912345678").await;
        let service = service(otp_repository.clone());

        let user = service
            .register(RegisterUserRequest {
                username: "alice".to_string(),
                mobile_number: "+8613912345678".to_string(),
                avatar_url: Some("https://cdn.example.com/a.png".to_string()),
            })
            .await
            .unwrap();
        assert_eq!(user.username.as_str(), "alice");

        // 挑战已消费：同号码二次注册先倒在验证关口
        let err = service
            .register(RegisterUserRequest {
                username: "alice2".to_string(),
                mobile_number: "+8613912345678".to_string(),
                avatar_url: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ApplicationError::Domain(DomainError::MobileNotVerified)
        ));
    }

    #[tokio::test]
    async fn duplicate_mobile_number_is_rejected() {
        let otp_repository = Arc::new(MemoryOtpRepository::new());
        verified_challenge(&otp_repository, "+8613912345678").await;
        let service = service(otp_repository.clone());

        service
            .register(RegisterUserRequest {
                username: "alice".to_string(),
                mobile_number: "+8613912345678".to_string(),
                avatar_url: None,
            })
            .await
            .unwrap();

        verified_challenge(&otp_repository, "+8613912345678").await;
        let err = service
            .register(RegisterUserRequest {
                username: "bob".to_string(),
                mobile_number: "+8613912345678".to_string(),
                avatar_url: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ApplicationError::Domain(DomainError::UserAlreadyExists)
        ));
    }

    #[tokio::test]
    async fn refresh_token_is_stored_but_never_serialized() {
        let otp_repository = Arc::new(MemoryOtpRepository::new());
        verified_challenge(&otp_repository, "+8613912345678").await;
        let service = service(otp_repository);

        let user = service
            .register(RegisterUserRequest {
                username: "alice".to_string(),
                mobile_number: "+8613912345678".to_string(),
                avatar_url: None,
            })
            .await
            .unwrap();

        let updated = service
            .store_refresh_token(user.id, "refresh.jwt.token")
            .await
            .unwrap();
        assert_eq!(updated.refresh_token.as_deref(), Some("refresh.jwt.token"));

        let json = serde_json::to_value(&updated).unwrap();
        assert!(json.get("refresh_token").is_none());
    }
}
