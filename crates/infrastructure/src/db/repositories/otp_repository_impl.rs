//! OTP 挑战仓储实现

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::{MobileNumber, OtpChallenge, RepositoryError, Timestamp};
use sqlx::FromRow;
use uuid::Uuid;

use super::map_sqlx_error;
use crate::db::DbPool;

#[derive(Debug, Clone, FromRow)]
struct DbOtpChallenge {
    id: Uuid,
    mobile_number: String,
    code: String,
    is_verified: bool,
    expires_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

impl DbOtpChallenge {
    fn into_challenge(self) -> Result<OtpChallenge, RepositoryError> {
        Ok(OtpChallenge {
            id: self.id,
            mobile_number: MobileNumber::parse(self.mobile_number)
                .map_err(|err| RepositoryError::storage(format!("corrupt otp row: {err}")))?,
            code: self.code,
            is_verified: self.is_verified,
            expires_at: self.expires_at,
            created_at: self.created_at,
        })
    }
}

const SELECT_CHALLENGE: &str =
    "SELECT id, mobile_number, code, is_verified, expires_at, created_at FROM otp_challenges";

pub struct PgOtpRepository {
    pool: DbPool,
}

impl PgOtpRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl application::OtpRepository for PgOtpRepository {
    async fn create(&self, challenge: OtpChallenge) -> Result<OtpChallenge, RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO otp_challenges (id, mobile_number, code, is_verified, expires_at, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(challenge.id)
        .bind(challenge.mobile_number.as_str())
        .bind(&challenge.code)
        .bind(challenge.is_verified)
        .bind(challenge.expires_at)
        .bind(challenge.created_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(challenge)
    }

    async fn update(&self, challenge: OtpChallenge) -> Result<OtpChallenge, RepositoryError> {
        let result = sqlx::query(
            "UPDATE otp_challenges SET is_verified = $2, expires_at = $3 WHERE id = $1",
        )
        .bind(challenge.id)
        .bind(challenge.is_verified)
        .bind(challenge.expires_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(challenge)
    }

    async fn find_active(
        &self,
        mobile_number: &MobileNumber,
        now: Timestamp,
    ) -> Result<Option<OtpChallenge>, RepositoryError> {
        let row = sqlx::query_as::<_, DbOtpChallenge>(&format!(
            "{SELECT_CHALLENGE} WHERE mobile_number = $1 AND is_verified = FALSE AND expires_at > $2 ORDER BY created_at DESC LIMIT 1"
        ))
        .bind(mobile_number.as_str())
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.map(DbOtpChallenge::into_challenge).transpose()
    }

    async fn find_verified(
        &self,
        mobile_number: &MobileNumber,
    ) -> Result<Option<OtpChallenge>, RepositoryError> {
        let row = sqlx::query_as::<_, DbOtpChallenge>(&format!(
            "{SELECT_CHALLENGE} WHERE mobile_number = $1 AND is_verified = TRUE ORDER BY created_at DESC LIMIT 1"
        ))
        .bind(mobile_number.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.map(DbOtpChallenge::into_challenge).transpose()
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM otp_challenges WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn purge(&self, mobile_number: &MobileNumber) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM otp_challenges WHERE mobile_number = $1")
            .bind(mobile_number.as_str())
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }
}
