//! 用户仓储实现

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::{MobileNumber, RepositoryError, User, UserId, Username};
use sqlx::FromRow;
use uuid::Uuid;

use super::map_sqlx_error;
use crate::db::DbPool;

/// 数据库用户行
#[derive(Debug, Clone, FromRow)]
struct DbUser {
    id: Uuid,
    username: String,
    mobile_number: String,
    avatar_url: Option<String>,
    refresh_token: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl DbUser {
    fn into_user(self) -> Result<User, RepositoryError> {
        Ok(User {
            id: UserId::from(self.id),
            username: Username::parse(self.username)
                .map_err(|err| RepositoryError::storage(format!("corrupt user row: {err}")))?,
            mobile_number: MobileNumber::parse(self.mobile_number)
                .map_err(|err| RepositoryError::storage(format!("corrupt user row: {err}")))?,
            avatar_url: self.avatar_url,
            refresh_token: self.refresh_token,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

pub struct PgUserRepository {
    pool: DbPool,
}

impl PgUserRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl application::UserRepository for PgUserRepository {
    async fn create(&self, user: User) -> Result<User, RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO users (id, username, mobile_number, avatar_url, refresh_token, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(user.id.0)
        .bind(user.username.as_str())
        .bind(user.mobile_number.as_str())
        .bind(&user.avatar_url)
        .bind(&user.refresh_token)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(user)
    }

    async fn update(&self, user: User) -> Result<User, RepositoryError> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET username = $2, avatar_url = $3, refresh_token = $4, updated_at = $5
            WHERE id = $1
            "#,
        )
        .bind(user.id.0)
        .bind(user.username.as_str())
        .bind(&user.avatar_url)
        .bind(&user.refresh_token)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(user)
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, DbUser>(
            "SELECT id, username, mobile_number, avatar_url, refresh_token, created_at, updated_at FROM users WHERE id = $1",
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.map(DbUser::into_user).transpose()
    }

    async fn find_by_mobile(
        &self,
        mobile_number: &MobileNumber,
    ) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, DbUser>(
            "SELECT id, username, mobile_number, avatar_url, refresh_token, created_at, updated_at FROM users WHERE mobile_number = $1",
        )
        .bind(mobile_number.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.map(DbUser::into_user).transpose()
    }
}
