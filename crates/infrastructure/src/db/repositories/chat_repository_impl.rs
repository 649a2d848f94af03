//! 会话仓储实现

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::{Chat, ChatId, MessageId, RepositoryError, UserId};
use sqlx::FromRow;
use uuid::Uuid;

use super::map_sqlx_error;
use crate::db::DbPool;

#[derive(Debug, Clone, FromRow)]
struct DbChat {
    id: Uuid,
    name: String,
    is_group: bool,
    participants: Vec<Uuid>,
    admin_id: Option<Uuid>,
    last_message_id: Option<Uuid>,
    avatar_url: Option<String>,
    description: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<DbChat> for Chat {
    fn from(row: DbChat) -> Self {
        Chat {
            id: ChatId::from(row.id),
            name: row.name,
            is_group: row.is_group,
            participants: row.participants.into_iter().map(UserId::from).collect(),
            admin: row.admin_id.map(UserId::from),
            last_message: row.last_message_id.map(MessageId::from),
            avatar_url: row.avatar_url,
            description: row.description,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const SELECT_CHAT: &str = "SELECT id, name, is_group, participants, admin_id, last_message_id, avatar_url, description, created_at, updated_at FROM chats";

pub struct PgChatRepository {
    pool: DbPool,
}

impl PgChatRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn participant_ids(chat: &Chat) -> Vec<Uuid> {
        chat.participants.iter().map(|id| id.0).collect()
    }
}

#[async_trait]
impl application::ChatRepository for PgChatRepository {
    async fn create(&self, chat: Chat) -> Result<Chat, RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO chats (id, name, is_group, participants, admin_id, last_message_id, avatar_url, description, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(chat.id.0)
        .bind(&chat.name)
        .bind(chat.is_group)
        .bind(Self::participant_ids(&chat))
        .bind(chat.admin.map(|id| id.0))
        .bind(chat.last_message.map(|id| id.0))
        .bind(&chat.avatar_url)
        .bind(&chat.description)
        .bind(chat.created_at)
        .bind(chat.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(chat)
    }

    async fn update(&self, chat: Chat) -> Result<Chat, RepositoryError> {
        let result = sqlx::query(
            r#"
            UPDATE chats
            SET name = $2, participants = $3, admin_id = $4, last_message_id = $5,
                avatar_url = $6, description = $7, updated_at = $8
            WHERE id = $1
            "#,
        )
        .bind(chat.id.0)
        .bind(&chat.name)
        .bind(Self::participant_ids(&chat))
        .bind(chat.admin.map(|id| id.0))
        .bind(chat.last_message.map(|id| id.0))
        .bind(&chat.avatar_url)
        .bind(&chat.description)
        .bind(chat.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(chat)
    }

    async fn find_by_id(&self, id: ChatId) -> Result<Option<Chat>, RepositoryError> {
        let row = sqlx::query_as::<_, DbChat>(&format!("{SELECT_CHAT} WHERE id = $1"))
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(Chat::from))
    }

    async fn find_direct_between(
        &self,
        a: UserId,
        b: UserId,
    ) -> Result<Option<Chat>, RepositoryError> {
        let row = sqlx::query_as::<_, DbChat>(&format!(
            "{SELECT_CHAT} WHERE is_group = FALSE AND participants @> ARRAY[$1, $2]::uuid[] LIMIT 1"
        ))
        .bind(a.0)
        .bind(b.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(Chat::from))
    }

    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Chat>, RepositoryError> {
        let rows = sqlx::query_as::<_, DbChat>(&format!(
            "{SELECT_CHAT} WHERE $1 = ANY(participants) ORDER BY updated_at DESC"
        ))
        .bind(user_id.0)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(Chat::from).collect())
    }
}
