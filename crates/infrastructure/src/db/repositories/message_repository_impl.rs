//! 消息仓储实现
//!
//! 附件元数据以 JSONB 存储，read_by / deleted_for 存为 uuid 数组。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::{
    Attachment, ChatId, ChatMessage, MessageContent, MessageId, RepositoryError, UserId,
};
use sqlx::FromRow;
use uuid::Uuid;

use super::map_sqlx_error;
use crate::db::DbPool;

#[derive(Debug, Clone, FromRow)]
struct DbMessage {
    id: Uuid,
    chat_id: Uuid,
    sender_id: Uuid,
    content: Option<String>,
    attachments: serde_json::Value,
    read_by: Vec<Uuid>,
    deleted_for: Vec<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl DbMessage {
    fn into_message(self) -> Result<ChatMessage, RepositoryError> {
        let content = match self.content {
            Some(content) if !content.trim().is_empty() => Some(
                MessageContent::new(content)
                    .map_err(|err| RepositoryError::storage(format!("corrupt message row: {err}")))?,
            ),
            _ => None,
        };
        let attachments: Vec<Attachment> = serde_json::from_value(self.attachments)
            .map_err(|err| RepositoryError::storage(format!("corrupt attachments: {err}")))?;

        Ok(ChatMessage {
            id: MessageId::from(self.id),
            chat_id: ChatId::from(self.chat_id),
            sender_id: UserId::from(self.sender_id),
            content,
            attachments,
            read_by: self.read_by.into_iter().map(UserId::from).collect(),
            deleted_for: self.deleted_for.into_iter().map(UserId::from).collect(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

const SELECT_MESSAGE: &str = "SELECT id, chat_id, sender_id, content, attachments, read_by, deleted_for, created_at, updated_at FROM messages";

pub struct PgMessageRepository {
    pool: DbPool,
}

impl PgMessageRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn attachments_json(message: &ChatMessage) -> Result<serde_json::Value, RepositoryError> {
        serde_json::to_value(&message.attachments)
            .map_err(|err| RepositoryError::storage(format!("unserializable attachments: {err}")))
    }
}

#[async_trait]
impl application::MessageRepository for PgMessageRepository {
    async fn create(&self, message: ChatMessage) -> Result<ChatMessage, RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO messages (id, chat_id, sender_id, content, attachments, read_by, deleted_for, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(message.id.0)
        .bind(message.chat_id.0)
        .bind(message.sender_id.0)
        .bind(message.content.as_ref().map(|content| content.as_str()))
        .bind(Self::attachments_json(&message)?)
        .bind(message.read_by.iter().map(|id| id.0).collect::<Vec<_>>())
        .bind(message.deleted_for.iter().map(|id| id.0).collect::<Vec<_>>())
        .bind(message.created_at)
        .bind(message.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(message)
    }

    async fn update(&self, message: ChatMessage) -> Result<ChatMessage, RepositoryError> {
        let result = sqlx::query(
            r#"
            UPDATE messages
            SET content = $2, attachments = $3, read_by = $4, deleted_for = $5, updated_at = $6
            WHERE id = $1
            "#,
        )
        .bind(message.id.0)
        .bind(message.content.as_ref().map(|content| content.as_str()))
        .bind(Self::attachments_json(&message)?)
        .bind(message.read_by.iter().map(|id| id.0).collect::<Vec<_>>())
        .bind(message.deleted_for.iter().map(|id| id.0).collect::<Vec<_>>())
        .bind(message.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(message)
    }

    async fn find_by_id(&self, id: MessageId) -> Result<Option<ChatMessage>, RepositoryError> {
        let row = sqlx::query_as::<_, DbMessage>(&format!("{SELECT_MESSAGE} WHERE id = $1"))
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        row.map(DbMessage::into_message).transpose()
    }

    async fn list_for_chat(&self, chat_id: ChatId) -> Result<Vec<ChatMessage>, RepositoryError> {
        let rows = sqlx::query_as::<_, DbMessage>(&format!(
            "{SELECT_MESSAGE} WHERE chat_id = $1 ORDER BY created_at DESC"
        ))
        .bind(chat_id.0)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        rows.into_iter().map(DbMessage::into_message).collect()
    }

    async fn find_latest(
        &self,
        chat_id: ChatId,
    ) -> Result<Option<ChatMessage>, RepositoryError> {
        let row = sqlx::query_as::<_, DbMessage>(&format!(
            "{SELECT_MESSAGE} WHERE chat_id = $1 ORDER BY created_at DESC LIMIT 1"
        ))
        .bind(chat_id.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.map(DbMessage::into_message).transpose()
    }

    async fn delete(&self, id: MessageId) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM messages WHERE id = $1")
            .bind(id.0)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }
}
