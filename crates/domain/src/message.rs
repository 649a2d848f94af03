use serde::{Deserialize, Serialize};

use crate::errors::DomainError;
use crate::value_objects::{ChatId, MessageContent, MessageId, Timestamp, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttachmentKind {
    Image,
    Pdf,
    Video,
    Audio,
    Other,
}

impl AttachmentKind {
    /// 根据 MIME 类型推断附件种类。
    pub fn from_mime(mime_type: &str) -> Self {
        if mime_type.starts_with("image/") {
            Self::Image
        } else if mime_type.starts_with("video/") {
            Self::Video
        } else if mime_type.starts_with("audio/") {
            Self::Audio
        } else if mime_type == "application/pdf" {
            Self::Pdf
        } else {
            Self::Other
        }
    }
}

/// 附件元数据。文件本体托管在外部（对象存储 / 图床），这里只记录引用。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub url: String,
    #[serde(rename = "type")]
    pub kind: AttachmentKind,
    pub filename: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<i64>,
}

impl Attachment {
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.url.trim().is_empty() {
            return Err(DomainError::invalid_argument(
                "attachment.url",
                "cannot be empty",
            ));
        }
        if self.filename.trim().is_empty() {
            return Err(DomainError::invalid_argument(
                "attachment.filename",
                "cannot be empty",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: MessageId,
    pub chat_id: ChatId,
    pub sender_id: UserId,
    pub content: Option<MessageContent>,
    pub attachments: Vec<Attachment>,
    pub read_by: Vec<UserId>,
    #[serde(skip_serializing, default)] // 按用户的删除标记不暴露给客户端
    pub deleted_for: Vec<UserId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl ChatMessage {
    pub fn new(
        id: MessageId,
        chat_id: ChatId,
        sender_id: UserId,
        content: Option<MessageContent>,
        attachments: Vec<Attachment>,
        now: Timestamp,
    ) -> Result<Self, DomainError> {
        // 正文和附件至少要有其一
        if content.is_none() && attachments.is_empty() {
            return Err(DomainError::EmptyMessage);
        }
        for attachment in &attachments {
            attachment.validate()?;
        }
        Ok(Self {
            id,
            chat_id,
            sender_id,
            content,
            attachments,
            read_by: Vec::new(),
            deleted_for: Vec::new(),
            created_at: now,
            updated_at: now,
        })
    }

    pub fn mark_read(&mut self, user_id: UserId, now: Timestamp) {
        if !self.read_by.contains(&user_id) {
            self.read_by.push(user_id);
            self.updated_at = now;
        }
    }

    pub fn hide_for(&mut self, user_id: UserId, now: Timestamp) {
        if !self.deleted_for.contains(&user_id) {
            self.deleted_for.push(user_id);
            self.updated_at = now;
        }
    }

    pub fn is_visible_to(&self, user_id: UserId) -> bool {
        !self.deleted_for.contains(&user_id)
    }
}
