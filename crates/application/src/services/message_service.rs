use std::sync::Arc;

use domain::{
    Attachment, AttachmentKind, Chat, ChatId, ChatMessage, DomainError, EventKind,
    MessageContent, MessageId, UserId,
};
use serde_json::json;
use uuid::Uuid;

use crate::clock::Clock;
use crate::error::ApplicationError;
use crate::gateway::EventGateway;
use crate::repository::{ChatRepository, MessageRepository};

/// 入站附件元数据。种类缺省时按 MIME 推断。
#[derive(Debug, Clone)]
pub struct NewAttachment {
    pub url: String,
    pub kind: Option<AttachmentKind>,
    pub filename: String,
    pub mime_type: Option<String>,
    pub size: Option<i64>,
}

impl From<NewAttachment> for Attachment {
    fn from(value: NewAttachment) -> Self {
        let kind = value.kind.unwrap_or_else(|| {
            value
                .mime_type
                .as_deref()
                .map(AttachmentKind::from_mime)
                .unwrap_or(AttachmentKind::Other)
        });
        Attachment {
            url: value.url,
            kind,
            filename: value.filename,
            mime_type: value.mime_type,
            size: value.size,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SendMessageRequest {
    pub chat_id: Uuid,
    pub sender_id: Uuid,
    pub content: Option<String>,
    pub attachments: Vec<NewAttachment>,
}

#[derive(Debug, Clone)]
pub struct DeleteMessageRequest {
    pub chat_id: Uuid,
    pub message_id: Uuid,
    pub requester_id: Uuid,
}

pub struct MessageServiceDependencies {
    pub chat_repository: Arc<dyn ChatRepository>,
    pub message_repository: Arc<dyn MessageRepository>,
    pub gateway: Arc<EventGateway>,
    pub clock: Arc<dyn Clock>,
}

pub struct MessageService {
    deps: MessageServiceDependencies,
}

impl MessageService {
    pub fn new(deps: MessageServiceDependencies) -> Self {
        Self { deps }
    }

    /// 会话内消息，按时间倒序；跳过请求者已删除的消息。
    pub async fn list_messages(
        &self,
        chat_id: Uuid,
        requester_id: Uuid,
    ) -> Result<Vec<ChatMessage>, ApplicationError> {
        let requester_id = UserId::from(requester_id);
        let chat = self.load_chat(ChatId::from(chat_id), requester_id).await?;

        let messages = self.deps.message_repository.list_for_chat(chat.id).await?;
        Ok(messages
            .into_iter()
            .filter(|message| message.is_visible_to(requester_id))
            .collect())
    }

    pub async fn send_message(
        &self,
        request: SendMessageRequest,
    ) -> Result<ChatMessage, ApplicationError> {
        let sender_id = UserId::from(request.sender_id);
        let mut chat = self.load_chat(ChatId::from(request.chat_id), sender_id).await?;

        let content = match request.content {
            Some(content) if !content.trim().is_empty() => Some(MessageContent::new(content)?),
            _ => None,
        };
        let attachments: Vec<Attachment> = request
            .attachments
            .into_iter()
            .map(Attachment::from)
            .collect();

        let now = self.deps.clock.now();
        let message = ChatMessage::new(
            MessageId::from(Uuid::new_v4()),
            chat.id,
            sender_id,
            content,
            attachments,
            now,
        )?;
        let message = self.deps.message_repository.create(message).await?;

        chat.record_message(message.id, now);
        self.deps.chat_repository.update(chat.clone()).await?;

        // 发送者之外的参与者都收到 message-received
        match serde_json::to_value(&message) {
            Ok(payload) => {
                for participant in chat.other_participants(sender_id) {
                    self.deps
                        .gateway
                        .dispatch(participant, EventKind::MessageReceived, payload.clone())
                        .await;
                }
            }
            Err(err) => {
                tracing::error!(message_id = %message.id, error = %err, "failed to serialize message for fan-out");
            }
        }

        tracing::info!(chat_id = %chat.id, message_id = %message.id, sender = %sender_id, "message sent");
        Ok(message)
    }

    /// 删除消息。只有发送者本人可以删除。
    pub async fn delete_message(
        &self,
        request: DeleteMessageRequest,
    ) -> Result<(), ApplicationError> {
        let requester_id = UserId::from(request.requester_id);
        let mut chat = self
            .load_chat(ChatId::from(request.chat_id), requester_id)
            .await?;

        let message_id = MessageId::from(request.message_id);
        let message = self
            .deps
            .message_repository
            .find_by_id(message_id)
            .await?
            .filter(|message| message.chat_id == chat.id)
            .ok_or(DomainError::MessageNotFound)?;

        if message.sender_id != requester_id {
            return Err(DomainError::NotMessageSender.into());
        }

        self.deps.message_repository.delete(message_id).await?;

        // last_message 指向被删消息时，回退到剩余的最新一条
        if chat.last_message == Some(message_id) {
            let now = self.deps.clock.now();
            match self.deps.message_repository.find_latest(chat.id).await? {
                Some(latest) => chat.record_message(latest.id, now),
                None => chat.clear_last_message(now),
            }
            self.deps.chat_repository.update(chat.clone()).await?;
        }

        let payload = json!({
            "chatId": chat.id,
            "messageId": message_id,
        });
        for participant in chat.other_participants(requester_id) {
            self.deps
                .gateway
                .dispatch(participant, EventKind::MessageDeleted, payload.clone())
                .await;
        }

        tracing::info!(chat_id = %chat.id, message_id = %message_id, "message deleted");
        Ok(())
    }

    async fn load_chat(
        &self,
        chat_id: ChatId,
        requester_id: UserId,
    ) -> Result<Chat, ApplicationError> {
        let chat = self
            .deps
            .chat_repository
            .find_by_id(chat_id)
            .await?
            .ok_or(DomainError::ChatNotFound)?;
        if !chat.is_participant(requester_id) {
            return Err(DomainError::NotAChatParticipant.into());
        }
        Ok(chat)
    }
}
