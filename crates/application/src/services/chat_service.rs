use std::sync::Arc;

use domain::{Chat, ChatId, DomainError, EventKind, UserId};
use uuid::Uuid;

use crate::clock::Clock;
use crate::error::ApplicationError;
use crate::gateway::EventGateway;
use crate::repository::{ChatRepository, UserRepository};

#[derive(Debug, Clone)]
pub struct OpenDirectChatRequest {
    pub initiator_id: Uuid,
    pub receiver_id: Uuid,
}

#[derive(Debug, Clone)]
pub struct CreateGroupChatRequest {
    pub creator_id: Uuid,
    pub name: String,
    pub participant_ids: Vec<Uuid>,
}

pub struct ChatServiceDependencies {
    pub chat_repository: Arc<dyn ChatRepository>,
    pub user_repository: Arc<dyn UserRepository>,
    pub gateway: Arc<EventGateway>,
    pub clock: Arc<dyn Clock>,
}

pub struct ChatService {
    deps: ChatServiceDependencies,
}

impl ChatService {
    pub fn new(deps: ChatServiceDependencies) -> Self {
        Self { deps }
    }

    /// 获取或创建两人单聊。
    ///
    /// 返回 `(chat, created)`；仅在新建时向对端扇出 `new-chat`。
    pub async fn open_direct_chat(
        &self,
        request: OpenDirectChatRequest,
    ) -> Result<(Chat, bool), ApplicationError> {
        let initiator_id = UserId::from(request.initiator_id);
        let receiver_id = UserId::from(request.receiver_id);

        self.deps
            .user_repository
            .find_by_id(receiver_id)
            .await?
            .ok_or(DomainError::UserNotFound)?;

        if initiator_id == receiver_id {
            return Err(DomainError::SelfChatNotAllowed.into());
        }

        if let Some(existing) = self
            .deps
            .chat_repository
            .find_direct_between(initiator_id, receiver_id)
            .await?
        {
            return Ok((existing, false));
        }

        let chat = Chat::new_direct(
            ChatId::from(Uuid::new_v4()),
            initiator_id,
            receiver_id,
            self.deps.clock.now(),
        )?;
        let chat = self.deps.chat_repository.create(chat).await?;

        self.notify_participants(&chat, initiator_id).await;

        tracing::info!(chat_id = %chat.id, initiator = %initiator_id, receiver = %receiver_id, "direct chat created");
        Ok((chat, true))
    }

    /// 创建群聊，创建者担任管理员。
    pub async fn create_group_chat(
        &self,
        request: CreateGroupChatRequest,
    ) -> Result<Chat, ApplicationError> {
        let creator_id = UserId::from(request.creator_id);
        let members: Vec<UserId> = request
            .participant_ids
            .into_iter()
            .map(UserId::from)
            .collect();

        for member in &members {
            self.deps
                .user_repository
                .find_by_id(*member)
                .await?
                .ok_or(DomainError::UserNotFound)?;
        }

        let chat = Chat::new_group(
            ChatId::from(Uuid::new_v4()),
            request.name,
            creator_id,
            members,
            self.deps.clock.now(),
        )?;
        let chat = self.deps.chat_repository.create(chat).await?;

        self.notify_participants(&chat, creator_id).await;

        tracing::info!(chat_id = %chat.id, creator = %creator_id, "group chat created");
        Ok(chat)
    }

    /// 用户参与的会话列表，按最近更新时间倒序。
    pub async fn list_chats(&self, user_id: Uuid) -> Result<Vec<Chat>, ApplicationError> {
        Ok(self
            .deps
            .chat_repository
            .list_for_user(UserId::from(user_id))
            .await?)
    }

    /// 向除发起者以外的所有参与者扇出 new-chat。推送是尽力而为，
    /// 不影响请求结果。
    async fn notify_participants(&self, chat: &Chat, actor: UserId) {
        let payload = match serde_json::to_value(chat) {
            Ok(payload) => payload,
            Err(err) => {
                tracing::error!(chat_id = %chat.id, error = %err, "failed to serialize chat for fan-out");
                return;
            }
        };
        for participant in chat.other_participants(actor) {
            self.deps
                .gateway
                .dispatch(participant, EventKind::NewChat, payload.clone())
                .await;
        }
    }
}
