//! 仓储的内存实现（用于测试和本地开发）。

use std::collections::HashMap;

use async_trait::async_trait;
use domain::{
    Chat, ChatId, ChatMessage, MessageId, MobileNumber, OtpChallenge, RepositoryError, Timestamp,
    User, UserId,
};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::repository::{ChatRepository, MessageRepository, OtpRepository, UserRepository};

#[derive(Default)]
pub struct MemoryUserRepository {
    users: RwLock<HashMap<UserId, User>>,
}

impl MemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn create(&self, user: User) -> Result<User, RepositoryError> {
        let mut users = self.users.write().await;
        if users
            .values()
            .any(|existing| existing.mobile_number == user.mobile_number)
        {
            return Err(RepositoryError::Conflict);
        }
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update(&self, user: User) -> Result<User, RepositoryError> {
        let mut users = self.users.write().await;
        if !users.contains_key(&user.id) {
            return Err(RepositoryError::NotFound);
        }
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn find_by_mobile(
        &self,
        mobile_number: &MobileNumber,
    ) -> Result<Option<User>, RepositoryError> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|user| &user.mobile_number == mobile_number)
            .cloned())
    }
}

#[derive(Default)]
pub struct MemoryChatRepository {
    chats: RwLock<HashMap<ChatId, Chat>>,
}

impl MemoryChatRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ChatRepository for MemoryChatRepository {
    async fn create(&self, chat: Chat) -> Result<Chat, RepositoryError> {
        let mut chats = self.chats.write().await;
        if chats.contains_key(&chat.id) {
            return Err(RepositoryError::Conflict);
        }
        chats.insert(chat.id, chat.clone());
        Ok(chat)
    }

    async fn update(&self, chat: Chat) -> Result<Chat, RepositoryError> {
        let mut chats = self.chats.write().await;
        if !chats.contains_key(&chat.id) {
            return Err(RepositoryError::NotFound);
        }
        chats.insert(chat.id, chat.clone());
        Ok(chat)
    }

    async fn find_by_id(&self, id: ChatId) -> Result<Option<Chat>, RepositoryError> {
        Ok(self.chats.read().await.get(&id).cloned())
    }

    async fn find_direct_between(
        &self,
        a: UserId,
        b: UserId,
    ) -> Result<Option<Chat>, RepositoryError> {
        Ok(self
            .chats
            .read()
            .await
            .values()
            .find(|chat| {
                !chat.is_group && chat.is_participant(a) && chat.is_participant(b)
            })
            .cloned())
    }

    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Chat>, RepositoryError> {
        let mut chats: Vec<Chat> = self
            .chats
            .read()
            .await
            .values()
            .filter(|chat| chat.is_participant(user_id))
            .cloned()
            .collect();
        chats.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(chats)
    }
}

#[derive(Default)]
pub struct MemoryMessageRepository {
    messages: RwLock<HashMap<MessageId, ChatMessage>>,
}

impl MemoryMessageRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MessageRepository for MemoryMessageRepository {
    async fn create(&self, message: ChatMessage) -> Result<ChatMessage, RepositoryError> {
        let mut messages = self.messages.write().await;
        if messages.contains_key(&message.id) {
            return Err(RepositoryError::Conflict);
        }
        messages.insert(message.id, message.clone());
        Ok(message)
    }

    async fn update(&self, message: ChatMessage) -> Result<ChatMessage, RepositoryError> {
        let mut messages = self.messages.write().await;
        if !messages.contains_key(&message.id) {
            return Err(RepositoryError::NotFound);
        }
        messages.insert(message.id, message.clone());
        Ok(message)
    }

    async fn find_by_id(&self, id: MessageId) -> Result<Option<ChatMessage>, RepositoryError> {
        Ok(self.messages.read().await.get(&id).cloned())
    }

    async fn list_for_chat(&self, chat_id: ChatId) -> Result<Vec<ChatMessage>, RepositoryError> {
        let mut messages: Vec<ChatMessage> = self
            .messages
            .read()
            .await
            .values()
            .filter(|message| message.chat_id == chat_id)
            .cloned()
            .collect();
        messages.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(messages)
    }

    async fn find_latest(
        &self,
        chat_id: ChatId,
    ) -> Result<Option<ChatMessage>, RepositoryError> {
        Ok(self
            .messages
            .read()
            .await
            .values()
            .filter(|message| message.chat_id == chat_id)
            .max_by_key(|message| message.created_at)
            .cloned())
    }

    async fn delete(&self, id: MessageId) -> Result<(), RepositoryError> {
        self.messages.write().await.remove(&id);
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryOtpRepository {
    challenges: RwLock<HashMap<Uuid, OtpChallenge>>,
}

impl MemoryOtpRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OtpRepository for MemoryOtpRepository {
    async fn create(&self, challenge: OtpChallenge) -> Result<OtpChallenge, RepositoryError> {
        self.challenges
            .write()
            .await
            .insert(challenge.id, challenge.clone());
        Ok(challenge)
    }

    async fn update(&self, challenge: OtpChallenge) -> Result<OtpChallenge, RepositoryError> {
        let mut challenges = self.challenges.write().await;
        if !challenges.contains_key(&challenge.id) {
            return Err(RepositoryError::NotFound);
        }
        challenges.insert(challenge.id, challenge.clone());
        Ok(challenge)
    }

    async fn find_active(
        &self,
        mobile_number: &MobileNumber,
        now: Timestamp,
    ) -> Result<Option<OtpChallenge>, RepositoryError> {
        Ok(self
            .challenges
            .read()
            .await
            .values()
            .find(|challenge| &challenge.mobile_number == mobile_number && challenge.is_live(now))
            .cloned())
    }

    async fn find_verified(
        &self,
        mobile_number: &MobileNumber,
    ) -> Result<Option<OtpChallenge>, RepositoryError> {
        Ok(self
            .challenges
            .read()
            .await
            .values()
            .find(|challenge| &challenge.mobile_number == mobile_number && challenge.is_verified)
            .cloned())
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepositoryError> {
        self.challenges.write().await.remove(&id);
        Ok(())
    }

    async fn purge(&self, mobile_number: &MobileNumber) -> Result<(), RepositoryError> {
        self.challenges
            .write()
            .await
            .retain(|_, challenge| &challenge.mobile_number != mobile_number);
        Ok(())
    }
}
