use async_trait::async_trait;
use domain::{
    Chat, ChatId, ChatMessage, MessageId, MobileNumber, OtpChallenge, RepositoryError, Timestamp,
    User, UserId,
};
use uuid::Uuid;

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, user: User) -> Result<User, RepositoryError>;
    async fn update(&self, user: User) -> Result<User, RepositoryError>;
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError>;
    async fn find_by_mobile(
        &self,
        mobile_number: &MobileNumber,
    ) -> Result<Option<User>, RepositoryError>;
}

#[async_trait]
pub trait ChatRepository: Send + Sync {
    async fn create(&self, chat: Chat) -> Result<Chat, RepositoryError>;
    async fn update(&self, chat: Chat) -> Result<Chat, RepositoryError>;
    async fn find_by_id(&self, id: ChatId) -> Result<Option<Chat>, RepositoryError>;
    /// 查找两人之间已存在的单聊（与参数顺序无关）。
    async fn find_direct_between(
        &self,
        a: UserId,
        b: UserId,
    ) -> Result<Option<Chat>, RepositoryError>;
    /// 用户参与的所有会话，按最近更新时间倒序。
    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Chat>, RepositoryError>;
}

#[async_trait]
pub trait MessageRepository: Send + Sync {
    async fn create(&self, message: ChatMessage) -> Result<ChatMessage, RepositoryError>;
    async fn update(&self, message: ChatMessage) -> Result<ChatMessage, RepositoryError>;
    async fn find_by_id(&self, id: MessageId) -> Result<Option<ChatMessage>, RepositoryError>;
    /// 会话内全部消息，按创建时间倒序。
    async fn list_for_chat(&self, chat_id: ChatId) -> Result<Vec<ChatMessage>, RepositoryError>;
    /// 会话内最新的一条消息（删除后重新指向 last_message 用）。
    async fn find_latest(&self, chat_id: ChatId) -> Result<Option<ChatMessage>, RepositoryError>;
    async fn delete(&self, id: MessageId) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait OtpRepository: Send + Sync {
    async fn create(&self, challenge: OtpChallenge) -> Result<OtpChallenge, RepositoryError>;
    async fn update(&self, challenge: OtpChallenge) -> Result<OtpChallenge, RepositoryError>;
    /// 该手机号当前未过期、未核销的挑战。
    async fn find_active(
        &self,
        mobile_number: &MobileNumber,
        now: Timestamp,
    ) -> Result<Option<OtpChallenge>, RepositoryError>;
    /// 该手机号已核销（等待注册消费）的挑战。
    async fn find_verified(
        &self,
        mobile_number: &MobileNumber,
    ) -> Result<Option<OtpChallenge>, RepositoryError>;
    async fn delete(&self, id: Uuid) -> Result<(), RepositoryError>;
    /// 删除该手机号名下的全部挑战。
    async fn purge(&self, mobile_number: &MobileNumber) -> Result<(), RepositoryError>;
}
