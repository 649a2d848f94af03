use serde::{Deserialize, Serialize};

use crate::errors::DomainError;
use crate::value_objects::{ChatId, MessageId, Timestamp, UserId};

/// 会话：单聊或群聊。
///
/// 单聊恰好有两个参与者且没有管理员概念；群聊由创建者担任管理员。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chat {
    pub id: ChatId,
    pub name: String,
    pub is_group: bool,
    pub participants: Vec<UserId>,
    pub admin: Option<UserId>,
    pub last_message: Option<MessageId>,
    pub avatar_url: Option<String>,
    pub description: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Chat {
    pub fn new_direct(
        id: ChatId,
        initiator: UserId,
        receiver: UserId,
        now: Timestamp,
    ) -> Result<Self, DomainError> {
        if initiator == receiver {
            return Err(DomainError::SelfChatNotAllowed);
        }
        Ok(Self {
            id,
            name: "one on one chat".to_string(),
            is_group: false,
            participants: vec![initiator, receiver],
            admin: Some(initiator),
            last_message: None,
            avatar_url: None,
            description: None,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn new_group(
        id: ChatId,
        name: impl Into<String>,
        admin: UserId,
        mut members: Vec<UserId>,
        now: Timestamp,
    ) -> Result<Self, DomainError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DomainError::invalid_argument("name", "cannot be empty"));
        }

        members.retain(|member| *member != admin);
        members.sort_unstable_by_key(|member| member.0);
        members.dedup();
        // 群聊除创建者外至少需要两名成员
        if members.len() < 2 {
            return Err(DomainError::invalid_argument(
                "participants",
                "a group chat needs at least two other members",
            ));
        }

        let mut participants = vec![admin];
        participants.extend(members);

        Ok(Self {
            id,
            name,
            is_group: true,
            participants,
            admin: Some(admin),
            last_message: None,
            avatar_url: None,
            description: None,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn is_participant(&self, user_id: UserId) -> bool {
        self.participants.contains(&user_id)
    }

    /// 除指定用户以外的所有参与者（用于事件扇出）。
    pub fn other_participants(&self, user_id: UserId) -> Vec<UserId> {
        self.participants
            .iter()
            .copied()
            .filter(|participant| *participant != user_id)
            .collect()
    }

    pub fn record_message(&mut self, message_id: MessageId, now: Timestamp) {
        self.last_message = Some(message_id);
        self.updated_at = now;
    }

    pub fn clear_last_message(&mut self, now: Timestamp) {
        self.last_message = None;
        self.updated_at = now;
    }
}
