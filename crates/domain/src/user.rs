use serde::{Deserialize, Serialize};

use crate::value_objects::{MobileNumber, Timestamp, UserId, Username};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: Username,
    pub mobile_number: MobileNumber,
    pub avatar_url: Option<String>,
    #[serde(skip_serializing, default)] // 刷新令牌不暴露给客户端
    pub refresh_token: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl User {
    pub fn register(
        id: UserId,
        username: Username,
        mobile_number: MobileNumber,
        avatar_url: Option<String>,
        now: Timestamp,
    ) -> Self {
        Self {
            id,
            username,
            mobile_number,
            avatar_url,
            refresh_token: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn set_refresh_token(&mut self, token: impl Into<String>, now: Timestamp) {
        self.refresh_token = Some(token.into());
        self.updated_at = now;
    }

    pub fn clear_refresh_token(&mut self, now: Timestamp) {
        self.refresh_token = None;
        self.updated_at = now;
    }
}
