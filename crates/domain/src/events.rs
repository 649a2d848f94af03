//! 实时事件定义
//!
//! 网关推送给客户端的事件是一个封闭枚举；载荷是原样转发的 JSON 值，
//! 不同事件种类各自约定结构。

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 网关事件种类。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventKind {
    /// 新会话创建
    NewChat,
    /// 收到新消息
    MessageReceived,
    /// 消息被删除
    MessageDeleted,
    /// 用户间直传消息
    PrivateMessage,
    /// 连接级错误（载荷为纯字符串）
    ConnectionError,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::NewChat => "new-chat",
            EventKind::MessageReceived => "message-received",
            EventKind::MessageDeleted => "message-deleted",
            EventKind::PrivateMessage => "private-message",
            EventKind::ConnectionError => "connection-error",
        }
    }
}

/// 推送到单个连接上的线格式：`{"event": ..., "payload": ...}`。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub event: EventKind,
    pub payload: Value,
}

impl Envelope {
    pub fn new(event: EventKind, payload: Value) -> Self {
        Self { event, payload }
    }

    pub fn connection_error(message: impl Into<String>) -> Self {
        Self {
            event: EventKind::ConnectionError,
            payload: Value::String(message.into()),
        }
    }
}
