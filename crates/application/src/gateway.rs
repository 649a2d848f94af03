//! 事件网关
//!
//! 持有连接注册表和每个连接的出站发送端，对请求处理层暴露唯一的
//! 扇出入口 `dispatch`，并承担用户间直传消息的转发。网关本身不做
//! 凭证解码，认证序列由 WebSocket 处理器驱动（见 web-api）。

use std::collections::HashMap;

use domain::{ConnectionId, Envelope, EventKind, UserId};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

use crate::registry::ConnectionRegistry;

/// 客户端直传消息的载荷：序列化后的字符串
/// `{"message": "...", "id": "<目标用户>"}`。
#[derive(Debug, Deserialize)]
struct PrivateRelay {
    message: String,
    id: Uuid,
}

pub struct EventGateway {
    registry: ConnectionRegistry,
    senders: RwLock<HashMap<ConnectionId, mpsc::UnboundedSender<Envelope>>>,
}

impl EventGateway {
    pub fn new(registry: ConnectionRegistry) -> Self {
        Self {
            registry,
            senders: RwLock::new(HashMap::new()),
        }
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    /// 连接通过认证后挂载：注册到注册表并安装出站发送端。
    pub async fn attach(
        &self,
        user_id: UserId,
        connection_id: ConnectionId,
        sender: mpsc::UnboundedSender<Envelope>,
    ) {
        self.registry.register(user_id, connection_id).await;
        self.senders.write().await.insert(connection_id, sender);
        let online_users = self.registry.online_user_count().await;
        tracing::info!(
            user_id = %user_id,
            connection_id = %connection_id,
            online_users,
            "connection attached"
        );
    }

    /// 连接断开时卸载。必须且只会由连接的清理路径调用一次；认证未
    /// 完成时从未挂载过，则两步都是 no-op。
    pub async fn detach(&self, user_id: UserId, connection_id: ConnectionId) {
        self.registry.remove(user_id, connection_id).await;
        self.senders.write().await.remove(&connection_id);
        tracing::info!(
            user_id = %user_id,
            connection_id = %connection_id,
            "connection detached"
        );
    }

    /// 把一个事件扇出到目标用户的所有在线连接。
    ///
    /// 目标不在线时静默返回（离线是常态，不是错误）；单个连接推送
    /// 失败只记录并跳过，既不影响其余连接也不向调用方抛出。
    pub async fn dispatch(&self, user_id: UserId, event: EventKind, payload: Value) {
        let targets = self.registry.lookup(user_id).await;
        if targets.is_empty() {
            tracing::debug!(user_id = %user_id, event = event.as_str(), "no live connections");
            return;
        }

        let senders = self.senders.read().await;
        for connection_id in targets {
            let Some(sender) = senders.get(&connection_id) else {
                tracing::warn!(
                    connection_id = %connection_id,
                    "registered connection has no sender"
                );
                continue;
            };
            if sender
                .send(Envelope::new(event, payload.clone()))
                .is_err()
            {
                tracing::warn!(
                    user_id = %user_id,
                    connection_id = %connection_id,
                    event = event.as_str(),
                    "failed to push event, connection is going away"
                );
            }
        }
    }

    /// 转发用户间直传消息：推送给目标用户的所有连接，并回显给发送者
    /// 自己的所有设备。载荷解析失败直接丢弃，不升级为连接级错误。
    pub async fn relay_private_message(&self, sender_id: UserId, raw_payload: &str) {
        let relay: PrivateRelay = match serde_json::from_str(raw_payload) {
            Ok(relay) => relay,
            Err(err) => {
                tracing::debug!(
                    sender_id = %sender_id,
                    error = %err,
                    "dropping malformed private message"
                );
                return;
            }
        };

        let target = UserId::from(relay.id);
        let payload = json!({
            "senderId": sender_id,
            "message": relay.message,
        });

        self.dispatch(target, EventKind::PrivateMessage, payload.clone())
            .await;
        // 发送者的其他设备也要看到这条消息
        if target != sender_id {
            self.dispatch(sender_id, EventKind::PrivateMessage, payload)
                .await;
        }
    }
}
