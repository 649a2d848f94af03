//! 连接注册表
//!
//! 维护用户身份到其全部在线连接的映射，是实时层唯一的共享可变状态。
//! 注册表由进程启动时显式构造并注入网关，不做任何持久化：进程重启后
//! 为空，客户端需要重连来重新注册。

use std::collections::{HashMap, HashSet};

use domain::{ConnectionId, UserId};
use tokio::sync::RwLock;

/// 用户 -> 在线连接集合。
///
/// 不变式：映射中出现的用户其连接集合一定非空；最后一个连接移除时
/// 整个条目一并删除，不会留下空集合。
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: RwLock<HashMap<UserId, HashSet<ConnectionId>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
        }
    }

    /// 注册一个连接。重复注册同一 (user, connection) 是幂等的。
    pub async fn register(&self, user_id: UserId, connection_id: ConnectionId) {
        let mut connections = self.connections.write().await;
        let added = connections
            .entry(user_id)
            .or_default()
            .insert(connection_id);
        if added {
            tracing::debug!(
                user_id = %user_id,
                connection_id = %connection_id,
                "connection registered"
            );
        }
    }

    /// 移除一个连接。用户或连接不存在时是 no-op，不是错误。
    pub async fn remove(&self, user_id: UserId, connection_id: ConnectionId) {
        let mut connections = self.connections.write().await;
        if let Some(set) = connections.get_mut(&user_id) {
            set.remove(&connection_id);
            if set.is_empty() {
                connections.remove(&user_id);
            }
            tracing::debug!(
                user_id = %user_id,
                connection_id = %connection_id,
                "connection removed"
            );
        }
    }

    /// 该用户当前全部在线连接的快照。
    pub async fn lookup(&self, user_id: UserId) -> Vec<ConnectionId> {
        let connections = self.connections.read().await;
        connections
            .get(&user_id)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    pub async fn is_online(&self, user_id: UserId) -> bool {
        let connections = self.connections.read().await;
        connections.contains_key(&user_id)
    }

    /// 当前至少有一个连接在线的用户数。
    pub async fn online_user_count(&self) -> usize {
        self.connections.read().await.len()
    }
}
