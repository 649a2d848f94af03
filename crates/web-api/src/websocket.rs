//! WebSocket 网关接入
//!
//! 连接生命周期：Connecting -> Authenticated -> Closed。升级完成后先
//! 走认证序列（凭证缺失或校验失败都会在关闭前推送一条
//! connection-error），认证通过才挂载到事件网关；断开时无条件卸载，
//! 恰好一次。

use axum::{
    extract::{
        ws::{Message as WsMessage, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::HeaderMap,
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;

use application::EventGateway;
use domain::{ConnectionId, Envelope, EventKind, UserId};

use crate::auth::credential_from_headers;
use crate::state::AppState;

/// 握手查询参数里的凭证字段。
#[derive(Debug, Deserialize)]
pub(crate) struct WsQuery {
    token: Option<String>,
}

/// 客户端入站帧：`{"event": ..., "payload": ...}`。
#[derive(Debug, Deserialize)]
struct ClientFrame {
    event: EventKind,
    #[serde(default)]
    payload: serde_json::Value,
}

pub(crate) async fn handle_upgrade(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(query): Query<WsQuery>,
    headers: HeaderMap,
) -> Response {
    // 凭证来源：握手 token 字段，否则 Cookie / Authorization 头
    let credential = query.token.or_else(|| credential_from_headers(&headers));
    ws.on_upgrade(move |socket| handle_socket(socket, state, credential))
}

async fn handle_socket(socket: WebSocket, state: AppState, credential: Option<String>) {
    // Connecting：认证完成前不接入网关
    let Some(token) = credential else {
        reject(socket, "No authentication token provided").await;
        return;
    };

    let user_id = match tokio::time::timeout(state.auth_timeout, state.verifier.verify(&token))
        .await
    {
        Ok(Ok(user_id)) => user_id,
        Ok(Err(err)) => {
            reject(socket, &err.to_string()).await;
            return;
        }
        Err(_) => {
            reject(socket, "Authentication timed out").await;
            return;
        }
    };

    // Authenticated：注册连接并开始收发
    let connection_id = ConnectionId::generate();
    let (tx, mut rx) = mpsc::unbounded_channel::<Envelope>();
    state.gateway.attach(user_id, connection_id, tx).await;

    let (mut sender, mut receiver) = socket.split();
    let (pong_tx, mut pong_rx) = mpsc::channel::<Vec<u8>>(8);

    let mut send_task = tokio::spawn(async move {
        loop {
            tokio::select! {
                envelope = rx.recv() => {
                    let Some(envelope) = envelope else { break };
                    match serde_json::to_string(&envelope) {
                        Ok(text) => {
                            if sender.send(WsMessage::Text(text.into())).await.is_err() {
                                break;
                            }
                        }
                        Err(err) => {
                            tracing::warn!(error = %err, "failed to serialize outbound envelope");
                        }
                    }
                }
                pong = pong_rx.recv() => {
                    let Some(data) = pong else { break };
                    if sender.send(WsMessage::Pong(data.into())).await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    let recv_gateway = state.gateway.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(message) = receiver.next().await {
            match message {
                Ok(WsMessage::Text(text)) => {
                    handle_client_frame(&recv_gateway, user_id, text.as_str()).await;
                }
                Ok(WsMessage::Ping(data)) => {
                    if pong_tx.send(data.to_vec()).await.is_err() {
                        break;
                    }
                }
                Ok(WsMessage::Pong(_)) => {}
                Ok(WsMessage::Binary(_)) => {
                    tracing::debug!(connection_id = %connection_id, "binary frames are not supported");
                }
                Ok(WsMessage::Close(_)) => break,
                Err(err) => {
                    tracing::debug!(connection_id = %connection_id, error = %err, "websocket transport error");
                    break;
                }
            }
        }
    });

    // 任一方向结束即视为断开
    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    // Closed：注册表清理无条件执行，且只执行一次
    state.gateway.detach(user_id, connection_id).await;
}

/// 处理认证后客户端发来的帧。单条消息的处理失败只影响它自己，
/// 不会终止连接。
async fn handle_client_frame(gateway: &EventGateway, sender_id: UserId, raw: &str) {
    let frame: ClientFrame = match serde_json::from_str(raw) {
        Ok(frame) => frame,
        Err(err) => {
            tracing::debug!(sender_id = %sender_id, error = %err, "dropping unparseable client frame");
            return;
        }
    };

    match frame.event {
        EventKind::PrivateMessage => match frame.payload.as_str() {
            // 载荷本身是序列化后的字符串，由网关再解析一层
            Some(raw_relay) => gateway.relay_private_message(sender_id, raw_relay).await,
            None => {
                tracing::debug!(sender_id = %sender_id, "private message payload must be a string");
            }
        },
        other => {
            tracing::debug!(sender_id = %sender_id, event = other.as_str(), "ignoring client event");
        }
    }
}

/// 认证失败：推送一条 connection-error 后关闭。
async fn reject(mut socket: WebSocket, reason: &str) {
    tracing::warn!(reason, "websocket connection rejected");
    let envelope = Envelope::connection_error(reason);
    if let Ok(text) = serde_json::to_string(&envelope) {
        let _ = socket.send(WsMessage::Text(text.into())).await;
    }
    let _ = socket.send(WsMessage::Close(None)).await;
}
