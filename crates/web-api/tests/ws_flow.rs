mod support;

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use reqwest::Client;
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio_tungstenite::{
    connect_async, tungstenite::Message as TungsteniteMessage, MaybeTlsStream, WebSocketStream,
};
use uuid::Uuid;

use support::{register_user, spawn_server, TestServer};

type Ws = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn connect_ws(server: &TestServer, token: &str) -> Ws {
    let url = server.ws(&format!("/api/v1/ws?token={token}"));
    let (ws, _) = connect_async(url).await.expect("ws connect");
    ws
}

/// 读取下一条文本帧并解析成 JSON。
async fn next_event(ws: &mut Ws) -> Value {
    loop {
        let message = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("timed out waiting for ws event")
            .expect("ws stream ended")
            .expect("ws transport error");
        if let TungsteniteMessage::Text(payload) = message {
            return serde_json::from_str(payload.as_str()).expect("event json");
        }
    }
}

/// 断言在给定时间内没有任何文本帧到达。
async fn expect_silence(ws: &mut Ws, millis: u64) {
    let outcome = tokio::time::timeout(Duration::from_millis(millis), ws.next()).await;
    match outcome {
        Err(_) => {}
        Ok(Some(Ok(TungsteniteMessage::Text(payload)))) => {
            panic!("unexpected event: {payload}")
        }
        Ok(_) => {}
    }
}

#[tokio::test]
async fn chat_and_message_events_fan_out_to_every_device() {
    let server = spawn_server().await;
    let client = Client::new();

    let (alice, alice_token) = register_user(&client, &server, "alice", "+8613900000001").await;
    let (_bob, bob_token) = register_user(&client, &server, "bob", "+8613900000002").await;
    let alice_id = alice["id"].as_str().unwrap();

    // alice 两台设备在线，bob 一台
    let mut alice_phone = connect_ws(&server, &alice_token).await;
    let mut alice_laptop = connect_ws(&server, &alice_token).await;
    let mut bob_ws = connect_ws(&server, &bob_token).await;

    // bob 发起单聊：alice 的两台设备都收到 new-chat，bob 自己没有
    let chat = client
        .post(server.http(&format!("/api/v1/chat/c/{alice_id}")))
        .header("authorization", format!("Bearer {bob_token}"))
        .send()
        .await
        .expect("create chat")
        .json::<Value>()
        .await
        .expect("chat json");
    let chat_id = chat["id"].as_str().expect("chat id");

    for ws in [&mut alice_phone, &mut alice_laptop] {
        let event = next_event(ws).await;
        assert_eq!(event["event"], "new-chat");
        assert_eq!(event["payload"]["id"], chat_id);
    }
    expect_silence(&mut bob_ws, 300).await;

    // bob 发消息：alice 的两台设备都收到 message-received
    let message = client
        .post(server.http(&format!("/api/v1/message/{chat_id}")))
        .header("authorization", format!("Bearer {bob_token}"))
        .json(&json!({ "content": "hello" }))
        .send()
        .await
        .expect("send message")
        .json::<Value>()
        .await
        .expect("message json");
    let message_id = message["id"].as_str().expect("message id");

    for ws in [&mut alice_phone, &mut alice_laptop] {
        let event = next_event(ws).await;
        assert_eq!(event["event"], "message-received");
        assert_eq!(event["payload"]["id"], message_id);
        assert_eq!(event["payload"]["content"], "hello");
    }
    expect_silence(&mut bob_ws, 300).await;

    // bob 删除消息：alice 收到 message-deleted
    client
        .delete(server.http(&format!("/api/v1/message/{chat_id}/{message_id}")))
        .header("authorization", format!("Bearer {bob_token}"))
        .send()
        .await
        .expect("delete message");

    for ws in [&mut alice_phone, &mut alice_laptop] {
        let event = next_event(ws).await;
        assert_eq!(event["event"], "message-deleted");
        assert_eq!(event["payload"]["messageId"], message_id);
        assert_eq!(event["payload"]["chatId"], chat_id);
    }
}

#[tokio::test]
async fn missing_token_gets_exactly_one_connection_error() {
    let server = spawn_server().await;

    let (mut ws, _) = connect_async(server.ws("/api/v1/ws"))
        .await
        .expect("ws connects before auth");

    let event = next_event(&mut ws).await;
    assert_eq!(event["event"], "connection-error");
    assert_eq!(event["payload"], "No authentication token provided");

    // 错误之后连接关闭
    loop {
        match tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("server should close the socket")
        {
            Some(Ok(TungsteniteMessage::Close(_))) | None => break,
            Some(Ok(_)) => continue,
            Some(Err(_)) => break,
        }
    }
}

#[tokio::test]
async fn auth_failure_on_one_connection_leaves_others_untouched() {
    let server = spawn_server().await;
    let client = Client::new();

    let (_carol, carol_token) = register_user(&client, &server, "carol", "+8613900000003").await;
    let (_dave, dave_token) = register_user(&client, &server, "dave", "+8613900000004").await;
    let carol_id = _carol["id"].as_str().unwrap();

    // 有效连接先建立
    let mut carol_ws = connect_ws(&server, &carol_token).await;

    // 伪造令牌的连接只收到 connection-error
    let mut bad_ws = connect_ws(&server, "not-a-real-token").await;
    let event = next_event(&mut bad_ws).await;
    assert_eq!(event["event"], "connection-error");
    assert!(event["payload"]
        .as_str()
        .unwrap()
        .starts_with("Invalid access token"));

    // carol 不受影响：dave 发起会话，事件照常送达
    client
        .post(server.http(&format!("/api/v1/chat/c/{carol_id}")))
        .header("authorization", format!("Bearer {dave_token}"))
        .send()
        .await
        .expect("create chat");

    let event = next_event(&mut carol_ws).await;
    assert_eq!(event["event"], "new-chat");
}

#[tokio::test]
async fn deleted_user_token_is_rejected_with_user_not_found() {
    let server = spawn_server().await;
    let client = Client::new();

    // 语法正确但指向不存在用户的令牌：用另一个服务器实例签发
    let other_server = spawn_server().await;
    let (_ghost, ghost_token) =
        register_user(&client, &other_server, "ghost", "+8613900000009").await;
    drop(other_server);

    let mut ws = connect_ws(&server, &ghost_token).await;
    let event = next_event(&mut ws).await;
    assert_eq!(event["event"], "connection-error");
    assert_eq!(event["payload"], "Unauthorized: User not found");
}

#[tokio::test]
async fn private_messages_relay_to_target_and_echo_to_sender() {
    let server = spawn_server().await;
    let client = Client::new();

    let (alice, alice_token) = register_user(&client, &server, "alice", "+8613900000001").await;
    let (bob, bob_token) = register_user(&client, &server, "bob", "+8613900000002").await;
    let (_carol, carol_token) = register_user(&client, &server, "carol", "+8613900000003").await;
    let alice_id = alice["id"].as_str().unwrap();
    let bob_id = bob["id"].as_str().unwrap();

    let mut alice_phone = connect_ws(&server, &alice_token).await;
    let mut alice_laptop = connect_ws(&server, &alice_token).await;
    let mut bob_ws = connect_ws(&server, &bob_token).await;
    let mut carol_ws = connect_ws(&server, &carol_token).await;

    // 载荷是序列化后的字符串，和客户端约定一致
    let relay_payload = json!({ "message": "psst", "id": alice_id }).to_string();
    let frame = json!({ "event": "private-message", "payload": relay_payload }).to_string();
    bob_ws
        .send(TungsteniteMessage::Text(frame.into()))
        .await
        .expect("send private message");

    for ws in [&mut alice_phone, &mut alice_laptop, &mut bob_ws] {
        let event = next_event(ws).await;
        assert_eq!(event["event"], "private-message");
        assert_eq!(event["payload"]["senderId"], bob_id);
        assert_eq!(event["payload"]["message"], "psst");
    }
    expect_silence(&mut carol_ws, 300).await;
}

#[tokio::test]
async fn malformed_private_messages_are_dropped_without_killing_the_connection() {
    let server = spawn_server().await;
    let client = Client::new();

    let (alice, alice_token) = register_user(&client, &server, "alice", "+8613900000001").await;
    let alice_id = alice["id"].as_str().unwrap().to_string();

    let mut ws = connect_ws(&server, &alice_token).await;

    // 各种畸形输入：连接必须活着，且不产生任何事件
    for bad in [
        "not json at all".to_string(),
        json!({ "event": "private-message", "payload": "not json" }).to_string(),
        json!({ "event": "private-message", "payload": { "message": "obj" } }).to_string(),
        json!({ "event": "private-message", "payload": "{\"message\":\"x\"}" }).to_string(),
    ] {
        ws.send(TungsteniteMessage::Text(bad.into()))
            .await
            .expect("send");
    }
    expect_silence(&mut ws, 300).await;

    // 连接仍可用：一条合法的自我私信还能送达
    let relay_payload = json!({ "message": "still alive", "id": alice_id }).to_string();
    let frame = json!({ "event": "private-message", "payload": relay_payload }).to_string();
    ws.send(TungsteniteMessage::Text(frame.into()))
        .await
        .expect("send");

    let event = next_event(&mut ws).await;
    assert_eq!(event["event"], "private-message");
    assert_eq!(event["payload"]["message"], "still alive");
}

#[tokio::test]
async fn closed_connections_stop_receiving_and_rest_stays_healthy() {
    let server = spawn_server().await;
    let client = Client::new();

    let (alice, alice_token) = register_user(&client, &server, "alice", "+8613900000001").await;
    let (_bob, bob_token) = register_user(&client, &server, "bob", "+8613900000002").await;
    let alice_id = alice["id"].as_str().unwrap();

    let mut alice_ws = connect_ws(&server, &alice_token).await;

    let chat = client
        .post(server.http(&format!("/api/v1/chat/c/{alice_id}")))
        .header("authorization", format!("Bearer {bob_token}"))
        .send()
        .await
        .expect("create chat")
        .json::<Value>()
        .await
        .expect("chat json");
    let chat_id = chat["id"].as_str().unwrap();

    let event = next_event(&mut alice_ws).await;
    assert_eq!(event["event"], "new-chat");

    // alice 下线
    alice_ws.close(None).await.expect("close ws");
    tokio::time::sleep(Duration::from_millis(200)).await;

    // 发给离线用户是静默 no-op，REST 请求照常成功
    let response = client
        .post(server.http(&format!("/api/v1/message/{chat_id}")))
        .header("authorization", format!("Bearer {bob_token}"))
        .json(&json!({ "content": "are you there?" }))
        .send()
        .await
        .expect("send message");
    assert_eq!(response.status(), 201);

    // 重连后没有历史事件回放，投递至多一次
    let mut alice_again = connect_ws(&server, &alice_token).await;
    expect_silence(&mut alice_again, 300).await;
}
