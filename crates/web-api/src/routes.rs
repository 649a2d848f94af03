use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{AppendHeaders, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use uuid::Uuid;
use validator::Validate;

use application::services::{
    CreateGroupChatRequest, DeleteMessageRequest, NewAttachment, OpenDirectChatRequest,
    RegisterUserRequest, SendMessageRequest,
};
use domain::{AttachmentKind, User};

use crate::{error::ApiError, state::AppState, websocket};

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct MobilePayload {
    #[validate(length(min = 7, max = 16))]
    mobile_number: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct VerifyOtpPayload {
    #[validate(length(min = 7, max = 16))]
    mobile_number: String,
    #[validate(length(min = 4, max = 8))]
    otp: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct RegisterPayload {
    #[validate(length(min = 1, max = 50))]
    username: String,
    #[validate(length(min = 7, max = 16))]
    mobile_number: String,
    #[validate(url)]
    avatar_url: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct GroupChatPayload {
    #[validate(length(min = 1, max = 100))]
    name: String,
    #[validate(length(min = 2))]
    participant_ids: Vec<Uuid>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AttachmentPayload {
    url: String,
    #[serde(rename = "type")]
    kind: Option<AttachmentKind>,
    filename: String,
    mime_type: Option<String>,
    size: Option<i64>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct SendMessagePayload {
    content: Option<String>,
    #[serde(default)]
    attachments: Vec<AttachmentPayload>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/healthcheck", get(healthcheck))
        .route("/otp/generate-otp", post(generate_otp))
        .route("/otp/verify-otp", post(verify_otp))
        .route("/otp/resend-otp", post(resend_otp))
        .route("/user/register", post(register_user))
        .route("/chat", get(list_chats))
        .route("/chat/c/{receiver_id}", post(open_direct_chat))
        .route("/chat/group", post(create_group_chat))
        .route("/message/{chat_id}", get(get_messages).post(send_message))
        .route("/message/{chat_id}/{message_id}", axum::routing::delete(delete_message))
        .route("/ws", get(websocket::handle_upgrade))
}

async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

fn validate<T: Validate>(payload: &T) -> Result<(), ApiError> {
    payload
        .validate()
        .map_err(|err| ApiError::bad_request(err.to_string()))
}

async fn generate_otp(
    State(state): State<AppState>,
    Json(payload): Json<MobilePayload>,
) -> Result<Json<serde_json::Value>, ApiError> {
    validate(&payload)?;
    let issued = state.otp_service.generate(&payload.mobile_number).await?;
    Ok(Json(otp_response(&state, issued)))
}

async fn resend_otp(
    State(state): State<AppState>,
    Json(payload): Json<MobilePayload>,
) -> Result<Json<serde_json::Value>, ApiError> {
    validate(&payload)?;
    let issued = state.otp_service.resend(&payload.mobile_number).await?;
    Ok(Json(otp_response(&state, issued)))
}

fn otp_response(state: &AppState, issued: application::services::IssuedOtp) -> serde_json::Value {
    if state.otp_echo_enabled {
        json!({ "otp": issued.code, "expiresAt": issued.expires_at })
    } else {
        json!({ "message": "OTP sent successfully" })
    }
}

async fn verify_otp(
    State(state): State<AppState>,
    Json(payload): Json<VerifyOtpPayload>,
) -> Result<Response, ApiError> {
    validate(&payload)?;
    let verification = state
        .otp_service
        .verify(&payload.mobile_number, &payload.otp)
        .await?;

    match verification.user {
        // 已注册用户直接登录
        Some(user) => {
            let (user, tokens) = issue_session(&state, user).await?;
            let body = json!({
                "isNewUser": false,
                "user": user,
                "accessToken": tokens.access_token,
                "refreshToken": tokens.refresh_token,
            });
            Ok((auth_cookies(&tokens), Json(body)).into_response())
        }
        // 新号码：放行注册
        None => {
            let body = json!({
                "isNewUser": true,
                "mobileNumber": verification.mobile_number,
            });
            Ok(Json(body).into_response())
        }
    }
}

async fn register_user(
    State(state): State<AppState>,
    Json(payload): Json<RegisterPayload>,
) -> Result<Response, ApiError> {
    validate(&payload)?;
    let user = state
        .user_service
        .register(RegisterUserRequest {
            username: payload.username,
            mobile_number: payload.mobile_number,
            avatar_url: payload.avatar_url,
        })
        .await?;

    let (user, tokens) = issue_session(&state, user).await?;
    let body = json!({
        "user": user,
        "accessToken": tokens.access_token,
        "refreshToken": tokens.refresh_token,
    });
    Ok((StatusCode::CREATED, auth_cookies(&tokens), Json(body)).into_response())
}

/// 签发令牌对并把刷新令牌落库。
async fn issue_session(
    state: &AppState,
    user: User,
) -> Result<(User, crate::auth::TokenPair), ApiError> {
    let tokens = state.jwt_service.issue_pair(&user)?;
    let user = state
        .user_service
        .store_refresh_token(user.id, &tokens.refresh_token)
        .await?;
    Ok((user, tokens))
}

fn auth_cookies(
    tokens: &crate::auth::TokenPair,
) -> AppendHeaders<[(header::HeaderName, String); 2]> {
    AppendHeaders([
        (
            header::SET_COOKIE,
            format!(
                "accessToken={}; HttpOnly; Secure; SameSite=Lax; Path=/",
                tokens.access_token
            ),
        ),
        (
            header::SET_COOKIE,
            format!(
                "refreshToken={}; HttpOnly; Secure; SameSite=Lax; Path=/",
                tokens.refresh_token
            ),
        ),
    ])
}

async fn list_chats(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<domain::Chat>>, ApiError> {
    let user_id = state.jwt_service.extract_user_from_headers(&headers)?;
    let chats = state.chat_service.list_chats(user_id.0).await?;
    Ok(Json(chats))
}

async fn open_direct_chat(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(receiver_id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let user_id = state.jwt_service.extract_user_from_headers(&headers)?;
    let (chat, created) = state
        .chat_service
        .open_direct_chat(OpenDirectChatRequest {
            initiator_id: user_id.0,
            receiver_id,
        })
        .await?;

    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(chat)).into_response())
}

async fn create_group_chat(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<GroupChatPayload>,
) -> Result<(StatusCode, Json<domain::Chat>), ApiError> {
    let user_id = state.jwt_service.extract_user_from_headers(&headers)?;
    validate(&payload)?;
    let chat = state
        .chat_service
        .create_group_chat(CreateGroupChatRequest {
            creator_id: user_id.0,
            name: payload.name,
            participant_ids: payload.participant_ids,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(chat)))
}

async fn get_messages(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(chat_id): Path<Uuid>,
) -> Result<Json<Vec<domain::ChatMessage>>, ApiError> {
    let user_id = state.jwt_service.extract_user_from_headers(&headers)?;
    let messages = state
        .message_service
        .list_messages(chat_id, user_id.0)
        .await?;
    Ok(Json(messages))
}

async fn send_message(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(chat_id): Path<Uuid>,
    Json(payload): Json<SendMessagePayload>,
) -> Result<(StatusCode, Json<domain::ChatMessage>), ApiError> {
    let user_id = state.jwt_service.extract_user_from_headers(&headers)?;
    let message = state
        .message_service
        .send_message(SendMessageRequest {
            chat_id,
            sender_id: user_id.0,
            content: payload.content,
            attachments: payload
                .attachments
                .into_iter()
                .map(|attachment| NewAttachment {
                    url: attachment.url,
                    kind: attachment.kind,
                    filename: attachment.filename,
                    mime_type: attachment.mime_type,
                    size: attachment.size,
                })
                .collect(),
        })
        .await?;
    Ok((StatusCode::CREATED, Json(message)))
}

async fn delete_message(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((chat_id, message_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let user_id = state.jwt_service.extract_user_from_headers(&headers)?;
    state
        .message_service
        .delete_message(DeleteMessageRequest {
            chat_id,
            message_id,
            requester_id: user_id.0,
        })
        .await?;
    Ok(Json(json!({ "chatId": chat_id, "messageId": message_id })))
}
