use std::sync::Arc;
use std::time::Duration;

use application::{ChatService, EventGateway, MessageService, OtpService, TokenVerifier, UserService};

use crate::JwtService;

#[derive(Clone)]
pub struct AppState {
    pub otp_service: Arc<OtpService>,
    pub user_service: Arc<UserService>,
    pub chat_service: Arc<ChatService>,
    pub message_service: Arc<MessageService>,
    pub gateway: Arc<EventGateway>,
    pub jwt_service: Arc<JwtService>,
    pub verifier: Arc<dyn TokenVerifier>,
    /// 开发环境把验证码回显到响应里
    pub otp_echo_enabled: bool,
    /// WebSocket 认证往返的时间上限
    pub auth_timeout: Duration,
}
