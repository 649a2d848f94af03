use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use application::memory::{
    MemoryChatRepository, MemoryMessageRepository, MemoryOtpRepository, MemoryUserRepository,
};
use application::services::{
    ChatServiceDependencies, MessageServiceDependencies, OtpPolicy, OtpServiceDependencies,
    UserServiceDependencies,
};
use application::{
    ChatService, Clock, ConnectionRegistry, EventGateway, MessageService, OtpRateLimiter,
    OtpService, SmsError, SmsSender, SystemClock, UserService,
};
use axum::Router;
use domain::MobileNumber;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::time::sleep;
use web_api::{router as build_router_fn, AppState, JwtConfig, JwtService, JwtTokenVerifier};

// 测试环境不真正发短信
pub struct TestSmsSender;

#[async_trait::async_trait]
impl SmsSender for TestSmsSender {
    async fn send_code(&self, _to: &MobileNumber, _code: &str) -> Result<(), SmsError> {
        Ok(())
    }
}

pub fn build_router() -> Router {
    let user_repository = Arc::new(MemoryUserRepository::new());
    let chat_repository = Arc::new(MemoryChatRepository::new());
    let message_repository = Arc::new(MemoryMessageRepository::new());
    let otp_repository = Arc::new(MemoryOtpRepository::new());
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let gateway = Arc::new(EventGateway::new(ConnectionRegistry::new()));

    let jwt_service = Arc::new(JwtService::new(JwtConfig {
        access_secret: "test-access-secret-key-with-32-chars!".to_string(),
        refresh_secret: "test-refresh-secret-key-with-32-chars".to_string(),
        access_expiry_hours: 24,
        refresh_expiry_days: 7,
    }));
    let verifier = Arc::new(JwtTokenVerifier::new(
        jwt_service.clone(),
        user_repository.clone(),
    ));

    let otp_service = Arc::new(OtpService::new(
        OtpServiceDependencies {
            otp_repository: otp_repository.clone(),
            user_repository: user_repository.clone(),
            sms_sender: Arc::new(TestSmsSender),
            rate_limiter: Arc::new(OtpRateLimiter::with_defaults()),
            clock: clock.clone(),
        },
        OtpPolicy::default(),
    ));
    let user_service = Arc::new(UserService::new(UserServiceDependencies {
        user_repository: user_repository.clone(),
        otp_repository,
        clock: clock.clone(),
    }));
    let chat_service = Arc::new(ChatService::new(ChatServiceDependencies {
        chat_repository: chat_repository.clone(),
        user_repository: user_repository.clone(),
        gateway: gateway.clone(),
        clock: clock.clone(),
    }));
    let message_service = Arc::new(MessageService::new(MessageServiceDependencies {
        chat_repository,
        message_repository,
        gateway: gateway.clone(),
        clock,
    }));

    let state = AppState {
        otp_service,
        user_service,
        chat_service,
        message_service,
        gateway,
        jwt_service,
        verifier,
        otp_echo_enabled: true,
        auth_timeout: Duration::from_secs(5),
    };

    build_router_fn(state)
}

pub struct TestServer {
    pub addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
}

impl TestServer {
    pub fn http(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn ws(&self, path: &str) -> String {
        format!("ws://{}{}", self.addr, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
    }
}

pub async fn spawn_server() -> TestServer {
    let router = build_router();
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    tokio::spawn(async move {
        axum::serve(listener, router.into_make_service())
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await
            .ok();
    });

    // allow server to start
    sleep(Duration::from_millis(100)).await;

    TestServer {
        addr,
        shutdown: Some(shutdown_tx),
    }
}

/// 完整注册流程：OTP 签发 -> 校验 -> 注册，返回 `(user, access_token)`。
pub async fn register_user(
    client: &reqwest::Client,
    server: &TestServer,
    username: &str,
    mobile_number: &str,
) -> (serde_json::Value, String) {
    let issued = client
        .post(server.http("/api/v1/otp/generate-otp"))
        .json(&serde_json::json!({ "mobileNumber": mobile_number }))
        .send()
        .await
        .expect("generate otp")
        .json::<serde_json::Value>()
        .await
        .expect("otp json");
    let otp = issued["otp"].as_str().expect("otp echoed in tests");

    let verified = client
        .post(server.http("/api/v1/otp/verify-otp"))
        .json(&serde_json::json!({ "mobileNumber": mobile_number, "otp": otp }))
        .send()
        .await
        .expect("verify otp")
        .json::<serde_json::Value>()
        .await
        .expect("verify json");
    assert_eq!(verified["isNewUser"], true, "expected a fresh number");

    let registered = client
        .post(server.http("/api/v1/user/register"))
        .json(&serde_json::json!({ "username": username, "mobileNumber": mobile_number }))
        .send()
        .await
        .expect("register")
        .json::<serde_json::Value>()
        .await
        .expect("register json");

    let token = registered["accessToken"]
        .as_str()
        .unwrap_or_else(|| panic!("registration failed: {registered:?}"))
        .to_string();
    (registered["user"].clone(), token)
}
