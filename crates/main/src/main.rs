//! 主应用程序入口
//!
//! 组装依赖并启动 Axum Web API 服务。

use std::sync::Arc;
use std::time::Duration;

use application::services::{
    ChatServiceDependencies, MessageServiceDependencies, OtpPolicy, OtpServiceDependencies,
    UserServiceDependencies,
};
use application::{
    ChatService, Clock, ConnectionRegistry, EventGateway, MessageService, OtpRateLimiter,
    OtpService, SmsSender, SystemClock, UserService,
};
use config::AppConfig;
use infrastructure::{
    create_pg_pool, ConsoleSmsSender, HttpSmsSender, PgChatRepository, PgMessageRepository,
    PgOtpRepository, PgUserRepository,
};
use tracing_subscriber::EnvFilter;
use web_api::{router, AppState, JwtService, JwtTokenVerifier};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 初始化日志
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = AppConfig::from_env_with_defaults();
    if let Err(err) = config.validate() {
        tracing::warn!(error = %err, "configuration failed production validation, continuing with dev settings");
    }

    tracing::info!(
        "连接数据库: {}",
        config.database.url.split('@').next_back().unwrap_or("unknown")
    );
    let pg_pool = create_pg_pool(&config.database.url, config.database.max_connections).await?;

    // 运行迁移
    sqlx::migrate!("../../migrations").run(&pg_pool).await?;

    // 仓储
    let user_repository = Arc::new(PgUserRepository::new(pg_pool.clone()));
    let chat_repository = Arc::new(PgChatRepository::new(pg_pool.clone()));
    let message_repository = Arc::new(PgMessageRepository::new(pg_pool.clone()));
    let otp_repository = Arc::new(PgOtpRepository::new(pg_pool));

    // 实时核心：注册表由这里显式构造并交给网关
    let gateway = Arc::new(EventGateway::new(ConnectionRegistry::new()));

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let jwt_service = Arc::new(JwtService::new(config.jwt.clone()));
    let verifier = Arc::new(JwtTokenVerifier::new(
        jwt_service.clone(),
        user_repository.clone(),
    ));

    // 凭证齐全走短信网关，否则验证码只打到日志
    let sms_sender: Arc<dyn SmsSender> = if config.sms.gateway_enabled() {
        tracing::info!("sms gateway enabled");
        Arc::new(HttpSmsSender::new(
            config.sms.api_base.clone(),
            config.sms.account_sid.clone().unwrap_or_default(),
            config.sms.auth_token.clone().unwrap_or_default(),
            config.sms.from_number.clone().unwrap_or_default(),
        ))
    } else {
        tracing::info!("sms gateway not configured, OTP codes will be logged");
        Arc::new(ConsoleSmsSender)
    };

    let rate_limiter = Arc::new(OtpRateLimiter::new(
        config.otp.rate_limit_max_requests,
        Duration::from_secs(config.otp.rate_limit_window_secs),
        Duration::from_secs(config.otp.rate_limit_block_secs),
    ));

    // 应用层服务
    let otp_service = Arc::new(OtpService::new(
        OtpServiceDependencies {
            otp_repository: otp_repository.clone(),
            user_repository: user_repository.clone(),
            sms_sender,
            rate_limiter,
            clock: clock.clone(),
        },
        OtpPolicy {
            code_length: config.otp.code_length,
            ttl: chrono::Duration::minutes(config.otp.ttl_minutes),
        },
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
        otp_echo_enabled: config.otp.echo_in_response,
        auth_timeout: Duration::from_secs(config.server.ws_auth_timeout_secs),
    };

    // 启动 Web 服务器
    let app = router(state);
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("聊天服务器启动在 http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
