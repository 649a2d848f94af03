//! 基础设施层。
//!
//! PostgreSQL 仓储实现和短信发送适配器。

pub mod db;
pub mod sms;

pub use db::repositories::{
    PgChatRepository, PgMessageRepository, PgOtpRepository, PgUserRepository,
};
pub use db::{create_pg_pool, DbPool};
pub use sms::{ConsoleSmsSender, HttpSmsSender};
