mod chat_service;
mod message_service;
mod otp_service;
mod user_service;

pub use chat_service::{
    ChatService, ChatServiceDependencies, CreateGroupChatRequest, OpenDirectChatRequest,
};
pub use message_service::{
    DeleteMessageRequest, MessageService, MessageServiceDependencies, NewAttachment,
    SendMessageRequest,
};
pub use otp_service::{IssuedOtp, OtpPolicy, OtpService, OtpServiceDependencies, OtpVerification};
pub use user_service::{RegisterUserRequest, UserService, UserServiceDependencies};
