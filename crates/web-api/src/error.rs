use application::ApplicationError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorBody,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorBody {
                code,
                message: message.into(),
            },
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "BAD_REQUEST", message)
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", message)
    }
}

impl From<ApplicationError> for ApiError {
    fn from(error: ApplicationError) -> Self {
        use domain::DomainError;

        match error {
            ApplicationError::Domain(DomainError::InvalidArgument { field, reason }) => {
                ApiError::new(
                    StatusCode::BAD_REQUEST,
                    "INVALID_ARGUMENT",
                    format!("{}: {}", field, reason),
                )
            }
            ApplicationError::Domain(DomainError::UserNotFound) => ApiError::new(
                StatusCode::NOT_FOUND,
                "USER_NOT_FOUND",
                "user does not exist",
            ),
            ApplicationError::Domain(DomainError::UserAlreadyExists) => ApiError::new(
                StatusCode::BAD_REQUEST,
                "USER_EXISTS",
                "User already exists",
            ),
            ApplicationError::Domain(DomainError::MobileNotVerified) => ApiError::new(
                StatusCode::BAD_REQUEST,
                "MOBILE_NOT_VERIFIED",
                "Mobile number not verified",
            ),
            ApplicationError::Domain(DomainError::ChatNotFound) => ApiError::new(
                StatusCode::NOT_FOUND,
                "CHAT_NOT_FOUND",
                "Chat does not exist",
            ),
            ApplicationError::Domain(DomainError::NotAChatParticipant) => ApiError::new(
                StatusCode::BAD_REQUEST,
                "NOT_CHAT_PARTICIPANT",
                "User is not part of this chat",
            ),
            ApplicationError::Domain(DomainError::SelfChatNotAllowed) => ApiError::new(
                StatusCode::BAD_REQUEST,
                "SELF_CHAT",
                "You can't chat with yourself",
            ),
            ApplicationError::Domain(DomainError::MessageNotFound) => ApiError::new(
                StatusCode::NOT_FOUND,
                "MESSAGE_NOT_FOUND",
                "message not found",
            ),
            ApplicationError::Domain(DomainError::NotMessageSender) => ApiError::new(
                StatusCode::FORBIDDEN,
                "NOT_MESSAGE_SENDER",
                "only the sender can delete a message",
            ),
            ApplicationError::Domain(DomainError::EmptyMessage) => ApiError::new(
                StatusCode::BAD_REQUEST,
                "EMPTY_MESSAGE",
                "Message must have either content or at least one attachment",
            ),
            ApplicationError::Domain(DomainError::OtpInvalid) => ApiError::new(
                StatusCode::BAD_REQUEST,
                "OTP_INVALID",
                "Invalid OTP or OTP has expired",
            ),
            ApplicationError::Domain(DomainError::OtpStillPending) => ApiError::new(
                StatusCode::TOO_MANY_REQUESTS,
                "OTP_PENDING",
                "Please wait before requesting new OTP",
            ),
            ApplicationError::Domain(DomainError::OperationNotAllowed) => ApiError::new(
                StatusCode::FORBIDDEN,
                "OPERATION_NOT_ALLOWED",
                "operation not allowed",
            ),
            ApplicationError::Repository(repo_err) => match repo_err {
                domain::RepositoryError::NotFound => ApiError::new(
                    StatusCode::NOT_FOUND,
                    "NOT_FOUND",
                    "requested resource not found",
                ),
                domain::RepositoryError::Conflict => {
                    ApiError::new(StatusCode::CONFLICT, "CONFLICT", "resource already exists")
                }
                domain::RepositoryError::Storage { message } => ApiError::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    format!("database error: {}", message),
                ),
            },
            ApplicationError::Sms(_) => ApiError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "SMS_ERROR",
                "Failed to send OTP",
            ),
            ApplicationError::RateLimited(_) => ApiError::new(
                StatusCode::TOO_MANY_REQUESTS,
                "RATE_LIMITED",
                "Too many OTP requests. Please try again later.",
            ),
            ApplicationError::Infrastructure(message) => ApiError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "INFRASTRUCTURE_ERROR",
                message,
            ),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}
