use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tracing::error;

pub type ServiceResult<T> = Result<T, AppError>;
pub type ServiceResponse<T> = ServiceResult<Json<T>>;

#[track_caller]
pub fn unexpected<T, E: Into<anyhow::Error>>(e: E) -> ServiceResult<T> {
    let caller = std::panic::Location::caller();
    error!("An unexpected error has occurred at {caller}: {}", e.into());
    Err(AppError::Unexpected)
}

/// WebSocket close code for a failed authentication.
pub const CLOSE_UNAUTHENTICATED: u16 = 4001;
/// WebSocket close code for an authenticated user lacking access to the resource.
pub const CLOSE_FORBIDDEN: u16 = 4003;
/// WebSocket close code for a resource that does not exist.
pub const CLOSE_NOT_FOUND: u16 = 4004;
/// WebSocket close code for everything else (RFC 6455 "internal error").
pub const CLOSE_INTERNAL_ERROR: u16 = 1011;

#[derive(Debug, PartialEq, Eq)]
pub enum AppError {
    Unexpected,
    Unauthorized,
    DecodingRequestFailed,

    AdminForbidden,
    AdminLogSourceNotFound,

    BrandsNotFound,

    ConversationsNotFound,
    ConversationsForbidden,
    ConversationsSelfConversation,
    ConversationsOwnBrand,
    ConversationsInvalidFilter,

    FramesInvalidJson,
    FramesUnknownType,
    FramesInvalidFrame,

    MessagesMissingContent,
    MessagesInvalidImage,

    RoomsNotFound,
    RoomsForbidden,

    SessionsInvalidCredentials,
    SessionsLoginForbidden,
    SessionsNotFound,

    TweetQueueForbidden,

    UsersNotFound,
}

impl<E: Into<anyhow::Error>> From<E> for AppError {
    #[track_caller]
    fn from(e: E) -> Self {
        unexpected::<(), E>(e).unwrap_err()
    }
}

impl AppError {
    pub const fn code(&self) -> &'static str {
        match self {
            AppError::Unexpected => "unexpected",
            AppError::Unauthorized => "unauthorized",
            AppError::DecodingRequestFailed => "decoding_request_failed",

            AppError::AdminForbidden => "admin.forbidden",
            AppError::AdminLogSourceNotFound => "admin.log_source_not_found",

            AppError::BrandsNotFound => "brands.not_found",

            AppError::ConversationsNotFound => "conversations.not_found",
            AppError::ConversationsForbidden => "conversations.forbidden",
            AppError::ConversationsSelfConversation => "conversations.self_conversation",
            AppError::ConversationsOwnBrand => "conversations.own_brand",
            AppError::ConversationsInvalidFilter => "conversations.invalid_filter",

            AppError::FramesInvalidJson => "frames.invalid_json",
            AppError::FramesUnknownType => "frames.unknown_type",
            AppError::FramesInvalidFrame => "frames.invalid_frame",

            AppError::MessagesMissingContent => "messages.missing_content",
            AppError::MessagesInvalidImage => "messages.invalid_image",

            AppError::RoomsNotFound => "rooms.not_found",
            AppError::RoomsForbidden => "rooms.forbidden",

            AppError::SessionsInvalidCredentials => "sessions.invalid_credentials",
            AppError::SessionsLoginForbidden => "sessions.login_forbidden",
            AppError::SessionsNotFound => "sessions.not_found",

            AppError::TweetQueueForbidden => "tweet_queue.forbidden",

            AppError::UsersNotFound => "users.not_found",
        }
    }

    pub const fn message(&self) -> &'static str {
        match self {
            AppError::Unexpected => "An unexpected error has occurred.",
            AppError::Unauthorized => "Authentication credentials were not provided or are invalid.",
            AppError::DecodingRequestFailed => "Failed to decode request",

            AppError::AdminForbidden => "Only staff members can access the log stream.",
            AppError::AdminLogSourceNotFound => "Unknown log source.",

            AppError::BrandsNotFound => "Brand not found.",

            AppError::ConversationsNotFound => "Conversation not found.",
            AppError::ConversationsForbidden => "You are not a participant of this conversation.",
            AppError::ConversationsSelfConversation => {
                "You cannot start a conversation with yourself."
            }
            AppError::ConversationsOwnBrand => "You cannot start a conversation with your own brand.",
            AppError::ConversationsInvalidFilter => "Conversation type must be `creators` or `brands`.",

            AppError::FramesInvalidJson => "Invalid JSON format.",
            AppError::FramesUnknownType => "Unknown message type.",
            AppError::FramesInvalidFrame => "The message is missing required fields.",

            AppError::MessagesMissingContent => "Message content is required.",
            AppError::MessagesInvalidImage => "The attached image could not be processed.",

            AppError::RoomsNotFound => "Chat room not found.",
            AppError::RoomsForbidden => "You do not have access to this chat room.",

            AppError::SessionsInvalidCredentials => {
                "You have entered an invalid username or password."
            }
            AppError::SessionsLoginForbidden => "Your account is not allowed to login.",
            AppError::SessionsNotFound => "Your session has expired. Please log in again.",

            AppError::TweetQueueForbidden => "You do not have access to this tweet queue.",

            AppError::UsersNotFound => "This user does not exist.",
        }
    }

    pub const fn http_status_code(&self) -> StatusCode {
        match self {
            AppError::DecodingRequestFailed
            | AppError::ConversationsSelfConversation
            | AppError::ConversationsOwnBrand
            | AppError::ConversationsInvalidFilter
            | AppError::FramesInvalidJson
            | AppError::FramesUnknownType
            | AppError::FramesInvalidFrame
            | AppError::MessagesMissingContent
            | AppError::MessagesInvalidImage => StatusCode::BAD_REQUEST,

            AppError::Unauthorized
            | AppError::SessionsInvalidCredentials
            | AppError::SessionsNotFound => StatusCode::UNAUTHORIZED,

            AppError::AdminForbidden
            | AppError::ConversationsForbidden
            | AppError::RoomsForbidden
            | AppError::SessionsLoginForbidden
            | AppError::TweetQueueForbidden => StatusCode::FORBIDDEN,

            AppError::AdminLogSourceNotFound
            | AppError::BrandsNotFound
            | AppError::ConversationsNotFound
            | AppError::RoomsNotFound
            | AppError::UsersNotFound => StatusCode::NOT_FOUND,

            AppError::Unexpected => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Close code sent when this error rejects a WebSocket connection.
    pub fn ws_close_code(&self) -> u16 {
        let status = self.http_status_code();
        if status == StatusCode::UNAUTHORIZED {
            CLOSE_UNAUTHENTICATED
        } else if status == StatusCode::FORBIDDEN {
            CLOSE_FORBIDDEN
        } else if status == StatusCode::NOT_FOUND {
            CLOSE_NOT_FOUND
        } else {
            CLOSE_INTERNAL_ERROR
        }
    }

    pub const fn response_parts(&self) -> (StatusCode, Json<ErrorResponse>) {
        let status = self.http_status_code();
        let response = ErrorResponse {
            code: self.code(),
            message: self.message(),
        };
        (status, Json(response))
    }
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub code: &'static str,
    pub message: &'static str,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.response_parts().into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn close_codes_follow_status() {
        assert_eq!(AppError::Unauthorized.ws_close_code(), CLOSE_UNAUTHENTICATED);
        assert_eq!(AppError::SessionsNotFound.ws_close_code(), CLOSE_UNAUTHENTICATED);
        assert_eq!(AppError::ConversationsForbidden.ws_close_code(), CLOSE_FORBIDDEN);
        assert_eq!(AppError::RoomsNotFound.ws_close_code(), CLOSE_NOT_FOUND);
        assert_eq!(AppError::Unexpected.ws_close_code(), CLOSE_INTERNAL_ERROR);
    }

    #[test]
    fn foreign_errors_become_unexpected() {
        let error: AppError = anyhow::anyhow!("boom").into();
        assert_eq!(error, AppError::Unexpected);
        assert_eq!(error.http_status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
