use crate::api::models::ChatId;
use crate::api::stream::StreamState;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChatError {
    /// Transport failure or a non-2xx response.
    #[error("network error: {0}")]
    Network(String),

    #[error("chat {0} not found")]
    NotFound(ChatId),

    /// A frame was offered to the message stream while it was not open.
    #[error("message stream is {0}, frame not sent")]
    Protocol(StreamState),

    /// A newer activation started before this one resolved.
    #[error("activation of chat {0} was superseded")]
    Superseded(ChatId),

    #[error("invalid response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),

    #[error("config error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for ChatError {
    fn from(err: reqwest::Error) -> Self {
        ChatError::Network(err.to_string())
    }
}

impl From<tokio::task::JoinError> for ChatError {
    fn from(err: tokio::task::JoinError) -> Self {
        ChatError::Network(format!("request task failed: {err}"))
    }
}

impl ChatError {
    /// Maps an HTTP status to the error a failed request reports.
    pub fn from_status(status: reqwest::StatusCode, chat_id: Option<ChatId>) -> Self {
        match chat_id {
            Some(id) if status == reqwest::StatusCode::NOT_FOUND => ChatError::NotFound(id),
            _ => ChatError::Network(format!("HTTP {}", status)),
        }
    }
}
