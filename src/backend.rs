use thiserror::Error;

use crate::types::{
    AuthState, Chat, ChatId, ChatList, ConnectionParameters, File, FileId, Message, MessageId,
    PageRequest, ReplyInfo,
};

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("url error: {0}")]
    Url(#[from] url::ParseError),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("connection closed")]
    Closed,
    #[error("{message} (code {code})")]
    Td { code: i32, message: String },
}

/// Operations the authorization loop and the history walk need from the
/// messaging library. Every call is a suspension point with no timeout of
/// its own.
#[allow(async_fn_in_trait)]
pub trait Backend {
    async fn authorization_state(&mut self) -> Result<AuthState, BackendError>;

    async fn check_encryption_key(&mut self) -> Result<(), BackendError>;

    async fn set_parameters(&mut self, parameters: &ConnectionParameters) -> Result<(), BackendError>;

    async fn set_phone_number(&mut self, phone_number: &str) -> Result<(), BackendError>;

    async fn check_password(&mut self, password: &str) -> Result<(), BackendError>;

    async fn check_code(&mut self, code: &str) -> Result<(), BackendError>;

    async fn log_out(&mut self) -> Result<(), BackendError>;

    async fn set_log_verbosity(&mut self, level: i32) -> Result<(), BackendError>;

    async fn get_chat(&mut self, chat_id: ChatId) -> Result<Chat, BackendError>;

    async fn get_chats(&mut self, list: ChatList, limit: i32) -> Result<Vec<ChatId>, BackendError>;

    async fn get_chat_history(
        &mut self,
        chat_id: ChatId,
        request: PageRequest,
    ) -> Result<Vec<Message>, BackendError>;

    async fn get_message(&mut self, chat_id: ChatId, message_id: MessageId) -> Result<Message, BackendError>;

    async fn get_message_thread(
        &mut self,
        chat_id: ChatId,
        message_id: MessageId,
    ) -> Result<ReplyInfo, BackendError>;

    async fn get_message_thread_history(
        &mut self,
        chat_id: ChatId,
        message_id: MessageId,
        request: PageRequest,
    ) -> Result<Vec<Message>, BackendError>;

    /// Starts a download and waits until the file is fully fetched.
    async fn download_file(&mut self, file_id: FileId, priority: i32) -> Result<File, BackendError>;
}
