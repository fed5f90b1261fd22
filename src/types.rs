use serde::{Deserialize, Serialize};

pub type ChatId = i64;
pub type MessageId = i64;
pub type FileId = i32;

/// Authorization progress as reported by `getAuthorizationState`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "@type")]
pub enum AuthState {
    #[serde(rename = "authorizationStateWaitEncryptionKey")]
    WaitEncryptionKey {
        #[serde(default)]
        is_encrypted: bool,
    },
    #[serde(rename = "authorizationStateWaitTdlibParameters")]
    WaitTdlibParameters,
    #[serde(rename = "authorizationStateWaitPhoneNumber")]
    WaitPhoneNumber,
    #[serde(rename = "authorizationStateWaitPassword")]
    WaitPassword {
        #[serde(default)]
        password_hint: String,
    },
    #[serde(rename = "authorizationStateWaitCode")]
    WaitCode,
    #[serde(rename = "authorizationStateReady")]
    Ready,
    #[serde(rename = "authorizationStateClosed")]
    Closed,
    #[serde(rename = "authorizationStateLoggingOut")]
    LoggingOut,
    #[serde(other)]
    Unknown,
}

/// Static parameters sent in reply to `authorizationStateWaitTdlibParameters`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionParameters {
    pub database_directory: String,
    pub files_directory: String,
    pub use_file_database: bool,
    pub use_chat_info_database: bool,
    pub use_message_database: bool,
    pub use_secret_chats: bool,
    pub api_id: i32,
    pub api_hash: String,
    pub system_language_code: String,
    pub device_model: String,
    pub application_version: String,
    pub enable_storage_optimizer: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatList {
    Main,
    Archive,
}

impl ChatList {
    pub fn type_name(self) -> &'static str {
        match self {
            ChatList::Main => "chatListMain",
            ChatList::Archive => "chatListArchive",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Chat {
    pub id: ChatId,
    #[serde(default)]
    pub title: String,
    #[serde(rename = "type", default)]
    pub chat_type: ChatType,
    #[serde(default)]
    pub last_message: Option<Message>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(tag = "@type")]
pub enum ChatType {
    #[serde(rename = "chatTypePrivate")]
    Private,
    #[serde(rename = "chatTypeBasicGroup")]
    BasicGroup,
    #[serde(rename = "chatTypeSupergroup")]
    Supergroup {
        #[serde(default)]
        is_channel: bool,
    },
    #[serde(rename = "chatTypeSecret")]
    Secret,
    #[default]
    #[serde(other)]
    Other,
}

impl ChatType {
    pub fn label(&self) -> &'static str {
        match self {
            ChatType::Private => "private",
            ChatType::BasicGroup => "group",
            ChatType::Supergroup { is_channel: true } => "channel",
            ChatType::Supergroup { is_channel: false } => "supergroup",
            ChatType::Secret => "secret",
            ChatType::Other => "other",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub content: MessageContent,
    #[serde(default)]
    pub can_get_message_thread: bool,
}

impl Message {
    pub fn has_reply_thread(&self) -> bool {
        self.can_get_message_thread
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "@type")]
pub enum MessageContent {
    #[serde(rename = "messageText")]
    Text { text: FormattedText },
    #[serde(rename = "messagePhoto")]
    Photo {
        photo: Photo,
        #[serde(default)]
        caption: FormattedText,
    },
    #[serde(rename = "messageVideo")]
    Video {
        video: Video,
        #[serde(default)]
        caption: FormattedText,
    },
    #[serde(rename = "messageVideoNote")]
    VideoNote { video_note: VideoNote },
    #[serde(other)]
    Other,
}

impl MessageContent {
    pub fn kind(&self) -> &'static str {
        match self {
            MessageContent::Text { .. } => "messageText",
            MessageContent::Photo { .. } => "messagePhoto",
            MessageContent::Video { .. } => "messageVideo",
            MessageContent::VideoNote { .. } => "messageVideoNote",
            MessageContent::Other => "messageOther",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct FormattedText {
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Photo {
    #[serde(default)]
    pub sizes: Vec<PhotoSize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PhotoSize {
    pub photo: File,
    #[serde(default)]
    pub width: i32,
    #[serde(default)]
    pub height: i32,
}

impl PhotoSize {
    pub fn area(&self) -> i64 {
        self.width as i64 * self.height as i64
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Video {
    #[serde(default)]
    pub duration: i32,
    pub video: File,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct VideoNote {
    #[serde(default)]
    pub duration: i32,
    pub video: File,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct File {
    pub id: FileId,
    #[serde(default)]
    pub size: i64,
    #[serde(default)]
    pub local: LocalFile,
}

impl File {
    pub fn is_downloaded(&self) -> bool {
        self.local.is_downloading_completed
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct LocalFile {
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub is_downloading_completed: bool,
}

/// Reply statistics of a message thread; seeds thread pagination.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct ReplyInfo {
    #[serde(default)]
    pub reply_count: i32,
    #[serde(default)]
    pub last_message_id: MessageId,
}

/// A `(from_message_id, offset, limit)` history request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub from_message_id: MessageId,
    pub offset: i32,
    pub limit: i32,
}
