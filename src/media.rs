use crate::backend::{Backend, BackendError};
use crate::types::{File, FileId, FormattedText, MessageContent, PhotoSize};

pub const DOWNLOAD_PRIORITY: i32 = 32;
pub const PREVIEW_LENGTH: usize = 24;

pub const LABEL_SKIPPED: &str = "skipped download";
pub const LABEL_PRESENT: &str = "already downloaded";
pub const LABEL_DOWNLOADED: &str = "downloaded";

/// What to do with one message's media, decided from its content alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub target: Option<FileId>,
    pub label: String,
}

impl Resolution {
    fn none(label: impl Into<String>) -> Self {
        Self {
            target: None,
            label: label.into(),
        }
    }
}

pub fn resolve(content: &MessageContent, download: bool) -> Resolution {
    match content {
        MessageContent::Video { video, .. } => resolve_file(&video.video, download),
        MessageContent::VideoNote { video_note } => resolve_file(&video_note.video, download),
        MessageContent::Photo { photo, .. } => match largest_size(&photo.sizes) {
            Some(size) => resolve_file(&size.photo, download),
            None => Resolution::none(""),
        },
        MessageContent::Text { text } => Resolution::none(preview(text)),
        MessageContent::Other => Resolution::none(""),
    }
}

fn resolve_file(file: &File, download: bool) -> Resolution {
    if !download {
        Resolution::none(LABEL_SKIPPED)
    } else if file.is_downloaded() {
        Resolution::none(LABEL_PRESENT)
    } else {
        Resolution {
            target: Some(file.id),
            label: LABEL_DOWNLOADED.to_string(),
        }
    }
}

/// Resolves the policy and, when it names a file, waits for the download.
pub async fn apply<B: Backend>(
    backend: &mut B,
    content: &MessageContent,
    download: bool,
) -> Result<String, BackendError> {
    let resolution = resolve(content, download);
    if let Some(file_id) = resolution.target {
        let file = backend.download_file(file_id, DOWNLOAD_PRIORITY).await?;
        log::debug!("file {} ({} bytes) stored at {}", file.id, file.size, file.local.path);
    }
    Ok(resolution.label)
}

/// Short description of the media shown before the download label.
pub fn caption(content: &MessageContent) -> Option<String> {
    match content {
        MessageContent::Video { video, caption } => Some(format!("[{}s] {}", video.duration, preview(caption))),
        MessageContent::VideoNote { video_note } => Some(format!("[{}s]", video_note.duration)),
        MessageContent::Photo { photo, caption } => Some(match largest_size(&photo.sizes) {
            Some(size) => format!("[{}x{}] {}", size.width, size.height, preview(caption)),
            None => preview(caption),
        }),
        MessageContent::Text { .. } | MessageContent::Other => None,
    }
}

pub fn largest_size(sizes: &[PhotoSize]) -> Option<&PhotoSize> {
    sizes.iter().max_by_key(|size| size.area())
}

pub fn preview(text: &FormattedText) -> String {
    text.text
        .replace("\r\n", " ")
        .replace('\n', " ")
        .chars()
        .take(PREVIEW_LENGTH)
        .collect()
}
