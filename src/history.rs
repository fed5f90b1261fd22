use serde::Serialize;

use crate::backend::{Backend, BackendError};
use crate::media;
use crate::types::{ChatId, Message, MessageId, PageRequest};

pub const PAGE_SIZE: usize = 10;

/// Backward pagination over one message sequence, bounded by a budget.
///
/// The first request includes the anchor (`offset` -1); later requests
/// start strictly below the last id returned. The sequence ends at the
/// first empty page or once the budget is spent.
#[derive(Debug, Clone)]
pub struct Paginator {
    cursor: MessageId,
    budget: usize,
    collected: usize,
    exhausted: bool,
}

impl Paginator {
    pub fn new(anchor: MessageId, budget: usize) -> Self {
        Self {
            cursor: anchor,
            budget,
            collected: 0,
            exhausted: false,
        }
    }

    pub fn next_request(&self) -> Option<PageRequest> {
        if self.exhausted || self.collected >= self.budget {
            return None;
        }
        Some(PageRequest {
            from_message_id: self.cursor,
            offset: if self.collected == 0 { -1 } else { 0 },
            limit: PAGE_SIZE.min(self.budget - self.collected) as i32,
        })
    }

    /// Takes the page returned for the last request and yields the messages
    /// to visit, or `None` once history is exhausted.
    pub fn advance(&mut self, mut page: Vec<Message>) -> Option<Vec<Message>> {
        let Some(last) = page.last().map(|message| message.id) else {
            self.exhausted = true;
            return None;
        };
        if self.collected > 0 && last >= self.cursor {
            log::warn!("history page did not move past message {}, stopping", self.cursor);
            self.exhausted = true;
            return None;
        }
        page.truncate(self.budget - self.collected);
        self.cursor = page.last().map_or(last, |message| message.id);
        self.collected += page.len();
        Some(page)
    }

    pub fn collected(&self) -> usize {
        self.collected
    }
}

/// Progress record emitted for every visited message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Visit {
    pub index: usize,
    pub budget: usize,
    pub thread_of: Option<MessageId>,
    pub message_id: MessageId,
    #[serde(flatten)]
    pub outcome: VisitOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum VisitOutcome {
    Seen {
        kind: &'static str,
        caption: Option<String>,
        label: String,
    },
    Skipped {
        reason: String,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TraversalReport {
    pub messages: usize,
    pub replies: usize,
    pub skipped: usize,
    pub abandoned_threads: usize,
}

struct Position {
    index: usize,
    budget: usize,
    thread_of: Option<MessageId>,
}

/// Walks a chat's history newest to oldest, at most `max` top-level
/// messages, descending into each reply thread on the way.
pub async fn walk_chat<B, F>(
    backend: &mut B,
    chat_id: ChatId,
    max: usize,
    download: bool,
    on_visit: F,
) -> Result<TraversalReport, BackendError>
where
    B: Backend,
    F: FnMut(&Visit),
{
    let mut walker = Walker {
        backend,
        download,
        on_visit,
        report: TraversalReport::default(),
    };
    walker.chat(chat_id, max).await?;
    Ok(walker.report)
}

struct Walker<'a, B, F> {
    backend: &'a mut B,
    download: bool,
    on_visit: F,
    report: TraversalReport,
}

impl<B: Backend, F: FnMut(&Visit)> Walker<'_, B, F> {
    async fn chat(&mut self, chat_id: ChatId, max: usize) -> Result<(), BackendError> {
        let chat = self.backend.get_chat(chat_id).await?;
        let Some(anchor) = chat.last_message.as_ref().map(|message| message.id) else {
            log::info!("chat {chat_id} has no messages");
            return Ok(());
        };

        let mut pages = Paginator::new(anchor, max);
        let mut index = 0;
        while let Some(request) = pages.next_request() {
            let page = self.backend.get_chat_history(chat_id, request).await?;
            let Some(page) = pages.advance(page) else {
                break;
            };
            for listed in page {
                let position = Position {
                    index,
                    budget: max,
                    thread_of: None,
                };
                let visited = self.visit(chat_id, listed.id, position).await;
                self.report.messages += 1;
                if let Some(message) = visited.filter(Message::has_reply_thread) {
                    if let Err(error) = self.thread(chat_id, message.id).await {
                        self.report.abandoned_threads += 1;
                        log::debug!("dropped thread of message {}: {error}", message.id);
                    }
                }
                index += 1;
            }
        }
        log::debug!("chat {chat_id}: collected {} of {max}", pages.collected());
        Ok(())
    }

    /// Replies are bounded by the thread's own reply count, not by the
    /// chat-level budget.
    async fn thread(&mut self, chat_id: ChatId, parent: MessageId) -> Result<(), BackendError> {
        let info = self.backend.get_message_thread(chat_id, parent).await?;
        let budget = info.reply_count.max(0) as usize;

        let mut pages = Paginator::new(info.last_message_id, budget);
        let mut index = 0;
        while let Some(request) = pages.next_request() {
            let page = self
                .backend
                .get_message_thread_history(chat_id, parent, request)
                .await?;
            let Some(page) = pages.advance(page) else {
                break;
            };
            for reply in page {
                let position = Position {
                    index,
                    budget,
                    thread_of: Some(parent),
                };
                self.visit(chat_id, reply.id, position).await;
                self.report.replies += 1;
                index += 1;
            }
        }
        Ok(())
    }

    async fn visit(&mut self, chat_id: ChatId, message_id: MessageId, position: Position) -> Option<Message> {
        let (outcome, message) = match self.inspect(chat_id, message_id).await {
            Ok((message, outcome)) => (outcome, Some(message)),
            Err(error) => {
                self.report.skipped += 1;
                let reason = error.to_string();
                (VisitOutcome::Skipped { reason }, None)
            }
        };
        let visit = Visit {
            index: position.index,
            budget: position.budget,
            thread_of: position.thread_of,
            message_id,
            outcome,
        };
        (self.on_visit)(&visit);
        message
    }

    async fn inspect(
        &mut self,
        chat_id: ChatId,
        message_id: MessageId,
    ) -> Result<(Message, VisitOutcome), BackendError> {
        let message = self.backend.get_message(chat_id, message_id).await?;
        let caption = media::caption(&message.content);
        let label = media::apply(&mut *self.backend, &message.content, self.download).await?;
        let outcome = VisitOutcome::Seen {
            kind: message.content.kind(),
            caption,
            label,
        };
        Ok((message, outcome))
    }
}
