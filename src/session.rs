use std::io;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use crate::auth::{self, AuthError, CodePrompt, Terminal};
use crate::backend::{Backend, BackendError};
use crate::config::Credentials;
use crate::history::{self, TraversalReport, Visit};
use crate::types::{ChatId, ChatList, ConnectionParameters};

pub const CHAT_PAGE_LIMIT: i32 = 100;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Result of a verb that needs an authorized session. `Halted` carries the
/// terminal state when authorization stopped anywhere but `Ready`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Gated<T> {
    Ready(T),
    Halted(Terminal),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSummary {
    pub id: ChatId,
    pub kind: &'static str,
    pub title: String,
}

pub struct Session<B, P> {
    backend: B,
    parameters: ConnectionParameters,
    credentials: Credentials,
    data_dir: PathBuf,
    prompt: P,
}

impl<B: Backend, P: CodePrompt> Session<B, P> {
    pub fn new(
        backend: B,
        parameters: ConnectionParameters,
        credentials: Credentials,
        data_dir: PathBuf,
        prompt: P,
    ) -> Self {
        Self {
            backend,
            parameters,
            credentials,
            data_dir,
            prompt,
        }
    }

    async fn authorize(&mut self) -> Result<Terminal, AuthError> {
        auth::run_until_terminal(&mut self.backend, &self.parameters, &self.credentials, &mut self.prompt).await
    }

    pub async fn login(&mut self) -> Result<Terminal, SessionError> {
        Ok(self.authorize().await?)
    }

    /// Logs out remotely, then deletes the local working directory.
    pub async fn logout(&mut self) -> Result<Gated<()>, SessionError> {
        let terminal = self.authorize().await?;
        if terminal != Terminal::Ready {
            return Ok(Gated::Halted(terminal));
        }
        self.backend.log_out().await?;
        match tokio::fs::remove_dir_all(&self.data_dir).await {
            Ok(()) => log::info!("removed {}", self.data_dir.display()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => return Err(SessionError::Io(err)),
        }
        Ok(Gated::Ready(()))
    }

    pub async fn list_chats(&mut self, list: ChatList) -> Result<Gated<Vec<ChatSummary>>, SessionError> {
        let terminal = self.authorize().await?;
        if terminal != Terminal::Ready {
            return Ok(Gated::Halted(terminal));
        }
        let chat_ids = self.backend.get_chats(list, CHAT_PAGE_LIMIT).await?;
        let mut chats = Vec::with_capacity(chat_ids.len());
        for chat_id in chat_ids {
            match self.backend.get_chat(chat_id).await {
                Ok(chat) => chats.push(ChatSummary {
                    id: chat.id,
                    kind: chat.chat_type.label(),
                    title: chat.title,
                }),
                Err(error) => log::warn!("skipping chat {chat_id}: {error}"),
            }
        }
        Ok(Gated::Ready(chats))
    }

    pub async fn list_messages<F: FnMut(&Visit)>(
        &mut self,
        chat_id: ChatId,
        max: usize,
        download: bool,
        on_visit: F,
    ) -> Result<Gated<TraversalReport>, SessionError> {
        let terminal = self.authorize().await?;
        if terminal != Terminal::Ready {
            return Ok(Gated::Halted(terminal));
        }
        let report = history::walk_chat(&mut self.backend, chat_id, max, download, on_visit).await?;
        Ok(Gated::Ready(report))
    }

    #[cfg(test)]
    fn into_backend(self) -> B {
        self.backend
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::tests::{FixedCode, credentials, parameters};
    use crate::backend::fake::{Call, FakeBackend, text_history};
    use crate::types::AuthState;

    fn session(backend: FakeBackend, data_dir: PathBuf) -> Session<FakeBackend, FixedCode> {
        Session::new(backend, parameters(), credentials(), data_dir, FixedCode("11111"))
    }

    #[tokio::test]
    async fn login_walks_the_challenges() {
        let backend = FakeBackend::with_states([
            AuthState::WaitTdlibParameters,
            AuthState::WaitPhoneNumber,
            AuthState::WaitCode,
            AuthState::Ready,
        ]);
        let mut session = session(backend, PathBuf::from("/nonexistent"));
        assert_eq!(session.login().await.expect("login"), Terminal::Ready);
        let backend = session.into_backend();
        assert!(backend.calls.contains(&Call::Code("11111".to_string())));
    }

    #[tokio::test]
    async fn logout_removes_working_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        let data_dir = dir.path().join("td");
        std::fs::create_dir_all(data_dir.join("files")).expect("mkdir");
        std::fs::write(data_dir.join("td.binlog"), b"state").expect("write");

        let mut session = session(FakeBackend::with_states([AuthState::Ready]), data_dir.clone());
        assert_eq!(session.logout().await.expect("logout"), Gated::Ready(()));
        assert!(!data_dir.exists());
        assert!(session.into_backend().calls.contains(&Call::LogOut));
    }

    #[tokio::test]
    async fn logout_tolerates_missing_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut session = session(FakeBackend::with_states([AuthState::Ready]), dir.path().join("gone"));
        assert_eq!(session.logout().await.expect("logout"), Gated::Ready(()));
    }

    #[tokio::test]
    async fn verbs_halt_when_not_ready() {
        let mut session = session(FakeBackend::with_states([AuthState::Closed]), PathBuf::from("/nonexistent"));
        assert_eq!(
            session.list_chats(ChatList::Main).await.expect("chats"),
            Gated::Halted(Terminal::Closed)
        );
        let outcome = session
            .list_messages(1, 25, false, |_| panic!("no visits expected"))
            .await
            .expect("messages");
        assert_eq!(outcome, Gated::Halted(Terminal::Closed));
        let backend = session.into_backend();
        assert!(backend.calls.iter().all(|call| *call == Call::AuthState));
    }

    #[tokio::test]
    async fn list_chats_reads_one_page() {
        let mut backend = FakeBackend::with_states([AuthState::Ready]);
        backend.add_chat(7, "family", text_history(2));
        backend.add_chat(9, "work", Vec::new());
        backend.chat_list.push(404);
        let mut session = session(backend, PathBuf::from("/nonexistent"));

        let Gated::Ready(chats) = session.list_chats(ChatList::Main).await.expect("chats") else {
            panic!("expected ready session");
        };
        let titles: Vec<_> = chats.iter().map(|chat| (chat.id, chat.title.as_str())).collect();
        assert_eq!(titles, vec![(7, "family"), (9, "work")]);
        assert!(
            session
                .into_backend()
                .calls
                .contains(&Call::GetChats(ChatList::Main, CHAT_PAGE_LIMIT))
        );
    }

    #[tokio::test]
    async fn list_messages_reports_visits() {
        let mut backend = FakeBackend::with_states([AuthState::Ready]);
        backend.add_chat(3, "notes", text_history(4));
        let mut session = session(backend, PathBuf::from("/nonexistent"));

        let mut ids = Vec::new();
        let outcome = session
            .list_messages(3, 25, false, |visit| ids.push(visit.message_id))
            .await
            .expect("messages");
        let Gated::Ready(report) = outcome else {
            panic!("expected ready session");
        };
        assert_eq!(report.messages, 4);
        assert_eq!(ids, vec![4, 3, 2, 1]);
    }
}
