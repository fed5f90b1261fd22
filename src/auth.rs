use std::fmt;

use dialoguer::Input;
use thiserror::Error;

use crate::backend::{Backend, BackendError};
use crate::config::{ConfigError, Credentials};
use crate::types::{AuthState, ConnectionParameters};

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("backend rejected authorization step: {0}")]
    Backend(#[from] BackendError),
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("could not read code: {0}")]
    Prompt(#[from] dialoguer::Error),
}

/// The state an authorization run stopped in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Terminal {
    Ready,
    Closed,
    LoggingOut,
    Unrecognized,
}

impl fmt::Display for Terminal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Terminal::Ready => "Ok",
            Terminal::Closed => "Closed",
            Terminal::LoggingOut => "Logging Out",
            Terminal::Unrecognized => "stopped in an unrecognized state",
        };
        f.write_str(label)
    }
}

/// Source of the one-time login code.
pub trait CodePrompt {
    fn read_code(&mut self) -> Result<String, dialoguer::Error>;
}

pub struct ConsolePrompt;

impl CodePrompt for ConsolePrompt {
    fn read_code(&mut self) -> Result<String, dialoguer::Error> {
        let code: String = Input::new()
            .with_prompt("Enter the code sent to the device")
            .interact_text()?;
        Ok(code.trim().to_string())
    }
}

/// Answers authorization states one at a time until the backend reports a
/// terminal state. Safe to call on an authorized session: it observes
/// `Ready` and returns without submitting anything.
pub async fn run_until_terminal<B: Backend, P: CodePrompt>(
    backend: &mut B,
    parameters: &ConnectionParameters,
    credentials: &Credentials,
    prompt: &mut P,
) -> Result<Terminal, AuthError> {
    loop {
        let state = backend.authorization_state().await?;
        match state {
            AuthState::WaitEncryptionKey { is_encrypted } => {
                backend.check_encryption_key().await?;
                log::info!("set encryption key (encrypted database: {is_encrypted})");
            }
            AuthState::WaitTdlibParameters => {
                backend.set_parameters(parameters).await?;
                log::info!("set library parameters");
            }
            AuthState::WaitPhoneNumber => {
                let phone_number = credentials.phone_number()?;
                backend.set_phone_number(phone_number).await?;
                log::info!("phone number submitted");
            }
            AuthState::WaitPassword { password_hint } => {
                let password = credentials.password()?;
                if !password_hint.is_empty() {
                    log::info!("password hint: {password_hint}");
                }
                backend.check_password(password).await?;
                log::info!("password accepted");
            }
            AuthState::WaitCode => {
                let code = prompt.read_code()?;
                backend.check_code(&code).await?;
                log::info!("authentication code accepted");
            }
            AuthState::Ready => {
                log::info!("authorization ready");
                return Ok(Terminal::Ready);
            }
            AuthState::Closed => {
                log::info!("authorization closed");
                return Ok(Terminal::Closed);
            }
            AuthState::LoggingOut => {
                log::info!("authorization logging out");
                return Ok(Terminal::LoggingOut);
            }
            AuthState::Unknown => {
                log::warn!("unrecognized authorization state, stopping");
                return Ok(Terminal::Unrecognized);
            }
        }
    }
}
