use std::env;
use std::path::PathBuf;

use thiserror::Error;

use crate::types::ConnectionParameters;

const DEFAULT_BRIDGE_URL: &str = "ws://127.0.0.1:8765/td";
const MIN_API_HASH_LEN: usize = 32;
const MIN_PHONE_DIGITS: usize = 7;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required setting {0}")]
    Missing(&'static str),
    #[error("{key} must be at least {min} characters")]
    TooShort { key: &'static str, min: usize },
    #[error("{key} is not valid: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Clone, Debug)]
pub struct Config {
    pub bridge_url: String,
    pub data_dir: PathBuf,
    pub api_id: i32,
    pub api_hash: String,
    pub device_model: String,
    pub tdlib_verbosity: i32,
    pub credentials: Credentials,
}

/// Phone number and password for one authorization run. Checked when the
/// backend first asks for them.
#[derive(Clone, Debug, Default)]
pub struct Credentials {
    phone_number: Option<String>,
    password: Option<String>,
}

impl Credentials {
    pub fn new(phone_number: Option<String>, password: Option<String>) -> Self {
        Self {
            phone_number: phone_number.filter(|value| !value.trim().is_empty()),
            password: password.filter(|value| !value.is_empty()),
        }
    }

    /// Values given on the command line replace the configured ones.
    pub fn overridden(self, phone_number: Option<String>, password: Option<String>) -> Self {
        let overrides = Credentials::new(phone_number, password);
        Self {
            phone_number: overrides.phone_number.or(self.phone_number),
            password: overrides.password.or(self.password),
        }
    }

    pub fn phone_number(&self) -> Result<&str, ConfigError> {
        let phone = self
            .phone_number
            .as_deref()
            .map(str::trim)
            .ok_or(ConfigError::Missing("TDARCHIVE_PHONE"))?;
        let digits = phone.chars().filter(char::is_ascii_digit).count();
        if digits < MIN_PHONE_DIGITS {
            return Err(ConfigError::TooShort {
                key: "TDARCHIVE_PHONE",
                min: MIN_PHONE_DIGITS,
            });
        }
        Ok(phone)
    }

    pub fn password(&self) -> Result<&str, ConfigError> {
        self.password
            .as_deref()
            .ok_or(ConfigError::Missing("TDARCHIVE_PASSWORD"))
    }
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let lookup = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let bridge_url = lookup("TDARCHIVE_BRIDGE_URL").unwrap_or_else(|| DEFAULT_BRIDGE_URL.to_string());
        let bridge_url = bridge_url.trim().trim_end_matches('/').to_string();
        url::Url::parse(&bridge_url).map_err(|err| ConfigError::Invalid {
            key: "TDARCHIVE_BRIDGE_URL",
            reason: err.to_string(),
        })?;

        let data_dir = lookup("TDARCHIVE_DATA_DIR")
            .map(PathBuf::from)
            .or_else(|| default_data_dir(lookup("HOME")))
            .ok_or(ConfigError::Missing("TDARCHIVE_DATA_DIR"))?;

        let api_id = lookup("TDARCHIVE_API_ID").ok_or(ConfigError::Missing("TDARCHIVE_API_ID"))?;
        let api_id = match api_id.trim().parse::<i32>() {
            Ok(value) if value > 0 => value,
            _ => {
                return Err(ConfigError::Invalid {
                    key: "TDARCHIVE_API_ID",
                    reason: "expected a positive integer".to_string(),
                });
            }
        };

        let api_hash = lookup("TDARCHIVE_API_HASH").ok_or(ConfigError::Missing("TDARCHIVE_API_HASH"))?;
        let api_hash = api_hash.trim().to_string();
        if api_hash.len() < MIN_API_HASH_LEN {
            return Err(ConfigError::TooShort {
                key: "TDARCHIVE_API_HASH",
                min: MIN_API_HASH_LEN,
            });
        }

        let device_model = lookup("TDARCHIVE_DEVICE_MODEL")
            .or_else(|| hostname::get().ok().and_then(|name| name.into_string().ok()))
            .unwrap_or_else(|| "Desktop".to_string());

        let tdlib_verbosity = match lookup("TDARCHIVE_TDLIB_VERBOSITY") {
            Some(value) => value.trim().parse::<i32>().map_err(|err| ConfigError::Invalid {
                key: "TDARCHIVE_TDLIB_VERBOSITY",
                reason: err.to_string(),
            })?,
            None => 0,
        };

        let credentials = Credentials::new(lookup("TDARCHIVE_PHONE"), lookup("TDARCHIVE_PASSWORD"));

        Ok(Self {
            bridge_url,
            data_dir,
            api_id,
            api_hash,
            device_model,
            tdlib_verbosity,
            credentials,
        })
    }

    pub fn connection_parameters(&self) -> ConnectionParameters {
        ConnectionParameters {
            database_directory: self.data_dir.to_string_lossy().to_string(),
            files_directory: self.data_dir.join("files").to_string_lossy().to_string(),
            use_file_database: true,
            use_chat_info_database: true,
            use_message_database: true,
            use_secret_chats: true,
            api_id: self.api_id,
            api_hash: self.api_hash.clone(),
            system_language_code: "en".to_string(),
            device_model: self.device_model.clone(),
            application_version: env!("CARGO_PKG_VERSION").to_string(),
            enable_storage_optimizer: true,
        }
    }
}

fn default_data_dir(home: Option<String>) -> Option<PathBuf> {
    let base = PathBuf::from(home?);
    Some(base.join(".local").join("share").join("tdarchive"))
}
