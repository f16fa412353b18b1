use std::env;
use std::error::Error as StdError;
use std::fmt::{self, Debug, Display};
use std::path::PathBuf;

use parlor_core::{AssistantDirectory, ParseDirectoryError};
use parlor_store::FileStore;

/// Settings of the terminal client, read from the environment.
#[derive(Clone)]
pub struct CliConfig {
    /// The API key, from `OPENAI_API_KEY`.
    pub api_key: String,
    /// The API base URL, from `OPENAI_BASE_URL`.
    pub base_url: Option<String>,
    /// The assistants, from `PARLOR_ASSISTANTS`.
    pub directory: AssistantDirectory,
    /// The conversation file, from `PARLOR_STORE`.
    pub store_path: PathBuf,
    /// Where transcripts are written, from `PARLOR_EXPORT_DIR`.
    pub export_dir: PathBuf,
}

impl Debug for CliConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CliConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("directory", &self.directory)
            .field("store_path", &self.store_path)
            .field("export_dir", &self.export_dir)
            .finish()
    }
}

impl CliConfig {
    /// Reads the configuration from the process environment.
    #[inline]
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Reads the configuration with `lookup` standing in for the
    /// environment. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let api_key = var("OPENAI_API_KEY")
            .ok_or(ConfigError::Missing("OPENAI_API_KEY"))?;
        let assistants = var("PARLOR_ASSISTANTS")
            .ok_or(ConfigError::Missing("PARLOR_ASSISTANTS"))?;
        let directory: AssistantDirectory =
            assistants.parse().map_err(ConfigError::Directory)?;
        if directory.is_empty() {
            return Err(ConfigError::Missing("PARLOR_ASSISTANTS"));
        }

        Ok(Self {
            api_key,
            base_url: var("OPENAI_BASE_URL"),
            directory,
            store_path: var("PARLOR_STORE")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(FileStore::DEFAULT_FILE_NAME)),
            export_dir: var("PARLOR_EXPORT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(".")),
        })
    }
}

/// Error returned when the environment doesn't configure the client.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// A required variable is unset or empty.
    Missing(&'static str),
    /// `PARLOR_ASSISTANTS` is malformed.
    Directory(ParseDirectoryError),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(name) => {
                write!(f, "{name} environment variable is not set")
            }
            ConfigError::Directory(err) => {
                write!(f, "PARLOR_ASSISTANTS is invalid: {err}")
            }
        }
    }
}

impl StdError for ConfigError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            ConfigError::Missing(_) => None,
            ConfigError::Directory(err) => Some(err),
        }
    }
}
