use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TrackerError {
    #[error("Config directory not found at {0}. Run 'fintrack init' to create it.")]
    ConfigNotFound(PathBuf),

    #[error("Config file not found: {0}")]
    ConfigFileNotFound(PathBuf),

    #[error("Failed to parse config file {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Failed to write {path}: {source}")]
    ConfigWrite {
        path: PathBuf,
        #[source]
        source: toml::ser::Error,
    },

    #[error("Config directory already exists at {0}")]
    AlreadyInitialized(PathBuf),

    #[error("Not logged in. Run 'fintrack login' first.")]
    NotLoggedIn,

    #[error("No active profile. Run 'fintrack profiles' and 'fintrack switch-profile <id>'.")]
    NoActiveProfile,

    #[error("Profile '{0}' not found")]
    ProfileNotFound(String),

    #[error("Session expired. Run 'fintrack login' to sign in again.")]
    Unauthorized,

    #[error("{message} (HTTP {status})")]
    Api { status: u16, message: String },

    #[error("HTTP request failed: {0}")]
    Transport(#[from] ureq::Error),

    #[error("Unexpected response from server: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("Invalid {entity} data: {source}")]
    InvalidPayload {
        entity: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("At least one item is required")]
    LastItemRequired,

    #[error("Item {index} does not exist (invoice has {len} item(s))")]
    ItemIndexOutOfRange { index: usize, len: usize },

    #[error("At least one item with description is required")]
    NoDescribedItems,

    #[error("Invoice is already being saved")]
    SubmitInFlight,

    #[error("Invalid date '{0}'. Expected YYYY-MM-DD.")]
    InvalidDate(String),

    #[error("Invalid filter '{0}'. Expected key=value.")]
    InvalidFilter(String),

    #[error("'{0}' does not support this operation")]
    Unsupported(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TrackerError>;
