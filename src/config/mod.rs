mod session;
mod settings;

pub use session::Session;
pub use settings::{ApiSettings, Config, DisplaySettings, InvoiceSettings};

use crate::error::{Result, TrackerError};
use directories::ProjectDirs;
use std::fs;
use std::path::{Path, PathBuf};

/// Get the config directory path (XDG config dir, or ~/.fintrack/)
pub fn config_dir() -> Result<PathBuf> {
    if let Some(proj_dirs) = ProjectDirs::from("", "", "fintrack") {
        return Ok(proj_dirs.config_dir().to_path_buf());
    }

    let home = std::env::var_os("HOME").map(PathBuf::from).ok_or_else(|| {
        TrackerError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "Could not determine home directory",
        ))
    })?;

    Ok(home.join(".fintrack"))
}

/// Load the main config.toml
pub fn load_config(config_dir: &Path) -> Result<Config> {
    let path = config_dir.join("config.toml");
    if !path.exists() {
        return Err(TrackerError::ConfigFileNotFound(path));
    }
    let content = fs::read_to_string(&path)?;
    toml::from_str(&content).map_err(|e| TrackerError::ConfigParse { path, source: e })
}

/// Create the config directory with a template config.toml
pub fn init_config_dir(config_dir: &Path) -> Result<()> {
    if config_dir.exists() {
        return Err(TrackerError::AlreadyInitialized(config_dir.to_path_buf()));
    }
    fs::create_dir_all(config_dir)?;
    fs::write(config_dir.join("config.toml"), CONFIG_TEMPLATE)?;
    Ok(())
}

/// Template content for config.toml
pub const CONFIG_TEMPLATE: &str = r#"[api]
base_url = "http://localhost:5000/api/v1"   # backend root including the version prefix
timeout_secs = 30

[display]
currency_symbol = "$"
page_size = 10

[invoice]
payment_terms = "Net 30"
due_days = 30       # 0 leaves the due date empty
tax_rate = "0"      # percent, e.g. "8.25"
"#;
