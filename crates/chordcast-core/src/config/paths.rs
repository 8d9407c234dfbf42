//! Standard locations for Chordcast configuration

use std::path::PathBuf;

/// File name of the engine configuration
pub const CONFIG_FILE_NAME: &str = "engine.yaml";

/// `~/.config/chordcast` (or the platform equivalent)
pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join(".config")))
        .unwrap_or_else(|| PathBuf::from("."))
        .join("chordcast")
}

/// `~/.config/chordcast/engine.yaml`
pub fn default_config_path() -> PathBuf {
    config_dir().join(CONFIG_FILE_NAME)
}
