//! Well-known filesystem locations.

use directories::BaseDirs;
use std::path::PathBuf;

const APP_DIR: &str = "axon";

/// Name of the config file inside the config home.
pub const CONFIG_FILE: &str = "config.toml";

/// `$XDG_CONFIG_HOME/axon` or the platform equivalent.
///
/// Falls back to `./.axon` when no home directory can be determined.
pub fn config_home() -> PathBuf {
    BaseDirs::new()
        .map(|dirs| dirs.config_dir().join(APP_DIR))
        .unwrap_or_else(|| PathBuf::from(".axon"))
}

/// `$XDG_CACHE_HOME/axon` or the platform equivalent.
pub fn cache_home() -> PathBuf {
    BaseDirs::new()
        .map(|dirs| dirs.cache_dir().join(APP_DIR))
        .unwrap_or_else(|| PathBuf::from(".axon").join("cache"))
}

/// The user's shell from `$SHELL`, or `/bin/sh` when unset or blank.
pub fn user_shell() -> String {
    std::env::var("SHELL")
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "/bin/sh".to_string())
}
