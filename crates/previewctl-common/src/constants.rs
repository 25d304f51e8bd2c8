//! System-wide constants and default paths.

use std::path::PathBuf;

/// Application name used in CLI output and the configuration directory.
pub const APP_NAME: &str = "previewctl";

/// Directory under the user's home that holds CLI state.
pub const CONFIG_DIR_NAME: &str = ".previewctl";

/// File name of the CLI configuration inside [`CONFIG_DIR_NAME`].
pub const CONFIG_FILE_NAME: &str = "config.json";

/// Environment variable overriding the configuration file location.
pub const CONFIG_ENV_VAR: &str = "PREVIEWCTL_CONFIG";

/// Path prefix of the CLI API on the remote service.
pub const API_PREFIX: &str = "/api/cli/v1";

/// Deepest chain of included manifests the resolver will follow.
pub const MAX_INCLUDE_DEPTH: usize = 32;

/// Returns the user's home directory, if one is set.
pub fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .filter(|home| !home.is_empty())
        .map(PathBuf::from)
}

/// Returns the default configuration file path.
///
/// Prefers `$HOME/.previewctl/config.json`, falling back to a path relative
/// to the working directory when no home directory is known.
pub fn default_config_path() -> PathBuf {
    home_dir()
        .unwrap_or_default()
        .join(CONFIG_DIR_NAME)
        .join(CONFIG_FILE_NAME)
}
