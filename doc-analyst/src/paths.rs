//! Platform path resolution for doc-analyst.
//!
//! | Purpose | Linux | macOS | Windows |
//! |---------|-------|-------|---------|
//! | Config | `~/.config/doc-analyst/` | `~/Library/Application Support/doc-analyst/` | `%APPDATA%\doc-analyst\` |

use std::path::PathBuf;

/// Application name used in directory paths
const APP_NAME: &str = "doc-analyst";

/// File name of the JSON settings file inside the config directory
pub const SETTINGS_FILE_NAME: &str = "config.json";

/// Get the configuration directory (for config.json).
pub fn get_config_dir() -> PathBuf {
    dirs::config_dir()
        .map(|p| p.join(APP_NAME))
        .unwrap_or_else(|| fallback_base_dir().join("config"))
}

/// Default location of the settings file.
pub fn get_default_settings_path() -> PathBuf {
    get_config_dir().join(SETTINGS_FILE_NAME)
}

/// Fallback base directory when platform dirs are unavailable.
///
/// Tries in order:
/// 1. `~/.doc-analyst/` (home directory)
/// 2. `./.doc-analyst/` (current working directory)
fn fallback_base_dir() -> PathBuf {
    dirs::home_dir()
        .map(|p| p.join(".doc-analyst"))
        .unwrap_or_else(|| {
            std::env::current_dir()
                .unwrap_or_else(|_| PathBuf::from("."))
                .join(".doc-analyst")
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_path_lives_in_config_dir() {
        let path = get_default_settings_path();
        assert!(path.starts_with(get_config_dir()));
        assert_eq!(path.file_name().unwrap(), SETTINGS_FILE_NAME);
    }

    #[test]
    fn test_config_dir_is_app_scoped() {
        let dir = get_config_dir();
        assert!(dir.to_string_lossy().contains("doc-analyst"));
    }
}
