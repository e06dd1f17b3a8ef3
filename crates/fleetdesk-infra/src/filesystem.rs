//! Data directory layout.

use std::path::{Path, PathBuf};

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "FLEETDESK_DATA_DIR";

/// Resolve the data directory from environment or platform defaults.
///
/// Priority:
/// 1. `FLEETDESK_DATA_DIR` environment variable
/// 2. `~/.fleetdesk`
/// 3. `./.fleetdesk`
pub fn resolve_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
        return PathBuf::from(dir);
    }

    if let Some(home) = dirs::home_dir() {
        return home.join(".fleetdesk");
    }

    PathBuf::from(".fleetdesk")
}

/// `{data_dir}/config.toml`.
pub fn config_path(data_dir: &Path) -> PathBuf {
    data_dir.join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_path() {
        assert_eq!(
            config_path(Path::new("/srv/fleetdesk")),
            PathBuf::from("/srv/fleetdesk/config.toml")
        );
    }

    #[test]
    fn test_resolve_data_dir_from_env() {
        // SAFETY: This test is single-threaded and restores the env var immediately.
        unsafe {
            std::env::set_var(DATA_DIR_ENV, "/tmp/test-fleetdesk");
        }
        let dir = resolve_data_dir();
        assert_eq!(dir, PathBuf::from("/tmp/test-fleetdesk"));
        unsafe {
            std::env::remove_var(DATA_DIR_ENV);
        }
    }
}
