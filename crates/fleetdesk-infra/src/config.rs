//! Global configuration loader for Fleetdesk.
//!
//! Reads `config.toml` from the data directory (`~/.fleetdesk/` in production)
//! and deserializes it into [`GlobalConfig`]. Falls back to defaults when the
//! file is missing or malformed.

use std::path::Path;
use std::time::Duration;

use fleetdesk_types::config::GlobalConfig;

use crate::filesystem::config_path;

/// Shortest autosave quiet period accepted from configuration.
const MIN_AUTOSAVE_DEBOUNCE_MS: u64 = 100;

/// Load global configuration from `{data_dir}/config.toml`.
///
/// - If the file does not exist, returns [`GlobalConfig::default()`].
/// - If the file exists but fails to parse, logs a warning and returns the default.
/// - If the file exists and parses successfully, returns the parsed config.
pub async fn load_global_config(data_dir: &Path) -> GlobalConfig {
    let config_path = config_path(data_dir);

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config.toml found at {}, using defaults", config_path.display());
            return GlobalConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", config_path.display());
            return GlobalConfig::default();
        }
    };

    match toml::from_str::<GlobalConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(
                "Failed to parse {}: {err}, using defaults",
                config_path.display()
            );
            GlobalConfig::default()
        }
    }
}

/// Autosave debounce interval, floored at 100ms so every keystroke does not
/// turn into a write.
pub fn autosave_debounce(config: &GlobalConfig) -> Duration {
    Duration::from_millis(config.drafts.autosave_debounce_ms.max(MIN_AUTOSAVE_DEBOUNCE_MS))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use tempfile::TempDir;

    #[tokio::test]
    async fn load_global_config_missing_file_returns_default() {
        let tmp = TempDir::new().unwrap();
        let config = load_global_config(tmp.path()).await;
        assert_eq!(config, GlobalConfig::default());
    }

    #[tokio::test]
    async fn load_global_config_valid_toml_returns_parsed() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(
            tmp.path().join("config.toml"),
            r#"
[pricing]
young_driver_fee = 20
month_days = 28

[drafts]
autosave_debounce_ms = 2500
"#,
        )
        .await
        .unwrap();

        let config = load_global_config(tmp.path()).await;
        assert_eq!(config.pricing.young_driver_fee, dec!(20));
        assert_eq!(config.pricing.month_days, 28);
        assert_eq!(config.pricing.additional_driver_fee, dec!(10.00));
        assert_eq!(config.drafts.autosave_debounce_ms, 2500);
    }

    #[tokio::test]
    async fn load_global_config_invalid_toml_returns_default() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(tmp.path().join("config.toml"), "this is not { valid toml !!!")
            .await
            .unwrap();

        let config = load_global_config(tmp.path()).await;
        assert_eq!(config, GlobalConfig::default());
    }

    #[test]
    fn autosave_debounce_uses_configured_value() {
        let config = GlobalConfig::default();
        assert_eq!(autosave_debounce(&config), Duration::from_millis(1000));
    }

    #[test]
    fn autosave_debounce_enforces_minimum() {
        let mut config = GlobalConfig::default();
        config.drafts.autosave_debounce_ms = 0;
        assert_eq!(
            autosave_debounce(&config),
            Duration::from_millis(MIN_AUTOSAVE_DEBOUNCE_MS)
        );
    }
}
