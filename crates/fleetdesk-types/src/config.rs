//! Global configuration types for Fleetdesk.
//!
//! `GlobalConfig` represents the top-level `config.toml` that controls
//! driver surcharges, billing units, and draft autosave timing.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Top-level configuration. All fields have sensible defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GlobalConfig {
    #[serde(default)]
    pub pricing: PricingConfig,

    #[serde(default)]
    pub drafts: DraftConfig,
}

/// Surcharges and billing units used by the pricing engine.
///
/// The tax rate is a domain constant and intentionally not configurable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingConfig {
    /// Flat fee per line for each non-primary driver.
    #[serde(default = "default_additional_driver_fee")]
    pub additional_driver_fee: Decimal,

    /// Flat fee per line for each driver younger than `young_driver_age`.
    #[serde(default = "default_young_driver_fee")]
    pub young_driver_fee: Decimal,

    #[serde(default = "default_young_driver_age")]
    pub young_driver_age: u32,

    /// Length in days of one monthly billing unit.
    #[serde(default = "default_month_days")]
    pub month_days: u32,
}

fn default_additional_driver_fee() -> Decimal {
    Decimal::new(1000, 2)
}

fn default_young_driver_fee() -> Decimal {
    Decimal::new(1500, 2)
}

fn default_young_driver_age() -> u32 {
    25
}

fn default_month_days() -> u32 {
    30
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            additional_driver_fee: default_additional_driver_fee(),
            young_driver_fee: default_young_driver_fee(),
            young_driver_age: default_young_driver_age(),
            month_days: default_month_days(),
        }
    }
}

/// Draft autosave settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftConfig {
    /// Quiet period after the last edit before a draft is written.
    #[serde(default = "default_autosave_debounce_ms")]
    pub autosave_debounce_ms: u64,
}

fn default_autosave_debounce_ms() -> u64 {
    1000
}

impl Default for DraftConfig {
    fn default() -> Self {
        Self {
            autosave_debounce_ms: default_autosave_debounce_ms(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_global_config_default_values() {
        let config = GlobalConfig::default();
        assert_eq!(config.pricing.additional_driver_fee, dec!(10.00));
        assert_eq!(config.pricing.young_driver_fee, dec!(15.00));
        assert_eq!(config.pricing.young_driver_age, 25);
        assert_eq!(config.pricing.month_days, 30);
        assert_eq!(config.drafts.autosave_debounce_ms, 1000);
    }

    #[test]
    fn test_global_config_deserialize_with_defaults() {
        let config: GlobalConfig = toml::from_str("").unwrap();
        assert_eq!(config, GlobalConfig::default());
    }

    #[test]
    fn test_global_config_deserialize_with_values() {
        let toml_str = r#"
[pricing]
additional_driver_fee = 12.5
young_driver_age = 21

[drafts]
autosave_debounce_ms = 250
"#;
        let config: GlobalConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.pricing.additional_driver_fee, dec!(12.5));
        assert_eq!(config.pricing.young_driver_fee, dec!(15.00));
        assert_eq!(config.pricing.young_driver_age, 21);
        assert_eq!(config.drafts.autosave_debounce_ms, 250);
    }

    #[test]
    fn test_global_config_serde_roundtrip() {
        let config = GlobalConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: GlobalConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, config);
    }
}
