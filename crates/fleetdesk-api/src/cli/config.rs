//! `fdesk config`: print the configuration the builders run with.

use std::path::Path;

use anyhow::Result;
use console::style;

use fleetdesk_infra::filesystem::config_path;
use fleetdesk_types::config::GlobalConfig;

pub fn show_config(data_dir: &Path, config: &GlobalConfig, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(config)?);
        return Ok(());
    }

    let path = config_path(data_dir);
    println!();
    println!("  {} {}", style("Config").bold(), style(path.display()).dim());
    if !path.exists() {
        println!("  {}", style("(file not found, showing defaults)").dim());
    }
    println!();
    for line in toml::to_string_pretty(config)?.lines() {
        println!("  {line}");
    }
    println!();
    Ok(())
}
