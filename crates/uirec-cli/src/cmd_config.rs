use clap::Subcommand;
use std::path::Path;

use uirec_ledger::config::{read_config_map, write_config_map};
use uirec_ledger::{RecorderConfig, UirecPaths};

// ── CLI Schema ──

#[derive(Subcommand)]
pub enum ConfigCmd {
    /// Set a config value
    Set {
        /// Config key (e.g. port, auth_enabled, settle_delay_ms)
        key: String,
        /// Config value (true/false/number/string)
        value: String,
    },
    /// Get a config value
    Get {
        /// Config key
        key: String,
    },
    /// List all config values
    List,
}

// ── Dispatch ──

pub fn run(cmd: ConfigCmd, repo_root: &Path) -> anyhow::Result<()> {
    match cmd {
        ConfigCmd::Set { key, value } => set(repo_root, &key, &value),
        ConfigCmd::Get { key } => get(repo_root, &key),
        ConfigCmd::List => list(repo_root),
    }
}

// ── Command Implementations ──

fn initialized_paths(repo_root: &Path) -> anyhow::Result<UirecPaths> {
    let paths = UirecPaths::discover(repo_root);
    if !paths.is_initialized() {
        anyhow::bail!("No .uirec/ workspace found. Run `uirec init` first.");
    }
    Ok(paths)
}

/// Parse a string value into an appropriate JSON value (bool/number/string).
fn parse_value(s: &str) -> serde_json::Value {
    match s {
        "true" => serde_json::Value::Bool(true),
        "false" => serde_json::Value::Bool(false),
        _ => {
            if let Ok(n) = s.parse::<i64>() {
                serde_json::Value::Number(n.into())
            } else if let Ok(f) = s.parse::<f64>() {
                serde_json::json!(f)
            } else {
                serde_json::Value::String(s.to_string())
            }
        }
    }
}

/// `uirec config set <key> <value>`
///
/// The result must still load as a [`RecorderConfig`]; a value of the
/// wrong type is rejected before anything is written.
pub fn set(repo_root: &Path, key: &str, value: &str) -> anyhow::Result<()> {
    let paths = initialized_paths(repo_root)?;
    let mut config = read_config_map(&paths.config_json)?;
    config.insert(key.to_string(), parse_value(value));

    serde_json::from_value::<RecorderConfig>(serde_json::Value::Object(config.clone()))
        .map_err(|e| anyhow::anyhow!("invalid value for {key}: {e}"))?;

    write_config_map(&paths.config_json, &config)?;
    println!("{key} = {value}");
    Ok(())
}

/// `uirec config get <key>`
pub fn get(repo_root: &Path, key: &str) -> anyhow::Result<()> {
    let paths = initialized_paths(repo_root)?;
    let config = read_config_map(&paths.config_json)?;
    match config.get(key) {
        Some(val) => println!("{val}"),
        None => println!("(not set)"),
    }
    Ok(())
}

/// `uirec config list`
pub fn list(repo_root: &Path) -> anyhow::Result<()> {
    let paths = initialized_paths(repo_root)?;
    let config = read_config_map(&paths.config_json)?;
    if config.is_empty() {
        println!("(no config set)");
    } else {
        for (k, v) in &config {
            println!("{k} = {v}");
        }
    }
    Ok(())
}
