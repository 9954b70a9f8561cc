use std::path::Path;

use uirec_ledger::config::{read_config_map, write_config_map};
use uirec_ledger::{init_workspace, RecorderConfig, UirecPaths};

pub fn execute(repo_root: &Path) -> anyhow::Result<()> {
    let paths = UirecPaths::discover(repo_root);

    if paths.is_initialized() {
        // Make sure the schema exists even if .uirec/ was created by hand
        init_workspace(&paths)?;
        println!("Already initialized at {}", paths.uirec_dir.display());
        return Ok(());
    }

    init_workspace(&paths)?;

    // Write the defaults out so `uirec config list` shows what can be tuned
    if read_config_map(&paths.config_json)?.is_empty() {
        let defaults = serde_json::to_value(RecorderConfig::default())?;
        if let serde_json::Value::Object(map) = defaults {
            write_config_map(&paths.config_json, &map)?;
        }
    }

    println!("Initialized uirec workspace at {}", paths.uirec_dir.display());
    Ok(())
}
