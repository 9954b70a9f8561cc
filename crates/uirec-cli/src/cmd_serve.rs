use std::path::Path;

use uirec_ledger::{RecorderConfig, UirecPaths};
use uirec_serve::ServeConfig;

/// Config file values, with command-line flags taking precedence.
pub fn execute(
    repo_root: &Path,
    bind: Option<&str>,
    port: Option<u16>,
    auth: bool,
) -> anyhow::Result<()> {
    let paths = UirecPaths::discover(repo_root);
    let file_config = RecorderConfig::load(&paths)?;

    let mut config = ServeConfig::from(&file_config);
    if let Some(bind) = bind {
        config.bind = bind.to_string();
    }
    if let Some(port) = port {
        config.port = port;
    }
    config.auth_enabled |= auth;

    tokio::runtime::Runtime::new()?.block_on(uirec_serve::serve(repo_root, config))
}
