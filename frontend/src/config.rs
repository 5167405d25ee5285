use std::collections::HashMap;
use std::path::PathBuf;

use serde::Deserialize;

/// Optional user configuration, read from `agate/config.toml` in the
/// platform config directory:
///
/// ```toml
/// scale = 4
///
/// [keys]
/// a = "Q"
/// b = "W"
/// ```
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    pub scale: Option<u32>,
    #[serde(default)]
    pub keys: HashMap<String, String>,
}

fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("agate").join("config.toml"))
}

pub fn load() -> Config {
    let Some(path) = config_path() else {
        return Config::default();
    };
    let Ok(text) = std::fs::read_to_string(&path) else {
        return Config::default();
    };

    match toml::from_str(&text) {
        Ok(config) => config,
        Err(e) => {
            log::warn!("ignoring malformed config {}: {e}", path.display());
            Config::default()
        }
    }
}
