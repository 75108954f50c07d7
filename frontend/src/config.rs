//! Optional user configuration.
//!
//! Read from `<config_dir>/colorvm/config.toml`. Command-line flags
//! override it; a missing file is simply the defaults.

use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct Config {
    /// Default for `--silent` when the flag is absent.
    pub silent: bool,

    /// Per-stack depth ceiling for the VM; absent means unbounded.
    pub stack_limit: Option<usize>,
}

impl Config {
    pub fn path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("colorvm").join("config.toml"))
    }

    /// Load the user config. A malformed file yields the defaults plus a
    /// warning message for the caller to surface.
    pub fn load() -> (Config, Option<String>) {
        let Some(path) = Config::path() else {
            return (Config::default(), None);
        };
        let Ok(text) = std::fs::read_to_string(&path) else {
            return (Config::default(), None);
        };
        match toml::from_str(&text) {
            Ok(cfg) => (cfg, None),
            Err(e) => (
                Config::default(),
                Some(format!("Ignoring malformed config {}: {e}", path.display())),
            ),
        }
    }
}
