use std::{
    fs, io,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config `{}`", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Malformed config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Where the ledger keeps its genesis snapshot and transaction log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    pub genesis_path: PathBuf,
    pub log_path: PathBuf,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self::in_dir("")
    }
}

impl LedgerConfig {
    /// Standard layout under `dir`: `ledger/genesis.json` and `ledger/ledger.db`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let ledger_dir = dir.as_ref().join("ledger");
        Self {
            genesis_path: ledger_dir.join("genesis.json"),
            log_path: ledger_dir.join("ledger.db"),
        }
    }

    /// Reads a TOML config, missing keys fall back to defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_owned(),
            source,
        })?;
        Ok(toml::from_str(&content)?)
    }
}
