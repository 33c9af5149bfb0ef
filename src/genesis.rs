use std::{
    collections::BTreeMap,
    fs, io,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::account::Account;

#[derive(Debug, Error)]
pub enum GenesisError {
    #[error("Genesis file `{}` not found", .path.display())]
    NotFound { path: PathBuf },
    #[error("Failed to read genesis file `{}`", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Malformed genesis file `{}`: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Initial balances every replay starts from. Never mutated after load.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Genesis {
    pub balances: BTreeMap<Account, u64>,
}

impl Genesis {
    pub fn load(path: &Path) -> Result<Self, GenesisError> {
        let content = fs::read(path).map_err(|source| match source.kind() {
            io::ErrorKind::NotFound => GenesisError::NotFound {
                path: path.to_owned(),
            },
            _ => GenesisError::Io {
                path: path.to_owned(),
                source,
            },
        })?;
        serde_json::from_slice(&content).map_err(|source| GenesisError::Parse {
            path: path.to_owned(),
            source,
        })
    }

    pub fn total_supply(&self) -> u128 {
        self.balances.values().map(|b| u128::from(*b)).sum()
    }
}
