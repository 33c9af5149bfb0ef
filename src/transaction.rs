use serde::{Deserialize, Serialize};

use crate::account::Account;

/// Transfer of `value` coins between two accounts.
/// Serialized as one JSON object per log line: `{"from":..,"to":..,"value":..}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub from: Account,
    pub to: Account,
    pub value: u64,
}

impl Transaction {
    pub fn new(from: impl Into<Account>, to: impl Into<Account>, value: u64) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            value,
        }
    }

    pub fn is_self_transfer(&self) -> bool {
        self.from == self.to
    }
}
