use std::collections::BTreeMap;

use thiserror::Error;

use crate::{account::Account, genesis::Genesis, transaction::Transaction};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StateError {
    #[error("Insufficient balance: `{account}` has {balance}, needs {value}")]
    InsufficientBalance {
        account: Account,
        balance: u64,
        value: u64,
    },
    #[error("Balance of `{account}` would overflow")]
    BalanceOverflow { account: Account },
}

/// Validated transfer, carries the balances both accounts end up with.
/// Produced by [`StateIndex::validate`], committed by [`StateIndex::apply`].
#[derive(Debug, PartialEq, Eq)]
pub struct Transfer {
    from: Account,
    to: Account,
    from_balance: u64,
    to_balance: u64,
}

/// Account balances derived from genesis plus every applied transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StateIndex {
    balances: BTreeMap<Account, u64>,
}

impl StateIndex {
    pub fn from_genesis(genesis: &Genesis) -> Self {
        Self {
            balances: genesis.balances.clone(),
        }
    }

    pub fn balance(&self, account: &Account) -> u64 {
        self.balances.get(account).copied().unwrap_or_default()
    }

    /// Committed balances, ordered by account.
    pub fn balances(&self) -> &BTreeMap<Account, u64> {
        &self.balances
    }

    pub fn total_supply(&self) -> u128 {
        self.balances.values().map(|b| u128::from(*b)).sum()
    }

    /// Checks `tx` against current balances without touching them.
    ///
    /// Self-transfers are validated like any other transfer: the sender must
    /// hold at least `value`, even though the net effect is zero.
    pub fn validate(&self, tx: &Transaction) -> Result<Transfer, StateError> {
        let balance = self.balance(&tx.from);
        if balance < tx.value {
            return Err(StateError::InsufficientBalance {
                account: tx.from.clone(),
                balance,
                value: tx.value,
            });
        }
        if tx.is_self_transfer() {
            return Ok(Transfer {
                from: tx.from.clone(),
                to: tx.to.clone(),
                from_balance: balance,
                to_balance: balance,
            });
        }
        let to_balance = self
            .balance(&tx.to)
            .checked_add(tx.value)
            .ok_or_else(|| StateError::BalanceOverflow {
                account: tx.to.clone(),
            })?;
        Ok(Transfer {
            from: tx.from.clone(),
            to: tx.to.clone(),
            from_balance: balance - tx.value,
            to_balance,
        })
    }

    /// Moves `tx.value` from sender to receiver. On error nothing changes.
    pub fn apply(&mut self, tx: &Transaction) -> Result<(), StateError> {
        let transfer = self.validate(tx)?;
        self.commit(transfer);
        Ok(())
    }

    fn commit(&mut self, transfer: Transfer) {
        self.balances.insert(transfer.from, transfer.from_balance);
        self.balances.insert(transfer.to, transfer.to_balance);
    }
}
