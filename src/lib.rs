/// Account identifiers.
pub mod account;

/// Transfer record, the unit stored in the transaction log.
pub mod transaction;

/// Initial balance snapshot every replay starts from.
pub mod genesis;

/// Append-only, newline-delimited JSON transaction log.
/// Source of truth for every balance change after genesis.
pub mod tx_log;

/// In-memory balances, rebuilt deterministically by replaying genesis plus the log.
pub mod state;

/// Transactions applied in memory but not yet durable, flushed in FIFO order.
pub mod mempool;

/// Ledger handle tying state, mempool and log together.
pub mod ledger;

/// Where genesis and log live on disk.
pub mod config;

/// Bootstraps the library within the binary. Kept here so integration
/// tests can use it too.
pub mod bin_utils;

pub use account::Account;
pub use ledger::{Ledger, LedgerError};
pub use transaction::Transaction;
