use std::collections::BTreeMap;

use thiserror::Error;
use tracing::{info, warn};

use crate::{
    account::Account,
    config::LedgerConfig,
    genesis::{Genesis, GenesisError},
    mempool::Mempool,
    state::{StateError, StateIndex},
    transaction::Transaction,
    tx_log::{LogError, TransactionLog, TransactionSink},
};

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error(transparent)]
    Genesis(#[from] GenesisError),
    #[error(transparent)]
    Log(#[from] LogError),
    #[error("Logged transaction at line {line} violates ledger state: {source}")]
    HistoryViolation {
        line: u64,
        #[source]
        source: StateError,
    },
    #[error(transparent)]
    Rejected(#[from] StateError),
    #[error("Failed to persist transaction, {pending} accepted transaction(s) not yet durable")]
    Durability {
        pending: usize,
        #[source]
        source: LogError,
    },
    #[error("Ledger closed with {pending} transaction(s) not yet durable")]
    UnflushedOnClose { pending: usize },
}

/// Open ledger: replayed balances, pending mempool and the log it writes to.
///
/// Single writer only. Opening two handles over the same log is not guarded
/// against and will interleave appends.
#[derive(Debug)]
pub struct Ledger<L = TransactionLog> {
    state: StateIndex,
    mempool: Mempool,
    log: L,
}

impl Ledger<TransactionLog> {
    /// Loads genesis and replays the whole log on top of it.
    /// Any corrupt or invalid historical record aborts the open.
    pub fn open(config: &LedgerConfig) -> Result<Self, LedgerError> {
        let genesis = Genesis::load(&config.genesis_path)?;
        let mut state = StateIndex::from_genesis(&genesis);
        let mut log = TransactionLog::open(&config.log_path)?;

        let mut replayed = 0u64;
        for record in log.replay()? {
            let (line, tx) = record?;
            state
                .apply(&tx)
                .map_err(|source| LedgerError::HistoryViolation { line, source })?;
            replayed += 1;
        }
        info!(
            replayed,
            accounts = state.balances().len(),
            log = %log.path().display(),
            "ledger opened"
        );

        Ok(Self::with_log(state, log))
    }
}

impl<L> Ledger<L>
where
    L: TransactionSink,
{
    fn with_log(state: StateIndex, log: L) -> Self {
        Self {
            state,
            mempool: Mempool::default(),
            log,
        }
    }

    /// Applies `tx` in memory, then writes the mempool through to the log.
    ///
    /// A rejected transaction never reaches the mempool. A [`LedgerError::Durability`]
    /// means `tx` is applied but not yet logged; call [`Ledger::flush`] to retry.
    pub fn submit(&mut self, tx: Transaction) -> Result<(), LedgerError> {
        self.state.apply(&tx)?;
        self.mempool.push(tx);
        self.flush()?;
        Ok(())
    }

    /// Drains pending transactions into the log, returns how many were written.
    pub fn flush(&mut self) -> Result<usize, LedgerError> {
        match self.mempool.drain_into(&mut self.log) {
            Ok(flushed) => Ok(flushed),
            Err(source) => Err(LedgerError::Durability {
                pending: self.mempool.len(),
                source,
            }),
        }
    }

    pub fn balances(&self) -> &BTreeMap<Account, u64> {
        self.state.balances()
    }

    pub fn state(&self) -> &StateIndex {
        &self.state
    }

    pub fn pending(&self) -> usize {
        self.mempool.len()
    }

    /// Releases the log. Pending transactions are not flushed here, they are
    /// reported as [`LedgerError::UnflushedOnClose`] after the log is closed.
    pub fn close(self) -> Result<(), LedgerError> {
        let Self { mempool, log, .. } = self;
        let closed = log.close();
        if !mempool.is_empty() {
            warn!(pending = mempool.len(), "ledger closed with unflushed transactions");
            closed?;
            return Err(LedgerError::UnflushedOnClose {
                pending: mempool.len(),
            });
        }
        closed?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    fn provision(genesis: &str, log: &str) -> (tempfile::TempDir, LedgerConfig) {
        let dir = tempfile::tempdir().unwrap();
        let config = LedgerConfig::in_dir(dir.path());
        fs::create_dir_all(config.genesis_path.parent().unwrap()).unwrap();
        fs::write(&config.genesis_path, genesis).unwrap();
        fs::write(&config.log_path, log).unwrap();
        (dir, config)
    }

    fn balances_of(ledger: &Ledger) -> Vec<(String, u64)> {
        ledger
            .balances()
            .iter()
            .map(|(acc, b)| (acc.to_string(), *b))
            .collect()
    }

    #[test]
    fn open_replays_log() {
        let (_dir, config) = provision(
            r#"{"balances": {"andrej": 1000000}}"#,
            "{\"from\":\"andrej\",\"to\":\"babayaga\",\"value\":2000}\n\
             {\"from\":\"andrej\",\"to\":\"andrej\",\"value\":100}\n\
             {\"from\":\"babayaga\",\"to\":\"andrej\",\"value\":1}\n",
        );
        let ledger = Ledger::open(&config).unwrap();
        assert_eq!(
            balances_of(&ledger),
            vec![("andrej".to_string(), 998_001), ("babayaga".to_string(), 1999)]
        );
        assert_eq!(ledger.pending(), 0);
        assert_eq!(ledger.state().total_supply(), 1_000_000);
        ledger.close().unwrap();
    }

    #[test]
    fn submit_persists_transaction() {
        let (_dir, config) = provision(r#"{"balances": {"A": 100, "B": 0}}"#, "");
        let mut ledger = Ledger::open(&config).unwrap();
        ledger.submit(Transaction::new("A", "B", 30)).unwrap();
        assert_eq!(ledger.pending(), 0);
        ledger.close().unwrap();

        assert_eq!(
            fs::read_to_string(&config.log_path).unwrap(),
            "{\"from\":\"A\",\"to\":\"B\",\"value\":30}\n"
        );
    }

    #[test]
    fn rejected_submit_is_not_logged() {
        let (_dir, config) = provision(r#"{"balances": {"A": 100, "B": 0}}"#, "");
        let mut ledger = Ledger::open(&config).unwrap();
        let err = ledger.submit(Transaction::new("A", "B", 1000)).unwrap_err();
        assert!(matches!(err, LedgerError::Rejected(StateError::InsufficientBalance { .. })));
        assert_eq!(ledger.pending(), 0);
        ledger.close().unwrap();
        assert_eq!(fs::read_to_string(&config.log_path).unwrap(), "");
    }

    #[test]
    fn missing_log_fails_open() {
        let dir = tempfile::tempdir().unwrap();
        let config = LedgerConfig::in_dir(dir.path());
        fs::create_dir_all(config.genesis_path.parent().unwrap()).unwrap();
        fs::write(&config.genesis_path, r#"{"balances": {}}"#).unwrap();
        let err = Ledger::open(&config).unwrap_err();
        assert!(matches!(err, LedgerError::Log(LogError::NotFound { .. })));
    }

    #[test]
    fn missing_genesis_fails_open() {
        let dir = tempfile::tempdir().unwrap();
        let err = Ledger::open(&LedgerConfig::in_dir(dir.path())).unwrap_err();
        assert!(matches!(err, LedgerError::Genesis(GenesisError::NotFound { .. })));
    }

    #[test]
    fn corrupt_history_fails_open() {
        let (_dir, config) = provision(
            r#"{"balances": {"A": 100}}"#,
            "{\"from\":\"A\",\"to\":\"B\",\"value\":30}\n{\"from\":\"A\"\n",
        );
        let err = Ledger::open(&config).unwrap_err();
        assert!(matches!(err, LedgerError::Log(LogError::CorruptRecord { line: 2, .. })));
    }

    #[test]
    fn overspending_history_fails_open() {
        let (_dir, config) = provision(
            r#"{"balances": {"A": 100}}"#,
            "{\"from\":\"A\",\"to\":\"B\",\"value\":60}\n\
             {\"from\":\"A\",\"to\":\"B\",\"value\":60}\n",
        );
        let err = Ledger::open(&config).unwrap_err();
        assert!(matches!(
            err,
            LedgerError::HistoryViolation {
                line: 2,
                source: StateError::InsufficientBalance { .. }
            }
        ));
    }

    /// In-memory log that refuses appends while `failing` is set.
    struct FlakyLog {
        written: Vec<Transaction>,
        failing: bool,
    }

    impl TransactionSink for FlakyLog {
        fn append(&mut self, tx: &Transaction) -> Result<(), LogError> {
            if self.failing {
                return Err(LogError::Io(std::io::Error::other("disk full")));
            }
            self.written.push(tx.clone());
            Ok(())
        }
    }

    fn flaky_ledger(failing: bool) -> Ledger<FlakyLog> {
        let mut genesis = Genesis::default();
        genesis.balances.insert("A".into(), 100);
        genesis.balances.insert("B".into(), 0);
        let log = FlakyLog {
            written: Vec::new(),
            failing,
        };
        Ledger::with_log(StateIndex::from_genesis(&genesis), log)
    }

    #[test]
    fn failed_append_keeps_transaction_pending() {
        let mut ledger = flaky_ledger(true);
        let err = ledger.submit(Transaction::new("A", "B", 30)).unwrap_err();
        assert!(matches!(
            err,
            LedgerError::Durability {
                pending: 1,
                source: LogError::Io(_)
            }
        ));
        assert_eq!(ledger.pending(), 1);
        // in-memory state is ahead of the log
        assert_eq!(ledger.balances()["A"], 70);
        assert_eq!(ledger.balances()["B"], 30);
        assert!(ledger.log.written.is_empty());

        // later submissions queue up behind the stuck one
        let err = ledger.submit(Transaction::new("B", "A", 5)).unwrap_err();
        assert!(matches!(err, LedgerError::Durability { pending: 2, .. }));
    }

    #[test]
    fn flush_retries_pending_transactions() {
        let mut ledger = flaky_ledger(true);
        ledger.submit(Transaction::new("A", "B", 30)).unwrap_err();
        ledger.submit(Transaction::new("B", "A", 5)).unwrap_err();

        ledger.log.failing = false;
        assert_eq!(ledger.flush().unwrap(), 2);
        assert_eq!(ledger.pending(), 0);
        assert_eq!(
            ledger.log.written,
            vec![Transaction::new("A", "B", 30), Transaction::new("B", "A", 5)]
        );
        assert_eq!(ledger.flush().unwrap(), 0);
        ledger.close().unwrap();
    }

    #[test]
    fn close_reports_unflushed_transactions() {
        let mut ledger = flaky_ledger(true);
        ledger.submit(Transaction::new("A", "B", 30)).unwrap_err();
        let err = ledger.close().unwrap_err();
        assert!(matches!(err, LedgerError::UnflushedOnClose { pending: 1 }));
    }

    #[test]
    fn close_with_empty_mempool_is_clean() {
        let mut ledger = flaky_ledger(false);
        ledger.submit(Transaction::new("A", "B", 30)).unwrap();
        assert_eq!(ledger.log.written, vec![Transaction::new("A", "B", 30)]);
        ledger.close().unwrap();
    }
}
