use std::collections::VecDeque;

use tracing::warn;

use crate::{
    transaction::Transaction,
    tx_log::{LogError, TransactionSink},
};

/// Transactions already applied in memory but not yet durably logged.
#[derive(Debug, Default)]
pub struct Mempool {
    pending: VecDeque<Transaction>,
}

impl Mempool {
    pub fn push(&mut self, tx: Transaction) {
        self.pending.push_back(tx);
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Transaction> {
        self.pending.iter()
    }

    /// Appends pending transactions to `sink` in FIFO order.
    ///
    /// An entry leaves the buffer only once its append succeeded. On failure
    /// the failed entry and everything behind it stay queued.
    /// Returns the number of entries flushed.
    pub fn drain_into<S>(&mut self, sink: &mut S) -> Result<usize, LogError>
    where
        S: TransactionSink + ?Sized,
    {
        let mut flushed = 0;
        while let Some(tx) = self.pending.front() {
            if let Err(err) = sink.append(tx) {
                warn!(flushed, pending = self.pending.len(), "mempool flush stopped: {err}");
                return Err(err);
            }
            self.pending.pop_front();
            flushed += 1;
        }
        Ok(flushed)
    }
}
