//! Command surface of the `coin-ledger` binary: `balances`, `tx` and CSV `import`.
//!
//! [`Service`] opens the ledger, runs one [`Command`] and always closes it again.
//! Transactions rejected during an import don't abort the batch, they are handed
//! to the caller's error printer together with their CSV line.

use std::{fs::File, io::Write, path::PathBuf};

use crate::{
    config::LedgerConfig,
    ledger::{Ledger, LedgerError},
    transaction::Transaction,
};
use anyhow::{Context, Result};
use csv_parser::CsvTransactionParser;
use csv_printer::{AccountBalance, print_balances};
pub mod csv_parser;
pub mod csv_printer;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// List all balances, ordered by account.
    Balances,
    /// Submit a single transfer.
    Submit(Transaction),
    /// Submit every `from,to,value` row of a CSV file, in order.
    Import(PathBuf),
}

impl Command {
    pub fn parse(mut args: impl Iterator<Item = String>) -> Result<Self> {
        let name = args.next().context("Expected a command: `balances`, `tx` or `import`")?;
        let command = match name.as_str() {
            "balances" => Self::Balances,
            "tx" => {
                let from = args.next().context("Expected the sender account")?;
                let to = args.next().context("Expected the receiver account")?;
                let value = args.next().context("Expected the value to send")?;
                let value = value
                    .parse()
                    .with_context(|| format!("Invalid value `{value}`"))?;
                Self::Submit(Transaction::new(from, to, value))
            }
            "import" => Self::Import(args.next().context("Expected a CSV file name")?.into()),
            other => anyhow::bail!("Unknown command `{other}`"),
        };
        if let Some(extra) = args.next() {
            anyhow::bail!("Unexpected argument `{extra}`")
        }
        Ok(command)
    }
}

pub struct Service<'w, W: 'w> {
    pub config: LedgerConfig,
    pub output: &'w mut W,
    /// Receives transactions rejected during import, with their CSV line.
    pub error_printer: Box<dyn FnMut(u64, LedgerError)>,
}

impl<'w, W> Service<'w, W>
where
    W: Write + 'w,
{
    pub fn run(mut self, command: Command) -> Result<()> {
        let mut ledger = Ledger::open(&self.config).context("Failed to open the ledger")?;
        let result = self.execute(&mut ledger, command);
        // close regardless, but the command's own error wins
        let closed = ledger.close();
        result?;
        closed.context("Failed to close the ledger")
    }

    fn execute(&mut self, ledger: &mut Ledger, command: Command) -> Result<()> {
        match command {
            Command::Balances => print_balances(
                self.output,
                ledger
                    .balances()
                    .iter()
                    .map(|(account, balance)| AccountBalance {
                        account,
                        balance: *balance,
                    }),
            ),
            Command::Submit(tx) => {
                ledger.submit(tx)?;
                writeln!(self.output, "TX successfully added to the ledger.")?;
                Ok(())
            }
            Command::Import(path) => {
                let file = File::open(&path)
                    .with_context(|| format!("Failed to open `{}`", path.display()))?;
                let parser = CsvTransactionParser::new(file)
                    .with_context(|| format!("Failed to read CSV header of `{}`", path.display()))?;

                let mut imported = 0usize;
                for (line, row) in parser {
                    let tx = row.with_context(|| {
                        format!("Failed to parse `{}` at line {line}", path.display())
                    })?;
                    match ledger.submit(tx) {
                        Ok(()) => imported += 1,
                        // not technical errors, the rest of the batch still applies
                        Err(err @ LedgerError::Rejected(_)) => (self.error_printer)(line, err),
                        Err(err) => return Err(err.into()),
                    }
                }
                writeln!(self.output, "{imported} TX(s) added to the ledger.")?;
                Ok(())
            }
        }
    }
}
