use std::io::Write;

use crate::account::Account;
use csv::Writer;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct AccountBalance<'a> {
    pub account: &'a Account,
    pub balance: u64,
}

pub fn print_balances<'a, W>(
    output: &mut W,
    balances: impl Iterator<Item = AccountBalance<'a>>,
) -> anyhow::Result<()>
where
    W: Write,
{
    let mut writer = Writer::from_writer(output);
    for balance in balances {
        if let Err(err) = writer.serialize(balance) {
            anyhow::bail!("Failed to write to CSV: {err}")
        }
    }
    if let Err(err) = writer.flush() {
        anyhow::bail!("Failed to flush CSV writer: {err}")
    }
    Ok(())
}
