use std::path::Path;

use anyhow::{Context, Result};
use coin_ledger::{
    bin_utils::{Command, Service},
    config::LedgerConfig,
};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let command = Command::parse(std::env::args().skip(1))?;
    let config = match std::env::var_os("COIN_LEDGER_CONFIG") {
        Some(path) => LedgerConfig::load(Path::new(&path))
            .with_context(|| format!("Failed to load config `{}`", path.to_string_lossy()))?,
        None => LedgerConfig::default(),
    };

    let service = Service {
        config,
        output: &mut std::io::stdout(),
        error_printer: Box::new(|line, err| {
            eprintln!("Rejected transaction at line {line}: {err}")
        }),
    };
    service.run(command)
}
