mod clipboard;
mod config;
mod logging;
mod serial;

use anyhow::{Context, Result};
use clap::Parser;
use clipboard::{PasteCommand, SystemClipboard};
use config::{Args, RuntimeConfig};
use serial::SerialOpener;
use std::io;
use symbridge_core::{CancelToken, ConnectionManager, Renderer, RetryPolicy, SymbolSession};
use tracing::info;

fn main() -> Result<()> {
    let args = Args::parse();
    let config = config::resolve(args)?;
    let log_guard = logging::init_logging(&config.log_dir, &config.port);

    let cancel = CancelToken::new();
    let interrupt = cancel.clone();
    ctrlc::set_handler(move || interrupt.cancel())
        .context("Failed to install Ctrl+C handler")?;

    let renderer = Renderer::new(io::stdout(), config.catalog.clone()).with_timing(config.timing);
    let clipboard = SystemClipboard::new(paste_command(&config));
    let mut session = SymbolSession::new(renderer, clipboard).with_debug(config.debug);
    session.start().context("Failed to draw the symbol view")?;

    let opener = SerialOpener::new(&config.port, config.baud, config.read_timeout);
    let policy = RetryPolicy::new(config.retry_secs);
    info!(
        "symbridge_start: port={} baud={} catalog=[{}]",
        config.port, config.baud, config.catalog
    );
    if let Some(guard) = &log_guard {
        info!("symbridge_log_file: {}", guard.path().display());
    }
    let mut manager = ConnectionManager::new(opener, policy, cancel);
    manager.run(&mut session);

    info!(
        "symbridge_exit: sessions={}",
        manager.retry_state().sessions
    );
    session.farewell().context("Failed to write exit message")?;
    Ok(())
}

fn paste_command(config: &RuntimeConfig) -> Option<PasteCommand> {
    if !config.paste {
        return None;
    }
    match &config.paste_command {
        Some(words) => PasteCommand::from_words(words.clone()),
        None => PasteCommand::platform_default(),
    }
}
