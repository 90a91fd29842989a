//! logunify command-line interface
//!
//! Runs the configured shell commands side by side, records their output,
//! mirrors it to a remote peer, and replays recordings from a file or from
//! the network.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod app;
mod config;
mod dump;
mod flags;

use clap::Parser;
use color_eyre::Result;
use color_eyre::eyre::WrapErr;
use config::Config;
use flags::Flags;
use std::sync::Mutex;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Log filter used when `RUST_LOG` is unset
const DEFAULT_FILTER: &str = "warn,logunify=info";

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let mut flags = Flags::parse();
    let loaded = Config::load(&flags.config);
    if let Ok(config) = &loaded {
        flags.apply_overrides(&config.flags);
    }
    flags.finalize();
    flags.validate()?;

    init_tracing(&flags)?;

    let config = match loaded {
        Ok(config) => Some(config),
        Err(error) if flags.replay => {
            debug!(%error, "replaying without a config file");
            None
        }
        Err(error) => return Err(error).wrap_err("cannot load configuration"),
    };

    app::run(&flags, config.as_ref()).await?;
    Ok(())
}

/// Log to stderr, or to `--trace-file`; nothing is logged while the viewer
/// owns the terminal unless a trace file is given
fn init_tracing(flags: &Flags) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    if let Some(path) = &flags.trace_file {
        let file = std::fs::File::create(path)
            .wrap_err_with(|| format!("cannot create trace file {}", path.display()))?;
        builder.with_ansi(false).with_writer(Mutex::new(file)).init();
    } else if !flags.ui {
        builder.with_writer(std::io::stderr).init();
    }
    Ok(())
}
