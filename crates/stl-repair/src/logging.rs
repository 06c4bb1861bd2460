//! Verbosity-gated logging to stderr and an optional log file.

use std::fs::File;
use std::io::IsTerminal;
use std::path::Path;
use std::sync::Mutex;

use anyhow::Context;
use tracing::Subscriber;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::{self, MakeWriter};
use tracing_subscriber::prelude::*;

/// 0 = silent, 1 = warnings, 2 = progress, 3 = everything including Blender output.
pub fn level_for(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::OFF,
        1 => LevelFilter::WARN,
        2 => LevelFilter::INFO,
        _ => LevelFilter::TRACE,
    }
}

/// Console layer without timestamps plus, when given, a timestamped plain-text file layer.
pub fn subscriber<W>(
    level: LevelFilter,
    console: W,
    ansi: bool,
    log_file: Option<File>,
) -> impl Subscriber + Send + Sync + 'static
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let console_layer = fmt::layer()
        .with_writer(console)
        .with_ansi(ansi)
        .with_target(false)
        .without_time()
        .with_filter(level);

    let file_layer = log_file.map(|file| {
        fmt::layer()
            .with_writer(Mutex::new(file))
            .with_ansi(false)
            .with_target(false)
            .with_filter(level)
    });

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
}

/// Install the global subscriber. No file is created at verbosity 0.
pub fn init(verbosity: u8, log_path: Option<&Path>) -> anyhow::Result<()> {
    let level = level_for(verbosity);
    let log_file = match log_path {
        Some(path) if level != LevelFilter::OFF => Some(
            File::create(path)
                .with_context(|| format!("cannot create log file {}", path.display()))?,
        ),
        _ => None,
    };
    let ansi = std::io::stderr().is_terminal();
    tracing::subscriber::set_global_default(subscriber(level, std::io::stderr, ansi, log_file))
        .context("a global tracing subscriber is already installed")?;
    Ok(())
}
