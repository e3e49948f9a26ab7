// Copyright © Aptos Foundation
// SPDX-License-Identifier: Apache-2.0

//! Global logger definition and functions

use once_cell::sync::OnceCell;
use std::{
    fs::{File, OpenOptions},
    io,
    path::PathBuf,
    sync::Mutex,
};
use tracing_subscriber::{EnvFilter, fmt::writer::BoxMakeWriter};

pub use tracing::Level;

/// Set once the global subscriber has been installed
static LOGGER: OnceCell<()> = OnceCell::new();

/// Builder for the global logger. `RUST_LOG`, when set, takes precedence over
/// the configured level.
pub struct StressLoggerBuilder {
    level: Level,
    log_file: Option<PathBuf>,
    ansi: bool,
}

impl StressLoggerBuilder {
    fn new() -> Self {
        Self {
            level: Level::INFO,
            log_file: None,
            ansi: true,
        }
    }

    pub fn level(&mut self, level: Level) -> &mut Self {
        self.level = level;
        self
    }

    /// Write to `path` (appending) instead of stdout.
    pub fn log_file(&mut self, path: Option<PathBuf>) -> &mut Self {
        self.log_file = path;
        self
    }

    pub fn ansi(&mut self, ansi: bool) -> &mut Self {
        self.ansi = ansi;
        self
    }

    /// Installs the global subscriber. Calling this more than once is a no-op
    /// after the first successful call.
    pub fn build(&mut self) -> io::Result<()> {
        if LOGGER.get().is_some() {
            eprintln!("Global logger has already been set");
            return Ok(());
        }

        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.level.as_str().to_lowercase()));

        let (writer, ansi) = match &self.log_file {
            Some(path) => {
                let file: File = OpenOptions::new().create(true).append(true).open(path)?;
                (BoxMakeWriter::new(Mutex::new(file)), false)
            },
            None => (BoxMakeWriter::new(io::stdout), self.ansi),
        };

        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(writer)
            .with_ansi(ansi)
            .with_thread_names(true)
            .finish();

        if tracing::subscriber::set_global_default(subscriber).is_err() {
            eprintln!("A global tracing subscriber was already installed");
        }
        let _ = LOGGER.set(());
        Ok(())
    }
}

pub struct StressLogger;

impl StressLogger {
    pub fn builder() -> StressLoggerBuilder {
        StressLoggerBuilder::new()
    }

    /// Logger for unit tests: debug level, stdout, ignores repeat calls.
    pub fn init_for_testing() {
        let _ = Self::builder().level(Level::DEBUG).ansi(false).build();
    }

    pub fn is_initialized() -> bool {
        LOGGER.get().is_some()
    }
}
