// SPDX-FileCopyrightText: 2023 embr <git@liclac.eu>
// SPDX-FileCopyrightText: 2024 Wavelens UG <info@wavelens.io>
//
// SPDX-License-Identifier: EUPL-1.2

//! harness-log
//! ===========
//!
//! Development-mode logging for test harnesses, built on [`tracing`].
//!
//! - To bootstrap a suite-wide logger, call [`global::init()`] once and hold on to the
//!   returned [`FlushGuard`] for as long as the suite runs.
//! - To give each test (or each suite) its own logger without any global state, build a
//!   [`TestContext`] and pass it around by reference.
//!
//! The development profile is verbose and human-readable: `DEBUG` and up, with source
//! file, line number, target and thread name on every line. Everything about how lines
//! look is up to [`tracing_subscriber::fmt`].
//!
//! ```no_run
//! use tracing::info;
//!
//! # fn main() -> harness_log::Result<()> {
//! let _flush = harness_log::global::init()?;
//! harness_log::global::in_scope(|| info!("suite starting"));
//! # Ok(())
//! # }
//! ```

pub mod buffer;
pub mod config;
pub mod context;
pub mod global;
pub mod logger;
pub mod sink;

pub use config::Verbosity;
pub use context::TestContext;
pub use logger::{Entered, FlushGuard, Logger, LoggerBuilder};
pub use sink::{FailingSink, FileSink, MemorySink, Sink, Stderr, Stdout, TestOutput};

use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

trait ResultExt<T> {
    fn construction(self) -> Result<T>;
}

impl<T, E: Into<ConstructionError>> ResultExt<T> for std::result::Result<T, E> {
    fn construction(self) -> Result<T> {
        self.map_err(|err| Error::LoggerConstruction(err.into()))
    }
}

/// Error enum for the library.
#[derive(Debug, Error)]
pub enum Error {
    /// The logging subsystem couldn't be set up. Nothing was published.
    #[error("couldn't construct logger: {0}")]
    LoggerConstruction(#[source] ConstructionError),
}

/// Underlying cause of an [`Error::LoggerConstruction`].
#[derive(Debug, Error)]
pub enum ConstructionError {
    /// The sink couldn't be opened.
    #[error("sink unavailable: {0}")]
    Sink(#[from] std::io::Error),
    /// A filter directive didn't parse.
    #[error("invalid filter: {0}")]
    Filter(#[from] tracing_subscriber::filter::ParseError),
    /// An invalid value of some sort was encountered.
    #[error("invalid value: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_construction_error_keeps_cause() {
        let err = Err::<(), _>(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "nope",
        ))
        .construction()
        .unwrap_err();

        assert_eq!(
            err.to_string(),
            "couldn't construct logger: sink unavailable: nope"
        );
        let source = err.source().expect("no source");
        assert!(matches!(
            source.downcast_ref::<ConstructionError>(),
            Some(ConstructionError::Sink(io)) if io.kind() == std::io::ErrorKind::PermissionDenied
        ));
    }
}
