// SPDX-FileCopyrightText: 2024 embr <git@liclac.eu>
// SPDX-FileCopyrightText: 2024 Wavelens UG <info@wavelens.io>
//
// SPDX-License-Identifier: EUPL-1.2

//! The process-wide logger slot.
//! -----------------------------
//!
//! The slot starts out empty. [`init()`] and [`init_with()`] are the only writers, and only
//! write once a logger has been built successfully. Every later call replaces the
//! published logger. The previous one is not torn down, and anyone holding a clone (or
//! its [`FlushGuard`]) can keep using it.
//!
//! Publishing is atomic, but concurrent initializers are not ordered: if two threads
//! race, either one may end up in the slot. Call [`init()`] once, before tests start.
//!
//! Prefer [`crate::TestContext`] in new code; it needs no global state at all.

use crate::{FlushGuard, Logger, LoggerBuilder, Result};
use std::sync::{PoisonError, RwLock};
use tracing::{debug, instrument};

static SLOT: RwLock<Option<Logger>> = RwLock::new(None);

/// Builds a development-profile logger on stderr and publishes it.
///
/// Every line goes straight to stderr, so output logged after the guard is gone still
/// shows up. The guard matters for buffered loggers from [`init_with()`]: it flushes when
/// dropped, and nothing flushes a published logger after that.
///
/// ```no_run
/// # fn main() -> harness_log::Result<()> {
/// let _flush = harness_log::global::init()?;
/// assert!(harness_log::global::is_initialized());
/// # Ok(())
/// # }
/// ```
pub fn init() -> Result<FlushGuard> {
    init_with(Logger::builder())
}

/// Like [`init()`], with a custom builder. On error, the slot is left as it was.
#[instrument(skip_all, level = "debug")]
pub fn init_with(builder: LoggerBuilder) -> Result<FlushGuard> {
    let logger = builder.build()?;
    let guard = logger.flush_guard();
    let prev = publish(logger);
    debug!(replaced = prev.is_some(), "Published logger");
    Ok(guard)
}

/// The published logger, if any.
pub fn logger() -> Option<Logger> {
    SLOT.read().unwrap_or_else(PoisonError::into_inner).clone()
}

/// Whether a logger has been published.
pub fn is_initialized() -> bool {
    SLOT.read()
        .unwrap_or_else(PoisonError::into_inner)
        .is_some()
}

/// Runs `f` with the published logger as the current thread's default. If nothing is
/// published yet, `f` runs with whatever the default already is.
pub fn in_scope<T>(f: impl FnOnce() -> T) -> T {
    match logger() {
        Some(logger) => logger.in_scope(f),
        None => f(),
    }
}

fn publish(logger: Logger) -> Option<Logger> {
    SLOT.write()
        .unwrap_or_else(PoisonError::into_inner)
        .replace(logger)
}
