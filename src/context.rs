// SPDX-FileCopyrightText: 2024 embr <git@liclac.eu>
// SPDX-FileCopyrightText: 2024 Wavelens UG <info@wavelens.io>
//
// SPDX-License-Identifier: EUPL-1.2

use crate::{FlushGuard, Logger, LoggerBuilder, Result, TestOutput};

/// Per-suite (or per-test) state, built once at setup and passed around by reference.
///
/// Owns its logger: nothing is published anywhere, so any number of contexts can coexist
/// in one process without seeing each other's output. Dropping the context flushes.
///
/// ```
/// use harness_log::TestContext;
/// use tracing::info;
///
/// let ctx = TestContext::new()?;
/// let answer = ctx.run(|_| {
///     info!("setting up");
///     42
/// });
/// assert_eq!(answer, 42);
/// # Ok::<_, harness_log::Error>(())
/// ```
#[derive(Debug)]
pub struct TestContext {
    flush: FlushGuard,
}

impl TestContext {
    /// A development-profile logger writing through libtest's output capture.
    pub fn new() -> Result<Self> {
        Self::with_builder(Logger::builder().sink(TestOutput))
    }

    pub fn with_builder(builder: LoggerBuilder) -> Result<Self> {
        Ok(Self::with_logger(builder.build()?))
    }

    /// Wraps an existing logger. It's flushed when the context is dropped.
    pub fn with_logger(logger: Logger) -> Self {
        Self {
            flush: logger.flush_guard(),
        }
    }

    pub fn logger(&self) -> &Logger {
        self.flush.logger()
    }

    /// Runs `f` with this context's logger as the current thread's default.
    pub fn run<T>(&self, f: impl FnOnce(&Self) -> T) -> T {
        self.logger().in_scope(|| f(self))
    }
}
