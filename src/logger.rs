// SPDX-FileCopyrightText: 2024 embr <git@liclac.eu>
// SPDX-FileCopyrightText: 2024 Wavelens UG <info@wavelens.io>
//
// SPDX-License-Identifier: EUPL-1.2

//! The logger handle.
//! ------------------
//!
//! A [`Logger`] is a [`tracing::Dispatch`] configured with the development profile, plus
//! the [`SinkBuffer`] its output goes through. Nothing is installed as a global
//! `tracing` subscriber: use [`Logger::in_scope()`], [`Logger::set_default()`] or
//! [`Logger::enter()`] to route events to it.

use crate::buffer::{SinkBuffer, DEFAULT_CAPACITY};
use crate::config::{self, Verbosity};
use crate::sink::{Sink, Stderr};
use crate::{Result, ResultExt};
use chrono::Local;
use std::fmt::Debug;
use std::sync::Arc;
use tap::TapFallible;
use tracing::subscriber::DefaultGuard;
use tracing::{warn, Dispatch};
use tracing_subscriber::fmt::{format::Writer, time::FormatTime};

/// ISO-8601 local time, millisecond precision.
#[derive(Debug, Clone, Copy, Default)]
struct DevTime;

impl FormatTime for DevTime {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        use std::fmt::Write as _;
        write!(w, "{}", Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z"))
    }
}

/// Builds a [`Logger`]. The defaults are the development profile, writing every line to
/// stderr as it's logged.
///
/// ```
/// use harness_log::{Logger, MemorySink, Verbosity};
///
/// let sink = MemorySink::new();
/// let logger = Logger::builder()
///     .sink(sink.clone())
///     .verbosity(Verbosity::Trace)
///     .build()?;
/// logger.in_scope(|| tracing::trace!("hello"));
/// logger.flush()?;
/// assert!(sink.contents().contains("hello"));
/// # Ok::<_, Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug)]
pub struct LoggerBuilder {
    sink: Box<dyn Sink>,
    verbosity: Verbosity,
    filter: Option<String>,
    env_var: Option<String>,
    buffer_capacity: usize,
    ansi: bool,
}

impl Default for LoggerBuilder {
    fn default() -> Self {
        Self {
            sink: Box::new(Stderr),
            verbosity: Verbosity::default(),
            filter: None,
            env_var: None,
            buffer_capacity: 0,
            ansi: false,
        }
    }
}

impl LoggerBuilder {
    /// Where output goes. Opened once, by [`LoggerBuilder::build()`].
    pub fn sink<S: Sink + 'static>(mut self, sink: S) -> Self {
        self.sink = Box::new(sink);
        self
    }

    /// Minimum level, if no filter directives are given.
    ///
    /// Default: [`Verbosity::Debug`].
    pub fn verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// [`tracing_subscriber::EnvFilter`] directives, eg. `"warn,my_crate=trace"`.
    /// Takes precedence over both [`LoggerBuilder::verbosity()`] and
    /// [`LoggerBuilder::filter_from_env()`].
    pub fn filter<S: Into<String>>(mut self, directives: S) -> Self {
        self.filter = Some(directives.into());
        self
    }

    /// Reads filter directives from an environment variable (usually `RUST_LOG`) at build
    /// time, if it's set and non-blank.
    pub fn filter_from_env<S: Into<String>>(mut self, var: S) -> Self {
        self.env_var = Some(var.into());
        self
    }

    /// How many bytes may be pending before they're written through to the sink.
    /// 0 disables buffering.
    ///
    /// Buffered output only reaches the sink on a flush, a full buffer, or when the last
    /// handle is dropped. A logger published with [`crate::global::init_with()`] is never
    /// dropped, so anything still pending when its [`FlushGuard`] goes away is lost at exit.
    ///
    /// Default: `0`, every line goes straight to the sink.
    pub fn buffer_capacity(mut self, bytes: usize) -> Self {
        self.buffer_capacity = bytes;
        self
    }

    /// Buffers up to 64KiB; shorthand for [`LoggerBuilder::buffer_capacity()`].
    pub fn buffered(self) -> Self {
        self.buffer_capacity(DEFAULT_CAPACITY)
    }

    /// Whether to use ANSI colours.
    ///
    /// Default: `false`
    pub fn ansi(mut self, ansi: bool) -> Self {
        self.ansi = ansi;
        self
    }

    /// Builds the logger. The filter is resolved before the sink is opened, so a bad
    /// filter never touches the sink.
    pub fn build(self) -> Result<Logger> {
        let filter = config::resolve_filter(
            self.verbosity,
            self.filter.as_deref(),
            self.env_var.as_deref(),
        )?;
        let buffer = Arc::new(SinkBuffer::new(
            self.sink.open().construction()?,
            self.buffer_capacity,
        ));

        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(Arc::clone(&buffer))
            .with_ansi(self.ansi)
            .with_timer(DevTime)
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .with_thread_names(true)
            .finish();

        Ok(Logger {
            inner: Arc::new(Inner {
                dispatch: Dispatch::new(subscriber),
                buffer,
            }),
        })
    }
}

struct Inner {
    dispatch: Dispatch,
    buffer: Arc<SinkBuffer>,
}

/// Shared handle to a configured logger. Clones refer to the same logger.
///
/// If the logger is buffered, whatever's still pending when the last clone goes away is
/// flushed, but errors at that point are lost; prefer an explicit [`Logger::flush()`] or a
/// [`FlushGuard`].
#[derive(Clone)]
pub struct Logger {
    inner: Arc<Inner>,
}

impl Debug for Logger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Logger")
            .field("buffer", &self.inner.buffer)
            .finish_non_exhaustive()
    }
}

impl Logger {
    /// Returns a Builder.
    pub fn builder() -> LoggerBuilder {
        LoggerBuilder::default()
    }

    /// A development-profile logger on stderr.
    pub fn development() -> Result<Self> {
        Self::builder().build()
    }

    /// The underlying dispatcher, for use with [`tracing::dispatcher`] directly.
    pub fn dispatch(&self) -> &Dispatch {
        &self.inner.dispatch
    }

    /// Runs `f` with this logger as the current thread's default.
    pub fn in_scope<T>(&self, f: impl FnOnce() -> T) -> T {
        tracing::dispatcher::with_default(&self.inner.dispatch, f)
    }

    /// Makes this logger the current thread's default until the guard is dropped.
    pub fn set_default(&self) -> DefaultGuard {
        tracing::dispatcher::set_default(&self.inner.dispatch)
    }

    /// Makes this logger the current thread's default, and flushes it when the returned
    /// guard is dropped, on every way out of the scope holding it.
    pub fn enter(&self) -> Entered {
        Entered {
            _default: self.set_default(),
            _flush: self.flush_guard(),
        }
    }

    /// Writes out everything buffered, and flushes the sink.
    pub fn flush(&self) -> std::io::Result<()> {
        self.inner.buffer.flush_pending()
    }

    /// Returns a guard that flushes this logger when dropped.
    pub fn flush_guard(&self) -> FlushGuard {
        FlushGuard {
            logger: self.clone(),
        }
    }

    /// Number of bytes written but not yet flushed to the sink.
    pub fn buffered_len(&self) -> usize {
        self.inner.buffer.pending_len()
    }

    /// Whether both handles refer to the same logger.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

/// Flushes a [`Logger`] when dropped. Flush errors are reported through `tracing`, to
/// whatever is the default at that point.
#[derive(Debug)]
#[must_use = "the logger is flushed as soon as the guard is dropped"]
pub struct FlushGuard {
    logger: Logger,
}

impl FlushGuard {
    pub fn logger(&self) -> &Logger {
        &self.logger
    }
}

impl Drop for FlushGuard {
    fn drop(&mut self) {
        let _ = self
            .logger
            .flush()
            .tap_err(|err| warn!(%err, "Couldn't flush logger"));
    }
}

/// Returned from [`Logger::enter()`].
///
/// Field order matters: the previous default is restored before the flush.
#[must_use = "the logger is only the default while the guard is alive"]
pub struct Entered {
    _default: DefaultGuard,
    _flush: FlushGuard,
}

impl Debug for Entered {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Entered")
            .field("logger", self._flush.logger())
            .finish_non_exhaustive()
    }
}
