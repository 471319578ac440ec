// SPDX-FileCopyrightText: 2024 embr <git@liclac.eu>
// SPDX-FileCopyrightText: 2024 Wavelens UG <info@wavelens.io>
//
// SPDX-License-Identifier: EUPL-1.2

//! Where log output ends up.
//! -------------------------
//!
//! A [`Sink`] is opened exactly once, when a [`crate::Logger`] is built; if opening fails,
//! so does construction. That makes it the seam for fault injection: see [`FailingSink`].

use std::fmt::Debug;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

/// Something a logger can write to.
pub trait Sink: Debug + Send + Sync {
    /// Opens the underlying writer.
    fn open(&self) -> io::Result<Box<dyn Write + Send>>;
}

/// Standard error. The development default.
#[derive(Debug, Clone, Copy, Default)]
pub struct Stderr;

impl Sink for Stderr {
    fn open(&self) -> io::Result<Box<dyn Write + Send>> {
        Ok(Box::new(io::stderr()))
    }
}

/// Standard output.
#[derive(Debug, Clone, Copy, Default)]
pub struct Stdout;

impl Sink for Stdout {
    fn open(&self) -> io::Result<Box<dyn Write + Send>> {
        Ok(Box::new(io::stdout()))
    }
}

/// Standard output, through libtest's output capturing: only shown for failing tests
/// (or with `--nocapture`).
#[derive(Debug, Clone, Copy, Default)]
pub struct TestOutput;

impl Sink for TestOutput {
    fn open(&self) -> io::Result<Box<dyn Write + Send>> {
        Ok(Box::new(tracing_subscriber::fmt::TestWriter::new()))
    }
}

/// Appends to a file, creating it if needed. The parent directory must exist.
#[derive(Debug, Clone)]
pub struct FileSink {
    path: PathBuf,
}

impl FileSink {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_owned(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Sink for FileSink {
    fn open(&self) -> io::Result<Box<dyn Write + Send>> {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        Ok(Box::new(file))
    }
}

/// Collects output in memory. Clones share the same buffer, so keep one around to
/// inspect what was written.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    buf: Arc<Mutex<Vec<u8>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far, lossily decoded as UTF-8.
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.lock()).into_owned()
    }

    pub fn lines(&self) -> Vec<String> {
        self.contents().lines().map(str::to_owned).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<u8>> {
        self.buf.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Sink for MemorySink {
    fn open(&self) -> io::Result<Box<dyn Write + Send>> {
        Ok(Box::new(self.clone()))
    }
}

impl Write for MemorySink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Never opens. Building a logger on this always fails with
/// [`crate::Error::LoggerConstruction`].
#[derive(Debug, Clone)]
pub struct FailingSink {
    kind: io::ErrorKind,
    msg: String,
}

impl FailingSink {
    pub fn new<S: Into<String>>(kind: io::ErrorKind, msg: S) -> Self {
        Self {
            kind,
            msg: msg.into(),
        }
    }
}

impl Default for FailingSink {
    fn default() -> Self {
        Self::new(io::ErrorKind::Other, "sink unavailable")
    }
}

impl Sink for FailingSink {
    fn open(&self) -> io::Result<Box<dyn Write + Send>> {
        Err(io::Error::new(self.kind, self.msg.clone()))
    }
}
