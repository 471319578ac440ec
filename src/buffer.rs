// SPDX-FileCopyrightText: 2024 embr <git@liclac.eu>
// SPDX-FileCopyrightText: 2024 Wavelens UG <info@wavelens.io>
//
// SPDX-License-Identifier: EUPL-1.2

//! Buffering between the formatter and the [`crate::Sink`].

use bytes::{BufMut, BytesMut};
use std::fmt::Debug;
use std::io::{self, Write};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Capacity used by [`crate::LoggerBuilder::buffered()`].
pub const DEFAULT_CAPACITY: usize = 64 * 1024;

/// Holds formatted log lines until they're flushed to the sink.
///
/// `&SinkBuffer` implements [`Write`], so an `Arc<SinkBuffer>` is a
/// [`tracing_subscriber::fmt::MakeWriter`] as-is.
///
/// Lock order is always `out`, then `pending`. Nothing in here may emit `tracing` events:
/// the logger writing into this buffer may well be the current default.
pub struct SinkBuffer {
    out: Mutex<Box<dyn Write + Send>>,
    pending: Mutex<BytesMut>,
    capacity: usize,
}

impl SinkBuffer {
    /// Wraps a sink writer. A `capacity` of 0 writes every line straight through.
    pub fn new(out: Box<dyn Write + Send>, capacity: usize) -> Self {
        Self {
            out: Mutex::new(out),
            pending: Mutex::new(BytesMut::with_capacity(capacity)),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of bytes not yet handed to the sink.
    pub fn pending_len(&self) -> usize {
        lock(&self.pending).len()
    }

    /// Writes everything pending to the sink, then flushes the sink.
    ///
    /// If the sink fails partway, whatever it didn't accept goes back to the front of the
    /// buffer, ahead of anything written since, and is retried by the next flush.
    pub fn flush_pending(&self) -> io::Result<()> {
        let mut out = lock(&self.out);
        let chunk = lock(&self.pending).split();
        let mut written = 0;
        while written < chunk.len() {
            match out.write(&chunk[written..]) {
                Ok(0) => {
                    self.restore(&chunk[written..]);
                    return Err(io::ErrorKind::WriteZero.into());
                }
                Ok(n) => written += n,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
                Err(err) => {
                    self.restore(&chunk[written..]);
                    return Err(err);
                }
            }
        }
        out.flush()
    }

    fn restore(&self, unwritten: &[u8]) {
        let mut pending = lock(&self.pending);
        let mut restored = BytesMut::with_capacity(unwritten.len() + pending.len());
        restored.put_slice(unwritten);
        restored.put_slice(&pending);
        *pending = restored;
    }
}

impl Debug for SinkBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SinkBuffer")
            .field("pending", &self.pending_len())
            .field("capacity", &self.capacity)
            .finish_non_exhaustive()
    }
}

impl Write for &SinkBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let full = {
            let mut pending = lock(&self.pending);
            pending.put_slice(buf);
            pending.len() >= self.capacity
        };
        // The bytes are accepted either way; a failed write-through leaves them pending
        // and the error is for whoever flushes explicitly.
        if full {
            let _ = self.flush_pending();
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.flush_pending()
    }
}

impl Drop for SinkBuffer {
    fn drop(&mut self) {
        let _ = self.flush_pending();
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MemorySink, Sink};

    fn buffer(capacity: usize) -> (MemorySink, SinkBuffer) {
        let sink = MemorySink::new();
        let buf = SinkBuffer::new(sink.open().unwrap(), capacity);
        (sink, buf)
    }

    #[test]
    fn test_holds_until_flushed() {
        let (sink, buf) = buffer(1024);
        (&buf).write_all(b"hello\n").unwrap();
        assert_eq!(buf.pending_len(), 6);
        assert!(sink.is_empty());

        buf.flush_pending().unwrap();
        assert_eq!(buf.pending_len(), 0);
        assert_eq!(sink.contents(), "hello\n");
    }

    #[test]
    fn test_writes_through_when_full() {
        let (sink, buf) = buffer(8);
        (&buf).write_all(b"1234").unwrap();
        assert!(sink.is_empty());
        (&buf).write_all(b"5678\n").unwrap();
        assert_eq!(sink.contents(), "12345678\n");
        assert_eq!(buf.pending_len(), 0);
    }

    #[test]
    fn test_unbuffered() {
        let (sink, buf) = buffer(0);
        (&buf).write_all(b"now\n").unwrap();
        assert_eq!(sink.contents(), "now\n");
    }

    #[test]
    fn test_flush_on_drop() {
        let (sink, buf) = buffer(1024);
        (&buf).write_all(b"late\n").unwrap();
        drop(buf);
        assert_eq!(sink.contents(), "late\n");
    }

    /// Fails the first `failures` writes, then accepts everything.
    struct Flaky {
        failures: usize,
        sink: MemorySink,
    }
    impl Write for Flaky {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.failures > 0 {
                self.failures -= 1;
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "gone"));
            }
            self.sink.write(buf)
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn flaky(failures: usize, capacity: usize) -> (MemorySink, SinkBuffer) {
        let sink = MemorySink::new();
        let out = Flaky {
            failures,
            sink: sink.clone(),
        };
        (sink, SinkBuffer::new(Box::new(out), capacity))
    }

    #[test]
    fn test_flush_error_keeps_pending() {
        let (sink, buf) = flaky(1, 1024);
        (&buf).write_all(b"important\n").unwrap();
        let err = buf.flush_pending().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
        assert_eq!(buf.pending_len(), 10);
        assert!(sink.is_empty());

        (&buf).write_all(b"later\n").unwrap();
        buf.flush_pending().unwrap();
        assert_eq!(sink.contents(), "important\nlater\n");
        assert_eq!(buf.pending_len(), 0);
    }

    #[test]
    fn test_partial_write_keeps_rest() {
        struct Short {
            calls: usize,
            sink: MemorySink,
        }
        impl Write for Short {
            fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
                self.calls += 1;
                match self.calls {
                    1 => self.sink.write(&buf[..3]),
                    2 => Err(io::Error::new(io::ErrorKind::BrokenPipe, "gone")),
                    _ => self.sink.write(buf),
                }
            }
            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }

        let sink = MemorySink::new();
        let out = Short {
            calls: 0,
            sink: sink.clone(),
        };
        let buf = SinkBuffer::new(Box::new(out), 1024);
        (&buf).write_all(b"abcdef\n").unwrap();
        assert!(buf.flush_pending().is_err());
        assert_eq!(sink.contents(), "abc");
        assert_eq!(buf.pending_len(), 4);

        buf.flush_pending().unwrap();
        assert_eq!(sink.contents(), "abcdef\n");
    }

    #[test]
    fn test_write_through_error_is_not_a_write_error() {
        let (sink, buf) = flaky(1, 0);
        (&buf).write_all(b"first\n").unwrap();
        assert_eq!(buf.pending_len(), 6);

        (&buf).write_all(b"second\n").unwrap();
        assert_eq!(sink.contents(), "first\nsecond\n");
        assert_eq!(buf.pending_len(), 0);
    }
}
