use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;

use bytes::{Buf, BytesMut};
use tracing::{debug, trace, warn};

use crate::error::{Result, TransportError};
use crate::traits::ByteSource;

const INITIAL_BUFFER_CAPACITY: usize = 4 * 1024;
const READ_CHUNK_SIZE: usize = 512;

/// Adapts any [`Read`] into a polled [`ByteSource`].
///
/// Bytes are pulled from the inner reader in chunks whenever the internal
/// buffer runs dry. `WouldBlock`, `TimedOut` and `Interrupted` are treated as
/// "nothing available yet". End of input and hard errors close the source;
/// buffered bytes remain readable.
///
/// The inner reader should be non-blocking or carry a short read timeout
/// (as serial devices usually do); a reader that blocks indefinitely
/// defeats the caller's deadline.
pub struct IoSource<R> {
    inner: R,
    buf: BytesMut,
    closed: bool,
    error: Option<std::io::Error>,
}

impl<R: Read> IoSource<R> {
    /// Wrap a reader.
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            closed: false,
            error: None,
        }
    }

    /// Whether the inner reader reached end of input or failed.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Whether the source is closed and every buffered byte was consumed.
    pub fn is_exhausted(&self) -> bool {
        self.closed && self.buf.is_empty()
    }

    /// Take the error that closed the source, if any.
    pub fn take_error(&mut self) -> Option<std::io::Error> {
        self.error.take()
    }

    /// Borrow the inner reader.
    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    /// Consume the source and return the inner reader.
    pub fn into_inner(self) -> R {
        self.inner
    }

    fn fill(&mut self) {
        if !self.buf.is_empty() || self.closed {
            return;
        }

        let mut chunk = [0u8; READ_CHUNK_SIZE];
        match self.inner.read(&mut chunk) {
            Ok(0) => {
                debug!("byte source reached end of input");
                self.closed = true;
            }
            Ok(n) => {
                trace!(bytes = n, "byte source filled");
                self.buf.extend_from_slice(&chunk[..n]);
            }
            Err(err)
                if matches!(
                    err.kind(),
                    ErrorKind::WouldBlock | ErrorKind::TimedOut | ErrorKind::Interrupted
                ) => {}
            Err(err) => {
                warn!(error = %err, "byte source read failed, closing");
                self.closed = true;
                self.error = Some(err);
            }
        }
    }
}

impl IoSource<File> {
    /// Open a device node or capture file as a byte source.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| TransportError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(?path, "opened byte source");
        Ok(Self::new(file))
    }
}

impl<R: Read> ByteSource for IoSource<R> {
    fn peek(&mut self) -> Option<u8> {
        self.fill();
        self.buf.first().copied()
    }

    fn read_one(&mut self) -> Option<u8> {
        self.fill();
        if self.buf.is_empty() {
            return None;
        }
        Some(self.buf.get_u8())
    }

    fn available(&mut self) -> bool {
        self.fill();
        !self.buf.is_empty()
    }

    fn flush_remaining(&mut self) {
        trace!(discarded = self.buf.len(), "flushing byte source");
        self.buf.clear();
    }
}

impl<R> std::fmt::Debug for IoSource<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IoSource")
            .field("buffered", &self.buf.len())
            .field("closed", &self.closed)
            .finish()
    }
}
