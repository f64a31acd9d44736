use std::io::{ErrorKind, Write};

/// A polled, non-blocking byte source.
///
/// Absence of a byte is a normal condition: callers retry until their own
/// deadline expires. Implementations must never block inside these methods
/// for longer than a single underlying read.
pub trait ByteSource {
    /// Look at the next byte without consuming it.
    fn peek(&mut self) -> Option<u8>;

    /// Consume and return the next byte.
    fn read_one(&mut self) -> Option<u8>;

    /// Whether at least one byte can be read right now.
    fn available(&mut self) -> bool {
        self.peek().is_some()
    }

    /// Discard every byte that is currently buffered.
    fn flush_remaining(&mut self);
}

impl<S: ByteSource + ?Sized> ByteSource for &mut S {
    fn peek(&mut self) -> Option<u8> {
        (**self).peek()
    }

    fn read_one(&mut self) -> Option<u8> {
        (**self).read_one()
    }

    fn available(&mut self) -> bool {
        (**self).available()
    }

    fn flush_remaining(&mut self) {
        (**self).flush_remaining()
    }
}

/// A byte sink for outgoing frames.
pub trait ByteSink {
    /// Write every byte of `bytes`.
    fn write_bytes(&mut self, bytes: &[u8]) -> std::io::Result<()>;

    /// Write a single byte.
    fn write_byte(&mut self, byte: u8) -> std::io::Result<()> {
        self.write_bytes(&[byte])
    }

    /// Push buffered output to the link.
    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<W: Write> ByteSink for W {
    fn write_bytes(&mut self, bytes: &[u8]) -> std::io::Result<()> {
        let mut offset = 0usize;
        while offset < bytes.len() {
            match Write::write(self, &bytes[offset..]) {
                Ok(0) => return Err(std::io::Error::from(ErrorKind::WriteZero)),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(err),
            }
        }
        Ok(())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        loop {
            match Write::flush(self) {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(err),
            }
        }
    }
}
