use std::collections::VecDeque;

use crate::traits::ByteSource;

/// In-memory byte source.
///
/// Bytes pushed in are handed out in order. Useful for tests, simulators and
/// replaying captured link traffic.
#[derive(Debug, Default, Clone)]
pub struct MemorySource {
    bytes: VecDeque<u8>,
}

impl MemorySource {
    /// Create an empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a source pre-loaded with `bytes`.
    pub fn from_bytes(bytes: impl AsRef<[u8]>) -> Self {
        let mut source = Self::new();
        source.push(bytes);
        source
    }

    /// Append bytes to the end of the source.
    pub fn push(&mut self, bytes: impl AsRef<[u8]>) {
        self.bytes.extend(bytes.as_ref().iter().copied());
    }

    /// Number of bytes not yet consumed.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether every byte has been consumed.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl ByteSource for MemorySource {
    fn peek(&mut self) -> Option<u8> {
        self.bytes.front().copied()
    }

    fn read_one(&mut self) -> Option<u8> {
        self.bytes.pop_front()
    }

    fn available(&mut self) -> bool {
        !self.bytes.is_empty()
    }

    fn flush_remaining(&mut self) {
        self.bytes.clear();
    }
}
