//! Telemetry payload buffer and status flags.

use std::fmt;

use bytes::{BufMut, BytesMut};

use crate::error::{WriteError, WriteResult};

/// Default telemetry buffer capacity in bytes.
pub const DEFAULT_TELEMETRY_CAPACITY: usize = 8192;

/// Bounded buffer of telemetry bytes awaiting a `TM` frame.
///
/// Values are appended big endian. An add that does not fit fails with
/// [`WriteError::BufferFull`] and leaves the buffer untouched.
#[derive(Debug, Clone)]
pub struct TelemetryBuffer {
    buf: BytesMut,
    capacity: usize,
}

impl TelemetryBuffer {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_TELEMETRY_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push_u8(&mut self, value: u8) -> WriteResult<()> {
        self.reserve(1)?;
        self.buf.put_u8(value);
        Ok(())
    }

    pub fn push_u16(&mut self, value: u16) -> WriteResult<()> {
        self.reserve(2)?;
        self.buf.put_u16(value);
        Ok(())
    }

    pub fn push_u32(&mut self, value: u32) -> WriteResult<()> {
        self.reserve(4)?;
        self.buf.put_u32(value);
        Ok(())
    }

    pub fn push_bytes(&mut self, bytes: &[u8]) -> WriteResult<()> {
        self.reserve(bytes.len())?;
        self.buf.put_slice(bytes);
        Ok(())
    }

    pub fn push_str(&mut self, text: &str) -> WriteResult<()> {
        self.push_bytes(text.as_bytes())
    }

    /// Append a temperature scaled to 16 bits by `encode`.
    pub fn push_temperature(
        &mut self,
        celsius: f32,
        encode: impl FnOnce(f32) -> u16,
    ) -> WriteResult<()> {
        self.push_u16(encode(celsius))
    }

    /// Append a GPS coordinate scaled by `encode`. Only the low 24 bits are
    /// sent.
    pub fn push_gps(&mut self, value: f32, encode: impl FnOnce(f32) -> u32) -> WriteResult<()> {
        let scaled = encode(value).to_be_bytes();
        self.push_bytes(&scaled[1..])
    }

    /// Append a voltage reading scaled to 8 bits by `encode`.
    pub fn push_voltage(&mut self, raw: u16, encode: impl FnOnce(u16) -> u8) -> WriteResult<()> {
        self.push_u8(encode(raw))
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Bytes that can still be added.
    pub fn remaining(&self) -> usize {
        self.capacity - self.buf.len()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn clear(&mut self) {
        self.buf.clear();
    }

    fn reserve(&self, requested: usize) -> WriteResult<()> {
        let available = self.remaining();
        if requested > available {
            return Err(WriteError::BufferFull {
                requested,
                available,
            });
        }
        Ok(())
    }
}

impl Default for TelemetryBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// Health flag reported in telemetry frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StateFlag {
    #[default]
    Unknown,
    Fine,
    Warn,
    Critical,
    /// Nothing to report in this slot.
    NoMessage,
}

impl StateFlag {
    /// Wire literal, or `None` when the slot is left out.
    pub const fn literal(self) -> Option<&'static str> {
        match self {
            Self::Unknown => Some("UNKN"),
            Self::Fine => Some("FINE"),
            Self::Warn => Some("WARN"),
            Self::Critical => Some("CRIT"),
            Self::NoMessage => None,
        }
    }

    pub fn from_literal(literal: &str) -> Option<Self> {
        match literal {
            "UNKN" => Some(Self::Unknown),
            "FINE" => Some(Self::Fine),
            "WARN" => Some(Self::Warn),
            "CRIT" => Some(Self::Critical),
            _ => None,
        }
    }
}

impl fmt::Display for StateFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.literal().unwrap_or("-"))
    }
}

/// One of the three status slots of a telemetry frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateSlot {
    /// Always present on the wire.
    First,
    Second,
    Third,
}

impl StateSlot {
    pub const ALL: [StateSlot; 3] = [Self::First, Self::Second, Self::Third];

    pub(crate) const fn index(self) -> usize {
        match self {
            Self::First => 0,
            Self::Second => 1,
            Self::Third => 2,
        }
    }

    /// Field name of the slot's details message.
    pub const fn message_field(self) -> &'static str {
        match self {
            Self::First => "StateMess1",
            Self::Second => "StateMess2",
            Self::Third => "StateMess3",
        }
    }
}

/// A named flag plus optional details, held by the writer per slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateReport {
    /// Field name the flag is written under.
    pub name: String,
    pub flag: StateFlag,
    pub details: String,
}

impl StateReport {
    pub(crate) fn empty(slot: StateSlot) -> Self {
        let (name, flag) = match slot {
            StateSlot::First => ("StateFlag1", StateFlag::Unknown),
            StateSlot::Second => ("StateFlag2", StateFlag::NoMessage),
            StateSlot::Third => ("StateFlag3", StateFlag::NoMessage),
        };
        Self {
            name: name.to_string(),
            flag,
            details: String::new(),
        }
    }
}
