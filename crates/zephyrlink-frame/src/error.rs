use std::fmt;

use crate::instrument::Instrument;
use crate::kind::FrameKind;

/// Where in the frame a read failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadStage {
    /// Waiting for the opening `<`.
    Seek,
    /// Reading the opening message-type tag.
    TypeTag,
    /// Reading fields.
    Fields,
    /// Reading the closing message-type tag.
    CloseTag,
    /// Reading the `<CRC>` tag.
    CrcTag,
    /// Reading the binary section.
    Binary,
}

impl fmt::Display for ReadStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Seek => "waiting for a frame",
            Self::TypeTag => "reading the message type",
            Self::Fields => "reading fields",
            Self::CloseTag => "reading the closing tag",
            Self::CrcTag => "reading the CRC tag",
            Self::Binary => "reading the binary section",
        })
    }
}

/// Which CRC of a frame a check refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrcSection {
    Text,
    Binary,
}

impl fmt::Display for CrcSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Text => "text",
            Self::Binary => "binary",
        })
    }
}

/// Errors returned by [`FrameReader`](crate::FrameReader).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReadError {
    /// The deadline passed before the frame was complete.
    #[error("timed out while {stage}")]
    Timeout { stage: ReadStage },

    /// The bytes violate the tag, field or CRC tag grammar.
    #[error("malformed frame while {stage}: {reason}")]
    Malformed {
        stage: ReadStage,
        reason: &'static str,
    },

    /// The message-type tag is not a known kind.
    #[error("unknown frame kind {0:?}")]
    UnknownKind(String),

    /// The fields do not match what the kind requires.
    #[error("{kind} frame rejected: {reason}")]
    SchemaMismatch { kind: FrameKind, reason: String },

    /// The binary section ended before its declared length and footer.
    #[error("binary section incomplete ({received} of {expected} bytes)")]
    Incomplete { expected: usize, received: usize },

    /// A CRC did not match and the reader enforces CRCs.
    #[error("{section} CRC mismatch (received {received}, computed {computed})")]
    CrcMismatch {
        section: CrcSection,
        received: u16,
        computed: u16,
    },
}

impl ReadError {
    pub(crate) fn malformed(stage: ReadStage, reason: &'static str) -> Self {
        Self::Malformed { stage, reason }
    }

    pub(crate) fn schema(kind: FrameKind, reason: impl Into<String>) -> Self {
        Self::SchemaMismatch {
            kind,
            reason: reason.into(),
        }
    }

    /// Whether nothing arrived at all before the deadline.
    ///
    /// An idle link is the normal case between frames.
    pub fn is_idle(&self) -> bool {
        matches!(
            self,
            Self::Timeout {
                stage: ReadStage::Seek
            }
        )
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// Errors returned by [`FrameWriter`](crate::FrameWriter) and
/// [`TelemetryBuffer`](crate::TelemetryBuffer).
#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    /// The sink failed.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A telemetry add would exceed the buffer capacity.
    #[error("telemetry buffer full ({requested} bytes requested, {available} available)")]
    BufferFull { requested: usize, available: usize },

    /// A field name or value cannot be put on the wire.
    #[error("invalid field: {0}")]
    InvalidField(String),

    /// The frame kind is reserved to another instrument.
    #[error("{kind} frames are only sent by {allowed}, not {actual}")]
    WrongInstrument {
        kind: FrameKind,
        allowed: Instrument,
        actual: Instrument,
    },
}

pub type ReadResult<T> = std::result::Result<T, ReadError>;
pub type WriteResult<T> = std::result::Result<T, WriteError>;
