use crate::schema::ParamType;

/// Errors that can occur while decoding a telecommand statement.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// The statement violates the `id,param,...;` grammar.
    #[error("malformed telecommand at offset {offset}: {reason}")]
    Malformed { offset: usize, reason: &'static str },

    /// A numeric field parsed but does not fit its declared type.
    #[error("value {text:?} at offset {offset} out of range for {ty}")]
    OutOfRange {
        offset: usize,
        ty: ParamType,
        text: String,
    },
}

impl DecodeError {
    pub(crate) fn malformed(offset: usize, reason: &'static str) -> Self {
        Self::Malformed { offset, reason }
    }

    /// Byte offset in the statement buffer where decoding failed.
    pub fn offset(&self) -> usize {
        match self {
            Self::Malformed { offset, .. } | Self::OutOfRange { offset, .. } => *offset,
        }
    }
}

pub type Result<T> = std::result::Result<T, DecodeError>;
