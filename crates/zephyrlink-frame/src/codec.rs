use bytes::{BufMut, BytesMut};

use crate::crc::Crc16;
use crate::error::{WriteError, WriteResult};
use crate::kind::FrameKind;

/// Name of the sequence-id field that opens every frame.
pub const MSG_FIELD: &str = "Msg";

/// Name of the instrument-id field.
pub const INST_FIELD: &str = "Inst";

/// Name of the field declaring the binary section length.
pub const LENGTH_FIELD: &str = "Length";

/// Marker opening a binary section.
pub const BINARY_START: &[u8; 5] = b"START";

/// Marker closing a binary section.
pub const BINARY_END: &[u8; 3] = b"END";

/// Longest message-type tag.
pub const MAX_KIND_TAG_LEN: usize = 5;

/// One `<Name>Value</Name>` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub value: String,
}

impl Field {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Size limits applied to frame fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameLimits {
    pub max_name_len: usize,
    pub max_value_len: usize,
    pub max_fields: usize,
}

impl FrameLimits {
    /// Limits of frames sent by the gondola computer.
    pub const INBOUND: Self = Self {
        max_name_len: 7,
        max_value_len: 15,
        max_fields: 10,
    };

    /// Limits of frames sent by an instrument.
    ///
    /// `ZProtocolVersion` needs 16 characters and status messages up to 100.
    pub const OUTBOUND: Self = Self {
        max_name_len: 16,
        max_value_len: 100,
        max_fields: 16,
    };
}

impl Default for FrameLimits {
    fn default() -> Self {
        Self::INBOUND
    }
}

/// One complete frame: kind, sequence id and ordered fields.
///
/// The first field is always `Msg` holding the sequence id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub kind: FrameKind,
    pub sequence_id: u16,
    pub fields: Vec<Field>,
}

impl Frame {
    /// A frame holding only its `Msg` field.
    pub fn new(kind: FrameKind, sequence_id: u16) -> Self {
        Self {
            kind,
            sequence_id,
            fields: vec![Field::new(MSG_FIELD, sequence_id.to_string())],
        }
    }

    /// Append a field.
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.push_field(name, value);
        self
    }

    pub fn push_field(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.push(Field::new(name, value));
    }

    /// Value of the first field called `name`.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|field| field.name == name)
            .map(|field| field.value.as_str())
    }

    /// Declared binary section length, for kinds that carry one.
    pub fn binary_length(&self) -> Option<u16> {
        if !self.kind.carries_binary() {
            return None;
        }
        self.field(LENGTH_FIELD)?.parse().ok()
    }

    /// Check the frame can be put on the wire within `limits`.
    pub fn validate(&self, limits: &FrameLimits) -> WriteResult<()> {
        if self.kind.tag().is_none() {
            return Err(invalid("unknown frame kind"));
        }
        match self.fields.first() {
            Some(field) if field.name == MSG_FIELD => {
                if field.value != self.sequence_id.to_string() {
                    return Err(invalid(format!(
                        "Msg value {:?} does not match sequence id {}",
                        field.value, self.sequence_id
                    )));
                }
            }
            _ => return Err(invalid("first field must be Msg")),
        }
        if self.fields.len() > limits.max_fields {
            return Err(invalid(format!(
                "{} fields exceed the limit of {}",
                self.fields.len(),
                limits.max_fields
            )));
        }

        for field in &self.fields {
            if field.name.is_empty() || field.name.len() > limits.max_name_len {
                return Err(invalid(format!(
                    "name {:?} must be 1 to {} characters",
                    field.name, limits.max_name_len
                )));
            }
            if !field.name.bytes().all(is_name_byte) {
                return Err(invalid(format!("name {:?} has reserved characters", field.name)));
            }
            if field.value.len() > limits.max_value_len {
                return Err(invalid(format!(
                    "value of {} exceeds {} characters",
                    field.name, limits.max_value_len
                )));
            }
            if !field.value.bytes().all(is_value_byte) {
                return Err(invalid(format!(
                    "value of {} has reserved characters",
                    field.name
                )));
            }
        }
        Ok(())
    }
}

pub(crate) fn is_name_byte(byte: u8) -> bool {
    byte.is_ascii_graphic() && !matches!(byte, b'<' | b'>' | b'/')
}

pub(crate) fn is_value_byte(byte: u8) -> bool {
    (byte.is_ascii_graphic() || byte == b' ') && byte != b'<'
}

fn invalid(reason: impl Into<String>) -> WriteError {
    WriteError::InvalidField(reason.into())
}

/// Encode the text part of a frame, including its CRC tag.
///
/// Wire format:
/// ```text
/// <KIND>\n
/// \t<Name>Value</Name>\n      (once per field)
/// </KIND>\n
/// <CRC>ddddd</CRC>\n
/// ```
///
/// Every byte up to and including `</KIND>\n` is folded into `crc`, which is
/// reset once the CRC tag has been emitted. The frame is assumed valid.
pub fn encode_frame(frame: &Frame, crc: &mut Crc16, dst: &mut BytesMut) {
    let tag = frame.kind.tag().unwrap_or_default();
    let mut text = TextEncoder { dst, crc };

    text.put(b"<");
    text.put(tag.as_bytes());
    text.put(b">\n");
    for field in &frame.fields {
        text.put(b"\t<");
        text.put(field.name.as_bytes());
        text.put(b">");
        text.put(field.value.as_bytes());
        text.put(b"</");
        text.put(field.name.as_bytes());
        text.put(b">\n");
    }
    text.put(b"</");
    text.put(tag.as_bytes());
    text.put(b">\n");

    let value = crc.value();
    dst.put_slice(format!("<CRC>{value}</CRC>\n").as_bytes());
    crc.reset();
}

/// Encode a binary section.
///
/// Wire format:
/// ```text
/// ┌─────────┬───────────────┬──────────┬───────────┬───────┐
/// │ "START" │ payload bytes │ CRC low  │ CRC high  │ "END" │
/// └─────────┴───────────────┴──────────┴───────────┴───────┘
/// ```
///
/// Only the payload is folded into the CRC. An empty payload still produces
/// the full footer.
pub fn encode_binary_section(payload: &[u8], crc: &mut Crc16, dst: &mut BytesMut) {
    crc.reset();
    dst.reserve(BINARY_START.len() + payload.len() + 2 + BINARY_END.len());
    dst.put_slice(BINARY_START);
    dst.put_slice(payload);
    crc.update_slice(payload);
    dst.put_u16_le(crc.value());
    dst.put_slice(BINARY_END);
    crc.reset();
}

struct TextEncoder<'a> {
    dst: &'a mut BytesMut,
    crc: &'a mut Crc16,
}

impl TextEncoder<'_> {
    fn put(&mut self, bytes: &[u8]) {
        self.dst.put_slice(bytes);
        self.crc.update_slice(bytes);
    }
}
