use std::time::Instant;

use bytes::{BufMut, Bytes, BytesMut};
use tracing::{debug, trace, warn};
use zephyrlink_telecommand::{count_statements, statements, DecodeError, DecodedTelecommand};
use zephyrlink_transport::ByteSource;

use crate::codec::{
    is_name_byte, is_value_byte, Field, Frame, BINARY_END, BINARY_START, MAX_KIND_TAG_LEN,
};
use crate::config::{CrcPolicy, ReaderConfig};
use crate::crc::Crc16;
use crate::error::{CrcSection, ReadError, ReadResult, ReadStage};
use crate::instrument::Instrument;
use crate::kind::FrameKind;
use crate::message::{self, Message};

const CRC_TAG: &str = "CRC";
const MAX_CRC_DIGITS: usize = 5;

/// A received CRC next to the one computed over the same bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrcCheck {
    pub received: u16,
    pub computed: u16,
}

impl CrcCheck {
    pub fn is_match(&self) -> bool {
        self.received == self.computed
    }
}

/// Payload of a binary section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinarySection {
    pub payload: Bytes,
    /// Number of `;` terminated statements, for telecommand sections.
    pub statement_count: usize,
    pub crc: CrcCheck,
}

/// A complete frame as returned by [`FrameReader`].
#[derive(Debug, Clone, PartialEq)]
pub struct Received {
    pub frame: Frame,
    pub message: Message,
    /// CRC of the text part.
    pub crc: CrcCheck,
    pub binary: Option<BinarySection>,
    /// One entry per telecommand statement, in order.
    pub telecommands: Vec<Result<DecodedTelecommand, DecodeError>>,
}

impl Received {
    /// Whether every CRC in the frame matched.
    pub fn crc_ok(&self) -> bool {
        self.crc.is_match()
            && self
                .binary
                .as_ref()
                .is_none_or(|binary| binary.crc.is_match())
    }
}

/// Reads frames from a polled [`ByteSource`].
///
/// Each read is bounded by one absolute deadline. A read that fails leaves
/// nothing behind: the CRC is reset and, unless the link was simply idle,
/// whatever the source still buffers is flushed so the next read starts on a
/// clean boundary.
pub struct FrameReader<S> {
    source: S,
    crc: Crc16,
    config: ReaderConfig,
}

impl<S: ByteSource> FrameReader<S> {
    /// Create a reader for frames addressed to `instrument`.
    pub fn new(source: S, instrument: Instrument) -> Self {
        Self::with_config(source, ReaderConfig::new(instrument))
    }

    pub fn with_config(source: S, config: ReaderConfig) -> Self {
        Self {
            source,
            crc: Crc16::new(),
            config,
        }
    }

    /// Read the next frame within the configured timeout.
    pub fn read_frame(&mut self) -> ReadResult<Received> {
        let deadline = Instant::now() + self.config.timeout;
        self.read_frame_until(deadline)
    }

    /// Read the next frame. The text part must complete by `deadline`; a
    /// binary section gets the configured grace on top.
    pub fn read_frame_until(&mut self, deadline: Instant) -> ReadResult<Received> {
        self.crc.reset();
        let result = self.read_inner(deadline);
        if let Err(err) = &result {
            self.crc.reset();
            if err.is_idle() {
                trace!("no frame before deadline");
            } else {
                debug!(error = %err, "frame read failed, flushing source");
                self.source.flush_remaining();
            }
        }
        result
    }

    /// Borrow the underlying source.
    pub fn get_ref(&self) -> &S {
        &self.source
    }

    /// Mutably borrow the underlying source.
    pub fn get_mut(&mut self) -> &mut S {
        &mut self.source
    }

    /// Consume the reader and return the source.
    pub fn into_inner(self) -> S {
        self.source
    }

    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    pub fn set_crc_policy(&mut self, policy: CrcPolicy) {
        self.config.crc_policy = policy;
    }

    fn read_inner(&mut self, deadline: Instant) -> ReadResult<Received> {
        self.seek_open(deadline)?;
        self.expect(b'<', deadline, ReadStage::TypeTag)?;

        let tag = self.read_tag(MAX_KIND_TAG_LEN, deadline, ReadStage::TypeTag)?;
        self.expect(b'\n', deadline, ReadStage::TypeTag)?;
        let kind = FrameKind::from_tag(&tag);
        if kind == FrameKind::Unknown {
            return Err(ReadError::UnknownKind(tag));
        }

        let fields = self.read_fields(deadline)?;

        self.expect(b'<', deadline, ReadStage::CloseTag)?;
        self.expect(b'/', deadline, ReadStage::CloseTag)?;
        let close = self.read_tag(MAX_KIND_TAG_LEN, deadline, ReadStage::CloseTag)?;
        if close != tag {
            return Err(ReadError::malformed(
                ReadStage::CloseTag,
                "closing tag does not match the message type",
            ));
        }
        self.expect(b'\n', deadline, ReadStage::CloseTag)?;

        let crc = CrcCheck {
            computed: self.crc.value(),
            received: self.read_crc_tag(deadline)?,
        };
        self.check_crc(CrcSection::Text, crc)?;

        let (sequence_id, message) = message::parse(kind, &fields, &self.config)?;
        let frame = Frame {
            kind,
            sequence_id,
            fields,
        };

        let mut binary = None;
        let mut telecommands = Vec::new();
        if let Some(length) = message.binary_length() {
            let section =
                self.read_binary(usize::from(length), deadline + self.config.binary_grace, kind)?;
            if kind == FrameKind::Telecommand {
                telecommands = statements(&section.payload, self.config.schema).collect();
            }
            binary = Some(section);
        }

        debug!(
            kind = %kind,
            seq = sequence_id,
            fields = frame.fields.len(),
            binary = binary.as_ref().map(|b| b.payload.len()),
            "frame received"
        );
        Ok(Received {
            frame,
            message,
            crc,
            binary,
            telecommands,
        })
    }

    /// Discard bytes until `<` is next.
    fn seek_open(&mut self, deadline: Instant) -> ReadResult<()> {
        let mut discarded = 0usize;
        loop {
            if Instant::now() >= deadline {
                if discarded > 0 {
                    trace!(discarded, "discarded bytes outside any frame");
                }
                return Err(ReadError::Timeout {
                    stage: ReadStage::Seek,
                });
            }
            match self.source.peek() {
                Some(b'<') => break,
                Some(_) => {
                    self.source.read_one();
                    discarded += 1;
                }
                None => self.pause(),
            }
        }
        if discarded > 0 {
            trace!(discarded, "discarded bytes outside any frame");
        }
        Ok(())
    }

    fn read_fields(&mut self, deadline: Instant) -> ReadResult<Vec<Field>> {
        let limits = self.config.limits;
        let mut fields = Vec::new();
        loop {
            self.wait_available(deadline, ReadStage::Fields)?;
            if self.source.peek() != Some(b'\t') {
                return Ok(fields);
            }
            if fields.len() == limits.max_fields {
                return Err(ReadError::malformed(ReadStage::Fields, "too many fields"));
            }
            self.next_byte(deadline, ReadStage::Fields)?;

            self.expect(b'<', deadline, ReadStage::Fields)?;
            let name = self.read_tag(limits.max_name_len, deadline, ReadStage::Fields)?;
            let value = self.read_value(limits.max_value_len, deadline)?;
            self.expect(b'/', deadline, ReadStage::Fields)?;
            let close = self.read_tag(limits.max_name_len, deadline, ReadStage::Fields)?;
            if close != name {
                return Err(ReadError::malformed(
                    ReadStage::Fields,
                    "closing tag does not match the field name",
                ));
            }
            self.expect(b'\n', deadline, ReadStage::Fields)?;
            fields.push(Field { name, value });
        }
    }

    /// Read a tag name up to and including its `>`.
    fn read_tag(
        &mut self,
        max_len: usize,
        deadline: Instant,
        stage: ReadStage,
    ) -> ReadResult<String> {
        let mut name = String::with_capacity(max_len);
        loop {
            let byte = self.next_byte(deadline, stage)?;
            if byte == b'>' {
                break;
            }
            if name.len() == max_len {
                return Err(ReadError::malformed(stage, "tag name too long"));
            }
            if !is_name_byte(byte) {
                return Err(ReadError::malformed(stage, "invalid character in tag name"));
            }
            name.push(char::from(byte));
        }
        if name.is_empty() {
            return Err(ReadError::malformed(stage, "empty tag name"));
        }
        Ok(name)
    }

    /// Read a field value up to and including the `<` that starts its close
    /// tag.
    fn read_value(&mut self, max_len: usize, deadline: Instant) -> ReadResult<String> {
        let mut value = String::new();
        loop {
            let byte = self.next_byte(deadline, ReadStage::Fields)?;
            if byte == b'<' {
                return Ok(value);
            }
            if value.len() == max_len {
                return Err(ReadError::malformed(ReadStage::Fields, "field value too long"));
            }
            if !is_value_byte(byte) {
                return Err(ReadError::malformed(
                    ReadStage::Fields,
                    "invalid character in field value",
                ));
            }
            value.push(char::from(byte));
        }
    }

    fn read_crc_tag(&mut self, deadline: Instant) -> ReadResult<u16> {
        let stage = ReadStage::CrcTag;
        self.expect(b'<', deadline, stage)?;
        if self.read_tag(CRC_TAG.len(), deadline, stage)? != CRC_TAG {
            return Err(ReadError::malformed(stage, "expected a CRC tag"));
        }

        let mut digits = String::with_capacity(MAX_CRC_DIGITS);
        loop {
            let byte = self.next_byte(deadline, stage)?;
            if byte == b'<' {
                break;
            }
            if digits.len() == MAX_CRC_DIGITS || !byte.is_ascii_digit() {
                return Err(ReadError::malformed(stage, "CRC value is not a 16-bit number"));
            }
            digits.push(char::from(byte));
        }
        self.expect(b'/', deadline, stage)?;
        if self.read_tag(CRC_TAG.len(), deadline, stage)? != CRC_TAG {
            return Err(ReadError::malformed(stage, "CRC close tag does not match"));
        }
        if self.source.peek() == Some(b'\n') {
            self.source.read_one();
        }

        digits
            .parse::<u16>()
            .map_err(|_| ReadError::malformed(stage, "CRC value is not a 16-bit number"))
    }

    fn read_binary(
        &mut self,
        length: usize,
        deadline: Instant,
        kind: FrameKind,
    ) -> ReadResult<BinarySection> {
        let mut payload = BytesMut::with_capacity(length);
        let short = |received: usize| ReadError::Incomplete {
            expected: length,
            received,
        };

        let mut first = self.next_byte(deadline, ReadStage::Binary).map_err(|_| short(0))?;
        // newline after the CRC tag that had not arrived when the tag ended
        if first == b'\n' {
            first = self.next_byte(deadline, ReadStage::Binary).map_err(|_| short(0))?;
        }
        if first != BINARY_START[0] {
            return Err(ReadError::malformed(ReadStage::Binary, "missing START marker"));
        }
        for &marker in &BINARY_START[1..] {
            let byte = self.next_byte(deadline, ReadStage::Binary).map_err(|_| short(0))?;
            if byte != marker {
                return Err(ReadError::malformed(ReadStage::Binary, "missing START marker"));
            }
        }

        self.crc.reset();
        while payload.len() < length {
            let byte = self
                .next_byte(deadline, ReadStage::Binary)
                .map_err(|_| short(payload.len()))?;
            payload.put_u8(byte);
        }
        let computed = self.crc.value();

        let low = self
            .next_byte(deadline, ReadStage::Binary)
            .map_err(|_| short(length))?;
        let high = self
            .next_byte(deadline, ReadStage::Binary)
            .map_err(|_| short(length))?;
        let crc = CrcCheck {
            received: u16::from_le_bytes([low, high]),
            computed,
        };

        for &marker in BINARY_END {
            let byte = self.next_byte(deadline, ReadStage::Binary).map_err(|_| short(length))?;
            if byte != marker {
                return Err(ReadError::malformed(ReadStage::Binary, "missing END marker"));
            }
        }
        self.check_crc(CrcSection::Binary, crc)?;

        let statement_count = if kind == FrameKind::Telecommand {
            count_statements(&payload)
        } else {
            0
        };
        Ok(BinarySection {
            payload: payload.freeze(),
            statement_count,
            crc,
        })
    }

    fn check_crc(&self, section: CrcSection, check: CrcCheck) -> ReadResult<()> {
        if check.is_match() {
            return Ok(());
        }
        match self.config.crc_policy {
            CrcPolicy::Advisory => {
                warn!(
                    %section,
                    received = check.received,
                    computed = check.computed,
                    "CRC mismatch accepted"
                );
                Ok(())
            }
            CrcPolicy::Enforce => Err(ReadError::CrcMismatch {
                section,
                received: check.received,
                computed: check.computed,
            }),
        }
    }

    fn expect(&mut self, expected: u8, deadline: Instant, stage: ReadStage) -> ReadResult<()> {
        if self.next_byte(deadline, stage)? != expected {
            return Err(ReadError::malformed(
                stage,
                match expected {
                    b'<' => "expected '<'",
                    b'/' => "expected '/'",
                    b'\n' => "expected end of line",
                    _ => "unexpected byte",
                },
            ));
        }
        Ok(())
    }

    /// Consume one byte and fold it into the CRC.
    fn next_byte(&mut self, deadline: Instant, stage: ReadStage) -> ReadResult<u8> {
        loop {
            if Instant::now() >= deadline {
                return Err(ReadError::Timeout { stage });
            }
            if let Some(byte) = self.source.read_one() {
                self.crc.update(byte);
                return Ok(byte);
            }
            self.pause();
        }
    }

    fn wait_available(&mut self, deadline: Instant, stage: ReadStage) -> ReadResult<()> {
        loop {
            if self.source.available() {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(ReadError::Timeout { stage });
            }
            self.pause();
        }
    }

    fn pause(&self) {
        if self.config.poll_interval.is_zero() {
            std::hint::spin_loop();
        } else {
            std::thread::sleep(self.config.poll_interval);
        }
    }
}

impl<S> std::fmt::Debug for FrameReader<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameReader")
            .field("instrument", &self.config.instrument)
            .field("crc_policy", &self.config.crc_policy)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::time::Duration;

    use zephyrlink_telecommand::ParamValue;
    use zephyrlink_transport::MemorySource;

    use super::*;
    use crate::codec::{encode_binary_section, encode_frame};
    use crate::crc::checksum;
    use crate::message::InstrumentMode;

    fn wire(frame: &Frame, binary: Option<&[u8]>) -> Vec<u8> {
        let mut crc = Crc16::new();
        let mut out = BytesMut::new();
        encode_frame(frame, &mut crc, &mut out);
        if let Some(payload) = binary {
            encode_binary_section(payload, &mut crc, &mut out);
        }
        out.to_vec()
    }

    fn reader(bytes: &[u8]) -> FrameReader<MemorySource> {
        FrameReader::new(MemorySource::from_bytes(bytes), Instrument::Lpc)
    }

    fn telecommand(seq: u16, payload: &[u8]) -> Vec<u8> {
        let frame = Frame::new(FrameKind::Telecommand, seq)
            .with_field("Inst", "LPC")
            .with_field("Length", payload.len().to_string());
        wire(&frame, Some(payload))
    }

    #[test]
    fn read_mode_request() {
        let frame = Frame::new(FrameKind::InstrumentMode, 7)
            .with_field("Inst", "LPC")
            .with_field("Mode", "SB");
        let mut reader = reader(&wire(&frame, None));

        let received = reader.read_frame().unwrap();
        assert_eq!(received.frame, frame);
        assert_eq!(
            received.message,
            Message::InstrumentMode(InstrumentMode::Standby)
        );
        assert!(received.crc_ok());
        assert!(received.binary.is_none());
    }

    #[test]
    fn noise_before_frame_is_skipped() {
        let frame = Frame::new(FrameKind::ShutdownWarning, 2).with_field("Inst", "LPC");
        let mut bytes = b"\r\n\x00garbage".to_vec();
        bytes.extend(wire(&frame, None));

        let received = reader(&bytes).read_frame().unwrap();
        assert_eq!(received.message, Message::ShutdownWarning);
        assert!(received.crc_ok());
    }

    #[test]
    fn crc_covers_text_through_closing_tag() {
        let text = "<SW>\n\t<Msg>2</Msg>\n\t<Inst>LPC</Inst>\n</SW>\n";
        let bytes = format!("{text}<CRC>{}</CRC>\n", checksum(text.as_bytes()));
        let received = reader(bytes.as_bytes()).read_frame().unwrap();
        assert_eq!(received.crc.computed, checksum(text.as_bytes()));
        assert!(received.crc.is_match());
    }

    #[test]
    fn telecommand_frame_decodes_statements() {
        let mut reader = reader(&telecommand(5, b"7,3.5;200;"));
        let received = reader.read_frame().unwrap();

        assert_eq!(received.message, Message::Telecommand { length: 10 });
        let binary = received.binary.as_ref().unwrap();
        assert_eq!(binary.payload.as_ref(), b"7,3.5;200;");
        assert_eq!(binary.statement_count, 2);
        assert!(binary.crc.is_match());

        assert_eq!(received.telecommands.len(), 2);
        let first = received.telecommands[0].as_ref().unwrap();
        assert_eq!(first.id, 7);
        assert_eq!(first.params, vec![ParamValue::F32(3.5)]);
        assert_eq!(
            received.telecommands[1],
            Ok(DecodedTelecommand::bare(200))
        );
    }

    /// Hands out each byte only after one empty poll, like a slow serial
    /// line.
    struct TrickleSource {
        bytes: VecDeque<u8>,
        ready: bool,
    }

    impl TrickleSource {
        fn new(bytes: &[u8]) -> Self {
            Self {
                bytes: bytes.iter().copied().collect(),
                ready: false,
            }
        }
    }

    impl ByteSource for TrickleSource {
        fn peek(&mut self) -> Option<u8> {
            if !self.ready {
                self.ready = true;
                return None;
            }
            self.bytes.front().copied()
        }

        fn read_one(&mut self) -> Option<u8> {
            if !self.ready {
                self.ready = true;
                return None;
            }
            self.ready = false;
            self.bytes.pop_front()
        }

        fn flush_remaining(&mut self) {
            self.bytes.clear();
        }
    }

    #[test]
    fn slow_link_telecommand() {
        let mut reader = FrameReader::new(
            TrickleSource::new(&telecommand(9, b"7,3.5;")),
            Instrument::Lpc,
        );
        let received = reader
            .read_frame_until(Instant::now() + Duration::from_secs(2))
            .unwrap();

        assert_eq!(received.frame.sequence_id, 9);
        assert!(received.crc_ok());
        let binary = received.binary.as_ref().unwrap();
        assert_eq!(binary.payload.as_ref(), b"7,3.5;");
        assert_eq!(
            received.telecommands[0].as_ref().unwrap().params,
            vec![ParamValue::F32(3.5)]
        );
    }

    #[test]
    fn slow_link_frames_back_to_back() {
        let first = Frame::new(FrameKind::ShutdownWarning, 1).with_field("Inst", "LPC");
        let mut bytes = wire(&first, None);
        bytes.extend(telecommand(2, b"200;"));

        let mut reader = FrameReader::new(TrickleSource::new(&bytes), Instrument::Lpc);
        let deadline = || Instant::now() + Duration::from_secs(2);
        assert_eq!(
            reader.read_frame_until(deadline()).unwrap().message,
            Message::ShutdownWarning
        );
        let received = reader.read_frame_until(deadline()).unwrap();
        assert_eq!(received.message, Message::Telecommand { length: 4 });
        assert_eq!(received.telecommands[0], Ok(DecodedTelecommand::bare(200)));
    }

    #[test]
    fn bad_statement_does_not_spoil_the_rest() {
        let received = reader(&telecommand(1, b"63,300;7,1.0;"))
            .read_frame()
            .unwrap();
        assert!(matches!(
            received.telecommands[0],
            Err(DecodeError::OutOfRange { .. })
        ));
        assert_eq!(received.telecommands[1].as_ref().unwrap().id, 7);
    }

    #[test]
    fn timeout_then_clean_read() {
        let mut reader = FrameReader::with_config(
            MemorySource::new(),
            ReaderConfig {
                timeout: Duration::from_millis(20),
                ..ReaderConfig::new(Instrument::Lpc)
            },
        );
        let err = reader.read_frame().unwrap_err();
        assert_eq!(
            err,
            ReadError::Timeout {
                stage: ReadStage::Seek
            }
        );
        assert!(err.is_idle());

        let frame = Frame::new(FrameKind::SafetyAck, 3)
            .with_field("Inst", "LPC")
            .with_field("Ack", "ACK");
        reader.get_mut().push(wire(&frame, None));
        let received = reader.read_frame().unwrap();
        assert_eq!(received.message, Message::SafetyAck(true));
        assert!(received.crc_ok());
    }

    #[test]
    fn truncated_frame_times_out_and_flushes() {
        let config = ReaderConfig {
            timeout: Duration::from_millis(20),
            ..ReaderConfig::new(Instrument::Lpc)
        };
        let mut reader =
            FrameReader::with_config(MemorySource::from_bytes(b"<IM>\n\t<Msg>1</Ms"), config);
        let err = reader.read_frame().unwrap_err();
        assert_eq!(
            err,
            ReadError::Timeout {
                stage: ReadStage::Fields
            }
        );
        assert!(!err.is_idle());
        assert!(reader.get_ref().is_empty());
    }

    #[test]
    fn malformed_frame_flushes_remaining_bytes() {
        let mut reader = reader(b"<SW>\n\t<Msg>1</Inst>\ntrailing bytes");
        let err = reader.read_frame().unwrap_err();
        assert!(matches!(
            err,
            ReadError::Malformed {
                stage: ReadStage::Fields,
                ..
            }
        ));
        assert!(reader.get_ref().is_empty());
    }

    #[test]
    fn unknown_kind() {
        let err = reader(b"<XYZ>\n</XYZ>\n").read_frame().unwrap_err();
        assert_eq!(err, ReadError::UnknownKind("XYZ".to_string()));
    }

    #[test]
    fn overlong_kind_tag_is_malformed() {
        let err = reader(b"<TOOLONG>\n").read_frame().unwrap_err();
        assert!(matches!(
            err,
            ReadError::Malformed {
                stage: ReadStage::TypeTag,
                ..
            }
        ));
    }

    #[test]
    fn mismatched_closing_type_tag() {
        let err = reader(b"<SW>\n\t<Msg>1</Msg>\n</IM>\n")
            .read_frame()
            .unwrap_err();
        assert!(matches!(
            err,
            ReadError::Malformed {
                stage: ReadStage::CloseTag,
                ..
            }
        ));
    }

    #[test]
    fn field_limits() {
        let ok = Frame::new(FrameKind::ShutdownWarning, 1)
            .with_field("Inst", "LPC")
            .with_field("Abcdefg", "123456789012345");
        let received = reader(&wire(&ok, None)).read_frame().unwrap();
        assert_eq!(received.frame, ok);

        let long_value = b"<SW>\n\t<Msg>1234567890123456</Msg>\n";
        assert!(matches!(
            reader(long_value).read_frame().unwrap_err(),
            ReadError::Malformed { .. }
        ));

        let long_name = b"<SW>\n\t<Abcdefgh>1</Abcdefgh>\n";
        assert!(matches!(
            reader(long_name).read_frame().unwrap_err(),
            ReadError::Malformed { .. }
        ));
    }

    #[test]
    fn too_many_fields() {
        let mut frame = Frame::new(FrameKind::ShutdownWarning, 1).with_field("Inst", "LPC");
        for i in 0..9 {
            frame.push_field(format!("X{i}"), "0");
        }
        let err = reader(&wire(&frame, None)).read_frame().unwrap_err();
        assert_eq!(
            err,
            ReadError::malformed(ReadStage::Fields, "too many fields")
        );
    }

    #[test]
    fn crc_tag_must_be_numeric() {
        let err = reader(b"<SW>\n\t<Msg>1</Msg>\n\t<Inst>LPC</Inst>\n</SW>\n<CRC>70000</CRC>\n")
            .read_frame()
            .unwrap_err();
        assert!(matches!(
            err,
            ReadError::Malformed {
                stage: ReadStage::CrcTag,
                ..
            }
        ));

        let err = reader(b"<SW>\n\t<Msg>1</Msg>\n\t<Inst>LPC</Inst>\n</SW>\n<CRC>12a</CRC>\n")
            .read_frame()
            .unwrap_err();
        assert!(matches!(err, ReadError::Malformed { .. }));
    }

    #[test]
    fn crc_mismatch_is_advisory_by_default() {
        let bytes = b"<SW>\n\t<Msg>1</Msg>\n\t<Inst>LPC</Inst>\n</SW>\n<CRC>1</CRC>\n";
        let received = reader(bytes).read_frame().unwrap();
        assert!(!received.crc.is_match());
        assert!(!received.crc_ok());
        assert_eq!(received.crc.received, 1);
    }

    #[test]
    fn crc_mismatch_fails_when_enforced() {
        let bytes = b"<SW>\n\t<Msg>1</Msg>\n\t<Inst>LPC</Inst>\n</SW>\n<CRC>1</CRC>\n";
        let mut reader = reader(bytes);
        reader.set_crc_policy(CrcPolicy::Enforce);
        let err = reader.read_frame().unwrap_err();
        assert!(matches!(
            err,
            ReadError::CrcMismatch {
                section: CrcSection::Text,
                received: 1,
                ..
            }
        ));
    }

    #[test]
    fn corrupted_binary_crc_is_reported() {
        let mut bytes = telecommand(2, b"12;");
        let len = bytes.len();
        bytes[len - 5] ^= 0xFF;

        let received = reader(&bytes).read_frame().unwrap();
        assert!(received.crc.is_match());
        assert!(!received.binary.as_ref().unwrap().crc.is_match());
        assert!(!received.crc_ok());

        let mut strict = reader(&bytes);
        strict.set_crc_policy(CrcPolicy::Enforce);
        assert!(matches!(
            strict.read_frame().unwrap_err(),
            ReadError::CrcMismatch {
                section: CrcSection::Binary,
                ..
            }
        ));
    }

    #[test]
    fn short_binary_section_is_incomplete() {
        let mut bytes = telecommand(3, b"7,3.5;");
        bytes.truncate(bytes.len() - 8);
        let config = ReaderConfig {
            timeout: Duration::from_millis(10),
            binary_grace: Duration::from_millis(10),
            ..ReaderConfig::new(Instrument::Lpc)
        };
        let mut reader = FrameReader::with_config(MemorySource::from_bytes(&bytes), config);
        assert_eq!(
            reader.read_frame().unwrap_err(),
            ReadError::Incomplete {
                expected: 6,
                received: 3
            }
        );
    }

    #[test]
    fn missing_end_marker() {
        let mut bytes = telecommand(3, b"1;");
        let len = bytes.len();
        bytes[len - 1] = b'X';
        assert!(matches!(
            reader(&bytes).read_frame().unwrap_err(),
            ReadError::Malformed {
                stage: ReadStage::Binary,
                ..
            }
        ));
    }

    #[test]
    fn consecutive_frames() {
        let mut bytes = telecommand(1, b"10;");
        let ack = Frame::new(FrameKind::TelemetryAck, 2)
            .with_field("Inst", "LPC")
            .with_field("Ack", "NAK");
        bytes.extend(wire(&ack, None));

        let mut reader = reader(&bytes);
        assert_eq!(reader.read_frame().unwrap().frame.sequence_id, 1);
        let second = reader.read_frame().unwrap();
        assert_eq!(second.message, Message::TelemetryAck(false));
    }

    #[test]
    fn gps_frame_skips_instrument_check() {
        let frame = Frame::new(FrameKind::GpsData, 9)
            .with_field("Date", "2022/01/30")
            .with_field("Time", "23:59:59")
            .with_field("Lon", "-104.5")
            .with_field("Lat", "40.25")
            .with_field("Alt", "30000")
            .with_field("SZA", "95.1")
            .with_field("VBAT", "15.1")
            .with_field("Diff", "0.2")
            .with_field("Quality", "1");
        let received = reader(&wire(&frame, None)).read_frame().unwrap();
        let Message::Gps(report) = received.message else {
            panic!("expected GPS");
        };
        assert_eq!(report.position.unwrap().longitude, -104.5);
        assert_eq!(received.frame, frame);
    }
}
