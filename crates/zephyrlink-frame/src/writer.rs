use bytes::BytesMut;
use tracing::debug;
use zephyrlink_transport::ByteSink;

use crate::codec::{encode_binary_section, encode_frame, Frame, INST_FIELD, LENGTH_FIELD};
use crate::config::WriterConfig;
use crate::crc::Crc16;
use crate::error::{WriteError, WriteResult};
use crate::instrument::Instrument;
use crate::kind::FrameKind;
use crate::telemetry::{StateFlag, StateReport, StateSlot, TelemetryBuffer};

const INITIAL_BUFFER_CAPACITY: usize = 1024;

/// Sequence ids never reach this value.
const SEQUENCE_WRAP: u16 = 65534;

/// Instrument-side frame writer.
///
/// Owns the sequence counter, the telemetry buffer and the three status
/// slots reported in `TM` frames. Every frame is built in memory and handed
/// to the sink in one write followed by a flush.
pub struct FrameWriter<T> {
    inner: T,
    buf: BytesMut,
    crc: Crc16,
    config: WriterConfig,
    next_sequence: u16,
    telemetry: TelemetryBuffer,
    states: [StateReport; 3],
}

impl<T: ByteSink> FrameWriter<T> {
    /// Create a writer for `instrument` with default configuration.
    pub fn new(inner: T, instrument: Instrument) -> Self {
        Self::with_config(inner, WriterConfig::new(instrument))
    }

    pub fn with_config(inner: T, config: WriterConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            crc: Crc16::new(),
            telemetry: TelemetryBuffer::with_capacity(config.telemetry_capacity),
            config,
            next_sequence: 1,
            states: StateSlot::ALL.map(StateReport::empty),
        }
    }

    /// `IMR`: report software date and version.
    pub fn send_mode_report(&mut self) -> WriteResult<()> {
        let frame = self
            .begin(FrameKind::InstrumentModeReport)
            .with_field("SWDate", self.config.software_date.as_str())
            .with_field("SWVersion", self.config.software_version.as_str())
            .with_field("ZProtocolVersion", self.config.protocol_version.as_str());
        self.send(&frame, None)
    }

    /// `IMAck`: acknowledge a mode change.
    pub fn send_mode_ack(&mut self, ack: bool) -> WriteResult<()> {
        let frame = self
            .begin(FrameKind::ModeAck)
            .with_field("Ack", ack_literal(ack));
        self.send(&frame, None)
    }

    /// `S`: request safety.
    pub fn send_safety(&mut self) -> WriteResult<()> {
        let frame = self.begin(FrameKind::Safety);
        self.send(&frame, None)
    }

    /// `RA`: request RACHuTS authorization. Only RACHuTS may send it.
    pub fn send_rachuts_request(&mut self) -> WriteResult<()> {
        if self.config.instrument != Instrument::Rachuts {
            return Err(WriteError::WrongInstrument {
                kind: FrameKind::RachutsRequest,
                allowed: Instrument::Rachuts,
                actual: self.config.instrument,
            });
        }
        let frame = self.begin(FrameKind::RachutsRequest);
        self.send(&frame, None)
    }

    /// `TCAck`: acknowledge a telecommand.
    pub fn send_telecommand_ack(&mut self, ack: bool) -> WriteResult<()> {
        let frame = self
            .begin(FrameKind::TelecommandAck)
            .with_field("Ack", ack_literal(ack));
        self.send(&frame, None)
    }

    /// `TM` carrying the telemetry buffer and the current status slots.
    ///
    /// An empty buffer sends housekeeping instead. The buffer is cleared
    /// once the frame is written; on error it is kept for a retry.
    pub fn send_telemetry(&mut self) -> WriteResult<()> {
        if self.telemetry.is_empty() {
            return self.send_housekeeping();
        }
        let payload = self.telemetry.as_bytes().to_vec();
        let frame = self.telemetry_frame(payload.len());
        self.send(&frame, Some(payload.as_slice()))?;
        self.telemetry.clear();
        Ok(())
    }

    /// `TM` with the status slots only and an empty binary section.
    pub fn send_housekeeping(&mut self) -> WriteResult<()> {
        let frame = self.telemetry_frame(0);
        self.send(&frame, Some(&[][..]))
    }

    /// `TM` with a one-off status in the first slot and an empty binary
    /// section. The stored slots are left alone.
    pub fn send_status(&mut self, flag: StateFlag, message: &str) -> WriteResult<()> {
        let frame = self
            .begin(FrameKind::Telemetry)
            .with_field("StateFlag1", flag_or_unknown(flag))
            .with_field(StateSlot::First.message_field(), message)
            .with_field(LENGTH_FIELD, "0");
        self.send(&frame, Some(&[][..]))
    }

    /// Write an arbitrary frame as given, with an optional binary section.
    ///
    /// The frame keeps its own sequence id; the writer's counter is not
    /// touched.
    pub fn write_frame(&mut self, frame: &Frame, binary: Option<&[u8]>) -> WriteResult<()> {
        self.check(frame, binary)?;
        self.put(frame, binary)
    }

    /// Buffer for the next `TM` frame.
    pub fn telemetry_mut(&mut self) -> &mut TelemetryBuffer {
        &mut self.telemetry
    }

    pub fn telemetry(&self) -> &TelemetryBuffer {
        &self.telemetry
    }

    pub fn set_state_flag(&mut self, slot: StateSlot, flag: StateFlag) {
        self.states[slot.index()].flag = flag;
    }

    /// Rename the field a slot's flag is written under.
    pub fn set_state_name(&mut self, slot: StateSlot, name: impl Into<String>) {
        self.states[slot.index()].name = name.into();
    }

    /// Set the details message of a slot. Empty details are left out.
    pub fn set_state_details(&mut self, slot: StateSlot, details: impl Into<String>) {
        self.states[slot.index()].details = details.into();
    }

    pub fn state(&self, slot: StateSlot) -> &StateReport {
        &self.states[slot.index()]
    }

    /// Sequence id the next frame will carry.
    pub fn next_sequence(&self) -> u16 {
        self.next_sequence
    }

    /// Resume numbering at `sequence_id`. Values outside `1..65534` restart
    /// at 1.
    pub fn set_next_sequence(&mut self, sequence_id: u16) {
        self.next_sequence = if (1..SEQUENCE_WRAP).contains(&sequence_id) {
            sequence_id
        } else {
            1
        };
    }

    /// Borrow the underlying sink.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying sink.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the writer and return the sink.
    pub fn into_inner(self) -> T {
        self.inner
    }

    pub fn config(&self) -> &WriterConfig {
        &self.config
    }

    /// Start a frame with `Msg` and `Inst` under the next sequence id. The
    /// id is consumed by [`send`](Self::send).
    fn begin(&self, kind: FrameKind) -> Frame {
        Frame::new(kind, self.next_sequence).with_field(INST_FIELD, self.config.instrument.id())
    }

    /// Emit a frame built by [`begin`](Self::begin). A frame rejected by
    /// validation leaves the sequence id unused.
    fn send(&mut self, frame: &Frame, binary: Option<&[u8]>) -> WriteResult<()> {
        self.check(frame, binary)?;
        self.next_sequence = match frame.sequence_id + 1 {
            SEQUENCE_WRAP => 1,
            next => next,
        };
        self.put(frame, binary)
    }

    fn telemetry_frame(&self, length: usize) -> Frame {
        let mut frame = self.begin(FrameKind::Telemetry);
        for (slot, state) in StateSlot::ALL.into_iter().zip(&self.states) {
            // the first slot is always sent
            if slot == StateSlot::First || state.flag != StateFlag::NoMessage {
                frame.push_field(state.name.as_str(), flag_or_unknown(state.flag));
            }
            if !state.details.is_empty() {
                frame.push_field(slot.message_field(), state.details.as_str());
            }
        }
        frame.push_field(LENGTH_FIELD, length.to_string());
        frame
    }

    fn check(&self, frame: &Frame, binary: Option<&[u8]>) -> WriteResult<()> {
        frame.validate(&self.config.limits)?;
        if let Some(payload) = binary {
            let declared = frame.binary_length().map(usize::from);
            if declared != Some(payload.len()) {
                return Err(WriteError::InvalidField(format!(
                    "Length {declared:?} does not match a {}-byte binary section",
                    payload.len()
                )));
            }
        }
        Ok(())
    }

    fn put(&mut self, frame: &Frame, binary: Option<&[u8]>) -> WriteResult<()> {
        self.buf.clear();
        self.crc.reset();
        encode_frame(frame, &mut self.crc, &mut self.buf);
        if let Some(payload) = binary {
            encode_binary_section(payload, &mut self.crc, &mut self.buf);
        }

        self.inner.write_bytes(&self.buf)?;
        self.inner.flush()?;
        debug!(
            kind = %frame.kind,
            seq = frame.sequence_id,
            bytes = self.buf.len(),
            binary = binary.map(<[u8]>::len),
            "frame written"
        );
        Ok(())
    }
}

impl<T> std::fmt::Debug for FrameWriter<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameWriter")
            .field("instrument", &self.config.instrument)
            .field("next_sequence", &self.next_sequence)
            .field("telemetry", &self.telemetry.len())
            .finish_non_exhaustive()
    }
}

fn flag_or_unknown(flag: StateFlag) -> &'static str {
    flag.literal().unwrap_or("UNKN")
}

fn ack_literal(ack: bool) -> &'static str {
    if ack {
        "ACK"
    } else {
        "NACK"
    }
}
