use std::time::Duration;

use zephyrlink_telecommand::{ParameterSchema, STRATEOLE_SCHEMA};

use crate::codec::FrameLimits;
use crate::instrument::Instrument;
use crate::telemetry::DEFAULT_TELEMETRY_CAPACITY;

/// Default time allowed for the text part of a frame.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(200);

/// Extra time allowed for a binary section.
pub const DEFAULT_BINARY_GRACE: Duration = Duration::from_millis(100);

/// Longest telecommand binary section.
pub const MAX_TELECOMMAND_LEN: usize = 1800;

/// What the reader does when a received CRC does not match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CrcPolicy {
    /// Report the mismatch in the result and accept the frame.
    #[default]
    Advisory,
    /// Reject the frame with [`ReadError::CrcMismatch`](crate::ReadError::CrcMismatch).
    Enforce,
}

/// Frame reader configuration.
#[derive(Debug, Clone)]
pub struct ReaderConfig {
    /// Instrument whose `Inst` field incoming frames must carry.
    pub instrument: Instrument,
    /// Deadline for a frame, counted from the start of a read.
    pub timeout: Duration,
    /// Added to the deadline once a binary section is due.
    pub binary_grace: Duration,
    /// Sleep between polls of an idle source. Zero spins.
    pub poll_interval: Duration,
    pub limits: FrameLimits,
    /// Longest binary section accepted.
    pub max_binary_len: usize,
    pub crc_policy: CrcPolicy,
    /// Parameter layout used to decode telecommand sections.
    pub schema: &'static ParameterSchema,
}

impl ReaderConfig {
    /// Configuration for an instrument reading gondola frames.
    pub fn new(instrument: Instrument) -> Self {
        Self {
            instrument,
            timeout: DEFAULT_READ_TIMEOUT,
            binary_grace: DEFAULT_BINARY_GRACE,
            poll_interval: Duration::from_micros(100),
            limits: FrameLimits::INBOUND,
            max_binary_len: MAX_TELECOMMAND_LEN,
            crc_policy: CrcPolicy::Advisory,
            schema: &STRATEOLE_SCHEMA,
        }
    }

    /// Configuration for reading frames an instrument sent.
    ///
    /// Widens field limits to the outbound ones and allows a full telemetry
    /// buffer in the binary section.
    pub fn outbound(instrument: Instrument) -> Self {
        Self {
            limits: FrameLimits::OUTBOUND,
            max_binary_len: DEFAULT_TELEMETRY_CAPACITY,
            ..Self::new(instrument)
        }
    }
}

/// Frame writer configuration.
#[derive(Debug, Clone)]
pub struct WriterConfig {
    /// Instrument written into every `Inst` field.
    pub instrument: Instrument,
    /// `SWDate` of the mode report.
    pub software_date: String,
    /// `SWVersion` of the mode report.
    pub software_version: String,
    /// `ZProtocolVersion` of the mode report.
    pub protocol_version: String,
    pub telemetry_capacity: usize,
    pub limits: FrameLimits,
}

impl WriterConfig {
    pub fn new(instrument: Instrument) -> Self {
        Self {
            instrument,
            software_date: "20170901,000000".to_string(),
            software_version: "0.1".to_string(),
            protocol_version: "1.0".to_string(),
            telemetry_capacity: DEFAULT_TELEMETRY_CAPACITY,
            limits: FrameLimits::OUTBOUND,
        }
    }
}
