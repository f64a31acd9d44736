//! Tag-delimited frame reader and writer for the Zephyr instrument link.
//!
//! Every message on the link is an ASCII frame:
//! ```text
//! <KIND>
//! 	<Name>Value</Name>
//! </KIND>
//! <CRC>12345</CRC>
//! ```
//! Telecommand and telemetry frames are followed by a binary section,
//! `START` payload, two CRC bytes, `END`.
//!
//! [`FrameReader`] rebuilds frames from a polled [`ByteSource`] under a
//! deadline. [`FrameWriter`] emits them and owns the instrument's sequence
//! counter and telemetry buffer. Both compute the same [`crc`] over every
//! byte they handle.
//!
//! [`ByteSource`]: zephyrlink_transport::ByteSource

pub mod codec;
pub mod config;
pub mod crc;
pub mod error;
pub mod instrument;
pub mod kind;
pub mod message;
pub mod reader;
pub mod telemetry;
pub mod writer;

pub use codec::{encode_binary_section, encode_frame, Field, Frame, FrameLimits};
pub use config::{CrcPolicy, ReaderConfig, WriterConfig, MAX_TELECOMMAND_LEN};
pub use crc::{checksum, Crc16, CRC_RESET};
pub use error::{CrcSection, ReadError, ReadResult, ReadStage, WriteError, WriteResult};
pub use instrument::{Instrument, UnknownInstrument};
pub use kind::FrameKind;
pub use message::{GpsData, GpsPosition, GpsReport, GpsTime, InstrumentMode, Message};
pub use reader::{BinarySection, CrcCheck, FrameReader, Received};
pub use telemetry::{StateFlag, StateReport, StateSlot, TelemetryBuffer};
pub use writer::FrameWriter;
