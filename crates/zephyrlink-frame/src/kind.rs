//! Frame kinds and their wire tags.
//!
//! Inbound kinds are sent by the gondola computer to an instrument.
//! Outbound kinds are sent by an instrument back to the gondola computer.

use std::fmt;

/// Kind of a frame, identified by its outer tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameKind {
    /// `IM`: mode change request.
    InstrumentMode,
    /// `SAck`: acknowledgement of a safety request.
    SafetyAck,
    /// `SW`: imminent shutdown warning.
    ShutdownWarning,
    /// `RAAck`: acknowledgement of a RACHuTS authorization request.
    RachutsAck,
    /// `TMAck`: acknowledgement of a telemetry frame.
    TelemetryAck,
    /// `TC`: telecommand, followed by a binary section.
    Telecommand,
    /// `GPS`: time and position broadcast.
    GpsData,
    /// `IMR`: instrument mode report.
    InstrumentModeReport,
    /// `IMAck`: acknowledgement of a mode change.
    ModeAck,
    /// `S`: safety request.
    Safety,
    /// `RA`: RACHuTS authorization request.
    RachutsRequest,
    /// `TM`: telemetry, followed by a binary section.
    Telemetry,
    /// `TCAck`: acknowledgement of a telecommand.
    TelecommandAck,
    /// Anything else.
    Unknown,
}

impl FrameKind {
    /// Kinds the gondola computer sends.
    pub const INBOUND: [FrameKind; 7] = [
        Self::InstrumentMode,
        Self::SafetyAck,
        Self::ShutdownWarning,
        Self::RachutsAck,
        Self::TelemetryAck,
        Self::Telecommand,
        Self::GpsData,
    ];

    /// Kinds an instrument sends.
    pub const OUTBOUND: [FrameKind; 6] = [
        Self::InstrumentModeReport,
        Self::ModeAck,
        Self::Safety,
        Self::RachutsRequest,
        Self::Telemetry,
        Self::TelecommandAck,
    ];

    /// The literal tag text, or `None` for [`FrameKind::Unknown`].
    pub const fn tag(self) -> Option<&'static str> {
        let tag = match self {
            Self::InstrumentMode => "IM",
            Self::SafetyAck => "SAck",
            Self::ShutdownWarning => "SW",
            Self::RachutsAck => "RAAck",
            Self::TelemetryAck => "TMAck",
            Self::Telecommand => "TC",
            Self::GpsData => "GPS",
            Self::InstrumentModeReport => "IMR",
            Self::ModeAck => "IMAck",
            Self::Safety => "S",
            Self::RachutsRequest => "RA",
            Self::Telemetry => "TM",
            Self::TelecommandAck => "TCAck",
            Self::Unknown => return None,
        };
        Some(tag)
    }

    /// Map tag text to a kind. Unrecognized text maps to `Unknown`.
    pub fn from_tag(tag: &str) -> Self {
        Self::INBOUND
            .into_iter()
            .chain(Self::OUTBOUND)
            .find(|kind| kind.tag() == Some(tag))
            .unwrap_or(Self::Unknown)
    }

    /// Whether the gondola computer sends this kind.
    pub fn is_inbound(self) -> bool {
        Self::INBOUND.contains(&self)
    }

    /// Whether a binary section follows the CRC tag.
    pub const fn carries_binary(self) -> bool {
        matches!(self, Self::Telecommand | Self::Telemetry)
    }

    /// Human-readable kind name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::InstrumentMode => "instrument mode",
            Self::SafetyAck => "safety ack",
            Self::ShutdownWarning => "shutdown warning",
            Self::RachutsAck => "rachuts ack",
            Self::TelemetryAck => "telemetry ack",
            Self::Telecommand => "telecommand",
            Self::GpsData => "gps",
            Self::InstrumentModeReport => "mode report",
            Self::ModeAck => "mode ack",
            Self::Safety => "safety",
            Self::RachutsRequest => "rachuts request",
            Self::Telemetry => "telemetry",
            Self::TelecommandAck => "telecommand ack",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for FrameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag().unwrap_or("?"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_round_trip() {
        for kind in FrameKind::INBOUND.into_iter().chain(FrameKind::OUTBOUND) {
            let tag = kind.tag().unwrap();
            assert_eq!(FrameKind::from_tag(tag), kind);
        }
    }

    #[test]
    fn unknown_tags() {
        assert_eq!(FrameKind::from_tag("XX"), FrameKind::Unknown);
        assert_eq!(FrameKind::from_tag("tc"), FrameKind::Unknown);
        assert_eq!(FrameKind::from_tag(""), FrameKind::Unknown);
        assert_eq!(FrameKind::Unknown.tag(), None);
    }

    #[test]
    fn direction_and_binary() {
        assert!(FrameKind::GpsData.is_inbound());
        assert!(!FrameKind::Telemetry.is_inbound());
        assert!(FrameKind::Telecommand.carries_binary());
        assert!(FrameKind::Telemetry.carries_binary());
        assert!(!FrameKind::TelecommandAck.carries_binary());
    }
}
