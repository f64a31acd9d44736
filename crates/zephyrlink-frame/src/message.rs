//! Typed view of a frame's fields, validated per kind.

use std::fmt;
use std::str::FromStr;

use tracing::debug;

use crate::codec::{Field, INST_FIELD, LENGTH_FIELD, MSG_FIELD};
use crate::config::{ReaderConfig, MAX_TELECOMMAND_LEN};
use crate::error::{ReadError, ReadResult};
use crate::kind::FrameKind;

/// Operating mode requested by the gondola computer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstrumentMode {
    Standby,
    Flight,
    LowPower,
    Safety,
    EndOfFlight,
}

impl InstrumentMode {
    pub const ALL: [InstrumentMode; 5] = [
        Self::Standby,
        Self::Flight,
        Self::LowPower,
        Self::Safety,
        Self::EndOfFlight,
    ];

    /// Two-letter wire code.
    pub const fn code(self) -> &'static str {
        match self {
            Self::Standby => "SB",
            Self::Flight => "FL",
            Self::LowPower => "LP",
            Self::Safety => "SA",
            Self::EndOfFlight => "EF",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|mode| mode.code() == code)
    }
}

impl fmt::Display for InstrumentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// UTC date and time as broadcast in `GPS` frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GpsTime {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

impl fmt::Display for GpsTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}/{:02}/{:02} {:02}:{:02}:{:02}",
            self.year, self.month, self.day, self.hour, self.minute, self.second
        )
    }
}

/// Position part of a `GPS` frame.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GpsPosition {
    pub longitude: f32,
    pub latitude: f32,
    pub altitude: f32,
    pub solar_zenith_angle: f32,
    pub vbat: f32,
    pub diff: f32,
}

/// One received `GPS` frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GpsReport {
    pub time: GpsTime,
    pub quality: u8,
    /// `None` when the fix quality is 0.
    pub position: Option<GpsPosition>,
}

/// Latest known GPS state, updated from successive reports.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GpsData {
    pub time: GpsTime,
    pub quality: u8,
    pub position: GpsPosition,
}

impl GpsData {
    /// Fold a report in. Time and quality always update; the position is
    /// kept when the report carries no fix.
    pub fn apply(&mut self, report: &GpsReport) {
        self.time = report.time;
        self.quality = report.quality;
        if let Some(position) = report.position {
            self.position = position;
        }
    }
}

/// Semantic content of a frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    InstrumentMode(InstrumentMode),
    /// `true` for `ACK`, `false` for `NAK`.
    SafetyAck(bool),
    ShutdownWarning,
    RachutsAck(bool),
    TelemetryAck(bool),
    Telecommand {
        length: u16,
    },
    Gps(GpsReport),
    InstrumentModeReport {
        software_date: String,
        software_version: String,
        protocol_version: String,
    },
    /// `true` for `ACK`, `false` for `NACK`.
    ModeAck(bool),
    Safety,
    RachutsRequest,
    /// Status fields as sent, in order.
    Telemetry {
        status: Vec<Field>,
        length: u16,
    },
    TelecommandAck(bool),
}

impl Message {
    /// Declared binary section length.
    pub fn binary_length(&self) -> Option<u16> {
        match self {
            Self::Telecommand { length } | Self::Telemetry { length, .. } => Some(*length),
            _ => None,
        }
    }
}

/// Validate `fields` against `kind` and extract the sequence id and message.
pub(crate) fn parse(
    kind: FrameKind,
    fields: &[Field],
    config: &ReaderConfig,
) -> ReadResult<(u16, Message)> {
    let mut fields = Expect {
        kind,
        rest: fields,
    };
    let sequence_id = fields.parse::<u16>(MSG_FIELD)?;

    let message = if kind == FrameKind::GpsData {
        Message::Gps(parse_gps(&mut fields)?)
    } else {
        let inst = fields.next(INST_FIELD)?;
        if inst != config.instrument.id() {
            return Err(ReadError::schema(
                kind,
                format!("addressed to {inst:?}, not {}", config.instrument),
            ));
        }
        parse_body(kind, &mut fields, config)?
    };

    if !fields.rest.is_empty() {
        debug!(kind = %kind, extra = fields.rest.len(), "ignoring trailing fields");
    }
    Ok((sequence_id, message))
}

fn parse_body(
    kind: FrameKind,
    fields: &mut Expect<'_>,
    config: &ReaderConfig,
) -> ReadResult<Message> {
    let message = match kind {
        FrameKind::InstrumentMode => {
            let code = fields.next("Mode")?;
            let mode = InstrumentMode::from_code(code)
                .ok_or_else(|| ReadError::schema(kind, format!("unknown mode {code:?}")))?;
            Message::InstrumentMode(mode)
        }
        FrameKind::SafetyAck => Message::SafetyAck(fields.ack(HOST_NAK)?),
        FrameKind::ShutdownWarning => Message::ShutdownWarning,
        FrameKind::RachutsAck => Message::RachutsAck(fields.ack(HOST_NAK)?),
        FrameKind::TelemetryAck => Message::TelemetryAck(fields.ack(HOST_NAK)?),
        FrameKind::Telecommand => Message::Telecommand {
            length: fields.length(MAX_TELECOMMAND_LEN.min(config.max_binary_len))?,
        },
        FrameKind::InstrumentModeReport => Message::InstrumentModeReport {
            software_date: fields.next("SWDate")?.to_string(),
            software_version: fields.next("SWVersion")?.to_string(),
            protocol_version: fields.next("ZProtocolVersion")?.to_string(),
        },
        FrameKind::ModeAck => Message::ModeAck(fields.ack(INSTRUMENT_NAK)?),
        FrameKind::Safety => Message::Safety,
        FrameKind::RachutsRequest => Message::RachutsRequest,
        FrameKind::Telemetry => {
            let rest = fields.rest;
            let Some((length_field, status)) = rest.split_last() else {
                return Err(ReadError::schema(kind, "missing Length"));
            };
            if length_field.name != LENGTH_FIELD {
                return Err(ReadError::schema(kind, "last field must be Length"));
            }
            let status = status.to_vec();
            fields.rest = std::slice::from_ref(length_field);
            Message::Telemetry {
                status,
                length: fields.length(config.max_binary_len)?,
            }
        }
        FrameKind::TelecommandAck => Message::TelecommandAck(fields.ack(INSTRUMENT_NAK)?),
        FrameKind::GpsData | FrameKind::Unknown => {
            return Err(ReadError::schema(kind, "no field layout for this kind"));
        }
    };
    Ok(message)
}

const HOST_NAK: &str = "NAK";
const INSTRUMENT_NAK: &str = "NACK";

fn parse_gps(fields: &mut Expect<'_>) -> ReadResult<GpsReport> {
    let kind = fields.kind;
    let date = fields.next("Date")?;
    let [year, month, day] = split3(date, '/')
        .ok_or_else(|| ReadError::schema(kind, format!("bad date {date:?}")))?;
    let clock = fields.next("Time")?;
    let [hour, minute, second] = split3(clock, ':')
        .ok_or_else(|| ReadError::schema(kind, format!("bad time {clock:?}")))?;

    if year > 2050 || month > 12 || day > 31 || hour > 23 || minute > 59 || second > 59 {
        return Err(ReadError::schema(
            kind,
            format!("date/time out of range: {date} {clock}"),
        ));
    }
    let time = GpsTime {
        year: year as u16,
        month: month as u8,
        day: day as u8,
        hour: hour as u8,
        minute: minute as u8,
        second: second as u8,
    };

    let position = GpsPosition {
        longitude: fields.float("Lon")?,
        latitude: fields.float("Lat")?,
        altitude: fields.float("Alt")?,
        solar_zenith_angle: fields.float("SZA")?,
        vbat: fields.float("VBAT")?,
        diff: fields.float("Diff")?,
    };
    let quality = fields.parse::<u8>("Quality")?;

    Ok(GpsReport {
        time,
        quality,
        position: (quality != 0).then_some(position),
    })
}

/// Three unsigned decimal parts joined by `sep`.
fn split3(text: &str, sep: char) -> Option<[u32; 3]> {
    let mut parts = text.split(sep);
    let mut out = [0u32; 3];
    for slot in &mut out {
        *slot = parse_unsigned(parts.next()?)?;
    }
    parts.next().is_none().then_some(out)
}

fn parse_unsigned<T: FromStr>(text: &str) -> Option<T> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}

/// Cursor over a frame's fields that checks names in order.
struct Expect<'a> {
    kind: FrameKind,
    rest: &'a [Field],
}

impl<'a> Expect<'a> {
    fn next(&mut self, name: &str) -> ReadResult<&'a str> {
        let Some((field, rest)) = self.rest.split_first() else {
            return Err(ReadError::schema(self.kind, format!("missing {name}")));
        };
        if field.name != name {
            return Err(ReadError::schema(
                self.kind,
                format!("expected {name}, found {}", field.name),
            ));
        }
        self.rest = rest;
        Ok(&field.value)
    }

    fn parse<T: FromStr>(&mut self, name: &str) -> ReadResult<T> {
        let value = self.next(name)?;
        parse_unsigned(value)
            .ok_or_else(|| ReadError::schema(self.kind, format!("bad {name} value {value:?}")))
    }

    fn float(&mut self, name: &str) -> ReadResult<f32> {
        let value = self.next(name)?;
        value
            .parse::<f32>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| ReadError::schema(self.kind, format!("bad {name} value {value:?}")))
    }

    fn ack(&mut self, negative: &str) -> ReadResult<bool> {
        match self.next("Ack")? {
            "ACK" => Ok(true),
            value if value == negative => Ok(false),
            value => Err(ReadError::schema(self.kind, format!("bad Ack value {value:?}"))),
        }
    }

    fn length(&mut self, max: usize) -> ReadResult<u16> {
        let length = self.parse::<u16>(LENGTH_FIELD)?;
        if usize::from(length) > max {
            return Err(ReadError::schema(
                self.kind,
                format!("binary length {length} exceeds {max}"),
            ));
        }
        Ok(length)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instrument::Instrument;

    fn fields(pairs: &[(&str, &str)]) -> Vec<Field> {
        pairs.iter().map(|(n, v)| Field::new(*n, *v)).collect()
    }

    fn config() -> ReaderConfig {
        ReaderConfig::new(Instrument::Lpc)
    }

    fn gps_fields(quality: &str) -> Vec<Field> {
        fields(&[
            ("Msg", "4"),
            ("Date", "2021/09/14"),
            ("Time", "12:30:05"),
            ("Lon", "5.25"),
            ("Lat", "-21.5"),
            ("Alt", "18500"),
            ("SZA", "87.5"),
            ("VBAT", "14.2"),
            ("Diff", "0.5"),
            ("Quality", quality),
        ])
    }

    #[test]
    fn mode_request() {
        let (seq, msg) = parse(
            FrameKind::InstrumentMode,
            &fields(&[("Msg", "12"), ("Inst", "LPC"), ("Mode", "FL")]),
            &config(),
        )
        .unwrap();
        assert_eq!(seq, 12);
        assert_eq!(msg, Message::InstrumentMode(InstrumentMode::Flight));
    }

    #[test]
    fn wrong_instrument_is_rejected() {
        let err = parse(
            FrameKind::ShutdownWarning,
            &fields(&[("Msg", "1"), ("Inst", "RATS")]),
            &config(),
        )
        .unwrap_err();
        assert!(matches!(err, ReadError::SchemaMismatch { .. }));
    }

    #[test]
    fn ack_literals_depend_on_direction() {
        let host = fields(&[("Msg", "1"), ("Inst", "LPC"), ("Ack", "NAK")]);
        let (_, msg) = parse(FrameKind::TelemetryAck, &host, &config()).unwrap();
        assert_eq!(msg, Message::TelemetryAck(false));
        assert!(parse(FrameKind::TelecommandAck, &host, &config()).is_err());

        let inst = fields(&[("Msg", "1"), ("Inst", "LPC"), ("Ack", "NACK")]);
        let (_, msg) = parse(FrameKind::TelecommandAck, &inst, &config()).unwrap();
        assert_eq!(msg, Message::TelecommandAck(false));
        assert!(parse(FrameKind::SafetyAck, &inst, &config()).is_err());
    }

    #[test]
    fn telecommand_length_is_bounded() {
        let ok = fields(&[("Msg", "1"), ("Inst", "LPC"), ("Length", "1800")]);
        let (_, msg) = parse(FrameKind::Telecommand, &ok, &config()).unwrap();
        assert_eq!(msg.binary_length(), Some(1800));

        let big = fields(&[("Msg", "1"), ("Inst", "LPC"), ("Length", "1801")]);
        assert!(parse(FrameKind::Telecommand, &big, &config()).is_err());
    }

    #[test]
    fn msg_must_come_first_and_be_numeric() {
        let swapped = fields(&[("Inst", "LPC"), ("Msg", "1")]);
        assert!(parse(FrameKind::ShutdownWarning, &swapped, &config()).is_err());

        let text = fields(&[("Msg", "one"), ("Inst", "LPC")]);
        assert!(parse(FrameKind::ShutdownWarning, &text, &config()).is_err());

        let overflow = fields(&[("Msg", "65536"), ("Inst", "LPC")]);
        assert!(parse(FrameKind::ShutdownWarning, &overflow, &config()).is_err());
    }

    #[test]
    fn gps_with_fix() {
        let (_, msg) = parse(FrameKind::GpsData, &gps_fields("1"), &config()).unwrap();
        let Message::Gps(report) = msg else {
            panic!("expected a GPS message");
        };
        assert_eq!(report.time.to_string(), "2021/09/14 12:30:05");
        let position = report.position.unwrap();
        assert_eq!(position.latitude, -21.5);
        assert_eq!(position.altitude, 18500.0);
    }

    #[test]
    fn gps_quality_zero_keeps_previous_position() {
        let mut state = GpsData::default();

        let (_, fix) = parse(FrameKind::GpsData, &gps_fields("2"), &config()).unwrap();
        let Message::Gps(fix) = fix else {
            panic!("expected a GPS message");
        };
        state.apply(&fix);
        assert_eq!(state.position.longitude, 5.25);

        let mut no_fix = gps_fields("0");
        no_fix[3].value = "99.0".to_string();
        no_fix[2].value = "12:31:05".to_string();
        let (_, no_fix) = parse(FrameKind::GpsData, &no_fix, &config()).unwrap();
        let Message::Gps(no_fix) = no_fix else {
            panic!("expected a GPS message");
        };
        assert!(no_fix.position.is_none());
        state.apply(&no_fix);
        assert_eq!(state.position.longitude, 5.25);
        assert_eq!(state.quality, 0);
        assert_eq!(state.time.minute, 31);
    }

    #[test]
    fn gps_range_checks() {
        let mut late = gps_fields("1");
        late[1].value = "2051/01/01".to_string();
        assert!(parse(FrameKind::GpsData, &late, &config()).is_err());

        let mut hour = gps_fields("1");
        hour[2].value = "24:00:00".to_string();
        assert!(parse(FrameKind::GpsData, &hour, &config()).is_err());

        let mut garbled = gps_fields("1");
        garbled[1].value = "2021-09-14".to_string();
        assert!(parse(FrameKind::GpsData, &garbled, &config()).is_err());
    }

    #[test]
    fn telemetry_status_and_length() {
        let tm = fields(&[
            ("Msg", "3"),
            ("Inst", "LPC"),
            ("StateFlag1", "FINE"),
            ("StateMess1", "warming up"),
            ("Length", "12"),
        ]);
        let (_, msg) = parse(FrameKind::Telemetry, &tm, &config()).unwrap();
        let Message::Telemetry { status, length } = msg else {
            panic!("expected telemetry");
        };
        assert_eq!(length, 12);
        assert_eq!(status.len(), 2);
        assert_eq!(status[1].value, "warming up");

        let no_length = fields(&[("Msg", "3"), ("Inst", "LPC"), ("StateFlag1", "FINE")]);
        assert!(parse(FrameKind::Telemetry, &no_length, &config()).is_err());
    }
}
