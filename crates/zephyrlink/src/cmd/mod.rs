use clap::{Args, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

use zephyrlink_frame::{Instrument, StateFlag};

use crate::exit::{CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod crc;
pub mod decode;
pub mod encode;
pub mod report;
pub mod telecommand;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compute the link CRC of a text or file.
    Crc(CrcArgs),
    /// Encode an arbitrary frame from its tag and fields.
    Encode(EncodeArgs),
    /// Emit one instrument frame the way flight software would.
    Report(ReportArgs),
    /// Decode frames from a capture file or serial device.
    Decode(DecodeArgs),
    /// Decode a telecommand statement buffer.
    Telecommand(TelecommandArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Crc(args) => crc::run(args, format),
        Command::Encode(args) => encode::run(args),
        Command::Report(args) => report::run(args),
        Command::Decode(args) => decode::run(args, format),
        Command::Telecommand(args) => telecommand::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct CrcArgs {
    /// Text to checksum.
    #[arg(conflicts_with = "file", required_unless_present = "file")]
    pub text: Option<String>,
    /// Checksum the contents of a file instead.
    #[arg(long)]
    pub file: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    /// Frame tag, e.g. IMR or TM.
    pub tag: String,
    /// Sequence id placed in the Msg field.
    #[arg(long, default_value = "1")]
    pub seq: u16,
    /// Instrument id placed in the Inst field.
    #[arg(long, short = 'i', default_value = "RACHUTS")]
    pub instrument: Instrument,
    /// Additional field as Name=Value (repeatable).
    #[arg(long = "field", value_name = "NAME=VALUE")]
    pub fields: Vec<String>,
    /// Binary section payload as text.
    #[arg(long, conflicts_with = "binary_file")]
    pub binary: Option<String>,
    /// Binary section payload read from a file.
    #[arg(long, conflicts_with = "binary")]
    pub binary_file: Option<PathBuf>,
    /// Write the frame to a file instead of stdout.
    #[arg(long, short = 'o')]
    pub out: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum ReportKind {
    /// IMR instrument mode report.
    ModeReport,
    /// IMAck with ACK.
    ModeAck,
    /// IMAck with NAK.
    ModeNak,
    /// S safety request.
    Safety,
    /// RA request (RACHUTS only).
    RachutsRequest,
    /// TCAck with ACK.
    TcAck,
    /// TCAck with NAK.
    TcNak,
    /// TM carrying the payload.
    Telemetry,
    /// TM carrying housekeeping only.
    Housekeeping,
    /// TM carrying a status message.
    Status,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum FlagArg {
    Unknown,
    Fine,
    Warn,
    Critical,
}

impl From<FlagArg> for StateFlag {
    fn from(flag: FlagArg) -> Self {
        match flag {
            FlagArg::Unknown => Self::Unknown,
            FlagArg::Fine => Self::Fine,
            FlagArg::Warn => Self::Warn,
            FlagArg::Critical => Self::Critical,
        }
    }
}

#[derive(Args, Debug)]
pub struct ReportArgs {
    /// Frame to emit.
    #[arg(value_enum)]
    pub kind: ReportKind,
    /// Instrument sending the frame.
    #[arg(long, short = 'i', default_value = "RACHUTS")]
    pub instrument: Instrument,
    /// Sequence id of the emitted frame.
    #[arg(long, default_value = "1")]
    pub seq: u16,
    /// State flag for the first status slot.
    #[arg(long, value_enum, default_value = "fine")]
    pub flag: FlagArg,
    /// Status message (status frames only).
    #[arg(long, default_value = "")]
    pub message: String,
    /// Telemetry payload as text.
    #[arg(long, conflicts_with = "payload_file")]
    pub payload: Option<String>,
    /// Telemetry payload read from a file.
    #[arg(long, conflicts_with = "payload")]
    pub payload_file: Option<PathBuf>,
    /// Write the frame to a file instead of stdout.
    #[arg(long, short = 'o')]
    pub out: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Capture file or serial device to read.
    pub path: PathBuf,
    /// Instrument the frames are addressed to or sent by.
    #[arg(long, short = 'i', default_value = "RACHUTS")]
    pub instrument: Instrument,
    /// Decode instrument-originated frames (IMR, TM, ...) instead of gondola frames.
    #[arg(long)]
    pub outbound: bool,
    /// Reject frames whose CRC does not match.
    #[arg(long)]
    pub strict: bool,
    /// Per-frame timeout (e.g. 500ms, 2s).
    #[arg(long, default_value = "200ms")]
    pub timeout: String,
    /// Keep reading until interrupted instead of stopping at end of input.
    #[arg(long)]
    pub follow: bool,
    /// Exit after decoding N frames.
    #[arg(long)]
    pub count: Option<usize>,
}

#[derive(Args, Debug)]
pub struct TelecommandArgs {
    /// Statements such as "7,3.5;130;".
    #[arg(conflicts_with = "file", required_unless_present = "file")]
    pub statements: Option<String>,
    /// Read the statement buffer from a file.
    #[arg(long)]
    pub file: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

pub(crate) fn read_input(
    text: Option<String>,
    file: Option<&PathBuf>,
    what: &str,
) -> CliResult<Option<Vec<u8>>> {
    match (text, file) {
        (Some(text), _) => Ok(Some(text.into_bytes())),
        (None, Some(path)) => std::fs::read(path)
            .map(Some)
            .map_err(|err| crate::exit::io_error(&format!("read {what} {}", path.display()), err)),
        (None, None) => Ok(None),
    }
}

pub(crate) fn write_output(bytes: &[u8], out: Option<&PathBuf>) -> CliResult<()> {
    use std::io::Write;

    match out {
        Some(path) => std::fs::write(path, bytes)
            .map_err(|err| crate::exit::io_error(&format!("write {}", path.display()), err)),
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout
                .write_all(bytes)
                .and_then(|()| stdout.flush())
                .map_err(|err| crate::exit::io_error("write stdout", err))
        }
    }
}

pub(crate) fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, millis) = match input.strip_suffix("ms") {
        Some(num) => (num, true),
        None => (input.strip_suffix('s').unwrap_or(input), false),
    };

    let value: u64 = number
        .trim()
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}
