use std::fmt;
use std::io;

use zephyrlink_frame::{ReadError, WriteError};
use zephyrlink_transport::TransportError;

pub const SUCCESS: i32 = 0;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::NotFound => USAGE,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    match err {
        TransportError::Open { source, .. } | TransportError::Io(source) => {
            io_error(context, source)
        }
    }
}

pub fn read_error(context: &str, err: &ReadError) -> CliError {
    let code = match err {
        ReadError::Timeout { .. } => TIMEOUT,
        ReadError::Malformed { .. }
        | ReadError::UnknownKind(_)
        | ReadError::SchemaMismatch { .. }
        | ReadError::Incomplete { .. }
        | ReadError::CrcMismatch { .. } => DATA_INVALID,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn write_error(context: &str, err: WriteError) -> CliError {
    match err {
        WriteError::Io(source) => io_error(context, source),
        WriteError::BufferFull { .. } | WriteError::InvalidField(_) => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
        WriteError::WrongInstrument { .. } => CliError::new(USAGE, format!("{context}: {err}")),
    }
}
