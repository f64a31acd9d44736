use zephyrlink_frame::checksum;

use crate::cmd::{read_input, CrcArgs};
use crate::exit::{CliError, CliResult, SUCCESS, USAGE};
use crate::output::{print_crc, CrcReport, OutputFormat};

pub fn run(args: CrcArgs, format: OutputFormat) -> CliResult<i32> {
    let bytes = read_input(args.text, args.file.as_ref(), "input")?
        .ok_or_else(|| CliError::new(USAGE, "provide TEXT or --file"))?;

    let crc = checksum(&bytes);
    print_crc(
        &CrcReport {
            length: bytes.len(),
            crc,
            hex: format!("0x{crc:04X}"),
        },
        format,
    );
    Ok(SUCCESS)
}
