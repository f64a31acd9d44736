use zephyrlink_telecommand::{statements, STRATEOLE_SCHEMA};

use crate::cmd::{read_input, TelecommandArgs};
use crate::exit::{CliError, CliResult, DATA_INVALID, SUCCESS, USAGE};
use crate::output::{print_telecommands, OutputFormat, TelecommandOutput};

pub fn run(args: TelecommandArgs, format: OutputFormat) -> CliResult<i32> {
    let buffer = read_input(args.statements, args.file.as_ref(), "statements")?
        .ok_or_else(|| CliError::new(USAGE, "provide STATEMENTS or --file"))?;

    let results: Vec<_> = statements(&buffer, &STRATEOLE_SCHEMA).collect();
    let rejected = results.iter().filter(|result| result.is_err()).count();
    let rows: Vec<_> = results
        .iter()
        .map(|result| TelecommandOutput::new(result, &STRATEOLE_SCHEMA))
        .collect();
    print_telecommands(&rows, format);

    if rejected > 0 {
        return Err(CliError::new(
            DATA_INVALID,
            format!("{rejected} of {} statement(s) rejected", results.len()),
        ));
    }
    Ok(SUCCESS)
}
