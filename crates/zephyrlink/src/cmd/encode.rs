use zephyrlink_frame::codec::{INST_FIELD, LENGTH_FIELD};
use zephyrlink_frame::{Frame, FrameKind, FrameWriter};

use crate::cmd::{read_input, write_output, EncodeArgs};
use crate::exit::{write_error, CliError, CliResult, SUCCESS, USAGE};

pub fn run(args: EncodeArgs) -> CliResult<i32> {
    let kind = FrameKind::from_tag(&args.tag);
    if kind == FrameKind::Unknown {
        return Err(CliError::new(
            USAGE,
            format!("unknown frame tag: {}", args.tag),
        ));
    }

    let mut frame = Frame::new(kind, args.seq);
    // GPS is broadcast by the gondola and names no instrument
    if kind != FrameKind::GpsData {
        frame.push_field(INST_FIELD, args.instrument.id());
    }
    for field in &args.fields {
        let (name, value) = parse_field(field)?;
        frame.push_field(name, value);
    }

    let binary = read_input(args.binary, args.binary_file.as_ref(), "binary")?;
    let binary = match (kind.carries_binary(), binary) {
        (true, payload) => Some(payload.unwrap_or_default()),
        (false, None) => None,
        (false, Some(_)) => {
            return Err(CliError::new(
                USAGE,
                format!("{kind} frames carry no binary section"),
            ))
        }
    };
    if let Some(payload) = &binary {
        if frame.field(LENGTH_FIELD).is_none() {
            frame.push_field(LENGTH_FIELD, payload.len().to_string());
        }
    }

    let mut writer = FrameWriter::new(Vec::new(), args.instrument);
    writer
        .write_frame(&frame, binary.as_deref())
        .map_err(|err| write_error("encode failed", err))?;

    write_output(writer.get_ref(), args.out.as_ref())?;
    Ok(SUCCESS)
}

fn parse_field(input: &str) -> CliResult<(&str, &str)> {
    input
        .split_once('=')
        .filter(|(name, _)| !name.is_empty())
        .ok_or_else(|| CliError::new(USAGE, format!("field must be NAME=VALUE: {input}")))
}
