use zephyrlink_frame::{FrameWriter, StateSlot};

use crate::cmd::{read_input, write_output, ReportArgs, ReportKind};
use crate::exit::{write_error, CliError, CliResult, SUCCESS, USAGE};

pub fn run(args: ReportArgs) -> CliResult<i32> {
    let payload = read_input(args.payload, args.payload_file.as_ref(), "payload")?;
    if payload.is_some() && !matches!(args.kind, ReportKind::Telemetry) {
        return Err(CliError::new(
            USAGE,
            "--payload only applies to telemetry reports",
        ));
    }

    let mut writer = FrameWriter::new(Vec::new(), args.instrument);
    writer.set_next_sequence(args.seq);
    writer.set_state_flag(StateSlot::First, args.flag.into());

    let result = match args.kind {
        ReportKind::ModeReport => writer.send_mode_report(),
        ReportKind::ModeAck => writer.send_mode_ack(true),
        ReportKind::ModeNak => writer.send_mode_ack(false),
        ReportKind::Safety => writer.send_safety(),
        ReportKind::RachutsRequest => writer.send_rachuts_request(),
        ReportKind::TcAck => writer.send_telecommand_ack(true),
        ReportKind::TcNak => writer.send_telecommand_ack(false),
        ReportKind::Housekeeping => writer.send_housekeeping(),
        ReportKind::Status => writer.send_status(args.flag.into(), &args.message),
        ReportKind::Telemetry => {
            if let Some(payload) = &payload {
                writer
                    .telemetry_mut()
                    .push_bytes(payload)
                    .map_err(|err| write_error("telemetry payload rejected", err))?;
            }
            writer.send_telemetry()
        }
    };
    result.map_err(|err| write_error("report failed", err))?;

    write_output(writer.get_ref(), args.out.as_ref())?;
    Ok(SUCCESS)
}
