use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{info, warn};
use zephyrlink_frame::{CrcPolicy, FrameReader, ReadError, ReaderConfig};
use zephyrlink_transport::{IoSource, TransportError};

use crate::cmd::{parse_duration, DecodeArgs};
use crate::exit::{read_error, transport_error, CliError, CliResult, INTERNAL, SUCCESS};
use crate::output::{print_received, OutputFormat};

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let timeout = parse_duration(&args.timeout)?;
    let source =
        IoSource::open(&args.path).map_err(|err| transport_error("open failed", err))?;

    let mut config = if args.outbound {
        ReaderConfig::outbound(args.instrument)
    } else {
        ReaderConfig::new(args.instrument)
    };
    config.timeout = timeout;
    if args.strict {
        config.crc_policy = CrcPolicy::Enforce;
    }
    let schema = config.schema;
    let mut reader = FrameReader::with_config(source, config);

    let running = Arc::new(AtomicBool::new(true));
    if args.follow {
        install_ctrlc_handler(running.clone())?;
    }

    let mut decoded = 0usize;
    let mut rejected = 0usize;
    let mut last_error: Option<ReadError> = None;

    while running.load(Ordering::SeqCst) {
        if !args.follow && reader.get_ref().is_exhausted() {
            break;
        }

        match reader.read_frame() {
            Ok(received) => {
                print_received(&received, schema, format);
                decoded = decoded.saturating_add(1);
                if args.count.is_some_and(|count| decoded >= count) {
                    break;
                }
            }
            // nothing on the line before the deadline
            Err(err) if err.is_idle() => {
                if !args.follow {
                    break;
                }
            }
            Err(err) => {
                warn!(error = %err, "frame rejected");
                rejected = rejected.saturating_add(1);
                last_error = Some(err);
            }
        }
    }

    if let Some(err) = reader.get_mut().take_error() {
        return Err(transport_error("read failed", TransportError::Io(err)));
    }

    info!(decoded, rejected, "decode finished");
    match last_error {
        Some(err) => Err(read_error(
            &format!("{rejected} frame(s) rejected, last"),
            &err,
        )),
        None => Ok(SUCCESS),
    }
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
