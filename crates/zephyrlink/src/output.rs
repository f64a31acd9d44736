use std::io::IsTerminal;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use zephyrlink_frame::{CrcCheck, Message, Received};
use zephyrlink_telecommand::{DecodeError, DecodedTelecommand, ParameterSchema};

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct CrcOutput {
    received: u16,
    computed: u16,
    ok: bool,
}

impl From<CrcCheck> for CrcOutput {
    fn from(check: CrcCheck) -> Self {
        Self {
            received: check.received,
            computed: check.computed,
            ok: check.is_match(),
        }
    }
}

#[derive(Serialize)]
struct FieldOutput<'a> {
    name: &'a str,
    value: &'a str,
}

#[derive(Serialize)]
struct BinaryOutput {
    length: usize,
    statement_count: usize,
    crc: CrcOutput,
    preview: String,
}

#[derive(Serialize)]
struct FrameOutput<'a> {
    kind: String,
    sequence_id: u16,
    message: String,
    fields: Vec<FieldOutput<'a>>,
    crc: CrcOutput,
    binary: Option<BinaryOutput>,
    telecommands: Vec<TelecommandOutput>,
}

#[derive(Serialize)]
pub struct TelecommandOutput {
    id: Option<u8>,
    command: Option<&'static str>,
    params: Vec<String>,
    error: Option<String>,
}

impl TelecommandOutput {
    pub fn new(
        result: &Result<DecodedTelecommand, DecodeError>,
        schema: &ParameterSchema,
    ) -> Self {
        match result {
            Ok(command) => Self {
                id: Some(command.id),
                command: schema.lookup(command.id).map(|spec| spec.name),
                params: command.params.iter().map(ToString::to_string).collect(),
                error: None,
            },
            Err(err) => Self {
                id: None,
                command: None,
                params: Vec::new(),
                error: Some(err.to_string()),
            },
        }
    }

    fn label(&self) -> String {
        match (self.id, self.command) {
            (Some(id), Some(name)) => format!("{id} {name}"),
            (Some(id), None) => format!("{id} (unscheduled)"),
            _ => "-".to_string(),
        }
    }

    fn detail(&self) -> String {
        match &self.error {
            Some(err) => format!("error: {err}"),
            None => self.params.join(", "),
        }
    }
}

pub fn print_received(received: &Received, schema: &ParameterSchema, format: OutputFormat) {
    let frame = &received.frame;
    let out = FrameOutput {
        kind: frame.kind.to_string(),
        sequence_id: frame.sequence_id,
        message: describe(&received.message),
        fields: frame
            .fields
            .iter()
            .map(|field| FieldOutput {
                name: &field.name,
                value: &field.value,
            })
            .collect(),
        crc: received.crc.into(),
        binary: received.binary.as_ref().map(|binary| BinaryOutput {
            length: binary.payload.len(),
            statement_count: binary.statement_count,
            crc: binary.crc.into(),
            preview: payload_preview(&binary.payload),
        }),
        telecommands: received
            .telecommands
            .iter()
            .map(|result| TelecommandOutput::new(result, schema))
            .collect(),
    };

    match format {
        OutputFormat::Json => print_json(&out),
        OutputFormat::Table => {
            let mut table = new_table(vec!["FIELD", "VALUE"]);
            table.add_row(vec!["kind".to_string(), out.kind.clone()]);
            table.add_row(vec!["message".to_string(), out.message.clone()]);
            for field in &out.fields {
                table.add_row(vec![field.name.to_string(), field.value.to_string()]);
            }
            table.add_row(vec!["crc".to_string(), crc_text(&out.crc)]);
            if let Some(binary) = &out.binary {
                table.add_row(vec![
                    "binary".to_string(),
                    format!("{} bytes, crc {}", binary.length, crc_text(&binary.crc)),
                ]);
            }
            for command in &out.telecommands {
                table.add_row(vec![
                    format!("tc {}", command.label()),
                    command.detail(),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "{} seq={} {} crc={}",
                out.kind,
                out.sequence_id,
                out.message,
                crc_text(&out.crc)
            );
            if let Some(binary) = &out.binary {
                println!(
                    "  binary {} bytes crc={} {}",
                    binary.length,
                    crc_text(&binary.crc),
                    binary.preview
                );
            }
            for command in &out.telecommands {
                println!("  tc {}: {}", command.label(), command.detail());
            }
        }
    }
}

pub fn print_telecommands(commands: &[TelecommandOutput], format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&commands),
        OutputFormat::Table => {
            let mut table = new_table(vec!["COMMAND", "PARAMETERS"]);
            for command in commands {
                table.add_row(vec![command.label(), command.detail()]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for command in commands {
                println!("{}: {}", command.label(), command.detail());
            }
        }
    }
}

#[derive(Serialize)]
pub struct CrcReport {
    pub length: usize,
    pub crc: u16,
    pub hex: String,
}

pub fn print_crc(report: &CrcReport, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(report),
        OutputFormat::Table => {
            let mut table = new_table(vec!["BYTES", "CRC", "HEX"]);
            table.add_row(vec![
                report.length.to_string(),
                report.crc.to_string(),
                report.hex.clone(),
            ]);
            println!("{table}");
        }
        OutputFormat::Pretty => println!("{} ({})", report.crc, report.hex),
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

fn crc_text(crc: &CrcOutput) -> String {
    if crc.ok {
        format!("{} ok", crc.received)
    } else {
        format!("{} != {}", crc.received, crc.computed)
    }
}

fn describe(message: &Message) -> String {
    let ack = |ok: bool| if ok { "ack" } else { "nak" };
    match message {
        Message::InstrumentMode(mode) => format!("mode {mode}"),
        Message::SafetyAck(ok) => format!("safety {}", ack(*ok)),
        Message::ShutdownWarning => "shutdown warning".to_string(),
        Message::RachutsAck(ok) => format!("rachuts {}", ack(*ok)),
        Message::TelemetryAck(ok) => format!("telemetry {}", ack(*ok)),
        Message::Telecommand { length } => format!("telecommand, {length} bytes"),
        Message::Gps(report) => match &report.position {
            Some(position) => format!(
                "gps {} q={} lon={} lat={} alt={}",
                report.time,
                report.quality,
                position.longitude,
                position.latitude,
                position.altitude
            ),
            None => format!("gps {} q=0 (no fix)", report.time),
        },
        Message::InstrumentModeReport {
            software_date,
            software_version,
            protocol_version,
        } => format!(
            "mode report sw {software_version} ({software_date}) protocol {protocol_version}"
        ),
        Message::ModeAck(ok) => format!("mode {}", ack(*ok)),
        Message::Safety => "safety request".to_string(),
        Message::RachutsRequest => "rachuts request".to_string(),
        Message::Telemetry { status, length } => {
            let status: Vec<_> = status
                .iter()
                .map(|field| format!("{}={}", field.name, field.value))
                .collect();
            format!("telemetry, {length} bytes [{}]", status.join(" "))
        }
        Message::TelecommandAck(ok) => format!("telecommand {}", ack(*ok)),
    }
}

fn payload_preview(payload: &[u8]) -> String {
    match std::str::from_utf8(payload) {
        Ok(text) => text.to_string(),
        Err(_) => format!("<binary {} bytes>", payload.len()),
    }
}
