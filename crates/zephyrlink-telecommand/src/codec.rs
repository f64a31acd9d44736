use tracing::{debug, trace};

use crate::error::{DecodeError, Result};
use crate::schema::{ParamType, ParameterSchema};
use crate::value::{DecodedTelecommand, ParamValue};

const FIELD_SEPARATOR: u8 = b',';
const STATEMENT_TERMINATOR: u8 = b';';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Terminator {
    Field,
    Statement,
}

/// One scanned field: its text, where it starts, and what ended it.
#[derive(Debug)]
struct RawField<'a> {
    text: &'a str,
    start: usize,
    terminator: Terminator,
    next: usize,
}

/// Decode the statement at the start of `buffer`.
pub fn decode(buffer: &[u8], schema: &ParameterSchema) -> Result<DecodedTelecommand> {
    let mut pos = 0;
    decode_at(buffer, &mut pos, schema)
}

/// Decode the statement starting at `*pos`.
///
/// On success `*pos` is left just past the statement's `;`. On failure it is
/// left at the start of the offending field; callers resynchronise by
/// skipping to the next `;` (see [`Statements`]).
pub fn decode_at(
    buffer: &[u8],
    pos: &mut usize,
    schema: &ParameterSchema,
) -> Result<DecodedTelecommand> {
    let id_field = scan_field(buffer, *pos, ParamType::U8)?;
    let id: u8 = parse_int(id_field.text, id_field.start, ParamType::U8)?;

    let Some(spec) = schema.lookup(id) else {
        *pos = id_field.next;
        if id_field.terminator == Terminator::Field {
            debug!(id, "ignoring parameters of unscheduled telecommand");
            skip_statement(buffer, pos);
        }
        return Ok(DecodedTelecommand::bare(id));
    };

    let total = spec.param_count();
    match (id_field.terminator, total) {
        (Terminator::Statement, 0) => {
            *pos = id_field.next;
            return Ok(DecodedTelecommand::bare(id));
        }
        (Terminator::Field, 0) => {
            return Err(DecodeError::malformed(
                id_field.next - 1,
                "parameters given to a command that takes none",
            ));
        }
        (Terminator::Statement, _) => {
            return Err(DecodeError::malformed(
                id_field.next - 1,
                "statement ended before its parameters",
            ));
        }
        (Terminator::Field, _) => {}
    }

    let mut cursor = id_field.next;
    let mut params = Vec::with_capacity(total);
    for field in spec.fields {
        for _ in 0..field.count {
            let last = params.len() + 1 == total;
            let raw = scan_field(buffer, cursor, field.ty)?;
            match (raw.terminator, last) {
                (Terminator::Field, false) | (Terminator::Statement, true) => {}
                (Terminator::Field, true) => {
                    return Err(DecodeError::malformed(
                        raw.next - 1,
                        "expected ';' after the last parameter",
                    ));
                }
                (Terminator::Statement, false) => {
                    return Err(DecodeError::malformed(
                        raw.next - 1,
                        "statement ended before all parameters",
                    ));
                }
            }
            params.push(parse_value(raw.text, raw.start, field.ty)?);
            cursor = raw.next;
        }
    }

    trace!(id, command = spec.name, params = params.len(), "decoded telecommand");
    *pos = cursor;
    Ok(DecodedTelecommand::new(id, params))
}

/// Number of statements in a telecommand buffer (one per `;`).
pub fn count_statements(buffer: &[u8]) -> usize {
    buffer
        .iter()
        .filter(|byte| **byte == STATEMENT_TERMINATOR)
        .count()
}

/// Iterate over every statement in `buffer`.
pub fn statements<'a>(buffer: &'a [u8], schema: &'a ParameterSchema) -> Statements<'a> {
    Statements {
        buffer,
        pos: 0,
        remaining: count_statements(buffer),
        schema,
    }
}

/// Iterator over the statements of a telecommand buffer.
///
/// A statement that fails to decode yields its error and the iterator skips
/// past that statement's `;` before continuing with the next one.
#[derive(Debug, Clone)]
pub struct Statements<'a> {
    buffer: &'a [u8],
    pos: usize,
    remaining: usize,
    schema: &'a ParameterSchema,
}

impl Statements<'_> {
    /// Byte offset of the next statement.
    pub fn position(&self) -> usize {
        self.pos
    }
}

impl Iterator for Statements<'_> {
    type Item = Result<DecodedTelecommand>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 || self.pos >= self.buffer.len() {
            return None;
        }
        self.remaining -= 1;

        let result = decode_at(self.buffer, &mut self.pos, self.schema);
        if let Err(err) = &result {
            debug!(error = %err, "discarding errant telecommand");
            skip_statement(self.buffer, &mut self.pos);
        }
        Some(result)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.remaining))
    }
}

fn skip_statement(buffer: &[u8], pos: &mut usize) {
    let rest = buffer.get(*pos..).unwrap_or_default();
    match rest.iter().position(|byte| *byte == STATEMENT_TERMINATOR) {
        Some(offset) => *pos += offset + 1,
        None => *pos = buffer.len(),
    }
}

fn scan_field(buffer: &[u8], start: usize, ty: ParamType) -> Result<RawField<'_>> {
    let rest = buffer.get(start..).unwrap_or_default();
    let span = ty.max_chars().min(rest.len());
    let len = rest[..span]
        .iter()
        .position(|byte| matches!(*byte, FIELD_SEPARATOR | STATEMENT_TERMINATOR | 0))
        .unwrap_or(span);
    let end = start + len;

    let terminator = match rest.get(len) {
        Some(&FIELD_SEPARATOR) => Terminator::Field,
        Some(&STATEMENT_TERMINATOR) => Terminator::Statement,
        Some(&0) => return Err(DecodeError::malformed(end, "unexpected NUL byte")),
        Some(_) => return Err(DecodeError::malformed(end, "field wider than its type allows")),
        None => return Err(DecodeError::malformed(end, "missing delimiter")),
    };

    let text = std::str::from_utf8(&rest[..len])
        .map_err(|_| DecodeError::malformed(start, "field is not ASCII"))?;

    Ok(RawField {
        text,
        start,
        terminator,
        next: end + 1,
    })
}

fn parse_value(text: &str, offset: usize, ty: ParamType) -> Result<ParamValue> {
    let value = match ty {
        ParamType::U8 => ParamValue::U8(parse_int(text, offset, ty)?),
        ParamType::U16 => ParamValue::U16(parse_int(text, offset, ty)?),
        ParamType::U32 => ParamValue::U32(parse_int(text, offset, ty)?),
        ParamType::I8 => ParamValue::I8(parse_int(text, offset, ty)?),
        ParamType::I16 => ParamValue::I16(parse_int(text, offset, ty)?),
        ParamType::I32 => ParamValue::I32(parse_int(text, offset, ty)?),
        ParamType::F32 => ParamValue::F32(parse_float(text, offset)?),
    };
    Ok(value)
}

fn parse_int<T: TryFrom<i64>>(text: &str, offset: usize, ty: ParamType) -> Result<T> {
    let signed = matches!(ty, ParamType::I8 | ParamType::I16 | ParamType::I32);
    let digits = if signed {
        text.strip_prefix('-')
            .or_else(|| text.strip_prefix('+'))
            .unwrap_or(text)
    } else {
        text
    };
    if digits.is_empty() || !digits.bytes().all(|byte| byte.is_ascii_digit()) {
        return Err(DecodeError::malformed(offset, "not an integer"));
    }

    // every permitted span fits comfortably in an i64
    let wide: i64 = text
        .parse()
        .map_err(|_| DecodeError::malformed(offset, "not an integer"))?;
    T::try_from(wide).map_err(|_| DecodeError::OutOfRange {
        offset,
        ty,
        text: text.to_string(),
    })
}

fn parse_float(text: &str, offset: usize) -> Result<f32> {
    let numeric = !text.is_empty()
        && text
            .bytes()
            .all(|byte| byte.is_ascii_digit() || matches!(byte, b'.' | b'-' | b'+' | b'e' | b'E'));
    if !numeric {
        return Err(DecodeError::malformed(offset, "not a number"));
    }
    text.parse::<f32>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or_else(|| DecodeError::malformed(offset, "not a number"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{CommandSpec, FieldSpec, STRATEOLE_SCHEMA};

    const U8_1: &[FieldSpec] = &[FieldSpec::one(ParamType::U8)];
    const U16_1: &[FieldSpec] = &[FieldSpec::one(ParamType::U16)];
    const U32_1: &[FieldSpec] = &[FieldSpec::one(ParamType::U32)];
    const I8_1: &[FieldSpec] = &[FieldSpec::one(ParamType::I8)];
    const I16_1: &[FieldSpec] = &[FieldSpec::one(ParamType::I16)];
    const I32_1: &[FieldSpec] = &[FieldSpec::one(ParamType::I32)];
    const F32_1: &[FieldSpec] = &[FieldSpec::one(ParamType::F32)];
    const MIXED: &[FieldSpec] = &[
        FieldSpec::repeated(ParamType::I16, 2),
        FieldSpec::one(ParamType::F32),
    ];
    const NONE: &[FieldSpec] = &[];

    const TEST_COMMANDS: &[CommandSpec] = &[
        CommandSpec::new(1, "U8", U8_1),
        CommandSpec::new(2, "U16", U16_1),
        CommandSpec::new(3, "U32", U32_1),
        CommandSpec::new(4, "I8", I8_1),
        CommandSpec::new(5, "I16", I16_1),
        CommandSpec::new(6, "I32", I32_1),
        CommandSpec::new(7, "F32", F32_1),
        CommandSpec::new(8, "MIXED", MIXED),
        CommandSpec::new(9, "BARE", NONE),
    ];

    static TEST_SCHEMA: ParameterSchema = ParameterSchema::new(TEST_COMMANDS);

    fn decode_one(text: &str) -> Result<DecodedTelecommand> {
        decode(text.as_bytes(), &TEST_SCHEMA)
    }

    #[test]
    fn decodes_single_float() {
        let cmd = decode_one("7,3.5;").unwrap();
        assert_eq!(cmd, DecodedTelecommand::new(7, vec![ParamValue::F32(3.5)]));
    }

    #[test]
    fn missing_terminator_is_malformed() {
        let err = decode_one("7,3.5").unwrap_err();
        assert!(matches!(err, DecodeError::Malformed { .. }));
    }

    #[test]
    fn decoding_is_idempotent() {
        let buffer = b"8,-12,300,0.25;";
        let first = decode(buffer, &TEST_SCHEMA).unwrap();
        let second = decode(buffer, &TEST_SCHEMA).unwrap();
        assert_eq!(first, second);
        assert_eq!(
            first.params,
            vec![
                ParamValue::I16(-12),
                ParamValue::I16(300),
                ParamValue::F32(0.25)
            ]
        );
    }

    #[test]
    fn max_width_values_at_type_limits() {
        assert_eq!(decode_one("1,255;").unwrap().params, [ParamValue::U8(255)]);
        assert_eq!(
            decode_one("2,65535;").unwrap().params,
            [ParamValue::U16(65535)]
        );
        assert_eq!(
            decode_one("3,4294967295;").unwrap().params,
            [ParamValue::U32(u32::MAX)]
        );
        assert_eq!(decode_one("4,-128;").unwrap().params, [ParamValue::I8(-128)]);
        assert_eq!(
            decode_one("5,-32768;").unwrap().params,
            [ParamValue::I16(i16::MIN)]
        );
        assert_eq!(
            decode_one("6,-2147483648;").unwrap().params,
            [ParamValue::I32(i32::MIN)]
        );
    }

    #[test]
    fn one_past_type_limits_is_out_of_range() {
        for text in [
            "1,256;",
            "2,65536;",
            "3,4294967296;",
            "4,-129;",
            "4,128;",
            "5,32768;",
            "6,-2147483649;",
        ] {
            let err = decode_one(text).unwrap_err();
            assert!(
                matches!(err, DecodeError::OutOfRange { .. }),
                "{text}: {err:?}"
            );
        }
    }

    #[test]
    fn field_wider_than_type_is_malformed() {
        let err = decode_one("1,0255;").unwrap_err();
        assert!(matches!(err, DecodeError::Malformed { offset: 5, .. }));
    }

    #[test]
    fn non_numeric_is_malformed() {
        assert!(matches!(
            decode_one("7,abc;").unwrap_err(),
            DecodeError::Malformed { .. }
        ));
        assert!(matches!(
            decode_one("1,-1;").unwrap_err(),
            DecodeError::Malformed { .. }
        ));
        assert!(matches!(
            decode_one("1,;").unwrap_err(),
            DecodeError::Malformed { .. }
        ));
        assert!(matches!(
            decode_one("7,nan;").unwrap_err(),
            DecodeError::Malformed { .. }
        ));
    }

    #[test]
    fn delimiter_must_match_position() {
        // comma after the last parameter
        assert!(matches!(
            decode_one("1,5,;").unwrap_err(),
            DecodeError::Malformed { .. }
        ));
        // semicolon before the last parameter
        assert!(matches!(
            decode_one("8,1;2,3.0;").unwrap_err(),
            DecodeError::Malformed { .. }
        ));
        // parameters missing entirely
        assert!(matches!(
            decode_one("7;").unwrap_err(),
            DecodeError::Malformed { .. }
        ));
        // parameters on a command that takes none
        assert!(matches!(
            decode_one("9,1;").unwrap_err(),
            DecodeError::Malformed { .. }
        ));
    }

    #[test]
    fn unknown_id_carries_no_parameters() {
        let mut pos = 0;
        let buffer = b"99;";
        let cmd = decode_at(buffer, &mut pos, &TEST_SCHEMA).unwrap();
        assert_eq!(cmd, DecodedTelecommand::bare(99));
        assert_eq!(pos, buffer.len());
    }

    #[test]
    fn unknown_id_skips_its_trailing_text() {
        let buffer = b"99,1,2;7,2.0;";
        let decoded: Vec<_> = statements(buffer, &TEST_SCHEMA).collect();
        assert_eq!(
            decoded,
            vec![
                Ok(DecodedTelecommand::bare(99)),
                Ok(DecodedTelecommand::new(7, vec![ParamValue::F32(2.0)])),
            ]
        );
    }

    #[test]
    fn statements_recover_after_errant_command() {
        let buffer = b"7,1.5;1,999;9;2,17;";
        let decoded: Vec<_> = statements(buffer, &TEST_SCHEMA).collect();
        assert_eq!(decoded.len(), 4);
        assert_eq!(
            decoded[0],
            Ok(DecodedTelecommand::new(7, vec![ParamValue::F32(1.5)]))
        );
        assert!(decoded[1].is_err());
        assert_eq!(decoded[2], Ok(DecodedTelecommand::bare(9)));
        assert_eq!(
            decoded[3],
            Ok(DecodedTelecommand::new(2, vec![ParamValue::U16(17)]))
        );
    }

    #[test]
    fn statement_count_follows_terminators() {
        assert_eq!(count_statements(b"7,1.5;9;"), 2);
        assert_eq!(count_statements(b""), 0);
        assert_eq!(statements(b"", &TEST_SCHEMA).count(), 0);
    }

    #[test]
    fn strateole_bin_command_reads_all_edges() {
        let mut text = String::from("105,24");
        for edge in 0..24 {
            text.push_str(&format!(",{}", edge * 10));
        }
        text.push(';');

        let cmd = decode(text.as_bytes(), &STRATEOLE_SCHEMA).unwrap();
        assert_eq!(cmd.id, 105);
        assert_eq!(cmd.params.len(), 25);
        assert_eq!(cmd.param(0), Some(&ParamValue::U8(24)));
        assert_eq!(cmd.param(24), Some(&ParamValue::U8(230)));
    }

    #[test]
    fn strateole_bin_command_rejects_short_list() {
        let err = decode(b"105,2,10,20;", &STRATEOLE_SCHEMA).unwrap_err();
        assert!(matches!(err, DecodeError::Malformed { .. }));
    }
}
