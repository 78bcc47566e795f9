//! Turns vector file lines into `TestCase` / `ExpectedOutcome` records.
//!
//! Input block:
//!
//! ```text
//! <name> [description]
//! AF BC DE HL AF' BC' DE' HL' IX IY SP PC
//! I R IFF1 IFF2 IM halted tstates
//! <addr> <byte>... -1
//! -1
//! ```
//!
//! Expected block: name line, indented bus trace lines (ignored), the
//! register and special lines, then patch lines up to the end of the block.

use crate::error::{GenError, Result};
use crate::record::{ExpectedOutcome, MemoryPatch, Registers, SpecialRegisters, TestCase};
use crate::vectors::{first_token, VectorCursor};

const TERMINATOR: &str = "-1";

type FieldResult<T> = std::result::Result<T, String>;

fn malformed(test: &str, cursor: &VectorCursor<'_>, line: &str, reason: String) -> GenError {
    GenError::MalformedVector {
        test: test.to_string(),
        line_no: cursor.line_number(),
        line: line.to_string(),
        reason,
    }
}

/// `from_str_radix` and `parse` take a leading `+`; vector fields are bare
/// digits.
fn unsigned(tok: &str) -> Option<&str> {
    (!tok.starts_with('+')).then_some(tok)
}

fn hex_u8(tok: &str) -> FieldResult<u8> {
    unsigned(tok)
        .and_then(|t| u8::from_str_radix(t, 16).ok())
        .ok_or_else(|| format!("`{tok}` is not a hex byte"))
}

fn hex_u16(tok: &str) -> FieldResult<u16> {
    unsigned(tok)
        .and_then(|t| u16::from_str_radix(t, 16).ok())
        .ok_or_else(|| format!("`{tok}` is not a hex word"))
}

fn hex_flag(tok: &str) -> FieldResult<bool> {
    hex_u8(tok).map(|v| v != 0)
}

pub fn parse_registers(line: &str) -> FieldResult<Registers> {
    let toks: Vec<&str> = line.split_whitespace().collect();
    if toks.len() != 12 {
        return Err(format!("expected 12 register values, found {}", toks.len()));
    }
    let mut values = [0u16; 12];
    for (slot, tok) in values.iter_mut().zip(toks) {
        *slot = hex_u16(tok)?;
    }
    Ok(Registers::new(values))
}

/// `I R IFF1 IFF2 IM halted tstates`; `tstates` is decimal.
pub fn parse_special(line: &str) -> FieldResult<SpecialRegisters> {
    let toks: Vec<&str> = line.split_whitespace().collect();
    if toks.len() < 7 {
        return Err(format!(
            "expected `I R IFF1 IFF2 IM halted tstates`, found {} fields",
            toks.len()
        ));
    }
    Ok(SpecialRegisters {
        i: hex_u8(toks[0])?,
        r: hex_u8(toks[1])?,
        iff1: hex_flag(toks[2])?,
        iff2: hex_flag(toks[3])?,
        im: hex_u8(toks[4])?,
        halted: hex_flag(toks[5])?,
        tstates: unsigned(toks[6])
            .and_then(|t| t.parse().ok())
            .ok_or_else(|| format!("`{}` is not a t-state count", toks[6]))?,
    })
}

/// `<addr> <byte>... -1`
pub fn parse_patch(line: &str) -> FieldResult<MemoryPatch> {
    let mut toks = line.split_whitespace();
    let start = hex_u16(toks.next().ok_or("empty memory line")?)?;
    let mut bytes = Vec::new();
    loop {
        match toks.next() {
            Some(TERMINATOR) => break,
            Some(tok) => bytes.push(hex_u8(tok)?),
            None => return Err("memory line is missing its `-1` terminator".into()),
        }
    }
    if let Some(extra) = toks.next() {
        return Err(format!("unexpected `{extra}` after `-1`"));
    }
    if usize::from(start) + bytes.len() > 0x10000 {
        return Err(format!(
            "{} bytes at {start:04x} run past the end of memory",
            bytes.len()
        ));
    }
    Ok(MemoryPatch { start, bytes })
}

fn field<'a, T>(
    cursor: &mut VectorCursor<'a>,
    test: &str,
    parse: impl FnOnce(&str) -> FieldResult<T>,
) -> Result<T> {
    let line = cursor.take_line()?;
    parse(line).map_err(|reason| malformed(test, cursor, line, reason))
}

pub fn parse_test_case(cursor: &mut VectorCursor<'_>) -> Result<TestCase> {
    let description = cursor.take_line()?;
    let name = first_token(description).unwrap_or(description).to_string();
    let registers = field(cursor, &name, parse_registers)?;
    let special = field(cursor, &name, parse_special)?;

    let mut memory = Vec::new();
    loop {
        let line = cursor.take_line()?;
        if first_token(line) == Some(TERMINATOR) {
            break;
        }
        let patch = parse_patch(line).map_err(|reason| malformed(&name, cursor, line, reason))?;
        memory.push(patch);
    }

    Ok(TestCase {
        name,
        description: description.trim_end().to_string(),
        registers,
        special,
        memory,
    })
}

pub fn parse_expected_outcome(cursor: &mut VectorCursor<'_>) -> Result<ExpectedOutcome> {
    let head = cursor.take_line()?;
    let name = first_token(head).unwrap_or(head).to_string();

    // bus activity trace, indented
    let reg_line = loop {
        let line = cursor.take_line()?;
        if !line.starts_with(char::is_whitespace) {
            break line;
        }
    };
    let registers =
        parse_registers(reg_line).map_err(|reason| malformed(&name, cursor, reg_line, reason))?;
    let special_text = cursor.take_line()?;
    let special = parse_special(special_text)
        .map_err(|reason| malformed(&name, cursor, special_text, reason))?;
    let special_line = cursor.line_number();

    let mut memory = Vec::new();
    while let Some(line) = cursor.take_block_line() {
        match first_token(line) {
            None | Some(TERMINATOR) => break,
            Some(_) => {
                let patch =
                    parse_patch(line).map_err(|reason| malformed(&name, cursor, line, reason))?;
                memory.push(patch);
            }
        }
    }

    Ok(ExpectedOutcome {
        name,
        registers,
        special,
        special_line,
        special_text: special_text.trim_end().to_string(),
        memory,
    })
}

/// Both streams must be at the same test.
pub fn check_names(case: &TestCase, expected: &ExpectedOutcome) -> Result<()> {
    if case.name != expected.name {
        return Err(GenError::NameMismatch {
            input: case.name.clone(),
            expected: expected.name.clone(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Stream;
    use crate::record::RegPair;

    const IN_BLOCK: &str = "\
36 ld (hl),n
0000 0000 0000 1234 0000 0000 0000 0000 0000 0000 0000 0000
00 00 0 0 0 0 10
0000 36 a5 -1
-1
";

    const EXPECTED_BLOCK: &str = "\
36
    0 MC 0000
    4 MR 0000 36
    7 MC 1234
   10 MW 1234 a5
0002 0000 0000 1234 0000 0000 0000 0000 0000 0000 0000 0002
00 01 0 0 0 0 10
1234 a5 -1

";

    #[test]
    fn test_parse_input_block() {
        let mut cur = VectorCursor::new(IN_BLOCK, Stream::Input);
        let case = parse_test_case(&mut cur).unwrap();
        assert_eq!(case.name, "36");
        assert_eq!(case.description, "36 ld (hl),n");
        assert_eq!(case.registers.get(RegPair::HL), Some(0x1234));
        assert_eq!(case.special.tstates, 10);
        assert_eq!(
            case.memory,
            vec![MemoryPatch {
                start: 0,
                bytes: vec![0x36, 0xa5]
            }]
        );
        assert!(!cur.has_more());
    }

    #[test]
    fn test_parse_expected_block_skips_trace() {
        let mut cur = VectorCursor::new(EXPECTED_BLOCK, Stream::Expected);
        let out = parse_expected_outcome(&mut cur).unwrap();
        assert_eq!(out.name, "36");
        assert_eq!(out.registers.get(RegPair::AF), Some(0x0002));
        assert_eq!(out.registers.get(RegPair::PC), Some(0x0002));
        assert_eq!(out.special.r, 0x01);
        assert_eq!(out.special.tstates, 10);
        assert_eq!(
            out.memory,
            vec![MemoryPatch {
                start: 0x1234,
                bytes: vec![0xa5]
            }]
        );
    }

    #[test]
    fn test_expected_block_without_memory() {
        let text = "\
00
    0 MC 0000
0000 0000 0000 0000 0000 0000 0000 0000 0000 0000 0000 0001
00 01 0 0 0 0 4

01
";
        let mut cur = VectorCursor::new(text, Stream::Expected);
        let out = parse_expected_outcome(&mut cur).unwrap();
        assert!(out.memory.is_empty());
        assert_eq!(cur.peek_line(), Some("01"));
    }

    #[test]
    fn test_expected_memory_ended_by_terminator_line() {
        let text = "\
36
    0 MC 0000
0002 0000 0000 1234 0000 0000 0000 0000 0000 0000 0000 0002
00 01 0 0 0 0 10
1234 a5 -1
-1

37
";
        let mut cur = VectorCursor::new(text, Stream::Expected);
        let out = parse_expected_outcome(&mut cur).unwrap();
        assert_eq!(
            out.memory,
            vec![MemoryPatch {
                start: 0x1234,
                bytes: vec![0xa5]
            }]
        );
        assert_eq!(cur.peek_line(), Some("37"));
    }

    #[test]
    fn test_special_line_is_kept_for_diagnostics() {
        let mut cur = VectorCursor::new(EXPECTED_BLOCK, Stream::Expected);
        let out = parse_expected_outcome(&mut cur).unwrap();
        assert_eq!(out.special_line, 7);
        assert_eq!(out.special_text, "00 01 0 0 0 0 10");
    }

    #[test]
    fn test_signed_fields_are_rejected() {
        assert!(parse_special("00 00 0 0 0 0 +4").is_err());
        assert!(parse_special("+0 00 0 0 0 0 4").is_err());
        let regs = "+000 0000 0000 0000 0000 0000 0000 0000 0000 0000 0000 0000";
        assert!(parse_registers(regs).is_err());
        assert!(parse_patch("0000 +1 -1").is_err());
    }

    #[test]
    fn test_extra_whitespace_is_tolerated() {
        let regs =
            parse_registers("  0001  0002 0003 0004 0005 0006 0007 0008 0009 000a 000b   000c ")
                .unwrap();
        assert_eq!(regs.get(RegPair::PC), Some(0x000c));
        let special = parse_special("ff  7f 1 1 2 1   23").unwrap();
        assert!(special.iff1 && special.iff2 && special.halted);
        assert_eq!(special.im, 2);
        assert_eq!(special.tstates, 23);
    }

    #[test]
    fn test_bad_hex_is_malformed() {
        let text = IN_BLOCK.replace("1234", "12g4");
        let mut cur = VectorCursor::new(&text, Stream::Input);
        match parse_test_case(&mut cur) {
            Err(GenError::MalformedVector { test, line_no, line, .. }) => {
                assert_eq!(test, "36");
                assert_eq!(line_no, 2);
                assert!(line.contains("12g4"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_patch_needs_terminator() {
        assert!(parse_patch("0000 36 a5").is_err());
        assert!(parse_patch("0000 36 -1 a5").is_err());
        assert!(parse_patch("ffff 01 02 -1").is_err());
        assert_eq!(parse_patch("ffff 01 -1").unwrap().bytes, vec![0x01]);
        assert!(parse_patch("0010 -1").unwrap().bytes.is_empty());
    }

    #[test]
    fn test_short_register_line() {
        assert!(parse_registers("0000 0000").is_err());
    }

    #[test]
    fn test_truncated_input_is_end_of_stream() {
        let mut cur = VectorCursor::new(
            "00\n0000 0000 0000 0000 0000 0000 0000 0000 0000 0000 0000 0000\n",
            Stream::Input,
        );
        assert!(matches!(
            parse_test_case(&mut cur),
            Err(GenError::EndOfStream { stream: Stream::Input, .. })
        ));
    }

    #[test]
    fn test_name_check() {
        let mut cur = VectorCursor::new(IN_BLOCK, Stream::Input);
        let case = parse_test_case(&mut cur).unwrap();
        let mut cur = VectorCursor::new(EXPECTED_BLOCK, Stream::Expected);
        let mut out = parse_expected_outcome(&mut cur).unwrap();
        assert!(check_names(&case, &out).is_ok());
        out.name = "37".into();
        assert!(matches!(
            check_names(&case, &out),
            Err(GenError::NameMismatch { .. })
        ));
    }
}
