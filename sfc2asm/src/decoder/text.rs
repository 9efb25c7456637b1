//! Text, index table and translation map decoding.
use std::collections::BTreeMap;

use log::warn;

use crate::cartridge::Cartridge;
use crate::decoder::data_directive;
use crate::decoder::val;
use crate::decoder::DecodeContext;
use crate::decoder::DecodeOutput;
use crate::decoder::Decoder;
use crate::decoder::DecoderKind;
use crate::disasm::Instruction;
use crate::error::DisasmError;

/// The assembler's string buffer misbehaves past 64 characters, so
/// `.STRINGMAP` lines are split below that.
const STRINGMAP_SEGMENT: usize = 64;

pub fn decode_text(
    decoder: &Decoder,
    cart: &Cartridge,
    ctx: &DecodeContext,
) -> Result<DecodeOutput, DisasmError> {
    let DecoderKind::Text { pack, .. } = &decoder.kind else {
        unreachable!()
    };
    let mut out = DecodeOutput::default();

    if let Some(pack) = pack {
        let mut pos = decoder.start;
        for (n, size) in pack.iter().enumerate() {
            let end = pos + size;
            let label = format!("{}_{}:", decoder.label, n);
            emit_chunk(&mut out, cart, pos, end, label, ctx);
            pos = end;
        }
    } else if let Some(info) = &ctx.index {
        let mut pos = decoder.start;
        let mut n = 0;
        for entry in (info.start..info.end).step_by(info.size as usize) {
            if entry == info.start {
                continue;
            }
            let offset = decoder.start + val(cart, entry, info.size);
            if offset >= decoder.end {
                warn!(
                    "text {}: skipping out of range index entry {n}",
                    decoder.label
                );
                continue;
            }
            let label = format!("{}_{}:", decoder.label, n);
            emit_chunk(&mut out, cart, pos, offset, label, ctx);
            pos = offset;
            n += 1;
        }
        if pos < decoder.end {
            let label = format!("{}_{}:", decoder.label, n);
            emit_chunk(&mut out, cart, pos, decoder.end, label, ctx);
        }
    } else {
        let label = format!("{}:", decoder.label);
        emit_chunk(&mut out, cart, decoder.start, decoder.end, label, ctx);
    }

    Ok(out)
}

/// Render one text chunk: a `.db` string line, or `.STRINGMAP` segments when
/// a translation table is attached.
fn emit_chunk(
    out: &mut DecodeOutput,
    cart: &Cartridge,
    start: u32,
    end: u32,
    label: String,
    ctx: &DecodeContext,
) {
    let bytes = cart.slice(start, end);
    match &ctx.translation {
        Some((table_label, table)) => {
            // Escaping and segment splitting happen per chunk; each source
            // byte yields one translated unit.
            let mut preamble = Some(label);
            let mut segment = String::new();
            let mut segment_pos = start;
            let mut consumed = 0u32;
            for &byte in bytes {
                let unit = match table.get(&byte) {
                    Some(text) => escape_str(text),
                    None => escape_byte(byte),
                };
                if !segment.is_empty() && segment.len() + unit.len() > STRINGMAP_SEGMENT {
                    out.instructions.push((
                        segment_pos,
                        stringmap_line(table_label, &segment, preamble.take()),
                    ));
                    segment = String::new();
                    segment_pos = start + consumed;
                }
                segment.push_str(&unit);
                consumed += 1;
            }
            out.instructions.push((
                segment_pos,
                stringmap_line(table_label, &segment, preamble.take()),
            ));
        }
        None => {
            let text: String = bytes.iter().map(|&b| escape_byte(b)).collect();
            let mut instruction = Instruction::new(format!(".db \"{text}\""));
            instruction.preamble = Some(label);
            out.instructions.push((start, instruction));
        }
    }
}

fn stringmap_line(table_label: &str, segment: &str, preamble: Option<String>) -> Instruction {
    let mut instruction = Instruction::new(format!(".STRINGMAP {table_label} \"{segment}\""));
    instruction.preamble = preamble;
    instruction
}

pub fn decode_index(
    decoder: &Decoder,
    cart: &Cartridge,
    ctx: &DecodeContext,
) -> Result<DecodeOutput, DisasmError> {
    let DecoderKind::Index { size, .. } = decoder.kind else {
        unreachable!()
    };
    let Some(parent) = &ctx.parent else {
        return Err(DisasmError::decoder(
            &decoder.label,
            "index has no text decoder attached",
        ));
    };
    let directive = data_directive(size);
    let mut out = DecodeOutput::default();
    let mut offsets = Vec::new();

    let mut n = 0;
    let mut previous: Option<u32> = None;
    for pos in (decoder.start..decoder.end).step_by(size as usize) {
        let offset = val(cart, pos, size);
        // A repeated offset is an empty entry and does not consume a label
        // number.
        if let Some(previous) = previous {
            if offset != previous {
                n += 1;
            }
        }
        if offset + parent.start > parent.end {
            let mut instruction = Instruction::new(format!("{directive} {offset}"));
            instruction.comment = Some("Invalid index".to_string());
            out.instructions.push((pos, instruction));
        } else {
            out.instructions.push((
                pos,
                Instruction::new(format!(
                    "{directive} {parent}_{n} - {parent}_0",
                    parent = parent.label
                )),
            ));
        }
        previous = Some(offset);
        offsets.push(offset);
    }

    out.offsets = Some(offsets);
    Ok(out)
}

/// Script for a `.tbl` file: one `NN=text` line per byte value, defaulting
/// to the latin-1 character.
pub fn translation_table_script(table: &BTreeMap<u8, String>) -> String {
    (0u16..=255)
        .map(|i| {
            let byte = i as u8;
            let text = match table.get(&byte) {
                Some(text) => escape_str(text),
                None => escape_str(&char::from(byte).to_string()),
            };
            format!("{byte:02x}={text}")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// One source byte as string content: the printable character or an escape.
pub(crate) fn escape_byte(byte: u8) -> String {
    match byte {
        b'\t' => "\\t".to_string(),
        b'\n' => "\\n".to_string(),
        b'\r' => "\\r".to_string(),
        0x0B => "\\x0b".to_string(),
        0x0C => "\\x0c".to_string(),
        0 => "\\0".to_string(),
        b'"' => "\\\"".to_string(),
        b'\\' => "\\\\".to_string(),
        0x20..=0x7E => (byte as char).to_string(),
        _ => format!("\\x{byte:02x}"),
    }
}

/// Escape table-provided text, leaving non-ascii characters intact.
pub(crate) fn escape_str(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '\t' => "\\t".to_string(),
            '\n' => "\\n".to_string(),
            '\r' => "\\r".to_string(),
            '\x0b' => "\\x0b".to_string(),
            '\x0c' => "\\x0c".to_string(),
            '\0' => "\\0".to_string(),
            '"' => "\\\"".to_string(),
            '\\' => "\\\\".to_string(),
            c => c.to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_escape_byte() {
        assert_eq!(escape_byte(b'A'), "A");
        assert_eq!(escape_byte(b'\n'), "\\n");
        assert_eq!(escape_byte(b'"'), "\\\"");
        assert_eq!(escape_byte(0x00), "\\0");
        assert_eq!(escape_byte(0x80), "\\x80");
    }

    #[test]
    fn test_translation_script_covers_all_bytes() {
        let mut table = BTreeMap::new();
        table.insert(0x41u8, "hero".to_string());
        let script = translation_table_script(&table);
        let lines: Vec<&str> = script.lines().collect();
        assert_eq!(lines.len(), 256);
        assert_eq!(lines[0x41], "41=hero");
        assert_eq!(lines[0x42], "42=B");
    }
}
