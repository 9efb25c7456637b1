//! The 65C816 linear sweep and per-bank assembly rendering.
pub mod opcode_table;

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::collections::HashSet;
use std::fmt::Display;
use std::fmt::Formatter;

use itertools::Itertools;
use log::info;
use log::warn;

use crate::cartridge::Cartridge;
use crate::common::uint::U16Ext;
use crate::common::uint::U32Ext;
use crate::decoder::db_row;
use crate::decoder::Decoder;
use crate::decoder::DecoderId;
use crate::decoder::DecoderRegistry;
use crate::disasm::opcode_table::AddressMode;
use crate::disasm::opcode_table::INSTRUCTION_SIZES;
use crate::disasm::opcode_table::M_VARIABLE_OPCODES;
use crate::disasm::opcode_table::OPCODE_TABLE;
use crate::disasm::opcode_table::STATIC_ADDRESSES;
use crate::disasm::opcode_table::X_VARIABLE_OPCODES;
use crate::error::DisasmError;

/// One emitted line of assembly: the instruction itself, an optional
/// preamble (label or directive on its own line) and a trailing comment.
/// `returns` makes the renderer leave a blank line afterwards.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Instruction {
    pub code: String,
    pub preamble: Option<String>,
    pub comment: Option<String>,
    pub returns: bool,
}

impl Instruction {
    pub fn new(code: impl Into<String>) -> Instruction {
        Instruction {
            code: code.into(),
            ..Default::default()
        }
    }
}

impl Display for Instruction {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if let Some(preamble) = &self.preamble {
            writeln!(f, "{preamble}")?;
        }
        write!(f, "\t{}", self.code)?;
        if let Some(comment) = &self.comment {
            write!(f, "\t\t; {comment}")?;
        }
        Ok(())
    }
}

/// Ordered mapping from rom offset to instruction with half-open range
/// iteration.
#[derive(Default)]
pub struct CodeStream(BTreeMap<u32, Instruction>);

impl CodeStream {
    pub fn insert(&mut self, offset: u32, instruction: Instruction) {
        self.0.insert(offset, instruction);
    }

    pub fn get(&self, offset: u32) -> Option<&Instruction> {
        self.0.get(&offset)
    }

    pub fn contains(&self, offset: u32) -> bool {
        self.0.contains_key(&offset)
    }

    pub fn range(&self, start: u32, end: u32) -> impl Iterator<Item = (u32, &Instruction)> {
        self.0.range(start..end).map(|(offset, i)| (*offset, i))
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, &Instruction)> {
        self.0.iter().map(|(offset, i)| (*offset, i))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// The M and X width bits. They are per-section state: every label boundary
/// resets to 8-bit registers.
#[derive(Clone, Copy, Debug)]
struct WidthFlags(u8);

impl WidthFlags {
    fn new() -> WidthFlags {
        WidthFlags(0x30)
    }

    fn acc16(self) -> bool {
        self.0 & 0x20 == 0
    }

    fn idx16(self) -> bool {
        self.0 & 0x10 == 0
    }

    fn rep(&mut self, value: u8) {
        self.0 &= !value;
    }

    fn sep(&mut self, value: u8) {
        self.0 |= value;
    }
}

fn op_size(op: u8, flags: WidthFlags) -> u32 {
    let mut size = INSTRUCTION_SIZES[op as usize] as u32;
    if flags.acc16() && M_VARIABLE_OPCODES.contains(&op) {
        size += 1;
    } else if flags.idx16() && X_VARIABLE_OPCODES.contains(&op) {
        size += 1;
    }
    size
}

pub struct Disassembler<'a> {
    cart: &'a Cartridge,
    pos: u32,
    flags: WidthFlags,
    code: CodeStream,
    labels: BTreeMap<u32, String>,
    data_labels: BTreeMap<u32, String>,
    label_bank_aliases: BTreeMap<u32, BTreeSet<u8>>,
    valid_code: HashSet<u32>,
    memory: BTreeMap<u32, String>,
    decoders: DecoderRegistry,
    pub code_banks: Vec<u32>,
    pub hex_comment: bool,
}

impl<'a> Disassembler<'a> {
    pub fn new(cart: &'a Cartridge) -> Disassembler<'a> {
        let mut disasm = Disassembler {
            cart,
            pos: 0,
            flags: WidthFlags::new(),
            code: CodeStream::default(),
            labels: BTreeMap::new(),
            data_labels: BTreeMap::new(),
            label_bank_aliases: BTreeMap::new(),
            valid_code: HashSet::new(),
            memory: BTreeMap::new(),
            decoders: DecoderRegistry::default(),
            code_banks: Vec::new(),
            hex_comment: false,
        };
        disasm
            .add_decoder(Decoder::headers(
                cart.header_offset,
                cart.header_offset + 80,
            ))
            .expect("internal header decoder must register");
        disasm
    }

    pub fn add_decoder(&mut self, decoder: Decoder) -> Result<DecoderId, DisasmError> {
        self.decoders.add(decoder, self.cart.bank_size())
    }

    /// The name bound to a code label, synthesizing `L<address>` on first
    /// use. Passing a name rebinds the label.
    pub fn label_name(&mut self, offset: u32, name: Option<&str>) -> String {
        if let Some(name) = name {
            self.labels.insert(offset, name.to_string());
            return name.to_string();
        }
        if let Some(existing) = self.labels.get(&offset) {
            return existing.clone();
        }
        let name = format!("L{:06X}", self.cart.address(offset));
        self.labels.insert(offset, name.clone());
        name
    }

    /// Bind a memory variable, emitted as a `.define`. Addresses between the
    /// hardware registers and WRAM are rejected.
    pub fn set_memory(&mut self, address: u32, name: &str) -> Result<(), DisasmError> {
        if (0x2000..0x7E0000).contains(&address) {
            return Err(DisasmError::decoder(
                name,
                format!("${address:06X} is not a ram address"),
            ));
        }
        self.memory.insert(address, name.to_string());
        Ok(())
    }

    pub fn run(&mut self) -> Result<(), DisasmError> {
        info!("Disassembling...");
        self.run_decoders()?;
        self.mark_vectors();
        self.mark_labels();
        if self.code_banks.is_empty() {
            self.auto_run();
        } else {
            for bank in self.code_banks.clone() {
                if bank < self.cart.bank_count() {
                    self.decode_bank(bank);
                } else {
                    warn!("Invalid bank {bank}");
                }
            }
        }
        self.fill_data_banks();
        Ok(())
    }

    /// Run every decoder and merge its instructions into the code stream,
    /// harvesting `name:` preambles as data labels.
    fn run_decoders(&mut self) -> Result<(), DisasmError> {
        let instructions = self.decoders.run(self.cart)?;
        for (pos, instruction) in instructions {
            if let Some(preamble) = &instruction.preamble {
                if let Some(name) = preamble.strip_suffix(':') {
                    if !name.contains('\n') {
                        self.data_labels.insert(pos, name.to_string());
                    }
                }
            }
            self.code.insert(pos, instruction);
        }
        Ok(())
    }

    /// Every populated interrupt vector is a code label.
    fn mark_vectors(&mut self) {
        for vector in self.cart.vectors.code_vectors() {
            if vector >= 0x8000 {
                if let Ok(offset) = self.cart.index(vector as u32) {
                    self.label_name(offset, None);
                }
            }
        }
    }

    /// Pre-scan each code bank, confirming instruction boundaries between
    /// labels so branch targets can be validated during the sweep.
    fn mark_labels(&mut self) {
        let bank_count = self.cart.bank_count();
        let banks: Vec<u32> = if self.code_banks.is_empty() {
            (0..bank_count).collect()
        } else {
            self.code_banks
                .iter()
                .copied()
                .filter(|b| *b < bank_count)
                .collect()
        };
        for bank in banks {
            let bank_start = bank * self.cart.bank_size();
            let bank_end = bank_start + self.cart.bank_size();
            let mut sections = vec![bank_start];
            sections.extend(
                self.labels
                    .range(bank_start..bank_end)
                    .map(|(offset, _)| *offset)
                    .filter(|offset| *offset != bank_start),
            );
            sections.push(bank_end);
            for pair in sections.windows(2) {
                self.scan_section(pair[0], pair[1]);
            }
        }
    }

    fn scan_section(&mut self, start: u32, end: u32) {
        let mut flags = WidthFlags::new();
        let mut pos = start;
        while pos < end {
            let op = self.cart[pos];
            let size = op_size(op, flags);
            if let Some(&id) = self.decoders.tree().intersects(pos, pos + size) {
                pos = self.decoders.get(id).end;
                continue;
            }
            self.valid_code.insert(pos);
            if pos + size > self.cart.size() as u32 {
                break;
            }
            if op == 0xC2 {
                flags.rep(self.cart[pos + 1]);
            } else if op == 0xE2 {
                flags.sep(self.cart[pos + 1]);
            }
            pos += size;
        }
    }

    fn auto_run(&mut self) {
        self.decode(0, self.cart.size() as u32);
    }

    pub fn decode_bank(&mut self, bank: u32) {
        info!("Bank {bank}");
        let start = bank * self.cart.bank_size();
        self.decode(start, start + self.cart.bank_size());
    }

    /// The main sweep: walk instructions, skipping decoder-owned ranges and
    /// demoting anything that would cross a region or bank boundary.
    fn decode(&mut self, start: u32, end: u32) {
        self.pos = start;
        self.flags = WidthFlags::new();
        while self.pos < end {
            let op = self.cart[self.pos];
            let size = op_size(op, self.flags);

            if let Some(&id) = self.decoders.tree().intersects(self.pos, self.pos + size) {
                let (decoder_start, decoder_end) = {
                    let decoder = self.decoders.get(id);
                    (decoder.start, decoder.end)
                };
                if self.pos < decoder_start {
                    let mut instruction =
                        Instruction::new(db_row(self.cart.slice(self.pos, decoder_start)));
                    instruction.comment = Some("Opcode overrunning decoder".to_string());
                    self.code.insert(self.pos, instruction);
                }
                self.pos = decoder_end;
                continue;
            }

            if (self.cart.address(self.pos) & 0xFFFF) + size > 0xFFFF || self.pos + size > end {
                let mut instruction = Instruction::new(format!(".db ${op:02X}"));
                instruction.comment = Some(format!(
                    "Opcode {op:02X} overrunning bank boundary at {:06X}. Skipping.",
                    self.pos
                ));
                self.code.insert(self.pos, instruction);
                self.pos += 1;
                continue;
            }

            let mut instruction = self.decode_op(op);
            if self.hex_comment && instruction.comment.is_none() {
                instruction.comment = Some(
                    self.cart
                        .slice(self.pos, self.pos + size)
                        .iter()
                        .map(|b| format!("{b:02X}"))
                        .join(" "),
                );
            }
            self.code.insert(self.pos, instruction);
            self.pos += size;
        }
    }

    /// Banks outside the code bank list render as raw data rows, leaving
    /// decoder-owned ranges alone.
    fn fill_data_banks(&mut self) {
        if self.code_banks.is_empty() {
            return;
        }
        for bank in 0..self.cart.bank_count() {
            if !self.code_banks.contains(&bank) {
                self.make_data_bank(bank);
            }
        }
    }

    fn make_data_bank(&mut self, bank: u32) {
        let start = bank * self.cart.bank_size();
        let end = start + self.cart.bank_size();
        let mut pos = start;
        while pos < end {
            if let Some(&id) = self.decoders.tree().find(pos) {
                pos = self.decoders.get(id).end;
                continue;
            }
            let mut row_end = (pos + 16).min(end);
            if let Some(&id) = self.decoders.tree().intersects(pos, row_end) {
                row_end = self.decoders.get(id).start;
            }
            self.code
                .insert(pos, Instruction::new(db_row(self.cart.slice(pos, row_end))));
            pos = row_end;
        }
    }

    fn pipe8(&self) -> u8 {
        self.cart[self.pos + 1]
    }

    fn pipe16(&self) -> u16 {
        self.cart[self.pos + 1] as u16 | (self.cart[self.pos + 2] as u16) << 8
    }

    fn pipe24(&self) -> u32 {
        self.cart[self.pos + 1] as u32
            | (self.cart[self.pos + 2] as u32) << 8
            | (self.cart[self.pos + 3] as u32) << 16
    }

    fn decode_op(&mut self, op: u8) -> Instruction {
        let def = &OPCODE_TABLE[op as usize];
        let mnemonic = def.mnemonic;
        let mut instruction = match def.mode {
            AddressMode::Implied => Instruction::new(mnemonic),
            AddressMode::Accumulator => Instruction::new(format!("{mnemonic} A")),
            AddressMode::ImmediateM => {
                if self.flags.acc16() {
                    Instruction::new(format!("{mnemonic} #${:04X}.w", self.pipe16()))
                } else {
                    Instruction::new(format!("{mnemonic} #${:02X}.b", self.pipe8()))
                }
            }
            AddressMode::ImmediateX => {
                if self.flags.idx16() {
                    Instruction::new(format!("{mnemonic} #${:04X}.w", self.pipe16()))
                } else {
                    Instruction::new(format!("{mnemonic} #${:02X}.b", self.pipe8()))
                }
            }
            AddressMode::ImmediateU8 => {
                Instruction::new(format!("{mnemonic} ${:02X}.b", self.pipe8()))
            }
            AddressMode::Absolute => self.absolute_operand(mnemonic),
            AddressMode::AbsoluteX => {
                Instruction::new(format!("{mnemonic} ${:04X}.w,X", self.pipe16()))
            }
            AddressMode::AbsoluteY => {
                Instruction::new(format!("{mnemonic} ${:04X}.w,Y", self.pipe16()))
            }
            AddressMode::AbsoluteLong => {
                if let Some(name) = self.memory.get(&self.pipe24()) {
                    Instruction::new(format!("{mnemonic} {name}.l"))
                } else {
                    Instruction::new(format!("{mnemonic} ${:06X}.l", self.pipe24()))
                }
            }
            AddressMode::AbsoluteLongX => {
                Instruction::new(format!("{mnemonic} ${:06X}.l,X", self.pipe24()))
            }
            AddressMode::AbsoluteIndirect => {
                Instruction::new(format!("{mnemonic} (${:04X}.w)", self.pipe16()))
            }
            AddressMode::AbsoluteIndexedIndirect => {
                Instruction::new(format!("{mnemonic} (${:04X}.w,X)", self.pipe16()))
            }
            AddressMode::AbsoluteIndirectLong => {
                Instruction::new(format!("{mnemonic} [${:04X}.w]", self.pipe16()))
            }
            AddressMode::DirectPage => {
                Instruction::new(format!("{mnemonic} ${:02X}.b", self.pipe8()))
            }
            AddressMode::DirectPageX => {
                Instruction::new(format!("{mnemonic} ${:02X}.b,X", self.pipe8()))
            }
            AddressMode::DirectPageY => {
                Instruction::new(format!("{mnemonic} ${:02X}.b,Y", self.pipe8()))
            }
            AddressMode::DirectPageIndirect => {
                Instruction::new(format!("{mnemonic} (${:02X}.b)", self.pipe8()))
            }
            AddressMode::DirectPageIndirectLong => {
                Instruction::new(format!("{mnemonic} [${:02X}.b]", self.pipe8()))
            }
            AddressMode::DirectPageXIndirect => {
                Instruction::new(format!("{mnemonic} (${:02X}.b,X)", self.pipe8()))
            }
            AddressMode::DirectPageIndirectY => {
                Instruction::new(format!("{mnemonic} (${:02X}.b),Y", self.pipe8()))
            }
            AddressMode::DirectPageIndirectLongY => {
                Instruction::new(format!("{mnemonic} [${:02X}.b],Y", self.pipe8()))
            }
            AddressMode::StackRelative => {
                Instruction::new(format!("{mnemonic} ${:02X}.b,S", self.pipe8()))
            }
            AddressMode::StackRelativeY => {
                Instruction::new(format!("{mnemonic} (${:02X}.b,S),Y", self.pipe8()))
            }
            AddressMode::BlockMove => Instruction::new(format!(
                "{mnemonic} ${:02X},${:02X}",
                self.cart[self.pos + 2],
                self.cart[self.pos + 1]
            )),
            AddressMode::Relative => self.branch(mnemonic),
            AddressMode::RelativeLong => self.pc_rel_long(mnemonic),
            AddressMode::JumpAbsolute | AddressMode::JumpSubAbsolute => {
                self.jump_absolute(mnemonic)
            }
            AddressMode::JumpLong | AddressMode::JumpSubLong => self.jump_long(mnemonic),
            AddressMode::Rep => self.rep(),
            AddressMode::Sep => self.sep(),
            AddressMode::Wdm => {
                let value = self.pipe8();
                let mut instruction = Instruction::new(format!(".db $42, ${value:02X}"));
                instruction.comment = Some(format!("opcode wdm ${value:02X}"));
                instruction
            }
        };
        instruction.returns = def.returns;
        instruction
    }

    /// Absolute operands substitute a configured memory variable or a
    /// hardware register name.
    fn absolute_operand(&self, mnemonic: &str) -> Instruction {
        let address = self.pipe16();
        if let Some(name) = self.memory.get(&(address as u32)) {
            return Instruction::new(format!("{mnemonic} {name}.w"));
        }
        if let Some((name, description)) = STATIC_ADDRESSES.get(&address) {
            let mut instruction = Instruction::new(format!("{mnemonic} {name}.w"));
            instruction.comment = Some((*description).to_string());
            return instruction;
        }
        Instruction::new(format!("{mnemonic} ${address:04X}.w"))
    }

    fn branch(&mut self, mnemonic: &str) -> Instruction {
        let rel = self.pipe8() as i8 as i64;
        let target =
            ((self.pos & 0xFF0000) as i64 + ((self.pos as i64 + rel + 2) & 0xFFFF)) as u32;

        if !self.cart.hirom && ((self.pos as i64 & 0x7FFF) + rel + 2) & 0x8000 != 0 {
            let mut instruction = Instruction::new(format!(
                ".db ${:02X}, ${:02X}",
                self.cart[self.pos],
                self.pipe8()
            ));
            instruction.comment = Some(format!(
                "Invalid bank wrapping branch target ({mnemonic} L{:06X})",
                self.cart.address(target)
            ));
            return instruction;
        }

        if self.valid_code.contains(&target) {
            let name = self.label_name(target, None);
            Instruction::new(format!("{mnemonic} {name}"))
        } else {
            let mut instruction = Instruction::new(format!(
                ".db ${:02X}, ${:02X}",
                self.cart[self.pos],
                self.pipe8()
            ));
            instruction.comment = Some(format!(
                "Invalid branch target ({mnemonic} L{:06X})",
                self.cart.address(target)
            ));
            instruction
        }
    }

    fn pc_rel_long(&mut self, mnemonic: &str) -> Instruction {
        let rel = self.pipe16() as i16 as i64;

        if !self.cart.hirom && ((self.pos as i64 & 0x7FFF) + rel + 3) & 0x8000 != 0 {
            let mut instruction =
                Instruction::new(format!("{mnemonic} ${:04X}", (rel & 0xFFFF) as u16));
            instruction.comment = Some("Invalid branch target".to_string());
            return instruction;
        }

        let target =
            ((self.pos & 0xFF0000) as i64 + ((self.pos as i64 + rel + 3) & 0xFFFF)) as u32;
        if self.valid_code.contains(&target) {
            let name = self.label_name(target, None);
            Instruction::new(format!("{mnemonic} {name}"))
        } else {
            Instruction::new(format!("{mnemonic} ${:04X}", (rel & 0xFFFF) as u16))
        }
    }

    /// Bank-local jumps resolve against valid code in the current bank.
    fn jump_absolute(&mut self, mnemonic: &str) -> Instruction {
        let pipe = self.pipe16() as u32;
        let target = if self.cart.hirom {
            (self.pos & 0xFF0000) | pipe
        } else {
            if pipe < 0x8000 {
                return Instruction::new(format!("{mnemonic} ${pipe:04X}"));
            }
            (self.pos & 0xFF8000) + (pipe - 0x8000)
        };
        if self.valid_code.contains(&target) {
            let name = self.label_name(target, None);
            Instruction::new(format!("{mnemonic} {name}"))
        } else {
            Instruction::new(format!("{mnemonic} ${pipe:04X}"))
        }
    }

    /// 24-bit jumps may arrive through a mirror bank; those record an alias
    /// so the rendering can emit a `.BASE`-wrapped label for the mirror.
    fn jump_long(&mut self, mnemonic: &str) -> Instruction {
        let pipe = self.pipe24();
        let offset = match self.cart.index(pipe) {
            Ok(offset) => offset,
            Err(_) => return Instruction::new(format!("{mnemonic} ${pipe:06X}.l")),
        };
        if !self.valid_code.contains(&offset) {
            return Instruction::new(format!("{mnemonic} ${pipe:06X}.l"));
        }

        let mirrored = if self.cart.hirom {
            pipe & 0xFF0000 != self.cart.address(offset) & 0xFF0000
        } else {
            (pipe >> 1) & 0xFF8000 != offset & 0xFF8000
        };
        if mirrored {
            let bank = pipe.high_word().low_byte();
            self.label_bank_aliases
                .entry(offset)
                .or_default()
                .insert(bank);
            self.label_name(offset, None);
            Instruction::new(format!("{mnemonic} L{pipe:06X}"))
        } else {
            let name = self.label_name(offset, None);
            Instruction::new(format!("{mnemonic} {name}"))
        }
    }

    fn rep(&mut self) -> Instruction {
        let value = self.pipe8();
        self.flags.rep(value);
        let mut instruction = Instruction::new(format!("rep #${value:02X}"));
        instruction.preamble = width_preamble(value, 16);
        instruction
    }

    fn sep(&mut self) -> Instruction {
        let value = self.pipe8();
        self.flags.sep(value);
        let mut instruction = Instruction::new(format!("sep #${value:02X}"));
        instruction.preamble = width_preamble(value, 8);
        instruction
    }

    pub fn valid_label(&self, offset: u32) -> bool {
        self.valid_code.contains(&offset)
    }

    pub fn code(&self) -> &CodeStream {
        &self.code
    }

    pub fn labels(&self) -> &BTreeMap<u32, String> {
        &self.labels
    }

    pub fn data_labels(&self) -> &BTreeMap<u32, String> {
        &self.data_labels
    }

    pub fn memory(&self) -> &BTreeMap<u32, String> {
        &self.memory
    }

    pub fn decoders(&self) -> &DecoderRegistry {
        &self.decoders
    }

    pub fn registry_mut(&mut self) -> &mut DecoderRegistry {
        &mut self.decoders
    }

    pub fn files(&self) -> impl Iterator<Item = (&String, &Vec<u8>)> {
        self.decoders.files()
    }

    /// Render the whole program: process-level definitions first, then every
    /// bank in ascending order.
    pub fn assembly(&self) -> String {
        let mut out = String::new();
        for (address, name) in &self.memory {
            out.push_str(&format!(".define {name} ${address:06X}\n"));
        }
        for label in self.decoders.translations() {
            out.push_str(&format!(".STRINGMAPTABLE {label} \"{label}.tbl\"\n"));
        }
        if !out.is_empty() {
            out.push('\n');
        }
        for bank in 0..self.cart.bank_count() {
            out.push_str(&self.bank_code(bank));
        }
        out.push_str(".ENDS\n");
        out
    }

    pub fn bank_code(&self, bank: u32) -> String {
        let start = bank * self.cart.bank_size();
        let end = start + self.cart.bank_size();
        let mut out = String::new();
        if bank != 0 {
            out.push_str(".ENDS\n\n");
        }
        out.push_str(&format!(
            ".BANK {bank} SLOT 0\n.ORG $0000\n\n.SECTION \"Bank{bank}\" FORCE\n\n"
        ));
        for (pos, instruction) in self.code.range(start, end) {
            if let Some(alias_banks) = self.label_bank_aliases.get(&pos) {
                let low = self.cart.address(pos).low_word();
                for alias_bank in alias_banks {
                    out.push_str(&format!(
                        ".BASE ${alias_bank:02X}\nL{alias_bank:02X}{low:04X}:\n.BASE $00\n"
                    ));
                }
            }
            if let Some(name) = self.labels.get(&pos) {
                out.push_str(&format!("{name}:\n"));
            }
            out.push_str(&instruction.to_string());
            out.push('\n');
            if instruction.returns {
                out.push('\n');
            }
        }
        out
    }
}

fn width_preamble(value: u8, width: u8) -> Option<String> {
    let mut preamble: Option<String> = None;
    if value & 0x20 != 0 {
        preamble = Some(format!(".ACCU {width}"));
    }
    if value & 0x10 != 0 {
        preamble = Some(match preamble {
            Some(p) => format!("{p}\n.INDEX {width}"),
            None => format!(".INDEX {width}"),
        });
    }
    preamble
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn lorom_image() -> Vec<u8> {
        let mut data = vec![0u8; 0x8000];
        for i in 0x7FC0..0x7FD5 {
            data[i] = b' ';
        }
        data[0x7FD5] = 0x20;
        data[0x7FD7] = 0x08;
        data[0x7FDA] = 0x33;
        data[0x7FDC] = 0xFF;
        data[0x7FDD] = 0xFF;
        data[0x7FFC] = 0x00;
        data[0x7FFD] = 0x80;
        data
    }

    fn disassemble(data: Vec<u8>) -> (String, Vec<(u32, String)>) {
        let cart = Cartridge::with_data(data).unwrap();
        let mut disasm = Disassembler::new(&cart);
        disasm.run().unwrap();
        let lines = disasm
            .code()
            .iter()
            .map(|(offset, i)| (offset, i.code.clone()))
            .collect();
        (disasm.assembly(), lines)
    }

    #[test]
    fn test_instruction_display() {
        let mut instruction = Instruction::new("lda #$42.b");
        assert_eq!(instruction.to_string(), "\tlda #$42.b");
        instruction.comment = Some("A9 42".to_string());
        assert_eq!(instruction.to_string(), "\tlda #$42.b\t\t; A9 42");
        instruction.preamble = Some("main:".to_string());
        assert_eq!(instruction.to_string(), "main:\n\tlda #$42.b\t\t; A9 42");
    }

    #[test]
    fn test_width_flags() {
        let mut flags = WidthFlags::new();
        assert!(!flags.acc16());
        assert!(!flags.idx16());
        flags.rep(0x30);
        assert!(flags.acc16());
        assert!(flags.idx16());
        assert_eq!(op_size(0xA9, flags), 3);
        assert_eq!(op_size(0xA2, flags), 3);
        flags.sep(0x20);
        assert_eq!(op_size(0xA9, flags), 2);
        assert_eq!(op_size(0xA2, flags), 3);
    }

    #[test]
    fn test_reset_vector_label_and_rts() {
        let mut data = lorom_image();
        data[0] = 0x60; // rts
        let (assembly, lines) = disassemble(data);
        assert_eq!(lines[0], (0, "rts".to_string()));
        assert!(assembly.contains("L008000:\n\trts"));
    }

    #[test]
    fn test_immediate_width_follows_rep() {
        let mut data = lorom_image();
        // sep #$20 / lda #$11 / rep #$20 / lda #$2211 / rts
        data[0..9].copy_from_slice(&[0xE2, 0x20, 0xA9, 0x11, 0xC2, 0x20, 0xA9, 0x11, 0x22]);
        data[9] = 0x60;
        let (assembly, lines) = disassemble(data);
        assert_eq!(lines[1].1, "lda #$11.b");
        assert_eq!(lines[3].1, "lda #$2211.w");
        assert!(assembly.contains(".ACCU 16\n\trep #$20"));
        assert!(assembly.contains(".ACCU 8\n\tsep #$20"));
    }

    #[test]
    fn test_branch_resolution() {
        let mut data = lorom_image();
        // bra +1 / nop / nop (the branch lands on the second nop)
        data[0..4].copy_from_slice(&[0x80, 0x01, 0xEA, 0xEA]);
        let (assembly, lines) = disassemble(data);
        assert_eq!(lines[0].1, "bra L008003");
        assert!(assembly.contains("L008003:\n\tnop"));
    }

    #[test]
    fn test_invalid_branch_demoted() {
        let mut data = lorom_image();
        // bra into the middle of a 3-byte instruction
        data[0..5].copy_from_slice(&[0x80, 0x01, 0xAD, 0x34, 0x12]);
        let (_, lines) = disassemble(data);
        assert_eq!(lines[0].1, ".db $80, $01");
    }

    #[test]
    fn test_bank_wrapping_branch_demoted() {
        let mut data = lorom_image();
        // branch backwards off the start of the bank
        data[0..2].copy_from_slice(&[0x80, 0x80]);
        let cart = Cartridge::with_data(data).unwrap();
        let mut disasm = Disassembler::new(&cart);
        disasm.run().unwrap();
        let (_, first) = disasm.code().iter().next().map(|(o, i)| (o, i.clone())).unwrap();
        assert_eq!(first.code, ".db $80, $80");
        assert!(first
            .comment
            .as_deref()
            .unwrap()
            .starts_with("Invalid bank wrapping branch target"));
    }

    #[test]
    fn test_hardware_register_substitution() {
        let mut data = lorom_image();
        // sta $2100
        data[0..3].copy_from_slice(&[0x8D, 0x00, 0x21]);
        let (_, lines) = disassemble(data);
        assert_eq!(lines[0].1, "sta INIDSP.w");
    }

    #[test]
    fn test_memory_variable_substitution() {
        let mut data = lorom_image();
        data[0..3].copy_from_slice(&[0x8D, 0x10, 0x00]);
        let cart = Cartridge::with_data(data).unwrap();
        let mut disasm = Disassembler::new(&cart);
        disasm.set_memory(0x000010, "player_hp").unwrap();
        disasm.run().unwrap();
        assert_eq!(disasm.code().get(0).unwrap().code, "sta player_hp.w");
        assert!(disasm.assembly().starts_with(".define player_hp $000010\n"));
    }

    #[test]
    fn test_memory_variable_rejects_rom_addresses() {
        let cart = Cartridge::with_data(lorom_image()).unwrap();
        let mut disasm = Disassembler::new(&cart);
        assert!(disasm.set_memory(0x008000, "bad").is_err());
        assert!(disasm.set_memory(0x7E0100, "good").is_ok());
    }

    #[test]
    fn test_jump_absolute_resolves_in_bank() {
        let mut data = lorom_image();
        // jmp $8004 / nop / nop
        data[0..5].copy_from_slice(&[0x4C, 0x04, 0x80, 0xEA, 0xEA]);
        let (_, lines) = disassemble(data);
        assert_eq!(lines[0].1, "jmp L008004");
    }

    #[test]
    fn test_jump_absolute_low_operand_stays_literal() {
        let mut data = lorom_image();
        data[0..3].copy_from_slice(&[0x4C, 0x00, 0x20]);
        let (_, lines) = disassemble(data);
        assert_eq!(lines[0].1, "jmp $2000");
    }

    #[test]
    fn test_long_jump_mirror_alias() {
        let mut data = lorom_image();
        // jsl $808004 (mirror of $008004) / nop / rtl at the target
        data[0..4].copy_from_slice(&[0x22, 0x04, 0x80, 0x80]);
        data[4] = 0x6B;
        let cart = Cartridge::with_data(data).unwrap();
        let mut disasm = Disassembler::new(&cart);
        disasm.run().unwrap();
        assert_eq!(disasm.code().get(0).unwrap().code, "jsr L808004");
        let assembly = disasm.assembly();
        assert!(assembly.contains(".BASE $80\nL808004:\n.BASE $00\nL008004:"));
    }

    #[test]
    fn test_data_banks_render_as_rows() {
        let mut data = lorom_image();
        data[0] = 0x60;
        let cart = Cartridge::with_data(data).unwrap();
        let mut disasm = Disassembler::new(&cart);
        disasm.code_banks = vec![1];
        disasm.run().unwrap();
        // Bank 0 was not listed, so it renders as 16-byte rows.
        let first = disasm.code().get(0).unwrap();
        assert!(first.code.starts_with(".db "));
        assert_eq!(first.code.matches(", ").count(), 15);
    }
}
