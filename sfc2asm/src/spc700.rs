//! SPC700 sub-disassembler.
//!
//! An independent linear sweep over an audio code block. The SPC700 encodes
//! register and bit numbers inside the opcode byte, so whole instruction
//! families decode from bit patterns; the rest dispatch per opcode.
use itertools::Itertools;

use crate::disasm::Instruction;

/// SPC700 instruction sizes, 1-3 bytes.
pub static SPC700_INSTRUCTION_SIZES: [u8; 256] = [
    2, 1, 2, 2, 2, 2, 2, 2, 2, 3, 3, 2, 3, 1, 3, 3, // 0x
    2, 1, 2, 2, 3, 2, 2, 2, 3, 2, 2, 2, 2, 1, 2, 2, // 1x
    1, 1, 2, 2, 2, 2, 2, 2, 2, 3, 3, 2, 3, 1, 3, 3, // 2x
    2, 1, 2, 2, 3, 2, 2, 2, 2, 2, 2, 2, 2, 1, 2, 2, // 3x
    1, 1, 2, 2, 2, 2, 2, 2, 2, 3, 3, 2, 3, 1, 3, 3, // 4x
    2, 1, 2, 2, 3, 2, 2, 2, 2, 2, 2, 2, 2, 1, 2, 2, // 5x
    1, 1, 2, 2, 2, 2, 2, 2, 2, 3, 3, 2, 3, 1, 3, 3, // 6x
    2, 1, 2, 2, 3, 2, 2, 2, 2, 2, 2, 2, 2, 1, 2, 2, // 7x
    2, 1, 2, 2, 2, 2, 2, 2, 2, 2, 3, 2, 3, 2, 2, 1, // 8x
    2, 1, 2, 2, 2, 2, 2, 2, 2, 2, 3, 2, 3, 2, 2, 1, // 9x
    2, 1, 2, 2, 2, 2, 2, 2, 2, 2, 3, 2, 3, 1, 1, 1, // Ax
    2, 1, 2, 2, 2, 2, 2, 2, 2, 2, 3, 2, 3, 1, 1, 1, // Bx
    2, 1, 2, 2, 2, 2, 2, 2, 2, 2, 3, 2, 3, 2, 2, 1, // Cx
    2, 1, 2, 2, 3, 2, 2, 2, 2, 2, 3, 2, 3, 1, 2, 1, // Dx
    2, 1, 2, 2, 2, 2, 2, 2, 2, 2, 3, 2, 3, 1, 2, 1, // Ex
    2, 1, 2, 2, 3, 2, 2, 2, 2, 2, 3, 2, 3, 1, 2, 1, // Fx
];

pub struct Spc700Disassembler<'a> {
    data: &'a [u8],
    start_addr: u16,
    pos: usize,
}

impl<'a> Spc700Disassembler<'a> {
    pub fn new(data: &'a [u8], start_addr: u16) -> Self {
        Spc700Disassembler {
            data,
            start_addr,
            pos: 0,
        }
    }

    /// Decode the whole buffer into `(offset, instruction)` pairs, with the
    /// raw bytes as trailing comments.
    pub fn disassemble(&mut self) -> Vec<(usize, Instruction)> {
        let mut out = Vec::new();
        self.pos = 0;
        while self.pos < self.data.len() {
            let offset = self.pos;
            let op = self.data[self.pos];
            let size = SPC700_INSTRUCTION_SIZES[op as usize] as usize;
            if self.pos + size > self.data.len() {
                let rest = &self.data[self.pos..];
                let mut instruction = Instruction::new(format!(
                    ".db {}",
                    rest.iter().map(|b| format!("${b:02X}")).join(", ")
                ));
                instruction.comment = Some(format!(
                    "Incomplete instruction: {}",
                    rest.iter().map(|b| format!("{b:02X}")).join(" ")
                ));
                out.push((offset, instruction));
                break;
            }
            let mut instruction = self.decode_op(op);
            instruction.comment = Some(
                self.data[self.pos..self.pos + size]
                    .iter()
                    .map(|b| format!("{b:02X}"))
                    .join(" "),
            );
            out.push((offset, instruction));
            self.pos += size;
        }
        out
    }

    fn ins(&self, code: String) -> Instruction {
        Instruction::new(code)
    }

    fn pipe8(&self) -> u8 {
        self.data[self.pos + 1]
    }

    fn pipe16(&self) -> u16 {
        self.data[self.pos + 1] as u16 | (self.data[self.pos + 2] as u16) << 8
    }

    fn operand2(&self) -> u8 {
        self.data[self.pos + 2]
    }

    /// Branch target for a relative byte at instruction offset `at`.
    fn rel_target(&self, at: usize, size: usize) -> u16 {
        let rel = self.data[self.pos + at] as i8;
        (self.start_addr as i32 + self.pos as i32 + size as i32 + rel as i32) as u16
    }

    fn direct(&self) -> String {
        format!("${:02X}", self.pipe8())
    }

    fn direct_x(&self) -> String {
        format!("${:02X}+X", self.pipe8())
    }

    fn direct_y(&self) -> String {
        format!("${:02X}+Y", self.pipe8())
    }

    fn absolute(&self) -> String {
        format!("${:04X}", self.pipe16())
    }

    fn absolute_x(&self) -> String {
        format!("${:04X}+X", self.pipe16())
    }

    fn absolute_y(&self) -> String {
        format!("${:04X}+Y", self.pipe16())
    }

    fn indirect_x(&self) -> String {
        format!("(${:02X}+X)", self.pipe8())
    }

    fn indirect_y(&self) -> String {
        format!("(${:02X})+Y", self.pipe8())
    }

    fn imm8(&self) -> String {
        format!("#${:02X}", self.pipe8())
    }

    fn relative(&self) -> String {
        format!("${:04X}", self.rel_target(1, 2))
    }

    /// 13-bit address with the bit number in the top three bits.
    fn membit(&self) -> (u16, u8) {
        let value = self.pipe16();
        (value & 0x1FFF, (value >> 13) as u8 & 0x7)
    }

    fn decode_op(&self, op: u8) -> Instruction {
        match op {
            op if op & 0x0F == 0x01 => self.ins(format!("tcall {}", op >> 4)),
            op if op & 0x1F == 0x02 => self.ins(format!("set1 {}.{}", self.direct(), op >> 5)),
            op if op & 0x1F == 0x12 => self.ins(format!("clr1 {}.{}", self.direct(), op >> 5)),
            op if op & 0x1F == 0x03 => self.ins(format!(
                "bbs {}.{},${:04X}",
                self.direct(),
                op >> 5,
                self.rel_target(2, 3)
            )),
            op if op & 0x1F == 0x13 => self.ins(format!(
                "bbc {}.{},${:04X}",
                self.direct(),
                op >> 5,
                self.rel_target(2, 3)
            )),

            0x00 => self.ins("nop".to_string()),
            0x04 => self.ins(format!("or a,{}", self.direct())),
            0x05 => self.ins(format!("or a,{}", self.absolute())),
            0x06 => self.ins("or a,(X)".to_string()),
            0x07 => self.ins(format!("or a,{}", self.indirect_x())),
            0x08 => self.ins(format!("or a,{}", self.imm8())),
            0x09 => self.ins(format!("or ${:02X},${:02X}", self.pipe8(), self.operand2())),
            0x0A => {
                let (addr, bit) = self.membit();
                self.ins(format!("or1 C,${addr:04X}.{bit}"))
            }
            0x0B => self.ins(format!("asl {}", self.direct())),
            0x0C => self.ins(format!("asl {}", self.absolute())),
            0x0D => self.ins("push PSW".to_string()),
            0x0E => self.ins(format!("tset1 {}", self.absolute())),
            0x0F => self.ins("brk".to_string()),

            0x10 => self.ins(format!("bpl {}", self.relative())),
            0x14 => self.ins(format!("or a,{}", self.direct_x())),
            0x15 => self.ins(format!("or a,{}", self.absolute_x())),
            0x16 => self.ins(format!("or a,{}", self.absolute_y())),
            0x17 => self.ins(format!("or a,{}", self.indirect_y())),
            0x18 => self.ins(format!("or ${:02X},#${:02X}", self.pipe8(), self.operand2())),
            0x19 => self.ins("or (X),(Y)".to_string()),
            0x1A => self.ins(format!("decw {}", self.direct())),
            0x1B => self.ins(format!("asl {}", self.direct_x())),
            0x1C => self.ins("asl A".to_string()),
            0x1D => self.ins("dec X".to_string()),
            0x1E => self.ins(format!("cmp X,{}", self.absolute())),
            0x1F => self.ins(format!("jmp [{}]", self.absolute_x())),

            0x20 => self.ins("clrp".to_string()),
            0x24 => self.ins(format!("and a,{}", self.direct())),
            0x25 => self.ins(format!("and a,{}", self.absolute())),
            0x26 => self.ins("and a,(X)".to_string()),
            0x27 => self.ins(format!("and a,{}", self.indirect_x())),
            0x28 => self.ins(format!("and a,{}", self.imm8())),
            0x29 => self.ins(format!("and ${:02X},${:02X}", self.pipe8(), self.operand2())),
            0x2A => {
                let (addr, bit) = self.membit();
                self.ins(format!("or1 C,!${addr:04X}.{bit}"))
            }
            0x2B => self.ins(format!("rol {}", self.direct())),
            0x2C => self.ins(format!("rol {}", self.absolute())),
            0x2D => self.ins("push A".to_string()),
            0x2E => self.ins(format!(
                "cbne {},${:04X}",
                self.direct(),
                self.rel_target(2, 3)
            )),
            0x2F => self.ins(format!("bra {}", self.relative())),

            0x30 => self.ins(format!("bmi {}", self.relative())),
            0x34 => self.ins(format!("and a,{}", self.direct_x())),
            0x35 => self.ins(format!("and a,{}", self.absolute_x())),
            0x36 => self.ins(format!("and a,{}", self.absolute_y())),
            0x37 => self.ins(format!("and a,{}", self.indirect_y())),
            0x38 => self.ins(format!("and ${:02X},#${:02X}", self.pipe8(), self.operand2())),
            0x39 => self.ins("and (X),(Y)".to_string()),
            0x3A => self.ins(format!("incw {}", self.direct())),
            0x3B => self.ins(format!("rol {}", self.direct_x())),
            0x3C => self.ins("rol A".to_string()),
            0x3D => self.ins("inc X".to_string()),
            0x3E => self.ins(format!("cmp X,{}", self.direct())),
            0x3F => self.ins(format!("call {}", self.absolute())),

            0x40 => self.ins("setp".to_string()),
            0x44 => self.ins(format!("eor a,{}", self.direct())),
            0x45 => self.ins(format!("eor a,{}", self.absolute())),
            0x46 => self.ins("eor a,(X)".to_string()),
            0x47 => self.ins(format!("eor a,{}", self.indirect_x())),
            0x48 => self.ins(format!("eor a,{}", self.imm8())),
            0x49 => self.ins(format!("eor ${:02X},${:02X}", self.pipe8(), self.operand2())),
            0x4A => {
                let (addr, bit) = self.membit();
                self.ins(format!("and1 C,${addr:04X}.{bit}"))
            }
            0x4B => self.ins(format!("lsr {}", self.direct())),
            0x4C => self.ins(format!("lsr {}", self.absolute())),
            0x4D => self.ins("push X".to_string()),
            0x4E => self.ins(format!("tclr1 {}", self.absolute())),
            0x4F => self.ins(format!("pcall ${:02X}", self.pipe8())),

            0x50 => self.ins(format!("bvc {}", self.relative())),
            0x54 => self.ins(format!("eor a,{}", self.direct_x())),
            0x55 => self.ins(format!("eor a,{}", self.absolute_x())),
            0x56 => self.ins(format!("eor a,{}", self.absolute_y())),
            0x57 => self.ins(format!("eor a,{}", self.indirect_y())),
            0x58 => self.ins(format!("eor ${:02X},#${:02X}", self.pipe8(), self.operand2())),
            0x59 => self.ins("eor (X),(Y)".to_string()),
            0x5A => self.ins(format!("cmpw YA,{}", self.direct())),
            0x5B => self.ins(format!("lsr {}", self.direct_x())),
            0x5C => self.ins("lsr A".to_string()),
            0x5D => self.ins("mov X,A".to_string()),
            0x5E => self.ins(format!("cmp Y,{}", self.absolute())),
            0x5F => self.ins(format!("jmp {}", self.absolute())),

            0x60 => self.ins("clrc".to_string()),
            0x64 => self.ins(format!("cmp a,{}", self.direct())),
            0x65 => self.ins(format!("cmp a,{}", self.absolute())),
            0x66 => self.ins("cmp a,(X)".to_string()),
            0x67 => self.ins(format!("cmp a,{}", self.indirect_x())),
            0x68 => self.ins(format!("cmp a,{}", self.imm8())),
            0x69 => self.ins(format!("cmp ${:02X},${:02X}", self.pipe8(), self.operand2())),
            0x6A => {
                let (addr, bit) = self.membit();
                self.ins(format!("and1 C,!${addr:04X}.{bit}"))
            }
            0x6B => self.ins(format!("ror {}", self.direct())),
            0x6C => self.ins(format!("ror {}", self.absolute())),
            0x6D => self.ins("push Y".to_string()),
            0x6E => self.ins(format!(
                "dbnz ${:02X},${:04X}",
                self.pipe8(),
                self.rel_target(2, 3)
            )),
            0x6F => self.ins("ret".to_string()),

            0x70 => self.ins(format!("bvs {}", self.relative())),
            0x74 => self.ins(format!("cmp a,{}", self.direct_x())),
            0x75 => self.ins(format!("cmp a,{}", self.absolute_x())),
            0x76 => self.ins(format!("cmp a,{}", self.absolute_y())),
            0x77 => self.ins(format!("cmp a,{}", self.indirect_y())),
            0x78 => self.ins(format!("cmp ${:02X},#${:02X}", self.pipe8(), self.operand2())),
            0x79 => self.ins("cmp (X),(Y)".to_string()),
            0x7A => self.ins(format!("addw YA,{}", self.direct())),
            0x7B => self.ins(format!("ror {}", self.direct_x())),
            0x7C => self.ins("ror A".to_string()),
            0x7D => self.ins("mov A,X".to_string()),
            0x7E => self.ins(format!("cmp Y,{}", self.direct())),
            0x7F => self.ins("reti".to_string()),

            0x80 => self.ins("setc".to_string()),
            0x84 => self.ins(format!("adc a,{}", self.direct())),
            0x85 => self.ins(format!("adc a,{}", self.absolute())),
            0x86 => self.ins("adc a,(X)".to_string()),
            0x87 => self.ins(format!("adc a,{}", self.indirect_x())),
            0x88 => self.ins(format!("adc a,{}", self.imm8())),
            0x89 => self.ins(format!("adc ${:02X},${:02X}", self.pipe8(), self.operand2())),
            0x8A => {
                let (addr, bit) = self.membit();
                self.ins(format!("eor1 C,${addr:04X}.{bit}"))
            }
            0x8B => self.ins(format!("dec {}", self.direct())),
            0x8C => self.ins(format!("dec {}", self.absolute())),
            0x8D => self.ins(format!("mov Y,{}", self.imm8())),
            0x8E => self.ins("pop PSW".to_string()),
            0x8F => self.ins(format!("mov ${:02X},#${:02X}", self.pipe8(), self.operand2())),

            0x90 => self.ins(format!("bcc {}", self.relative())),
            0x94 => self.ins(format!("adc a,{}", self.direct_x())),
            0x95 => self.ins(format!("adc a,{}", self.absolute_x())),
            0x96 => self.ins(format!("adc a,{}", self.absolute_y())),
            0x97 => self.ins(format!("adc a,{}", self.indirect_y())),
            0x98 => self.ins(format!("adc ${:02X},#${:02X}", self.pipe8(), self.operand2())),
            0x99 => self.ins("adc (X),(Y)".to_string()),
            0x9A => self.ins(format!("subw YA,{}", self.direct())),
            0x9B => self.ins(format!("dec {}", self.direct_x())),
            0x9C => self.ins("dec A".to_string()),
            0x9D => self.ins("mov X,SP".to_string()),
            0x9E => self.ins("div YA,X".to_string()),
            0x9F => self.ins("xcn A".to_string()),

            0xA0 => self.ins("ei".to_string()),
            0xA4 => self.ins(format!("sbc a,{}", self.direct())),
            0xA5 => self.ins(format!("sbc a,{}", self.absolute())),
            0xA6 => self.ins("sbc a,(X)".to_string()),
            0xA7 => self.ins(format!("sbc a,{}", self.indirect_x())),
            0xA8 => self.ins(format!("sbc a,{}", self.imm8())),
            0xA9 => self.ins(format!("sbc ${:02X},${:02X}", self.pipe8(), self.operand2())),
            0xAA => {
                let (addr, bit) = self.membit();
                self.ins(format!("mov1 C,${addr:04X}.{bit}"))
            }
            0xAB => self.ins(format!("inc {}", self.direct())),
            0xAC => self.ins(format!("inc {}", self.absolute())),
            0xAD => self.ins(format!("cmp Y,{}", self.imm8())),
            0xAE => self.ins("pop A".to_string()),
            0xAF => self.ins("mov (X)+,A".to_string()),

            0xB0 => self.ins(format!("bcs {}", self.relative())),
            0xB4 => self.ins(format!("sbc a,{}", self.direct_x())),
            0xB5 => self.ins(format!("sbc a,{}", self.absolute_x())),
            0xB6 => self.ins(format!("sbc a,{}", self.absolute_y())),
            0xB7 => self.ins(format!("sbc a,{}", self.indirect_y())),
            0xB8 => self.ins(format!("sbc ${:02X},#${:02X}", self.pipe8(), self.operand2())),
            0xB9 => self.ins("sbc (X),(Y)".to_string()),
            0xBA => self.ins(format!("movw YA,{}", self.direct())),
            0xBB => self.ins(format!("inc {}", self.direct_x())),
            0xBC => self.ins("inc A".to_string()),
            0xBD => self.ins("mov SP,X".to_string()),
            0xBE => self.ins("das A".to_string()),
            0xBF => self.ins("mov A,(X)+".to_string()),

            0xC0 => self.ins("di".to_string()),
            0xC4 => self.ins(format!("mov {},A", self.direct())),
            0xC5 => self.ins(format!("mov {},A", self.absolute())),
            0xC6 => self.ins("mov (X),A".to_string()),
            0xC7 => self.ins(format!("mov {},A", self.indirect_x())),
            0xC8 => self.ins(format!("cmp X,{}", self.imm8())),
            0xC9 => self.ins(format!("mov {},X", self.absolute())),
            0xCA => {
                let (addr, bit) = self.membit();
                self.ins(format!("mov1 ${addr:04X}.{bit},C"))
            }
            0xCB => self.ins(format!("mov {},Y", self.direct())),
            0xCC => self.ins(format!("mov {},Y", self.absolute())),
            0xCD => self.ins(format!("mov X,{}", self.imm8())),
            0xCE => self.ins("pop X".to_string()),
            0xCF => self.ins("mul YA".to_string()),

            0xD0 => self.ins(format!("bne {}", self.relative())),
            0xD4 => self.ins(format!("mov {},A", self.direct_x())),
            0xD5 => self.ins(format!("mov {},A", self.absolute_x())),
            0xD6 => self.ins(format!("mov {},A", self.absolute_y())),
            0xD7 => self.ins(format!("mov {},A", self.indirect_y())),
            0xD8 => self.ins(format!("mov {},X", self.direct())),
            0xD9 => self.ins(format!("mov {},X", self.direct_y())),
            0xDA => self.ins(format!("movw {},YA", self.direct())),
            0xDB => self.ins(format!("mov {},Y", self.direct_x())),
            0xDC => self.ins("dec Y".to_string()),
            0xDD => self.ins("mov A,Y".to_string()),
            0xDE => self.ins(format!(
                "cbne {},${:04X}",
                self.direct_x(),
                self.rel_target(2, 3)
            )),
            0xDF => self.ins("daa A".to_string()),

            0xE0 => self.ins("clrv".to_string()),
            0xE4 => self.ins(format!("mov a,{}", self.direct())),
            0xE5 => self.ins(format!("mov a,{}", self.absolute())),
            0xE6 => self.ins("mov a,(X)".to_string()),
            0xE7 => self.ins(format!("mov a,{}", self.indirect_x())),
            0xE8 => self.ins(format!("mov a,{}", self.imm8())),
            0xE9 => self.ins(format!("mov X,{}", self.absolute())),
            0xEA => {
                let (addr, bit) = self.membit();
                self.ins(format!("not1 ${addr:04X}.{bit}"))
            }
            0xEB => self.ins(format!("mov Y,{}", self.direct())),
            0xEC => self.ins(format!("mov Y,{}", self.absolute())),
            0xED => self.ins("notc".to_string()),
            0xEE => self.ins("pop Y".to_string()),
            0xEF => self.ins("sleep".to_string()),

            0xF0 => self.ins(format!("beq {}", self.relative())),
            0xF4 => self.ins(format!("mov a,{}", self.direct_x())),
            0xF5 => self.ins(format!("mov a,{}", self.absolute_x())),
            0xF6 => self.ins(format!("mov a,{}", self.absolute_y())),
            0xF7 => self.ins(format!("mov a,{}", self.indirect_y())),
            0xF8 => self.ins(format!("mov X,{}", self.direct())),
            0xF9 => self.ins(format!("mov X,{}", self.direct_y())),
            0xFA => self.ins(format!("mov ${:02X},${:02X}", self.pipe8(), self.operand2())),
            0xFB => self.ins(format!("mov Y,{}", self.direct_x())),
            0xFC => self.ins("inc Y".to_string()),
            0xFD => self.ins("mov Y,A".to_string()),
            0xFE => self.ins(format!("dbnz Y,${:04X}", self.rel_target(1, 2))),
            0xFF => self.ins("stop".to_string()),

            op => {
                let mut instruction = self.ins(format!(".db ${op:02X}"));
                instruction.comment = Some("Unknown opcode".to_string());
                instruction
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn code_of(data: &[u8]) -> Vec<String> {
        Spc700Disassembler::new(data, 0x0200)
            .disassemble()
            .into_iter()
            .map(|(_, i)| i.code)
            .collect()
    }

    #[test]
    fn test_basic_instructions() {
        assert_eq!(code_of(&[0x00]), vec!["nop"]);
        assert_eq!(code_of(&[0xE8, 0x42]), vec!["mov a,#$42"]);
        assert_eq!(code_of(&[0x5F, 0x34, 0x12]), vec!["jmp $1234"]);
        assert_eq!(code_of(&[0x3F, 0x00, 0x05]), vec!["call $0500"]);
        assert_eq!(code_of(&[0x8F, 0x7F, 0xF1]), vec!["mov $7F,#$F1"]);
    }

    #[test]
    fn test_opcode_families() {
        assert_eq!(code_of(&[0x01]), vec!["tcall 0"]);
        assert_eq!(code_of(&[0xF1]), vec!["tcall 15"]);
        assert_eq!(code_of(&[0x02, 0x10]), vec!["set1 $10.0"]);
        assert_eq!(code_of(&[0xE2, 0x10]), vec!["set1 $10.7"]);
        assert_eq!(code_of(&[0x12, 0x10]), vec!["clr1 $10.0"]);
        assert_eq!(code_of(&[0xF2, 0x10]), vec!["clr1 $10.7"]);
    }

    #[test]
    fn test_relative_branches() {
        // Branch target is start_addr + pos + size + offset.
        assert_eq!(code_of(&[0x10, 0x05]), vec!["bpl $0207"]);
        assert_eq!(code_of(&[0x10, 0xFE]), vec!["bpl $0200"]);
        assert_eq!(code_of(&[0x03, 0x20, 0x01]), vec!["bbs $20.0,$0204"]);
        assert_eq!(code_of(&[0xFE, 0xFD]), vec!["dbnz Y,$01FF"]);
    }

    #[test]
    fn test_bit_addressing() {
        // Top three bits of the address word select the bit.
        assert_eq!(code_of(&[0x0A, 0x34, 0b0110_0010]), vec!["or1 C,$0234.3"]);
        assert_eq!(code_of(&[0xCA, 0x00, 0xE0]), vec!["mov1 $0000.7,C"]);
    }

    #[test]
    fn test_incomplete_tail() {
        let out = Spc700Disassembler::new(&[0x00, 0x5F, 0x34], 0).disassemble();
        assert_eq!(out.len(), 2);
        assert_eq!(out[1].1.code, ".db $5F, $34");
        assert!(out[1].1.comment.as_deref().unwrap().starts_with("Incomplete"));
    }

    #[test]
    fn test_hex_comments() {
        let out = Spc700Disassembler::new(&[0xE8, 0x42], 0).disassemble();
        assert_eq!(out[0].1.comment.as_deref(), Some("E8 42"));
    }
}
