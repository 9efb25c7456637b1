//! The 65C816 opcode table: mnemonic, addressing mode and size data driving
//! the linear sweep.
use std::collections::HashMap;

use lazy_static::lazy_static;

/// Base instruction sizes. Immediate loads and compares grow by one byte
/// when the matching register runs in 16-bit mode.
pub static INSTRUCTION_SIZES: [u8; 256] = [
    2, 2, 2, 2, 2, 2, 2, 2, 1, 2, 1, 1, 3, 3, 3, 4, // x0
    2, 2, 2, 2, 2, 2, 2, 2, 1, 3, 1, 1, 3, 3, 3, 4, // x1
    3, 2, 4, 2, 2, 2, 2, 2, 1, 2, 1, 1, 3, 3, 3, 4, // x2
    2, 2, 2, 2, 2, 2, 2, 2, 1, 3, 1, 1, 3, 3, 3, 4, // x3
    1, 2, 2, 2, 3, 2, 2, 2, 1, 2, 1, 1, 3, 3, 3, 4, // x4
    2, 2, 2, 2, 3, 2, 2, 2, 1, 3, 1, 1, 4, 3, 3, 4, // x5
    1, 2, 3, 2, 2, 2, 2, 2, 1, 2, 1, 1, 3, 3, 3, 4, // x6
    2, 2, 2, 2, 2, 2, 2, 2, 1, 3, 1, 1, 3, 3, 3, 4, // x7
    2, 2, 3, 2, 2, 2, 2, 2, 1, 2, 1, 1, 3, 3, 3, 4, // x8
    2, 2, 2, 2, 2, 2, 2, 2, 1, 3, 1, 1, 3, 3, 3, 4, // x9
    2, 2, 2, 2, 2, 2, 2, 2, 1, 2, 1, 1, 3, 3, 3, 4, // xA
    2, 2, 2, 2, 2, 2, 2, 2, 1, 3, 1, 1, 3, 3, 3, 4, // xB
    2, 2, 2, 2, 2, 2, 2, 2, 1, 2, 1, 1, 3, 3, 3, 4, // xC
    2, 2, 2, 2, 2, 2, 2, 2, 1, 3, 1, 1, 3, 3, 3, 4, // xD
    2, 2, 2, 2, 2, 2, 2, 2, 1, 2, 1, 1, 3, 3, 3, 4, // xE
    2, 2, 2, 2, 3, 2, 2, 2, 1, 3, 1, 1, 3, 3, 3, 4, // xF
];

/// Opcodes whose size depends on the accumulator width flag.
pub static M_VARIABLE_OPCODES: [u8; 8] = [0x09, 0x29, 0x49, 0x69, 0x89, 0xA9, 0xC9, 0xE9];

/// Opcodes whose size depends on the index register width flag.
pub static X_VARIABLE_OPCODES: [u8; 4] = [0xA0, 0xA2, 0xC0, 0xE0];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AddressMode {
    Implied,
    Accumulator,
    ImmediateM,
    ImmediateX,
    ImmediateU8,
    Absolute,
    AbsoluteX,
    AbsoluteY,
    AbsoluteLong,
    AbsoluteLongX,
    AbsoluteIndirect,
    AbsoluteIndexedIndirect,
    AbsoluteIndirectLong,
    DirectPage,
    DirectPageX,
    DirectPageY,
    DirectPageIndirect,
    DirectPageIndirectLong,
    DirectPageXIndirect,
    DirectPageIndirectY,
    DirectPageIndirectLongY,
    StackRelative,
    StackRelativeY,
    BlockMove,
    Relative,
    RelativeLong,
    JumpAbsolute,
    JumpSubAbsolute,
    JumpLong,
    JumpSubLong,
    Rep,
    Sep,
    Wdm,
}

pub struct OpcodeDef {
    pub mnemonic: &'static str,
    pub mode: AddressMode,
    pub returns: bool,
}

pub fn build_opcode_table() -> [OpcodeDef; 256] {
    macro_rules! op {
        ($mnemonic:literal) => {
            OpcodeDef {
                mnemonic: $mnemonic,
                mode: AddressMode::Implied,
                returns: false,
            }
        };
        ($mnemonic:literal, $mode:ident) => {
            OpcodeDef {
                mnemonic: $mnemonic,
                mode: AddressMode::$mode,
                returns: false,
            }
        };
    }

    let mut opcodes = [(); 256].map(|_| op!("nop"));

    opcodes[0x00] = op!("brk", ImmediateU8);
    opcodes[0x01] = op!("ora", DirectPageXIndirect);
    opcodes[0x02] = op!("cop", ImmediateU8);
    opcodes[0x03] = op!("ora", StackRelative);
    opcodes[0x04] = op!("tsb", DirectPage);
    opcodes[0x05] = op!("ora", DirectPage);
    opcodes[0x06] = op!("asl", DirectPage);
    opcodes[0x07] = op!("ora", DirectPageIndirectLong);
    opcodes[0x08] = op!("php");
    opcodes[0x09] = op!("ora", ImmediateM);
    opcodes[0x0A] = op!("asl", Accumulator);
    opcodes[0x0B] = op!("phd");
    opcodes[0x0C] = op!("tsb", Absolute);
    opcodes[0x0D] = op!("ora", Absolute);
    opcodes[0x0E] = op!("asl", Absolute);
    opcodes[0x0F] = op!("ora", AbsoluteLong);
    opcodes[0x10] = op!("bpl", Relative);
    opcodes[0x11] = op!("ora", DirectPageIndirectY);
    opcodes[0x12] = op!("ora", DirectPageIndirect);
    opcodes[0x13] = op!("ora", StackRelativeY);
    opcodes[0x14] = op!("trb", DirectPage);
    opcodes[0x15] = op!("ora", DirectPageX);
    opcodes[0x16] = op!("asl", DirectPageX);
    opcodes[0x17] = op!("ora", DirectPageIndirectLongY);
    opcodes[0x18] = op!("clc");
    opcodes[0x19] = op!("ora", AbsoluteY);
    opcodes[0x1A] = op!("inc", Accumulator);
    opcodes[0x1B] = op!("tcs");
    opcodes[0x1C] = op!("trb", Absolute);
    opcodes[0x1D] = op!("ora", AbsoluteX);
    opcodes[0x1E] = op!("asl", AbsoluteX);
    opcodes[0x1F] = op!("ora", AbsoluteLongX);
    opcodes[0x20] = op!("jsr", JumpSubAbsolute);
    opcodes[0x21] = op!("and", DirectPageXIndirect);
    opcodes[0x22] = op!("jsr", JumpSubLong);
    opcodes[0x23] = op!("and", StackRelative);
    opcodes[0x24] = op!("bit", DirectPage);
    opcodes[0x25] = op!("and", DirectPage);
    opcodes[0x26] = op!("rol", DirectPage);
    opcodes[0x27] = op!("and", DirectPageIndirectLong);
    opcodes[0x28] = op!("plp");
    opcodes[0x29] = op!("and", ImmediateM);
    opcodes[0x2A] = op!("rol", Accumulator);
    opcodes[0x2B] = op!("pld");
    opcodes[0x2C] = op!("bit", Absolute);
    opcodes[0x2D] = op!("and", Absolute);
    opcodes[0x2E] = op!("rol", Absolute);
    opcodes[0x2F] = op!("and", AbsoluteLong);
    opcodes[0x30] = op!("bmi", Relative);
    opcodes[0x31] = op!("and", DirectPageIndirectY);
    opcodes[0x32] = op!("and", DirectPageIndirect);
    opcodes[0x33] = op!("and", StackRelativeY);
    opcodes[0x34] = op!("bit", DirectPageX);
    opcodes[0x35] = op!("and", DirectPageX);
    opcodes[0x36] = op!("rol", DirectPageX);
    opcodes[0x37] = op!("and", DirectPageIndirectLongY);
    opcodes[0x38] = op!("sec");
    opcodes[0x39] = op!("and", AbsoluteY);
    opcodes[0x3A] = op!("dec", Accumulator);
    opcodes[0x3B] = op!("tsc");
    opcodes[0x3C] = op!("bit", AbsoluteX);
    opcodes[0x3D] = op!("and", AbsoluteX);
    opcodes[0x3E] = op!("rol", AbsoluteX);
    opcodes[0x3F] = op!("and", AbsoluteLongX);
    opcodes[0x40] = op!("rti");
    opcodes[0x41] = op!("eor", DirectPageXIndirect);
    opcodes[0x42] = op!("wdm", Wdm);
    opcodes[0x43] = op!("eor", StackRelative);
    opcodes[0x44] = op!("mvp", BlockMove);
    opcodes[0x45] = op!("eor", DirectPage);
    opcodes[0x46] = op!("lsr", DirectPage);
    opcodes[0x47] = op!("eor", DirectPageIndirectLong);
    opcodes[0x48] = op!("pha");
    opcodes[0x49] = op!("eor", ImmediateM);
    opcodes[0x4A] = op!("lsr", Accumulator);
    opcodes[0x4B] = op!("phk");
    opcodes[0x4C] = op!("jmp", JumpAbsolute);
    opcodes[0x4D] = op!("eor", Absolute);
    opcodes[0x4E] = op!("lsr", Absolute);
    opcodes[0x4F] = op!("eor", AbsoluteLong);
    opcodes[0x50] = op!("bvc", Relative);
    opcodes[0x51] = op!("eor", DirectPageIndirectY);
    opcodes[0x52] = op!("eor", DirectPageIndirect);
    opcodes[0x53] = op!("eor", StackRelativeY);
    opcodes[0x54] = op!("mvn", BlockMove);
    opcodes[0x55] = op!("eor", DirectPageX);
    opcodes[0x56] = op!("lsr", DirectPageX);
    opcodes[0x57] = op!("eor", DirectPageIndirectLongY);
    opcodes[0x58] = op!("cli");
    opcodes[0x59] = op!("eor", AbsoluteY);
    opcodes[0x5A] = op!("phy");
    opcodes[0x5B] = op!("tcd");
    opcodes[0x5C] = op!("jmp", JumpLong);
    opcodes[0x5D] = op!("eor", AbsoluteX);
    opcodes[0x5E] = op!("lsr", AbsoluteX);
    opcodes[0x5F] = op!("eor", AbsoluteLongX);
    opcodes[0x60] = op!("rts");
    opcodes[0x61] = op!("adc", DirectPageXIndirect);
    opcodes[0x62] = op!("per", RelativeLong);
    opcodes[0x63] = op!("adc", StackRelative);
    opcodes[0x64] = op!("stz", DirectPage);
    opcodes[0x65] = op!("adc", DirectPage);
    opcodes[0x66] = op!("ror", DirectPage);
    opcodes[0x67] = op!("adc", DirectPageIndirectLong);
    opcodes[0x68] = op!("pla");
    opcodes[0x69] = op!("adc", ImmediateM);
    opcodes[0x6A] = op!("ror", Accumulator);
    opcodes[0x6B] = op!("rtl");
    opcodes[0x6C] = op!("jmp", AbsoluteIndirect);
    opcodes[0x6D] = op!("adc", Absolute);
    opcodes[0x6E] = op!("ror", Absolute);
    opcodes[0x6F] = op!("adc", AbsoluteLong);
    opcodes[0x70] = op!("bvs", Relative);
    opcodes[0x71] = op!("adc", DirectPageIndirectY);
    opcodes[0x72] = op!("adc", DirectPageIndirect);
    opcodes[0x73] = op!("adc", StackRelativeY);
    opcodes[0x74] = op!("stz", DirectPageX);
    opcodes[0x75] = op!("adc", DirectPageX);
    opcodes[0x76] = op!("ror", DirectPageX);
    opcodes[0x77] = op!("adc", DirectPageIndirectLongY);
    opcodes[0x78] = op!("sei");
    opcodes[0x79] = op!("adc", AbsoluteY);
    opcodes[0x7A] = op!("ply");
    opcodes[0x7B] = op!("tdc");
    opcodes[0x7C] = op!("jmp", AbsoluteIndexedIndirect);
    opcodes[0x7D] = op!("adc", AbsoluteX);
    opcodes[0x7E] = op!("ror", AbsoluteX);
    opcodes[0x7F] = op!("adc", AbsoluteLongX);
    opcodes[0x80] = op!("bra", Relative);
    opcodes[0x81] = op!("sta", DirectPageXIndirect);
    opcodes[0x82] = op!("brl", RelativeLong);
    opcodes[0x83] = op!("sta", StackRelative);
    opcodes[0x84] = op!("sty", DirectPage);
    opcodes[0x85] = op!("sta", DirectPage);
    opcodes[0x86] = op!("stx", DirectPage);
    opcodes[0x87] = op!("sta", DirectPageIndirectLong);
    opcodes[0x88] = op!("dey");
    opcodes[0x89] = op!("bit", ImmediateM);
    opcodes[0x8A] = op!("txa");
    opcodes[0x8B] = op!("phb");
    opcodes[0x8C] = op!("sty", Absolute);
    opcodes[0x8D] = op!("sta", Absolute);
    opcodes[0x8E] = op!("stx", Absolute);
    opcodes[0x8F] = op!("sta", AbsoluteLong);
    opcodes[0x90] = op!("bcc", Relative);
    opcodes[0x91] = op!("sta", DirectPageIndirectY);
    opcodes[0x92] = op!("sta", DirectPageIndirect);
    opcodes[0x93] = op!("sta", StackRelativeY);
    opcodes[0x94] = op!("sty", DirectPageX);
    opcodes[0x95] = op!("sta", DirectPageX);
    opcodes[0x96] = op!("stx", DirectPageY);
    opcodes[0x97] = op!("sta", DirectPageIndirectLongY);
    opcodes[0x98] = op!("tya");
    opcodes[0x99] = op!("sta", AbsoluteY);
    opcodes[0x9A] = op!("txs");
    opcodes[0x9B] = op!("txy");
    opcodes[0x9C] = op!("stz", Absolute);
    opcodes[0x9D] = op!("sta", AbsoluteX);
    opcodes[0x9E] = op!("stz", AbsoluteX);
    opcodes[0x9F] = op!("sta", AbsoluteLongX);
    opcodes[0xA0] = op!("ldy", ImmediateX);
    opcodes[0xA1] = op!("lda", DirectPageXIndirect);
    opcodes[0xA2] = op!("ldx", ImmediateX);
    opcodes[0xA3] = op!("lda", StackRelative);
    opcodes[0xA4] = op!("ldy", DirectPage);
    opcodes[0xA5] = op!("lda", DirectPage);
    opcodes[0xA6] = op!("ldx", DirectPage);
    opcodes[0xA7] = op!("lda", DirectPageIndirectLong);
    opcodes[0xA8] = op!("tay");
    opcodes[0xA9] = op!("lda", ImmediateM);
    opcodes[0xAA] = op!("tax");
    opcodes[0xAB] = op!("plb");
    opcodes[0xAC] = op!("ldy", Absolute);
    opcodes[0xAD] = op!("lda", Absolute);
    opcodes[0xAE] = op!("ldx", Absolute);
    opcodes[0xAF] = op!("lda", AbsoluteLong);
    opcodes[0xB0] = op!("bcs", Relative);
    opcodes[0xB1] = op!("lda", DirectPageIndirectY);
    opcodes[0xB2] = op!("lda", DirectPageIndirect);
    opcodes[0xB3] = op!("lda", StackRelativeY);
    opcodes[0xB4] = op!("ldy", DirectPageX);
    opcodes[0xB5] = op!("lda", DirectPageX);
    opcodes[0xB6] = op!("ldx", DirectPageY);
    opcodes[0xB7] = op!("lda", DirectPageIndirectLongY);
    opcodes[0xB8] = op!("clv");
    opcodes[0xB9] = op!("lda", AbsoluteY);
    opcodes[0xBA] = op!("tsx");
    opcodes[0xBB] = op!("tyx");
    opcodes[0xBC] = op!("ldy", AbsoluteX);
    opcodes[0xBD] = op!("lda", AbsoluteX);
    opcodes[0xBE] = op!("ldx", AbsoluteY);
    opcodes[0xBF] = op!("lda", AbsoluteLongX);
    opcodes[0xC0] = op!("cpy", ImmediateX);
    opcodes[0xC1] = op!("cmp", DirectPageXIndirect);
    opcodes[0xC2] = op!("rep", Rep);
    opcodes[0xC3] = op!("cmp", StackRelative);
    opcodes[0xC4] = op!("cpy", DirectPage);
    opcodes[0xC5] = op!("cmp", DirectPage);
    opcodes[0xC6] = op!("dec", DirectPage);
    opcodes[0xC7] = op!("cmp", DirectPageIndirectLong);
    opcodes[0xC8] = op!("iny");
    opcodes[0xC9] = op!("cmp", ImmediateM);
    opcodes[0xCA] = op!("dex");
    opcodes[0xCB] = op!("wai");
    opcodes[0xCC] = op!("cpy", Absolute);
    opcodes[0xCD] = op!("cmp", Absolute);
    opcodes[0xCE] = op!("dec", Absolute);
    opcodes[0xCF] = op!("cmp", AbsoluteLong);
    opcodes[0xD0] = op!("bne", Relative);
    opcodes[0xD1] = op!("cmp", DirectPageIndirectY);
    opcodes[0xD2] = op!("cmp", DirectPageIndirect);
    opcodes[0xD3] = op!("cmp", StackRelativeY);
    opcodes[0xD4] = op!("pei", DirectPageIndirect);
    opcodes[0xD5] = op!("cmp", DirectPageX);
    opcodes[0xD6] = op!("dec", DirectPageX);
    opcodes[0xD7] = op!("cmp", DirectPageIndirectLongY);
    opcodes[0xD8] = op!("cld");
    opcodes[0xD9] = op!("cmp", AbsoluteY);
    opcodes[0xDA] = op!("phx");
    opcodes[0xDB] = op!("stp");
    opcodes[0xDC] = op!("jmp", AbsoluteIndirectLong);
    opcodes[0xDD] = op!("cmp", AbsoluteX);
    opcodes[0xDE] = op!("dec", AbsoluteX);
    opcodes[0xDF] = op!("cmp", AbsoluteLongX);
    opcodes[0xE0] = op!("cpx", ImmediateX);
    opcodes[0xE1] = op!("sbc", DirectPageXIndirect);
    opcodes[0xE2] = op!("sep", Sep);
    opcodes[0xE3] = op!("sbc", StackRelative);
    opcodes[0xE4] = op!("cpx", DirectPage);
    opcodes[0xE5] = op!("sbc", DirectPage);
    opcodes[0xE6] = op!("inc", DirectPage);
    opcodes[0xE7] = op!("sbc", DirectPageIndirectLong);
    opcodes[0xE8] = op!("inx");
    opcodes[0xE9] = op!("sbc", ImmediateM);
    opcodes[0xEA] = op!("nop");
    opcodes[0xEB] = op!("xba");
    opcodes[0xEC] = op!("cpx", Absolute);
    opcodes[0xED] = op!("sbc", Absolute);
    opcodes[0xEE] = op!("inc", Absolute);
    opcodes[0xEF] = op!("sbc", AbsoluteLong);
    opcodes[0xF0] = op!("beq", Relative);
    opcodes[0xF1] = op!("sbc", DirectPageIndirectY);
    opcodes[0xF2] = op!("sbc", DirectPageIndirect);
    opcodes[0xF3] = op!("sbc", StackRelativeY);
    opcodes[0xF4] = op!("pea", Absolute);
    opcodes[0xF5] = op!("sbc", DirectPageX);
    opcodes[0xF6] = op!("inc", DirectPageX);
    opcodes[0xF7] = op!("sbc", DirectPageIndirectLongY);
    opcodes[0xF8] = op!("sed");
    opcodes[0xF9] = op!("sbc", AbsoluteY);
    opcodes[0xFA] = op!("plx");
    opcodes[0xFB] = op!("xce");
    opcodes[0xFC] = op!("jsr", AbsoluteIndexedIndirect);
    opcodes[0xFD] = op!("sbc", AbsoluteX);
    opcodes[0xFE] = op!("inc", AbsoluteX);
    opcodes[0xFF] = op!("sbc", AbsoluteLongX);

    opcodes[0x40].returns = true; // rti
    opcodes[0x60].returns = true; // rts
    opcodes[0x6B].returns = true; // rtl

    opcodes
}

lazy_static! {
    pub static ref OPCODE_TABLE: [OpcodeDef; 256] = build_opcode_table();
}

lazy_static! {
    /// Names and descriptions of the fixed SNES hardware registers that
    /// absolute operands substitute.
    pub static ref STATIC_ADDRESSES: HashMap<u16, (&'static str, &'static str)> = {
        let mut map: HashMap<u16, (&'static str, &'static str)> = [
            (0x2100, ("INIDSP", "Screen Display")),
            (0x2101, ("OBJSEL", "Object Size and Chr Address")),
            (0x2102, ("OAMADDL", "OAM Address Low Byte")),
            (0x2103, ("OAMADDH", "OAM Address High Byte")),
            (0x2104, ("OAMDATA", "Data for OAM write")),
            (0x2105, ("BGMODE", "BG Mode and Character Size")),
            (0x2106, ("MOSAIC", "Screen Pixelation")),
            (0x2107, ("BG1SC", "BG1 Tilemap Address and Size")),
            (0x2108, ("BG2SC", "BG2 Tilemap Address and Size")),
            (0x2109, ("BG3SC", "BG3 Tilemap Address and Size")),
            (0x210A, ("BG4SC", "BG4 Tilemap Address and Size")),
            (0x210B, ("BG12NBA", "BG1&2 Tilemap Character Address")),
            (0x210C, ("BG34NBA", "BG3&4 Tilemap Character Address")),
            (0x210D, ("BG1HOFS", "BG1 Horizontal Scroll / Mode 7 BG Horizontal Scroll")),
            (0x210E, ("BG1VOFS", "BG1 Vertical Scroll / Mode 7 BG Vertical Scroll")),
            (0x210F, ("BG2HOFS", "BG2 Horizontal Scroll")),
            (0x2110, ("BG2VOFS", "BG2 Vertical Scroll")),
            (0x2111, ("BG3HOFS", "BG3 Horizontal Scroll")),
            (0x2112, ("BG3VOFS", "BG3 Vertical Scroll")),
            (0x2113, ("BG4HOFS", "BG4 Horizontal Scroll")),
            (0x2114, ("BG4VOFS", "BG4 Vertical Scroll")),
            (0x2115, ("VMAIN", "Video Port Control")),
            (0x2116, ("VMADDL", "VRAM Address Low Byte")),
            (0x2117, ("VMADDH", "VRAM Address High Byte")),
            (0x2118, ("VMDATAL", "VRAM Data Write Low Byte")),
            (0x2119, ("VMDATAH", "VRAM Data Write High Byte")),
            (0x211A, ("M7SEL", "Mode 7 Settings")),
            (0x211B, ("M7A", "Mode 7 Matrix A")),
            (0x211C, ("M7B", "Mode 7 Matrix B")),
            (0x211D, ("M7C", "Mode 7 Matrix C")),
            (0x211E, ("M7D", "Mode 7 Matrix D")),
            (0x211F, ("M7X", "Mode 7 Center X")),
            (0x2120, ("M7Y", "Mode 7 Center Y")),
            (0x2121, ("CGADD", "CGRAM Address")),
            (0x2122, ("CGDATA", "CGRAM Data Write")),
            (0x2123, ("W12SEL", "Window Mask Settings for BG1 and BG2")),
            (0x2124, ("W34SEL", "Window Mask Settings for BG3 and BG4")),
            (0x2125, ("WOBJSEL", "Window Mask Settings for Objects and Color Window")),
            (0x2126, ("W1L", "Window 1 Left Position")),
            (0x2127, ("W1R", "Window 1 Right Position")),
            (0x2128, ("W2L", "Window 2 Left Position")),
            (0x2129, ("W2R", "Window 2 Right Position")),
            (0x212A, ("WBGLOG", "Window Mask Logic for Backgrounds")),
            (0x212B, ("WOBJLOG", "Window Mask Logic for Objects and Color Window")),
            (0x212C, ("TMAIN", "Mainscreen Designation")),
            (0x212D, ("TSUB", "Subscreen Designation")),
            (0x212E, ("TMW", "Window Mask Designation for the Main Screen")),
            (0x212F, ("TSW", "Window Mask Designation for the Subscreen")),
            (0x2130, ("CGWSEL", "Color Addition Select")),
            (0x2131, ("CGADSUB", "Color Math Designation")),
            (0x2132, ("COLDATA", "Fixed Color Data")),
            (0x2133, ("SETINI", "Screen Mode/Video Select")),
            (0x2134, ("MPYL", "Multiplication Result Low Byte")),
            (0x2135, ("MPYM", "Multiplication Result Middle Byte")),
            (0x2136, ("MPYH", "Multiplication Result High Byte")),
            (0x2137, ("SLHV", "Software Latch for H/V Counter")),
            (0x2138, ("OAMDATAREAD", "Data for OAM read")),
            (0x2139, ("VMDATALREAD", "VRAM Data Read Low Byte")),
            (0x213A, ("VMDATAHREAD", "VRAM Data Read High Byte")),
            (0x213B, ("CGDATAREAD", "CGRAM Data Read")),
            (0x213C, ("OPHCT", "Horizontal Scanline Location")),
            (0x213D, ("OPVCT", "Vertical Scanline Location")),
            (0x213E, ("STAT77", "5C77 PPU-1 Status Flag and Version")),
            (0x213F, ("STAT78", "5C78 PPU-2 Status Flag and Version")),
            (0x2140, ("APUIO0", "APU I/O Port 0")),
            (0x2141, ("APUIO1", "APU I/O Port 1")),
            (0x2142, ("APUIO2", "APU I/O Port 2")),
            (0x2143, ("APUIO3", "APU I/O Port 3")),
            (0x2180, ("WMDATA", "WRAM Data Read/Write")),
            (0x2181, ("WMADDL", "WRAM Address Low Byte")),
            (0x2182, ("WMADDM", "WRAM Address Middle Byte")),
            (0x2183, ("WMADDH", "WRAM Address High Byte")),
            (0x4016, ("JOYSER0", "Joypad Port 1")),
            (0x4017, ("JOYSER1", "Joypad Port 2")),
            (0x4200, ("NMITIMEN", "Interrupt Enable Flags")),
            (0x4201, ("WRIO", "I/O port output/write")),
            (0x4202, ("WRMPYA", "Multiplicand A")),
            (0x4203, ("WRMPYB", "Multiplier B")),
            (0x4204, ("WRDIVL", "Dividend Low Byte")),
            (0x4205, ("WRDIVH", "Dividend High Byte")),
            (0x4206, ("WRDIVB", "Divisor")),
            (0x4207, ("HTIMEL", "H-Count Timer")),
            (0x4208, ("HTIMEH", "H-Count Timer MSB")),
            (0x4209, ("VTIMEL", "V-Count Timer")),
            (0x420A, ("VTIMEH", "V-Count Timer MSB")),
            (0x420B, ("MDMAEN", "DMA Channel Enable")),
            (0x420C, ("HDMAEN", "HDMA Channel Enable")),
            (0x420D, ("MEMSEL", "ROM Access Speed")),
            (0x4210, ("RDNMI", "NMI Flag and 5A22 Version")),
            (0x4211, ("TIMEUP", "IRQ Flag")),
            (0x4212, ("HVBJOY", "H/V Blank Flags and Joypad Status")),
            (0x4213, ("RDIO", "I/O port input/read")),
            (0x4214, ("RDDIVL", "Quotient of Divide Result Low Byte")),
            (0x4215, ("RDDIVH", "Quotient of Divide Result High Byte")),
            (0x4216, ("RDMPYL", "Multiplication Product or Divide Remainder Low Byte")),
            (0x4217, ("RDMPYH", "Multiplication Product or Divide Remainder High Byte")),
            (0x4218, ("JOY1L", "Joyport1 Data Low Byte")),
            (0x4219, ("JOY1H", "Joyport1 Data High Byte")),
            (0x421A, ("JOY2L", "Joyport2 Data Low Byte")),
            (0x421B, ("JOY2H", "Joyport2 Data High Byte")),
            (0x421C, ("JOY3L", "Joyport3 Data Low Byte")),
            (0x421D, ("JOY3H", "Joyport3 Data High Byte")),
            (0x421E, ("JOY4L", "Joyport4 Data Low Byte")),
            (0x421F, ("JOY4H", "Joyport4 Data High Byte")),
        ]
        .into_iter()
        .collect();

        map.extend(dma_registers());
        map
    };
}

/// DMA channel registers $43x0-$43xA for channels 0-7.
fn dma_registers() -> Vec<(u16, (&'static str, &'static str))> {
    let mut regs = Vec::new();
    for channel in 0u16..8 {
        let base = 0x4300 + channel * 0x10;
        let names: [(&'static str, &'static str); 11] = [
            ("DMAP", "Control"),
            ("DMADEST", "Destination Register"),
            ("DMASRCL", "Source Address Low Byte"),
            ("DMASRCH", "Source Address High Byte"),
            ("DMASRCB", "Source Address Bank"),
            ("DMALENL", "Transfer Size Low Byte"),
            ("DMALENH", "Transfer Size High Byte"),
            ("DMALENB", "Transfer Bank"),
            ("HDMATBLL", "HDMA Table Address Low Byte"),
            ("HDMATBLH", "HDMA Table Address High Byte"),
            ("HDMACNT", "HDMA Line Counter"),
        ];
        for (i, (stem, what)) in names.into_iter().enumerate() {
            let name: &'static str =
                Box::leak(format!("{stem}{channel}").into_boxed_str());
            let comment: &'static str =
                Box::leak(format!("DMA {channel} {what}").into_boxed_str());
            regs.push((base + i as u16, (name, comment)));
        }
    }
    regs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sizes_match_modes() {
        assert_eq!(INSTRUCTION_SIZES[0x60], 1); // rts
        assert_eq!(INSTRUCTION_SIZES[0xA9], 2); // lda immediate, 8-bit base
        assert_eq!(INSTRUCTION_SIZES[0x22], 4); // jsr long
        assert_eq!(INSTRUCTION_SIZES[0x5C], 4); // jmp long
        assert_eq!(INSTRUCTION_SIZES[0xF4], 3); // pea
    }

    #[test]
    fn test_table_entries() {
        let table = build_opcode_table();
        assert_eq!(table[0x60].mnemonic, "rts");
        assert!(table[0x60].returns);
        assert_eq!(table[0xA9].mode, AddressMode::ImmediateM);
        assert_eq!(table[0xA2].mode, AddressMode::ImmediateX);
        assert_eq!(table[0x5C].mode, AddressMode::JumpLong);
        assert_eq!(table[0x44].mnemonic, "mvp");
    }

    #[test]
    fn test_static_addresses() {
        assert_eq!(STATIC_ADDRESSES[&0x2100].0, "INIDSP");
        assert_eq!(STATIC_ADDRESSES[&0x4218].0, "JOY1L");
        assert_eq!(STATIC_ADDRESSES[&0x4300].0, "DMAP0");
        assert_eq!(STATIC_ADDRESSES[&0x437A].0, "HDMACNT7");
    }
}
