//! Cartridge image loading, map mode detection and address translation.
use std::path::Path;

use intbits::Bits;
use log::info;
use packed_struct::prelude::*;

use crate::error::DisasmError;

/// Forced map-mode settings, normally left at `None` for auto detection.
#[derive(Clone, Copy, Debug, Default)]
pub struct CartOptions {
    pub hirom: Option<bool>,
    pub fastrom: Option<bool>,
}

pub struct Cartridge {
    data: Vec<u8>,
    pub hirom: bool,
    pub fastrom: bool,
    pub extended: bool,
    pub header_offset: u32,
    pub header: SnesHeader,
    pub vectors: Vectors,
    base_address: u32,
}

impl Cartridge {
    pub fn open(path: &Path) -> Result<Cartridge, DisasmError> {
        Self::open_with_options(path, CartOptions::default())
    }

    pub fn open_with_options(path: &Path, options: CartOptions) -> Result<Cartridge, DisasmError> {
        let data = std::fs::read(path)?;
        Self::with_data_and_options(data, options)
    }

    pub fn with_data(data: Vec<u8>) -> Result<Cartridge, DisasmError> {
        Self::with_data_and_options(data, CartOptions::default())
    }

    pub fn with_data_and_options(
        mut data: Vec<u8>,
        options: CartOptions,
    ) -> Result<Cartridge, DisasmError> {
        // A 0x200 byte copier header throws the size off the 32 kB grid.
        if data.len() & 0x2FF == 0x200 {
            data.drain(0..0x200);
        }
        let size = data.len();
        if size < 0x8000 {
            return Err(DisasmError::InvalidRomImage(format!(
                "{size} bytes is too small to be a rom image"
            )));
        }
        if size & 0x7FFF != 0 {
            return Err(DisasmError::InvalidRomImage(format!(
                "{size} bytes is not a whole number of banks"
            )));
        }

        let extended = size > 0x400000;
        let score_base = if extended { 0x400000 } else { 0 };

        let hirom = match options.hirom {
            Some(forced) => forced,
            None => {
                let hi_score = score_hirom(&data, score_base);
                let lo_score = score_lorom(&data, score_base);
                hi_score >= lo_score
            }
        };
        let map_mode_offset = if hirom { 0xFFD5 } else { 0x7FD5 };
        let fastrom = match options.fastrom {
            Some(forced) => forced,
            None => data
                .get(map_mode_offset)
                .copied()
                .unwrap_or_default()
                .bit(5),
        };

        let header_offset = score_base as u32 + if hirom { 0xFFB0 } else { 0x7FB0 };
        if header_offset as usize + 80 > size {
            return Err(DisasmError::InvalidRomImage(
                "rom image too small to hold an internal header".to_string(),
            ));
        }
        let header = SnesHeader::parse(&data[header_offset as usize..header_offset as usize + 48]);
        let vectors =
            Vectors::parse(&data[header_offset as usize + 48..header_offset as usize + 80]);

        let cart = Cartridge {
            data,
            hirom,
            fastrom,
            extended,
            header_offset,
            header,
            vectors,
            base_address: if extended { 0x400000 } else { 0x008000 },
        };

        let kind = format!(
            "{}{}",
            if cart.extended { "Ext" } else { "" },
            if cart.hirom { "HiROM" } else { "LoROM" }
        );
        let tv = if (2..=12).contains(&cart.header.country) {
            "PAL"
        } else {
            "NTSC"
        };
        info!(
            "Detected: {}[0x{:X}] ROMID:{} Type:{} TV:{} CheckSum:{:04x}",
            kind,
            cart.size(),
            cart.header.title,
            cart.map_type(),
            tv,
            cart.header.check_sum
        );
        Ok(cart)
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    pub fn bank_size(&self) -> u32 {
        if self.hirom {
            0x10000
        } else {
            0x8000
        }
    }

    pub fn bank_count(&self) -> u32 {
        self.data.len() as u32 / self.bank_size()
    }

    /// Translate a rom offset into its canonical 24-bit SNES address.
    pub fn address(&self, offset: u32) -> u32 {
        if self.hirom {
            self.base_address + offset
        } else {
            ((offset & 0xFF8000) << 1) + (offset & 0x7FFF) + self.base_address
        }
    }

    /// Translate a 24-bit SNES address back into a rom offset.
    pub fn index(&self, address: u32) -> Result<u32, DisasmError> {
        if address < 0x8000 {
            return Err(DisasmError::AddressOutOfRange(address));
        }
        if !self.hirom && address & 0x8000 == 0 {
            return Err(DisasmError::AddressOutOfRange(address));
        }
        let mapped = if self.hirom {
            address & 0x7FFFFF
        } else {
            ((address & 0x7F0000) >> 1) + (address & 0x7FFF)
        };
        if mapped > self.size() as u32 {
            return Err(DisasmError::AddressOutOfRange(address));
        }
        Ok(mapped & (self.size() as u32 - 1))
    }

    pub fn slice(&self, start: u32, end: u32) -> &[u8] {
        let start = (start as usize).min(self.data.len());
        let end = (end as usize).min(self.data.len());
        &self.data[start..end]
    }

    pub fn map_type(&self) -> &'static str {
        match self.header.cart_type {
            0 => "ROM",
            1 => "ROM+RAM",
            2 => "ROM+RAM+BAT",
            _ => "Unknown",
        }
    }
}

impl std::ops::Index<u32> for Cartridge {
    type Output = u8;

    fn index(&self, index: u32) -> &u8 {
        &self.data[index as usize]
    }
}

/// The parsed 48 byte internal header record.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SnesHeader {
    pub maker_code: u16,
    pub game_code: [u8; 4],
    pub expand_ram: u8,
    pub version: u8,
    pub sub_type: u8,
    pub title: String,
    pub map_mode: u8,
    pub cart_type: u8,
    pub rom_size: u8,
    pub sram_size: u8,
    pub country: u8,
    pub license_code: u8,
    pub rom_mask: u8,
    pub comp_check: u16,
    pub check_sum: u16,
}

impl SnesHeader {
    fn parse(data: &[u8]) -> SnesHeader {
        let raw = RawSnesHeader::unpack_from_slice(&data[0..48]).unwrap();
        SnesHeader {
            maker_code: raw.maker_code,
            game_code: raw.game_code,
            expand_ram: raw.expand_ram,
            version: raw.version,
            sub_type: raw.sub_type,
            title: String::from_utf8_lossy(&raw.title)
                .trim_end_matches(|c| c == ' ' || c == '\0')
                .to_string(),
            map_mode: raw.map_mode,
            cart_type: raw.cart_type,
            rom_size: raw.rom_size,
            sram_size: raw.sram_size,
            country: raw.country,
            license_code: raw.license_code,
            rom_mask: raw.rom_mask,
            comp_check: raw.comp_check,
            check_sum: raw.check_sum,
        }
    }
}

/// The 32 byte interrupt vector table that follows the header.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Vectors {
    pub nvec_cop: u16,
    pub nvec_brk: u16,
    pub nvec_abort: u16,
    pub nvec_nmi: u16,
    pub nvec_reset: u16,
    pub nvec_irq: u16,
    pub evec_cop: u16,
    pub evec_unused: u16,
    pub evec_abort: u16,
    pub evec_nmi: u16,
    pub evec_reset: u16,
    pub evec_irq: u16,
}

impl Vectors {
    fn parse(data: &[u8]) -> Vectors {
        let raw = RawVectors::unpack_from_slice(&data[0..32]).unwrap();
        Vectors {
            nvec_cop: raw.nvec_cop,
            nvec_brk: raw.nvec_brk,
            nvec_abort: raw.nvec_abort,
            nvec_nmi: raw.nvec_nmi,
            nvec_reset: raw.nvec_reset,
            nvec_irq: raw.nvec_irq,
            evec_cop: raw.evec_cop,
            evec_unused: raw.evec_unused,
            evec_abort: raw.evec_abort,
            evec_nmi: raw.evec_nmi,
            evec_reset: raw.evec_reset,
            evec_irq: raw.evec_irq,
        }
    }

    /// All vectors that may point at code, in header order.
    pub fn code_vectors(&self) -> [u16; 12] {
        [
            self.nvec_cop,
            self.nvec_brk,
            self.nvec_abort,
            self.nvec_nmi,
            self.nvec_reset,
            self.nvec_irq,
            self.evec_cop,
            self.evec_unused,
            self.evec_abort,
            self.evec_nmi,
            self.evec_reset,
            self.evec_irq,
        ]
    }
}

#[derive(PackedStruct, Clone, Debug, Default, PartialEq, Eq)]
#[packed_struct(bit_numbering = "msb0", endian = "lsb")]
struct RawSnesHeader {
    maker_code: u16,
    game_code: [u8; 4],
    fixed: [u8; 7],
    expand_ram: u8,
    version: u8,
    sub_type: u8,
    title: [u8; 21],
    map_mode: u8,
    cart_type: u8,
    rom_size: u8,
    sram_size: u8,
    country: u8,
    license_code: u8,
    rom_mask: u8,
    comp_check: u16,
    check_sum: u16,
}

#[derive(PackedStruct, Clone, Debug, Default, PartialEq, Eq)]
#[packed_struct(bit_numbering = "msb0", endian = "lsb")]
struct RawVectors {
    nvec_unused: u32,
    nvec_cop: u16,
    nvec_brk: u16,
    nvec_abort: u16,
    nvec_nmi: u16,
    nvec_reset: u16,
    nvec_irq: u16,
    evec_unused_long: u32,
    evec_cop: u16,
    evec_unused: u16,
    evec_abort: u16,
    evec_nmi: u16,
    evec_reset: u16,
    evec_irq: u16,
}

fn score_hirom(data: &[u8], base: usize) -> i32 {
    let b = |i: usize| -> i32 { data.get(base + i).copied().unwrap_or(0) as i32 };
    let mut score = 0;
    if b(0xFFDC) + b(0xFFDD) * 256 + b(0xFFDE) + b(0xFFDF) * 256 == 0xFFFF {
        score += 2;
    }
    if b(0xFFDA) == 0x33 {
        score += 2;
    }
    if b(0xFFD5) & 0xF < 4 {
        score += 2;
    }
    if b(0xFFFD) & 0x80 == 0 {
        score -= 4;
    }
    if (b(0xFFD7) - 7).abs() > 5 {
        score -= 1;
    }
    if !all_ascii(data, base + 0xFFB0, base + 0xFFB6) {
        score -= 1;
    }
    if !all_ascii(data, base + 0xFFC0, base + 0xFFD4) {
        score -= 1;
    }
    score
}

fn score_lorom(data: &[u8], base: usize) -> i32 {
    let b = |i: usize| -> i32 { data.get(base + i).copied().unwrap_or(0) as i32 };
    let mut score = 0;
    if b(0x7FDC) + b(0x7FDD) * 256 + b(0x7FDE) + b(0x7FDF) * 256 == 0xFFFF {
        score += 2;
    }
    if b(0x7FDA) == 0x33 {
        score += 2;
    }
    if b(0x7FD5) & 0xF < 4 {
        score += 2;
    }
    if b(0x7FFD) & 0x80 == 0 {
        score -= 4;
    }
    if (b(0x7FD7) - 7).abs() > 5 {
        score -= 1;
    }
    if !all_ascii(data, base + 0xFFB0, base + 0xFFB6) {
        score -= 1;
    }
    if !all_ascii(data, base + 0xFFC0, base + 0xFFD4) {
        score -= 1;
    }
    score
}

fn all_ascii(data: &[u8], start: usize, end: usize) -> bool {
    let start = start.min(data.len());
    let end = end.min(data.len());
    data[start..end].iter().all(|&c| (32..=126).contains(&c))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    /// Build a minimal 32 kB LoROM image with a plausible internal header.
    pub fn lorom_image(reset_vector: u16) -> Vec<u8> {
        let mut data = vec![0u8; 0x8000];
        for i in 0x7FC0..0x7FD5 {
            data[i] = b' ';
        }
        data[0x7FD5] = 0x20; // map mode
        data[0x7FD7] = 0x08; // rom size
        data[0x7FDA] = 0x33; // license
        data[0x7FDC] = 0xFF; // complement
        data[0x7FDD] = 0xFF;
        data[0x7FDE] = 0x00; // checksum
        data[0x7FDF] = 0x00;
        data[0x7FFC] = (reset_vector & 0xFF) as u8;
        data[0x7FFD] = (reset_vector >> 8) as u8;
        data
    }

    #[test]
    fn test_detect_lorom() {
        let cart = Cartridge::with_data(lorom_image(0x8000)).unwrap();
        assert!(!cart.hirom);
        assert!(!cart.extended);
        assert_eq!(cart.header_offset, 0x7FB0);
        assert_eq!(cart.bank_size(), 0x8000);
        assert_eq!(cart.bank_count(), 1);
        assert_eq!(cart.vectors.evec_reset, 0x8000);
    }

    #[test]
    fn test_detect_lorom_random_reset_vectors() {
        // Detection must not depend on the reset vector value as long as the
        // high bit stays set.
        for vector in [0x8000u16, 0x9123, 0xABCD, 0xFFFE] {
            let cart = Cartridge::with_data(lorom_image(vector)).unwrap();
            assert!(!cart.hirom);
        }
    }

    #[test]
    fn test_copier_header_is_stripped() {
        let mut data = vec![0u8; 0x200];
        data.extend(lorom_image(0x8000));
        let cart = Cartridge::with_data(data).unwrap();
        assert_eq!(cart.size(), 0x8000);
        assert!(!cart.hirom);
    }

    #[test]
    fn test_invalid_sizes() {
        assert!(Cartridge::with_data(vec![0; 0x4000]).is_err());
        assert!(Cartridge::with_data(vec![0; 0x8000 + 5]).is_err());
    }

    #[test]
    fn test_lorom_address_mapping() {
        let cart = Cartridge::with_data(lorom_image(0x8000)).unwrap();
        assert_eq!(cart.address(0), 0x008000);
        assert_eq!(cart.address(0x7FFF), 0x00FFFF);
        assert_eq!(cart.index(0x008000).unwrap(), 0);
        assert_eq!(cart.index(0x00FFFF).unwrap(), 0x7FFF);
        assert!(cart.index(0x004000).is_err());
    }

    #[test]
    fn test_address_index_inverse() {
        let cart = Cartridge::with_data(lorom_image(0x8000)).unwrap();
        for offset in (0..cart.size() as u32).step_by(0x111) {
            assert_eq!(cart.index(cart.address(offset)).unwrap(), offset);
        }
    }

    #[test]
    fn test_forced_map_mode() {
        let options = CartOptions {
            hirom: Some(true),
            fastrom: Some(true),
        };
        let cart = Cartridge::with_data_and_options(vec![0; 0x10000], options).unwrap();
        assert!(cart.hirom);
        assert!(cart.fastrom);
        assert_eq!(cart.header_offset, 0xFFB0);
    }
}
