//! Writes the disassembled project to disk: assembly, header, decoder side
//! files and a minimal WLA-DX build setup. All file I/O lives here; the
//! engine itself only produces in-memory artifacts.
use std::path::Path;

use anyhow::Context;
use anyhow::Result;
use log::info;

use crate::cartridge::Cartridge;
use crate::disasm::Disassembler;

pub struct ProjectWriter<'a> {
    cart: &'a Cartridge,
    disasm: &'a Disassembler<'a>,
}

impl<'a> ProjectWriter<'a> {
    pub fn new(cart: &'a Cartridge, disasm: &'a Disassembler<'a>) -> Self {
        ProjectWriter { cart, disasm }
    }

    pub fn output(&self, dir: &Path) -> Result<()> {
        info!("Writing project files...");
        std::fs::create_dir_all(dir)
            .with_context(|| format!("creating {}", dir.display()))?;

        self.write(dir, "hdr.asm", self.header_asm().as_bytes())?;
        let game = format!(".INCLUDE \"hdr.asm\"\n\n{}", self.disasm.assembly());
        self.write(dir, "game.asm", game.as_bytes())?;
        self.write(dir, "Makefile", MAKEFILE.as_bytes())?;
        self.write(dir, "linkfile", LINKFILE.as_bytes())?;

        for (name, data) in self.disasm.files() {
            self.write(dir, name, data)?;
        }
        Ok(())
    }

    fn write(&self, dir: &Path, name: &str, data: &[u8]) -> Result<()> {
        let path = dir.join(name);
        std::fs::write(&path, data).with_context(|| format!("writing {}", path.display()))
    }

    /// The memory map, rom banking and SNES header blocks plus the vector
    /// tables, with vectors resolved to labels where they point at code.
    fn header_asm(&self) -> String {
        let header = &self.cart.header;
        let vectors = &self.cart.vectors;
        let bank_size = self.cart.bank_size();
        let bank_count = self.cart.bank_count();
        let map = if self.cart.extended {
            if self.cart.hirom {
                "EXHIROM"
            } else {
                "EXLOROM ; unsupported map type"
            }
        } else if self.cart.hirom {
            "HIROM"
        } else {
            "LOROM"
        };
        let speed = if self.cart.fastrom {
            "FASTROM"
        } else {
            "SLOWROM"
        };
        let org = if self.cart.hirom { 0 } else { 0x8000 };

        let mut out = String::new();
        out.push_str(&format!(
            ".MEMORYMAP\nDEFAULTSLOT 0\nSLOTSIZE ${bank_size:04X}\nSLOT 0 ${org:04X}\n.ENDME\n\n"
        ));
        out.push_str(&format!(
            ".ROMBANKMAP\nBANKSTOTAL {bank_count}\nBANKSIZE ${bank_size:04X}\nBANKS {bank_count}\n.ENDRO\n\n"
        ));
        out.push_str(&format!(
            ".SNESHEADER\nID \"SNES\"\nNAME \"{:<21}\"\n{speed}\n{map}\nCARTRIDGETYPE ${:02X}\nROMSIZE ${:02X}\nSRAMSIZE ${:02X}\nCOUNTRY ${:02X}\nLICENSEECODE ${:02X}\nVERSION ${:02X}\n.ENDSNES\n\n",
            header.title, header.cart_type, header.rom_size, header.sram_size,
            header.country, header.license_code, header.version
        ));
        out.push_str(&format!(
            ".SNESNATIVEVECTOR\nCOP {}\nBRK {}\nABORT {}\nNMI {}\nUNUSED $0000\nIRQ {}\n.ENDNATIVEVECTOR\n\n",
            self.vector(vectors.nvec_cop),
            self.vector(vectors.nvec_brk),
            self.vector(vectors.nvec_abort),
            self.vector(vectors.nvec_nmi),
            self.vector(vectors.nvec_irq)
        ));
        out.push_str(&format!(
            ".SNESEMUVECTOR\nCOP {}\nABORT {}\nNMI {}\nRESET {}\nIRQBRK {}\n.ENDEMUVECTOR\n",
            self.vector(vectors.evec_cop),
            self.vector(vectors.evec_abort),
            self.vector(vectors.evec_nmi),
            self.vector(vectors.evec_reset),
            self.vector(vectors.evec_irq)
        ));
        out
    }

    fn vector(&self, address: u16) -> String {
        if address >= 0x8000 {
            if let Ok(offset) = self.cart.index(address as u32) {
                if let Some(name) = self.disasm.labels().get(&offset) {
                    return name.clone();
                }
            }
        }
        format!("${address:04X}")
    }
}

static MAKEFILE: &str = "all: game.sfc

game.o: game.asm hdr.asm
\twla-65816 -o game.o game.asm

game.sfc: game.o
\twlalink -S linkfile game.sfc

clean:
\trm -f game.o game.sfc
";

static LINKFILE: &str = "[objects]
game.o
";

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::cartridge::Cartridge;
    use crate::decoder::Decoder;
    use crate::disasm::Disassembler;

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
        data[0] = 0x60; // rts at the reset target
        data
    }

    #[test]
    fn test_project_layout() {
        let cart = Cartridge::with_data(lorom_image()).unwrap();
        let mut disasm = Disassembler::new(&cart);
        disasm
            .add_decoder(Decoder::binary("blob", 0x1000, 0x1010, None))
            .unwrap();
        disasm.run().unwrap();

        let dir = tempfile::tempdir().unwrap();
        ProjectWriter::new(&cart, &disasm)
            .output(dir.path())
            .unwrap();

        for name in ["game.asm", "hdr.asm", "Makefile", "linkfile", "blob.bin"] {
            assert!(dir.path().join(name).exists(), "missing {name}");
        }
        let blob = std::fs::read(dir.path().join("blob.bin")).unwrap();
        assert_eq!(blob.len(), 0x10);

        let hdr = std::fs::read_to_string(dir.path().join("hdr.asm")).unwrap();
        assert!(hdr.contains("LOROM"));
        assert!(hdr.contains("RESET L008000"));

        let game = std::fs::read_to_string(dir.path().join("game.asm")).unwrap();
        assert!(game.starts_with(".INCLUDE \"hdr.asm\""));
        assert!(game.contains(".SECTION \"Bank0\" FORCE"));
    }
}
