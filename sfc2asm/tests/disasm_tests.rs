use pretty_assertions::assert_eq;
use sfc2asm::cartridge::Cartridge;
use sfc2asm::codec::Codec;
use sfc2asm::decoder::Decoder;
use sfc2asm::decoder::GraphicOptions;
use sfc2asm::decoder::TextOptions;
use sfc2asm::disasm::Disassembler;

/// 32 kB LoROM image with a plausible internal header.
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

/// 64 kB HiROM image with a plausible internal header.
fn hirom_image() -> Vec<u8> {
    let mut data = vec![0u8; 0x10000];
    for i in 0xFFC0..0xFFD5 {
        data[i] = b' ';
    }
    for i in 0xFFB0..0xFFB6 {
        data[i] = b' ';
    }
    data[0xFFD5] = 0x21;
    data[0xFFD7] = 0x08;
    data[0xFFDA] = 0x33;
    data[0xFFDC] = 0xFF;
    data[0xFFDD] = 0xFF;
    data[0xFFFC] = 0x00;
    data[0xFFFD] = 0x80;
    data
}

#[test]
fn test_lorom_with_single_rts() {
    let mut data = lorom_image();
    data[0] = 0x60; // rts at the reset target
    let cart = Cartridge::with_data(data).unwrap();
    assert!(!cart.hirom);

    let mut disasm = Disassembler::new(&cart);
    disasm.run().unwrap();

    let instruction = disasm.code().get(0).unwrap();
    assert_eq!(instruction.code, "rts");
    assert!(instruction.returns);
    assert_eq!(disasm.labels().get(&0).map(String::as_str), Some("L008000"));
    assert!(disasm.valid_label(0));
    assert!(disasm.assembly().contains("L008000:\n\trts"));
}

#[test]
fn test_hirom_palette_decoder() {
    let mut data = hirom_image();
    for (i, byte) in (0x1000..0x1010).enumerate() {
        data[byte] = (i * 7) as u8;
    }
    let cart = Cartridge::with_data(data).unwrap();
    assert!(cart.hirom);

    let mut disasm = Disassembler::new(&cart);
    disasm
        .add_decoder(Decoder::palette("pal0", 0x1000, 0x1010).unwrap())
        .unwrap();
    disasm.run().unwrap();

    let instruction = disasm.code().get(0x1000).unwrap();
    assert_eq!(instruction.code, ".INCBIN \"pal0.pal\"");
    assert_eq!(instruction.preamble.as_deref(), Some("pal0:"));
    assert_eq!(disasm.data_labels().get(&0x1000).map(String::as_str), Some("pal0"));

    let files: std::collections::BTreeMap<&String, &Vec<u8>> = disasm.files().collect();
    let pal = files.iter().find(|(name, _)| name.as_str() == "pal0.pal");
    assert_eq!(pal.unwrap().1.len(), 16);
    let rgb = files
        .iter()
        .find(|(name, _)| name.as_str() == "pal0.rgb")
        .unwrap();
    let rgb_text = String::from_utf8(rgb.1.to_vec()).unwrap();
    assert_eq!(rgb_text.lines().count(), 8);
    assert!(rgb_text.lines().all(|line| line.starts_with('#')));
}

#[test]
fn test_compressed_binary_artifacts() {
    let mut data = lorom_image();
    // A small lz2 stream: fill 0x20 bytes of $AB, terminator.
    let payload = Codec::Lz2.compress(&[0xAB; 0x20]).unwrap();
    let end = 0x1000 + payload.len() as u32;
    data[0x1000..end as usize].copy_from_slice(&payload);

    let cart = Cartridge::with_data(data).unwrap();
    let mut disasm = Disassembler::new(&cart);
    disasm
        .add_decoder(Decoder::binary("blob", 0x1000, end, Some(Codec::Lz2)))
        .unwrap();
    disasm.run().unwrap();

    let instruction = disasm.code().get(0x1000).unwrap();
    assert_eq!(instruction.code, ".INCBIN \"blob.bin.lz2\"");

    let files: Vec<(&String, &Vec<u8>)> = disasm.files().collect();
    let unpacked = files.iter().find(|(n, _)| n.as_str() == "blob.bin").unwrap();
    assert_eq!(unpacked.1.as_slice(), &[0xAB; 0x20]);
    let packed = files
        .iter()
        .find(|(n, _)| n.as_str() == "blob.bin.lz2")
        .unwrap();
    assert_eq!(packed.1.as_slice(), payload.as_slice());
}

#[test]
fn test_text_decoder_with_pack() {
    let mut data = lorom_image();
    data[0x1000..0x1005].copy_from_slice(b"HELLO");
    data[0x1005..0x1008].copy_from_slice(b"SFC");
    let cart = Cartridge::with_data(data).unwrap();

    let mut disasm = Disassembler::new(&cart);
    let options = TextOptions {
        pack: Some(vec![5, 3]),
        ..Default::default()
    };
    disasm
        .add_decoder(Decoder::text("greeting", 0x1000, 0, options).unwrap())
        .unwrap();
    disasm.run().unwrap();

    let first = disasm.code().get(0x1000).unwrap();
    assert_eq!(first.code, ".db \"HELLO\"");
    assert_eq!(first.preamble.as_deref(), Some("greeting_0:"));
    let second = disasm.code().get(0x1005).unwrap();
    assert_eq!(second.code, ".db \"SFC\"");
    assert_eq!(second.preamble.as_deref(), Some("greeting_1:"));
}

#[test]
fn test_text_decoder_with_index() {
    let mut data = lorom_image();
    data[0x1000..0x1006].copy_from_slice(b"ABCDEF");
    // Index entries: 0, 2, 4 into the text range.
    data[0x2000..0x2006].copy_from_slice(&[0x00, 0x00, 0x02, 0x00, 0x04, 0x00]);
    let cart = Cartridge::with_data(data).unwrap();

    let mut disasm = Disassembler::new(&cart);
    let index = disasm
        .add_decoder(Decoder::index("script_idx", 0x2000, 0x2006, 2).unwrap())
        .unwrap();
    let options = TextOptions {
        index: Some(index),
        ..Default::default()
    };
    disasm
        .add_decoder(Decoder::text("script", 0x1000, 0x1006, options).unwrap())
        .unwrap();
    disasm.run().unwrap();

    assert_eq!(disasm.code().get(0x1000).unwrap().code, ".db \"AB\"");
    assert_eq!(disasm.code().get(0x1002).unwrap().code, ".db \"CD\"");
    assert_eq!(disasm.code().get(0x1004).unwrap().code, ".db \"EF\"");
    assert_eq!(
        disasm.code().get(0x2002).unwrap().code,
        ".dw script_1 - script_0"
    );
}

#[test]
fn test_translation_stringmap() {
    let mut data = lorom_image();
    data[0x1000] = 0x41;
    data[0x1001] = 0x42;
    let cart = Cartridge::with_data(data).unwrap();

    let mut disasm = Disassembler::new(&cart);
    let mut table = std::collections::BTreeMap::new();
    table.insert(0x41u8, "hero".to_string());
    let translation = disasm
        .add_decoder(Decoder::translation("dialog", table))
        .unwrap();
    let options = TextOptions {
        translation: Some(translation),
        ..Default::default()
    };
    disasm
        .add_decoder(Decoder::text("intro", 0x1000, 0x1002, options).unwrap())
        .unwrap();
    disasm.run().unwrap();

    let instruction = disasm.code().get(0x1000).unwrap();
    assert_eq!(instruction.code, ".STRINGMAP dialog \"heroB\"");
    assert!(disasm.assembly().contains(".STRINGMAPTABLE dialog \"dialog.tbl\""));
    let files: Vec<(&String, &Vec<u8>)> = disasm.files().collect();
    assert!(files.iter().any(|(n, _)| n.as_str() == "dialog.tbl"));
}

#[test]
fn test_graphic_with_palette() {
    let mut data = lorom_image();
    // 16 colors of palette data and one 4bpp tile.
    for i in 0..32 {
        data[0x1000 + i] = i as u8;
    }
    for i in 0..32 {
        data[0x2000 + i] = 0xFF;
    }
    let cart = Cartridge::with_data(data).unwrap();

    let mut disasm = Disassembler::new(&cart);
    let palette = disasm
        .add_decoder(Decoder::palette("tiles_pal", 0x1000, 0x1020).unwrap())
        .unwrap();
    let options = GraphicOptions {
        bit_depth: 4,
        width: 8,
        palette: Some(palette),
        ..Default::default()
    };
    disasm
        .add_decoder(Decoder::graphic("tiles", 0x2000, 0x2020, options).unwrap())
        .unwrap();
    disasm.run().unwrap();

    assert_eq!(
        disasm.code().get(0x2000).unwrap().code,
        ".INCBIN \"tiles_4bpp.chr\""
    );
    let files: Vec<(&String, &Vec<u8>)> = disasm.files().collect();
    assert!(files.iter().any(|(n, _)| n.as_str() == "tiles_4bpp.chr"));
    let bmp = files
        .iter()
        .find(|(n, _)| n.as_str() == "tiles_4bpp.bmp")
        .unwrap();
    assert_eq!(&bmp.1[0..2], b"BM");
}

#[test]
fn test_spc700_decoder_side_files() {
    let mut data = lorom_image();
    data[0x1000..0x1003].copy_from_slice(&[0x5F, 0x00, 0x02]); // jmp $0200
    let cart = Cartridge::with_data(data).unwrap();

    let mut disasm = Disassembler::new(&cart);
    disasm
        .add_decoder(Decoder::spc700("driver", 0x1000, 0x1003, 0x0200))
        .unwrap();
    disasm.run().unwrap();

    assert_eq!(
        disasm.code().get(0x1000).unwrap().code,
        ".INCBIN \"driver.spc\""
    );
    let files: Vec<(&String, &Vec<u8>)> = disasm.files().collect();
    let listing = files.iter().find(|(n, _)| n.as_str() == "driver.asm").unwrap();
    let text = String::from_utf8(listing.1.to_vec()).unwrap();
    assert!(text.contains("jmp $0200"));
    let raw = files.iter().find(|(n, _)| n.as_str() == "driver.spc").unwrap();
    assert_eq!(raw.1.as_slice(), &[0x5F, 0x00, 0x02]);
}

#[test]
fn test_sound_decoder_side_files() {
    let mut data = lorom_image();
    data[0x1000] = 0x60; // shift 6, filter 0
    data[0x1001] = 0x10; // impulse
    let cart = Cartridge::with_data(data).unwrap();

    let mut disasm = Disassembler::new(&cart);
    disasm
        .add_decoder(Decoder::sound("beep", 0x1000, 0x1009, 32000).unwrap())
        .unwrap();
    disasm.run().unwrap();

    let files: Vec<(&String, &Vec<u8>)> = disasm.files().collect();
    let brr = files.iter().find(|(n, _)| n.as_str() == "beep.brr").unwrap();
    assert_eq!(brr.1.len(), 9);
    let wav = files.iter().find(|(n, _)| n.as_str() == "beep.wav").unwrap();
    assert_eq!(&wav.1[0..4], b"RIFF");
    // 16 samples of 16-bit mono follow the 44 byte header.
    assert_eq!(wav.1.len(), 44 + 32);
}

#[test]
fn test_overlapping_decoders_conflict() {
    let data = lorom_image();
    let cart = Cartridge::with_data(data).unwrap();
    let mut disasm = Disassembler::new(&cart);
    disasm
        .add_decoder(Decoder::binary("a", 0x1000, 0x1100, None))
        .unwrap();
    assert!(disasm
        .add_decoder(Decoder::binary("b", 0x10FF, 0x1200, None))
        .is_err());
    assert!(disasm
        .add_decoder(Decoder::binary("a", 0x2000, 0x2100, None))
        .is_err());
    assert!(disasm
        .add_decoder(Decoder::binary("c", 0x7F00, 0x8100, None))
        .is_err());
}

#[test]
fn test_sweep_skips_decoder_holes() {
    let mut data = lorom_image();
    // lda #$12 / <16 byte binary blob> / rts after it
    data[0] = 0xA9;
    data[1] = 0x12;
    data[0x12] = 0x60;
    let cart = Cartridge::with_data(data).unwrap();
    let mut disasm = Disassembler::new(&cart);
    disasm
        .add_decoder(Decoder::binary("hole", 0x2, 0x12, None))
        .unwrap();
    disasm.run().unwrap();

    assert_eq!(disasm.code().get(0).unwrap().code, "lda #$12.b");
    assert_eq!(disasm.code().get(2).unwrap().code, ".INCBIN \"hole.bin\"");
    assert_eq!(disasm.code().get(0x12).unwrap().code, "rts");
    // No instruction was emitted inside the decoder's range.
    assert!(disasm.code().range(3, 0x12).next().is_none());
}

#[test]
fn test_opcode_overrunning_decoder_demotes_to_bytes() {
    let mut data = lorom_image();
    // A 3-byte lda $xxxx starting one byte before the decoder.
    data[0] = 0xAD;
    let cart = Cartridge::with_data(data).unwrap();
    let mut disasm = Disassembler::new(&cart);
    disasm
        .add_decoder(Decoder::binary("wall", 0x1, 0x10, None))
        .unwrap();
    disasm.run().unwrap();

    let first = disasm.code().get(0).unwrap();
    assert_eq!(first.code, ".db $AD");
    assert_eq!(first.comment.as_deref(), Some("Opcode overrunning decoder"));
}
