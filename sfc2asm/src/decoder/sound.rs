//! BRR sample and SPC700 code decoding.
use std::io::Cursor;

use crate::brr;
use crate::cartridge::Cartridge;
use crate::decoder::DecodeOutput;
use crate::decoder::Decoder;
use crate::decoder::DecoderKind;
use crate::disasm::Instruction;
use crate::spc700::Spc700Disassembler;

pub fn decode_sound(decoder: &Decoder, cart: &Cartridge) -> DecodeOutput {
    let DecoderKind::Sound { rate } = decoder.kind else {
        unreachable!()
    };
    let mut out = DecodeOutput::default();
    let data = cart.slice(decoder.start, decoder.end);
    let samples = brr::decode(data);
    out.files
        .push((format!("{}.brr", decoder.label), data.to_vec()));
    out.files
        .push((format!("{}.wav", decoder.label), wav_bytes(&samples, rate)));

    let mut instruction = Instruction::new(format!(".INCBIN \"{}.brr\"", decoder.label));
    instruction.preamble = Some(format!("{}:", decoder.label));
    out.instructions.push((decoder.start, instruction));
    out
}

fn wav_bytes(samples: &[i16], rate: u32) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut buffer = Vec::new();
    {
        let mut writer = hound::WavWriter::new(Cursor::new(&mut buffer), spec).unwrap();
        let mut i16_writer = writer.get_i16_writer(samples.len() as u32);
        for sample in samples {
            i16_writer.write_sample(*sample);
        }
        i16_writer.flush().unwrap();
        writer.finalize().unwrap();
    }
    buffer
}

pub fn decode_spc700(decoder: &Decoder, cart: &Cartridge) -> DecodeOutput {
    let DecoderKind::Spc700 { start_addr } = decoder.kind else {
        unreachable!()
    };
    let mut out = DecodeOutput::default();
    let data = cart.slice(decoder.start, decoder.end);

    let mut listing = String::new();
    for (_, instruction) in Spc700Disassembler::new(data, start_addr).disassemble() {
        listing.push_str(&instruction.to_string());
        listing.push('\n');
    }
    out.files
        .push((format!("{}.spc", decoder.label), data.to_vec()));
    out.files
        .push((format!("{}.asm", decoder.label), listing.into_bytes()));

    let mut instruction = Instruction::new(format!(".INCBIN \"{}.spc\"", decoder.label));
    instruction.preamble = Some(format!("{}:", decoder.label));
    out.instructions.push((decoder.start, instruction));
    out
}
