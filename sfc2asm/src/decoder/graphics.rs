//! Palette, tile graphics and tilemap decoding.
use serde::Serialize;

use crate::bitmap::BitmapIndex;
use crate::cartridge::Cartridge;
use crate::decoder::DecodeContext;
use crate::decoder::DecodeOutput;
use crate::decoder::Decoder;
use crate::decoder::DecoderKind;
use crate::disasm::Instruction;
use crate::error::DisasmError;

pub fn tile_size(bit_depth: u8) -> u32 {
    match bit_depth {
        2 => 16,
        3 => 24,
        8 => 64,
        _ => 32,
    }
}

/// Convert a BGR555 word into 24-bit RGB.
fn bgr555_to_rgb(color: u16) -> u32 {
    let color = color as u32;
    (color & 0x7C00) >> 7 | (color & 0x03E0) << 6 | (color & 0x1F) << 19
}

pub fn decode_palette(decoder: &Decoder, cart: &Cartridge) -> DecodeOutput {
    let mut out = DecodeOutput::default();
    out.files.push((
        format!("{}.pal", decoder.label),
        cart.slice(decoder.start, decoder.end).to_vec(),
    ));

    let mut colors = Vec::new();
    let mut lines = Vec::new();
    for pos in (decoder.start..decoder.end).step_by(2) {
        let bgr = cart[pos] as u16 | (cart[pos + 1] as u16) << 8;
        let rgb = bgr555_to_rgb(bgr);
        colors.push(rgb);
        lines.push(format!("#{rgb:06X}"));
    }
    out.files
        .push((format!("{}.rgb", decoder.label), lines.join("\n").into_bytes()));
    out.colors = Some(colors);

    let mut instruction = Instruction::new(format!(".INCBIN \"{}.pal\"", decoder.label));
    instruction.preamble = Some(format!("{}:", decoder.label));
    out.instructions.push((decoder.start, instruction));
    out
}

/// Decode an 8x8 tile into 64 palette indices.
fn decode_tile(data: &[u8], bit_depth: u8, mode7: bool) -> [u8; 64] {
    let mut pixels = [0u8; 64];
    if mode7 {
        pixels.copy_from_slice(&data[0..64]);
        return pixels;
    }
    for y in 0..8 {
        for x in 0..8 {
            let shift = 7 - x;
            let mut pixel = (data[2 * y] >> shift) & 1;
            pixel |= ((data[2 * y + 1] >> shift) & 1) << 1;
            if bit_depth == 3 {
                pixel |= ((data[16 + y] >> shift) & 1) << 2;
            }
            if bit_depth >= 4 {
                pixel |= ((data[16 + 2 * y] >> shift) & 1) << 2;
                pixel |= ((data[16 + 2 * y + 1] >> shift) & 1) << 3;
            }
            if bit_depth == 8 {
                pixel |= ((data[32 + 2 * y] >> shift) & 1) << 4;
                pixel |= ((data[32 + 2 * y + 1] >> shift) & 1) << 5;
                pixel |= ((data[48 + 2 * y] >> shift) & 1) << 6;
                pixel |= ((data[48 + 2 * y + 1] >> shift) & 1) << 7;
            }
            pixels[y * 8 + x] = pixel;
        }
    }
    pixels
}

/// Grayscale ramp used when no palette decoder is attached. Index 0 is the
/// magenta transparency marker, index 1 true black.
fn grayscale_palette(bit_depth: u8) -> Vec<u32> {
    let step = 1usize << (8 - bit_depth);
    let mut palette: Vec<u32> = (0..256usize)
        .step_by(step)
        .map(|x| {
            let v = (x + step - 1) as u32;
            v << 16 | v << 8 | v
        })
        .collect();
    palette[0] = 0xFF00FF;
    palette[1] = 0;
    palette
}

pub fn decode_graphic(
    decoder: &Decoder,
    cart: &Cartridge,
    ctx: &DecodeContext,
) -> Result<DecodeOutput, DisasmError> {
    let DecoderKind::Graphic {
        bit_depth,
        width,
        palette_offset,
        mode7,
        ..
    } = decoder.kind
    else {
        unreachable!()
    };
    let mut out = DecodeOutput::default();
    let tile_size = tile_size(bit_depth) as usize;

    let (data, packed) = decoder.range_data(cart)?;
    if data.len() % tile_size != 0 {
        return Err(DisasmError::decoder(
            &decoder.label,
            format!("data does not align with the {bit_depth}-bit tile size"),
        ));
    }

    let plain_name = format!("{}_{}bpp.chr", decoder.label, bit_depth);
    let packed_name = decoder
        .compress
        .map(|codec| format!("{plain_name}.{codec}"));
    let incbin = packed_name.clone().unwrap_or_else(|| plain_name.clone());

    // Tiles lay out in rows of width/8, the last row padded.
    let tile_count = data.len() / tile_size;
    let tiles_wide = (width / 8) as usize;
    let mut height = (tile_count / tiles_wide) * 8;
    if tile_count % tiles_wide != 0 {
        height += 8;
    }

    let colors = match &ctx.palette_colors {
        Some(colors) => colors[palette_offset.min(colors.len())..].to_vec(),
        None => grayscale_palette(bit_depth),
    };
    let bitmap_depth = if bit_depth == 3 { 4 } else { bit_depth };
    let mut palette = colors;
    palette.resize(1 << bitmap_depth, 0);

    let mut bitmap = BitmapIndex::new(width, height.max(8) as u32, bitmap_depth, palette)?;
    for (tile_index, tile) in data.chunks_exact(tile_size).enumerate() {
        let pixels = decode_tile(tile, bit_depth, mode7);
        let tile_x = (tile_index % tiles_wide) * 8;
        let tile_y = (tile_index / tiles_wide) * 8;
        for y in 0..8 {
            for x in 0..8 {
                bitmap.set_pixel((tile_x + x) as u32, (tile_y + y) as u32, pixels[y * 8 + x]);
            }
        }
    }

    out.files.push((plain_name, data));
    if let (Some(name), Some(raw)) = (packed_name, packed) {
        out.files.push((name, raw));
    }
    out.files.push((
        format!("{}_{}bpp.bmp", decoder.label, bit_depth),
        bitmap.to_bytes(),
    ));

    let mut instruction = Instruction::new(format!(".INCBIN \"{incbin}\""));
    instruction.preamble = Some(format!("{}:", decoder.label));
    out.instructions.push((decoder.start, instruction));
    Ok(out)
}

#[derive(Serialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    fn from_vec(mut names: Vec<String>) -> OneOrMany {
        if names.len() == 1 {
            OneOrMany::One(names.remove(0))
        } else {
            OneOrMany::Many(names)
        }
    }
}

#[derive(Serialize)]
struct TileMapSidecar {
    name: String,
    width: u32,
    height: u32,
    tilechr: String,
    gfx: OneOrMany,
    palette: OneOrMany,
}

pub fn decode_tilemap(
    decoder: &Decoder,
    cart: &Cartridge,
    ctx: &DecodeContext,
) -> Result<DecodeOutput, DisasmError> {
    let DecoderKind::TileMap { width, .. } = decoder.kind else {
        unreachable!()
    };
    let mut out = DecodeOutput::default();

    let (data, packed) = decoder.range_data(cart)?;
    let (plain_name, packed_name) = decoder.artifact_names("tilechr");
    let incbin = packed_name.clone().unwrap_or_else(|| plain_name.clone());

    let (gfx_files, palette_files) = ctx.tilemap_files.clone().unwrap_or_default();
    let sidecar = TileMapSidecar {
        name: decoder.label.clone(),
        width,
        height: data.len() as u32 / (width * 2),
        tilechr: plain_name.clone(),
        gfx: OneOrMany::from_vec(gfx_files),
        palette: OneOrMany::from_vec(palette_files),
    };
    let yaml = serde_yaml::to_string(&sidecar)
        .map_err(|e| DisasmError::decoder(&decoder.label, e.to_string()))?;
    out.files
        .push((format!("{}.tilemap", decoder.label), yaml.into_bytes()));
    out.files.push((plain_name, data));
    if let (Some(name), Some(raw)) = (packed_name, packed) {
        out.files.push((name, raw));
    }

    let mut instruction = Instruction::new(format!(".INCBIN \"{incbin}\""));
    instruction.preamble = Some(format!("{}:", decoder.label));
    out.instructions.push((decoder.start, instruction));
    Ok(out)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_bgr555_to_rgb() {
        assert_eq!(bgr555_to_rgb(0x7FFF), 0xF8F8F8);
        assert_eq!(bgr555_to_rgb(0x001F), 0xF80000);
        assert_eq!(bgr555_to_rgb(0x03E0), 0x00F800);
        assert_eq!(bgr555_to_rgb(0x7C00), 0x0000F8);
        assert_eq!(bgr555_to_rgb(0), 0);
    }

    #[test]
    fn test_decode_2bpp_tile() {
        let mut tile = [0u8; 16];
        tile[0] = 0x80; // plane 0, row 0, pixel 0
        tile[1] = 0x01; // plane 1, row 0, pixel 7
        let pixels = decode_tile(&tile, 2, false);
        assert_eq!(pixels[0], 1);
        assert_eq!(pixels[7], 2);
        assert_eq!(pixels[8], 0);
    }

    #[test]
    fn test_decode_4bpp_tile() {
        let mut tile = [0u8; 32];
        tile[0] = 0x80; // plane 0
        tile[1] = 0x80; // plane 1
        tile[16] = 0x80; // plane 2
        tile[17] = 0x80; // plane 3
        let pixels = decode_tile(&tile, 4, false);
        assert_eq!(pixels[0], 0xF);
    }

    #[test]
    fn test_decode_mode7_tile() {
        let mut tile = [0u8; 64];
        tile[10] = 0x42;
        let pixels = decode_tile(&tile, 8, true);
        assert_eq!(pixels[10], 0x42);
    }

    #[test]
    fn test_grayscale_palette() {
        let palette = grayscale_palette(2);
        assert_eq!(palette.len(), 4);
        assert_eq!(palette[0], 0xFF00FF);
        assert_eq!(palette[1], 0);
        assert_eq!(palette[3], 0xFFFFFF);
    }
}
