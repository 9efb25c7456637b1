//! Data region decoders.
//!
//! A decoder claims a half-open rom range and renders it as data instead of
//! instructions: raw rows, binary includes, text, arrays, index tables,
//! palettes, graphics, tilemaps, BRR samples or SPC700 code. Decoders are
//! held in an arena and addressed by id; the range tree arbitrates between
//! them and the instruction sweep.
pub mod graphics;
pub mod sound;
pub mod text;

use std::collections::BTreeMap;
use std::collections::HashMap;

use itertools::Itertools;

use crate::cartridge::Cartridge;
use crate::codec::Codec;
use crate::disasm::Instruction;
use crate::error::DisasmError;
use crate::rangetree::RangeTree;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DecoderId(pub usize);

pub struct Decoder {
    pub label: String,
    pub start: u32,
    pub end: u32,
    pub compress: Option<Codec>,
    pub files: BTreeMap<String, Vec<u8>>,
    pub processed: bool,
    pub kind: DecoderKind,
}

pub enum DecoderKind {
    Data,
    Binary,
    Text {
        pack: Option<Vec<u32>>,
        index: Option<DecoderId>,
        translation: Option<DecoderId>,
    },
    Array {
        size: u32,
    },
    Index {
        size: u32,
        parent: Option<DecoderId>,
        offsets: Vec<u32>,
    },
    Palette {
        colors: Vec<u32>,
    },
    Graphic {
        bit_depth: u8,
        width: u32,
        palette: Option<DecoderId>,
        palette_offset: usize,
        mode7: bool,
    },
    TileMap {
        gfx: Vec<DecoderId>,
        width: u32,
    },
    Translation {
        table: BTreeMap<u8, String>,
    },
    Sound {
        rate: u32,
    },
    Spc700 {
        start_addr: u16,
    },
    Headers,
}

#[derive(Default)]
pub struct TextOptions {
    pub pack: Option<Vec<u32>>,
    pub index: Option<DecoderId>,
    pub translation: Option<DecoderId>,
}

pub struct GraphicOptions {
    pub bit_depth: u8,
    pub width: u32,
    pub palette: Option<DecoderId>,
    pub palette_offset: usize,
    pub mode7: bool,
    pub compress: Option<Codec>,
}

impl Default for GraphicOptions {
    fn default() -> Self {
        GraphicOptions {
            bit_depth: 4,
            width: 128,
            palette: None,
            palette_offset: 0,
            mode7: false,
            compress: None,
        }
    }
}

/// Data gathered from sibling decoders before a decode runs, so the decode
/// itself only needs its own state.
#[derive(Default)]
pub struct DecodeContext {
    pub palette_colors: Option<Vec<u32>>,
    pub parent: Option<ParentInfo>,
    pub index: Option<IndexInfo>,
    pub translation: Option<(String, BTreeMap<u8, String>)>,
    pub tilemap_files: Option<(Vec<String>, Vec<String>)>,
}

pub struct ParentInfo {
    pub label: String,
    pub start: u32,
    pub end: u32,
}

pub struct IndexInfo {
    pub start: u32,
    pub end: u32,
    pub size: u32,
}

/// Everything a single decode produces.
#[derive(Default)]
pub struct DecodeOutput {
    pub instructions: Vec<(u32, Instruction)>,
    pub files: Vec<(String, Vec<u8>)>,
    pub colors: Option<Vec<u32>>,
    pub offsets: Option<Vec<u32>>,
}

impl Decoder {
    fn new(label: &str, start: u32, end: u32, kind: DecoderKind) -> Decoder {
        Decoder {
            label: label.to_string(),
            start,
            end,
            compress: None,
            files: BTreeMap::new(),
            processed: false,
            kind,
        }
    }

    pub fn data(label: &str, start: u32, end: u32) -> Decoder {
        Decoder::new(label, start, end, DecoderKind::Data)
    }

    pub fn binary(label: &str, start: u32, end: u32, compress: Option<Codec>) -> Decoder {
        let mut decoder = Decoder::new(label, start, end, DecoderKind::Binary);
        decoder.compress = compress;
        decoder
    }

    pub fn text(
        label: &str,
        start: u32,
        end: u32,
        options: TextOptions,
    ) -> Result<Decoder, DisasmError> {
        let mut end = end;
        if let Some(pack) = &options.pack {
            let pack_size: u32 = pack.iter().sum();
            if end == 0 {
                end = start + pack_size;
            } else if start + pack_size != end {
                return Err(DisasmError::decoder(
                    label,
                    "pack lengths do not match the end offset",
                ));
            }
        } else if options.index.is_some() && end == 0 {
            return Err(DisasmError::decoder(label, "missing end offset"));
        }
        Ok(Decoder::new(
            label,
            start,
            end,
            DecoderKind::Text {
                pack: options.pack,
                index: options.index,
                translation: options.translation,
            },
        ))
    }

    pub fn array(label: &str, start: u32, end: u32, size: u32) -> Result<Decoder, DisasmError> {
        check_range(label, start, end)?;
        if !(1..=4).contains(&size) {
            return Err(DisasmError::decoder(
                label,
                format!("invalid array element size {size}"),
            ));
        }
        if (end - start) % size != 0 {
            return Err(DisasmError::decoder(
                label,
                format!("range does not align with element size {size}"),
            ));
        }
        Ok(Decoder::new(label, start, end, DecoderKind::Array { size }))
    }

    pub fn index(label: &str, start: u32, end: u32, size: u32) -> Result<Decoder, DisasmError> {
        check_range(label, start, end)?;
        if !(1..=4).contains(&size) || (end - start) % size != 0 {
            return Err(DisasmError::decoder(
                label,
                format!("range does not align with entry size {size}"),
            ));
        }
        Ok(Decoder::new(
            label,
            start,
            end,
            DecoderKind::Index {
                size,
                parent: None,
                offsets: Vec::new(),
            },
        ))
    }

    pub fn palette(label: &str, start: u32, end: u32) -> Result<Decoder, DisasmError> {
        check_range(label, start, end)?;
        if (end - start) & 1 != 0 {
            return Err(DisasmError::decoder(
                label,
                format!("range 0x{start:06X}-0x{end:06X} does not align with 2-byte color entries"),
            ));
        }
        Ok(Decoder::new(
            label,
            start,
            end,
            DecoderKind::Palette { colors: Vec::new() },
        ))
    }

    pub fn graphic(
        label: &str,
        start: u32,
        end: u32,
        options: GraphicOptions,
    ) -> Result<Decoder, DisasmError> {
        if options.width == 0 || options.width & 0x7 != 0 {
            return Err(DisasmError::decoder(
                label,
                "tile width must be a multiple of 8",
            ));
        }
        let bit_depth = if options.mode7 {
            if options.palette_offset != 0 {
                return Err(DisasmError::decoder(
                    label,
                    "palette_offset is not allowed for mode 7",
                ));
            }
            8
        } else {
            options.bit_depth
        };
        if ![2, 3, 4, 8].contains(&bit_depth) {
            return Err(DisasmError::decoder(
                label,
                format!("invalid bit depth {bit_depth}"),
            ));
        }
        check_range(label, start, end)?;
        let tile_size = graphics::tile_size(bit_depth);
        if options.compress.is_none() && (end - start) % tile_size != 0 {
            return Err(DisasmError::decoder(
                label,
                format!("range 0x{start:06X}-0x{end:06X} does not align with the {bit_depth}-bit tile size"),
            ));
        }
        let mut decoder = Decoder::new(
            label,
            start,
            end,
            DecoderKind::Graphic {
                bit_depth,
                width: options.width,
                palette: options.palette,
                palette_offset: options.palette_offset,
                mode7: options.mode7,
            },
        );
        decoder.compress = options.compress;
        Ok(decoder)
    }

    pub fn tilemap(
        label: &str,
        start: u32,
        end: u32,
        gfx: Vec<DecoderId>,
        width: u32,
        compress: Option<Codec>,
    ) -> Result<Decoder, DisasmError> {
        if gfx.is_empty() {
            return Err(DisasmError::decoder(label, "missing gfx reference"));
        }
        if width == 0 {
            return Err(DisasmError::decoder(label, "invalid tilemap width"));
        }
        let mut decoder = Decoder::new(label, start, end, DecoderKind::TileMap { gfx, width });
        decoder.compress = compress;
        Ok(decoder)
    }

    /// A translation map has no rom range; its table file is produced up
    /// front and the `.STRINGMAPTABLE` directive is emitted with the
    /// process-level definitions.
    pub fn translation(label: &str, table: BTreeMap<u8, String>) -> Decoder {
        let mut decoder = Decoder::new(label, 0, 0, DecoderKind::Translation { table });
        let DecoderKind::Translation { table } = &decoder.kind else {
            unreachable!()
        };
        let script = text::translation_table_script(table);
        decoder
            .files
            .insert(format!("{label}.tbl"), script.into_bytes());
        decoder
    }

    pub fn sound(label: &str, start: u32, end: u32, rate: u32) -> Result<Decoder, DisasmError> {
        check_range(label, start, end)?;
        if rate == 0 {
            return Err(DisasmError::decoder(label, "invalid sample rate"));
        }
        if (end - start) % 9 != 0 {
            return Err(DisasmError::decoder(
                label,
                "range does not align with 9-byte BRR blocks",
            ));
        }
        Ok(Decoder::new(label, start, end, DecoderKind::Sound { rate }))
    }

    pub fn spc700(label: &str, start: u32, end: u32, start_addr: u16) -> Decoder {
        Decoder::new(label, start, end, DecoderKind::Spc700 { start_addr })
    }

    pub fn headers(start: u32, end: u32) -> Decoder {
        Decoder::new("Headers", start, end, DecoderKind::Headers)
    }

    pub fn has_range(&self) -> bool {
        !matches!(self.kind, DecoderKind::Translation { .. })
    }

    /// The file produced for human inspection, where one exists.
    pub fn filename(&self) -> Option<String> {
        match &self.kind {
            DecoderKind::Palette { .. } => Some(format!("{}.pal", self.label)),
            DecoderKind::Graphic { bit_depth, .. } => {
                Some(format!("{}_{}bpp.bmp", self.label, bit_depth))
            }
            _ => None,
        }
    }

    pub fn decode(
        &mut self,
        cart: &Cartridge,
        ctx: &DecodeContext,
    ) -> Result<Vec<(u32, Instruction)>, DisasmError> {
        let out = match &self.kind {
            DecoderKind::Data => decode_data(self, cart),
            DecoderKind::Binary => decode_binary(self, cart)?,
            DecoderKind::Text { .. } => text::decode_text(self, cart, ctx)?,
            DecoderKind::Array { .. } => decode_array(self, cart),
            DecoderKind::Index { .. } => text::decode_index(self, cart, ctx)?,
            DecoderKind::Palette { .. } => graphics::decode_palette(self, cart),
            DecoderKind::Graphic { .. } => graphics::decode_graphic(self, cart, ctx)?,
            DecoderKind::TileMap { .. } => graphics::decode_tilemap(self, cart, ctx)?,
            DecoderKind::Translation { .. } => DecodeOutput::default(),
            DecoderKind::Sound { .. } => sound::decode_sound(self, cart),
            DecoderKind::Spc700 { .. } => sound::decode_spc700(self, cart),
            DecoderKind::Headers => decode_headers(self),
        };
        for (name, data) in out.files {
            self.files.insert(name, data);
        }
        if let Some(colors) = out.colors {
            if let DecoderKind::Palette { colors: slot } = &mut self.kind {
                *slot = colors;
            }
        }
        if let Some(offsets) = out.offsets {
            if let DecoderKind::Index { offsets: slot, .. } = &mut self.kind {
                *slot = offsets;
            }
        }
        Ok(out.instructions)
    }

    /// The range bytes, decompressed when a codec is attached. Returns the
    /// rendered data and, for compressed regions, the raw rom bytes.
    fn range_data(&self, cart: &Cartridge) -> Result<(Vec<u8>, Option<Vec<u8>>), DisasmError> {
        let raw = cart.slice(self.start, self.end).to_vec();
        match self.compress {
            Some(codec) => {
                let unpacked = codec
                    .decompress(&raw)
                    .map_err(|e| DisasmError::decoder(&self.label, e.to_string()))?;
                Ok((unpacked, Some(raw)))
            }
            None => Ok((raw, None)),
        }
    }

    /// File names for the decompressed and compressed artifacts; the incbin
    /// name is the one the assembler must consume to rebuild the rom.
    fn artifact_names(&self, ext: &str) -> (String, Option<String>) {
        let plain = format!("{}.{}", self.label, ext);
        match self.compress {
            Some(codec) => {
                let packed = format!("{plain}.{codec}");
                (plain, Some(packed))
            }
            None => (plain, None),
        }
    }
}

fn check_range(label: &str, start: u32, end: u32) -> Result<(), DisasmError> {
    if end < start {
        return Err(DisasmError::decoder(
            label,
            format!("invalid range 0x{start:06X}-0x{end:06X}"),
        ));
    }
    Ok(())
}

pub(crate) fn db_row(bytes: &[u8]) -> String {
    format!(".db {}", bytes.iter().map(|b| format!("${b:02X}")).join(", "))
}

/// Little-endian value of `size` bytes at `pos`.
pub(crate) fn val(cart: &Cartridge, pos: u32, size: u32) -> u32 {
    (0..size).fold(0u32, |acc, i| acc | (cart[pos + i] as u32) << (8 * i))
}

pub(crate) fn data_directive(size: u32) -> &'static str {
    [".db", ".dw", ".dl", ".dd"][((size - 1) & 0x3) as usize]
}

fn decode_data(decoder: &Decoder, cart: &Cartridge) -> DecodeOutput {
    let mut out = DecodeOutput::default();
    let mut show_label = true;
    for row in (decoder.start..decoder.end).step_by(16) {
        let row_end = (row + 16).min(decoder.end);
        let mut instruction = Instruction::new(db_row(cart.slice(row, row_end)));
        if show_label {
            instruction.preamble = Some(format!("{}:", decoder.label));
            show_label = false;
        }
        out.instructions.push((row, instruction));
    }
    out
}

fn decode_binary(decoder: &Decoder, cart: &Cartridge) -> Result<DecodeOutput, DisasmError> {
    let mut out = DecodeOutput::default();
    let (data, packed) = decoder.range_data(cart)?;
    let (plain_name, packed_name) = decoder.artifact_names("bin");
    let incbin = packed_name.clone().unwrap_or_else(|| plain_name.clone());
    out.files.push((plain_name, data));
    if let (Some(name), Some(raw)) = (packed_name, packed) {
        out.files.push((name, raw));
    }
    let mut instruction = Instruction::new(format!(".INCBIN \"{incbin}\""));
    instruction.preamble = Some(format!("{}:", decoder.label));
    out.instructions.push((decoder.start, instruction));
    Ok(out)
}

fn decode_array(decoder: &Decoder, cart: &Cartridge) -> DecodeOutput {
    let DecoderKind::Array { size } = decoder.kind else {
        unreachable!()
    };
    let hex_width: usize = [2, 4, 6, 8][(size - 1) as usize];
    let directive = data_directive(size);
    let mut out = DecodeOutput::default();
    let mut show_label = true;
    for row in (decoder.start..decoder.end).step_by(16) {
        let row_end = (row + 16).min(decoder.end);
        let parts = (row..row_end)
            .step_by(size as usize)
            .map(|pos| format!("${:0width$X}", val(cart, pos, size), width = hex_width))
            .join(", ");
        let mut instruction = Instruction::new(format!("{directive} {parts}"));
        if show_label {
            instruction.preamble = Some(format!("{}:", decoder.label));
            show_label = false;
        }
        out.instructions.push((row, instruction));
    }
    out
}

fn decode_headers(decoder: &Decoder) -> DecodeOutput {
    let mut instruction = Instruction::new("; Auto-generated headers".to_string());
    instruction.preamble = Some(format!("{}:", decoder.label));
    DecodeOutput {
        instructions: vec![(decoder.start, instruction)],
        ..Default::default()
    }
}

#[derive(Default)]
pub struct DecoderRegistry {
    arena: Vec<Decoder>,
    tree: RangeTree<DecoderId>,
    labels: HashMap<String, DecoderId>,
}

impl DecoderRegistry {
    pub fn add(&mut self, decoder: Decoder, bank_size: u32) -> Result<DecoderId, DisasmError> {
        if self.labels.contains_key(&decoder.label) {
            return Err(DisasmError::decoder(&decoder.label, "duplicate label"));
        }
        if decoder.has_range() {
            if decoder.start >= decoder.end {
                return Err(DisasmError::decoder(
                    &decoder.label,
                    format!("invalid range 0x{:06X}-0x{:06X}", decoder.start, decoder.end),
                ));
            }
            if decoder.start / bank_size != (decoder.end - 1) / bank_size {
                return Err(DisasmError::decoder(
                    &decoder.label,
                    "range crosses a bank boundary",
                ));
            }
        }
        self.check_references(&decoder)?;

        let id = DecoderId(self.arena.len());
        if decoder.has_range() {
            self.tree.add(decoder.start, decoder.end, id)?;
        }
        let index_ref = match &decoder.kind {
            DecoderKind::Text { index, .. } => *index,
            _ => None,
        };
        self.labels.insert(decoder.label.clone(), id);
        self.arena.push(decoder);
        if let Some(index_id) = index_ref {
            if let DecoderKind::Index { parent, .. } = &mut self.arena[index_id.0].kind {
                *parent = Some(id);
            }
        }
        Ok(id)
    }

    fn check_references(&self, decoder: &Decoder) -> Result<(), DisasmError> {
        match &decoder.kind {
            DecoderKind::Graphic {
                bit_depth,
                palette: Some(palette),
                palette_offset,
                ..
            } => {
                let pal = self.get(*palette);
                let DecoderKind::Palette { .. } = pal.kind else {
                    return Err(DisasmError::decoder(
                        &decoder.label,
                        format!("{} is not a palette", pal.label),
                    ));
                };
                let color_count = ((pal.end - pal.start) / 2) as isize;
                if (1isize << *bit_depth) > color_count - *palette_offset as isize {
                    return Err(DisasmError::decoder(
                        &decoder.label,
                        format!(
                            "palette {} does not provide enough colors for {bit_depth}-bit tiles",
                            pal.label
                        ),
                    ));
                }
            }
            DecoderKind::Text {
                index: Some(index), ..
            } => {
                let ix = self.get(*index);
                if !matches!(ix.kind, DecoderKind::Index { .. }) {
                    return Err(DisasmError::decoder(
                        &decoder.label,
                        format!("{} is not an index", ix.label),
                    ));
                }
            }
            DecoderKind::TileMap { gfx, .. } => {
                for id in gfx {
                    let g = self.get(*id);
                    let DecoderKind::Graphic { palette, .. } = &g.kind else {
                        return Err(DisasmError::decoder(
                            &decoder.label,
                            format!("{} is not a graphic", g.label),
                        ));
                    };
                    if palette.is_none() {
                        return Err(DisasmError::decoder(
                            &decoder.label,
                            format!("graphic {} has no palette", g.label),
                        ));
                    }
                }
            }
            _ => {}
        }
        Ok(())
    }

    pub fn get(&self, id: DecoderId) -> &Decoder {
        &self.arena[id.0]
    }

    pub fn by_label(&self, label: &str) -> Option<DecoderId> {
        self.labels.get(label).copied()
    }

    pub fn tree(&self) -> &RangeTree<DecoderId> {
        &self.tree
    }

    pub fn iter(&self) -> impl Iterator<Item = &Decoder> {
        self.arena.iter()
    }

    /// All published side files across the registry.
    pub fn files(&self) -> impl Iterator<Item = (&String, &Vec<u8>)> {
        self.arena.iter().flat_map(|d| d.files.iter())
    }

    /// Labels of all translation maps, for the `.STRINGMAPTABLE` directives.
    pub fn translations(&self) -> Vec<String> {
        self.arena
            .iter()
            .filter(|d| matches!(d.kind, DecoderKind::Translation { .. }))
            .map(|d| d.label.clone())
            .collect()
    }

    /// Decode every registered decoder in range order, resolving palette
    /// dependencies first.
    pub fn run(&mut self, cart: &Cartridge) -> Result<Vec<(u32, Instruction)>, DisasmError> {
        let ids: Vec<DecoderId> = self.tree.items().copied().collect();
        let mut out = Vec::new();
        for id in ids {
            self.decode_one(id, cart, &mut out)?;
        }
        Ok(out)
    }

    fn decode_one(
        &mut self,
        id: DecoderId,
        cart: &Cartridge,
        out: &mut Vec<(u32, Instruction)>,
    ) -> Result<(), DisasmError> {
        if self.arena[id.0].processed {
            return Ok(());
        }
        if let DecoderKind::Graphic {
            palette: Some(palette),
            ..
        } = self.arena[id.0].kind
        {
            self.decode_one(palette, cart, out)?;
        }
        self.arena[id.0].processed = true;
        let ctx = self.context_for(id);
        let decoder = &mut self.arena[id.0];
        out.extend(decoder.decode(cart, &ctx)?);
        Ok(())
    }

    fn context_for(&self, id: DecoderId) -> DecodeContext {
        let mut ctx = DecodeContext::default();
        match &self.arena[id.0].kind {
            DecoderKind::Graphic {
                palette: Some(palette),
                ..
            } => {
                if let DecoderKind::Palette { colors } = &self.get(*palette).kind {
                    ctx.palette_colors = Some(colors.clone());
                }
            }
            DecoderKind::Index { parent, .. } => {
                if let Some(parent) = parent {
                    let p = self.get(*parent);
                    ctx.parent = Some(ParentInfo {
                        label: p.label.clone(),
                        start: p.start,
                        end: p.end,
                    });
                }
            }
            DecoderKind::Text {
                index, translation, ..
            } => {
                if let Some(index) = index {
                    let ix = self.get(*index);
                    if let DecoderKind::Index { size, .. } = ix.kind {
                        ctx.index = Some(IndexInfo {
                            start: ix.start,
                            end: ix.end,
                            size,
                        });
                    }
                }
                if let Some(translation) = translation {
                    let tr = self.get(*translation);
                    if let DecoderKind::Translation { table } = &tr.kind {
                        ctx.translation = Some((tr.label.clone(), table.clone()));
                    }
                }
            }
            DecoderKind::TileMap { gfx, .. } => {
                let mut gfx_files = Vec::new();
                let mut palette_files = Vec::new();
                for id in gfx {
                    let g = self.get(*id);
                    if let Some(name) = g.filename() {
                        gfx_files.push(name);
                    }
                    if let DecoderKind::Graphic {
                        palette: Some(palette),
                        ..
                    } = &g.kind
                    {
                        if let Some(name) = self.get(*palette).filename() {
                            palette_files.push(name);
                        }
                    }
                }
                ctx.tilemap_files = Some((gfx_files, palette_files));
            }
            _ => {}
        }
        ctx
    }
}
