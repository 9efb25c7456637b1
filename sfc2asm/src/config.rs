//! Declarative disassembly configuration.
//!
//! A YAML document names the code banks, the data region decoders, label
//! renames and memory variables. Decoder-typed keys (`palette`, `index`,
//! `translation`, `gfx`) accept a label reference, a list of references or
//! an inline nested definition.
use std::collections::BTreeMap;
use std::collections::HashMap;
use std::path::Path;

use anyhow::bail;
use anyhow::Context;
use anyhow::Result;
use serde::Deserialize;

use crate::codec::Codec;
use crate::decoder::Decoder;
use crate::decoder::DecoderId;
use crate::decoder::GraphicOptions;
use crate::decoder::TextOptions;
use crate::disasm::Disassembler;

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub banks: Option<Vec<u32>>,
    #[serde(default)]
    pub decoders: Vec<DecoderConfig>,
    #[serde(default)]
    pub labels: BTreeMap<String, u32>,
    #[serde(default)]
    pub memory: BTreeMap<String, u32>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct DecoderConfig {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub start: Option<u32>,
    #[serde(default)]
    pub end: Option<u32>,
    #[serde(default)]
    pub compress: Option<String>,
    #[serde(default)]
    pub size: Option<u32>,
    #[serde(default)]
    pub bit_depth: Option<u8>,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub palette_offset: Option<usize>,
    #[serde(default)]
    pub mode7: Option<bool>,
    #[serde(default)]
    pub pack: Option<Vec<u32>>,
    #[serde(default)]
    pub rate: Option<u32>,
    #[serde(default)]
    pub start_addr: Option<u16>,
    #[serde(default)]
    pub table: Option<BTreeMap<u8, String>>,
    #[serde(default)]
    pub palette: Option<serde_yaml::Value>,
    #[serde(default)]
    pub index: Option<serde_yaml::Value>,
    #[serde(default)]
    pub translation: Option<serde_yaml::Value>,
    #[serde(default)]
    pub gfx: Option<serde_yaml::Value>,
}

pub struct Configurator {
    config: Config,
    label_lookup: HashMap<String, DecoderId>,
}

impl Configurator {
    pub fn load(path: &Path) -> Result<Configurator> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        Self::from_str(&text)
    }

    pub fn from_str(text: &str) -> Result<Configurator> {
        let config: Config = serde_yaml::from_str(text).context("parsing configuration")?;
        Ok(Configurator {
            config,
            label_lookup: HashMap::new(),
        })
    }

    /// Register everything the configuration describes.
    pub fn apply(mut self, disasm: &mut Disassembler) -> Result<()> {
        if let Some(banks) = &self.config.banks {
            disasm.code_banks = banks.clone();
        }
        let decoders = std::mem::take(&mut self.config.decoders);
        for decoder in &decoders {
            self.apply_decoder(disasm, decoder)?;
        }
        for (label, offset) in &self.config.labels {
            disasm.label_name(*offset, Some(label.as_str()));
        }
        for (name, address) in &self.config.memory {
            disasm.set_memory(*address, name)?;
        }
        Ok(())
    }

    fn apply_decoder(
        &mut self,
        disasm: &mut Disassembler,
        config: &DecoderConfig,
    ) -> Result<DecoderId> {
        let label = config
            .label
            .clone()
            .ok_or_else(|| anyhow::anyhow!("decoder of type {} is missing a label", config.kind))?;
        let start = || {
            config
                .start
                .with_context(|| format!("decoder {label} is missing a start offset"))
        };
        let end = || {
            config
                .end
                .with_context(|| format!("decoder {label} is missing an end offset"))
        };
        let compress = match &config.compress {
            Some(name) => Some(Codec::by_name(name).with_context(|| format!("decoder {label}"))?),
            None => None,
        };

        let decoder = match config.kind.as_str() {
            "data" => Decoder::data(&label, start()?, end()?),
            "bin" => Decoder::binary(&label, start()?, end()?, compress),
            "array" => Decoder::array(&label, start()?, end()?, config.size.unwrap_or(1))?,
            "index" => Decoder::index(&label, start()?, end()?, config.size.unwrap_or(2))?,
            "palette" => Decoder::palette(&label, start()?, end()?)?,
            "text" => {
                let options = TextOptions {
                    pack: config.pack.clone(),
                    index: self.resolve_reference(disasm, &label, "index", &config.index)?,
                    translation: self.resolve_reference(
                        disasm,
                        &label,
                        "translation",
                        &config.translation,
                    )?,
                };
                Decoder::text(&label, start()?, config.end.unwrap_or(0), options)?
            }
            "gfx" => {
                let defaults = GraphicOptions::default();
                let options = GraphicOptions {
                    bit_depth: config.bit_depth.unwrap_or(defaults.bit_depth),
                    width: config.width.unwrap_or(defaults.width),
                    palette: self.resolve_reference(disasm, &label, "palette", &config.palette)?,
                    palette_offset: config.palette_offset.unwrap_or(0),
                    mode7: config.mode7.unwrap_or(false),
                    compress,
                };
                Decoder::graphic(&label, start()?, end()?, options)?
            }
            "tilemap" => {
                let gfx = self.resolve_reference_list(disasm, &label, "gfx", &config.gfx)?;
                Decoder::tilemap(
                    &label,
                    start()?,
                    end()?,
                    gfx,
                    config.width.unwrap_or(128),
                    compress,
                )?
            }
            "translation" => {
                let table = config
                    .table
                    .clone()
                    .with_context(|| format!("translation {label} is missing a table"))?;
                Decoder::translation(&label, table)
            }
            "sound" => Decoder::sound(&label, start()?, end()?, config.rate.unwrap_or(32000))?,
            "spc700" => Decoder::spc700(&label, start()?, end()?, config.start_addr.unwrap_or(0)),
            other => bail!("unknown decoder type {other} for label {label}"),
        };
        if compress.is_some() && !matches!(config.kind.as_str(), "bin" | "gfx" | "tilemap") {
            bail!("decoder {label}: compression is not supported for type {}", config.kind);
        }

        let id = disasm
            .add_decoder(decoder)
            .with_context(|| format!("registering decoder {label}"))?;
        self.label_lookup.insert(label, id);
        Ok(id)
    }

    /// Resolve a decoder-typed key: a label string, or an inline nested
    /// definition whose label becomes `<parent>_<key>`.
    fn resolve_reference(
        &mut self,
        disasm: &mut Disassembler,
        parent_label: &str,
        key: &str,
        value: &Option<serde_yaml::Value>,
    ) -> Result<Option<DecoderId>> {
        let Some(value) = value else {
            return Ok(None);
        };
        match value {
            serde_yaml::Value::String(reference) => {
                let id = self.label_lookup.get(reference).copied().with_context(|| {
                    format!("could not find decoder label reference \"{reference}\" for decoder \"{parent_label}\"")
                })?;
                Ok(Some(id))
            }
            serde_yaml::Value::Mapping(_) => {
                let mut nested: DecoderConfig = serde_yaml::from_value(value.clone())
                    .ok()
                    .or_else(|| self.nested_without_type(value, key))
                    .with_context(|| {
                        format!("invalid inline {key} definition for decoder \"{parent_label}\"")
                    })?;
                nested.kind = key.to_string();
                nested.label = Some(format!("{parent_label}_{key}"));
                Ok(Some(self.apply_decoder(disasm, &nested)?))
            }
            _ => bail!(
                "could not resolve {key} reference for decoder \"{parent_label}\""
            ),
        }
    }

    /// Inline definitions usually omit `type`, which the typed deserialize
    /// requires; patch it in before retrying.
    fn nested_without_type(&self, value: &serde_yaml::Value, key: &str) -> Option<DecoderConfig> {
        let mut mapping = value.as_mapping()?.clone();
        mapping.insert(
            serde_yaml::Value::String("type".to_string()),
            serde_yaml::Value::String(key.to_string()),
        );
        serde_yaml::from_value(serde_yaml::Value::Mapping(mapping)).ok()
    }

    /// Like `resolve_reference` but also accepting a list of label
    /// references (used by tilemap `gfx`).
    fn resolve_reference_list(
        &mut self,
        disasm: &mut Disassembler,
        parent_label: &str,
        key: &str,
        value: &Option<serde_yaml::Value>,
    ) -> Result<Vec<DecoderId>> {
        let Some(value) = value else {
            bail!("decoder {parent_label} is missing its {key} reference");
        };
        if let serde_yaml::Value::Sequence(items) = value {
            let mut ids = Vec::new();
            for item in items {
                let serde_yaml::Value::String(reference) = item else {
                    bail!("could not resolve {key} list entry for decoder \"{parent_label}\"");
                };
                let id = self.label_lookup.get(reference).copied().with_context(|| {
                    format!("could not find decoder label reference \"{reference}\" for decoder \"{parent_label}\"")
                })?;
                ids.push(id);
            }
            return Ok(ids);
        }
        Ok(self
            .resolve_reference(disasm, parent_label, key, &Some(value.clone()))?
            .into_iter()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::cartridge::Cartridge;

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

    static CONFIG: &str = r#"
banks: [0]
decoders:
  - type: palette
    label: sprites_pal
    start: 0x1000
    end: 0x1020
  - type: gfx
    label: sprites
    start: 0x2000
    end: 0x2200
    bit_depth: 4
    width: 128
    palette: sprites_pal
  - type: translation
    label: dialog_tbl
    table:
      0x41: "hero"
  - type: text
    label: intro
    start: 0x3000
    end: 0x3010
    translation: dialog_tbl
labels:
  main: 0x0000
memory:
  player_hp: 0x7E0010
"#;

    #[test]
    fn test_apply_config() {
        let cart = Cartridge::with_data(lorom_image()).unwrap();
        let mut disasm = Disassembler::new(&cart);
        Configurator::from_str(CONFIG)
            .unwrap()
            .apply(&mut disasm)
            .unwrap();
        assert_eq!(disasm.code_banks, vec![0]);
        assert!(disasm.decoders().by_label("sprites_pal").is_some());
        assert!(disasm.decoders().by_label("sprites").is_some());
        assert!(disasm.decoders().by_label("intro").is_some());
        assert_eq!(disasm.memory().get(&0x7E0010).map(String::as_str), Some("player_hp"));
        disasm.run().unwrap();
        assert_eq!(disasm.label_name(0, None), "main");
    }

    #[test]
    fn test_inline_nested_decoder() {
        let cart = Cartridge::with_data(lorom_image()).unwrap();
        let mut disasm = Disassembler::new(&cart);
        let config = r#"
decoders:
  - type: gfx
    label: font
    start: 0x2000
    end: 0x2100
    bit_depth: 2
    palette:
      start: 0x1000
      end: 0x1010
"#;
        Configurator::from_str(config)
            .unwrap()
            .apply(&mut disasm)
            .unwrap();
        assert!(disasm.decoders().by_label("font_palette").is_some());
    }

    #[test]
    fn test_unknown_references_fail() {
        let cart = Cartridge::with_data(lorom_image()).unwrap();
        let mut disasm = Disassembler::new(&cart);
        let config = r#"
decoders:
  - type: gfx
    label: font
    start: 0x2000
    end: 0x2100
    palette: missing
"#;
        assert!(Configurator::from_str(config)
            .unwrap()
            .apply(&mut disasm)
            .is_err());
    }

    #[test]
    fn test_unknown_codec_fails() {
        let cart = Cartridge::with_data(lorom_image()).unwrap();
        let mut disasm = Disassembler::new(&cart);
        let config = r#"
decoders:
  - type: bin
    label: blob
    start: 0x1000
    end: 0x1100
    compress: zip
"#;
        assert!(Configurator::from_str(config)
            .unwrap()
            .apply(&mut disasm)
            .is_err());
    }
}
