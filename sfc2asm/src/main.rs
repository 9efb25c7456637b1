use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use sfc2asm::cartridge::CartOptions;
use sfc2asm::cartridge::Cartridge;
use sfc2asm::config::Configurator;
use sfc2asm::disasm::Disassembler;
use sfc2asm::logging;
use sfc2asm::project::ProjectWriter;

#[derive(Parser)]
#[command(
    name = "sfc2asm",
    about = "Disassembles SNES cartridges into buildable assembler projects"
)]
struct Args {
    /// Input rom image (*.sfc)
    input: PathBuf,

    /// Directory to write the project into
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// Decoder configuration yaml file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Code banks to disassemble; all banks when omitted
    #[arg(short, long, num_args = 1..)]
    banks: Option<Vec<u32>>,

    /// Force HiROM addressing
    #[arg(long)]
    hirom: bool,

    /// Force LoROM addressing
    #[arg(long)]
    lorom: bool,

    /// Force fast rom addressing
    #[arg(long)]
    fastrom: bool,

    /// Force slow rom addressing
    #[arg(long)]
    slowrom: bool,

    /// Comment every instruction with its raw bytes
    #[arg(short = 'x', long)]
    hex: bool,
}

fn main() -> Result<()> {
    logging::init();
    let args = Args::parse();

    let options = CartOptions {
        hirom: args
            .hirom
            .then_some(true)
            .or_else(|| args.lorom.then_some(false)),
        fastrom: args
            .fastrom
            .then_some(true)
            .or_else(|| args.slowrom.then_some(false)),
    };
    let cart = Cartridge::open_with_options(&args.input, options)?;

    let mut disasm = Disassembler::new(&cart);
    disasm.hex_comment = args.hex;
    if let Some(banks) = args.banks {
        disasm.code_banks = banks;
    }
    if let Some(config) = &args.config {
        Configurator::load(config)?.apply(&mut disasm)?;
    }
    disasm.run()?;

    ProjectWriter::new(&cart, &disasm).output(&args.output_dir)?;
    Ok(())
}
