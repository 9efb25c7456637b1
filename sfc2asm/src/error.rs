//! Error kinds shared across the disassembly engine.
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DisasmError {
    #[error("not a valid rom image: {0}")]
    InvalidRomImage(String),

    #[error("range ${start:06X}-${end:06X} conflicts with an already registered range")]
    RangeConflict { start: u32, end: u32 },

    #[error("decoder {label}: {reason}")]
    DecoderMisconfigured { label: String, reason: String },

    #[error("address ${0:06X} does not map into the rom")]
    AddressOutOfRange(u32),

    #[error("branch target wraps out of the current bank")]
    BankWrap,

    #[error("branch target is not a known instruction boundary")]
    InvalidBranch,

    #[error("opcode at ${0:06X} would overrun a region boundary")]
    IncompleteInstruction(u32),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl DisasmError {
    pub fn decoder(label: &str, reason: impl Into<String>) -> Self {
        DisasmError::DecoderMisconfigured {
            label: label.to_string(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("unknown compression codec `{0}`")]
    UnknownCodec(String),

    #[error("input uses all 256 byte values, no tag byte available")]
    NoFreeTagByte,
}
