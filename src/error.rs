use std::path::PathBuf;

/// Errors surfaced at the crate's fallible boundaries: illegal-opcode
/// faults from the CPU, and ROM image loading from the composer.
///
/// Peripheral `read`/`write`/`tick` are infallible by the `Peripheral`
/// trait's contract; host I/O failures in the ACIA are logged and
/// swallowed rather than propagated (see `acia.rs`).
#[derive(Debug, thiserror::Error)]
pub enum EmulatorError {
    #[error("illegal opcode {byte:#04x} at pc {pc:#06x} (recent pc history: {history:?})")]
    IllegalOpcode {
        pc: u16,
        byte: u8,
        history: Vec<u16>,
    },

    #[error("ROM image {name:?} at {load_address:#06x} (size {size}) falls outside the ROM window")]
    RomImageOutOfRange {
        name: String,
        load_address: u16,
        size: usize,
    },

    #[error("ROM image {name:?} could not be read: {source}")]
    RomImageUnreadable {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("ROM metadata at {path:?} is invalid: {source}")]
    MetadataInvalid {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("host I/O failure: {source}")]
    HostIoFailure {
        #[source]
        source: std::io::Error,
    },
}
