use std::path::Path;

use log::info;

use crate::{error::LoadError, memory::MAX_PROGRAM_SIZE};

/// Reads a program image from disk. Images that cannot fit into memory are rejected before
/// anything is handed to the interpreter.
pub fn read_program(path: &Path) -> Result<Vec<u8>, LoadError> {
    let bytes = std::fs::read(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    if bytes.len() > MAX_PROGRAM_SIZE {
        return Err(LoadError::TooLarge {
            size: bytes.len(),
            max: MAX_PROGRAM_SIZE,
        });
    }

    info!("Read {} bytes from {}", bytes.len(), path.display());
    Ok(bytes)
}
