use crate::error::RuntimeError;
use byteorder::{ByteOrder, LittleEndian};
use std::io::Read;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

pub const ENTRY_OFFSET_FIELD: usize = 0;
pub const GLOBAL_INIT_OFFSET_FIELD: usize = 8;
pub const RESTART_OFFSET_FIELD: usize = 16;

/// Bytes that must be present for the two mandatory header fields.
pub const MIN_IMAGE_LEN: usize = 16;
/// Header size when the restart field is present, as the assembler emits it.
pub const HEADER_LEN: usize = 24;

#[derive(Debug, Error)]
pub enum LoaderError {
    #[error("unreadable image: {0}")]
    Io(#[from] std::io::Error),
    #[error("image is {0} bytes, shorter than the {MIN_IMAGE_LEN}-byte header")]
    ImageTooShort(usize),
}

/// An immutable program image. Cloning shares the underlying buffer.
#[derive(Debug, Clone)]
pub struct Image {
    bytes: Arc<[u8]>,
}

impl Image {
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, LoaderError> {
        if bytes.len() < MIN_IMAGE_LEN {
            return Err(LoaderError::ImageTooShort(bytes.len()));
        }
        Ok(Self {
            bytes: Arc::from(bytes),
        })
    }

    /// Load an executable image from any reader.
    pub fn read_from<R: Read>(reader: &mut R) -> Result<Self, LoaderError> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        Self::from_bytes(bytes)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, LoaderError> {
        let bytes = std::fs::read(path)?;
        Self::from_bytes(bytes)
    }

    #[inline]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Shared handle to the buffer, used to map the image into VM memory.
    pub fn shared(&self) -> Arc<[u8]> {
        Arc::clone(&self.bytes)
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn entry_offset(&self) -> u64 {
        LittleEndian::read_u64(&self.bytes[ENTRY_OFFSET_FIELD..])
    }

    pub fn global_init_offset(&self) -> u64 {
        LittleEndian::read_u64(&self.bytes[GLOBAL_INIT_OFFSET_FIELD..])
    }

    /// Target of no-return chaining. Only read when a chained RETURN runs,
    /// so images that never use NORETURN may omit it.
    pub fn restart_offset(&self) -> Result<u64, RuntimeError> {
        self.bytes
            .get(RESTART_OFFSET_FIELD..RESTART_OFFSET_FIELD + 8)
            .map(LittleEndian::read_u64)
            .ok_or(RuntimeError::TruncatedInstruction {
                offset: RESTART_OFFSET_FIELD,
            })
    }
}
