//! Error types for header parsing

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(
        "Truncated header: needed {needed} bytes at offset {at_offset:#x}, {available} available"
    )]
    TruncatedHeader {
        at_offset: u64,
        needed: usize,
        available: u64,
    },

    #[error("Invalid PE signature: {observed:02x?}")]
    InvalidSignature { observed: Vec<u8> },
}

pub type ParseResult<T> = std::result::Result<T, ParseError>;

impl ParseError {
    pub fn truncated(at_offset: u64, needed: usize, available: u64) -> Self {
        Self::TruncatedHeader {
            at_offset,
            needed,
            available,
        }
    }

    pub fn is_truncation(&self) -> bool {
        matches!(self, Self::TruncatedHeader { .. })
    }
}
