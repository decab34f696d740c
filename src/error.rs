//! Error types for save-file transforms.
//!
//! Every variant is fatal for the current run: the transform either
//! completes and yields a full replacement buffer, or it aborts before any
//! output is written.

use thiserror::Error;

/// Result type for save transform operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// First four bytes of the file are not the GVAS magic.
    #[error("invalid GVAS header signature, expected 0x{expected:08X} got 0x{found:08X}")]
    InvalidContainerSignature { expected: u32, found: u32 },

    /// GVAS save game version is not the one Hogwarts Legacy writes.
    #[error("invalid GVAS header version, expected {expected} got {found}")]
    InvalidContainerVersion { expected: u32, found: u32 },

    /// The serialized "RawDatabaseImage" name field does not occur anywhere
    /// in the buffer.
    #[error("could not locate \"RawDatabaseImage\" property")]
    PropertyNotFound,

    /// A tag string at the located property does not match its expected
    /// fixed value.
    #[error("expected property tag \"{expected}\" got \"{found}\"")]
    PropertyTypeMismatch {
        expected: &'static str,
        found: String,
    },

    /// Negative FString length, i.e. the UCS-2 wide encoding. The original
    /// tool never implemented this branch; we reject it rather than guess.
    #[error("FString length {0} indicates UCS-2 encoding, which is not supported")]
    UnsupportedEncoding(i32),

    /// A compressed block does not start with the UPK block magic.
    #[error(
        "compressed block at offset {offset} has signature 0x{found:08X}, expected 0x{expected:08X}"
    )]
    InvalidBlockSignature {
        offset: usize,
        expected: u64,
        found: u64,
    },

    /// The codec produced fewer (or more) bytes than the block header
    /// declared.
    #[error("partial decompression: expected {expected} bytes, got {actual}")]
    PartialDecompression { expected: u64, actual: u64 },

    /// Payload does not begin with "SQLite format 3\0".
    #[error("data does not start with the SQLite file magic")]
    InvalidSqliteMagic,

    /// page_size * page_count disagrees with the size the container claims.
    #[error("SQLite size mismatch: expected {expected} bytes, header derives {derived}")]
    SqliteSizeMismatch { expected: u64, derived: u64 },

    /// The external compression capability failed or is unavailable.
    #[error("codec failure: {0}")]
    Codec(String),

    /// I/O failure, including reads running off the end of a truncated
    /// buffer.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
