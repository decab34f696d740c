//! The slice of the SQLite file header this tool cares about.
//!
//! Only the page size and page count are consumed; their product is the
//! authoritative database size, validated against whatever size the
//! surrounding container claims.

use byteorder::{BigEndian, ReadBytesExt};
use std::io::{Cursor, Read, Seek, SeekFrom};

use crate::error::{Error, Result};

/// "SQLite format 3" plus the terminating NUL.
pub const SQLITE_MAGIC: &[u8; 16] = b"SQLite format 3\0";

/// Parsed fields of the SQLite file header. Both integers are big-endian on
/// disk, unlike everything else in the save file.
#[derive(Debug, Clone, Copy)]
pub struct SqliteHeader {
    pub page_size: u16,
    pub page_count: u32,
}

impl SqliteHeader {
    /// Minimum number of bytes [`parse`](Self::parse) consumes.
    pub const SIZE: usize = 32;

    pub fn parse(data: &[u8]) -> Result<SqliteHeader> {
        let mut cur = Cursor::new(data);
        let mut magic = [0u8; 16];
        cur.read_exact(&mut magic)?;
        if &magic != SQLITE_MAGIC {
            return Err(Error::InvalidSqliteMagic);
        }
        let page_size = cur.read_u16::<BigEndian>()?;
        cur.seek(SeekFrom::Current(10))?;
        let page_count = cur.read_u32::<BigEndian>()?;
        Ok(SqliteHeader {
            page_size,
            page_count,
        })
    }

    /// Database size derived from the header: page size times page count.
    pub fn derived_size(&self) -> u64 {
        u64::from(self.page_size) * u64::from(self.page_count)
    }
}

/// Parse the header at the start of `data` and check that its derived size
/// equals `expected` (the raw payload length when compressing, the size
/// preamble's value when decompressing).
pub fn validate(data: &[u8], expected: u64) -> Result<SqliteHeader> {
    let header = SqliteHeader::parse(data)?;
    let derived = header.derived_size();
    log::info!(
        "SQLite header: page size {}, page count {}, computed size {} bytes",
        header.page_size,
        header.page_count,
        derived
    );
    if derived != expected {
        return Err(Error::SqliteSizeMismatch { expected, derived });
    }
    Ok(header)
}
