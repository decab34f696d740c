//! The chunked compression container wrapped around the database payload.
//!
//! In the "new" save format the `RawDatabaseImage` value is a sequence of
//! compressed blocks. Each block is a 48-byte header followed by the
//! block's compressed bytes; the uncompressed stream they reassemble into
//! is an 8-byte size preamble, the SQLite file, and possibly page-alignment
//! filler. Block boundaries are a pure function of total length and
//! [`MAX_BLOCK_SIZE`].

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{self, Cursor, Read};

use crate::codec::Codec;
use crate::error::{Error, Result};
use crate::sqlite;

/// UPK compressed-block magic (0x9E2A83C1, widened to u64 on the wire).
pub const BLOCK_SIGNATURE: u64 = 0x9E2A_83C1;

/// Largest uncompressed chunk a single block may carry.
pub const MAX_BLOCK_SIZE: u64 = 131_072;

/// Extra bytes the size preamble's container size carries over the SQLite
/// size.
pub const PREAMBLE_PADDING: u32 = 4;

// ── Block header ─────────────────────────────────────────

/// (compressed, uncompressed) size pair. The header carries two copies;
/// nobody knows why, so we write literal duplicates and trust only the
/// first copy on read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizePair {
    pub compressed: u64,
    pub uncompressed: u64,
}

/// 48-byte header preceding each block's compressed bytes.
#[derive(Debug, Clone, Copy)]
pub struct BlockHeader {
    pub signature: u64,
    pub max_block_size: u64,
    pub pairs: [SizePair; 2],
}

impl BlockHeader {
    pub const SIZE: usize = 48;

    fn read(cur: &mut Cursor<&[u8]>) -> Result<BlockHeader> {
        let signature = cur.read_u64::<LittleEndian>()?;
        let max_block_size = cur.read_u64::<LittleEndian>()?;
        let mut pairs = [SizePair {
            compressed: 0,
            uncompressed: 0,
        }; 2];
        for pair in &mut pairs {
            pair.compressed = cur.read_u64::<LittleEndian>()?;
            pair.uncompressed = cur.read_u64::<LittleEndian>()?;
        }
        Ok(BlockHeader {
            signature,
            max_block_size,
            pairs,
        })
    }

    fn write(&self, out: &mut Vec<u8>) -> Result<()> {
        out.write_u64::<LittleEndian>(self.signature)?;
        out.write_u64::<LittleEndian>(self.max_block_size)?;
        for pair in &self.pairs {
            out.write_u64::<LittleEndian>(pair.compressed)?;
            out.write_u64::<LittleEndian>(pair.uncompressed)?;
        }
        Ok(())
    }
}

// ── Size preamble ────────────────────────────────────────

/// 8-byte header at the front of the uncompressed stream. Stripped before
/// the raw SQLite bytes are handed back, so external save editors see a
/// plain database file.
#[derive(Debug, Clone, Copy)]
pub struct SizePreamble {
    pub container_size: u32,
    pub sqlite_size: u32,
}

impl SizePreamble {
    pub const SIZE: usize = 8;

    fn for_database(sqlite_size: u32) -> SizePreamble {
        SizePreamble {
            container_size: sqlite_size + PREAMBLE_PADDING,
            sqlite_size,
        }
    }

    fn read(cur: &mut Cursor<&[u8]>) -> Result<SizePreamble> {
        let container_size = cur.read_u32::<LittleEndian>()?;
        let sqlite_size = cur.read_u32::<LittleEndian>()?;
        Ok(SizePreamble {
            container_size,
            sqlite_size,
        })
    }

    fn write(&self, out: &mut Vec<u8>) -> Result<()> {
        out.write_u32::<LittleEndian>(self.container_size)?;
        out.write_u32::<LittleEndian>(self.sqlite_size)?;
        Ok(())
    }
}

// ── Compress direction ───────────────────────────────────

/// Turn a raw SQLite file into the chunked compressed payload.
///
/// The input must start with a well-formed SQLite header whose derived size
/// equals the input length exactly; anything else aborts before a single
/// byte is produced.
pub fn compress_payload(raw: &[u8], codec: &dyn Codec) -> Result<Vec<u8>> {
    log::info!("compressing {} bytes of database", raw.len());
    sqlite::validate(raw, raw.len() as u64)?;

    let mut working = Vec::with_capacity(SizePreamble::SIZE + raw.len());
    SizePreamble::for_database(raw.len() as u32).write(&mut working)?;
    working.extend_from_slice(&raw[..]);

    let mut out = Vec::with_capacity(working.len());
    for (index, chunk) in working.chunks(MAX_BLOCK_SIZE as usize).enumerate() {
        let compressed = codec.compress(chunk)?;
        log::debug!(
            "block #{index}: {} bytes uncompressed, {} compressed",
            chunk.len(),
            compressed.len()
        );
        let pair = SizePair {
            compressed: compressed.len() as u64,
            uncompressed: chunk.len() as u64,
        };
        BlockHeader {
            signature: BLOCK_SIGNATURE,
            max_block_size: MAX_BLOCK_SIZE,
            pairs: [pair, pair],
        }
        .write(&mut out)?;
        out.extend_from_slice(&compressed);
    }
    log::info!("compressed payload is {} bytes", out.len());
    Ok(out)
}

// ── Decompress direction ─────────────────────────────────

/// Unwrap the chunked compressed payload back into the raw SQLite file.
///
/// Every block must carry the expected signature and decompress to exactly
/// its declared size; the reassembled stream must hold a SQLite header
/// agreeing with the size preamble. No trailing bytes are tolerated.
pub fn decompress_payload(payload: &[u8], codec: &dyn Codec) -> Result<Vec<u8>> {
    log::info!("decompressing {} bytes of payload", payload.len());

    let mut cur = Cursor::new(payload);
    let mut stream = Vec::new();
    while (cur.position() as usize) < payload.len() {
        let offset = cur.position() as usize;
        let header = BlockHeader::read(&mut cur)?;
        if header.signature != BLOCK_SIGNATURE {
            return Err(Error::InvalidBlockSignature {
                offset,
                expected: BLOCK_SIGNATURE,
                found: header.signature,
            });
        }
        let pair = header.pairs[0];
        log::debug!(
            "block at {offset}: {} bytes compressed, {} uncompressed, scratch max {}",
            pair.compressed,
            pair.uncompressed,
            header.max_block_size
        );

        let remaining = payload.len() - cur.position() as usize;
        if pair.compressed > remaining as u64 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!(
                    "block at {offset} declares {} compressed bytes but only {remaining} remain",
                    pair.compressed
                ),
            )
            .into());
        }
        let mut body = vec![0u8; pair.compressed as usize];
        cur.read_exact(&mut body)?;

        let decompressed = codec.decompress(&body, pair.uncompressed as usize)?;
        if decompressed.len() as u64 != pair.uncompressed {
            return Err(Error::PartialDecompression {
                expected: pair.uncompressed,
                actual: decompressed.len() as u64,
            });
        }
        stream.extend_from_slice(&decompressed);
    }

    let mut stream_cur = Cursor::new(stream.as_slice());
    let preamble = SizePreamble::read(&mut stream_cur)?;
    log::info!(
        "container size {} bytes, database size {} bytes",
        preamble.container_size,
        preamble.sqlite_size
    );

    let sqlite_end = SizePreamble::SIZE + preamble.sqlite_size as usize;
    if sqlite_end > stream.len() {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!(
                "preamble declares {} database bytes but stream holds {}",
                preamble.sqlite_size,
                stream.len() - SizePreamble::SIZE
            ),
        )
        .into());
    }
    sqlite::validate(
        &stream[SizePreamble::SIZE..],
        u64::from(preamble.sqlite_size),
    )?;

    // Anything past sqlite_size is page-alignment filler; drop it along
    // with the preamble.
    Ok(stream[SizePreamble::SIZE..sqlite_end].to_vec())
}
