//! The external compression capability behind the chunk codec.
//!
//! The game compresses each block with Oodle Kraken. Decompression is
//! covered by the open-source `oozextract` crate — a pure Rust
//! implementation of the Kraken / Mermaid / Selkie / Leviathan
//! decompressors, no proprietary DLL required. *Re*-compression with Oodle
//! is not possible without the SDK, so a zlib codec (`flate2`) is provided
//! for workflows whose consumer accepts it, and the trait keeps the core
//! testable against in-memory fakes.

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::io::{Read, Write};

use crate::error::{Error, Result};

/// A synchronous, fallible compression backend. One call per chunk; the
/// chunk codec owns all framing and size validation.
pub trait Codec {
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>>;

    /// Decompress `data`, which is expected to expand to exactly
    /// `expected_len` bytes. Implementations may return a shorter or longer
    /// buffer; the caller treats any deviation as fatal.
    fn decompress(&self, data: &[u8], expected_len: usize) -> Result<Vec<u8>>;
}

/// Oodle codec backed by `oozextract`. Decompress-only.
pub struct OozCodec;

impl Codec for OozCodec {
    fn compress(&self, _data: &[u8]) -> Result<Vec<u8>> {
        Err(Error::Codec(
            "Oodle compression requires the proprietary SDK; select the zlib codec instead".into(),
        ))
    }

    fn decompress(&self, data: &[u8], expected_len: usize) -> Result<Vec<u8>> {
        let mut output = vec![0u8; expected_len];
        let mut extractor = oozextract::Extractor::new();
        extractor
            .read_from_slice(data, &mut output)
            .map_err(|e| Error::Codec(format!("Oodle decompress failed: {e:?}")))?;
        Ok(output)
    }
}

/// Zlib codec backed by `flate2`. Handles both directions.
pub struct ZlibCodec;

impl Codec for ZlibCodec {
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>> {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder
            .write_all(data)
            .map_err(|e| Error::Codec(format!("zlib compress: {e}")))?;
        encoder
            .finish()
            .map_err(|e| Error::Codec(format!("zlib compress: {e}")))
    }

    fn decompress(&self, data: &[u8], expected_len: usize) -> Result<Vec<u8>> {
        let mut output = Vec::with_capacity(expected_len);
        ZlibDecoder::new(data)
            .read_to_end(&mut output)
            .map_err(|e| Error::Codec(format!("zlib decompress: {e}")))?;
        Ok(output)
    }
}
