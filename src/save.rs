//! Whole-file transform: split, rewrite the database property, reassemble.
//!
//! The save buffer is treated as three regions: `head` (everything before
//! the `RawDatabaseImage` property), the property itself, and `tail`
//! (everything after it). Only the property region is rewritten; head and
//! tail are copied through bit-for-bit.

use std::io;

use crate::codec::Codec;
use crate::error::Result;
use crate::gvas::{self, GvasHeader, RawImageProperty};
use crate::upk;

/// Which way the database payload is converted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Raw SQLite bytes into the chunked compressed container (old → new).
    Compress,
    /// Chunked compressed container into raw SQLite bytes (new → old).
    Decompress,
}

/// Transform the `RawDatabaseImage` payload of a full save buffer and
/// return the replacement buffer.
///
/// Any validation failure aborts before output exists, so callers can
/// never observe a half-transformed save.
pub fn transform(buffer: &[u8], direction: Direction, codec: &dyn Codec) -> Result<Vec<u8>> {
    let header = GvasHeader::parse(buffer)?;
    log::info!(
        "GVAS header: package {}, engine {}.{}.{} build {}{}",
        header.package,
        header.engine_major,
        header.engine_minor,
        header.engine_patch,
        header.build(),
        if header.is_licensee() { " (licensee)" } else { "" }
    );

    let offset = gvas::locate_property(buffer)?;
    let mut property = RawImageProperty::parse(buffer, offset)?;

    // The property's end is derived from its *declared* length, exactly as
    // the game serializes it.
    let tail_start = offset as u64 + property.footprint();
    if tail_start > buffer.len() as u64 {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!(
                "property at offset {offset} declares {} bytes but the file ends after {}",
                property.footprint(),
                buffer.len()
            ),
        )
        .into());
    }
    let tail_start = tail_start as usize;
    log::info!(
        "head: {offset} bytes, property: {} bytes, tail: {} bytes",
        property.footprint(),
        buffer.len() - tail_start
    );

    let payload = match direction {
        Direction::Compress => upk::compress_payload(property.data(), codec)?,
        Direction::Decompress => upk::decompress_payload(property.data(), codec)?,
    };
    property.set_data(payload);

    let encoded = property.serialize()?;
    let mut out = Vec::with_capacity(offset + encoded.len() + (buffer.len() - tail_start));
    out.extend_from_slice(&buffer[..offset]);
    out.extend_from_slice(&encoded);
    out.extend_from_slice(&buffer[tail_start..]);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::gvas::tests::build_property;
    use crate::gvas::{GVAS_SIGNATURE, GVAS_VERSION, RDI_NAME, RDI_TYPE, RDI_VALUE_TYPE};
    use crate::sqlite::tests::build_image;
    use crate::upk::tests::IdentityCodec;

    /// A full synthetic save: GVAS header, junk head bytes, the property,
    /// junk tail bytes.
    fn build_save(payload: &[u8]) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&GVAS_SIGNATURE.to_le_bytes());
        buf.extend_from_slice(&GVAS_VERSION.to_le_bytes());
        buf.extend_from_slice(&1u32.to_le_bytes());
        buf.extend_from_slice(&4u16.to_le_bytes());
        buf.extend_from_slice(&27u16.to_le_bytes());
        buf.extend_from_slice(&2u16.to_le_bytes());
        buf.extend_from_slice(&9999u32.to_le_bytes());
        buf.extend_from_slice(&[0x17; 300]); // other properties we never touch
        buf.extend_from_slice(&build_property(RDI_NAME, RDI_TYPE, RDI_VALUE_TYPE, payload));
        buf.extend_from_slice(&[0x71; 150]);
        buf
    }

    #[test]
    fn compress_then_decompress_restores_buffer() {
        let image = build_image(4096, 10);
        let original = build_save(&image);
        let compressed = transform(&original, Direction::Compress, &IdentityCodec).unwrap();
        assert_ne!(compressed, original);
        let restored = transform(&compressed, Direction::Decompress, &IdentityCodec).unwrap();
        assert_eq!(restored, original);
    }

    #[test]
    fn decompress_then_compress_reproduces_new_form_exactly() {
        let image = build_image(4096, 10);
        let payload = upk::compress_payload(&image, &IdentityCodec).unwrap();
        let new_form = build_save(&payload);
        let old_form = transform(&new_form, Direction::Decompress, &IdentityCodec).unwrap();
        let back = transform(&old_form, Direction::Compress, &IdentityCodec).unwrap();
        assert_eq!(back, new_form);
    }

    #[test]
    fn head_and_tail_pass_through_untouched() {
        let image = build_image(4096, 40);
        let original = build_save(&image);
        let head_len = GvasHeader::SIZE + 300;
        let out = transform(&original, Direction::Compress, &IdentityCodec).unwrap();
        assert_eq!(&out[..head_len], &original[..head_len]);
        assert_eq!(&out[out.len() - 150..], &original[original.len() - 150..]);
    }

    #[test]
    fn size_invariant_holds_after_transform() {
        let image = build_image(4096, 10);
        let original = build_save(&image);
        let out = transform(&original, Direction::Compress, &IdentityCodec).unwrap();
        let offset = gvas::locate_property(&out).unwrap();
        let property = RawImageProperty::parse(&out, offset).unwrap();
        assert_eq!(property.length(), property.data().len() as u64 + 4);
    }

    #[test]
    fn compressing_compressed_payload_fails_on_sqlite_magic() {
        let image = build_image(4096, 10);
        let payload = upk::compress_payload(&image, &IdentityCodec).unwrap();
        let new_form = build_save(&payload);
        assert!(matches!(
            transform(&new_form, Direction::Compress, &IdentityCodec),
            Err(Error::InvalidSqliteMagic)
        ));
    }

    #[test]
    fn missing_property_is_reported() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&GVAS_SIGNATURE.to_le_bytes());
        buf.extend_from_slice(&GVAS_VERSION.to_le_bytes());
        buf.extend_from_slice(&[0u8; 64]);
        assert!(matches!(
            transform(&buf, Direction::Decompress, &IdentityCodec),
            Err(Error::PropertyNotFound)
        ));
    }

    #[test]
    fn unrecognized_container_is_rejected_up_front() {
        let buf = vec![0x11u8; 64];
        assert!(matches!(
            transform(&buf, Direction::Decompress, &IdentityCodec),
            Err(Error::InvalidContainerSignature { .. })
        ));
    }

    #[test]
    fn overlong_declared_length_is_a_structural_error() {
        let image = build_image(4096, 10);
        let mut buf = build_save(&image);
        // Drop most of the tail so the declared footprint runs past EOF.
        let offset = gvas::locate_property(&buf).unwrap();
        buf.truncate(offset + 64);
        assert!(matches!(
            transform(&buf, Direction::Compress, &IdentityCodec),
            Err(Error::Io(_))
        ));
    }
}
