//! End-to-end round trip through the real zlib codec, including the
//! read-file / transform / write-file flow the CLI performs.

use byteorder::{LittleEndian, WriteBytesExt};
use hlsaves::{transform, Direction, ZlibCodec};
use std::fs;

fn write_fstring(out: &mut Vec<u8>, text: &str) {
    out.write_i32::<LittleEndian>(text.len() as i32 + 1).unwrap();
    out.extend_from_slice(text.as_bytes());
    out.push(0);
}

/// A valid n-page SQLite image with recognizable body bytes.
fn sqlite_image(page_size: u16, page_count: u32) -> Vec<u8> {
    let total = page_size as usize * page_count as usize;
    let mut image: Vec<u8> = (0..total).map(|i| (i % 241) as u8).collect();
    image[..16].copy_from_slice(b"SQLite format 3\0");
    image[16..18].copy_from_slice(&page_size.to_be_bytes());
    image[18..28].fill(0);
    image[28..32].copy_from_slice(&page_count.to_be_bytes());
    image
}

/// A synthetic save file: GVAS header, filler properties, the
/// RawDatabaseImage property around `payload`, trailing filler.
fn save_file(payload: &[u8]) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.extend_from_slice(&0x53415647u32.to_le_bytes()); // "GVAS"
    buf.extend_from_slice(&2u32.to_le_bytes());
    buf.extend_from_slice(&3u32.to_le_bytes());
    buf.extend_from_slice(&4u16.to_le_bytes());
    buf.extend_from_slice(&27u16.to_le_bytes());
    buf.extend_from_slice(&2u16.to_le_bytes());
    buf.extend_from_slice(&0u32.to_le_bytes());
    buf.extend_from_slice(&[0xAB; 512]);

    write_fstring(&mut buf, "RawDatabaseImage");
    write_fstring(&mut buf, "ArrayProperty");
    buf.write_u64::<LittleEndian>(payload.len() as u64 + 4).unwrap();
    write_fstring(&mut buf, "ByteProperty");
    buf.push(0);
    buf.write_u32::<LittleEndian>(payload.len() as u32).unwrap();
    buf.extend_from_slice(payload);

    buf.extend_from_slice(&[0xCD; 256]);
    buf
}

#[test]
fn zlib_roundtrip_multi_block() {
    // 4096 * 64 = 262144 bytes: three blocks once the preamble is added.
    let image = sqlite_image(4096, 64);
    let old_form = save_file(&image);

    let new_form = transform(&old_form, Direction::Compress, &ZlibCodec).unwrap();
    let restored = transform(&new_form, Direction::Decompress, &ZlibCodec).unwrap();
    assert_eq!(restored, old_form);
}

#[test]
fn head_and_tail_survive_both_directions() {
    let image = sqlite_image(4096, 10);
    let old_form = save_file(&image);
    let head = &old_form[..22 + 512];
    let tail = &old_form[old_form.len() - 256..];

    let new_form = transform(&old_form, Direction::Compress, &ZlibCodec).unwrap();
    assert_eq!(&new_form[..head.len()], head);
    assert_eq!(&new_form[new_form.len() - 256..], tail);

    let back = transform(&new_form, Direction::Decompress, &ZlibCodec).unwrap();
    assert_eq!(&back[..head.len()], head);
    assert_eq!(&back[back.len() - 256..], tail);
}

#[test]
fn file_to_file_flow() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("HL-00-00.sav");
    let output = dir.path().join("HL-00-00.compressed.sav");

    let image = sqlite_image(4096, 10);
    let old_form = save_file(&image);
    fs::write(&input, &old_form).unwrap();

    let buffer = fs::read(&input).unwrap();
    let new_form = transform(&buffer, Direction::Compress, &ZlibCodec).unwrap();
    fs::write(&output, &new_form).unwrap();

    let reread = fs::read(&output).unwrap();
    let restored = transform(&reread, Direction::Decompress, &ZlibCodec).unwrap();
    assert_eq!(restored, old_form);
}

#[test]
fn failed_transform_produces_no_output() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("out.sav");

    // Already-compressed payload: compressing again must fail on the
    // SQLite magic and nothing may be written.
    let image = sqlite_image(4096, 10);
    let old_form = save_file(&image);
    let new_form = transform(&old_form, Direction::Compress, &ZlibCodec).unwrap();
    let result = transform(&new_form, Direction::Compress, &ZlibCodec);
    assert!(result.is_err());
    if result.is_err() {
        assert!(!output.exists());
    }
}
