//! GVAS (Unreal Engine save container) framing for Hogwarts Legacy saves.
//!
//! A `.sav` file starts with a fixed GVAS header and carries a flat stream
//! of serialized UProperties. The only property this tool touches is
//! `RawDatabaseImage`, an `ArrayProperty` of `ByteProperty` holding the
//! embedded SQLite database. Everything else in the file is opaque and
//! passes through byte-for-byte.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Cursor, Read};

use crate::error::{Error, Result};

/// "GVAS" in little-endian.
pub const GVAS_SIGNATURE: u32 = 0x5341_5647;
/// Save game version Hogwarts Legacy writes.
pub const GVAS_VERSION: u32 = 2;

/// Name of the property holding the embedded database.
pub const RDI_NAME: &str = "RawDatabaseImage";
/// Outer property type tag.
pub const RDI_TYPE: &str = "ArrayProperty";
/// Element type tag of the array.
pub const RDI_VALUE_TYPE: &str = "ByteProperty";

/// Bytes between the property's start and its value bytes, minus the four
/// bytes of the element-count field that the declared length already covers:
/// name (21) + type (18) + length (8) + element type (17) + terminator (1).
pub const RDI_DATA_OFFSET: u64 = 65;

/// The declared ArrayProperty length covers the value bytes plus the
/// four-byte element count preceding them.
pub const ARRAY_LENGTH_PADDING: u64 = 4;

/// Serialized form of the property's name field: i32 length prefix followed
/// by "RawDatabaseImage" and its terminating NUL. The length prefix is part
/// of the needle so that save data merely *containing* the text cannot
/// produce a false match.
const PROPERTY_NEEDLE: [u8; 21] = [
    0x11, 0x00, 0x00, 0x00, // length 17
    b'R', b'a', b'w', b'D', b'a', b't', b'a', b'b', b'a', b's', b'e', b'I', b'm', b'a', b'g',
    b'e', 0x00,
];

// ── FString ──────────────────────────────────────────────

/// Pascal-style length-prefixed string.
///
/// Positive length means ANSI bytes (terminating NUL included in the data),
/// zero means absent, negative means UCS-2 — a variant the original tool
/// never implemented and which we reject outright. The payload bytes are
/// kept verbatim so re-serialization is exact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FString {
    data: Vec<u8>,
}

impl FString {
    pub fn read(cur: &mut Cursor<&[u8]>) -> Result<FString> {
        let len = cur.read_i32::<LittleEndian>()?;
        if len < 0 {
            return Err(Error::UnsupportedEncoding(len));
        }
        let mut data = vec![0u8; len as usize];
        cur.read_exact(&mut data)?;
        Ok(FString { data })
    }

    pub fn write(&self, out: &mut Vec<u8>) -> Result<()> {
        out.write_i32::<LittleEndian>(self.data.len() as i32)?;
        out.extend_from_slice(&self.data);
        Ok(())
    }

    /// True when this string is exactly `text` plus a terminating NUL.
    pub fn is(&self, text: &str) -> bool {
        self.data.len() == text.len() + 1
            && &self.data[..text.len()] == text.as_bytes()
            && self.data[text.len()] == 0
    }

    /// Lossy text view for log and error messages (trailing NUL trimmed).
    pub fn display(&self) -> String {
        let trimmed = match self.data.last() {
            Some(0) => &self.data[..self.data.len() - 1],
            _ => &self.data[..],
        };
        String::from_utf8_lossy(trimmed).into_owned()
    }

    /// Serialized size: length prefix plus payload bytes.
    pub fn serialized_len(&self) -> u64 {
        4 + self.data.len() as u64
    }

    #[cfg(test)]
    pub fn from_literal(text: &str) -> FString {
        let mut data = text.as_bytes().to_vec();
        data.push(0);
        FString { data }
    }
}

// ── GVAS header ──────────────────────────────────────────

/// Fixed header at the start of every `.sav` file. Only signature and
/// version are validated; the remaining fields are diagnostic and pass
/// through with the head region.
#[derive(Debug, Clone)]
pub struct GvasHeader {
    pub signature: u32,
    pub version: u32,
    pub package: u32,
    pub engine_major: u16,
    pub engine_minor: u16,
    pub engine_patch: u16,
    pub changelist: u32,
}

impl GvasHeader {
    /// Serialized size of the fields this tool inspects.
    pub const SIZE: usize = 22;

    pub fn parse(buffer: &[u8]) -> Result<GvasHeader> {
        let mut cur = Cursor::new(buffer);
        let signature = cur.read_u32::<LittleEndian>()?;
        if signature != GVAS_SIGNATURE {
            return Err(Error::InvalidContainerSignature {
                expected: GVAS_SIGNATURE,
                found: signature,
            });
        }
        let version = cur.read_u32::<LittleEndian>()?;
        if version != GVAS_VERSION {
            return Err(Error::InvalidContainerVersion {
                expected: GVAS_VERSION,
                found: version,
            });
        }
        let package = cur.read_u32::<LittleEndian>()?;
        let engine_major = cur.read_u16::<LittleEndian>()?;
        let engine_minor = cur.read_u16::<LittleEndian>()?;
        let engine_patch = cur.read_u16::<LittleEndian>()?;
        let changelist = cur.read_u32::<LittleEndian>()?;
        Ok(GvasHeader {
            signature,
            version,
            package,
            engine_major,
            engine_minor,
            engine_patch,
            changelist,
        })
    }

    /// Build number without the licensee flag.
    pub fn build(&self) -> u32 {
        self.changelist & 0x7fff_ffff
    }

    /// High bit of the changelist marks licensee builds.
    pub fn is_licensee(&self) -> bool {
        self.changelist & 0x8000_0000 != 0
    }
}

// ── Property locator ─────────────────────────────────────

/// Find the start offset of the serialized `RawDatabaseImage` property.
/// Returns the first occurrence of the full name field (length prefix,
/// text, NUL).
pub fn locate_property(buffer: &[u8]) -> Result<usize> {
    buffer
        .windows(PROPERTY_NEEDLE.len())
        .position(|window| window == PROPERTY_NEEDLE)
        .ok_or(Error::PropertyNotFound)
}

// ── RawDatabaseImage property ────────────────────────────

/// The `RawDatabaseImage` ArrayProperty and its ByteProperty payload.
///
/// Wire layout: name FString, type FString, declared length u64, element
/// type FString, terminator byte, element count u32, value bytes. The
/// declared length always equals the element count plus
/// [`ARRAY_LENGTH_PADDING`].
#[derive(Debug, Clone)]
pub struct RawImageProperty {
    name: FString,
    prop_type: FString,
    length: u64,
    value_type: FString,
    terminator: u8,
    data: Vec<u8>,
}

impl RawImageProperty {
    /// Parse the property starting at `offset`, validating all three type
    /// tags against their fixed expected values.
    pub fn parse(buffer: &[u8], offset: usize) -> Result<RawImageProperty> {
        let mut cur = Cursor::new(&buffer[offset..]);

        let name = FString::read(&mut cur)?;
        expect_tag(&name, RDI_NAME)?;
        let prop_type = FString::read(&mut cur)?;
        expect_tag(&prop_type, RDI_TYPE)?;
        let length = cur.read_u64::<LittleEndian>()?;
        let value_type = FString::read(&mut cur)?;
        expect_tag(&value_type, RDI_VALUE_TYPE)?;
        let terminator = cur.read_u8()?;
        let count = cur.read_u32::<LittleEndian>()?;
        let mut data = vec![0u8; count as usize];
        cur.read_exact(&mut data)?;

        log::debug!(
            "parsed {} ({}) declared length {} bytes, {} value bytes",
            name.display(),
            prop_type.display(),
            length,
            count
        );

        Ok(RawImageProperty {
            name,
            prop_type,
            length,
            value_type,
            terminator,
            data,
        })
    }

    /// Declared ArrayProperty length as read from (or recomputed for) the
    /// wire.
    pub fn length(&self) -> u64 {
        self.length
    }

    /// Total serialized size of the property, framing included.
    pub fn footprint(&self) -> u64 {
        self.length + RDI_DATA_OFFSET
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Replace the payload and recompute the declared length, keeping the
    /// `count + 4 == length` invariant.
    pub fn set_data(&mut self, data: Vec<u8>) {
        self.length = data.len() as u64 + ARRAY_LENGTH_PADDING;
        self.data = data;
    }

    /// Re-serialize the property. Tag strings are written back verbatim;
    /// length and element count reflect the current payload.
    pub fn serialize(&self) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(self.footprint() as usize);
        self.name.write(&mut out)?;
        self.prop_type.write(&mut out)?;
        out.write_u64::<LittleEndian>(self.length)?;
        self.value_type.write(&mut out)?;
        out.write_u8(self.terminator)?;
        out.write_u32::<LittleEndian>(self.data.len() as u32)?;
        out.extend_from_slice(&self.data);
        Ok(out)
    }
}

fn expect_tag(tag: &FString, expected: &'static str) -> Result<()> {
    if tag.is(expected) {
        Ok(())
    } else {
        Err(Error::PropertyTypeMismatch {
            expected,
            found: tag.display(),
        })
    }
}
