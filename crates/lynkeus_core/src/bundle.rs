//! Opportunistic Unity bundle header parsing.
//!
//! Classification is by ASCII tag at offset 0 (`UnityFS`, `UnityWeb`,
//! `UnityRaw`). Buffers without a tag get one chance at a SerializedFile
//! interpretation, accepted only when every plausibility constraint holds.
//! The directory table that follows a structured header is normally itself
//! compressed, so entry names are recovered heuristically and carry an
//! explicit degraded-confidence marker.

use std::fmt;
use std::sync::LazyLock;

use regex::bytes::Regex;
use serde::Serialize;

use crate::error::{CoreError, Result};
use crate::signatures;

const SERIALIZED_PROBE_MIN_LEN: usize = 20;

/// Shared field set of the UnityFS / UnityWeb / UnityRaw header dialects.
/// The four size/flag words are little-endian regardless of payload content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BundleFileHeader {
    pub signature: String,
    pub format_version: String,
    pub engine_version: String,
    pub engine_revision: String,
    pub total_size: u32,
    pub compressed_size: u32,
    pub uncompressed_size: u32,
    pub flags: u32,
}

/// SerializedFile header accepted only after passing all plausibility checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SerializedFileHeader {
    pub metadata_size: u32,
    pub file_size: u32,
    pub version: u32,
    pub data_offset: u32,
    pub little_endian: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind")]
pub enum BundleHeader {
    UnityFs(BundleFileHeader),
    UnityWeb(BundleFileHeader),
    UnityRaw(BundleFileHeader),
    SerializedFile(SerializedFileHeader),
    Unrecognized,
}

impl fmt::Display for BundleHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BundleHeader::UnityFs(h) | BundleHeader::UnityWeb(h) | BundleHeader::UnityRaw(h) => {
                write!(
                    f,
                    "{} {} \u{2022} {} ({}) flags={}",
                    h.signature, h.format_version, h.engine_version, h.engine_revision, h.flags
                )
            }
            BundleHeader::SerializedFile(h) => write!(
                f,
                "SerializedFile v{} (offset={}, little={})",
                h.version, h.data_offset, h.little_endian
            ),
            BundleHeader::Unrecognized => write!(f, "Unknown format"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Confidence {
    /// Entries decoded from a real directory table.
    Exact,
    /// Entries recovered by name-pattern scanning; offsets approximate,
    /// completeness not guaranteed.
    Degraded,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryHint {
    pub name: String,
    pub approx_offset: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirectoryListing {
    pub entries: Vec<EntryHint>,
    pub confidence: Confidence,
    pub note: String,
}

struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn position(&self) -> usize {
        self.pos
    }

    fn truncated(&self, needed: usize) -> CoreError {
        CoreError::Truncated {
            offset: self.pos,
            needed,
            available: self.data.len().saturating_sub(self.pos),
        }
    }

    fn read_u8(&mut self) -> Result<u8> {
        let byte = *self.data.get(self.pos).ok_or_else(|| self.truncated(1))?;
        self.pos += 1;
        Ok(byte)
    }

    fn read_u32_le(&mut self) -> Result<u32> {
        let end = self.pos + 4;
        let bytes = self
            .data
            .get(self.pos..end)
            .ok_or_else(|| self.truncated(4))?;
        let value = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        self.pos = end;
        Ok(value)
    }

    /// Reads a null-terminated ASCII string, consuming the terminator.
    fn read_cstr(&mut self) -> Result<String> {
        let start = self.pos;
        let rest = &self.data[start.min(self.data.len())..];
        let nul = rest
            .iter()
            .position(|&b| b == 0)
            .ok_or_else(|| self.truncated(rest.len() + 1))?;
        let bytes = &rest[..nul];
        if !bytes.is_ascii() {
            return Err(CoreError::InvalidFormat(format!(
                "non-ASCII byte in header string at offset {start}"
            )));
        }
        self.pos = start + nul + 1;
        Ok(bytes.iter().map(|&b| b as char).collect())
    }
}

fn parse_structured_header(buffer: &[u8]) -> Result<(BundleFileHeader, usize)> {
    let mut reader = ByteReader::new(buffer);
    let signature = reader.read_cstr()?;
    let format_version = reader.read_cstr()?;
    let engine_version = reader.read_cstr()?;
    let engine_revision = reader.read_cstr()?;
    let total_size = reader.read_u32_le()?;
    let compressed_size = reader.read_u32_le()?;
    let uncompressed_size = reader.read_u32_le()?;
    let flags = reader.read_u32_le()?;

    Ok((
        BundleFileHeader {
            signature,
            format_version,
            engine_version,
            engine_revision,
            total_size,
            compressed_size,
            uncompressed_size,
            flags,
        },
        reader.position(),
    ))
}

/// Classifies `buffer` and decodes its header.
///
/// Returns `Unrecognized` when no tag matches and the SerializedFile probe is
/// rejected; returns an error only when a recognized tag is followed by a
/// truncated header.
pub fn parse_header(buffer: &[u8]) -> Result<BundleHeader> {
    if buffer.starts_with(signatures::UNITY_FS) {
        let (header, _) = parse_structured_header(buffer)?;
        return Ok(BundleHeader::UnityFs(header));
    }
    if buffer.starts_with(signatures::UNITY_WEB) {
        let (header, _) = parse_structured_header(buffer)?;
        return Ok(BundleHeader::UnityWeb(header));
    }
    if buffer.starts_with(signatures::UNITY_RAW) {
        let (header, _) = parse_structured_header(buffer)?;
        return Ok(BundleHeader::UnityRaw(header));
    }

    log::debug!("no bundle tag at offset 0; probing for a SerializedFile header");
    Ok(probe_serialized_file(buffer)
        .map_or(BundleHeader::Unrecognized, BundleHeader::SerializedFile))
}

/// SerializedFile probe. Every constraint must hold simultaneously or the
/// interpretation is rejected; this keeps random data out of structured
/// results.
pub fn probe_serialized_file(buffer: &[u8]) -> Option<SerializedFileHeader> {
    if buffer.len() < SERIALIZED_PROBE_MIN_LEN {
        return None;
    }

    let mut reader = ByteReader::new(buffer);
    let metadata_size = reader.read_u32_le().ok()?;
    let file_size = reader.read_u32_le().ok()?;
    let version = reader.read_u32_le().ok()?;
    let data_offset = reader.read_u32_le().ok()?;
    let endian = reader.read_u8().ok()?;

    let plausible = metadata_size > 0
        && metadata_size < file_size
        && file_size as usize <= buffer.len()
        && data_offset < file_size
        && (endian == 0 || endian == 1);

    plausible.then_some(SerializedFileHeader {
        metadata_size,
        file_size,
        version,
        data_offset,
        little_endian: endian == 1,
    })
}

static ENTRY_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(CAB-[A-Za-z0-9_-]+|sharedassets\d+\.assets|level\d+\.assets)")
        .expect("invalid entry-name pattern - this is a bug")
});

fn scan_entry_names(buffer: &[u8], start: usize) -> Vec<EntryHint> {
    let region = &buffer[start.min(buffer.len())..];
    ENTRY_NAME
        .find_iter(region)
        .map(|m| EntryHint {
            name: String::from_utf8_lossy(m.as_bytes()).into_owned(),
            approx_offset: (start + m.start()) as u64,
        })
        .collect()
}

/// Recovers container entry names for a classified header.
///
/// Structured dialects get the degraded name-pattern scan over the bytes
/// following the header; other classifications have no directory region.
pub fn list_entries(buffer: &[u8], header: &BundleHeader) -> DirectoryListing {
    match header {
        BundleHeader::UnityFs(_) => {
            let start = parse_structured_header(buffer).map_or(0, |(_, len)| len);
            let entries = scan_entry_names(buffer, start);
            log::debug!("recovered {} entry name(s) heuristically", entries.len());
            DirectoryListing {
                entries,
                confidence: Confidence::Degraded,
                note: "directory likely compressed; names recovered heuristically, offsets approximate"
                    .to_string(),
            }
        }
        BundleHeader::UnityWeb(_) | BundleHeader::UnityRaw(_) => {
            // Old web-player bundles hold one compressed stream after the
            // header; there is no directory table to recover names from.
            let start = parse_structured_header(buffer).map_or(0, |(_, len)| len);
            DirectoryListing {
                entries: vec![EntryHint {
                    name: "(contents likely a compressed stream)".to_string(),
                    approx_offset: start as u64,
                }],
                confidence: Confidence::Degraded,
                note: "contents likely a compressed stream; directory not parsed".to_string(),
            }
        }
        BundleHeader::SerializedFile(_) | BundleHeader::Unrecognized => DirectoryListing {
            entries: Vec::new(),
            confidence: Confidence::Degraded,
            note: "no directory region to scan".to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn structured_bytes(tag: &str) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(tag.as_bytes());
        buf.push(0);
        buf.extend_from_slice(b"6.x\0");
        buf.extend_from_slice(b"5.6.3p1\0");
        buf.extend_from_slice(b"abcdef123456\0");
        buf.extend_from_slice(&1024u32.to_le_bytes());
        buf.extend_from_slice(&512u32.to_le_bytes());
        buf.extend_from_slice(&2048u32.to_le_bytes());
        buf.extend_from_slice(&67u32.to_le_bytes());
        buf
    }

    #[test]
    fn parses_unityfs_header() {
        let buf = structured_bytes("UnityFS");
        let header = parse_header(&buf).unwrap();
        match header {
            BundleHeader::UnityFs(h) => {
                assert_eq!(h.signature, "UnityFS");
                assert_eq!(h.format_version, "6.x");
                assert_eq!(h.engine_version, "5.6.3p1");
                assert_eq!(h.engine_revision, "abcdef123456");
                assert_eq!(h.total_size, 1024);
                assert_eq!(h.compressed_size, 512);
                assert_eq!(h.uncompressed_size, 2048);
                assert_eq!(h.flags, 67);
            }
            other => panic!("expected UnityFS, got {other:?}"),
        }
    }

    #[test]
    fn parses_unityweb_and_unityraw_headers() {
        assert!(matches!(
            parse_header(&structured_bytes("UnityWeb")).unwrap(),
            BundleHeader::UnityWeb(_)
        ));
        assert!(matches!(
            parse_header(&structured_bytes("UnityRaw")).unwrap(),
            BundleHeader::UnityRaw(_)
        ));
    }

    #[test]
    fn non_ascii_header_field_is_rejected() {
        let mut buf = b"UnityFS\0".to_vec();
        buf.extend_from_slice(&[0xC3, 0xA9, 0x00]); // "é", not ASCII
        buf.extend_from_slice(b"5.6.3p1\0");
        buf.extend_from_slice(b"abcdef123456\0");
        buf.extend_from_slice(&[0u8; 16]);

        assert!(matches!(
            parse_header(&buf),
            Err(CoreError::InvalidFormat(_))
        ));
    }

    #[test]
    fn unityweb_listing_is_a_single_advisory_entry() {
        let mut buf = structured_bytes("UnityWeb");
        let header_len = buf.len();
        // Any name-like bytes in the stream region must not become entries.
        buf.extend_from_slice(b"CAB-0011aabb");

        let header = parse_header(&buf).unwrap();
        let listing = list_entries(&buf, &header);

        assert_eq!(listing.confidence, Confidence::Degraded);
        assert_eq!(listing.entries.len(), 1);
        assert_eq!(
            listing.entries[0].name,
            "(contents likely a compressed stream)"
        );
        assert_eq!(listing.entries[0].approx_offset, header_len as u64);
    }

    #[test]
    fn truncated_structured_header_is_an_error() {
        let buf = b"UnityFS\0 6.x".to_vec();
        assert!(parse_header(&buf).is_err());
    }

    #[test]
    fn header_summary_line() {
        let header = parse_header(&structured_bytes("UnityFS")).unwrap();
        assert_eq!(
            header.to_string(),
            "UnityFS 6.x \u{2022} 5.6.3p1 (abcdef123456) flags=67"
        );
    }

    fn serialized_bytes(metadata_size: u32, file_size: u32, data_offset: u32, endian: u8) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&metadata_size.to_le_bytes());
        buf.extend_from_slice(&file_size.to_le_bytes());
        buf.extend_from_slice(&17u32.to_le_bytes());
        buf.extend_from_slice(&data_offset.to_le_bytes());
        buf.push(endian);
        buf.resize(64, 0xCC);
        buf
    }

    #[test]
    fn probe_accepts_a_plausible_serialized_file() {
        let buf = serialized_bytes(16, 64, 32, 1);
        let header = parse_header(&buf).unwrap();
        match header {
            BundleHeader::SerializedFile(h) => {
                assert_eq!(h.metadata_size, 16);
                assert_eq!(h.file_size, 64);
                assert_eq!(h.version, 17);
                assert_eq!(h.data_offset, 32);
                assert!(h.little_endian);
            }
            other => panic!("expected SerializedFile, got {other:?}"),
        }
    }

    #[test]
    fn probe_rejects_metadata_size_not_less_than_file_size() {
        let buf = serialized_bytes(64, 64, 32, 1);
        assert_eq!(parse_header(&buf).unwrap(), BundleHeader::Unrecognized);
    }

    #[test]
    fn probe_rejects_file_size_beyond_buffer() {
        let buf = serialized_bytes(16, 4096, 32, 1);
        assert_eq!(parse_header(&buf).unwrap(), BundleHeader::Unrecognized);
    }

    #[test]
    fn probe_rejects_data_offset_past_file_size() {
        let buf = serialized_bytes(16, 64, 64, 1);
        assert_eq!(parse_header(&buf).unwrap(), BundleHeader::Unrecognized);
    }

    #[test]
    fn probe_rejects_invalid_endian_byte() {
        let buf = serialized_bytes(16, 64, 32, 2);
        assert_eq!(parse_header(&buf).unwrap(), BundleHeader::Unrecognized);
    }

    #[test]
    fn probe_rejects_short_buffers() {
        assert!(probe_serialized_file(&[0u8; 19]).is_none());
    }

    #[test]
    fn entry_names_are_recovered_heuristically() {
        let mut buf = structured_bytes("UnityFS");
        let header_len = buf.len();
        buf.extend_from_slice(&[0xFF, 0x00, 0x55]);
        buf.extend_from_slice(b"CAB-4a1b2c3d");
        buf.extend_from_slice(&[0x00, 0x13]);
        buf.extend_from_slice(b"sharedassets0.assets");
        buf.extend_from_slice(&[0x99]);
        buf.extend_from_slice(b"level12.assets");

        let header = parse_header(&buf).unwrap();
        let listing = list_entries(&buf, &header);

        assert_eq!(listing.confidence, Confidence::Degraded);
        let names: Vec<&str> = listing.entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(
            names,
            ["CAB-4a1b2c3d", "sharedassets0.assets", "level12.assets"]
        );
        assert_eq!(listing.entries[0].approx_offset, (header_len + 3) as u64);
    }

    #[test]
    fn unrecognized_buffers_have_no_directory() {
        let buf = vec![0u8; 64];
        let header = parse_header(&buf).unwrap();
        assert_eq!(header, BundleHeader::Unrecognized);
        let listing = list_entries(&buf, &header);
        assert!(listing.entries.is_empty());
    }
}
