//! Well-known byte signatures recognized by the triage pipeline.
//!
//! All matching against these is exact at the byte level; container tags are
//! ASCII prefixes matched at buffer offset 0.

/// Gzip member magic.
pub const GZIP: &[u8] = &[0x1F, 0x8B];

/// Zlib stream header, default compression.
pub const ZLIB_DEFAULT: &[u8] = &[0x78, 0x9C];

/// Zlib stream header, best compression.
pub const ZLIB_BEST: &[u8] = &[0x78, 0xDA];

/// LZ4 frame format magic number.
pub const LZ4_FRAME: &[u8] = &[0x04, 0x22, 0x4D, 0x18];

/// PNG file header.
pub const PNG_HEADER: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

/// PNG IEND chunk type plus its constant CRC.
pub const PNG_FOOTER: &[u8] = &[0x49, 0x45, 0x4E, 0x44, 0xAE, 0x42, 0x60, 0x82];

/// JPEG start-of-image marker.
pub const JPEG_HEADER: &[u8] = &[0xFF, 0xD8];

/// JPEG end-of-image marker.
pub const JPEG_FOOTER: &[u8] = &[0xFF, 0xD9];

/// DOS/PE executable marker ("MZ").
pub const DOS_HEADER: &[u8] = &[0x4D, 0x5A];

/// UnityFS bundle tag.
pub const UNITY_FS: &[u8] = b"UnityFS";

/// UnityWeb bundle tag (old web player bundles).
pub const UNITY_WEB: &[u8] = b"UnityWeb";

/// UnityRaw bundle tag (uncompressed old-style bundles).
pub const UNITY_RAW: &[u8] = b"UnityRaw";
