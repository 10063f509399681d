//! Embedded sub-resource carving.
//!
//! Hints are advisory: ranges may overlap, and a start marker with no end
//! marker is reported as a single truncated hint running to the buffer end.

use std::fmt;

use serde::Serialize;

use crate::scan;
use crate::signatures;

/// Executable candidates shorter than this are treated as marker-byte
/// coincidences and dropped.
pub const MIN_EXECUTABLE_LEN: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ResourceKind {
    Png,
    Jpeg,
    PeExecutable,
}

impl ResourceKind {
    #[must_use]
    pub const fn extension(&self) -> &'static str {
        match self {
            ResourceKind::Png => "png",
            ResourceKind::Jpeg => "jpg",
            ResourceKind::PeExecutable => "exe",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKind::Png => write!(f, "PNG"),
            ResourceKind::Jpeg => write!(f, "JPEG"),
            ResourceKind::PeExecutable => write!(f, "PE executable"),
        }
    }
}

/// An advisory byte range believed to contain an embedded resource.
/// `end` is exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResourceHint {
    pub kind: ResourceKind,
    pub start: u64,
    pub end: u64,
}

impl ResourceHint {
    #[must_use]
    pub fn len(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

/// Scans `buffer` for embedded PNGs, JPEGs, and PE executables.
#[must_use]
pub fn carve(buffer: &[u8]) -> Vec<ResourceHint> {
    let mut hints = Vec::new();
    carve_image(
        buffer,
        ResourceKind::Png,
        signatures::PNG_HEADER,
        signatures::PNG_FOOTER,
        &mut hints,
    );
    carve_image(
        buffer,
        ResourceKind::Jpeg,
        signatures::JPEG_HEADER,
        signatures::JPEG_FOOTER,
        &mut hints,
    );
    carve_executables(buffer, &mut hints);
    hints.sort_by_key(|h| (h.start, h.end));
    hints
}

fn carve_image(
    buffer: &[u8],
    kind: ResourceKind,
    start_sig: &[u8],
    end_sig: &[u8],
    hints: &mut Vec<ResourceHint>,
) {
    let mut pos = 0usize;
    while let Some(start) = scan::find_first(buffer, start_sig, pos) {
        match scan::find_first(buffer, end_sig, start + start_sig.len()) {
            Some(end_idx) => {
                let end = end_idx + end_sig.len();
                hints.push(ResourceHint {
                    kind,
                    start: start as u64,
                    end: end as u64,
                });
                pos = end;
            }
            None => {
                // Truncated trailing resource: one terminal hint per kind.
                log::debug!("{kind} start at {start} has no end marker; assuming truncated");
                hints.push(ResourceHint {
                    kind,
                    start: start as u64,
                    end: buffer.len() as u64,
                });
                break;
            }
        }
    }
}

fn carve_executables(buffer: &[u8], hints: &mut Vec<ResourceHint>) {
    const BOUNDARY_SIGNATURES: [&[u8]; 4] = [
        signatures::PNG_HEADER,
        signatures::JPEG_HEADER,
        signatures::GZIP,
        signatures::LZ4_FRAME,
    ];

    let markers = scan::find_all(buffer, signatures::DOS_HEADER, 0);
    for (i, &start) in markers.iter().enumerate() {
        let search_from = start + signatures::DOS_HEADER.len();
        let mut end = buffer.len();
        for sig in BOUNDARY_SIGNATURES {
            if let Some(idx) = scan::find_first(buffer, sig, search_from) {
                end = end.min(idx);
            }
        }
        if let Some(&next) = markers.get(i + 1) {
            end = end.min(next);
        }

        let len = end.saturating_sub(start);
        if len < MIN_EXECUTABLE_LEN {
            log::debug!("discarding executable candidate at {start}: only {len} bytes");
            continue;
        }
        hints.push(ResourceHint {
            kind: ResourceKind::PeExecutable,
            start: start as u64,
            end: end as u64,
        });
    }
}
