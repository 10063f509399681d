//! Best-effort decompression engine.
//!
//! One request walks a fixed ladder: acquire both codec families, try
//! deflate-family candidates in ascending signature-offset order, then LZ4
//! frame occurrences, then a whole-buffer inflate as the last resort. The
//! first successful decode wins; every attempt and every skip is recorded in
//! order so a caller can always reconstruct why the engine ended where it did.

use std::fmt;

use serde::Serialize;

use crate::codec::{
    self, AcquisitionReport, CodecFamily, CodecSource, DeflateBackend, Flate2Source, FrameBackend,
    Lz4FlexSource,
};
use crate::scan;
use crate::signatures;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CompressionKind {
    Gzip,
    Zlib,
    Lz4Frame,
    WholeBufferInflate,
}

impl CompressionKind {
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            CompressionKind::Gzip => "gzip",
            CompressionKind::Zlib => "zlib(deflate)",
            CompressionKind::Lz4Frame => "lz4(frame)",
            CompressionKind::WholeBufferInflate => "zlib(deflate entire file)",
        }
    }
}

impl fmt::Display for CompressionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AttemptOutcome {
    Success,
    Failure,
    Skipped,
}

/// One entry in the engine's ordered diagnostic log. Never reordered or
/// pruned. `offset` is absent for skip entries that do not concern a single
/// buffer position.
#[derive(Debug, Clone, Serialize)]
pub struct DecompressionAttempt {
    pub kind: CompressionKind,
    pub offset: Option<u64>,
    pub outcome: AttemptOutcome,
    pub message: String,
}

impl fmt::Display for DecompressionAttempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Terminal value of one engine run.
#[derive(Debug)]
pub struct DecompressionResult {
    pub decompressed: Option<Vec<u8>>,
    pub kind_used: Option<CompressionKind>,
    pub attempts: Vec<DecompressionAttempt>,
    pub deflate_acquisition: AcquisitionReport,
    pub frame_acquisition: AcquisitionReport,
}

impl DecompressionResult {
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.kind_used.is_some()
    }

    /// The attempt log rendered as plain strings, in recorded order.
    #[must_use]
    pub fn attempt_messages(&self) -> Vec<String> {
        self.attempts.iter().map(|a| a.message.clone()).collect()
    }
}

/// Ordered codec provider lists, one per family. List order is the declared
/// fallback priority.
pub struct EngineConfig {
    pub deflate_sources: Vec<Box<dyn CodecSource<dyn DeflateBackend>>>,
    pub frame_sources: Vec<Box<dyn CodecSource<dyn FrameBackend>>>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            deflate_sources: vec![Box::new(Flate2Source)],
            frame_sources: vec![Box::new(Lz4FlexSource)],
        }
    }
}

/// Runs the full decompression ladder over `buffer`.
pub fn decompress(buffer: &[u8], config: &EngineConfig) -> DecompressionResult {
    // Both families are acquired unconditionally; neither blocks the other.
    let deflate = codec::acquire(CodecFamily::Deflate, &config.deflate_sources);
    let frame = codec::acquire(CodecFamily::Lz4Frame, &config.frame_sources);

    let mut attempts: Vec<DecompressionAttempt> = Vec::new();
    let mut decompressed: Option<Vec<u8>> = None;
    let mut kind_used: Option<CompressionKind> = None;

    // Earliest instance of each deflate-family signature is a candidate
    // start; lowest offset is tried first. The push order below is the fixed
    // tie-break among equal offsets.
    let mut candidates: Vec<(usize, CompressionKind)> = Vec::new();
    for (signature, kind) in [
        (signatures::GZIP, CompressionKind::Gzip),
        (signatures::ZLIB_DEFAULT, CompressionKind::Zlib),
        (signatures::ZLIB_BEST, CompressionKind::Zlib),
    ] {
        if let Some(offset) = scan::find_first(buffer, signature, 0) {
            candidates.push((offset, kind));
        }
    }
    candidates.sort_by_key(|&(offset, _)| offset);

    if let (Some(backend), false) = (&deflate.backend, candidates.is_empty()) {
        for &(offset, kind) in &candidates {
            let sub = &buffer[offset..];
            let decoded = match kind {
                CompressionKind::Gzip => backend.ungzip(sub),
                _ => backend.inflate(sub),
            };
            match decoded {
                Ok(out) => {
                    log::debug!("{kind} decoded at offset {offset} ({} bytes)", out.len());
                    attempts.push(DecompressionAttempt {
                        kind,
                        offset: Some(offset as u64),
                        outcome: AttemptOutcome::Success,
                        message: format!("{kind} at offset {offset} decoded OK"),
                    });
                    decompressed = Some(out);
                    kind_used = Some(kind);
                    break;
                }
                Err(err) => {
                    attempts.push(DecompressionAttempt {
                        kind,
                        offset: Some(offset as u64),
                        outcome: AttemptOutcome::Failure,
                        message: format!("{kind} at offset {offset} failed: {err}"),
                    });
                }
            }
        }
    } else {
        attempts.push(DecompressionAttempt {
            kind: CompressionKind::Zlib,
            offset: None,
            outcome: AttemptOutcome::Skipped,
            message: "deflate backend not available or no gzip/zlib signatures found".to_string(),
        });
    }

    if decompressed.is_none() {
        let frame_offsets = scan::find_all(buffer, signatures::LZ4_FRAME, 0);
        match (&frame.backend, frame_offsets.is_empty()) {
            (Some(backend), false) => {
                for &offset in &frame_offsets {
                    match backend.decode_frame(&buffer[offset..]) {
                        Ok(out) => {
                            log::debug!("lz4 frame decoded at offset {offset} ({} bytes)", out.len());
                            attempts.push(DecompressionAttempt {
                                kind: CompressionKind::Lz4Frame,
                                offset: Some(offset as u64),
                                outcome: AttemptOutcome::Success,
                                message: format!("LZ4 frame at offset {offset} decompressed OK"),
                            });
                            decompressed = Some(out);
                            kind_used = Some(CompressionKind::Lz4Frame);
                            break;
                        }
                        Err(err) => {
                            attempts.push(DecompressionAttempt {
                                kind: CompressionKind::Lz4Frame,
                                offset: Some(offset as u64),
                                outcome: AttemptOutcome::Failure,
                                message: format!("LZ4 frame at offset {offset} failed: {err}"),
                            });
                        }
                    }
                }
            }
            (None, _) => {
                attempts.push(DecompressionAttempt {
                    kind: CompressionKind::Lz4Frame,
                    offset: None,
                    outcome: AttemptOutcome::Skipped,
                    message: "LZ4 backend not available; skipping LZ4 frame attempts".to_string(),
                });
            }
            (Some(_), true) => {
                attempts.push(DecompressionAttempt {
                    kind: CompressionKind::Lz4Frame,
                    offset: None,
                    outcome: AttemptOutcome::Skipped,
                    message: "no LZ4 frame signatures found".to_string(),
                });
            }
        }
    }

    // Last resort: many payloads are bare deflate streams with no
    // magic-byte-aligned header at all.
    if decompressed.is_none() {
        if let Some(backend) = &deflate.backend {
            match backend.inflate_any(buffer) {
                Ok(out) => {
                    log::debug!("whole-buffer inflate produced {} bytes", out.len());
                    attempts.push(DecompressionAttempt {
                        kind: CompressionKind::WholeBufferInflate,
                        offset: Some(0),
                        outcome: AttemptOutcome::Success,
                        message: "inflated entire buffer successfully (best effort)".to_string(),
                    });
                    decompressed = Some(out);
                    kind_used = Some(CompressionKind::WholeBufferInflate);
                }
                Err(err) => {
                    attempts.push(DecompressionAttempt {
                        kind: CompressionKind::WholeBufferInflate,
                        offset: Some(0),
                        outcome: AttemptOutcome::Failure,
                        message: format!("full-buffer inflate failed: {err}"),
                    });
                }
            }
        }
    }

    DecompressionResult {
        decompressed,
        kind_used,
        attempts,
        deflate_acquisition: deflate.report,
        frame_acquisition: frame.report,
    }
}
