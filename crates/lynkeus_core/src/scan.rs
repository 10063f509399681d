//! Exact signature scanning over byte buffers.
//!
//! Matching is byte-exact with no fuzzing. `find_all` resumes one byte past
//! each match, so a signature occurrence starting inside a previous match is
//! still reported, but the same offset is never reported twice.

use memchr::memmem;

/// Returns the lowest offset `>= from` where `signature` occurs in `buffer`.
#[must_use]
pub fn find_first(buffer: &[u8], signature: &[u8], from: usize) -> Option<usize> {
    if signature.is_empty() || from >= buffer.len() {
        return None;
    }
    memmem::find(&buffer[from..], signature).map(|idx| idx + from)
}

/// Returns every offset `>= from` where `signature` occurs, ascending.
#[must_use]
pub fn find_all(buffer: &[u8], signature: &[u8], from: usize) -> Vec<usize> {
    let mut offsets = Vec::new();
    let mut pos = from;
    while let Some(idx) = find_first(buffer, signature, pos) {
        offsets.push(idx);
        pos = idx + 1;
    }
    offsets
}
