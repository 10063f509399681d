//! Writes carved resource ranges out as individual files.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use lynkeus_core::carve::{ResourceHint, ResourceKind};

/// Writes every hinted range of `bytes` into `output_dir`, one file per hint.
/// A hint that fails to write is reported and skipped; the rest still land.
pub fn write_resources(
    bytes: &[u8],
    hints: &[ResourceHint],
    output_dir: &Path,
) -> io::Result<Vec<PathBuf>> {
    fs::create_dir_all(output_dir)?;

    let mut written = Vec::with_capacity(hints.len());
    for (i, hint) in hints.iter().enumerate() {
        let filename = resource_filename(i, hint.kind);
        let output_path = output_dir.join(&filename);

        match write_single(bytes, hint, &output_path) {
            Ok(()) => written.push(output_path),
            Err(e) => {
                log::warn!("failed to write {filename}: {e}");
            }
        }
    }
    Ok(written)
}

fn write_single(bytes: &[u8], hint: &ResourceHint, output_path: &Path) -> io::Result<()> {
    let start = hint.start as usize;
    let end = (hint.end as usize).min(bytes.len());
    if start >= end {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "hint range is empty or out of bounds",
        ));
    }

    let mut out = File::create(output_path)?;
    out.write_all(&bytes[start..end])?;
    out.sync_all()?;
    Ok(())
}

pub fn resource_filename(index: usize, kind: ResourceKind) -> String {
    format!("resource_{:06}.{}", index, kind.extension())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filenames_are_zero_padded_and_typed() {
        assert_eq!(
            resource_filename(0, ResourceKind::Png),
            "resource_000000.png"
        );
        assert_eq!(
            resource_filename(41, ResourceKind::PeExecutable),
            "resource_000041.exe"
        );
    }

    #[test]
    fn writes_each_hint_to_its_own_file() {
        let dir = tempfile::tempdir().unwrap();
        let bytes = b"aaaaPNGDATAjjjJPEG".to_vec();
        let hints = vec![
            ResourceHint {
                kind: ResourceKind::Png,
                start: 4,
                end: 11,
            },
            ResourceHint {
                kind: ResourceKind::Jpeg,
                start: 14,
                end: 18,
            },
        ];

        let written = write_resources(&bytes, &hints, dir.path()).unwrap();

        assert_eq!(written.len(), 2);
        assert_eq!(fs::read(&written[0]).unwrap(), b"PNGDATA");
        assert_eq!(fs::read(&written[1]).unwrap(), b"JPEG");
    }

    #[test]
    fn out_of_bounds_hint_is_skipped_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let bytes = b"short".to_vec();
        let hints = vec![
            ResourceHint {
                kind: ResourceKind::Jpeg,
                start: 100,
                end: 104,
            },
            ResourceHint {
                kind: ResourceKind::Jpeg,
                start: 0,
                end: 5,
            },
        ];

        let written = write_resources(&bytes, &hints, dir.path()).unwrap();

        assert_eq!(written.len(), 1);
        assert_eq!(fs::read(&written[0]).unwrap(), b"short");
    }
}
