//! Deflate-family backend over `flate2`.

use std::io::Read;
use std::sync::Arc;

use flate2::bufread::{DeflateDecoder, GzDecoder, ZlibDecoder};

use super::{CandidateInfo, CodecError, CodecSource, DeflateBackend, Mechanism};

pub struct Flate2Backend;

fn read_all<R: Read>(mut decoder: R, what: &str) -> Result<Vec<u8>, CodecError> {
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .map_err(|err| CodecError::DecodeFailed(format!("{what}: {err}")))?;
    Ok(out)
}

impl DeflateBackend for Flate2Backend {
    fn ungzip(&self, data: &[u8]) -> Result<Vec<u8>, CodecError> {
        read_all(GzDecoder::new(data), "gzip")
    }

    fn inflate(&self, data: &[u8]) -> Result<Vec<u8>, CodecError> {
        read_all(ZlibDecoder::new(data), "zlib")
    }

    fn inflate_any(&self, data: &[u8]) -> Result<Vec<u8>, CodecError> {
        match self.inflate(data) {
            Ok(out) => Ok(out),
            Err(_) => read_all(DeflateDecoder::new(data), "raw deflate"),
        }
    }
}

/// Statically linked deflate provider. Always available.
pub struct Flate2Source;

impl CodecSource<dyn DeflateBackend> for Flate2Source {
    fn describe(&self) -> CandidateInfo {
        CandidateInfo {
            name: "flate2 (builtin)".to_string(),
            mechanism: Mechanism::Linked,
        }
    }

    fn probe(&self) -> Result<(), CodecError> {
        Ok(())
    }

    fn load(&self) -> Result<Arc<dyn DeflateBackend>, CodecError> {
        Ok(Arc::new(Flate2Backend))
    }
}
