//! LZ4 frame backend over `lz4_flex`.

use std::io::Read;
use std::sync::Arc;

use lz4_flex::frame::FrameDecoder;

use super::{CandidateInfo, CodecError, CodecSource, FrameBackend, Mechanism};

pub struct Lz4FlexBackend;

impl FrameBackend for Lz4FlexBackend {
    fn decode_frame(&self, data: &[u8]) -> Result<Vec<u8>, CodecError> {
        let mut decoder = FrameDecoder::new(data);
        let mut out = Vec::new();
        decoder
            .read_to_end(&mut out)
            .map_err(|err| CodecError::DecodeFailed(format!("lz4 frame: {err}")))?;
        Ok(out)
    }
}

/// Statically linked LZ4 frame provider. Always available.
pub struct Lz4FlexSource;

impl CodecSource<dyn FrameBackend> for Lz4FlexSource {
    fn describe(&self) -> CandidateInfo {
        CandidateInfo {
            name: "lz4_flex (builtin)".to_string(),
            mechanism: Mechanism::Linked,
        }
    }

    fn probe(&self) -> Result<(), CodecError> {
        Ok(())
    }

    fn load(&self) -> Result<Arc<dyn FrameBackend>, CodecError> {
        Ok(Arc::new(Lz4FlexBackend))
    }
}
