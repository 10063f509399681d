pub mod bundle;
pub mod carve;
pub mod codec;
pub mod engine;
mod error;
pub mod scan;
pub mod signatures;

pub use carve::{ResourceHint, ResourceKind};
pub use codec::{AcquisitionReport, CodecError, CodecFamily, DeflateBackend, FrameBackend};
pub use engine::{CompressionKind, DecompressionAttempt, DecompressionResult, EngineConfig};
pub use error::{CoreError, Result};
