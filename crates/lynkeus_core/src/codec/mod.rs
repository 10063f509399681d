//! Codec backend acquisition.
//!
//! A codec family (deflate-based or LZ4-frame-based) is obtained from an
//! ordered list of provider candidates. Candidates are tried strictly in list
//! order; the first one that probes and loads wins and the rest are never
//! touched. Every candidate outcome is retained in the acquisition report so
//! the caller can always explain why a family ended up unavailable.

mod deflate;
mod lz4;

pub use deflate::{Flate2Backend, Flate2Source};
pub use lz4::{Lz4FlexBackend, Lz4FlexSource};

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    #[error("backend failed to load: {0}")]
    LoadFailed(String),

    #[error("decode failed: {0}")]
    DecodeFailed(String),
}

impl CodecError {
    /// Coarse error class used in acquisition and attempt logs.
    pub fn class(&self) -> &'static str {
        match self {
            CodecError::Unavailable(_) => "unavailable",
            CodecError::LoadFailed(_) => "load-failed",
            CodecError::DecodeFailed(_) => "decode-failed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CodecFamily {
    Deflate,
    Lz4Frame,
}

impl fmt::Display for CodecFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodecFamily::Deflate => write!(f, "deflate"),
            CodecFamily::Lz4Frame => write!(f, "lz4-frame"),
        }
    }
}

/// How a provider candidate becomes callable.
///
/// `Linked` providers are compiled into the binary; `Registered` providers are
/// supplied by the caller at configuration time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Mechanism {
    Linked,
    Registered,
}

impl fmt::Display for Mechanism {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mechanism::Linked => write!(f, "linked"),
            Mechanism::Registered => write!(f, "registered"),
        }
    }
}

/// Deflate-family decoding entry points.
pub trait DeflateBackend: Send + Sync {
    /// Decodes a gzip member starting at the beginning of `data`.
    fn ungzip(&self, data: &[u8]) -> Result<Vec<u8>, CodecError>;

    /// Decodes a zlib-wrapped deflate stream starting at the beginning of `data`.
    fn inflate(&self, data: &[u8]) -> Result<Vec<u8>, CodecError>;

    /// Decodes `data` as zlib, then as raw deflate if the zlib wrapper is absent.
    fn inflate_any(&self, data: &[u8]) -> Result<Vec<u8>, CodecError>;
}

/// Frame-compression decoding entry point.
pub trait FrameBackend: Send + Sync {
    /// Decodes an LZ4 frame starting at the beginning of `data`.
    fn decode_frame(&self, data: &[u8]) -> Result<Vec<u8>, CodecError>;
}

#[derive(Debug, Clone, Serialize)]
pub struct CandidateInfo {
    pub name: String,
    pub mechanism: Mechanism,
}

/// One possible source for a codec backend.
///
/// `probe` is a cheap availability check; `load` instantiates the backend.
/// Failure at either step is logged and the next candidate is tried.
pub trait CodecSource<B: ?Sized>: Send + Sync {
    fn describe(&self) -> CandidateInfo;

    fn probe(&self) -> Result<(), CodecError>;

    fn load(&self) -> Result<Arc<B>, CodecError>;
}

/// A caller-supplied provider built from a factory closure.
pub struct RegisteredSource<B: ?Sized> {
    name: String,
    factory: Box<dyn Fn() -> Result<Arc<B>, CodecError> + Send + Sync>,
}

impl<B: ?Sized> RegisteredSource<B> {
    pub fn new<F>(name: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> Result<Arc<B>, CodecError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            factory: Box::new(factory),
        }
    }
}

impl<B: ?Sized + Send + Sync> CodecSource<B> for RegisteredSource<B> {
    fn describe(&self) -> CandidateInfo {
        CandidateInfo {
            name: self.name.clone(),
            mechanism: Mechanism::Registered,
        }
    }

    fn probe(&self) -> Result<(), CodecError> {
        Ok(())
    }

    fn load(&self) -> Result<Arc<B>, CodecError> {
        (self.factory)()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SourceOutcome {
    Loaded,
    ProbeFailed,
    LoadFailed,
}

#[derive(Debug, Clone, Serialize)]
pub struct AcquisitionAttempt {
    pub candidate: CandidateInfo,
    pub outcome: SourceOutcome,
    pub error: Option<String>,
}

/// Immutable record of one family's acquisition run.
#[derive(Debug, Clone, Serialize)]
pub struct AcquisitionReport {
    pub family: CodecFamily,
    pub succeeded: bool,
    pub chosen: Option<CandidateInfo>,
    pub attempts: Vec<AcquisitionAttempt>,
}

/// Result of acquiring one codec family: the backend (if any candidate
/// loaded) plus the full per-candidate report.
pub struct Acquisition<B: ?Sized> {
    pub backend: Option<Arc<B>>,
    pub report: AcquisitionReport,
}

/// Tries `sources` in order and stops at the first one that loads.
pub fn acquire<B: ?Sized>(
    family: CodecFamily,
    sources: &[Box<dyn CodecSource<B>>],
) -> Acquisition<B> {
    let mut attempts = Vec::with_capacity(sources.len());

    for source in sources {
        let info = source.describe();

        if let Err(err) = source.probe() {
            log::debug!("{} candidate '{}' probe failed: {}", family, info.name, err);
            attempts.push(AcquisitionAttempt {
                candidate: info,
                outcome: SourceOutcome::ProbeFailed,
                error: Some(format!("{}: {}", err.class(), err)),
            });
            continue;
        }

        match source.load() {
            Ok(backend) => {
                log::debug!("{} candidate '{}' loaded", family, info.name);
                attempts.push(AcquisitionAttempt {
                    candidate: info.clone(),
                    outcome: SourceOutcome::Loaded,
                    error: None,
                });
                return Acquisition {
                    backend: Some(backend),
                    report: AcquisitionReport {
                        family,
                        succeeded: true,
                        chosen: Some(info),
                        attempts,
                    },
                };
            }
            Err(err) => {
                log::warn!("{} candidate '{}' failed to load: {}", family, info.name, err);
                attempts.push(AcquisitionAttempt {
                    candidate: info,
                    outcome: SourceOutcome::LoadFailed,
                    error: Some(format!("{}: {}", err.class(), err)),
                });
            }
        }
    }

    Acquisition {
        backend: None,
        report: AcquisitionReport {
            family,
            succeeded: false,
            chosen: None,
            attempts,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingSource {
        name: &'static str,
    }

    impl CodecSource<dyn DeflateBackend> for FailingSource {
        fn describe(&self) -> CandidateInfo {
            CandidateInfo {
                name: self.name.to_string(),
                mechanism: Mechanism::Registered,
            }
        }

        fn probe(&self) -> Result<(), CodecError> {
            Ok(())
        }

        fn load(&self) -> Result<Arc<dyn DeflateBackend>, CodecError> {
            Err(CodecError::LoadFailed(format!("{} is broken", self.name)))
        }
    }

    #[test]
    fn acquisition_stops_at_first_success() {
        let sources: Vec<Box<dyn CodecSource<dyn DeflateBackend>>> = vec![
            Box::new(FailingSource { name: "first" }),
            Box::new(FailingSource { name: "second" }),
            Box::new(Flate2Source),
            Box::new(FailingSource { name: "never-tried" }),
        ];

        let acquisition = acquire(CodecFamily::Deflate, &sources);

        assert!(acquisition.backend.is_some());
        assert!(acquisition.report.succeeded);
        assert_eq!(acquisition.report.attempts.len(), 3);
        assert_eq!(
            acquisition.report.attempts[2].outcome,
            SourceOutcome::Loaded
        );
        let chosen = acquisition.report.chosen.expect("a candidate was chosen");
        assert_eq!(chosen.name, "flate2 (builtin)");
        assert_eq!(chosen.mechanism, Mechanism::Linked);
    }

    #[test]
    fn acquisition_records_every_failure() {
        let sources: Vec<Box<dyn CodecSource<dyn DeflateBackend>>> = vec![
            Box::new(FailingSource { name: "first" }),
            Box::new(FailingSource { name: "second" }),
        ];

        let acquisition = acquire(CodecFamily::Deflate, &sources);

        assert!(acquisition.backend.is_none());
        assert!(!acquisition.report.succeeded);
        assert!(acquisition.report.chosen.is_none());
        assert_eq!(acquisition.report.attempts.len(), 2);
        for attempt in &acquisition.report.attempts {
            assert_eq!(attempt.outcome, SourceOutcome::LoadFailed);
            assert!(attempt.error.as_deref().unwrap().contains("load-failed"));
        }
    }

    #[test]
    fn acquisition_over_empty_list_fails_cleanly() {
        let sources: Vec<Box<dyn CodecSource<dyn FrameBackend>>> = Vec::new();
        let acquisition = acquire(CodecFamily::Lz4Frame, &sources);

        assert!(acquisition.backend.is_none());
        assert!(acquisition.report.attempts.is_empty());
    }

    #[test]
    fn registered_source_wraps_a_factory() {
        let source: RegisteredSource<dyn FrameBackend> =
            RegisteredSource::new("lz4 (registered)", || {
                Ok(Arc::new(Lz4FlexBackend) as Arc<dyn FrameBackend>)
            });

        assert_eq!(source.describe().mechanism, Mechanism::Registered);
        assert!(source.load().is_ok());
    }
}
