//! Triage worker.
//!
//! One logical job per buffer, executed on a dedicated thread so a misbehaving
//! payload can never take the caller down with it. Requests and responses
//! travel over channels; panics inside a job are caught at the thread
//! boundary and surfaced as a failed response rather than a dead worker.

use std::panic::{self, AssertUnwindSafe};
use std::thread::{self, JoinHandle};

use anyhow::{Context, Result};
use crossbeam_channel::{unbounded, Receiver, Sender};
use serde::Serialize;

use lynkeus_core::bundle::{self, BundleHeader, DirectoryListing};
use lynkeus_core::carve::{self, ResourceHint};
use lynkeus_core::codec::AcquisitionReport;
use lynkeus_core::engine::{self, CompressionKind, EngineConfig};

pub enum Request {
    Triage { payload: Vec<u8> },
    Shutdown,
}

pub enum Response {
    Completed(Box<TriageReport>),
    Failed { error: String },
}

/// Everything one triage run learned about a buffer. Serializes to the
/// machine-readable report; the triaged bytes themselves stay out of it.
#[derive(Debug, Serialize)]
pub struct TriageReport {
    pub decompression_succeeded: bool,
    pub compression: Option<CompressionKind>,
    pub attempts: Vec<String>,
    pub deflate_acquisition: AcquisitionReport,
    pub frame_acquisition: AcquisitionReport,
    pub decompressed_size: Option<u64>,
    pub header: BundleHeader,
    pub header_summary: String,
    pub directory: DirectoryListing,
    pub resources: Vec<ResourceHint>,
    #[serde(skip)]
    pub triaged_bytes: Vec<u8>,
}

/// Runs the full triage ladder over `payload`: best-effort decompression,
/// header classification, directory recovery, and resource carving. Header
/// parsing and carving run over the decompressed bytes when decompression
/// succeeded, otherwise over the payload as-is.
pub fn run_triage(payload: &[u8]) -> TriageReport {
    let mut result = engine::decompress(payload, &EngineConfig::default());

    let decompression_succeeded = result.succeeded();
    let compression = result.kind_used;
    let attempts = result.attempt_messages();

    let triaged_bytes = match result.decompressed.take() {
        Some(bytes) => bytes,
        None => payload.to_vec(),
    };

    let header = match bundle::parse_header(&triaged_bytes) {
        Ok(header) => header,
        Err(err) => {
            log::warn!("header parse failed: {err}");
            BundleHeader::Unrecognized
        }
    };
    let directory = bundle::list_entries(&triaged_bytes, &header);
    let resources = carve::carve(&triaged_bytes);

    TriageReport {
        decompression_succeeded,
        compression,
        attempts,
        deflate_acquisition: result.deflate_acquisition,
        frame_acquisition: result.frame_acquisition,
        decompressed_size: compression.map(|_| triaged_bytes.len() as u64),
        header_summary: header.to_string(),
        header,
        directory,
        resources,
        triaged_bytes,
    }
}

fn worker_loop(rx: Receiver<Request>, tx: Sender<Response>) {
    for request in rx {
        let payload = match request {
            Request::Triage { payload } => payload,
            Request::Shutdown => break,
        };

        if payload.is_empty() {
            let _ = tx.send(Response::Failed {
                error: "invalid request: empty payload".to_string(),
            });
            continue;
        }

        let response = match panic::catch_unwind(AssertUnwindSafe(|| run_triage(&payload))) {
            Ok(report) => Response::Completed(Box::new(report)),
            Err(panic) => {
                let detail = panic
                    .downcast_ref::<&str>()
                    .map(|s| (*s).to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                log::error!("triage job panicked: {detail}");
                Response::Failed {
                    error: format!("internal error: {detail}"),
                }
            }
        };

        if tx.send(response).is_err() {
            break;
        }
    }
}

/// Owns the worker thread. One request in flight at a time; dropping the
/// handle shuts the worker down and joins it.
pub struct WorkerHandle {
    tx: Sender<Request>,
    rx: Receiver<Response>,
    handle: Option<JoinHandle<()>>,
}

impl WorkerHandle {
    pub fn spawn() -> Self {
        let (req_tx, req_rx) = unbounded::<Request>();
        let (resp_tx, resp_rx) = unbounded::<Response>();

        let handle = thread::spawn(move || {
            worker_loop(req_rx, resp_tx);
        });

        Self {
            tx: req_tx,
            rx: resp_rx,
            handle: Some(handle),
        }
    }

    /// Submits one payload and blocks until its response arrives.
    pub fn process(&self, payload: Vec<u8>) -> Result<Response> {
        self.tx
            .send(Request::Triage { payload })
            .context("worker thread is gone")?;
        self.rx.recv().context("worker stopped without responding")
    }
}

impl Drop for WorkerHandle {
    fn drop(&mut self) {
        let _ = self.tx.send(Request::Shutdown);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("worker thread panicked outside a job");
            }
        }
    }
}
