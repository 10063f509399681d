//! Lynkeus - Bundle Triage Tool
//!
//! CLI front-end over the triage engine: decompress a blob, classify its
//! container header, and carve out embedded resources.

pub mod extract;
pub mod worker;
