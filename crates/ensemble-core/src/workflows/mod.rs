//! # Workflows Module
//!
//! High-level entry points that tie the [`engine`](crate::engine) to an ensemble.
//!
//! - **Superposition Workflow** ([`superpose`]) - Validates the alignment configuration,
//!   runs a single or iterative superposition, and returns the per-conformation RMSDs
//!   together with the elapsed time.

pub mod superpose;
