//! # Engine Module
//!
//! The alignment engine: rigid-body superposition of every conformation in an ensemble
//! onto its reference, replay of stored transformations, and iterative refinement of the
//! reference toward the ensemble's consensus structure.
//!
//! ## Architecture
//!
//! - **Fitting** ([`superposition`]) - The [`Superposer`](superposition::Superposer) seam
//!   and its weighted Kabsch implementation
//! - **Configuration** ([`config`]) - Alignment mode and convergence criteria, built in code
//!   or loaded from TOML
//! - **Progress Monitoring** ([`progress`]) - Progress reporting to caller-supplied callbacks
//! - **Error Handling** ([`error`]) - Engine-specific error types
//! - **Tasks** ([`tasks`]) - `superimpose`, `transform` and `iterate`
//!
//! Per-conformation fits are independent and run on the rayon thread pool when the
//! `parallel` feature is enabled.

pub mod config;
pub mod context;
pub mod error;
pub mod progress;
pub mod superposition;
pub mod tasks;
