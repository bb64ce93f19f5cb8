//! # Ensemble Align
//!
//! A library for conformational ensembles: alternative coordinate sets of one set of atoms,
//! kept together with a reference structure and optional per-atom weights, and the
//! rigid-body superposition and deviation statistics computed across them.
//!
//! ## Architectural Philosophy
//!
//! The library follows a three-layer architecture:
//!
//! - **[`core`]: The Foundation.** The [`ConformationSet`](core::models::ensemble::ConformationSet)
//!   data model with its lazily materialized conformation views, coordinate and weight
//!   input types, geometry primitives, and ensemble statistics (RMSD, deviations,
//!   mean-square fluctuation).
//!
//! - **[`engine`]: The Logic Core.** The pluggable [`Superposer`](engine::superposition::Superposer)
//!   fit with its weighted Kabsch implementation, alignment configuration, progress
//!   reporting, and the superposition tasks that mutate an ensemble.
//!
//! - **[`workflows`]: The Public API.** One-call superposition of an ensemble under an
//!   [`AlignmentConfig`](engine::config::AlignmentConfig).
//!
//! The library logs through [`tracing`] and never installs a subscriber.

pub mod core;
pub mod engine;
pub mod workflows;
