//! # Core Module
//!
//! This module provides the data model and the stateless numerical routines of the
//! library.
//!
//! ## Architecture
//!
//! - **Ensemble Representation** ([`models`]) - The conformation set, its views, accepted inputs and ids
//! - **Statistics** ([`analysis`]) - Deviations, RMSDs, mean-square fluctuations and weight sums
//! - **Geometry** ([`utils`]) - Weighted RMSD, centroids and rotation helpers
//!
//! Nothing in this module performs a superposition; fitting lives in
//! [`engine`](crate::engine).

pub mod analysis;
pub mod models;
pub mod utils;
