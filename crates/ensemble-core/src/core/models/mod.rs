//! # Core Models Module
//!
//! This module contains the data structures used to represent conformational ensembles:
//! a reference structure and any number of alternative coordinate sets for the same atoms.
//!
//! ## Key Components
//!
//! - [`ensemble`] - The [`ConformationSet`](ensemble::ConformationSet) owning all coordinates,
//!   weights and recorded transformations
//! - [`conformation`] - Lightweight, index-addressed views into an ensemble
//! - [`input`] - Accepted coordinate and weight inputs, and the [`CoordinateSource`](input::CoordinateSource) capability
//! - [`ids`] - Stable identifiers for materialized conformation views
//! - [`error`] - Validation errors raised by ensemble operations
//!
//! ## Usage
//!
//! ```ignore
//! use ensemble_align::core::models::{ensemble::ConformationSet, input::WeightInput};
//!
//! let mut ensemble = ConformationSet::new("NMR models");
//! ensemble.set_reference(reference_coords)?;
//! ensemble.add_conformations(models, Some(WeightInput::Shared(occupancies)))?;
//!
//! let first = ensemble.conformation(0)?;
//! println!("{} has RMSD {:?}", first, first.rmsd());
//! ```

pub mod conformation;
pub mod ensemble;
pub mod error;
pub mod ids;
pub mod input;
