//! # Ensemble Analysis Module
//!
//! Deviation and fluctuation statistics computed across the conformations of a
//! [`ConformationSet`](crate::core::models::ensemble::ConformationSet): per-conformation
//! deviations and RMSDs from the reference, per-atom mean-square fluctuations, and per-atom
//! weight sums. All statistics honor per-atom, per-conformation weights.

pub mod statistics;
