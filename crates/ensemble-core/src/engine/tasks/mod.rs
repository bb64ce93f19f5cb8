//! Alignment tasks operating on a [`ConformationSet`](crate::core::models::ensemble::ConformationSet).
//!
//! Each task is a single `run` function taking the ensemble mutably. Tasks validate their
//! preconditions before touching the ensemble, so a failed task leaves it unchanged;
//! the iterative task is the exception, since the passes it completed before failing
//! remain applied.

pub mod iterate;
pub mod superimpose;
pub mod transform;
