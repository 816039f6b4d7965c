//! SquatCount Pose Model
//!
//! Defines the data contracts exchanged with the pose-estimation
//! collaborator:
//! - **Landmarks:** Named anatomical points for at most one person
//! - **Topology:** The body landmark set and its skeleton connections
//! - **Tracks:** Precomputed per-frame landmark sequences (JSONL)
//!
//! All coordinates are normalized to `[0.0, 1.0]` relative to the frame
//! dimensions so they survive rescaling between decoder and estimator.

pub mod landmark;
pub mod track;

pub use landmark::*;
pub use track::*;
