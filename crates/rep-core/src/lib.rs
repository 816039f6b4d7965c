//! SquatCount Rep Core
//!
//! Turns per-frame landmarks into repetition events:
//! - **Angles:** Interior joint angle from three landmarks
//! - **View:** Front vs. side camera orientation from body symmetry
//! - **Rep machine:** Hysteresis state machine over the knee angle
//!
//! This crate is pure computation with no I/O and no platform dependencies.
//! All inputs are data; all outputs are data.

pub mod angle;
pub mod rep_machine;
pub mod view;

pub use angle::joint_angle;
pub use rep_machine::{RepMemory, RepObservation, RepOutcome, RepPhase, RepStateMachine, RepThresholds};
pub use view::{ViewClassifier, ViewLandmarks, ViewMeasurements, ViewMode};
