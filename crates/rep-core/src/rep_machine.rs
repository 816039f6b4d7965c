//! Squat repetition state machine.
//!
//! A two-phase hysteresis machine over the knee angle with one frame of
//! memory. Entering the squat requires a descent observed across two
//! consecutive detected frames; leaving it requires the leg to straighten
//! past a much higher threshold, which is when a repetition is counted.
//!
//! The memory is cleared on every frame without a detection, so the first
//! detected frame after a miss can never trigger a transition.

use serde::{Deserialize, Serialize};

/// Hidden phase of the machine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepPhase {
    #[default]
    Standing,
    InSquat,
}

/// Angle thresholds in degrees. The defaults are empirically calibrated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RepThresholds {
    /// Lower bound (exclusive) on the previous angle for either descent rule.
    pub descent_floor: f64,
    /// Upper bound (exclusive) on the previous angle, side view.
    pub side_prev_ceiling: f64,
    /// Current angle must be below this to enter the squat, side view.
    pub side_entry: f64,
    /// Upper bound (exclusive) on the previous angle, front view.
    pub front_prev_ceiling: f64,
    /// Current angle must be below this to enter the squat, front view.
    pub front_entry: f64,
    /// Current angle must exceed this to complete a repetition.
    pub standing: f64,
}

impl Default for RepThresholds {
    fn default() -> Self {
        Self {
            descent_floor: 100.0,
            side_prev_ceiling: 130.0,
            side_entry: 125.0,
            front_prev_ceiling: 140.0,
            front_entry: 140.0,
            standing: 160.0,
        }
    }
}

/// State carried from one sampled frame to the next.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RepMemory {
    pub previous_angle: Option<f64>,
    pub phase: RepPhase,
}

/// What the machine sees on a frame with a detection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RepObservation {
    pub angle: f64,
    pub front_view: bool,
}

/// Result of advancing the machine by one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RepOutcome {
    /// A repetition finished on this frame.
    pub rep_completed: bool,
    /// The frame's angle, if there was a detection.
    pub angle: Option<f64>,
    /// Memory to carry into the next frame.
    pub memory: RepMemory,
}

#[derive(Debug, Clone, Default)]
pub struct RepStateMachine {
    thresholds: RepThresholds,
}

impl RepStateMachine {
    pub fn new(thresholds: RepThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &RepThresholds {
        &self.thresholds
    }

    /// Advance by one sampled frame. `None` means no detection.
    pub fn advance(&self, memory: RepMemory, observation: Option<RepObservation>) -> RepOutcome {
        let mut phase = memory.phase;
        let mut rep_completed = false;

        if let (Some(prev), Some(obs)) = (memory.previous_angle, observation) {
            if self.enters_squat(prev, obs) {
                phase = RepPhase::InSquat;
            }
            if phase == RepPhase::InSquat && obs.angle > self.thresholds.standing {
                phase = RepPhase::Standing;
                rep_completed = true;
                tracing::debug!(angle = obs.angle, "Repetition completed");
            }
        }

        let angle = observation.map(|obs| obs.angle);
        RepOutcome {
            rep_completed,
            angle,
            memory: RepMemory {
                previous_angle: angle,
                phase,
            },
        }
    }

    fn enters_squat(&self, prev: f64, obs: RepObservation) -> bool {
        let t = &self.thresholds;
        let side = prev > t.descent_floor && prev < t.side_prev_ceiling && obs.angle < t.side_entry;
        let front = prev > t.descent_floor
            && prev < t.front_prev_ceiling
            && obs.angle < t.front_entry
            && obs.front_view;
        side || front
    }
}
