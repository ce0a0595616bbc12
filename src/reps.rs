// src/reps.rs - Squat phase state machine
use crate::config::SessionConfig;
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RepPhase {
    Standing,
    Transition,
    Bottom,
}

/// Phases visited since the last completed rep. Starts with `Standing` and never
/// holds the same phase twice in a row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateSequence(Vec<RepPhase>);

impl StateSequence {
    pub fn new() -> Self {
        Self(vec![RepPhase::Standing])
    }

    pub fn last(&self) -> RepPhase {
        self.0.last().copied().unwrap_or(RepPhase::Standing)
    }

    pub fn push(&mut self, phase: RepPhase) {
        if self.last() != phase {
            self.0.push(phase);
        }
    }

    pub fn count(&self, phase: RepPhase) -> usize {
        self.0.iter().filter(|p| **p == phase).count()
    }

    pub fn phases(&self) -> &[RepPhase] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for StateSequence {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Vec<RepPhase>> for StateSequence {
    fn from(phases: Vec<RepPhase>) -> Self {
        let mut sequence = StateSequence::new();
        for phase in phases {
            sequence.push(phase);
        }
        sequence
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RepDurations {
    pub eccentric: f64,
    pub concentric: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletedRep {
    pub durations: RepDurations,
    pub states: StateSequence,
}

#[derive(Debug, Clone)]
pub struct RepTracker {
    sequence: StateSequence,
    squat_start_time: Option<f64>,
    squat_mid_time: Option<f64>,
    squat_end_time: Option<f64>,
    last_duration: f64,
}

impl RepTracker {
    pub fn new() -> Self {
        Self {
            sequence: StateSequence::new(),
            squat_start_time: None,
            squat_mid_time: None,
            squat_end_time: None,
            last_duration: 0.0,
        }
    }

    /// Advances on one knee angle. The first matching rule wins; returns the rep
    /// when the angle re-enters the standing range.
    pub fn update(&mut self, knee_angle: f64, now: f64, config: &SessionConfig) -> Option<CompletedRep> {
        let last = self.sequence.last();

        if last != RepPhase::Standing && config.standing_knee_angle_range.contains(knee_angle) {
            if last == RepPhase::Bottom {
                info!("transition not detected: bottom straight to standing");
            }
            return Some(self.complete(now));
        }

        if last != RepPhase::Transition && config.transition_knee_angle_range.contains(knee_angle) {
            match last {
                RepPhase::Standing => self.squat_start_time = Some(now),
                RepPhase::Bottom => self.squat_mid_time = Some(now),
                RepPhase::Transition => {}
            }
            self.sequence.push(RepPhase::Transition);
        } else if last != RepPhase::Bottom && config.bottom_knee_angle_range.contains(knee_angle) {
            if last == RepPhase::Standing {
                info!("transition not detected: standing straight to bottom");
            }
            self.sequence.push(RepPhase::Bottom);
        }

        None
    }

    fn complete(&mut self, now: f64) -> CompletedRep {
        let start = self.squat_start_time.unwrap_or(now);
        let mid = self.squat_mid_time.filter(|mid| *mid >= start).unwrap_or(now);

        let durations = RepDurations {
            eccentric: (mid - start).max(0.0),
            concentric: (now - mid).max(0.0),
        };
        self.squat_end_time = Some(now);
        self.last_duration = now - start;
        self.squat_start_time = None;
        self.squat_mid_time = None;

        let states = std::mem::take(&mut self.sequence);
        CompletedRep { durations, states }
    }

    pub fn squat_duration(&self, now: f64) -> f64 {
        match self.squat_start_time {
            Some(start) => now - start,
            None => self.last_duration,
        }
    }

    pub fn last_end_time(&self) -> Option<f64> {
        self.squat_end_time
    }

    pub fn sequence(&self) -> &StateSequence {
        &self.sequence
    }

    pub fn phase(&self) -> RepPhase {
        self.sequence.last()
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

impl Default for RepTracker {
    fn default() -> Self {
        Self::new()
    }
}
