// src/lifecycle.rs - Deciding when a set starts and ends
use crate::config::SessionConfig;
use crate::geometry::{hip_angle, knee_angle, max_displacement};
use crate::pose::{Landmark, MainJointSet};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::debug;

pub const JOINT_BUFFER_SIZE: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SetLifecycle {
    NotStarted,
    Active,
    Ended,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    Motion,
    LowConfidence,
    NoLandmarks,
}

#[derive(Debug, Clone)]
pub struct JointBuffer<T> {
    entries: VecDeque<T>,
    capacity: usize,
}

impl<T> JointBuffer<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    pub fn push(&mut self, entry: T) -> bool {
        self.entries.push_back(entry);
        if self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
        self.is_full()
    }

    pub fn is_full(&self) -> bool {
        self.entries.len() == self.capacity
    }

    pub fn ends(&self) -> Option<(&T, &T)> {
        if self.entries.len() < 2 {
            return None;
        }
        Some((self.entries.front()?, self.entries.back()?))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[derive(Debug, Clone)]
pub struct StartDetector {
    buffer: JointBuffer<MainJointSet>,
    stationary_start_time: Option<f64>,
}

impl StartDetector {
    pub fn new() -> Self {
        Self {
            buffer: JointBuffer::new(JOINT_BUFFER_SIZE),
            stationary_start_time: None,
        }
    }

    /// Feeds one confident snapshot; true once the stance has been held still for
    /// longer than `stationary_duration`.
    pub fn update(&mut self, joints: &MainJointSet, now: f64, config: &SessionConfig) -> bool {
        let knee = knee_angle(joints, config.knee_angle_mode);
        let hip = hip_angle(joints, config.knee_angle_mode);

        if !(config.starting_knee_angle_range.contains(knee)
            && config.starting_hip_angle_range.contains(hip))
        {
            debug!(knee, hip, "not in starting position");
            self.reset();
            return false;
        }

        if !self.buffer.push(*joints) {
            return false;
        }

        let displacement = self
            .buffer
            .ends()
            .map(|(previous, current)| max_displacement(previous, current))
            .unwrap_or(0.0);
        if displacement > config.set_start_stationary {
            debug!(displacement, "movement before set start");
            self.reset();
            return false;
        }

        match self.stationary_start_time {
            None => {
                self.stationary_start_time = Some(now);
                false
            }
            Some(start) => now - start > config.stationary_duration,
        }
    }

    pub fn time_remaining(&self, now: f64, stationary_duration: f64) -> f64 {
        let remaining = match self.stationary_start_time {
            None => stationary_duration,
            Some(start) => (stationary_duration - (now - start)).max(0.0),
        };
        (remaining * 100.0).round() / 100.0
    }

    pub fn is_counting_down(&self) -> bool {
        self.stationary_start_time.is_some()
    }

    pub fn reset(&mut self) {
        self.stationary_start_time = None;
        self.buffer.clear();
    }
}

impl Default for StartDetector {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone)]
pub struct EndDetector {
    buffer: JointBuffer<Landmark>,
    set_ended_counter: u32,
    // Consecutive frames with no pose or unconfident main joints, in any mix
    missed_frames: u32,
}

impl EndDetector {
    pub fn new() -> Self {
        Self {
            buffer: JointBuffer::new(JOINT_BUFFER_SIZE),
            set_ended_counter: 0,
            missed_frames: 0,
        }
    }

    pub fn ankle_moved(&mut self, ankle: &Landmark, config: &SessionConfig) -> bool {
        self.missed_frames = 0;

        if !self.buffer.push(*ankle) {
            return false;
        }

        let distance = self
            .buffer
            .ends()
            .map(|(previous, current)| previous.distance_to(current))
            .unwrap_or(0.0);
        if distance > config.set_end_stationary {
            self.set_ended_counter += 1;
            debug!(distance, counter = self.set_ended_counter, "ankle moving");
            self.set_ended_counter >= config.set_ended_threshold
        } else {
            self.set_ended_counter = 0;
            false
        }
    }

    /// Both kinds of detection loss extend the same run; the frame that crosses
    /// its own threshold decides the end reason.
    pub fn low_confidence(&mut self, config: &SessionConfig) -> bool {
        self.missed_frames += 1;
        self.missed_frames >= config.no_confident_detection_threshold
    }

    pub fn no_landmarks(&mut self, config: &SessionConfig) -> bool {
        self.missed_frames += 1;
        self.missed_frames >= config.no_landmark_threshold
    }

    pub fn reset(&mut self) {
        self.buffer.clear();
        self.set_ended_counter = 0;
        self.missed_frames = 0;
    }
}

impl Default for EndDetector {
    fn default() -> Self {
        Self::new()
    }
}
