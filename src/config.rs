// src/config.rs - Tunable thresholds for one analysis session
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AngleRange {
    pub min: f64,
    pub max: f64,
}

impl AngleRange {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, angle: f64) -> bool {
        self.min <= angle && angle <= self.max
    }

    pub fn contains_strict(&self, angle: f64) -> bool {
        self.min < angle && angle < self.max
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KneeAngleMode {
    ThreePoint,
    Vertical,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub confidence_threshold: f64,
    pub knee_angle_mode: KneeAngleMode,

    // Set start / end
    pub starting_knee_angle_range: AngleRange,
    pub starting_hip_angle_range: AngleRange,
    pub set_start_stationary: f64,
    pub set_end_stationary: f64,
    pub stationary_duration: f64,
    pub set_ended_threshold: u32,
    pub no_confident_detection_threshold: u32,
    pub no_landmark_threshold: u32,

    // Orientation
    pub face_on_threshold: f64,
    pub orientation_sample_size: usize,

    // Rep phases
    pub standing_knee_angle_range: AngleRange,
    pub transition_knee_angle_range: AngleRange,
    pub bottom_knee_angle_range: AngleRange,

    // Form criteria
    pub collapse_knee_angle: f64,
    pub safe_hip_angle: f64,
    pub neutral_spine_angle_range: AngleRange,
    pub shoulder_level: f64,
    pub hip_level: f64,
    pub knee_level: f64,
    pub ankle_level: f64,
    pub check_ankles_level: bool,
    pub hip_vertically_aligned: f64,
    pub shoulder_vertically_aligned: f64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.5,
            knee_angle_mode: KneeAngleMode::ThreePoint,
            starting_knee_angle_range: AngleRange::new(65.0, 180.0),
            starting_hip_angle_range: AngleRange::new(75.0, 180.0),
            set_start_stationary: 0.07,
            set_end_stationary: 0.15,
            stationary_duration: 3.0,
            set_ended_threshold: 5,
            no_confident_detection_threshold: 10,
            no_landmark_threshold: 10,
            face_on_threshold: 0.1,
            orientation_sample_size: 10,
            standing_knee_angle_range: AngleRange::new(62.0, 180.0),
            transition_knee_angle_range: AngleRange::new(28.0, 55.0),
            bottom_knee_angle_range: AngleRange::new(0.0, 26.0),
            collapse_knee_angle: 35.0,
            safe_hip_angle: 62.0,
            neutral_spine_angle_range: AngleRange::new(130.0, 180.0),
            shoulder_level: 0.05,
            hip_level: 0.05,
            knee_level: 0.05,
            ankle_level: 0.05,
            check_ankles_level: true,
            hip_vertically_aligned: 0.04,
            shoulder_vertically_aligned: 0.075,
        }
    }
}

impl SessionConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: SessionConfig = serde_json::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Basic sanity only; threshold values themselves are never judged.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(Error::Config(
                "Confidence threshold must be between 0.0 and 1.0".to_string(),
            ));
        }

        let ranges = [
            ("starting_knee_angle_range", self.starting_knee_angle_range),
            ("starting_hip_angle_range", self.starting_hip_angle_range),
            ("standing_knee_angle_range", self.standing_knee_angle_range),
            ("transition_knee_angle_range", self.transition_knee_angle_range),
            ("bottom_knee_angle_range", self.bottom_knee_angle_range),
            ("neutral_spine_angle_range", self.neutral_spine_angle_range),
        ];
        for (name, range) in ranges {
            if range.min > range.max {
                return Err(Error::Config(format!(
                    "{} has min {} greater than max {}",
                    name, range.min, range.max
                )));
            }
        }

        let thresholds = [
            ("set_start_stationary", self.set_start_stationary),
            ("set_end_stationary", self.set_end_stationary),
            ("stationary_duration", self.stationary_duration),
            ("face_on_threshold", self.face_on_threshold),
            ("shoulder_level", self.shoulder_level),
            ("hip_level", self.hip_level),
            ("knee_level", self.knee_level),
            ("ankle_level", self.ankle_level),
            ("hip_vertically_aligned", self.hip_vertically_aligned),
            ("shoulder_vertically_aligned", self.shoulder_vertically_aligned),
        ];
        for (name, value) in thresholds {
            if value < 0.0 {
                return Err(Error::Config(format!("{} must not be negative", name)));
            }
        }

        if self.orientation_sample_size == 0 {
            return Err(Error::Config(
                "Orientation sample size must be greater than 0".to_string(),
            ));
        }
        if self.set_ended_threshold == 0
            || self.no_confident_detection_threshold == 0
            || self.no_landmark_threshold == 0
        {
            return Err(Error::Config(
                "Frame count thresholds must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}
