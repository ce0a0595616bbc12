// src/pose.rs - Landmark types handed over by the pose estimator
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    #[serde(default)]
    pub visibility: f64,
}

impl Landmark {
    pub fn new(x: f64, y: f64, z: f64, visibility: f64) -> Self {
        Self { x, y, z, visibility }
    }

    pub fn position(&self) -> Vector3<f64> {
        Vector3::new(self.x, self.y, self.z)
    }

    pub fn distance_to(&self, other: &Landmark) -> f64 {
        (self.position() - other.position()).norm()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn other(self) -> Side {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MainJoint {
    Ankle,
    Knee,
    Hip,
    Shoulder,
}

impl MainJoint {
    pub const ALL: [MainJoint; 4] = [
        MainJoint::Ankle,
        MainJoint::Knee,
        MainJoint::Hip,
        MainJoint::Shoulder,
    ];
}

// MediaPipe pose landmark order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JointName {
    Nose,
    LeftEyeInner,
    LeftEye,
    LeftEyeOuter,
    RightEyeInner,
    RightEye,
    RightEyeOuter,
    LeftEar,
    RightEar,
    MouthLeft,
    MouthRight,
    LeftShoulder,
    RightShoulder,
    LeftElbow,
    RightElbow,
    LeftWrist,
    RightWrist,
    LeftPinky,
    RightPinky,
    LeftIndex,
    RightIndex,
    LeftThumb,
    RightThumb,
    LeftHip,
    RightHip,
    LeftKnee,
    RightKnee,
    LeftAnkle,
    RightAnkle,
    LeftHeel,
    RightHeel,
    LeftFootIndex,
    RightFootIndex,
}

impl JointName {
    pub fn main(side: Side, joint: MainJoint) -> JointName {
        match (side, joint) {
            (Side::Left, MainJoint::Ankle) => JointName::LeftAnkle,
            (Side::Left, MainJoint::Knee) => JointName::LeftKnee,
            (Side::Left, MainJoint::Hip) => JointName::LeftHip,
            (Side::Left, MainJoint::Shoulder) => JointName::LeftShoulder,
            (Side::Right, MainJoint::Ankle) => JointName::RightAnkle,
            (Side::Right, MainJoint::Knee) => JointName::RightKnee,
            (Side::Right, MainJoint::Hip) => JointName::RightHip,
            (Side::Right, MainJoint::Shoulder) => JointName::RightShoulder,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MainJointSet {
    pub ankle: Landmark,
    pub knee: Landmark,
    pub hip: Landmark,
    pub shoulder: Landmark,
}

impl MainJointSet {
    pub fn get(&self, joint: MainJoint) -> &Landmark {
        match joint {
            MainJoint::Ankle => &self.ankle,
            MainJoint::Knee => &self.knee,
            MainJoint::Hip => &self.hip,
            MainJoint::Shoulder => &self.shoulder,
        }
    }

    pub fn joints(&self) -> [&Landmark; 4] {
        [&self.ankle, &self.knee, &self.hip, &self.shoulder]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PoseFrame {
    landmarks: HashMap<JointName, Landmark>,
}

impl PoseFrame {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: JointName, landmark: Landmark) -> Self {
        self.landmarks.insert(name, landmark);
        self
    }

    pub fn insert(&mut self, name: JointName, landmark: Landmark) {
        self.landmarks.insert(name, landmark);
    }

    pub fn get(&self, name: JointName) -> Option<&Landmark> {
        self.landmarks.get(&name)
    }

    pub fn len(&self) -> usize {
        self.landmarks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.landmarks.is_empty()
    }

    pub fn main_joint(&self, side: Side, joint: MainJoint) -> Option<&Landmark> {
        self.get(JointName::main(side, joint))
    }

    pub fn main_joints(&self, side: Side) -> Option<MainJointSet> {
        Some(MainJointSet {
            ankle: *self.main_joint(side, MainJoint::Ankle)?,
            knee: *self.main_joint(side, MainJoint::Knee)?,
            hip: *self.main_joint(side, MainJoint::Hip)?,
            shoulder: *self.main_joint(side, MainJoint::Shoulder)?,
        })
    }

    pub fn side_visibility(&self, side: Side) -> f64 {
        MainJoint::ALL
            .iter()
            .filter_map(|joint| self.main_joint(side, *joint))
            .map(|lm| lm.visibility)
            .sum()
    }
}

impl FromIterator<(JointName, Landmark)> for PoseFrame {
    fn from_iter<I: IntoIterator<Item = (JointName, Landmark)>>(iter: I) -> Self {
        Self {
            landmarks: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_main_joints_requires_all_four() {
        let lm = Landmark::new(0.5, 0.5, 0.0, 0.9);
        let frame = PoseFrame::new()
            .with(JointName::LeftAnkle, lm)
            .with(JointName::LeftKnee, lm)
            .with(JointName::LeftHip, lm);
        assert!(frame.main_joints(Side::Left).is_none());

        let frame = frame.with(JointName::LeftShoulder, lm);
        assert!(frame.main_joints(Side::Left).is_some());
        assert!(frame.main_joints(Side::Right).is_none());
    }

    #[test]
    fn test_side_visibility_ignores_missing_joints() {
        let frame = PoseFrame::new()
            .with(JointName::RightKnee, Landmark::new(0.0, 0.0, 0.0, 0.4))
            .with(JointName::RightHip, Landmark::new(0.0, 0.0, 0.0, 0.5));
        assert!((frame.side_visibility(Side::Right) - 0.9).abs() < 1e-9);
        assert_eq!(frame.side_visibility(Side::Left), 0.0);
    }

    #[test]
    fn test_deserializes_joint_names() {
        let json = r#"{"left_knee": {"x": 0.1, "y": 0.2, "z": 0.3, "visibility": 0.9}, "nose": {"x": 0.5, "y": 0.1, "z": 0.0}}"#;
        let frame: PoseFrame = serde_json::from_str(json).unwrap();
        assert_eq!(frame.len(), 2);
        assert_eq!(frame.get(JointName::LeftKnee).unwrap().z, 0.3);
        assert_eq!(frame.get(JointName::Nose).unwrap().visibility, 0.0);
    }
}
