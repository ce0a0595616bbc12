// src/orientation.rs - Most-visible side and camera orientation voting
use crate::geometry::confident_enough;
use crate::pose::{JointName, MainJoint, PoseFrame, Side};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    FaceOn,
    SideOn,
}

/// Vote counts kept in first-seen order so ties go to the earliest candidate.
#[derive(Debug, Clone)]
pub struct VoteTally<T> {
    counts: Vec<(T, usize)>,
    total: usize,
}

impl<T: Copy + PartialEq> VoteTally<T> {
    pub fn new() -> Self {
        Self {
            counts: Vec::new(),
            total: 0,
        }
    }

    pub fn push(&mut self, vote: T) {
        self.total += 1;
        match self.counts.iter_mut().find(|(candidate, _)| *candidate == vote) {
            Some((_, count)) => *count += 1,
            None => self.counts.push((vote, 1)),
        }
    }

    pub fn majority(&self) -> Option<T> {
        let mut best: Option<(T, usize)> = None;
        for (candidate, count) in &self.counts {
            if best.map_or(true, |(_, best_count)| *count > best_count) {
                best = Some((*candidate, *count));
            }
        }
        best.map(|(candidate, _)| candidate)
    }

    pub fn len(&self) -> usize {
        self.total
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    pub fn clear(&mut self) {
        self.counts.clear();
        self.total = 0;
    }
}

impl<T: Copy + PartialEq> Default for VoteTally<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Default)]
pub struct SideEstimator {
    votes: VoteTally<Side>,
    locked: Option<Side>,
}

impl SideEstimator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Casts this frame's vote and returns the side to measure from right now.
    ///
    /// Returns `None` when neither side is confident; no vote is cast then.
    /// Once locked, the locked side is returned and nothing is recorded.
    pub fn vote(&mut self, frame: &PoseFrame, confidence_threshold: f64) -> Option<Side> {
        if let Some(side) = self.locked {
            return Some(side);
        }

        let side_confident = |side: Side| {
            confident_enough(
                confidence_threshold,
                MainJoint::ALL.iter().map(|joint| frame.main_joint(side, *joint)),
            )
        };
        let left_ok = side_confident(Side::Left);
        let right_ok = side_confident(Side::Right);
        if !left_ok && !right_ok {
            return None;
        }

        let vote = if frame.side_visibility(Side::Right) < frame.side_visibility(Side::Left) {
            Side::Left
        } else {
            Side::Right
        };
        self.votes.push(vote);

        if side_confident(vote) {
            Some(vote)
        } else {
            Some(vote.other())
        }
    }

    pub fn lock(&mut self) -> Option<Side> {
        if self.locked.is_none() {
            self.locked = self.votes.majority();
            debug!(side = ?self.locked, votes = self.votes.len(), "most visible side locked");
        }
        self.locked
    }

    pub fn locked(&self) -> Option<Side> {
        self.locked
    }

    pub fn reset(&mut self) {
        self.votes.clear();
        self.locked = None;
    }
}

#[derive(Debug, Clone)]
pub struct OrientationEstimator {
    votes: VoteTally<Orientation>,
    locked: Option<Orientation>,
    sample_size: usize,
}

impl OrientationEstimator {
    pub fn new(sample_size: usize) -> Self {
        Self {
            votes: VoteTally::new(),
            locked: None,
            sample_size: sample_size.max(1),
        }
    }

    /// Votes face-on when both the shoulder and the hip depth differences are below
    /// `face_on_threshold`. Locks after `sample_size` votes; until then the running
    /// majority is returned as a provisional answer.
    pub fn observe(
        &mut self,
        frame: &PoseFrame,
        confidence_threshold: f64,
        face_on_threshold: f64,
    ) -> Option<Orientation> {
        if self.locked.is_some() {
            return self.locked;
        }

        let joints = (
            frame.get(JointName::LeftShoulder),
            frame.get(JointName::RightShoulder),
            frame.get(JointName::LeftHip),
            frame.get(JointName::RightHip),
        );
        let (Some(left_shoulder), Some(right_shoulder), Some(left_hip), Some(right_hip)) = joints
        else {
            return self.current();
        };

        let usable = confident_enough(confidence_threshold, [Some(left_shoulder), Some(left_hip)])
            || confident_enough(confidence_threshold, [Some(right_shoulder), Some(right_hip)]);
        if !usable {
            return self.current();
        }

        let shoulder_depth_difference = (left_shoulder.z - right_shoulder.z).abs();
        let hip_depth_difference = (left_hip.z - right_hip.z).abs();
        if shoulder_depth_difference < face_on_threshold && hip_depth_difference < face_on_threshold {
            self.votes.push(Orientation::FaceOn);
        } else {
            self.votes.push(Orientation::SideOn);
        }

        if self.votes.len() >= self.sample_size {
            self.locked = self.votes.majority();
            debug!(orientation = ?self.locked, "orientation locked");
        }

        self.current()
    }

    /// Locks the running majority early, before `sample_size` votes. With no votes
    /// yet it stays unlocked and `observe` keeps sampling.
    pub fn lock(&mut self) -> Option<Orientation> {
        if self.locked.is_none() {
            self.locked = self.votes.majority();
            debug!(orientation = ?self.locked, votes = self.votes.len(), "orientation locked early");
        }
        self.locked
    }

    pub fn current(&self) -> Option<Orientation> {
        self.locked.or_else(|| self.votes.majority())
    }

    pub fn locked(&self) -> Option<Orientation> {
        self.locked
    }

    pub fn reset(&mut self) {
        self.votes.clear();
        self.locked = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::Landmark;

    fn frame(left_vis: f64, right_vis: f64, shoulder_dz: f64) -> PoseFrame {
        let mut frame = PoseFrame::new();
        for joint in MainJoint::ALL {
            frame.insert(
                JointName::main(Side::Left, joint),
                Landmark::new(0.4, 0.5, 0.0, left_vis),
            );
            frame.insert(
                JointName::main(Side::Right, joint),
                Landmark::new(0.6, 0.5, 0.0, right_vis),
            );
        }
        frame.insert(JointName::LeftShoulder, Landmark::new(0.4, 0.3, shoulder_dz, left_vis));
        frame
    }

    #[test]
    fn test_tally_tie_goes_to_first_seen() {
        let mut tally = VoteTally::new();
        tally.push(Side::Left);
        tally.push(Side::Right);
        tally.push(Side::Right);
        tally.push(Side::Left);
        assert_eq!(tally.majority(), Some(Side::Left));
        assert_eq!(tally.len(), 4);
    }

    #[test]
    fn test_side_vote_skips_unusable_frames() {
        let mut sides = SideEstimator::new();
        assert_eq!(sides.vote(&frame(0.1, 0.2, 0.0), 0.5), None);
        assert_eq!(sides.lock(), None);
    }

    #[test]
    fn test_side_vote_falls_back_to_confident_side() {
        let mut sides = SideEstimator::new();
        // Right sums higher but only the left side clears the threshold on every joint
        let mut f = frame(0.6, 0.9, 0.0);
        f.insert(JointName::RightAnkle, Landmark::new(0.6, 0.9, 0.0, 0.1));
        f.insert(JointName::LeftAnkle, Landmark::new(0.4, 0.9, 0.0, 0.6));
        assert_eq!(sides.vote(&f, 0.5), Some(Side::Left));
    }

    #[test]
    fn test_side_lock_is_immutable() {
        let mut sides = SideEstimator::new();
        sides.vote(&frame(0.9, 0.6, 0.0), 0.5);
        sides.vote(&frame(0.9, 0.6, 0.0), 0.5);
        assert_eq!(sides.lock(), Some(Side::Left));

        for _ in 0..10 {
            assert_eq!(sides.vote(&frame(0.6, 0.9, 0.0), 0.5), Some(Side::Left));
        }
        assert_eq!(sides.lock(), Some(Side::Left));
    }

    #[test]
    fn test_orientation_provisional_then_locked() {
        let mut orientation = OrientationEstimator::new(3);
        assert_eq!(orientation.observe(&frame(0.9, 0.9, 0.0), 0.5, 0.1), Some(Orientation::FaceOn));
        assert_eq!(orientation.locked(), None);
        assert_eq!(orientation.observe(&frame(0.9, 0.9, 0.3), 0.5, 0.1), Some(Orientation::FaceOn));
        assert_eq!(orientation.observe(&frame(0.9, 0.9, 0.3), 0.5, 0.1), Some(Orientation::SideOn));
        assert_eq!(orientation.locked(), Some(Orientation::SideOn));

        for _ in 0..5 {
            orientation.observe(&frame(0.9, 0.9, 0.0), 0.5, 0.1);
        }
        assert_eq!(orientation.current(), Some(Orientation::SideOn));
    }

    #[test]
    fn test_orientation_early_lock() {
        let mut orientation = OrientationEstimator::new(50);
        assert_eq!(orientation.lock(), None);

        orientation.observe(&frame(0.9, 0.9, 0.0), 0.5, 0.1);
        orientation.observe(&frame(0.9, 0.9, 0.0), 0.5, 0.1);
        assert_eq!(orientation.lock(), Some(Orientation::FaceOn));

        for _ in 0..60 {
            orientation.observe(&frame(0.9, 0.9, 0.3), 0.5, 0.1);
        }
        assert_eq!(orientation.lock(), Some(Orientation::FaceOn));
        assert_eq!(orientation.current(), Some(Orientation::FaceOn));
    }

    #[test]
    fn test_orientation_ignores_frames_without_data() {
        let mut orientation = OrientationEstimator::new(2);
        assert_eq!(orientation.observe(&PoseFrame::new(), 0.5, 0.1), None);
        assert_eq!(orientation.observe(&frame(0.1, 0.1, 0.0), 0.5, 0.1), None);
        assert_eq!(orientation.locked(), None);
    }
}
