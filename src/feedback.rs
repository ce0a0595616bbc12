// src/feedback.rs - Events sent to the client and the per-frame form rules
use crate::config::SessionConfig;
use crate::geometry::{angle_3d, confident_enough, is_level, is_vertically_aligned};
use crate::lifecycle::EndReason;
use crate::orientation::Orientation;
use crate::pose::{JointName, MainJointSet, PoseFrame};
use crate::reps::{RepPhase, StateSequence};
use crate::summary::FinalSummary;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "tag", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FeedbackEvent {
    NotDetected { message: String },
    SetStartCountdown { message: String, remaining: f64 },
    SetStarted { message: String },
    Feedback { message: String },
    Tip { message: String },
    RepDetected { message: String, good: bool },
    SetEnded { reason: EndReason, summary: FinalSummary },
}

impl FeedbackEvent {
    pub fn not_detected(message: &str) -> Self {
        FeedbackEvent::NotDetected {
            message: message.to_string(),
        }
    }

    pub fn countdown(remaining: f64) -> Self {
        FeedbackEvent::SetStartCountdown {
            message: format!("Stay still for {} seconds to start set", remaining),
            remaining,
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            FeedbackEvent::NotDetected { .. } => "NOT_DETECTED",
            FeedbackEvent::SetStartCountdown { .. } => "SET_START_COUNTDOWN",
            FeedbackEvent::SetStarted { .. } => "SET_STARTED",
            FeedbackEvent::Feedback { .. } => "FEEDBACK",
            FeedbackEvent::Tip { .. } => "TIP",
            FeedbackEvent::RepDetected { .. } => "REP_DETECTED",
            FeedbackEvent::SetEnded { .. } => "SET_ENDED",
        }
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            FeedbackEvent::NotDetected { message }
            | FeedbackEvent::SetStartCountdown { message, .. }
            | FeedbackEvent::SetStarted { message }
            | FeedbackEvent::Feedback { message }
            | FeedbackEvent::Tip { message }
            | FeedbackEvent::RepDetected { message, .. } => Some(message),
            FeedbackEvent::SetEnded { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormTip {
    LowerHips,
}

impl FormTip {
    pub fn message(self) -> &'static str {
        match self {
            FormTip::LowerHips => "Lower Hips",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormFault {
    CollapsedTorso,
    KneesNotLevel,
    ShouldersNotLevel,
    HipsNotLevel,
    AnklesNotLevel,
    HipsNotAligned,
    ShouldersNotAligned,
    SpineNotNeutral,
}

impl FormFault {
    pub fn message(self) -> &'static str {
        match self {
            FormFault::CollapsedTorso => "Collapsed torso, keep your chest up",
            FormFault::KneesNotLevel => "Knees are not level",
            FormFault::ShouldersNotLevel => "Shoulders are not level",
            FormFault::HipsNotLevel => "Hips are not level",
            FormFault::AnklesNotLevel => "Ankles are not level",
            FormFault::HipsNotAligned => "Hips are not vertically aligned with feet",
            FormFault::ShouldersNotAligned => "Shoulders are not vertically aligned with feet",
            FormFault::SpineNotNeutral => "Maintain a neutral spine",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormCheck {
    Tip(FormTip),
    Fault(FormFault),
}

pub struct FrameContext<'a> {
    pub frame: &'a PoseFrame,
    pub joints: &'a MainJointSet,
    pub knee_angle: f64,
    pub hip_angle: f64,
    pub sequence: &'a StateSequence,
    pub orientation: Option<Orientation>,
}

/// Runs the rules in display order: depth, torso collapse, bottom-phase checks,
/// then the orientation-specific checks.
pub fn evaluate(ctx: &FrameContext<'_>, config: &SessionConfig) -> Vec<FormCheck> {
    let mut checks = Vec::new();
    let phase = ctx.sequence.last();

    // Heading back up without having reached the bottom
    if config.transition_knee_angle_range.contains_strict(ctx.knee_angle)
        && ctx.sequence.count(RepPhase::Transition) == 1
    {
        checks.push(FormCheck::Tip(FormTip::LowerHips));
    }

    if phase == RepPhase::Transition
        && ctx.knee_angle < config.collapse_knee_angle
        && ctx.hip_angle > config.safe_hip_angle
    {
        checks.push(FormCheck::Fault(FormFault::CollapsedTorso));
    }

    if phase == RepPhase::Bottom && ctx.orientation == Some(Orientation::FaceOn) {
        if let Some(false) = pair_level(ctx.frame, JointName::LeftKnee, JointName::RightKnee, config.knee_level, config) {
            checks.push(FormCheck::Fault(FormFault::KneesNotLevel));
        }
    }

    match ctx.orientation {
        Some(Orientation::FaceOn) => face_on_checks(ctx.frame, config, &mut checks),
        Some(Orientation::SideOn) => side_on_checks(ctx, config, &mut checks),
        None => {}
    }

    checks
}

fn face_on_checks(frame: &PoseFrame, config: &SessionConfig, checks: &mut Vec<FormCheck>) {
    let levels = [
        (JointName::LeftShoulder, JointName::RightShoulder, config.shoulder_level, FormFault::ShouldersNotLevel, true),
        (JointName::LeftHip, JointName::RightHip, config.hip_level, FormFault::HipsNotLevel, true),
        (JointName::LeftAnkle, JointName::RightAnkle, config.ankle_level, FormFault::AnklesNotLevel, config.check_ankles_level),
    ];
    for (left, right, threshold, fault, enabled) in levels {
        if enabled && pair_level(frame, left, right, threshold, config) == Some(false) {
            checks.push(FormCheck::Fault(fault));
        }
    }

    let alignments = [
        (JointName::LeftHip, JointName::RightHip, config.hip_vertically_aligned, FormFault::HipsNotAligned),
        (JointName::LeftShoulder, JointName::RightShoulder, config.shoulder_vertically_aligned, FormFault::ShouldersNotAligned),
    ];
    for (left, right, threshold, fault) in alignments {
        if aligned_with_feet(frame, left, right, threshold, config) == Some(false) {
            checks.push(FormCheck::Fault(fault));
        }
    }
}

fn side_on_checks(ctx: &FrameContext<'_>, config: &SessionConfig, checks: &mut Vec<FormCheck>) {
    let Some(nose) = ctx.frame.get(JointName::Nose) else {
        return;
    };
    if !confident_enough(config.confidence_threshold, [Some(nose)]) {
        return;
    }

    let spine_angle = angle_3d(&ctx.joints.hip, &ctx.joints.shoulder, nose);
    if !config.neutral_spine_angle_range.contains(spine_angle) {
        checks.push(FormCheck::Fault(FormFault::SpineNotNeutral));
    }
}

// None when either joint is missing or not confident
fn pair_level(
    frame: &PoseFrame,
    left: JointName,
    right: JointName,
    threshold: f64,
    config: &SessionConfig,
) -> Option<bool> {
    let (l, r) = (frame.get(left), frame.get(right));
    if !confident_enough(config.confidence_threshold, [l, r]) {
        return None;
    }
    Some(is_level(l?, r?, threshold))
}

fn aligned_with_feet(
    frame: &PoseFrame,
    left: JointName,
    right: JointName,
    threshold: f64,
    config: &SessionConfig,
) -> Option<bool> {
    let joints = [
        frame.get(left),
        frame.get(right),
        frame.get(JointName::LeftAnkle),
        frame.get(JointName::RightAnkle),
    ];
    if !confident_enough(config.confidence_threshold, joints) {
        return None;
    }
    Some(is_vertically_aligned(joints[0]?, joints[1]?, joints[2]?, joints[3]?, threshold))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::{Landmark, MainJoint, Side};

    fn face_on_frame() -> PoseFrame {
        let mut frame = PoseFrame::new();
        for (side, x) in [(Side::Left, 0.45), (Side::Right, 0.55)] {
            let name = |joint: MainJoint| JointName::main(side, joint);
            frame.insert(name(MainJoint::Ankle), Landmark::new(x, 0.9, 0.0, 0.9));
            frame.insert(name(MainJoint::Knee), Landmark::new(x, 0.7, 0.0, 0.9));
            frame.insert(name(MainJoint::Hip), Landmark::new(x, 0.5, 0.0, 0.9));
            frame.insert(name(MainJoint::Shoulder), Landmark::new(x, 0.2, 0.0, 0.9));
        }
        frame.insert(JointName::Nose, Landmark::new(0.5, 0.1, 0.0, 0.9));
        frame
    }

    fn run(frame: &PoseFrame, knee: f64, hip: f64, phases: Vec<RepPhase>, orientation: Orientation) -> Vec<FormCheck> {
        let joints = frame.main_joints(Side::Right).unwrap();
        let sequence = StateSequence::from(phases);
        let ctx = FrameContext {
            frame,
            joints: &joints,
            knee_angle: knee,
            hip_angle: hip,
            sequence: &sequence,
            orientation: Some(orientation),
        };
        evaluate(&ctx, &SessionConfig::default())
    }

    #[test]
    fn test_clean_face_on_frame_has_no_faults() {
        let checks = run(&face_on_frame(), 180.0, 180.0, vec![RepPhase::Standing], Orientation::FaceOn);
        assert!(checks.is_empty());
    }

    #[test]
    fn test_lower_hips_tip_only_on_first_transition() {
        let frame = face_on_frame();
        let descending = run(&frame, 40.0, 40.0, vec![RepPhase::Standing, RepPhase::Transition], Orientation::FaceOn);
        assert_eq!(descending, vec![FormCheck::Tip(FormTip::LowerHips)]);

        let ascending = run(
            &frame,
            40.0,
            40.0,
            vec![RepPhase::Standing, RepPhase::Transition, RepPhase::Bottom, RepPhase::Transition],
            Orientation::FaceOn,
        );
        assert!(ascending.is_empty());
    }

    #[test]
    fn test_collapsed_torso() {
        let checks = run(
            &face_on_frame(),
            30.0,
            90.0,
            vec![RepPhase::Standing, RepPhase::Transition, RepPhase::Bottom, RepPhase::Transition],
            Orientation::FaceOn,
        );
        assert_eq!(checks, vec![FormCheck::Fault(FormFault::CollapsedTorso)]);
    }

    #[test]
    fn test_knees_level_checked_at_bottom_only() {
        let mut frame = face_on_frame();
        frame.insert(JointName::LeftKnee, Landmark::new(0.45, 0.8, 0.0, 0.9));

        let bottom = run(&frame, 10.0, 10.0, vec![RepPhase::Standing, RepPhase::Bottom], Orientation::FaceOn);
        assert_eq!(bottom, vec![FormCheck::Fault(FormFault::KneesNotLevel)]);

        let standing = run(&frame, 180.0, 180.0, vec![RepPhase::Standing], Orientation::FaceOn);
        assert!(standing.is_empty());
    }

    #[test]
    fn test_face_on_fault_order() {
        let mut frame = face_on_frame();
        frame.insert(JointName::LeftShoulder, Landmark::new(0.65, 0.1, 0.0, 0.9));
        frame.insert(JointName::RightHip, Landmark::new(0.75, 0.6, 0.0, 0.9));

        let checks = run(&frame, 180.0, 180.0, vec![RepPhase::Standing], Orientation::FaceOn);
        assert_eq!(
            checks,
            vec![
                FormCheck::Fault(FormFault::ShouldersNotLevel),
                FormCheck::Fault(FormFault::HipsNotLevel),
                FormCheck::Fault(FormFault::HipsNotAligned),
                FormCheck::Fault(FormFault::ShouldersNotAligned),
            ]
        );
    }

    #[test]
    fn test_unconfident_joints_are_skipped() {
        let mut frame = face_on_frame();
        frame.insert(JointName::LeftShoulder, Landmark::new(0.45, 0.0, 0.0, 0.1));
        let checks = run(&frame, 180.0, 180.0, vec![RepPhase::Standing], Orientation::FaceOn);
        assert!(checks.is_empty());
    }

    #[test]
    fn test_side_on_spine() {
        let mut frame = face_on_frame();
        let upright = run(&frame, 180.0, 180.0, vec![RepPhase::Standing], Orientation::SideOn);
        assert!(upright.is_empty());

        // Head dropped forward and down, level with the shoulder
        frame.insert(JointName::Nose, Landmark::new(0.85, 0.2, 0.0, 0.9));
        let hunched = run(&frame, 180.0, 180.0, vec![RepPhase::Standing], Orientation::SideOn);
        assert_eq!(hunched, vec![FormCheck::Fault(FormFault::SpineNotNeutral)]);
    }

    #[test]
    fn test_event_wire_format() {
        let event = FeedbackEvent::Feedback {
            message: FormFault::HipsNotLevel.message().to_string(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["tag"], "FEEDBACK");
        assert_eq!(json["message"], "Hips are not level");
        assert_eq!(event.tag(), "FEEDBACK");
    }
}
