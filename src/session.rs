// src/session.rs - Per-stream squat analysis
use crate::clock::{Clock, SystemClock};
use crate::config::SessionConfig;
use crate::error::Result;
use crate::feedback::{evaluate, FeedbackEvent, FormCheck, FrameContext};
use crate::geometry::{hip_angle, knee_angle, main_joints_confident};
use crate::lifecycle::{EndDetector, EndReason, SetLifecycle, StartDetector};
use crate::orientation::{Orientation, OrientationEstimator, SideEstimator};
use crate::pose::{PoseFrame, Side};
use crate::reps::{RepPhase, RepTracker, StateSequence};
use crate::source::{PoseSource, Sample};
use crate::summary::{FinalSummary, SummaryBuilder};
use tracing::{debug, info};
use uuid::Uuid;

const NOT_DETECTED: &str = "Not Detected";
const INSUFFICIENT_JOINTS: &str = "Insufficient joints visible";

pub struct AnalysisSession {
    id: Uuid,
    config: SessionConfig,
    clock: Box<dyn Clock>,
    lifecycle: SetLifecycle,
    sides: SideEstimator,
    orientation: OrientationEstimator,
    start: StartDetector,
    end: EndDetector,
    reps: RepTracker,
    summary: SummaryBuilder,
    frames_processed: u64,
}

impl AnalysisSession {
    pub fn new(config: SessionConfig) -> Self {
        Self::with_clock(config, Box::new(SystemClock::new()))
    }

    pub fn with_clock(config: SessionConfig, clock: Box<dyn Clock>) -> Self {
        let orientation = OrientationEstimator::new(config.orientation_sample_size);
        let id = Uuid::new_v4();
        debug!(session = %id, "session created");

        Self {
            id,
            config,
            clock,
            lifecycle: SetLifecycle::NotStarted,
            sides: SideEstimator::new(),
            orientation,
            start: StartDetector::new(),
            end: EndDetector::new(),
            reps: RepTracker::new(),
            summary: SummaryBuilder::new(),
            frames_processed: 0,
        }
    }

    /// Pulls one sample from `source` and processes it. At end of input returns
    /// `success = false` and leaves the session untouched.
    pub fn analyze<S: PoseSource + ?Sized>(&mut self, source: &mut S) -> Result<(Vec<FeedbackEvent>, bool)> {
        match source.next_sample()? {
            None => Ok((Vec::new(), false)),
            Some(Sample::Detected(frame)) => Ok((self.process(Some(&frame)), true)),
            Some(Sample::NotDetected) => Ok((self.process(None), true)),
        }
    }

    pub fn process(&mut self, pose: Option<&PoseFrame>) -> Vec<FeedbackEvent> {
        let now = self.clock.now();
        self.frames_processed += 1;

        match self.lifecycle {
            SetLifecycle::Active => self.during_set(pose, now),
            SetLifecycle::NotStarted | SetLifecycle::Ended => self.before_set(pose, now),
        }
    }

    fn before_set(&mut self, pose: Option<&PoseFrame>, now: f64) -> Vec<FeedbackEvent> {
        let Some(frame) = pose else {
            self.start.reset();
            return vec![FeedbackEvent::not_detected(NOT_DETECTED)];
        };

        let threshold = self.config.confidence_threshold;
        let joints = self
            .sides
            .vote(frame, threshold)
            .and_then(|side| frame.main_joints(side));
        let Some(joints) = joints else {
            self.start.reset();
            return vec![FeedbackEvent::not_detected(INSUFFICIENT_JOINTS)];
        };

        self.orientation
            .observe(frame, threshold, self.config.face_on_threshold);

        if self.start.update(&joints, now, &self.config) {
            let side = self.sides.lock();
            let orientation = self.orientation.lock();
            self.start.reset();
            self.end.reset();
            self.lifecycle = SetLifecycle::Active;
            info!(
                session = %self.id,
                side = ?side,
                orientation = ?orientation,
                "set started"
            );
            return vec![FeedbackEvent::SetStarted {
                message: "Set started".to_string(),
            }];
        }

        vec![FeedbackEvent::countdown(
            self.start.time_remaining(now, self.config.stationary_duration),
        )]
    }

    fn during_set(&mut self, pose: Option<&PoseFrame>, now: f64) -> Vec<FeedbackEvent> {
        let Some(frame) = pose else {
            if self.end.no_landmarks(&self.config) {
                return vec![self.end_set(EndReason::NoLandmarks)];
            }
            return vec![FeedbackEvent::not_detected(NOT_DETECTED)];
        };

        let threshold = self.config.confidence_threshold;
        let joints = self
            .sides
            .locked()
            .and_then(|side| frame.main_joints(side))
            .filter(|joints| main_joints_confident(threshold, joints));
        let Some(joints) = joints else {
            if self.end.low_confidence(&self.config) {
                return vec![self.end_set(EndReason::LowConfidence)];
            }
            return vec![FeedbackEvent::not_detected(INSUFFICIENT_JOINTS)];
        };

        if self.end.ankle_moved(&joints.ankle, &self.config) {
            return vec![self.end_set(EndReason::Motion)];
        }

        let orientation = self
            .orientation
            .observe(frame, threshold, self.config.face_on_threshold);
        let knee = knee_angle(&joints, self.config.knee_angle_mode);
        let hip = hip_angle(&joints, self.config.knee_angle_mode);

        let mut events = Vec::new();
        if let Some(rep) = self.reps.update(knee, now, &self.config) {
            let good = self.summary.complete_rep(rep);
            info!(
                session = %self.id,
                good,
                good_reps = self.summary.summary().good_reps,
                bad_reps = self.summary.summary().bad_reps,
                "rep detected"
            );
            events.push(FeedbackEvent::RepDetected {
                message: if good { "Good rep" } else { "Bad rep" }.to_string(),
                good,
            });
        }

        let checks = evaluate(
            &FrameContext {
                frame,
                joints: &joints,
                knee_angle: knee,
                hip_angle: hip,
                sequence: self.reps.sequence(),
                orientation,
            },
            &self.config,
        );
        for check in checks {
            match check {
                FormCheck::Tip(tip) => events.push(FeedbackEvent::Tip {
                    message: tip.message().to_string(),
                }),
                FormCheck::Fault(fault) => {
                    if self.summary.record_mistake(fault.message()) {
                        debug!(
                            session = %self.id,
                            rep = self.summary.current_rep_index(),
                            mistake = fault.message(),
                            "mistake recorded"
                        );
                    }
                    events.push(FeedbackEvent::Feedback {
                        message: fault.message().to_string(),
                    });
                }
            }
        }

        events
    }

    // Passes through Ended and comes back ready for the next set
    fn end_set(&mut self, reason: EndReason) -> FeedbackEvent {
        self.lifecycle = SetLifecycle::Ended;
        let summary = self.summary.finish();
        info!(
            session = %self.id,
            ?reason,
            good_reps = summary.good_reps,
            bad_reps = summary.bad_reps,
            "set ended"
        );

        self.reset();
        FeedbackEvent::SetEnded { reason, summary }
    }

    pub fn reset(&mut self) {
        self.lifecycle = SetLifecycle::NotStarted;
        self.sides.reset();
        self.orientation.reset();
        self.start.reset();
        self.end.reset();
        self.reps.reset();
        self.summary.reset();
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn lifecycle(&self) -> SetLifecycle {
        self.lifecycle
    }

    pub fn locked_side(&self) -> Option<Side> {
        self.sides.locked()
    }

    pub fn orientation(&self) -> Option<Orientation> {
        self.orientation.current()
    }

    pub fn orientation_locked(&self) -> bool {
        self.orientation.locked().is_some()
    }

    pub fn phase(&self) -> RepPhase {
        self.reps.phase()
    }

    pub fn state_sequence(&self) -> &StateSequence {
        self.reps.sequence()
    }

    pub fn squat_duration(&self) -> f64 {
        self.reps.squat_duration(self.clock.now())
    }

    pub fn current_rep_good(&self) -> bool {
        self.summary.current_rep_good()
    }

    pub fn running_summary(&self) -> &FinalSummary {
        self.summary.summary()
    }

    pub fn frames_processed(&self) -> u64 {
        self.frames_processed
    }
}
