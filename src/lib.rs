// src/lib.rs - Real-time squat form analysis from pose landmarks
pub mod clock;
pub mod config;
pub mod data;
pub mod error;
pub mod feedback;
pub mod geometry;
pub mod lifecycle;
pub mod orientation;
pub mod pose;
pub mod reps;
pub mod session;
pub mod source;
pub mod summary;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{AngleRange, KneeAngleMode, SessionConfig};
pub use data::DataExporter;
pub use error::{Error, Result};
pub use feedback::FeedbackEvent;
pub use lifecycle::{EndReason, SetLifecycle};
pub use orientation::Orientation;
pub use pose::{JointName, Landmark, PoseFrame, Side};
pub use reps::{CompletedRep, RepDurations, RepPhase, StateSequence};
pub use session::AnalysisSession;
pub use source::{EstimatedSource, PoseEstimator, PoseRecording, PoseSequence, PoseSource, Sample};
pub use summary::{FinalSummary, RepMistakes};
