// src/source.rs - Where pose frames come from
use crate::error::{Error, Result};
use crate::pose::PoseFrame;
use image::DynamicImage;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

#[derive(Debug, Clone, PartialEq)]
pub enum Sample {
    Detected(PoseFrame),
    NotDetected,
}

impl From<Option<PoseFrame>> for Sample {
    fn from(pose: Option<PoseFrame>) -> Self {
        match pose {
            Some(frame) => Sample::Detected(frame),
            None => Sample::NotDetected,
        }
    }
}

pub trait PoseSource {
    fn next_sample(&mut self) -> Result<Option<Sample>>;
}

pub trait PoseEstimator {
    fn estimate(&mut self, frame: &DynamicImage) -> Result<Option<PoseFrame>>;
}

pub struct EstimatedSource<I, E> {
    frames: I,
    estimator: E,
}

impl<I, E> EstimatedSource<I, E>
where
    I: Iterator<Item = DynamicImage>,
    E: PoseEstimator,
{
    pub fn new(frames: I, estimator: E) -> Self {
        Self { frames, estimator }
    }

    pub fn estimator(&self) -> &E {
        &self.estimator
    }
}

impl<I, E> PoseSource for EstimatedSource<I, E>
where
    I: Iterator<Item = DynamicImage>,
    E: PoseEstimator,
{
    fn next_sample(&mut self) -> Result<Option<Sample>> {
        let Some(frame) = self.frames.next() else {
            return Ok(None);
        };
        Ok(Some(self.estimator.estimate(&frame)?.into()))
    }
}

pub struct PoseSequence<I> {
    poses: I,
}

impl<I: Iterator<Item = Option<PoseFrame>>> PoseSequence<I> {
    pub fn new<T: IntoIterator<IntoIter = I>>(poses: T) -> Self {
        Self {
            poses: poses.into_iter(),
        }
    }
}

impl<I: Iterator<Item = Option<PoseFrame>>> PoseSource for PoseSequence<I> {
    fn next_sample(&mut self) -> Result<Option<Sample>> {
        Ok(self.poses.next().map(Sample::from))
    }
}

/// Replays a JSON-lines recording: one line per frame, either `null` or an object
/// mapping joint names to landmarks. Blank lines are skipped.
pub struct PoseRecording<R> {
    reader: R,
    line: usize,
    buf: String,
}

impl PoseRecording<BufReader<File>> {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: BufRead> PoseRecording<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: 0,
            buf: String::new(),
        }
    }

    pub fn line(&self) -> usize {
        self.line
    }
}

impl<R: BufRead> PoseSource for PoseRecording<R> {
    fn next_sample(&mut self) -> Result<Option<Sample>> {
        loop {
            self.buf.clear();
            if self.reader.read_line(&mut self.buf)? == 0 {
                return Ok(None);
            }
            self.line += 1;

            let text = self.buf.trim();
            if text.is_empty() {
                continue;
            }

            let pose: Option<PoseFrame> = serde_json::from_str(text).map_err(|source| Error::Recording {
                line: self.line,
                source,
            })?;
            return Ok(Some(pose.into()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::{JointName, Landmark};
    use std::io::Cursor;

    struct FixedEstimator {
        calls: usize,
    }

    impl PoseEstimator for FixedEstimator {
        fn estimate(&mut self, _frame: &DynamicImage) -> Result<Option<PoseFrame>> {
            self.calls += 1;
            if self.calls % 2 == 0 {
                return Ok(None);
            }
            Ok(Some(PoseFrame::new().with(JointName::Nose, Landmark::new(0.5, 0.1, 0.0, 0.9))))
        }
    }

    #[test]
    fn test_recording_parses_frames_and_gaps() {
        let data = "{\"nose\": {\"x\": 0.5, \"y\": 0.1, \"z\": 0.0, \"visibility\": 0.9}}\n\nnull\n";
        let mut recording = PoseRecording::new(Cursor::new(data));

        match recording.next_sample().unwrap() {
            Some(Sample::Detected(frame)) => assert_eq!(frame.len(), 1),
            other => panic!("unexpected sample: {:?}", other),
        }
        assert_eq!(recording.next_sample().unwrap(), Some(Sample::NotDetected));
        assert_eq!(recording.line(), 3);
        assert_eq!(recording.next_sample().unwrap(), None);
    }

    #[test]
    fn test_recording_reports_bad_line() {
        let data = "null\n{\"left_tail\": {}}\n";
        let mut recording = PoseRecording::new(Cursor::new(data));
        recording.next_sample().unwrap();
        match recording.next_sample() {
            Err(Error::Recording { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected a recording error, got {:?}", other),
        }
    }

    #[test]
    fn test_estimated_source_runs_estimator_per_image() {
        let images = (0..3).map(|_| DynamicImage::new_rgb8(4, 4));
        let mut source = EstimatedSource::new(images, FixedEstimator { calls: 0 });

        assert!(matches!(source.next_sample().unwrap(), Some(Sample::Detected(_))));
        assert_eq!(source.next_sample().unwrap(), Some(Sample::NotDetected));
        assert!(matches!(source.next_sample().unwrap(), Some(Sample::Detected(_))));
        assert_eq!(source.next_sample().unwrap(), None);
        assert_eq!(source.estimator().calls, 3);
    }
}
