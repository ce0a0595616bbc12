// src/data.rs - Writes feedback logs and set summaries to disk
use crate::error::Result;
use crate::feedback::FeedbackEvent;
use crate::summary::FinalSummary;
use chrono::Local;
use csv::Writer;
use serde::Serialize;
use std::fs::File;
use std::path::{Path, PathBuf};

#[derive(Debug, Serialize)]
struct FeedbackRecord {
    frame: u64,
    timestamp: f64,
    tag: &'static str,
    message: Option<String>,
    good: Option<bool>,
    remaining: Option<f64>,
    set: Option<usize>,
}

pub struct DataExporter {
    output_dir: PathBuf,
    session_name: String,
    records: Vec<FeedbackRecord>,
    summaries: Vec<FinalSummary>,
}

impl DataExporter {
    pub fn new(output_dir: impl AsRef<Path>, session_name: Option<String>) -> Self {
        let session_name = session_name.unwrap_or_else(|| {
            format!("session_{}", Local::now().format("%Y%m%d_%H%M%S"))
        });

        Self {
            output_dir: output_dir.as_ref().to_path_buf(),
            session_name,
            records: Vec::new(),
            summaries: Vec::new(),
        }
    }

    pub fn default_output_dir() -> PathBuf {
        directories::UserDirs::new()
            .and_then(|dirs| dirs.document_dir().map(|p| p.join("SquatAnalyser")))
            .unwrap_or_else(|| PathBuf::from("./output"))
    }

    pub fn add_frame(&mut self, frame: u64, timestamp: f64, events: &[FeedbackEvent]) {
        for event in events {
            let mut record = FeedbackRecord {
                frame,
                timestamp,
                tag: event.tag(),
                message: event.message().map(str::to_string),
                good: None,
                remaining: None,
                set: None,
            };

            match event {
                FeedbackEvent::RepDetected { good, .. } => record.good = Some(*good),
                FeedbackEvent::SetStartCountdown { remaining, .. } => record.remaining = Some(*remaining),
                FeedbackEvent::SetEnded { reason, summary } => {
                    self.summaries.push(summary.clone());
                    record.set = Some(self.summaries.len());
                    record.message = Some(format!("{:?}: {}", reason, summary.final_comments));
                }
                _ => {}
            }

            self.records.push(record);
        }
    }

    pub fn session_dir(&self) -> PathBuf {
        self.output_dir.join(&self.session_name)
    }

    pub fn summaries(&self) -> &[FinalSummary] {
        &self.summaries
    }

    pub fn event_count(&self) -> usize {
        self.records.len()
    }

    pub fn export_csv(&self) -> Result<PathBuf> {
        let csv_path = self.session_dir().join("feedback_log.csv");

        // Create directory if it doesn't exist
        if let Some(parent) = csv_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = File::create(&csv_path)?;
        let mut writer = Writer::from_writer(file);
        for record in &self.records {
            writer.serialize(record)?;
        }

        writer.flush()?;
        Ok(csv_path)
    }

    pub fn export_summaries(&self) -> Result<PathBuf> {
        let json_path = self.session_dir().join("summaries.json");

        if let Some(parent) = json_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(&self.summaries)?;
        std::fs::write(&json_path, content)?;
        Ok(json_path)
    }
}
