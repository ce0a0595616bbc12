// src/summary.rs - Per-set rep counts and recorded mistakes
use crate::reps::CompletedRep;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepMistakes {
    #[serde(rename = "rep")]
    pub rep_index: u32,
    pub mistakes: Vec<String>,
}

impl RepMistakes {
    fn new(rep_index: u32) -> Self {
        Self {
            rep_index,
            mistakes: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalSummary {
    pub good_reps: u32,
    pub bad_reps: u32,
    pub mistakes_made: Vec<RepMistakes>,
    pub state_sequences: Vec<CompletedRep>,
    pub final_comments: String,
}

impl FinalSummary {
    pub fn total_reps(&self) -> u32 {
        self.good_reps + self.bad_reps
    }

    pub fn mistakes_for(&self, rep_index: u32) -> Option<&[String]> {
        self.mistakes_made
            .iter()
            .find(|entry| entry.rep_index == rep_index)
            .map(|entry| entry.mistakes.as_slice())
    }
}

#[derive(Debug, Clone)]
pub struct SummaryBuilder {
    summary: FinalSummary,
    current: RepMistakes,
    current_rep_good: bool,
}

impl SummaryBuilder {
    pub fn new() -> Self {
        Self {
            summary: FinalSummary::default(),
            current: RepMistakes::new(1),
            current_rep_good: true,
        }
    }

    /// Marks the rep in progress as bad. Returns false if the same mistake was
    /// already recorded for this rep.
    pub fn record_mistake(&mut self, mistake: &str) -> bool {
        self.current_rep_good = false;
        if self.current.mistakes.iter().any(|m| m == mistake) {
            return false;
        }
        self.current.mistakes.push(mistake.to_string());
        true
    }

    /// Closes the rep in progress and opens the next mistakes slot. Returns whether
    /// the closed rep was good.
    pub fn complete_rep(&mut self, rep: CompletedRep) -> bool {
        let good = self.current_rep_good;
        if good {
            self.summary.good_reps += 1;
        } else {
            self.summary.bad_reps += 1;
        }
        self.summary.state_sequences.push(rep);

        let next = RepMistakes::new(self.current.rep_index + 1);
        let closed = std::mem::replace(&mut self.current, next);
        if !closed.mistakes.is_empty() {
            self.summary.mistakes_made.push(closed);
        }

        self.current_rep_good = true;
        good
    }

    pub fn current_rep_good(&self) -> bool {
        self.current_rep_good
    }

    pub fn current_rep_index(&self) -> u32 {
        self.current.rep_index
    }

    pub fn current_mistakes(&self) -> &[String] {
        &self.current.mistakes
    }

    pub fn summary(&self) -> &FinalSummary {
        &self.summary
    }

    pub fn finish(&self) -> FinalSummary {
        let mut summary = self.summary.clone();
        summary.final_comments = final_comments(&summary);
        summary
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

impl Default for SummaryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn final_comments(summary: &FinalSummary) -> String {
    let total = summary.total_reps();
    if total == 0 {
        return "No reps were detected in this set.".to_string();
    }
    if summary.bad_reps == 0 {
        return format!("All {} reps had good form. Great set!", total);
    }

    let mut counts: Vec<(&str, usize)> = Vec::new();
    for mistake in summary.mistakes_made.iter().flat_map(|entry| entry.mistakes.iter()) {
        match counts.iter_mut().find(|(m, _)| *m == mistake.as_str()) {
            Some((_, count)) => *count += 1,
            None => counts.push((mistake.as_str(), 1)),
        }
    }

    let mut comments = format!("{} of {} reps had good form.", summary.good_reps, total);
    let most_common = counts
        .iter()
        .fold(None, |best: Option<(&str, usize)>, (m, c)| match best {
            Some((_, best_count)) if best_count >= *c => best,
            _ => Some((*m, *c)),
        });
    if let Some((mistake, count)) = most_common {
        let reps = if count == 1 { "rep" } else { "reps" };
        comments.push_str(&format!(" Most common mistake: {} ({} {}).", mistake, count, reps));
    }
    comments
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reps::{RepDurations, RepPhase, StateSequence};

    fn rep() -> CompletedRep {
        CompletedRep {
            durations: RepDurations {
                eccentric: 1.0,
                concentric: 0.8,
            },
            states: StateSequence::from(vec![RepPhase::Standing, RepPhase::Transition]),
        }
    }

    #[test]
    fn test_mistakes_deduplicated_per_rep() {
        let mut builder = SummaryBuilder::new();
        for _ in 0..5 {
            builder.record_mistake("Knees are not level");
        }
        assert!(builder.record_mistake("Hips are not level"));
        assert!(!builder.complete_rep(rep()));

        let summary = builder.finish();
        assert_eq!(summary.bad_reps, 1);
        assert_eq!(
            summary.mistakes_for(1),
            Some(&["Knees are not level".to_string(), "Hips are not level".to_string()][..])
        );
    }

    #[test]
    fn test_good_rep_opens_fresh_slot() {
        let mut builder = SummaryBuilder::new();
        builder.record_mistake("Hips are not level");
        builder.complete_rep(rep());
        assert!(builder.current_rep_good());
        assert_eq!(builder.current_rep_index(), 2);
        assert!(builder.current_mistakes().is_empty());

        assert!(builder.complete_rep(rep()));
        let summary = builder.finish();
        assert_eq!((summary.good_reps, summary.bad_reps), (1, 1));
        assert_eq!(summary.mistakes_made.len(), 1);
        assert_eq!(summary.state_sequences.len(), 2);
        assert_eq!(
            summary.final_comments,
            "1 of 2 reps had good form. Most common mistake: Hips are not level (1 rep)."
        );
    }

    #[test]
    fn test_unfinished_rep_is_dropped() {
        let mut builder = SummaryBuilder::new();
        builder.record_mistake("Maintain a neutral spine");
        let summary = builder.finish();
        assert_eq!(summary.total_reps(), 0);
        assert!(summary.mistakes_made.is_empty());
        assert_eq!(summary.final_comments, "No reps were detected in this set.");
    }

    #[test]
    fn test_serializes_for_client() {
        let mut builder = SummaryBuilder::new();
        builder.record_mistake("Knees are not level");
        builder.complete_rep(rep());
        let json = serde_json::to_value(builder.finish()).unwrap();
        assert_eq!(json["badReps"], 1);
        assert_eq!(json["mistakesMade"][0]["rep"], 1);
        assert_eq!(json["stateSequences"][0]["states"][1], "TRANSITION");
    }
}
