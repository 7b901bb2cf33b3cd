use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::band::Band;
use crate::model::section::Section;

/// Version of the persisted [`ResultRecord`] layout.
pub const RESULT_SCHEMA_VERSION: u32 = 1;

/// Score for a graded section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectiveScore {
    pub section: Section,
    pub score: u32,
    pub total: u32,
    pub percentage: u32,
    pub band: Band,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskWordCount {
    pub title: String,
    pub words: u32,
    pub min_words: u32,
}

/// Word counts for an ungraded section, with the estimated band for writing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WrittenSummary {
    pub section: Section,
    pub tasks: Vec<TaskWordCount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub band: Option<Band>,
}

/// Raw text of a written response, kept for the record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WrittenResponse {
    pub section: Section,
    /// 1-based task number.
    pub task: usize,
    pub text: String,
}

/// What a finished section contributed to the result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SectionOutcome {
    Objective(ObjectiveScore),
    Written(WrittenSummary),
}

impl SectionOutcome {
    #[must_use]
    pub fn section(&self) -> Section {
        match self {
            SectionOutcome::Objective(score) => score.section,
            SectionOutcome::Written(summary) => summary.section,
        }
    }

    #[must_use]
    pub fn band(&self) -> Option<Band> {
        match self {
            SectionOutcome::Objective(score) => Some(score.band),
            SectionOutcome::Written(summary) => summary.band,
        }
    }
}

/// One immutable entry in the local result history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultRecord {
    pub schema_version: u32,
    pub attempt_id: Uuid,
    pub definition: String,
    pub title: String,
    pub student: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub objective: Vec<ObjectiveScore>,
    pub written: Vec<WrittenSummary>,
    pub responses: Vec<WrittenResponse>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overall_band: Option<Band>,
    pub completed: bool,
}

impl ResultRecord {
    #[must_use]
    pub fn objective_score(&self, section: Section) -> Option<&ObjectiveScore> {
        self.objective.iter().find(|s| s.section == section)
    }

    #[must_use]
    pub fn written_summary(&self, section: Section) -> Option<&WrittenSummary> {
        self.written.iter().find(|s| s.section == section)
    }
}
