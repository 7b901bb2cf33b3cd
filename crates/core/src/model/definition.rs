use std::ops::Range;
use std::str::FromStr;

use thiserror::Error;

use crate::band::{WritingScale, ZeroScorePolicy};
use crate::model::answer_key::{AnswerKey, KeyError};
use crate::model::section::Section;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum DefinitionError {
    #[error("a test needs at least one section")]
    NoSections,

    #[error("section {0} appears more than once")]
    DuplicateSection(Section),

    #[error("section {0} has a zero duration")]
    ZeroDuration(Section),

    #[error("section {0} has no sub-parts")]
    NoSubParts(Section),

    #[error("sub-parts of {section} must cover questions 0..{len} contiguously")]
    UncoveredQuestions { section: Section, len: usize },

    #[error(transparent)]
    Key(#[from] KeyError),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown timing mode: {raw}")]
pub struct ParseTimingModeError {
    raw: String,
}

//
// ─── TIMING ────────────────────────────────────────────────────────────────────
//

/// Selects full-length or shortened section durations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimingMode {
    #[default]
    Production,
    Development,
}

impl FromStr for TimingMode {
    type Err = ParseTimingModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" | "full" => Ok(Self::Production),
            "development" | "dev" | "test" | "short" => Ok(Self::Development),
            _ => Err(ParseTimingModeError { raw: s.trim().to_string() }),
        }
    }
}

//
// ─── SECTIONS ──────────────────────────────────────────────────────────────────
//

/// A reading passage or listening part: a contiguous run of question indices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubPart {
    pub title: String,
    pub questions: Range<usize>,
}

impl SubPart {
    #[must_use]
    pub fn new(title: impl Into<String>, questions: Range<usize>) -> Self {
        Self {
            title: title.into(),
            questions,
        }
    }
}

/// A free-text task; only its word count is ever assessed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WritingTask {
    pub title: String,
    pub min_words: u32,
}

impl WritingTask {
    #[must_use]
    pub fn new(title: impl Into<String>, min_words: u32) -> Self {
        Self {
            title: title.into(),
            min_words,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SectionContent {
    /// Short answers graded against `key`, split into `parts`.
    Objective { key: AnswerKey, parts: Vec<SubPart> },
    /// One ungraded response per task; each task is a sub-part.
    Written { tasks: Vec<WritingTask> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionSpec {
    section: Section,
    full_secs: u32,
    short_secs: u32,
    content: SectionContent,
}

impl SectionSpec {
    #[must_use]
    pub fn objective(
        section: Section,
        full_secs: u32,
        short_secs: u32,
        key: AnswerKey,
        parts: Vec<SubPart>,
    ) -> Self {
        Self {
            section,
            full_secs,
            short_secs,
            content: SectionContent::Objective { key, parts },
        }
    }

    #[must_use]
    pub fn written(
        section: Section,
        full_secs: u32,
        short_secs: u32,
        tasks: Vec<WritingTask>,
    ) -> Self {
        Self {
            section,
            full_secs,
            short_secs,
            content: SectionContent::Written { tasks },
        }
    }

    #[must_use]
    pub fn section(&self) -> Section {
        self.section
    }

    #[must_use]
    pub fn content(&self) -> &SectionContent {
        &self.content
    }

    #[must_use]
    pub fn duration_secs(&self, mode: TimingMode) -> u32 {
        match mode {
            TimingMode::Production => self.full_secs,
            TimingMode::Development => self.short_secs,
        }
    }

    #[must_use]
    pub fn sub_part_count(&self) -> usize {
        match &self.content {
            SectionContent::Objective { parts, .. } => parts.len(),
            SectionContent::Written { tasks } => tasks.len(),
        }
    }

    /// Title of the 1-based sub-part `n`.
    #[must_use]
    pub fn sub_part_title(&self, n: usize) -> Option<&str> {
        let idx = n.checked_sub(1)?;
        match &self.content {
            SectionContent::Objective { parts, .. } => parts.get(idx).map(|p| p.title.as_str()),
            SectionContent::Written { tasks } => tasks.get(idx).map(|t| t.title.as_str()),
        }
    }

    /// Slots in this section's ledger: questions or tasks.
    #[must_use]
    pub fn slot_count(&self) -> usize {
        match &self.content {
            SectionContent::Objective { key, .. } => key.len(),
            SectionContent::Written { tasks } => tasks.len(),
        }
    }

    #[must_use]
    pub fn key(&self) -> Option<&AnswerKey> {
        match &self.content {
            SectionContent::Objective { key, .. } => Some(key),
            SectionContent::Written { .. } => None,
        }
    }

    #[must_use]
    pub fn tasks(&self) -> &[WritingTask] {
        match &self.content {
            SectionContent::Written { tasks } => tasks,
            SectionContent::Objective { .. } => &[],
        }
    }

    fn validate(&self) -> Result<(), DefinitionError> {
        if self.full_secs == 0 || self.short_secs == 0 {
            return Err(DefinitionError::ZeroDuration(self.section));
        }
        if self.sub_part_count() == 0 {
            return Err(DefinitionError::NoSubParts(self.section));
        }
        if let SectionContent::Objective { key, parts } = &self.content {
            let tiled = parts.iter().try_fold(0, |next, part| {
                (part.questions.start == next && part.questions.end > next)
                    .then_some(part.questions.end)
            });
            if tiled != Some(key.len()) {
                return Err(DefinitionError::UncoveredQuestions {
                    section: self.section,
                    len: key.len(),
                });
            }
        }
        Ok(())
    }
}

//
// ─── SCORING POLICY ────────────────────────────────────────────────────────────
//

/// Per-variant scoring choices that differ between test editions.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ScoringPolicy {
    pub zero_score: ZeroScorePolicy,
    pub writing_in_overall: bool,
    pub writing_scale: WritingScale,
}

//
// ─── TEST DEFINITION ───────────────────────────────────────────────────────────
//

/// Everything that distinguishes one exam variant from another.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestDefinition {
    name: String,
    title: String,
    sections: Vec<SectionSpec>,
    policy: ScoringPolicy,
}

impl TestDefinition {
    /// # Errors
    ///
    /// Returns `DefinitionError` if there are no sections, a section repeats,
    /// a duration is zero, or sub-parts do not tile the answer key.
    pub fn new(
        name: impl Into<String>,
        title: impl Into<String>,
        sections: Vec<SectionSpec>,
        policy: ScoringPolicy,
    ) -> Result<Self, DefinitionError> {
        if sections.is_empty() {
            return Err(DefinitionError::NoSections);
        }
        for (i, spec) in sections.iter().enumerate() {
            if sections[..i].iter().any(|s| s.section == spec.section) {
                return Err(DefinitionError::DuplicateSection(spec.section));
            }
            spec.validate()?;
        }
        Ok(Self {
            name: name.into(),
            title: title.into(),
            sections,
            policy,
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn sections(&self) -> &[SectionSpec] {
        &self.sections
    }

    #[must_use]
    pub fn section(&self, index: usize) -> Option<&SectionSpec> {
        self.sections.get(index)
    }

    #[must_use]
    pub fn policy(&self) -> &ScoringPolicy {
        &self.policy
    }

    #[must_use]
    pub fn with_policy(mut self, policy: ScoringPolicy) -> Self {
        self.policy = policy;
        self
    }
}
