//! The exam session state machine.
//!
//! `NotStarted → Active(section, sub-part) → … → Submitting → Complete`
//!
//! Every public mutator performs at most one transition. Progress is
//! forward-only: nothing decreases the section index or the sub-part.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::auth::SessionContext;
use crate::band::{self, Band};
use crate::grading;
use crate::model::{
    AnswerLedger, LedgerError, ObjectiveScore, RESULT_SCHEMA_VERSION, ResultRecord, Section,
    SectionContent, SectionOutcome, SectionSpec, TaskWordCount, TestDefinition, TimingMode,
    WrittenResponse, WrittenSummary,
};
use crate::report;
use crate::time::Clock;
use crate::timer::{SectionTimer, TickOutcome, TimerTicket};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionError {
    #[error("the candidate is not logged in")]
    NotAuthenticated,

    #[error("the exam has already started")]
    AlreadyStarted,

    #[error("the exam is not in progress")]
    NotActive,

    #[error("results are not being submitted")]
    NotSubmitting,

    #[error("{section} has no further {label}")]
    NoMoreSubParts { section: Section, label: &'static str },

    #[error("{section} does not take {expected}")]
    WrongInput {
        section: Section,
        expected: &'static str,
    },

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

//
// ─── STATE ─────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExamState {
    NotStarted,
    Active,
    Submitting,
    Complete,
}

impl fmt::Display for ExamState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ExamState::NotStarted => "not started",
            ExamState::Active => "active",
            ExamState::Submitting => "submitting",
            ExamState::Complete => "complete",
        })
    }
}

/// Where the candidate is: section index and 1-based sub-part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Position {
    pub section: usize,
    pub sub_part: usize,
}

impl Position {
    const START: Position = Position {
        section: 0,
        sub_part: 1,
    };
}

/// Result and message produced by the final boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinishedExam {
    pub record: ResultRecord,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// Moved to the next sub-part of the same section; nothing was graded.
    SubPart { section: Section, sub_part: usize },
    /// Closed `completed` and opened `next` with a fresh timer.
    Section {
        completed: SectionOutcome,
        next: Section,
    },
    /// Closed the last section; the session is now submitting.
    Finished(Box<FinishedExam>),
}

/// Result of a guarded advance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Applied(Transition),
    /// The session had already moved past the expected position.
    Stale,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickEvent {
    Stale,
    Counted { remaining: u32 },
    Expired(Transition),
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

pub struct ExamSession {
    definition: Arc<TestDefinition>,
    mode: TimingMode,
    clock: Clock,
    attempt_id: Uuid,
    candidate: Option<String>,
    state: ExamState,
    position: Position,
    timer: SectionTimer,
    ledgers: Vec<AnswerLedger>,
    outcomes: Vec<SectionOutcome>,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    last_error: Option<String>,
}

impl ExamSession {
    /// A session waiting to start. The timer previews the first section's
    /// duration without ticking.
    #[must_use]
    pub fn new(definition: Arc<TestDefinition>, mode: TimingMode, clock: Clock) -> Self {
        let ledgers = definition
            .sections()
            .iter()
            .map(|spec| AnswerLedger::new(spec.slot_count()))
            .collect();
        let preview = definition
            .section(0)
            .map_or(0, |spec| spec.duration_secs(mode));

        Self {
            definition,
            mode,
            clock,
            attempt_id: Uuid::new_v4(),
            candidate: None,
            state: ExamState::NotStarted,
            position: Position::START,
            timer: SectionTimer::new(preview),
            ledgers,
            outcomes: Vec::new(),
            started_at: None,
            completed_at: None,
            last_error: None,
        }
    }

    #[must_use]
    pub fn definition(&self) -> &TestDefinition {
        &self.definition
    }

    #[must_use]
    pub fn timing_mode(&self) -> TimingMode {
        self.mode
    }

    #[must_use]
    pub fn attempt_id(&self) -> Uuid {
        self.attempt_id
    }

    #[must_use]
    pub fn candidate(&self) -> Option<&str> {
        self.candidate.as_deref()
    }

    #[must_use]
    pub fn state(&self) -> ExamState {
        self.state
    }

    #[must_use]
    pub fn position(&self) -> Position {
        self.position
    }

    #[must_use]
    pub fn current_spec(&self) -> &SectionSpec {
        &self.definition.sections()[self.position.section]
    }

    #[must_use]
    pub fn current_section(&self) -> Section {
        self.current_spec().section()
    }

    #[must_use]
    pub fn sub_part_count(&self) -> usize {
        self.current_spec().sub_part_count()
    }

    /// Seconds left on the section clock, or the preview duration before start.
    #[must_use]
    pub fn remaining_secs(&self) -> u32 {
        self.timer.remaining()
    }

    /// Ticket for the running countdown, if any.
    #[must_use]
    pub fn timer_ticket(&self) -> Option<TimerTicket> {
        self.timer.ticket()
    }

    #[must_use]
    pub fn ledger(&self, section: Section) -> Option<&AnswerLedger> {
        self.definition
            .sections()
            .iter()
            .position(|spec| spec.section() == section)
            .and_then(|idx| self.ledgers.get(idx))
    }

    #[must_use]
    pub fn outcomes(&self) -> &[SectionOutcome] {
        &self.outcomes
    }

    #[must_use]
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    #[must_use]
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    /// Advisory shown to the candidate, e.g. a failed result submission.
    #[must_use]
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.state == ExamState::Complete
    }

    /// Begin the exam at the first sub-part of the first section.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotAuthenticated` if `ctx` is not logged in and
    /// `SessionError::AlreadyStarted` if called twice.
    pub fn start(&mut self, ctx: &SessionContext) -> Result<TimerTicket, SessionError> {
        if !ctx.is_authenticated() {
            return Err(SessionError::NotAuthenticated);
        }
        if self.state != ExamState::NotStarted {
            return Err(SessionError::AlreadyStarted);
        }
        self.candidate = Some(ctx.candidate().to_string());
        self.started_at = Some(self.clock.now());
        self.state = ExamState::Active;
        self.position = Position::START;
        Ok(self.arm_timer())
    }

    /// Record the answer to question `index` (0-based) of the current section.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotActive`, `SessionError::WrongInput` for a
    /// written section, or `SessionError::Ledger` for a bad index.
    pub fn set_answer(&mut self, index: usize, value: impl Into<String>) -> Result<(), SessionError> {
        self.require_active()?;
        let section = self.current_section();
        if !matches!(self.current_spec().content(), SectionContent::Objective { .. }) {
            return Err(SessionError::WrongInput {
                section,
                expected: "short answers",
            });
        }
        self.ledgers[self.position.section].set(index, value)?;
        Ok(())
    }

    /// Record the response to task `index` (0-based) of the current section.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotActive`, `SessionError::WrongInput` for an
    /// objective section, or `SessionError::Ledger` for a bad index.
    pub fn set_response(&mut self, index: usize, text: impl Into<String>) -> Result<(), SessionError> {
        self.require_active()?;
        let section = self.current_section();
        if !matches!(self.current_spec().content(), SectionContent::Written { .. }) {
            return Err(SessionError::WrongInput {
                section,
                expected: "written responses",
            });
        }
        self.ledgers[self.position.section].set(index, text)?;
        Ok(())
    }

    /// Move to the next sub-part without grading or touching the clock.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotActive` or `SessionError::NoMoreSubParts` on
    /// the last sub-part.
    pub fn next_sub_part(&mut self) -> Result<Transition, SessionError> {
        self.require_active()?;
        if self.position.sub_part >= self.sub_part_count() {
            let section = self.current_section();
            return Err(SessionError::NoMoreSubParts {
                section,
                label: section.sub_part_label(),
            });
        }
        self.position.sub_part += 1;
        Ok(Transition::SubPart {
            section: self.current_section(),
            sub_part: self.position.sub_part,
        })
    }

    /// Close the current section regardless of sub-part.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotActive` outside an active exam.
    pub fn finish_section(&mut self) -> Result<Transition, SessionError> {
        self.require_active()?;
        Ok(self.section_boundary())
    }

    /// The "next" action: next sub-part if one remains, otherwise close the
    /// section.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotActive` outside an active exam.
    pub fn advance(&mut self) -> Result<Transition, SessionError> {
        self.require_active()?;
        if self.position.sub_part < self.sub_part_count() {
            self.next_sub_part()
        } else {
            Ok(self.section_boundary())
        }
    }

    /// [`advance`](Self::advance), but only if the session is still at
    /// `expected`. Repeated triggers for the same position apply once.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotActive` outside an active exam.
    pub fn advance_from(&mut self, expected: Position) -> Result<Step, SessionError> {
        if self.state != ExamState::Active || self.position != expected {
            return if self.state == ExamState::NotStarted {
                Err(SessionError::NotActive)
            } else {
                Ok(Step::Stale)
            };
        }
        self.advance().map(Step::Applied)
    }

    /// Count one second off the section clock.
    ///
    /// On expiry the boundary runs exactly once: the next sub-part gets an even
    /// share of the section duration, the last sub-part closes the section.
    pub fn tick(&mut self, ticket: TimerTicket) -> TickEvent {
        if self.state != ExamState::Active {
            return TickEvent::Stale;
        }
        match self.timer.tick(ticket) {
            TickOutcome::Stale => TickEvent::Stale,
            TickOutcome::Running { remaining } => TickEvent::Counted { remaining },
            TickOutcome::Expired => {
                if self.position.sub_part < self.sub_part_count() {
                    self.position.sub_part += 1;
                    self.arm_sub_part_timer();
                    TickEvent::Expired(Transition::SubPart {
                        section: self.current_section(),
                        sub_part: self.position.sub_part,
                    })
                } else {
                    TickEvent::Expired(self.section_boundary())
                }
            }
        }
    }

    /// Keep an advisory for the candidate while results are submitted.
    pub fn record_submit_error(&mut self, message: impl Into<String>) {
        self.last_error = Some(message.into());
    }

    /// `Submitting → Complete`.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotSubmitting` from any other state.
    pub fn complete(&mut self) -> Result<(), SessionError> {
        match self.state {
            ExamState::Submitting => {
                self.state = ExamState::Complete;
                Ok(())
            }
            ExamState::Complete => Ok(()),
            _ => Err(SessionError::NotSubmitting),
        }
    }

    fn require_active(&self) -> Result<(), SessionError> {
        if self.state == ExamState::Active {
            Ok(())
        } else {
            Err(SessionError::NotActive)
        }
    }

    fn arm_timer(&mut self) -> TimerTicket {
        let duration = self.current_spec().duration_secs(self.mode);
        self.timer.configure(duration);
        self.timer.start()
    }

    /// Overtime for a sub-part reached after the section clock ran out.
    fn arm_sub_part_timer(&mut self) -> TimerTicket {
        let parts = u32::try_from(self.sub_part_count()).unwrap_or(u32::MAX).max(1);
        let share = (self.current_spec().duration_secs(self.mode) / parts).max(1);
        self.timer.configure(share);
        self.timer.start()
    }

    fn section_boundary(&mut self) -> Transition {
        let outcome = self.score_current();
        self.outcomes.push(outcome.clone());

        let next = self.position.section + 1;
        match self.definition.section(next).map(SectionSpec::section) {
            Some(next_section) => {
                self.position = Position {
                    section: next,
                    sub_part: 1,
                };
                self.arm_timer();
                Transition::Section {
                    completed: outcome,
                    next: next_section,
                }
            }
            None => self.finalize(),
        }
    }

    fn score_current(&self) -> SectionOutcome {
        let spec = self.current_spec();
        let ledger = &self.ledgers[self.position.section];
        let policy = self.definition.policy();

        match spec.content() {
            SectionContent::Objective { key, .. } => {
                let score = grading::grade(ledger, key);
                let total = u32::try_from(key.len()).unwrap_or(u32::MAX);
                SectionOutcome::Objective(ObjectiveScore {
                    section: spec.section(),
                    score,
                    total,
                    percentage: band::percentage(score, total),
                    band: band::to_band_with(score, total, policy.zero_score),
                })
            }
            SectionContent::Written { tasks } => {
                let counts: Vec<TaskWordCount> = tasks
                    .iter()
                    .enumerate()
                    .map(|(i, task)| TaskWordCount {
                        title: task.title.clone(),
                        words: band::word_count(ledger.get(i)),
                        min_words: task.min_words,
                    })
                    .collect();
                let band = (spec.section() == Section::Writing).then(|| {
                    let pairs: Vec<(u32, u32)> =
                        counts.iter().map(|c| (c.words, c.min_words)).collect();
                    policy.writing_scale.estimate(&pairs)
                });
                SectionOutcome::Written(WrittenSummary {
                    section: spec.section(),
                    tasks: counts,
                    band,
                })
            }
        }
    }

    fn overall_band(&self) -> Option<Band> {
        let include_writing = self.definition.policy().writing_in_overall;
        let bands: Vec<Band> = self
            .outcomes
            .iter()
            .filter_map(|outcome| match outcome {
                SectionOutcome::Objective(score) => Some(score.band),
                SectionOutcome::Written(summary) if include_writing => summary.band,
                SectionOutcome::Written(_) => None,
            })
            .collect();
        band::overall_band(&bands)
    }

    fn finalize(&mut self) -> Transition {
        self.timer.cancel();
        self.state = ExamState::Submitting;
        let completed_at = self.clock.now();
        self.completed_at = Some(completed_at);

        let record = self.build_record(completed_at);
        let message = report::render_message(&record);
        Transition::Finished(Box::new(FinishedExam { record, message }))
    }

    fn build_record(&self, completed_at: DateTime<Utc>) -> ResultRecord {
        let mut objective = Vec::new();
        let mut written = Vec::new();
        for outcome in &self.outcomes {
            match outcome {
                SectionOutcome::Objective(score) => objective.push(score.clone()),
                SectionOutcome::Written(summary) => written.push(summary.clone()),
            }
        }

        let responses = self
            .definition
            .sections()
            .iter()
            .zip(&self.ledgers)
            .filter(|(spec, _)| matches!(spec.content(), SectionContent::Written { .. }))
            .flat_map(|(spec, ledger)| {
                ledger
                    .as_slice()
                    .iter()
                    .enumerate()
                    .map(move |(i, text)| WrittenResponse {
                        section: spec.section(),
                        task: i + 1,
                        text: text.clone(),
                    })
            })
            .collect();

        ResultRecord {
            schema_version: RESULT_SCHEMA_VERSION,
            attempt_id: self.attempt_id,
            definition: self.definition.name().to_string(),
            title: self.definition.title().to_string(),
            student: self.candidate.clone().unwrap_or_default(),
            started_at: self.started_at.unwrap_or(completed_at),
            completed_at,
            objective,
            written,
            responses,
            overall_band: self.overall_band(),
            completed: true,
        }
    }
}

impl fmt::Debug for ExamSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExamSession")
            .field("definition", &self.definition.name())
            .field("attempt_id", &self.attempt_id)
            .field("state", &self.state)
            .field("position", &self.position)
            .field("remaining", &self.timer.remaining())
            .field("outcomes_len", &self.outcomes.len())
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
