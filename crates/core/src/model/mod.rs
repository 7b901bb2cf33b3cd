mod answer_key;
mod definition;
mod ledger;
mod result;
mod section;

pub use answer_key::{AnswerKey, KeyEntry, KeyError, MultiSelectGroup};
pub use definition::{
    DefinitionError, ParseTimingModeError, ScoringPolicy, SectionContent, SectionSpec, SubPart,
    TestDefinition, TimingMode, WritingTask,
};
pub use ledger::{AnswerLedger, LedgerError};
pub use result::{
    ObjectiveScore, RESULT_SCHEMA_VERSION, ResultRecord, SectionOutcome, TaskWordCount,
    WrittenResponse, WrittenSummary,
};
pub use section::Section;
