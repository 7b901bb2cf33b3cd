//! Built-in exam variants.

use crate::band::{WritingScale, ZeroScorePolicy};
use crate::model::{
    AnswerKey, DefinitionError, KeyEntry, ScoringPolicy, Section, SectionSpec, SubPart,
    TestDefinition, WritingTask,
};

const MINUTE: u32 = 60;

/// Names accepted by [`by_name`].
pub const DEFINITION_NAMES: [&str; 2] = ["ielts", "practice"];

/// Look up a built-in definition by name.
///
/// # Errors
///
/// Returns `DefinitionError` if the built-in data fails validation, which
/// only happens if this module is edited incorrectly.
pub fn by_name(name: &str) -> Result<Option<TestDefinition>, DefinitionError> {
    match name.trim().to_ascii_lowercase().as_str() {
        "ielts" => ielts_academic().map(Some),
        "practice" => practice().map(Some),
        _ => Ok(None),
    }
}

/// Full-length mock: 40 reading questions over three passages, 40 listening
/// questions over four parts, two writing tasks.
///
/// Zero correct answers receive the 2.0 floor and the writing estimate is
/// part of the overall band.
///
/// # Errors
///
/// Returns `DefinitionError` if the built-in data is inconsistent.
pub fn ielts_academic() -> Result<TestDefinition, DefinitionError> {
    let reading_key = AnswerKey::new(vec![
        // Passage 1
        KeyEntry::exact("TRUE"),
        KeyEntry::exact("FALSE"),
        KeyEntry::exact("NOT GIVEN"),
        KeyEntry::exact("TRUE"),
        KeyEntry::exact("FALSE"),
        KeyEntry::exact("NOT GIVEN"),
        KeyEntry::any(["glaciers", "glacier"]),
        KeyEntry::any(["carbon dioxide", "CO2"]),
        KeyEntry::exact("deforestation"),
        KeyEntry::any(["sea levels", "sea level"]),
        KeyEntry::any(["droughts", "drought"]),
        KeyEntry::exact("evaporation"),
        KeyEntry::exact("renewable energy"),
        // Passage 2
        KeyEntry::exact("iv"),
        KeyEntry::exact("vii"),
        KeyEntry::exact("ii"),
        KeyEntry::exact("ix"),
        KeyEntry::exact("i"),
        KeyEntry::exact("vi"),
        KeyEntry::exact("C"),
        KeyEntry::exact("B"),
        KeyEntry::exact("A"),
        KeyEntry::exact("D"),
        KeyEntry::any(["satellites", "satellite"]),
        KeyEntry::exact("1987"),
        KeyEntry::exact("coral"),
        // Passage 3
        KeyEntry::exact("B"),
        KeyEntry::exact("D"),
        KeyEntry::exact("A"),
        KeyEntry::exact("C"),
        KeyEntry::exact("FALSE"),
        KeyEntry::exact("TRUE"),
        KeyEntry::exact("NOT GIVEN"),
        KeyEntry::exact("TRUE"),
        KeyEntry::exact("migration"),
        KeyEntry::exact("algae"),
        KeyEntry::exact("pollution"),
        KeyEntry::exact("tourism"),
        KeyEntry::exact("fishing"),
        KeyEntry::exact("legislation"),
    ])?
    // Questions 22-23: choose TWO letters.
    .with_multi_select(&[21, 22], ["A", "D"])?;

    let listening_key = AnswerKey::new(vec![
        // Part 1
        KeyEntry::exact("Harrison"),
        KeyEntry::any(["14", "fourteen"]),
        KeyEntry::exact("Tuesday"),
        KeyEntry::exact("parking"),
        KeyEntry::any(["35", "thirty-five", "thirty five"]),
        KeyEntry::exact("library"),
        KeyEntry::exact("B"),
        KeyEntry::exact("A"),
        KeyEntry::exact("C"),
        KeyEntry::exact("receipt"),
        // Part 2
        KeyEntry::exact("C"),
        KeyEntry::exact("A"),
        KeyEntry::exact("B"),
        KeyEntry::exact("B"),
        KeyEntry::exact("museum"),
        KeyEntry::exact("bridge"),
        KeyEntry::any(["cafe", "café"]),
        KeyEntry::exact("fountain"),
        KeyEntry::exact("gallery"),
        KeyEntry::exact("station"),
        // Part 3
        KeyEntry::exact("A"),
        KeyEntry::exact("C"),
        KeyEntry::exact("B"),
        KeyEntry::exact("A"),
        KeyEntry::exact("B"),
        KeyEntry::exact("E"),
        KeyEntry::exact("questionnaire"),
        KeyEntry::exact("interviews"),
        KeyEntry::exact("deadline"),
        KeyEntry::exact("presentation"),
        // Part 4
        KeyEntry::exact("conference"),
        KeyEntry::exact("research"),
        KeyEntry::exact("university"),
        KeyEntry::exact("global"),
        KeyEntry::exact("temperature"),
        KeyEntry::exact("oxygen"),
        KeyEntry::exact("carbon"),
        KeyEntry::exact("water"),
        KeyEntry::exact("energy"),
        KeyEntry::exact("2050"),
    ])?
    // Questions 25-26: choose TWO letters.
    .with_multi_select(&[24, 25], ["B", "E"])?;

    TestDefinition::new(
        "ielts",
        "IELTS Academic Mock Test",
        vec![
            SectionSpec::objective(
                Section::Reading,
                60 * MINUTE,
                MINUTE,
                reading_key,
                vec![
                    SubPart::new("Passage 1", 0..13),
                    SubPart::new("Passage 2", 13..26),
                    SubPart::new("Passage 3", 26..40),
                ],
            ),
            SectionSpec::objective(
                Section::Listening,
                30 * MINUTE,
                MINUTE,
                listening_key,
                vec![
                    SubPart::new("Part 1", 0..10),
                    SubPart::new("Part 2", 10..20),
                    SubPart::new("Part 3", 20..30),
                    SubPart::new("Part 4", 30..40),
                ],
            ),
            SectionSpec::written(
                Section::Writing,
                60 * MINUTE,
                MINUTE,
                vec![
                    WritingTask::new("Task 1", 150),
                    WritingTask::new("Task 2", 250),
                ],
            ),
        ],
        ScoringPolicy {
            zero_score: ZeroScorePolicy::Floor,
            writing_in_overall: true,
            writing_scale: WritingScale::default(),
        },
    )
}

/// Short practice paper: five gap-fill questions each for reading and
/// listening, one writing task and free speaking notes.
///
/// Zero correct answers are reported as band 0.0 and the overall band only
/// averages reading and listening.
///
/// # Errors
///
/// Returns `DefinitionError` if the built-in data is inconsistent.
pub fn practice() -> Result<TestDefinition, DefinitionError> {
    let reading_key =
        AnswerKey::from_answers(["temperature", "oxygen", "carbon", "water", "energy"])?;
    let listening_key = AnswerKey::from_answers([
        "conference",
        "research",
        "university",
        "global",
        "presentation",
    ])?;

    TestDefinition::new(
        "practice",
        "IELTS Practice Test",
        vec![
            SectionSpec::objective(
                Section::Reading,
                60 * MINUTE,
                MINUTE,
                reading_key,
                vec![SubPart::new("Climate Change and Global Warming", 0..5)],
            ),
            SectionSpec::objective(
                Section::Listening,
                30 * MINUTE,
                MINUTE,
                listening_key,
                vec![SubPart::new("Conference Welcome", 0..5)],
            ),
            SectionSpec::written(
                Section::Writing,
                60 * MINUTE,
                MINUTE,
                vec![WritingTask::new("Task 1", 150)],
            ),
            SectionSpec::written(
                Section::Speaking,
                15 * MINUTE,
                MINUTE,
                vec![WritingTask::new("Notes", 0)],
            ),
        ],
        ScoringPolicy {
            zero_score: ZeroScorePolicy::Zero,
            writing_in_overall: false,
            writing_scale: WritingScale::default(),
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn built_ins_validate() {
        let ielts = ielts_academic().unwrap();
        assert_eq!(ielts.sections().len(), 3);
        assert_eq!(ielts.section(0).unwrap().slot_count(), 40);
        assert_eq!(ielts.section(0).unwrap().sub_part_count(), 3);
        assert_eq!(ielts.section(1).unwrap().slot_count(), 40);
        assert_eq!(ielts.section(1).unwrap().sub_part_count(), 4);
        assert_eq!(ielts.section(2).unwrap().tasks().len(), 2);

        let practice = practice().unwrap();
        assert_eq!(practice.sections().len(), 4);
        assert_eq!(practice.section(3).unwrap().section(), Section::Speaking);
    }

    #[test]
    fn lookup_by_name() {
        for name in DEFINITION_NAMES {
            assert_eq!(by_name(name).unwrap().unwrap().name(), name);
        }
        assert!(by_name("toefl").unwrap().is_none());
    }
}
