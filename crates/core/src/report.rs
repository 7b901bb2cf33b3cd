//! Plain-text summary handed to the notification relay.

use std::fmt::Write as _;

use crate::model::{ResultRecord, Section};

const NO_RESPONSE: &str = "No response provided";

/// Render the human-readable result block for `record`.
#[must_use]
pub fn render_message(record: &ResultRecord) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "*{} Results*", record.title);
    let _ = writeln!(out);
    let _ = writeln!(out, "*Student*: {}", record.student);
    let _ = writeln!(out);

    for score in &record.objective {
        let _ = writeln!(
            out,
            "*{} Score*: {}/{} ({}%) — Band {}",
            score.section.title(),
            score.score,
            score.total,
            score.percentage,
            score.band
        );
    }

    for summary in &record.written {
        let counts = summary
            .tasks
            .iter()
            .map(|t| format!("{}: {} words", t.title, t.words))
            .collect::<Vec<_>>()
            .join(", ");
        match summary.band {
            Some(band) => {
                let _ = writeln!(
                    out,
                    "*{}*: {counts} — Band {band} (estimated)",
                    summary.section.title()
                );
            }
            None => {
                let _ = writeln!(out, "*{}*: {counts}", summary.section.title());
            }
        }
    }

    for response in record.responses.iter().filter(|r| r.section == Section::Writing) {
        let title = task_title(record, response.task);
        let text = response.text.trim();
        let _ = writeln!(out);
        let _ = writeln!(out, "*Writing Response ({title})*:");
        let _ = writeln!(out, "{}", if text.is_empty() { NO_RESPONSE } else { text });
    }

    let notes: Vec<_> = record
        .responses
        .iter()
        .filter(|r| r.section == Section::Speaking)
        .collect();
    if !notes.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "*Speaking Notes*:");
        for note in notes {
            let text = note.text.trim();
            let _ = writeln!(out, "{}", if text.is_empty() { NO_RESPONSE } else { text });
        }
    }

    let _ = writeln!(out);
    if let Some(band) = record.overall_band {
        let _ = writeln!(out, "*Overall Band*: {band}");
    }
    let _ = write!(
        out,
        "*Completed*: {}",
        record.completed_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    out
}

fn task_title(record: &ResultRecord, task: usize) -> String {
    record
        .written
        .iter()
        .find(|summary| summary.section == Section::Writing)
        .and_then(|summary| summary.tasks.get(task.wrapping_sub(1)))
        .map_or_else(|| format!("Task {task}"), |t| t.title.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::band::Band;
    use crate::model::{
        ObjectiveScore, RESULT_SCHEMA_VERSION, TaskWordCount, WrittenResponse, WrittenSummary,
    };
    use crate::time::fixed_now;
    use uuid::Uuid;

    fn record() -> ResultRecord {
        ResultRecord {
            schema_version: RESULT_SCHEMA_VERSION,
            attempt_id: Uuid::nil(),
            definition: "ielts".into(),
            title: "IELTS Mock Test".into(),
            student: "Abduraxmatov Abdulaziz".into(),
            started_at: fixed_now(),
            completed_at: fixed_now(),
            objective: vec![
                ObjectiveScore {
                    section: Section::Reading,
                    score: 40,
                    total: 40,
                    percentage: 100,
                    band: Band::from_tenths(90),
                },
                ObjectiveScore {
                    section: Section::Listening,
                    score: 30,
                    total: 40,
                    percentage: 75,
                    band: Band::from_tenths(75),
                },
            ],
            written: vec![WrittenSummary {
                section: Section::Writing,
                tasks: vec![
                    TaskWordCount {
                        title: "Task 1".into(),
                        words: 150,
                        min_words: 150,
                    },
                    TaskWordCount {
                        title: "Task 2".into(),
                        words: 250,
                        min_words: 250,
                    },
                ],
                band: Some(Band::from_tenths(60)),
            }],
            responses: vec![
                WrittenResponse {
                    section: Section::Writing,
                    task: 1,
                    text: "The chart compares rainfall.".into(),
                },
                WrittenResponse {
                    section: Section::Writing,
                    task: 2,
                    text: String::new(),
                },
                WrittenResponse {
                    section: Section::Speaking,
                    task: 1,
                    text: "   ".into(),
                },
            ],
            overall_band: Some(Band::from_tenths(75)),
            completed: true,
        }
    }

    #[test]
    fn message_lists_every_section() {
        let msg = render_message(&record());
        assert!(msg.starts_with("*IELTS Mock Test Results*"));
        assert!(msg.contains("*Student*: Abduraxmatov Abdulaziz"));
        assert!(msg.contains("*Reading Score*: 40/40 (100%) — Band 9.0"));
        assert!(msg.contains("*Listening Score*: 30/40 (75%) — Band 7.5"));
        assert!(msg.contains("*Writing*: Task 1: 150 words, Task 2: 250 words — Band 6.0 (estimated)"));
        assert!(msg.contains("*Writing Response (Task 1)*:\nThe chart compares rainfall.\n"));
        assert!(msg.contains(&format!("*Writing Response (Task 2)*:\n{NO_RESPONSE}\n")));
        assert!(msg.contains(&format!("*Speaking Notes*:\n{NO_RESPONSE}\n")));
        assert!(msg.contains("*Overall Band*: 7.5"));
        assert!(msg.ends_with("*Completed*: 2023-11-14 22:13:20 UTC"));
    }
}
