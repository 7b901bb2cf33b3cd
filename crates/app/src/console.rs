use std::fmt;

use exam_core::session::ExamState;
use exam_core::timer::format_clock;
use services::ExamSnapshot;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `answer <question> <text>`: question numbers start at 1.
    Answer { question: usize, text: String },
    /// `write <task> <text>`: replaces the response for that task.
    Write { task: usize, text: String },
    Next,
    Finish,
    Status,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    Empty,
    Unknown(String),
    MissingNumber { command: &'static str },
    InvalidNumber { raw: String },
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandError::Empty => write!(f, "type a command, or `help`"),
            CommandError::Unknown(cmd) => write!(f, "unknown command: {cmd}"),
            CommandError::MissingNumber { command } => {
                write!(f, "{command} needs a number, e.g. `{command} 3 ...`")
            }
            CommandError::InvalidNumber { raw } => write!(f, "not a question number: {raw}"),
        }
    }
}

impl std::error::Error for CommandError {}

pub const HELP: &str = "\
Commands:
  answer <n> <text>   record the answer to question n (alias: a)
  write <n> <text>    set the response for task n (alias: w)
  next                next passage/part, or close the section (alias: n)
  finish              close the current section now
  status              show where you are and the time left (alias: s)
  help                show this list
  quit                leave without submitting";

impl Command {
    /// # Errors
    ///
    /// Returns `CommandError` for blank input, unknown commands or a bad
    /// question number.
    pub fn parse(line: &str) -> Result<Self, CommandError> {
        let line = line.trim();
        let (head, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        match head.to_ascii_lowercase().as_str() {
            "" => Err(CommandError::Empty),
            "answer" | "a" => {
                let (question, text) = numbered("answer", rest)?;
                Ok(Command::Answer { question, text })
            }
            "write" | "w" => {
                let (task, text) = numbered("write", rest)?;
                Ok(Command::Write { task, text })
            }
            "next" | "n" => Ok(Command::Next),
            "finish" => Ok(Command::Finish),
            "status" | "s" => Ok(Command::Status),
            "help" | "?" => Ok(Command::Help),
            "quit" | "exit" => Ok(Command::Quit),
            other => Err(CommandError::Unknown(other.to_string())),
        }
    }
}

fn numbered(command: &'static str, rest: &str) -> Result<(usize, String), CommandError> {
    let rest = rest.trim_start();
    let (raw, text) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
    if raw.is_empty() {
        return Err(CommandError::MissingNumber { command });
    }
    let number = raw
        .parse::<usize>()
        .ok()
        .filter(|n| *n > 0)
        .ok_or_else(|| CommandError::InvalidNumber {
            raw: raw.to_string(),
        })?;
    Ok((number, text.trim().to_string()))
}

/// One status line, e.g. `Reading · Passage 2 (2/3) · 59:12 left`.
#[must_use]
pub fn status_line(snapshot: &ExamSnapshot) -> String {
    match snapshot.state {
        ExamState::NotStarted => format!(
            "{} · not started · {} on the clock",
            snapshot.section.title(),
            format_clock(snapshot.remaining_secs)
        ),
        ExamState::Active => format!(
            "{} · {} ({}/{}) · {} left",
            snapshot.section.title(),
            snapshot.sub_part_title.as_deref().unwrap_or("-"),
            snapshot.position.sub_part,
            snapshot.sub_part_count,
            format_clock(snapshot.remaining_secs)
        ),
        ExamState::Submitting => "Submitting results…".to_string(),
        ExamState::Complete => match snapshot.overall_band {
            Some(band) => format!("Test complete · overall band {band}"),
            None => "Test complete".to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use exam_core::model::Section;
    use exam_core::session::Position;

    #[test]
    fn parses_commands_and_aliases() {
        assert_eq!(
            Command::parse("a 3  carbon dioxide ").unwrap(),
            Command::Answer {
                question: 3,
                text: "carbon dioxide".into()
            }
        );
        assert_eq!(
            Command::parse("WRITE 1 The chart shows").unwrap(),
            Command::Write {
                task: 1,
                text: "The chart shows".into()
            }
        );
        assert_eq!(
            Command::parse("answer 7").unwrap(),
            Command::Answer {
                question: 7,
                text: String::new()
            }
        );
        assert_eq!(Command::parse("n").unwrap(), Command::Next);
        assert_eq!(Command::parse(" status ").unwrap(), Command::Status);
        assert_eq!(Command::parse("exit").unwrap(), Command::Quit);
    }

    #[test]
    fn reports_bad_input() {
        assert_eq!(Command::parse("   ").unwrap_err(), CommandError::Empty);
        assert_eq!(
            Command::parse("jump").unwrap_err(),
            CommandError::Unknown("jump".into())
        );
        assert_eq!(
            Command::parse("answer").unwrap_err(),
            CommandError::MissingNumber { command: "answer" }
        );
        assert_eq!(
            Command::parse("a 0 x").unwrap_err(),
            CommandError::InvalidNumber { raw: "0".into() }
        );
        assert_eq!(
            Command::parse("w two words").unwrap_err(),
            CommandError::InvalidNumber { raw: "two".into() }
        );
    }

    #[test]
    fn status_line_shows_position_and_clock() {
        let snapshot = ExamSnapshot {
            state: ExamState::Active,
            position: Position {
                section: 0,
                sub_part: 2,
            },
            section: Section::Reading,
            sub_part_count: 3,
            sub_part_title: Some("Passage 2".into()),
            remaining_secs: 3552,
            candidate: Some("A".into()),
            last_error: None,
            overall_band: None,
            result: None,
        };
        assert_eq!(status_line(&snapshot), "Reading · Passage 2 (2/3) · 59:12 left");
    }
}
