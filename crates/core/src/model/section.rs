use serde::{Deserialize, Serialize};
use std::fmt;

/// Top-level timed part of an exam.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Section {
    Reading,
    Listening,
    Writing,
    Speaking,
}

impl Section {
    pub const ALL: [Section; 4] = [
        Section::Reading,
        Section::Listening,
        Section::Writing,
        Section::Speaking,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Section::Reading => "reading",
            Section::Listening => "listening",
            Section::Writing => "writing",
            Section::Speaking => "speaking",
        }
    }

    /// Human label used in the result message.
    #[must_use]
    pub fn title(self) -> &'static str {
        match self {
            Section::Reading => "Reading",
            Section::Listening => "Listening",
            Section::Writing => "Writing",
            Section::Speaking => "Speaking",
        }
    }

    /// What a sub-part of this section is called ("passage", "task", ...).
    #[must_use]
    pub fn sub_part_label(self) -> &'static str {
        match self {
            Section::Reading => "passage",
            Section::Listening => "part",
            Section::Writing | Section::Speaking => "task",
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_matches_serde_name() {
        let json = serde_json::to_string(&Section::Speaking).unwrap();
        assert_eq!(json, format!("\"{}\"", Section::Speaking));
    }
}
