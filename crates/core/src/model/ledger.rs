use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum LedgerError {
    #[error("question index {index} is out of range (ledger holds {len})")]
    OutOfRange { index: usize, len: usize },
}

/// Fixed-length, ordered responses for one section.
///
/// Slot `i` holds the response to question (or task) `i`; an empty string
/// means unanswered. The length is fixed at construction and entries are only
/// ever replaced in place.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AnswerLedger {
    answers: Vec<String>,
}

impl AnswerLedger {
    #[must_use]
    pub fn new(len: usize) -> Self {
        Self {
            answers: vec![String::new(); len],
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.answers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.answers.is_empty()
    }

    /// The response at `index`, or `""` when out of range.
    #[must_use]
    pub fn get(&self, index: usize) -> &str {
        self.answers.get(index).map_or("", String::as_str)
    }

    /// Replace the response at `index`. Any text is accepted, including empty.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::OutOfRange` if `index >= len`.
    pub fn set(&mut self, index: usize, value: impl Into<String>) -> Result<(), LedgerError> {
        let len = self.answers.len();
        let slot = self
            .answers
            .get_mut(index)
            .ok_or(LedgerError::OutOfRange { index, len })?;
        *slot = value.into();
        Ok(())
    }

    /// Number of slots holding something other than whitespace.
    #[must_use]
    pub fn answered(&self) -> usize {
        self.answers.iter().filter(|a| !a.trim().is_empty()).count()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[String] {
        &self.answers
    }
}

impl<S: Into<String>> FromIterator<S> for AnswerLedger {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            answers: iter.into_iter().map(Into::into).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_blank_with_fixed_length() {
        let ledger = AnswerLedger::new(40);
        assert_eq!(ledger.len(), 40);
        assert_eq!(ledger.get(39), "");
        assert_eq!(ledger.answered(), 0);
    }

    #[test]
    fn set_touches_only_its_slot() {
        let mut ledger = AnswerLedger::new(3);
        ledger.set(0, "temperature").unwrap();
        ledger.set(2, "oxygen").unwrap();
        ledger.set(0, "TEMPERATURE").unwrap();

        assert_eq!(ledger.as_slice(), ["TEMPERATURE", "", "oxygen"]);
        assert_eq!(ledger.answered(), 2);
    }

    #[test]
    fn out_of_range_is_rejected_without_growing() {
        let mut ledger = AnswerLedger::new(2);
        let err = ledger.set(2, "x").unwrap_err();
        assert_eq!(err, LedgerError::OutOfRange { index: 2, len: 2 });
        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger.get(7), "");
    }
}
