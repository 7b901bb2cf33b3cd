use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum KeyError {
    #[error("answer key entry {index} has no non-blank accepted form")]
    EmptyEntry { index: usize },

    #[error("multi-select group references question index {index} outside a key of {len}")]
    GroupOutOfRange { index: usize, len: usize },

    #[error("question index {index} belongs to more than one multi-select group")]
    OverlappingGroup { index: usize },

    #[error("multi-select group needs at least two slots and as many accepted letters")]
    MalformedGroup,
}

/// Accepted forms for a single question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyEntry {
    accepted: Vec<String>,
}

impl KeyEntry {
    #[must_use]
    pub fn exact(answer: impl Into<String>) -> Self {
        Self {
            accepted: vec![answer.into()],
        }
    }

    /// Several spellings that all count, e.g. `"14"` and `"fourteen"`.
    #[must_use]
    pub fn any<I, S>(forms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            accepted: forms.into_iter().map(Into::into).collect(),
        }
    }

    #[must_use]
    pub fn accepted(&self) -> &[String] {
        &self.accepted
    }

    /// The canonical form shown to a reader.
    #[must_use]
    pub fn canonical(&self) -> &str {
        self.accepted.first().map_or("", String::as_str)
    }
}

/// Consecutive questions answered as an unordered set ("choose TWO letters").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultiSelectGroup {
    indices: Vec<usize>,
    accepted: Vec<String>,
}

impl MultiSelectGroup {
    #[must_use]
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    #[must_use]
    pub fn accepted(&self) -> &[String] {
        &self.accepted
    }

    #[must_use]
    pub fn contains(&self, index: usize) -> bool {
        self.indices.contains(&index)
    }
}

/// Immutable grading key for one objective section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerKey {
    entries: Vec<KeyEntry>,
    groups: Vec<MultiSelectGroup>,
}

impl AnswerKey {
    /// # Errors
    ///
    /// Returns `KeyError::EmptyEntry` if any entry lists no accepted form or
    /// a blank one, which no graded answer could ever match.
    pub fn new(entries: Vec<KeyEntry>) -> Result<Self, KeyError> {
        let unusable = |e: &KeyEntry| {
            e.accepted.is_empty() || e.accepted.iter().any(|form| form.trim().is_empty())
        };
        if let Some(index) = entries.iter().position(unusable) {
            return Err(KeyError::EmptyEntry { index });
        }
        Ok(Self {
            entries,
            groups: Vec::new(),
        })
    }

    /// Build a key where every question has a single accepted form.
    ///
    /// # Errors
    ///
    /// Returns `KeyError::EmptyEntry` if any answer is blank.
    pub fn from_answers<I, S>(answers: I) -> Result<Self, KeyError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(answers.into_iter().map(KeyEntry::exact).collect())
    }

    /// Mark `indices` as one multi-select item accepting `letters` in any slot.
    ///
    /// The positional entries at those indices stay in the key as canonical
    /// display values but are no longer used for grading.
    ///
    /// # Errors
    ///
    /// Returns `KeyError` if an index is out of range, already grouped, or the
    /// group is malformed.
    pub fn with_multi_select<S: Into<String>>(
        mut self,
        indices: &[usize],
        letters: impl IntoIterator<Item = S>,
    ) -> Result<Self, KeyError> {
        let accepted: Vec<String> = letters.into_iter().map(Into::into).collect();
        if indices.len() < 2
            || accepted.len() != indices.len()
            || accepted.iter().any(|letter| letter.trim().is_empty())
        {
            return Err(KeyError::MalformedGroup);
        }
        for &index in indices {
            if index >= self.entries.len() {
                return Err(KeyError::GroupOutOfRange {
                    index,
                    len: self.entries.len(),
                });
            }
            if self.group_for(index).is_some() || indices.iter().filter(|&&i| i == index).count() > 1
            {
                return Err(KeyError::OverlappingGroup { index });
            }
        }
        self.groups.push(MultiSelectGroup {
            indices: indices.to_vec(),
            accepted,
        });
        Ok(self)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn entry(&self, index: usize) -> Option<&KeyEntry> {
        self.entries.get(index)
    }

    #[must_use]
    pub fn entries(&self) -> &[KeyEntry] {
        &self.entries
    }

    #[must_use]
    pub fn groups(&self) -> &[MultiSelectGroup] {
        &self.groups
    }

    #[must_use]
    pub fn group_for(&self, index: usize) -> Option<&MultiSelectGroup> {
        self.groups.iter().find(|g| g.contains(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn five() -> AnswerKey {
        AnswerKey::from_answers(["a", "b", "c", "d", "e"]).unwrap()
    }

    #[test]
    fn rejects_entry_without_forms() {
        let err = AnswerKey::new(vec![KeyEntry::exact("x"), KeyEntry::any(Vec::<String>::new())])
            .unwrap_err();
        assert_eq!(err, KeyError::EmptyEntry { index: 1 });
    }

    #[test]
    fn rejects_blank_forms() {
        assert_eq!(
            AnswerKey::from_answers(["a", "", "c"]).unwrap_err(),
            KeyError::EmptyEntry { index: 1 }
        );
        let err = AnswerKey::new(vec![KeyEntry::any(["14", "  "])]).unwrap_err();
        assert_eq!(err, KeyError::EmptyEntry { index: 0 });
        assert_eq!(
            five().with_multi_select(&[1, 2], ["B", " "]).unwrap_err(),
            KeyError::MalformedGroup
        );
    }

    #[test]
    fn groups_must_be_in_range_and_disjoint() {
        assert_eq!(
            five().with_multi_select(&[4, 5], ["B", "E"]).unwrap_err(),
            KeyError::GroupOutOfRange { index: 5, len: 5 }
        );
        let key = five().with_multi_select(&[1, 2], ["B", "E"]).unwrap();
        assert_eq!(
            key.with_multi_select(&[2, 3], ["A", "C"]).unwrap_err(),
            KeyError::OverlappingGroup { index: 2 }
        );
        assert_eq!(
            five().with_multi_select(&[1], ["B"]).unwrap_err(),
            KeyError::MalformedGroup
        );
    }

    #[test]
    fn group_lookup_by_index() {
        let key = five().with_multi_select(&[3, 4], ["A", "C"]).unwrap();
        assert!(key.group_for(4).is_some());
        assert!(key.group_for(0).is_none());
        assert_eq!(key.entry(3).unwrap().canonical(), "d");
    }
}
