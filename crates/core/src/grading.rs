//! Objective grading against a fixed answer key.

use crate::model::{AnswerKey, AnswerLedger};

/// Comparison form of an answer: surrounding whitespace trimmed, lowercased.
#[must_use]
pub fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

/// Count of questions in `ledger` that match `key`.
///
/// Single questions match when the normalized answer equals any normalized
/// accepted form. A multi-select group is graded as a set: each accepted
/// letter is credited at most once, whichever slot of the group holds it.
/// Blank answers never match; there is no partial credit or penalty.
#[must_use]
pub fn grade(ledger: &AnswerLedger, key: &AnswerKey) -> u32 {
    let singles = key
        .entries()
        .iter()
        .enumerate()
        .filter(|(index, _)| key.group_for(*index).is_none())
        .filter(|(index, entry)| {
            let answer = normalize(ledger.get(*index));
            !answer.is_empty() && entry.accepted().iter().any(|form| normalize(form) == answer)
        })
        .count();

    let grouped: usize = key
        .groups()
        .iter()
        .map(|group| {
            let mut remaining: Vec<String> =
                group.accepted().iter().map(|form| normalize(form)).collect();
            group
                .indices()
                .iter()
                .map(|&index| normalize(ledger.get(index)))
                .filter(|answer| {
                    if answer.is_empty() {
                        return false;
                    }
                    let hit = remaining.iter().position(|form| form == answer);
                    hit.map(|pos| remaining.swap_remove(pos)).is_some()
                })
                .count()
        })
        .sum();

    u32::try_from(singles + grouped).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::KeyEntry;

    fn ledger(answers: &[&str]) -> AnswerLedger {
        answers.iter().copied().collect()
    }

    #[test]
    fn counts_exact_matches() {
        let key = AnswerKey::from_answers(["temperature", "oxygen", "carbon"]).unwrap();
        assert_eq!(grade(&ledger(&["temperature", "oxygen", "carbon"]), &key), 3);
        assert_eq!(grade(&ledger(&["temperature", "", "coal"]), &key), 1);
        assert_eq!(grade(&AnswerLedger::new(3), &key), 0);
    }

    #[test]
    fn ignores_case_and_surrounding_whitespace() {
        let key = AnswerKey::from_answers(["temperature", "NOT GIVEN"]).unwrap();
        assert_eq!(grade(&ledger(&["  Temperature ", "not given"]), &key), 2);
    }

    #[test]
    fn any_accepted_form_counts() {
        let key = AnswerKey::new(vec![
            KeyEntry::any(["14", "fourteen"]),
            KeyEntry::any(["carbon dioxide", "CO2"]),
        ])
        .unwrap();
        assert_eq!(grade(&ledger(&["Fourteen", "co2"]), &key), 2);
    }

    #[test]
    fn multi_select_is_order_independent() {
        let key = AnswerKey::from_answers(["x", "B", "E"])
            .unwrap()
            .with_multi_select(&[1, 2], ["B", "E"])
            .unwrap();

        assert_eq!(grade(&ledger(&["x", "B", "E"]), &key), 3);
        assert_eq!(grade(&ledger(&["x", "e", "b"]), &key), 3);
        assert_eq!(grade(&ledger(&["x", "E", "A"]), &key), 2);
        // the same letter twice is credited once
        assert_eq!(grade(&ledger(&["x", "B", "B"]), &key), 2);
        assert_eq!(grade(&ledger(&["x", "", ""]), &key), 1);
    }

    #[test]
    fn grading_is_deterministic_and_slot_order_free() {
        let key = AnswerKey::from_answers(["a", "b", "c", "d"]).unwrap();
        let answers = ledger(&["a", "x", "c", "d"]);
        let first = grade(&answers, &key);
        assert_eq!(first, grade(&answers, &key));

        // reversing both sides preserves the count
        let rev_key = AnswerKey::from_answers(["d", "c", "b", "a"]).unwrap();
        let rev_answers = ledger(&["d", "c", "x", "a"]);
        assert_eq!(first, grade(&rev_answers, &rev_key));
    }

    #[test]
    fn shorter_ledger_counts_missing_as_blank() {
        let key = AnswerKey::from_answers(["a", "b"]).unwrap();
        assert_eq!(grade(&ledger(&["a"]), &key), 1);
    }
}
