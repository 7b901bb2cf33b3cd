//! Band conversion: raw scores to the stepped 2.0–9.0 scale, the word-count
//! writing estimate and the overall average.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

//
// ─── BAND ──────────────────────────────────────────────────────────────────────
//

/// A band score held in tenths so averaging and rounding stay exact.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Band(u16);

impl Band {
    pub const ZERO: Band = Band(0);
    pub const FLOOR: Band = Band(20);
    pub const MAX: Band = Band(90);

    /// # Panics
    ///
    /// Panics if `tenths` is above 9.0.
    #[must_use]
    pub const fn from_tenths(tenths: u16) -> Self {
        assert!(tenths <= 90, "band cannot exceed 9.0");
        Self(tenths)
    }

    #[must_use]
    pub fn tenths(self) -> u16 {
        self.0
    }

    #[must_use]
    pub fn value(self) -> f64 {
        f64::from(self.0) / 10.0
    }
}

impl fmt::Display for Band {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.0 / 10, self.0 % 10)
    }
}

impl fmt::Debug for Band {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Band({self})")
    }
}

impl Serialize for Band {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.value())
    }
}

impl<'de> Deserialize<'de> for Band {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = f64::deserialize(deserializer)?;
        if !raw.is_finite() || !(0.0..=9.0).contains(&raw) {
            return Err(serde::de::Error::custom(format!(
                "band must be within 0.0..=9.0, got {raw}"
            )));
        }
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let tenths = (raw * 10.0).round() as u16;
        Ok(Band(tenths))
    }
}

//
// ─── OBJECTIVE SECTIONS ────────────────────────────────────────────────────────
//

/// How a raw score of zero is banded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ZeroScorePolicy {
    /// Zero correct answers still receives the 2.0 floor.
    #[default]
    Floor,
    /// Zero correct answers is reported as band 0.0.
    Zero,
}

/// Minimum percentage → band (tenths), highest first.
const BAND_TABLE: [(u64, u16); 14] = [
    (90, 90),
    (85, 85),
    (80, 80),
    (75, 75),
    (70, 70),
    (65, 65),
    (60, 60),
    (55, 55),
    (50, 50),
    (45, 45),
    (40, 40),
    (35, 35),
    (30, 30),
    (25, 25),
];

/// Band for `raw` correct out of `total`, with the 2.0 floor for every score
/// below 25 % including zero.
#[must_use]
pub fn to_band(raw: u32, total: u32) -> Band {
    to_band_with(raw, total, ZeroScorePolicy::Floor)
}

/// Step-function lookup against [`BAND_TABLE`]. Percentages are compared as
/// `raw * 100 >= threshold * total` so no float rounding touches a breakpoint.
#[must_use]
pub fn to_band_with(raw: u32, total: u32, zero: ZeroScorePolicy) -> Band {
    if raw == 0 && zero == ZeroScorePolicy::Zero {
        return Band::ZERO;
    }
    if total == 0 {
        return Band::FLOOR;
    }
    let scaled = u64::from(raw.min(total)) * 100;
    let total = u64::from(total);
    BAND_TABLE
        .iter()
        .find(|(threshold, _)| scaled >= threshold * total)
        .map_or(Band::FLOOR, |&(_, tenths)| Band(tenths))
}

/// Integer percentage, rounded half-up. Zero when `total` is zero.
#[must_use]
pub fn percentage(raw: u32, total: u32) -> u32 {
    if total == 0 {
        return 0;
    }
    let raw = u64::from(raw.min(total));
    let total = u64::from(total);
    let pct = (raw * 200 + total) / (2 * total);
    u32::try_from(pct).unwrap_or(100)
}

//
// ─── WRITING ESTIMATE ──────────────────────────────────────────────────────────
//

/// Number of non-empty whitespace-separated tokens.
#[must_use]
pub fn word_count(text: &str) -> u32 {
    u32::try_from(text.split_whitespace().count()).unwrap_or(u32::MAX)
}

/// One step of the writing scale: every task exceeding its minimum by at
/// least `surplus` words earns `band`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WritingTier {
    pub surplus: u32,
    pub band: Band,
}

/// Word-count proxy for a writing band. This is deliberately crude: it
/// measures length against each task's minimum and nothing else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WritingScale {
    below_minimum: Band,
    tiers: Vec<WritingTier>,
}

impl WritingScale {
    /// Tiers may be given in any order; they are kept highest surplus first.
    #[must_use]
    pub fn new(below_minimum: Band, mut tiers: Vec<WritingTier>) -> Self {
        tiers.sort_by(|a, b| b.surplus.cmp(&a.surplus));
        Self {
            below_minimum,
            tiers,
        }
    }

    #[must_use]
    pub fn below_minimum(&self) -> Band {
        self.below_minimum
    }

    #[must_use]
    pub fn tiers(&self) -> &[WritingTier] {
        &self.tiers
    }

    /// Estimate from `(words, min_words)` per task.
    ///
    /// Any task short of its minimum, or no tasks at all, yields the fixed low
    /// band. Otherwise the weakest task's surplus selects the tier.
    #[must_use]
    pub fn estimate(&self, tasks: &[(u32, u32)]) -> Band {
        let surplus = tasks
            .iter()
            .map(|&(words, min)| words.checked_sub(min))
            .try_fold(u32::MAX, |acc, s| s.map(|s| acc.min(s)));

        match surplus {
            Some(surplus) if !tasks.is_empty() => self
                .tiers
                .iter()
                .find(|tier| surplus >= tier.surplus)
                .map_or(self.below_minimum, |tier| tier.band),
            _ => self.below_minimum,
        }
    }
}

impl Default for WritingScale {
    fn default() -> Self {
        Self::new(
            Band::from_tenths(45),
            vec![
                WritingTier {
                    surplus: 0,
                    band: Band::from_tenths(60),
                },
                WritingTier {
                    surplus: 50,
                    band: Band::from_tenths(65),
                },
                WritingTier {
                    surplus: 100,
                    band: Band::from_tenths(70),
                },
                WritingTier {
                    surplus: 150,
                    band: Band::from_tenths(75),
                },
            ],
        )
    }
}

//
// ─── OVERALL ───────────────────────────────────────────────────────────────────
//

/// Mean of `bands` rounded half-up to the nearest 0.1; `None` when empty.
#[must_use]
pub fn overall_band(bands: &[Band]) -> Option<Band> {
    if bands.is_empty() {
        return None;
    }
    let sum: u64 = bands.iter().map(|b| u64::from(b.0)).sum();
    let count = bands.len() as u64;
    let tenths = (2 * sum + count) / (2 * count);
    Some(Band(u16::try_from(tenths).unwrap_or(90).min(90)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_breakpoints_are_exact() {
        assert_eq!(to_band(36, 40), Band::from_tenths(90));
        assert_eq!(to_band(34, 40), Band::from_tenths(85));
        assert_eq!(to_band(30, 40), Band::from_tenths(75));
        assert_eq!(to_band(10, 40), Band::from_tenths(25));
        assert_eq!(to_band(9, 40), Band::FLOOR);
        assert_eq!(to_band(40, 40), Band::MAX);
    }

    #[test]
    fn just_below_a_threshold_drops_a_step() {
        // 26/40 = 65 %, 25/40 = 62.5 %
        assert_eq!(to_band(26, 40), Band::from_tenths(65));
        assert_eq!(to_band(25, 40), Band::from_tenths(60));
        // 89.9 % is not 90
        assert_eq!(to_band(899, 1000), Band::from_tenths(85));
    }

    #[test]
    fn zero_score_follows_policy() {
        assert_eq!(to_band_with(0, 40, ZeroScorePolicy::Floor), Band::FLOOR);
        assert_eq!(to_band_with(0, 40, ZeroScorePolicy::Zero), Band::ZERO);
        assert_eq!(to_band_with(1, 40, ZeroScorePolicy::Zero), Band::FLOOR);
    }

    #[test]
    fn percentage_rounds_half_up() {
        assert_eq!(percentage(30, 40), 75);
        assert_eq!(percentage(1, 8), 13);
        assert_eq!(percentage(2, 3), 67);
        assert_eq!(percentage(3, 0), 0);
    }

    #[test]
    fn word_count_ignores_extra_whitespace() {
        assert_eq!(word_count(""), 0);
        assert_eq!(word_count("   \n\t "), 0);
        assert_eq!(word_count("  one  two\nthree\tfour "), 4);
    }

    #[test]
    fn writing_scale_uses_weakest_task() {
        let scale = WritingScale::default();
        assert_eq!(scale.estimate(&[(150, 150), (250, 250)]), Band::from_tenths(60));
        assert_eq!(scale.estimate(&[(260, 150), (300, 250)]), Band::from_tenths(65));
        assert_eq!(scale.estimate(&[(400, 150), (420, 250)]), Band::from_tenths(75));
        assert_eq!(scale.estimate(&[(149, 150), (900, 250)]), Band::from_tenths(45));
        assert_eq!(scale.estimate(&[]), Band::from_tenths(45));
    }

    #[test]
    fn overall_rounds_to_nearest_tenth() {
        let bands = [
            Band::from_tenths(90),
            Band::from_tenths(75),
            Band::from_tenths(60),
        ];
        assert_eq!(overall_band(&bands), Some(Band::from_tenths(75)));

        // (6.5 + 7.0 + 7.0) / 3 = 6.833.. -> 6.8
        let bands = [
            Band::from_tenths(65),
            Band::from_tenths(70),
            Band::from_tenths(70),
        ];
        assert_eq!(overall_band(&bands), Some(Band::from_tenths(68)));
        assert_eq!(overall_band(&[]), None);
    }

    #[test]
    fn band_serializes_as_decimal() {
        let json = serde_json::to_string(&Band::from_tenths(75)).unwrap();
        assert_eq!(json, "7.5");
        let back: Band = serde_json::from_str("6.5").unwrap();
        assert_eq!(back, Band::from_tenths(65));
        assert!(serde_json::from_str::<Band>("9.5").is_err());
    }
}
