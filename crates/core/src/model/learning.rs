use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::CountryId;

//
// ─── ERRORS ───────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CardError {
    #[error("box number must be between 1 and 5, got {0}")]
    InvalidBox(u8),
}

//
// ─── BOX NUMBER ───────────────────────────────────────────────────────────────
//

/// Leitner box a card currently sits in (1 = reviewed most often).
///
/// Assigned by the service; the client only displays it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct BoxNumber(u8);

impl BoxNumber {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    /// # Errors
    ///
    /// Returns `CardError::InvalidBox` outside `1..=5`.
    pub fn new(value: u8) -> Result<Self, CardError> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Ok(Self(value))
        } else {
            Err(CardError::InvalidBox(value))
        }
    }

    #[must_use]
    pub fn value(self) -> u8 {
        self.0
    }

    /// Every box, lowest first.
    pub fn all() -> impl Iterator<Item = BoxNumber> {
        (Self::MIN..=Self::MAX).map(BoxNumber)
    }
}

impl TryFrom<u8> for BoxNumber {
    type Error = CardError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<BoxNumber> for u8 {
    fn from(value: BoxNumber) -> Self {
        value.0
    }
}

//
// ─── LEARNING CARD ────────────────────────────────────────────────────────────
//

/// Read-only snapshot of a due card as returned by the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningCard {
    pub country: CountryId,
    pub box_number: BoxNumber,
    pub accuracy_rate: f64,
    pub flag_image_url: String,
    pub country_name: String,
    pub country_code: String,
    #[serde(default)]
    pub flag_emoji: String,
}

//
// ─── STATS ────────────────────────────────────────────────────────────────────
//

/// Card counts keyed `box_1` .. `box_5`; absent keys count as zero.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BoxDistribution(BTreeMap<String, u32>);

impl BoxDistribution {
    #[must_use]
    pub fn count(&self, box_number: BoxNumber) -> u32 {
        self.0
            .get(&format!("box_{}", box_number.value()))
            .copied()
            .unwrap_or(0)
    }

    /// Counts for boxes 1 through 5, in order.
    #[must_use]
    pub fn counts(&self) -> [u32; 5] {
        let mut out = [0; 5];
        for (slot, box_number) in out.iter_mut().zip(BoxNumber::all()) {
            *slot = self.count(box_number);
        }
        out
    }

    #[must_use]
    pub fn total(&self) -> u32 {
        self.counts().iter().sum()
    }
}

impl FromIterator<(BoxNumber, u32)> for BoxDistribution {
    fn from_iter<I: IntoIterator<Item = (BoxNumber, u32)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(box_number, count)| (format!("box_{}", box_number.value()), count))
                .collect(),
        )
    }
}

/// Aggregate spaced-repetition statistics for the signed-in player.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LearningStats {
    pub due_flags: u32,
    pub total_flags: u32,
    pub average_accuracy: f64,
    #[serde(default)]
    pub box_distribution: BoxDistribution,
}
