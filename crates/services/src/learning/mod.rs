mod engine;

pub use engine::LearningEngine;

use flag_core::model::{LearningCard, LearningStats, LearningStatus};

/// Read-only view of a review batch, published after every change.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LearningSnapshot {
    pub status: LearningStatus,
    /// The batch captured when it was loaded; never re-queried mid-batch.
    pub due_cards: Vec<LearningCard>,
    pub current_index: usize,
    pub is_revealed: bool,
    pub stats: Option<LearningStats>,
    pub tally: ReviewTally,
    pub error: Option<String>,
}

impl LearningSnapshot {
    #[must_use]
    pub fn current_card(&self) -> Option<&LearningCard> {
        if self.status == LearningStatus::Reviewing {
            self.due_cards.get(self.current_index)
        } else {
            None
        }
    }

    #[must_use]
    pub fn progress(&self) -> BatchProgress {
        BatchProgress {
            position: self.current_index,
            total: self.due_cards.len(),
        }
    }
}

/// Grades submitted in the current batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReviewTally {
    pub reviewed: u32,
    pub correct: u32,
}

impl ReviewTally {
    #[must_use]
    pub fn incorrect(&self) -> u32 {
        self.reviewed - self.correct
    }

    fn record(&mut self, is_correct: bool) {
        self.reviewed += 1;
        if is_correct {
            self.correct += 1;
        }
    }
}

/// Cards graded so far out of the batch size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchProgress {
    pub position: usize,
    pub total: usize,
}

impl BatchProgress {
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.total > 0 && self.position >= self.total
    }
}
