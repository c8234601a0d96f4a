use crate::time::Elapsed;

/// Verdict printed on the game-over screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Performance {
    AllCompleted,
    Excellent,
    Great,
    KeepPracticing,
}

impl Performance {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Performance::AllCompleted => "Perfect! All Flags Completed!",
            Performance::Excellent => "Excellent!",
            Performance::Great => "Great Job!",
            Performance::KeepPracticing => "Keep Practicing!",
        }
    }
}

/// Final figures of a finished play-through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameOverSummary {
    pub final_score: i64,
    pub countries_viewed: u32,
    pub total_countries: Option<u32>,
    pub elapsed: Elapsed,
}

impl GameOverSummary {
    /// Every country in the universe was shown at least once.
    #[must_use]
    pub fn all_completed(&self) -> bool {
        self.total_countries
            .is_some_and(|total| total > 0 && self.countries_viewed >= total)
    }

    #[must_use]
    pub fn performance(&self) -> Performance {
        if self.all_completed() {
            Performance::AllCompleted
        } else if self.final_score <= 50 {
            Performance::KeepPracticing
        } else if self.final_score >= 100 {
            Performance::Excellent
        } else {
            Performance::Great
        }
    }
}
