use std::time::Duration;

use flag_core::answer::MIN_ANSWER_LEN;

/// Pacing and budget knobs for `QuizEngine`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuizConfig {
    /// Quiet period after the last qualifying keystroke before a check is sent.
    pub debounce: Duration,
    /// How long a correct verdict stays on screen before the next flag loads.
    pub feedback_delay: Duration,
    /// Elapsed-time tick.
    pub tick: Duration,
    pub min_answer_len: usize,
    /// Skip budget assumed until the first response says otherwise.
    pub initial_skips: u32,
}

impl Default for QuizConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(400),
            feedback_delay: Duration::from_millis(1_000),
            tick: Duration::from_secs(1),
            min_answer_len: MIN_ANSWER_LEN,
            initial_skips: 3,
        }
    }
}

impl QuizConfig {
    #[must_use]
    pub fn with_initial_skips(mut self, skips: u32) -> Self {
        self.initial_skips = skips;
        self
    }
}

/// Batch sizing for `LearningEngine`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LearningConfig {
    pub batch_size: u32,
    pub default_new_cards: u32,
}

impl Default for LearningConfig {
    fn default() -> Self {
        Self {
            batch_size: 10,
            default_new_cards: 10,
        }
    }
}

