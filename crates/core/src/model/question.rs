use serde::{Deserialize, Serialize};

use crate::model::ids::QuestionId;

/// The flag currently shown to the player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: QuestionId,
    pub flag_image_url: String,
    #[serde(default)]
    pub flag_emoji: Option<String>,
    pub code: String,
}

/// Verdict shown after an answer check.
///
/// Transient: cleared before the next question is shown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feedback {
    pub correct: bool,
    pub correct_answer: String,
    /// The next question loads on its own once the display delay elapses.
    pub auto_advance: bool,
}

impl Feedback {
    #[must_use]
    pub fn auto_advancing(correct_answer: impl Into<String>) -> Self {
        Self {
            correct: true,
            correct_answer: correct_answer.into(),
            auto_advance: true,
        }
    }
}

/// Counters owned by the remote service, copied verbatim from each response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QuizProgress {
    pub score: i64,
    pub skips_remaining: u32,
    pub countries_viewed: u32,
}
