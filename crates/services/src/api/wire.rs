//! JSON bodies exchanged with the reference REST deployment.

use serde::{Deserialize, Serialize};

use flag_core::model::{CountryId, LearningCard, Question, QuestionId, QuizProgress, SessionId};

use super::{AnswerVerdict, DueCards, FinishOutcome, NextQuestion, SessionStarted, SkipOutcome};

#[derive(Debug, Serialize)]
pub(crate) struct StartRequest {
    pub game_mode: &'static str,
}

#[derive(Debug, Serialize)]
pub(crate) struct AnswerRequest<'a> {
    pub answer: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct FinishRequest {
    pub time_elapsed_seconds: u32,
}

#[derive(Debug, Serialize)]
pub(crate) struct LimitRequest {
    pub limit: u32,
}

#[derive(Debug, Serialize)]
pub(crate) struct ReviewRequest {
    pub country_id: CountryId,
    pub is_correct: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StartResponse {
    id: SessionId,
}

impl From<StartResponse> for SessionStarted {
    fn from(body: StartResponse) -> Self {
        Self { id: body.id }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum QuestionResponse {
    Completed(CompletedBody),
    Question(QuestionBody),
}

#[derive(Debug, Deserialize)]
pub(crate) struct CompletedBody {
    game_completed: bool,
    final_score: i64,
    countries_viewed: u32,
    #[serde(default)]
    total_countries: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct QuestionBody {
    id: QuestionId,
    flag_image_url: String,
    #[serde(default)]
    flag_emoji: Option<String>,
    code: String,
    score: i64,
    skips_remaining: u32,
    countries_viewed: u32,
    #[serde(default)]
    total_countries: Option<u32>,
}

impl QuestionResponse {
    /// `None` when the body claims completion with `game_completed: false`.
    pub(crate) fn into_next(self) -> Option<NextQuestion> {
        match self {
            QuestionResponse::Completed(body) if body.game_completed => {
                Some(NextQuestion::Exhausted {
                    final_score: body.final_score,
                    countries_viewed: body.countries_viewed,
                    total_countries: body.total_countries,
                })
            }
            QuestionResponse::Completed(_) => None,
            QuestionResponse::Question(body) => Some(NextQuestion::Question {
                question: Question {
                    id: body.id,
                    flag_image_url: body.flag_image_url,
                    flag_emoji: body.flag_emoji,
                    code: body.code,
                },
                progress: QuizProgress {
                    score: body.score,
                    skips_remaining: body.skips_remaining,
                    countries_viewed: body.countries_viewed,
                },
                total_countries: body.total_countries,
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct AnswerResponse {
    correct: bool,
    #[serde(default)]
    correct_answer: String,
    score: i64,
}

impl From<AnswerResponse> for AnswerVerdict {
    fn from(body: AnswerResponse) -> Self {
        Self {
            correct: body.correct,
            correct_answer: body.correct_answer,
            score: body.score,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct SkipResponse {
    skips_remaining: u32,
    score: i64,
}

impl From<SkipResponse> for SkipOutcome {
    fn from(body: SkipResponse) -> Self {
        Self {
            skips_remaining: body.skips_remaining,
            score: body.score,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct FinishResponse {
    stats: FinishStats,
}

#[derive(Debug, Deserialize)]
struct FinishStats {
    final_score: i64,
    countries_viewed: u32,
}

impl From<FinishResponse> for FinishOutcome {
    fn from(body: FinishResponse) -> Self {
        Self {
            final_score: body.stats.final_score,
            countries_viewed: body.stats.countries_viewed,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct DueResponse {
    count: u32,
    #[serde(default)]
    due_flags: Vec<LearningCard>,
}

impl From<DueResponse> for DueCards {
    fn from(body: DueResponse) -> Self {
        Self {
            count: body.count,
            cards: body.due_flags,
        }
    }
}

/// Error payloads come as `{"error": ...}` from the game views and `{"detail": ...}` from auth.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    detail: Option<String>,
}

impl ErrorBody {
    pub(crate) fn into_message(self) -> Option<String> {
        self.error.or(self.detail)
    }
}
