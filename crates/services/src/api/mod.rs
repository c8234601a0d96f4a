//! Contract with the remote session service.
//!
//! The engines depend only on `SessionApi`; `HttpSessionApi` is the REST/JSON
//! binding used in the reference deployment.

mod http;
mod wire;

use async_trait::async_trait;

use flag_core::model::{
    CountryId, LearningCard, LearningStats, Question, QuizProgress, SessionId,
};

use crate::error::ApiError;

pub use http::{ApiConfig, HttpSessionApi};

/// A freshly created quiz session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionStarted {
    pub id: SessionId,
}

/// Either the next unseen flag or notice that every flag has been shown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextQuestion {
    Question {
        question: Question,
        progress: QuizProgress,
        total_countries: Option<u32>,
    },
    Exhausted {
        final_score: i64,
        countries_viewed: u32,
        total_countries: Option<u32>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerVerdict {
    pub correct: bool,
    pub correct_answer: String,
    pub score: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SkipOutcome {
    pub skips_remaining: u32,
    pub score: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FinishOutcome {
    pub final_score: i64,
    pub countries_viewed: u32,
}

/// A batch of due cards. `count` is what the service reports, which may
/// disagree with `cards.len()` on a misbehaving server.
#[derive(Debug, Clone, PartialEq)]
pub struct DueCards {
    pub count: u32,
    pub cards: Vec<LearningCard>,
}

impl DueCards {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.count == 0 || self.cards.is_empty()
    }
}

/// Remote session service consumed by both engines.
///
/// Every call may suspend; none of them retry.
#[async_trait]
pub trait SessionApi: Send + Sync {
    async fn create_session(&self) -> Result<SessionStarted, ApiError>;

    async fn next_question(&self, session: SessionId) -> Result<NextQuestion, ApiError>;

    async fn check_answer(
        &self,
        session: SessionId,
        answer: &str,
    ) -> Result<AnswerVerdict, ApiError>;

    async fn skip_question(&self, session: SessionId) -> Result<SkipOutcome, ApiError>;

    async fn finish_session(
        &self,
        session: SessionId,
        time_elapsed_seconds: u32,
    ) -> Result<FinishOutcome, ApiError>;

    async fn due_cards(&self, limit: u32) -> Result<DueCards, ApiError>;

    async fn add_new_cards(&self, limit: u32) -> Result<(), ApiError>;

    async fn submit_review(&self, country: CountryId, is_correct: bool) -> Result<(), ApiError>;

    async fn learning_stats(&self) -> Result<LearningStats, ApiError>;
}
