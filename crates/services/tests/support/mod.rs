#![allow(dead_code)]

use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;

use flag_core::model::{
    BoxNumber, CountryId, LearningCard, LearningStats, Question, QuestionId, QuizProgress,
    SessionId,
};
use services::api::{
    AnswerVerdict, DueCards, FinishOutcome, NextQuestion, SessionStarted, SkipOutcome,
};
use services::{ApiError, SessionApi};

/// Every call the engines made, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    CreateSession,
    NextQuestion(SessionId),
    CheckAnswer(String),
    Skip,
    Finish(u32),
    DueCards(u32),
    AddNewCards(u32),
    SubmitReview(CountryId, bool),
    Stats,
}

/// Scripted replies. `Err(message)` replies become `ApiError::Rejected`.
pub struct Script {
    pub calls: Vec<Call>,
    pub start: Result<SessionId, String>,
    pub questions: VecDeque<Result<NextQuestion, String>>,
    /// Lowercased answers the fake accepts.
    pub accepted: HashSet<String>,
    pub correct_answer: String,
    pub score_after_correct: i64,
    pub check_delay: Duration,
    pub check_fails: bool,
    pub skips: VecDeque<Result<SkipOutcome, String>>,
    pub skip_delay: Duration,
    pub finish: Result<FinishOutcome, String>,
    pub due: VecDeque<Result<DueCards, String>>,
    pub add_fails: bool,
    pub review_fails: bool,
    pub stats: Result<LearningStats, String>,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            calls: Vec::new(),
            start: Ok(SessionId::new(1)),
            questions: VecDeque::new(),
            accepted: HashSet::new(),
            correct_answer: "France".into(),
            score_after_correct: 10,
            check_delay: Duration::ZERO,
            check_fails: false,
            skips: VecDeque::new(),
            skip_delay: Duration::ZERO,
            finish: Ok(FinishOutcome {
                final_score: 0,
                countries_viewed: 0,
            }),
            due: VecDeque::new(),
            add_fails: false,
            review_fails: false,
            stats: Ok(LearningStats::default()),
        }
    }
}

#[derive(Clone, Default)]
pub struct FakeApi {
    script: Arc<Mutex<Script>>,
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.script().calls.clone()
    }

    pub fn checks(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::CheckAnswer(answer) => Some(answer),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, wanted: fn(&Call) -> bool) -> usize {
        self.calls().iter().filter(|call| wanted(call)).count()
    }

    fn record(&self, call: Call) {
        self.script().calls.push(call);
    }
}

fn rejected(message: String) -> ApiError {
    ApiError::Rejected(message)
}

#[async_trait]
impl SessionApi for FakeApi {
    async fn create_session(&self) -> Result<SessionStarted, ApiError> {
        self.record(Call::CreateSession);
        let start = self.script().start.clone();
        start.map(|id| SessionStarted { id }).map_err(rejected)
    }

    async fn next_question(&self, session: SessionId) -> Result<NextQuestion, ApiError> {
        self.record(Call::NextQuestion(session));
        let next = self.script().questions.pop_front();
        next.unwrap_or_else(|| Ok(exhausted(0, 0, 0))).map_err(rejected)
    }

    async fn check_answer(
        &self,
        _session: SessionId,
        answer: &str,
    ) -> Result<AnswerVerdict, ApiError> {
        self.record(Call::CheckAnswer(answer.to_owned()));
        let delay = self.script().check_delay;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        let script = self.script();
        if script.check_fails {
            return Err(rejected("check unavailable".into()));
        }
        let correct = script.accepted.contains(&answer.to_lowercase());
        Ok(AnswerVerdict {
            correct,
            correct_answer: script.correct_answer.clone(),
            score: if correct { script.score_after_correct } else { 0 },
        })
    }

    async fn skip_question(&self, _session: SessionId) -> Result<SkipOutcome, ApiError> {
        self.record(Call::Skip);
        let delay = self.script().skip_delay;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        let skip = self.script().skips.pop_front();
        skip.unwrap_or_else(|| Err("no skips remaining".into()))
            .map_err(rejected)
    }

    async fn finish_session(
        &self,
        _session: SessionId,
        time_elapsed_seconds: u32,
    ) -> Result<FinishOutcome, ApiError> {
        self.record(Call::Finish(time_elapsed_seconds));
        self.script().finish.clone().map_err(rejected)
    }

    async fn due_cards(&self, limit: u32) -> Result<DueCards, ApiError> {
        self.record(Call::DueCards(limit));
        let due = self.script().due.pop_front();
        due.unwrap_or_else(|| Ok(DueCards { count: 0, cards: Vec::new() }))
            .map_err(rejected)
    }

    async fn add_new_cards(&self, limit: u32) -> Result<(), ApiError> {
        self.record(Call::AddNewCards(limit));
        if self.script().add_fails {
            return Err(rejected("pool is full".into()));
        }
        Ok(())
    }

    async fn submit_review(&self, country: CountryId, is_correct: bool) -> Result<(), ApiError> {
        self.record(Call::SubmitReview(country, is_correct));
        if self.script().review_fails {
            return Err(rejected("review not saved".into()));
        }
        Ok(())
    }

    async fn learning_stats(&self) -> Result<LearningStats, ApiError> {
        self.record(Call::Stats);
        self.script().stats.clone().map_err(rejected)
    }
}

pub fn question(id: u64, score: i64, skips_remaining: u32, countries_viewed: u32) -> NextQuestion {
    NextQuestion::Question {
        question: Question {
            id: QuestionId::new(id),
            flag_image_url: format!("https://flags.example/{id}.png"),
            flag_emoji: None,
            code: format!("C{id}"),
        },
        progress: QuizProgress {
            score,
            skips_remaining,
            countries_viewed,
        },
        total_countries: Some(195),
    }
}

pub fn exhausted(final_score: i64, countries_viewed: u32, total: u32) -> NextQuestion {
    NextQuestion::Exhausted {
        final_score,
        countries_viewed,
        total_countries: Some(total),
    }
}

pub fn card(id: u64) -> LearningCard {
    LearningCard {
        country: CountryId::new(id),
        box_number: BoxNumber::new(1).unwrap(),
        accuracy_rate: 0.0,
        flag_image_url: format!("https://flags.example/{id}.png"),
        country_name: format!("Country {id}"),
        country_code: format!("C{id}"),
        flag_emoji: String::new(),
    }
}

pub fn due(ids: &[u64]) -> DueCards {
    DueCards {
        count: ids.len() as u32,
        cards: ids.iter().copied().map(card).collect(),
    }
}

pub fn api(fake: &FakeApi) -> Arc<dyn SessionApi> {
    Arc::new(fake.clone())
}
