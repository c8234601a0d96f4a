use chrono::{DateTime, Utc};

use flag_core::Elapsed;
use flag_core::answer::AnswerGate;
use flag_core::model::{
    Feedback, GameOverSummary, Question, QuestionId, QuizProgress, QuizStatus, SessionId,
};

use crate::config::QuizConfig;
use crate::timer::TaskHandle;

/// Read-only view of a quiz play-through, published after every change.
#[derive(Debug, Clone, PartialEq)]
pub struct QuizSnapshot {
    pub status: QuizStatus,
    pub session_id: Option<SessionId>,
    pub current_question: Option<Question>,
    pub score: i64,
    pub skips_remaining: u32,
    pub countries_viewed: u32,
    pub total_countries: Option<u32>,
    pub user_answer: String,
    pub feedback: Option<Feedback>,
    pub elapsed: Elapsed,
    /// Last user-visible error, cleared by the next explicit action.
    pub error: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    /// A debounced check is waiting for its quiet period to elapse.
    pub check_pending: bool,
}

impl QuizSnapshot {
    /// Final figures once the game is over.
    #[must_use]
    pub fn summary(&self) -> Option<GameOverSummary> {
        (self.status == QuizStatus::GameOver).then(|| GameOverSummary {
            final_score: self.score,
            countries_viewed: self.countries_viewed,
            total_countries: self.total_countries,
            elapsed: self.elapsed,
        })
    }
}

/// Identity a piece of deferred work was scheduled against.
///
/// Work whose ticket no longer matches the state is discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct Ticket {
    pub session: SessionId,
    pub question: QuestionId,
    pub generation: u64,
}

pub(super) struct QuizState {
    pub status: QuizStatus,
    pub session_id: Option<SessionId>,
    pub question: Option<Question>,
    pub progress: QuizProgress,
    pub total_countries: Option<u32>,
    pub user_answer: String,
    pub feedback: Option<Feedback>,
    pub elapsed: Elapsed,
    pub error: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub gate: AnswerGate,
    /// Bumped whenever the question in scope is invalidated.
    pub generation: u64,
    pub debounce: TaskHandle,
    pub advance: TaskHandle,
    pub ticker: TaskHandle,
}

impl QuizState {
    pub fn new(config: &QuizConfig) -> Self {
        Self {
            status: QuizStatus::Idle,
            session_id: None,
            question: None,
            progress: QuizProgress {
                score: 0,
                skips_remaining: config.initial_skips,
                countries_viewed: 0,
            },
            total_countries: None,
            user_answer: String::new(),
            feedback: None,
            elapsed: Elapsed::ZERO,
            error: None,
            started_at: None,
            ended_at: None,
            gate: AnswerGate::new(config.min_answer_len),
            generation: 0,
            debounce: TaskHandle::idle(),
            advance: TaskHandle::idle(),
            ticker: TaskHandle::idle(),
        }
    }

    /// Back to a fresh state, keeping the generation moving forward so
    /// anything still in flight is recognised as stale.
    pub fn reset(&mut self, config: &QuizConfig) {
        let generation = self.generation + 1;
        let status = self.status;
        *self = Self::new(config);
        self.status = status;
        self.generation = generation;
    }

    pub fn snapshot(&self) -> QuizSnapshot {
        QuizSnapshot {
            status: self.status,
            session_id: self.session_id,
            current_question: self.question.clone(),
            score: self.progress.score,
            skips_remaining: self.progress.skips_remaining,
            countries_viewed: self.progress.countries_viewed,
            total_countries: self.total_countries,
            user_answer: self.user_answer.clone(),
            feedback: self.feedback.clone(),
            elapsed: self.elapsed,
            error: self.error.clone(),
            started_at: self.started_at,
            ended_at: self.ended_at,
            check_pending: self.debounce.is_pending(),
        }
    }

    pub fn ticket(&self) -> Option<Ticket> {
        Some(Ticket {
            session: self.session_id?,
            question: self.question.as_ref()?.id,
            generation: self.generation,
        })
    }

    pub fn is_current(&self, ticket: Ticket) -> bool {
        self.status.is_playing() && self.ticket() == Some(ticket)
    }

    /// Drop everything tied to the question on screen: pending check,
    /// pending auto-advance, dedupe marker, answer buffer, feedback.
    pub fn invalidate_question(&mut self) {
        self.debounce.cancel();
        self.advance.cancel();
        self.gate.clear();
        self.user_answer.clear();
        self.feedback = None;
        self.generation += 1;
    }

    /// Stop checks for the question on screen from going out or landing,
    /// leaving the answer buffer and dedupe marker in place.
    pub fn withdraw_checks(&mut self) {
        self.debounce.cancel();
        self.generation += 1;
    }

    /// Freeze the clock and tear down every timer.
    pub fn enter_game_over(&mut self, now: DateTime<Utc>) {
        self.invalidate_question();
        self.ticker.cancel();
        self.question = None;
        self.ended_at = Some(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(id: u64) -> Question {
        Question {
            id: QuestionId::new(id),
            flag_image_url: format!("https://flags/{id}.png"),
            flag_emoji: None,
            code: "XX".into(),
        }
    }

    #[test]
    fn ticket_needs_session_and_question() {
        let mut state = QuizState::new(&QuizConfig::default());
        assert_eq!(state.ticket(), None);

        state.session_id = Some(SessionId::new(1));
        assert_eq!(state.ticket(), None);

        state.question = Some(question(9));
        state.status = QuizStatus::Playing;
        let ticket = state.ticket().unwrap();
        assert!(state.is_current(ticket));

        state.invalidate_question();
        assert!(!state.is_current(ticket));
    }

    #[test]
    fn withdrawn_checks_keep_the_typed_answer() {
        let mut state = QuizState::new(&QuizConfig::default());
        state.session_id = Some(SessionId::new(1));
        state.question = Some(question(3));
        state.status = QuizStatus::Playing;
        state.user_answer = "Japan".into();
        state.gate.mark_checked("japan");
        let ticket = state.ticket().unwrap();

        state.withdraw_checks();
        assert!(!state.is_current(ticket));
        assert_eq!(state.user_answer, "Japan");
        assert_eq!(state.gate.last_checked(), Some("japan"));
    }

    #[test]
    fn reset_keeps_generation_moving() {
        let config = QuizConfig::default().with_initial_skips(5);
        let mut state = QuizState::new(&config);
        state.generation = 4;
        state.progress.score = 99;
        state.elapsed = Elapsed::from_secs(30);

        state.reset(&config);
        assert_eq!(state.generation, 5);
        assert_eq!(state.progress.score, 0);
        assert_eq!(state.progress.skips_remaining, 5);
        assert_eq!(state.elapsed, Elapsed::ZERO);
    }

    #[test]
    fn summary_only_after_game_over() {
        let mut state = QuizState::new(&QuizConfig::default());
        state.progress.score = 12;
        assert_eq!(state.snapshot().summary(), None);

        state.status = QuizStatus::GameOver;
        let summary = state.snapshot().summary().unwrap();
        assert_eq!(summary.final_score, 12);
    }
}
