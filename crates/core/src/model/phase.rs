//! Session phases and their legal transitions.
//!
//! Each engine owns one phase value and moves it only through `apply`, so a
//! call arriving in the wrong phase is rejected in one place.

use std::fmt;

use thiserror::Error;

//
// ─── ERRORS ───────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum TransitionError {
    #[error("quiz cannot handle {event:?} while {from}")]
    Quiz { from: QuizStatus, event: QuizEvent },

    #[error("learning session cannot handle {event:?} while {from}")]
    Learning {
        from: LearningStatus,
        event: LearningEvent,
    },
}

//
// ─── QUIZ ─────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QuizStatus {
    #[default]
    Idle,
    Loading,
    Playing,
    GameOver,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuizEvent {
    Start,
    /// Session creation or the first fetch failed.
    StartFailed,
    QuestionReceived,
    UniverseExhausted,
    /// Keystroke-driven answer input; only meaningful while playing.
    AnswerInput,
    /// Explicit request for the next flag (e.g. after a failed auto-advance).
    Advance,
    Skip,
    GiveUp,
    Restart,
}

impl QuizStatus {
    /// Apply `event`, returning the next phase.
    ///
    /// # Errors
    ///
    /// Returns `TransitionError::Quiz` when the event is not legal in this phase.
    pub fn apply(self, event: QuizEvent) -> Result<Self, TransitionError> {
        use QuizEvent as E;
        use QuizStatus as S;

        match (self, event) {
            (S::Idle, E::Start) => Ok(S::Loading),
            (S::Loading, E::StartFailed) => Ok(S::Idle),
            (S::Loading | S::Playing, E::QuestionReceived) => Ok(S::Playing),
            (S::Loading | S::Playing, E::UniverseExhausted) => Ok(S::GameOver),
            (S::Playing, E::AnswerInput | E::Advance | E::Skip) => Ok(S::Playing),
            (S::Playing, E::GiveUp) => Ok(S::GameOver),
            (S::GameOver, E::Restart) => Ok(S::Idle),
            (from, event) => Err(TransitionError::Quiz { from, event }),
        }
    }

    #[must_use]
    pub fn is_playing(self) -> bool {
        matches!(self, Self::Playing)
    }
}

impl fmt::Display for QuizStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Idle => "idle",
            Self::Loading => "loading",
            Self::Playing => "playing",
            Self::GameOver => "game over",
        };
        f.write_str(label)
    }
}

//
// ─── LEARNING ─────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LearningStatus {
    #[default]
    Idle,
    Loading,
    Reviewing,
    NoCards,
    Complete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LearningEvent {
    Start,
    AddCards,
    CardsReceived,
    NoneDue,
    /// The fetch failed; go back to the phase the load was started from.
    LoadFailed { resume: LearningStatus },
    Reveal,
    Grade,
    LastCardGraded,
    Restart,
}

impl LearningStatus {
    /// Apply `event`, returning the next phase.
    ///
    /// # Errors
    ///
    /// Returns `TransitionError::Learning` when the event is not legal in this phase.
    pub fn apply(self, event: LearningEvent) -> Result<Self, TransitionError> {
        use LearningEvent as E;
        use LearningStatus as S;

        match (self, event) {
            (S::Idle, E::Start) => Ok(S::Loading),
            (S::Idle | S::NoCards, E::AddCards) => Ok(S::Loading),
            (S::Loading, E::CardsReceived) => Ok(S::Reviewing),
            (S::Loading, E::NoneDue) => Ok(S::NoCards),
            (S::Loading, E::LoadFailed { resume }) if matches!(resume, S::Idle | S::NoCards) => {
                Ok(resume)
            }
            (S::Reviewing, E::Reveal | E::Grade) => Ok(S::Reviewing),
            (S::Reviewing, E::LastCardGraded) => Ok(S::Complete),
            (S::Complete | S::NoCards, E::Restart) => Ok(S::Idle),
            (from, event) => Err(TransitionError::Learning { from, event }),
        }
    }
}

impl fmt::Display for LearningStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Idle => "idle",
            Self::Loading => "loading",
            Self::Reviewing => "reviewing",
            Self::NoCards => "no cards due",
            Self::Complete => "complete",
        };
        f.write_str(label)
    }
}
