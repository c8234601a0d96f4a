mod engine;
mod state;

pub use engine::QuizEngine;
pub use state::QuizSnapshot;

/// What happened to one keystroke's worth of input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerCheck {
    /// A check will be sent once input has been quiet for the debounce period.
    Scheduled,
    TooShort,
    /// Same value as the last one sent; nothing scheduled.
    Unchanged,
    /// A correct verdict is on screen and the next flag is about to load.
    AwaitingNext,
}
