mod ids;
mod learning;
pub mod phase;
mod question;
mod summary;

pub use ids::{CountryId, ParseIdError, QuestionId, SessionId};
pub use learning::{BoxDistribution, BoxNumber, CardError, LearningCard, LearningStats};
pub use phase::{LearningEvent, LearningStatus, QuizEvent, QuizStatus, TransitionError};
pub use question::{Feedback, Question, QuizProgress};
pub use summary::{GameOverSummary, Performance};
