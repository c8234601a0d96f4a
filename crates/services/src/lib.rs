#![forbid(unsafe_code)]

pub mod api;
pub mod config;
pub mod error;
pub mod learning;
pub mod quiz;
pub mod timer;

pub use flag_core::Clock;

pub use api::{ApiConfig, HttpSessionApi, SessionApi};
pub use config::{LearningConfig, QuizConfig};
pub use error::{ApiError, LearningError, QuizError};
pub use learning::{BatchProgress, LearningEngine, LearningSnapshot, ReviewTally};
pub use quiz::{AnswerCheck, QuizEngine, QuizSnapshot};
