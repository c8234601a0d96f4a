use std::fmt;
use std::sync::Arc;

use log::{info, warn};
use tokio::sync::watch;

use flag_core::model::{LearningCard, LearningEvent, LearningStats, LearningStatus};

use super::{BatchProgress, LearningSnapshot};
use crate::api::SessionApi;
use crate::config::LearningConfig;
use crate::error::{ApiError, LearningError};

/// Drives one spaced-repetition review batch.
///
/// The service decides which cards are due and where each graded card moves;
/// the engine only walks the batch it was handed and reports grades.
pub struct LearningEngine {
    api: Arc<dyn SessionApi>,
    config: LearningConfig,
    state: LearningSnapshot,
    updates: watch::Sender<LearningSnapshot>,
}

impl LearningEngine {
    #[must_use]
    pub fn new(api: Arc<dyn SessionApi>, config: LearningConfig) -> Self {
        let state = LearningSnapshot::default();
        let (updates, _) = watch::channel(state.clone());
        Self {
            api,
            config,
            state,
            updates,
        }
    }

    #[must_use]
    pub fn config(&self) -> &LearningConfig {
        &self.config
    }

    #[must_use]
    pub fn snapshot(&self) -> &LearningSnapshot {
        &self.state
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<LearningSnapshot> {
        self.updates.subscribe()
    }

    #[must_use]
    pub fn status(&self) -> LearningStatus {
        self.state.status
    }

    #[must_use]
    pub fn current_card(&self) -> Option<&LearningCard> {
        self.state.current_card()
    }

    #[must_use]
    pub fn progress(&self) -> BatchProgress {
        self.state.progress()
    }

    /// Fetch up to `batch_size` due cards and start reviewing them.
    ///
    /// # Errors
    ///
    /// Returns `LearningError::Transition` unless idle, or the service error
    /// (the engine goes back to idle).
    pub async fn start_learning(&mut self) -> Result<&LearningSnapshot, LearningError> {
        let resume = self.state.status;
        self.enter_loading(LearningEvent::Start)?;
        self.load_batch(resume).await?;
        Ok(&self.state)
    }

    /// Enroll `count` more cards into the pool, then load the due batch.
    ///
    /// # Errors
    ///
    /// Returns `LearningError::Transition` unless idle or out of cards, or
    /// the service error (the engine returns to where it was called from).
    pub async fn add_new_cards(&mut self, count: u32) -> Result<&LearningSnapshot, LearningError> {
        let resume = self.state.status;
        self.enter_loading(LearningEvent::AddCards)?;

        if let Err(err) = self.api.add_new_cards(count).await {
            return Err(self.fail_load(resume, err));
        }
        info!("enrolled up to {count} new cards");

        self.load_batch(resume).await?;
        Ok(&self.state)
    }

    /// Show the answer on the current card. Local only.
    ///
    /// # Errors
    ///
    /// Returns `LearningError::Transition` unless reviewing.
    pub fn reveal_answer(&mut self) -> Result<(), LearningError> {
        self.state.status = self.state.status.apply(LearningEvent::Reveal)?;
        self.state.is_revealed = true;
        self.publish();
        Ok(())
    }

    /// Report a self-grade for the current card and move to the next one.
    ///
    /// # Errors
    ///
    /// Rejected locally with `LearningError::NotRevealed` before the answer
    /// is shown, or `LearningError::Transition` unless reviewing. A service
    /// error leaves the card in place so the grade can be resent.
    pub async fn submit_review(&mut self, is_correct: bool) -> Result<&LearningSnapshot, LearningError> {
        let next = self.state.status.apply(LearningEvent::Grade)?;
        if !self.state.is_revealed {
            return Err(LearningError::NotRevealed);
        }
        let country = self
            .state
            .current_card()
            .map(|card| card.country)
            .ok_or(LearningError::NoCurrentCard)?;

        self.state.error = None;
        if let Err(err) = self.api.submit_review(country, is_correct).await {
            self.state.error = Some(err.to_string());
            self.publish();
            return Err(err.into());
        }

        self.state.tally.record(is_correct);
        self.state.current_index += 1;
        self.state.is_revealed = false;
        if self.state.current_index >= self.state.due_cards.len() {
            self.state.status = self.state.status.apply(LearningEvent::LastCardGraded)?;
            info!(
                "batch complete: {}/{} correct",
                self.state.tally.correct, self.state.tally.reviewed
            );
        } else {
            self.state.status = next;
        }
        self.publish();

        self.refresh_stats_quietly().await;
        Ok(&self.state)
    }

    /// Fetch aggregate statistics now.
    ///
    /// Allowed in every phase and does not change it.
    ///
    /// # Errors
    ///
    /// Returns the service error; the previous stats are kept.
    pub async fn refresh_stats(&mut self) -> Result<LearningStats, LearningError> {
        match self.api.learning_stats().await {
            Ok(stats) => {
                self.state.stats = Some(stats.clone());
                self.state.error = None;
                self.publish();
                Ok(stats)
            }
            Err(err) => {
                self.state.error = Some(err.to_string());
                self.publish();
                Err(err.into())
            }
        }
    }

    /// Drop the batch and go back to idle. Stats are kept.
    ///
    /// # Errors
    ///
    /// Returns `LearningError::Transition` unless the batch is complete or
    /// there were no cards.
    pub fn restart(&mut self) -> Result<(), LearningError> {
        let next = self.state.status.apply(LearningEvent::Restart)?;
        let stats = self.state.stats.take();
        self.state = LearningSnapshot {
            status: next,
            stats,
            ..LearningSnapshot::default()
        };
        self.publish();
        Ok(())
    }

    fn publish(&self) {
        self.updates.send_replace(self.state.clone());
    }

    fn enter_loading(&mut self, event: LearningEvent) -> Result<(), LearningError> {
        self.state.status = self.state.status.apply(event)?;
        self.state.error = None;
        self.publish();
        Ok(())
    }

    async fn load_batch(&mut self, resume: LearningStatus) -> Result<(), LearningError> {
        let due = match self.api.due_cards(self.config.batch_size).await {
            Ok(due) => due,
            Err(err) => return Err(self.fail_load(resume, err)),
        };

        self.state.current_index = 0;
        self.state.is_revealed = false;
        self.state.tally = Default::default();
        if due.is_empty() {
            self.state.status = self.state.status.apply(LearningEvent::NoneDue)?;
            self.state.due_cards.clear();
            info!("no cards due");
        } else {
            self.state.status = self.state.status.apply(LearningEvent::CardsReceived)?;
            self.state.due_cards = due.cards;
            info!("loaded {} due cards", self.state.due_cards.len());
        }
        self.publish();

        self.refresh_stats_quietly().await;
        Ok(())
    }

    fn fail_load(&mut self, resume: LearningStatus, err: ApiError) -> LearningError {
        warn!("could not load learning cards: {err}");
        if let Ok(status) = self.state.status.apply(LearningEvent::LoadFailed { resume }) {
            self.state.status = status;
        }
        self.state.error = Some(err.to_string());
        self.publish();
        err.into()
    }

    async fn refresh_stats_quietly(&mut self) {
        match self.api.learning_stats().await {
            Ok(stats) => {
                self.state.stats = Some(stats);
                self.publish();
            }
            Err(err) => warn!("stats refresh failed: {err}"),
        }
    }
}

impl fmt::Debug for LearningEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LearningEngine")
            .field("status", &self.state.status)
            .field("current_index", &self.state.current_index)
            .field("due_cards", &self.state.due_cards.len())
            .finish_non_exhaustive()
    }
}
