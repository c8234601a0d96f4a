use std::fmt;
use std::ops::ControlFlow;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::{debug, info, warn};
use tokio::sync::watch;

use flag_core::answer::{GateDecision, PendingAnswer};
use flag_core::model::{Feedback, QuizEvent, QuizStatus, SessionId};
use flag_core::{Clock, Elapsed};

use super::AnswerCheck;
use super::state::{QuizSnapshot, QuizState, Ticket};
use crate::api::{NextQuestion, SessionApi};
use crate::config::QuizConfig;
use crate::error::QuizError;
use crate::timer;

//
// ─── ENGINE ────────────────────────────────────────────────────────────────────
//

/// Drives one open-ended flag challenge against the remote service.
///
/// Cheap to clone; clones share the same play-through. Score, skips and
/// countries viewed are always copied from the latest service response.
/// Timers (debounce, auto-advance delay, elapsed tick) are owned by the
/// state and cancelled on every transition that invalidates them.
///
/// Methods that schedule timers must be called from within a Tokio runtime.
#[derive(Clone)]
pub struct QuizEngine {
    inner: Arc<Inner>,
}

struct Inner {
    api: Arc<dyn SessionApi>,
    config: QuizConfig,
    clock: Clock,
    state: Mutex<QuizState>,
    updates: watch::Sender<QuizSnapshot>,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, QuizState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, state: &QuizState) {
        self.updates.send_replace(state.snapshot());
    }
}

impl QuizEngine {
    #[must_use]
    pub fn new(api: Arc<dyn SessionApi>, config: QuizConfig) -> Self {
        Self::with_clock(api, config, Clock::default())
    }

    #[must_use]
    pub fn with_clock(api: Arc<dyn SessionApi>, config: QuizConfig, clock: Clock) -> Self {
        let state = QuizState::new(&config);
        let (updates, _) = watch::channel(state.snapshot());
        Self {
            inner: Arc::new(Inner {
                api,
                config,
                clock,
                state: Mutex::new(state),
                updates,
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &QuizConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn snapshot(&self) -> QuizSnapshot {
        self.inner.lock().snapshot()
    }

    /// Receive a fresh snapshot after every change, timer-driven ones included.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<QuizSnapshot> {
        self.inner.updates.subscribe()
    }

    /// Create a session and load the first flag.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::Transition` unless idle. On a service failure the
    /// engine returns to idle and the error is both returned and recorded.
    pub async fn start(&self) -> Result<QuizSnapshot, QuizError> {
        let inner = &self.inner;
        let generation = {
            let mut state = inner.lock();
            let next = state.status.apply(QuizEvent::Start)?;
            state.reset(&inner.config);
            state.status = next;
            state.started_at = Some(inner.clock.now());
            inner.publish(&state);
            state.generation
        };

        let session = match inner.api.create_session().await {
            Ok(started) => started.id,
            Err(err) => return Err(fail_start(inner, err.into())),
        };
        info!("quiz session {session} created");
        {
            let mut state = inner.lock();
            state.session_id = Some(session);
        }

        let next = match inner.api.next_question(session).await {
            Ok(next) => next,
            Err(err) => return Err(fail_start(inner, err.into())),
        };

        let finished = {
            let mut state = inner.lock();
            if state.generation != generation {
                return Ok(state.snapshot());
            }
            apply_next(inner, &mut state, next)?
        };
        if let Some((session, elapsed)) = finished {
            report_finish(inner, session, elapsed).await;
        }

        Ok(self.snapshot())
    }

    /// Offer the current contents of the answer box. Call on every keystroke.
    ///
    /// Short or unchanged input is ignored; anything else (re)starts the
    /// debounce window, and the check goes out once input has been quiet for
    /// `QuizConfig::debounce`. A wrong verdict changes nothing visible.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::Transition` unless playing.
    pub fn submit_answer_for_check(&self, candidate: &str) -> Result<AnswerCheck, QuizError> {
        let inner = &self.inner;
        let mut state = inner.lock();
        state.status = state.status.apply(QuizEvent::AnswerInput)?;
        state.user_answer = candidate.to_owned();

        let outcome = if state.feedback.is_some() {
            AnswerCheck::AwaitingNext
        } else {
            match state.gate.evaluate(candidate) {
                GateDecision::TooShort => AnswerCheck::TooShort,
                GateDecision::Unchanged => AnswerCheck::Unchanged,
                GateDecision::Ready(pending) => {
                    let ticket = state.ticket().ok_or(QuizError::NoActiveSession)?;
                    debug!("scheduling check for {:?}", pending.key);
                    let weak = Arc::downgrade(inner);
                    state
                        .debounce
                        .replace(timer::after(inner.config.debounce, move || {
                            if let Some(inner) = weak.upgrade() {
                                tokio::spawn(run_check(inner, ticket, pending));
                            }
                        }));
                    AnswerCheck::Scheduled
                }
            }
        };

        inner.publish(&state);
        Ok(outcome)
    }

    /// Load the next flag explicitly, e.g. after an auto-advance failed.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::Transition` unless playing, or the service error.
    pub async fn next_question(&self) -> Result<QuizSnapshot, QuizError> {
        let inner = &self.inner;
        let (session, generation) = {
            let mut state = inner.lock();
            state.status = state.status.apply(QuizEvent::Advance)?;
            state.error = None;
            let session = state.session_id.ok_or(QuizError::NoActiveSession)?;
            state.invalidate_question();
            inner.publish(&state);
            (session, state.generation)
        };

        fetch_next(inner, session, generation).await?;
        Ok(self.snapshot())
    }

    /// Spend one skip and move on to the next flag.
    ///
    /// A check still waiting out its quiet period is dropped as soon as the
    /// skip is requested, and any verdict still in flight is ignored.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::NoSkipsRemaining` without calling the service when
    /// the budget is spent, `QuizError::Transition` unless playing, or the
    /// service error (state is left as it was).
    pub async fn skip(&self) -> Result<QuizSnapshot, QuizError> {
        let inner = &self.inner;
        let session = {
            let mut state = inner.lock();
            state.status = state.status.apply(QuizEvent::Skip)?;
            state.error = None;
            if state.progress.skips_remaining == 0 {
                state.error = Some(QuizError::NoSkipsRemaining.to_string());
                inner.publish(&state);
                return Err(QuizError::NoSkipsRemaining);
            }
            let session = state.session_id.ok_or(QuizError::NoActiveSession)?;
            state.withdraw_checks();
            inner.publish(&state);
            session
        };

        let outcome = inner.api.skip_question(session).await;

        let generation = {
            let mut state = inner.lock();
            let outcome = match outcome {
                Ok(outcome) => outcome,
                Err(err) => {
                    state.error = Some(err.to_string());
                    inner.publish(&state);
                    return Err(err.into());
                }
            };
            if !state.status.is_playing() || state.session_id != Some(session) {
                return Ok(state.snapshot());
            }
            state.progress.skips_remaining = outcome.skips_remaining;
            state.progress.score = outcome.score;
            state.invalidate_question();
            inner.publish(&state);
            state.generation
        };

        fetch_next(inner, session, generation).await?;
        Ok(self.snapshot())
    }

    /// Give up: end the game and report the frozen elapsed time.
    ///
    /// The engine is in game over when this returns, whether or not the
    /// service accepted the finish call.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::Transition` unless playing.
    pub async fn finish(&self) -> Result<QuizSnapshot, QuizError> {
        let inner = &self.inner;
        let (session, elapsed) = {
            let mut state = inner.lock();
            state.status = state.status.apply(QuizEvent::GiveUp)?;
            state.error = None;
            state.enter_game_over(inner.clock.now());
            inner.publish(&state);
            (state.session_id, state.elapsed)
        };

        info!("quiz given up after {elapsed}");
        if let Some(session) = session {
            report_finish(inner, session, elapsed).await;
        }
        Ok(self.snapshot())
    }

    /// Leave game over and return to a fresh idle engine.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::Transition` unless the game is over.
    pub fn restart(&self) -> Result<QuizSnapshot, QuizError> {
        let inner = &self.inner;
        let mut state = inner.lock();
        let next = state.status.apply(QuizEvent::Restart)?;
        state.reset(&inner.config);
        state.status = next;
        inner.publish(&state);
        Ok(state.snapshot())
    }
}

impl fmt::Debug for QuizEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.lock();
        f.debug_struct("QuizEngine")
            .field("status", &state.status)
            .field("session_id", &state.session_id)
            .field("generation", &state.generation)
            .field("elapsed", &state.elapsed)
            .finish_non_exhaustive()
    }
}

//
// ─── DEFERRED WORK ─────────────────────────────────────────────────────────────
//

fn fail_start(inner: &Inner, err: QuizError) -> QuizError {
    warn!("could not start quiz: {err}");
    let mut state = inner.lock();
    if let Ok(next) = state.status.apply(QuizEvent::StartFailed) {
        state.status = next;
    }
    state.session_id = None;
    state.started_at = None;
    state.error = Some(err.to_string());
    inner.publish(&state);
    err
}

/// Fired when a debounce window closes. Never surfaces an error.
async fn run_check(inner: Arc<Inner>, ticket: Ticket, pending: PendingAnswer) {
    {
        let mut state = inner.lock();
        if !state.is_current(ticket) {
            debug!("dropping check scheduled for a question no longer shown");
            return;
        }
        if state.gate.last_checked() == Some(pending.key.as_str()) {
            return;
        }
        state.gate.mark_checked(pending.key.clone());
    }

    let verdict = match inner.api.check_answer(ticket.session, &pending.text).await {
        Ok(verdict) => verdict,
        Err(err) => {
            warn!("answer check failed: {err}");
            return;
        }
    };
    if !verdict.correct {
        debug!("{:?} is not it", pending.key);
        return;
    }

    let mut state = inner.lock();
    if !state.is_current(ticket) {
        debug!("discarding late verdict for question {}", ticket.question);
        return;
    }
    state.gate.clear();
    state.debounce.cancel();
    state.progress.score = verdict.score;
    state.feedback = Some(Feedback::auto_advancing(verdict.correct_answer));
    state.user_answer.clear();

    let weak = Arc::downgrade(&inner);
    state
        .advance
        .replace(timer::after(inner.config.feedback_delay, move || {
            if let Some(inner) = weak.upgrade() {
                tokio::spawn(auto_advance(inner, ticket));
            }
        }));
    inner.publish(&state);
}

/// Fired when a correct verdict has been on screen long enough.
async fn auto_advance(inner: Arc<Inner>, ticket: Ticket) {
    {
        let mut state = inner.lock();
        if !state.is_current(ticket) {
            return;
        }
        state.feedback = None;
        inner.publish(&state);
    }

    if let Err(err) = fetch_next(&inner, ticket.session, ticket.generation).await {
        warn!("could not load the next flag: {err}");
    }
}

/// Fetch the next flag and apply it if nothing moved on in the meantime.
async fn fetch_next(inner: &Arc<Inner>, session: SessionId, generation: u64) -> Result<(), QuizError> {
    let next = inner.api.next_question(session).await;

    let finished = {
        let mut state = inner.lock();
        if state.generation != generation {
            debug!("discarding stale next-question response");
            return Ok(());
        }
        match next {
            Ok(next) => apply_next(inner, &mut state, next)?,
            Err(err) => {
                state.error = Some(err.to_string());
                inner.publish(&state);
                return Err(err.into());
            }
        }
    };

    if let Some((session, elapsed)) = finished {
        report_finish(inner, session, elapsed).await;
    }
    Ok(())
}

/// Returns the session to finish when the universe is exhausted.
fn apply_next(
    inner: &Arc<Inner>,
    state: &mut QuizState,
    next: NextQuestion,
) -> Result<Option<(SessionId, Elapsed)>, QuizError> {
    match next {
        NextQuestion::Question {
            question,
            progress,
            total_countries,
        } => {
            state.status = state.status.apply(QuizEvent::QuestionReceived)?;
            state.invalidate_question();
            state.question = Some(question);
            state.progress = progress;
            if total_countries.is_some() {
                state.total_countries = total_countries;
            }
            state.error = None;
            if !state.ticker.is_pending() {
                start_ticker(inner, state);
            }
            inner.publish(state);
            Ok(None)
        }
        NextQuestion::Exhausted {
            final_score,
            countries_viewed,
            total_countries,
        } => {
            state.status = state.status.apply(QuizEvent::UniverseExhausted)?;
            state.progress.score = final_score;
            state.progress.countries_viewed = countries_viewed;
            if total_countries.is_some() {
                state.total_countries = total_countries;
            }
            state.enter_game_over(inner.clock.now());
            inner.publish(state);
            info!("every flag shown; final score {final_score}");
            Ok(state.session_id.map(|session| (session, state.elapsed)))
        }
    }
}

fn start_ticker(inner: &Arc<Inner>, state: &mut QuizState) {
    let weak = Arc::downgrade(inner);
    state.ticker = timer::every(inner.config.tick, move || {
        let Some(inner) = weak.upgrade() else {
            return ControlFlow::Break(());
        };
        let mut state = inner.lock();
        if !state.status.is_playing() {
            return ControlFlow::Break(());
        }
        state.elapsed.tick();
        inner.publish(&state);
        ControlFlow::Continue(())
    });
}

/// Best-effort finish. Failure is logged; the local game over stands.
async fn report_finish(inner: &Inner, session: SessionId, elapsed: Elapsed) {
    match inner.api.finish_session(session, elapsed.secs()).await {
        Ok(outcome) => {
            let mut state = inner.lock();
            if state.status == QuizStatus::GameOver && state.session_id == Some(session) {
                state.progress.score = outcome.final_score;
                state.progress.countries_viewed = outcome.countries_viewed;
                inner.publish(&state);
            }
        }
        Err(err) => warn!("finishing session {session} failed, keeping local game over: {err}"),
    }
}
