//! Gatekeeping for keystroke-driven answer checks.
//!
//! The gate decides whether a typed value is worth sending at all. Timing
//! (the quiet period) is the caller's job; the gate only remembers what was
//! last sent so the same guess never goes out twice in a row.

/// Inputs shorter than this (after trimming) are never checked.
pub const MIN_ANSWER_LEN: usize = 3;

/// Trim and case-fold a raw input for comparison.
#[must_use]
pub fn normalize(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// A value that passed the gate and may be scheduled for checking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingAnswer {
    /// Trimmed text as the player typed it; this is what gets sent.
    pub text: String,
    /// Case-folded form used for dedupe.
    pub key: String,
}

/// Outcome of offering one keystroke's worth of input to the gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    TooShort,
    /// Same (case-insensitive, trimmed) value as the last one sent.
    Unchanged,
    Ready(PendingAnswer),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerGate {
    min_len: usize,
    last_checked: Option<String>,
}

impl Default for AnswerGate {
    fn default() -> Self {
        Self::new(MIN_ANSWER_LEN)
    }
}

impl AnswerGate {
    #[must_use]
    pub fn new(min_len: usize) -> Self {
        Self {
            min_len,
            last_checked: None,
        }
    }

    #[must_use]
    pub fn evaluate(&self, raw: &str) -> GateDecision {
        let text = raw.trim();
        let key = text.to_lowercase();

        if key.chars().count() < self.min_len {
            return GateDecision::TooShort;
        }
        if self.last_checked.as_deref() == Some(key.as_str()) {
            return GateDecision::Unchanged;
        }

        GateDecision::Ready(PendingAnswer {
            text: text.to_owned(),
            key,
        })
    }

    /// Record `key` as sent. Call when the check is dispatched, not when it returns.
    pub fn mark_checked(&mut self, key: impl Into<String>) {
        self.last_checked = Some(key.into());
    }

    pub fn clear(&mut self) {
        self.last_checked = None;
    }

    #[must_use]
    pub fn last_checked(&self) -> Option<&str> {
        self.last_checked.as_deref()
    }
}
