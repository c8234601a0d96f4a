use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Bearer credentials issued by the auth service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthTokens {
    pub access: String,
    pub refresh: Option<String>,
    pub saved_at: DateTime<Utc>,
}

impl AuthTokens {
    #[must_use]
    pub fn new(access: impl Into<String>, refresh: Option<String>, saved_at: DateTime<Utc>) -> Self {
        Self {
            access: access.into(),
            refresh,
            saved_at,
        }
    }
}

/// Where the transport reads the bearer token from.
///
/// The session engines never touch this; only the HTTP client does, and it
/// only ever reads it back or clears it on a rejected credential.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Fetch the stored tokens, if any.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    async fn load_tokens(&self) -> Result<Option<AuthTokens>, StorageError>;

    /// Replace the stored tokens.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the tokens cannot be written.
    async fn save_tokens(&self, tokens: &AuthTokens) -> Result<(), StorageError>;

    /// Forget any stored tokens. Clearing an empty store is not an error.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be written.
    async fn clear_tokens(&self) -> Result<(), StorageError>;

    /// Convenience accessor for the bearer value.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    async fn access_token(&self) -> Result<Option<String>, StorageError> {
        Ok(self.load_tokens().await?.map(|tokens| tokens.access))
    }
}

/// Simple in-memory token store for tests and short-lived processes.
#[derive(Clone, Default)]
pub struct InMemoryTokenStore {
    tokens: Arc<Mutex<Option<AuthTokens>>>,
}

impl InMemoryTokenStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_tokens(tokens: AuthTokens) -> Self {
        Self {
            tokens: Arc::new(Mutex::new(Some(tokens))),
        }
    }
}

#[async_trait]
impl TokenStore for InMemoryTokenStore {
    async fn load_tokens(&self) -> Result<Option<AuthTokens>, StorageError> {
        let guard = self
            .tokens
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.clone())
    }

    async fn save_tokens(&self, tokens: &AuthTokens) -> Result<(), StorageError> {
        let mut guard = self
            .tokens
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        *guard = Some(tokens.clone());
        Ok(())
    }

    async fn clear_tokens(&self) -> Result<(), StorageError> {
        let mut guard = self
            .tokens
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        *guard = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn saved_at() -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap()
    }

    #[tokio::test]
    async fn empty_store_has_no_token() {
        let store = InMemoryTokenStore::new();
        assert_eq!(store.access_token().await.unwrap(), None);
        store.clear_tokens().await.unwrap();
    }

    #[tokio::test]
    async fn save_then_clear() {
        let store = InMemoryTokenStore::new();
        let tokens = AuthTokens::new("abc", Some("refresh".into()), saved_at());
        store.save_tokens(&tokens).await.unwrap();
        assert_eq!(store.access_token().await.unwrap().as_deref(), Some("abc"));

        let clone = store.clone();
        clone.clear_tokens().await.unwrap();
        assert_eq!(store.load_tokens().await.unwrap(), None);
    }
}
