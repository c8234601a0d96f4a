use std::env;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use url::Url;

use flag_core::model::{CountryId, LearningStats, SessionId};
use storage::repository::TokenStore;

use super::wire::{
    AnswerRequest, AnswerResponse, DueResponse, ErrorBody, FinishRequest, FinishResponse,
    LimitRequest, QuestionResponse, ReviewRequest, SkipResponse, StartRequest, StartResponse,
};
use super::{
    AnswerVerdict, DueCards, FinishOutcome, NextQuestion, SessionApi, SessionStarted, SkipOutcome,
};
use crate::error::ApiError;

#[derive(Clone, Debug)]
pub struct ApiConfig {
    base_url: Url,
}

impl ApiConfig {
    pub const DEFAULT_BASE_URL: &'static str = "http://localhost:8000/api";

    /// # Errors
    ///
    /// Returns `ApiError::InvalidUrl` if `base_url` does not parse.
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        // `Url::join` drops the last path segment unless it ends in a slash.
        let mut raw = base_url.trim().to_string();
        if !raw.ends_with('/') {
            raw.push('/');
        }
        Ok(Self {
            base_url: Url::parse(&raw)?,
        })
    }

    /// Reads `FLAGQUIZ_API_URL`, falling back to the local development server.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::InvalidUrl` if the configured URL does not parse.
    pub fn from_env() -> Result<Self, ApiError> {
        let raw = env::var("FLAGQUIZ_API_URL").unwrap_or_else(|_| Self::DEFAULT_BASE_URL.into());
        Self::new(&raw)
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        Ok(self.base_url.join(path.trim_start_matches('/'))?)
    }

    fn session_endpoint(&self, path: &str, session: SessionId) -> Result<Url, ApiError> {
        let mut url = self.endpoint(path)?;
        url.query_pairs_mut()
            .append_pair("session_id", &session.to_string());
        Ok(url)
    }
}

/// REST/JSON binding of `SessionApi`.
///
/// Attaches the stored bearer token to every request; a `401` clears the
/// stored tokens and surfaces as `ApiError::Unauthorized`.
#[derive(Clone)]
pub struct HttpSessionApi {
    client: Client,
    config: ApiConfig,
    tokens: Arc<dyn TokenStore>,
}

impl HttpSessionApi {
    #[must_use]
    pub fn new(config: ApiConfig, tokens: Arc<dyn TokenStore>) -> Self {
        Self {
            client: Client::new(),
            config,
            tokens,
        }
    }

    #[must_use]
    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    async fn dispatch(&self, mut request: RequestBuilder) -> Result<Response, ApiError> {
        if let Some(token) = self.tokens.access_token().await? {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED {
            log::warn!("service rejected credentials; clearing stored tokens");
            self.tokens.clear_tokens().await?;
            return Err(ApiError::Unauthorized);
        }

        if !status.is_success() {
            let message = response
                .json::<ErrorBody>()
                .await
                .ok()
                .and_then(ErrorBody::into_message)
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").into());
            return Err(ApiError::HttpStatus { status, message });
        }

        Ok(response)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        let response = self.dispatch(request).await?;
        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl SessionApi for HttpSessionApi {
    async fn create_session(&self) -> Result<SessionStarted, ApiError> {
        let url = self.config.endpoint("game/start/")?;
        let body: StartResponse = self
            .send(self.client.post(url).json(&StartRequest { game_mode: "quiz" }))
            .await?;
        Ok(body.into())
    }

    async fn next_question(&self, session: SessionId) -> Result<NextQuestion, ApiError> {
        let url = self.config.session_endpoint("game/question/", session)?;
        let body: QuestionResponse = self.send(self.client.get(url)).await?;
        body.into_next()
            .ok_or_else(|| ApiError::Rejected("malformed question response".into()))
    }

    async fn check_answer(
        &self,
        session: SessionId,
        answer: &str,
    ) -> Result<AnswerVerdict, ApiError> {
        let url = self.config.session_endpoint("game/answer/", session)?;
        let body: AnswerResponse = self
            .send(self.client.post(url).json(&AnswerRequest { answer }))
            .await?;
        Ok(body.into())
    }

    async fn skip_question(&self, session: SessionId) -> Result<SkipOutcome, ApiError> {
        let url = self.config.session_endpoint("game/skip/", session)?;
        let body: SkipResponse = self.send(self.client.post(url)).await?;
        Ok(body.into())
    }

    async fn finish_session(
        &self,
        session: SessionId,
        time_elapsed_seconds: u32,
    ) -> Result<FinishOutcome, ApiError> {
        let url = self.config.session_endpoint("game/finish/", session)?;
        let body: FinishResponse = self
            .send(
                self.client
                    .post(url)
                    .json(&FinishRequest { time_elapsed_seconds }),
            )
            .await?;
        Ok(body.into())
    }

    async fn due_cards(&self, limit: u32) -> Result<DueCards, ApiError> {
        let mut url = self.config.endpoint("learn/due/")?;
        url.query_pairs_mut()
            .append_pair("limit", &limit.to_string());
        let body: DueResponse = self.send(self.client.get(url)).await?;
        Ok(body.into())
    }

    async fn add_new_cards(&self, limit: u32) -> Result<(), ApiError> {
        let url = self.config.endpoint("learn/add-new/")?;
        self.dispatch(self.client.post(url).json(&LimitRequest { limit }))
            .await?;
        Ok(())
    }

    async fn submit_review(&self, country: CountryId, is_correct: bool) -> Result<(), ApiError> {
        let url = self.config.endpoint("learn/review/")?;
        self.dispatch(self.client.post(url).json(&ReviewRequest {
            country_id: country,
            is_correct,
        }))
        .await?;
        Ok(())
    }

    async fn learning_stats(&self) -> Result<LearningStats, ApiError> {
        let url = self.config.endpoint("learn/stats/")?;
        self.send(self.client.get(url)).await
    }
}
