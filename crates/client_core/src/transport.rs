//! HTTP access to the remote game service.

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{header, Client};
use shared::{
    domain::{GameOutcome, SessionToken, TerritoryCatalog},
    protocol::{
        AnswerResponse, GuessRequest, GuessResponse, NewGameQuery, NewGameResponse, ANSWER_PATH,
        GUESS_PATH, NEW_GAME_PATH, SILHOUETTE_ACCEPT, SILHOUETTE_PATH, TERRITORIES_PATH,
    },
};
use tracing::debug;
use url::Url;

/// Raw silhouette image as served.
#[derive(Debug, Clone)]
pub struct SilhouettePayload {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

/// Result of a guess request that reached the service.
#[derive(Debug, Clone, PartialEq)]
pub enum GuessVerdict {
    Evaluated(GuessResponse),
    /// Non-2xx answer, usually a name the service could not geolocate.
    Rejected { status: u16, body: String },
}

#[async_trait]
pub trait GameApi: Send + Sync {
    /// Creates a session, or resumes `resume` when given. The service may
    /// still hand back a different token.
    async fn negotiate_session(&self, resume: Option<&SessionToken>) -> Result<SessionToken>;
    async fn fetch_silhouette(&self) -> Result<SilhouettePayload>;
    async fn fetch_territories(&self) -> Result<TerritoryCatalog>;
    async fn submit_guess(&self, session: &SessionToken, country: &str) -> Result<GuessVerdict>;
    async fn fetch_answer(&self) -> Result<GameOutcome>;
}

pub struct HttpGameApi {
    http: Client,
    base_url: Url,
}

impl HttpGameApi {
    pub fn new(base_url: &str) -> Result<Self> {
        Self::from_builder(base_url, Client::builder())
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self> {
        Self::from_builder(base_url, Client::builder().timeout(timeout))
    }

    fn from_builder(base_url: &str, builder: reqwest::ClientBuilder) -> Result<Self> {
        let http = builder.build().context("failed to build http client")?;
        Ok(Self {
            http,
            base_url: normalize_base_url(base_url)?,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .with_context(|| format!("invalid endpoint path '{path}'"))
    }
}

fn normalize_base_url(raw: &str) -> Result<Url> {
    let raw = raw.trim();
    let mut url = Url::parse(raw).with_context(|| format!("invalid api url '{raw}'"))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(anyhow!("api url must start with http:// or https://"));
    }
    // Url::join drops the last path segment unless it ends with a slash.
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

#[async_trait]
impl GameApi for HttpGameApi {
    async fn negotiate_session(&self, resume: Option<&SessionToken>) -> Result<SessionToken> {
        let query = NewGameQuery {
            session_id: resume.map(|token| token.as_str().to_string()),
        };
        let res = self
            .http
            .get(self.endpoint(NEW_GAME_PATH)?)
            .query(&query)
            .send()
            .await
            .context("newgame request failed")?
            .error_for_status()?;
        let body: NewGameResponse = res.json().await.context("invalid newgame response")?;
        SessionToken::new(body.session_id)
            .ok_or_else(|| anyhow!("service returned a blank session id"))
    }

    async fn fetch_silhouette(&self) -> Result<SilhouettePayload> {
        let res = self
            .http
            .get(self.endpoint(SILHOUETTE_PATH)?)
            .header(header::ACCEPT, SILHOUETTE_ACCEPT)
            .send()
            .await
            .context("silhouette request failed")?
            .error_for_status()?;
        let content_type = res
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let bytes = res
            .bytes()
            .await
            .context("failed to read silhouette body")?;
        debug!(
            "transport: silhouette bytes={} content_type={:?}",
            bytes.len(),
            content_type
        );
        Ok(SilhouettePayload {
            bytes: bytes.to_vec(),
            content_type,
        })
    }

    async fn fetch_territories(&self) -> Result<TerritoryCatalog> {
        let names: Vec<String> = self
            .http
            .get(self.endpoint(TERRITORIES_PATH)?)
            .send()
            .await
            .context("territories request failed")?
            .error_for_status()?
            .json()
            .await
            .context("invalid territories response")?;
        Ok(TerritoryCatalog::new(names))
    }

    async fn submit_guess(&self, session: &SessionToken, country: &str) -> Result<GuessVerdict> {
        let res = self
            .http
            .post(self.endpoint(GUESS_PATH)?)
            .json(&GuessRequest::new(session, country))
            .send()
            .await
            .context("guess request failed")?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Ok(GuessVerdict::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let body: GuessResponse = res.json().await.context("invalid guess response")?;
        Ok(GuessVerdict::Evaluated(body))
    }

    async fn fetch_answer(&self) -> Result<GameOutcome> {
        let body: AnswerResponse = self
            .http
            .get(self.endpoint(ANSWER_PATH)?)
            .send()
            .await
            .context("answer request failed")?
            .error_for_status()?
            .json()
            .await
            .context("invalid answer response")?;
        Ok(body.into())
    }
}

#[cfg(test)]
#[path = "tests/transport_tests.rs"]
mod tests;
