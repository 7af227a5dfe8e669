use chrono::Utc;
use ltk_reconcile::Observation;
use tracing::debug;

use crate::feed::decode_feed;
use crate::{FetchError, ScoreSource};

/// Scoreboard reached over HTTP, returning the JSON feed document described
/// in [`crate::feed`].
#[derive(Debug, Clone)]
pub struct HttpFeedSource {
    http: reqwest::Client,
    url: String,
}

impl HttpFeedSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), url)
    }

    pub fn with_client(http: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            http,
            url: url.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait::async_trait]
impl ScoreSource for HttpFeedSource {
    fn name(&self) -> &'static str {
        "http-feed"
    }

    async fn fetch_snapshot(&self) -> Result<Vec<Observation>, FetchError> {
        let resp = self
            .http
            .get(&self.url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        if !status.is_success() {
            let message = body.chars().take(200).collect::<String>();
            return Err(FetchError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let obs = decode_feed(&body, Utc::now())?;
        debug!(url = %self.url, rows = obs.len(), "scoreboard snapshot fetched");
        Ok(obs)
    }
}
