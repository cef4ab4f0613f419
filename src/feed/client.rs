//! The Odds API REST client

use async_trait::async_trait;
use reqwest::Client as HttpClient;
use tracing::{debug, info};
use url::Url;

use super::models::{parse_events, parse_results, RawEvent, RawResult};
use super::traits::OddsFeed;
use crate::config::FeedConfig;
use crate::error::{Error, Result};

pub struct OddsApiClient {
    config: FeedConfig,
    http: HttpClient,
}

impl OddsApiClient {
    /// Create a client whose every request is bounded by `config.timeout`.
    pub fn new(config: FeedConfig) -> Result<Self> {
        let http = HttpClient::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { config, http })
    }

    fn api_key(&self) -> Result<&str> {
        self.config
            .api_key
            .as_deref()
            .ok_or_else(|| Error::FeedMisconfigured("ODDS_API_KEY not set".into()))
    }

    fn endpoint(&self, resource: &str, params: &[(&str, String)]) -> Result<Url> {
        let base = self.config.base_url.trim_end_matches('/');
        let url = format!("{}/sports/{}/{}", base, self.config.sport, resource);
        Ok(Url::parse_with_params(&url, params)?)
    }

    fn odds_url(&self) -> Result<Url> {
        let key = self.api_key()?;
        self.endpoint(
            "odds",
            &[
                ("apiKey", key.to_string()),
                ("regions", self.config.regions.clone()),
                ("markets", self.config.markets.clone()),
                ("oddsFormat", "decimal".to_string()),
            ],
        )
    }

    fn scores_url(&self) -> Result<Url> {
        let key = self.api_key()?;
        self.endpoint(
            "scores",
            &[
                ("apiKey", key.to_string()),
                ("daysFrom", self.config.scores_days_from.to_string()),
            ],
        )
    }

    async fn get_body(&self, url: Url) -> Result<String> {
        let resp = self.http.get(url).send().await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::FeedUnavailable(format!("HTTP {}: {}", status, body)));
        }

        if let Some(remaining) = resp.headers().get("x-requests-remaining") {
            debug!("Odds API requests remaining: {:?}", remaining);
        }

        Ok(resp.text().await?)
    }
}

fn undecodable(e: Error) -> Error {
    match e {
        Error::Serialization(inner) => {
            Error::FeedUnavailable(format!("Undecodable feed body: {}", inner))
        }
        other => other,
    }
}

#[async_trait]
impl OddsFeed for OddsApiClient {
    async fn fetch_active_markets(&self) -> Result<Vec<RawEvent>> {
        let body = self.get_body(self.odds_url()?).await?;
        let events = parse_events(&body).map_err(undecodable)?;
        info!("Fetched {} events for {}", events.len(), self.config.sport);
        Ok(events)
    }

    async fn fetch_completed_events(&self) -> Result<Vec<RawResult>> {
        let body = self.get_body(self.scores_url()?).await?;
        let results: Vec<RawResult> = parse_results(&body)
            .map_err(undecodable)?
            .into_iter()
            .filter(|r| r.completed)
            .collect();
        info!("Fetched {} completed results for {}", results.len(), self.config.sport);
        Ok(results)
    }
}
