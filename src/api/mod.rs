pub mod api_structs;

use crate::gateway::{Gateway, GatewayError};
use crate::model::structures::{priority::Priority, tier::Tier};
use api_structs::{AccountDto, LeagueEntryDto, LeagueListDto, SummonerDto};
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, ClientBuilder, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

const MAX_RETRIES: u32 = 3;

/// A 429 asking us to wait longer than this fails fast instead of parking
/// the caller (and transitively the whole sync) for minutes.
const RETRY_AFTER_CEILING: Duration = Duration::from_secs(120);

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("rate limited upstream; indicated wait of {wait_secs}s exceeds the sanity ceiling")]
    RateLimitExceeded { wait_secs: u64 },

    #[error("upstream returned {status} for {url}")]
    Status { status: u16, url: String },

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("API key is not a valid header value")]
    InvalidApiKey,

    #[error(transparent)]
    Gateway(#[from] GatewayError)
}

/// Maps a platform routing value (euw1, na1, ...) onto the regional host
/// that serves account and match endpoints.
pub fn regional_routing(platform: &str) -> &'static str {
    match platform {
        "na1" | "br1" | "la1" | "la2" => "americas",
        "euw1" | "eun1" | "tr1" | "ru" => "europe",
        "kr" | "jp1" => "asia",
        "oc1" | "ph2" | "sg2" | "th2" | "vn2" => "sea",
        _ => "americas"
    }
}

fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get("Retry-After")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_secs)
}

/// Typed client for the upstream game-data API. Every call first acquires a
/// slot from the gateway, then runs on the shared reqwest client; 429s are
/// retried in the caller so a throttled response never blocks admission for
/// anyone else.
#[derive(Clone)]
pub struct RiotApiClient {
    http: Client,
    gateway: Gateway
}

impl RiotApiClient {
    pub fn new(api_key: &str, gateway: Gateway) -> Result<RiotApiClient, ApiError> {
        let mut headers = HeaderMap::new();
        let mut token = HeaderValue::from_str(api_key).map_err(|_| ApiError::InvalidApiKey)?;
        token.set_sensitive(true);
        headers.insert("X-Riot-Token", token);

        let http = ClientBuilder::new().default_headers(headers).build()?;

        Ok(RiotApiClient { http, gateway })
    }

    async fn fetch_with_retry(&self, url: &str) -> Result<reqwest::Response, ApiError> {
        let mut retries = 0;

        loop {
            let response = self.http.get(url).send().await?;

            if response.status() == StatusCode::TOO_MANY_REQUESTS {
                let wait = parse_retry_after(response.headers()).unwrap_or(Duration::from_secs(1));

                if wait > RETRY_AFTER_CEILING || retries >= MAX_RETRIES {
                    return Err(ApiError::RateLimitExceeded {
                        wait_secs: wait.as_secs()
                    });
                }

                warn!(url, wait_secs = wait.as_secs(), "throttled upstream, backing off");
                tokio::time::sleep(wait).await;
                retries += 1;
                continue;
            }

            if !response.status().is_success() {
                return Err(ApiError::Status {
                    status: response.status().as_u16(),
                    url: url.to_string()
                });
            }

            return Ok(response);
        }
    }

    async fn fetch_json<T: DeserializeOwned>(&self, url: &str, priority: Priority) -> Result<T, ApiError> {
        self.gateway.acquire(priority).await?;
        let response = self.fetch_with_retry(url).await?;
        Ok(response.json().await?)
    }

    /// Like `fetch_json` but a 404 becomes `None`; used for resources that
    /// legitimately may not exist (timelines for very old matches).
    async fn fetch_json_optional<T: DeserializeOwned>(
        &self,
        url: &str,
        priority: Priority
    ) -> Result<Option<T>, ApiError> {
        match self.fetch_json(url, priority).await {
            Ok(value) => Ok(Some(value)),
            Err(ApiError::Status { status: 404, .. }) => Ok(None),
            Err(e) => Err(e)
        }
    }

    pub async fn get_account(
        &self,
        game_name: &str,
        tag_line: &str,
        routing: &str,
        priority: Priority
    ) -> Result<AccountDto, ApiError> {
        let url = format!(
            "https://{routing}.api.riotgames.com/riot/account/v1/accounts/by-riot-id/{game_name}/{tag_line}"
        );
        self.fetch_json(&url, priority).await
    }

    pub async fn get_summoner(&self, puuid: &str, platform: &str, priority: Priority) -> Result<SummonerDto, ApiError> {
        let url = format!("https://{platform}.api.riotgames.com/lol/summoner/v4/summoners/by-puuid/{puuid}");
        self.fetch_json(&url, priority).await
    }

    pub async fn get_league_entries(
        &self,
        puuid: &str,
        platform: &str,
        priority: Priority
    ) -> Result<Vec<LeagueEntryDto>, ApiError> {
        let url = format!("https://{platform}.api.riotgames.com/lol/league/v4/entries/by-puuid/{puuid}");
        self.fetch_json(&url, priority).await
    }

    pub async fn get_match_ids(
        &self,
        puuid: &str,
        routing: &str,
        start: usize,
        count: usize,
        priority: Priority
    ) -> Result<Vec<String>, ApiError> {
        let url = format!(
            "https://{routing}.api.riotgames.com/lol/match/v5/matches/by-puuid/{puuid}/ids?start={start}&count={count}"
        );
        self.fetch_json(&url, priority).await
    }

    /// Raw match payload. Stored verbatim; typed views are parsed from it.
    pub async fn get_match(
        &self,
        match_id: &str,
        routing: &str,
        priority: Priority
    ) -> Result<serde_json::Value, ApiError> {
        let url = format!("https://{routing}.api.riotgames.com/lol/match/v5/matches/{match_id}");
        self.fetch_json(&url, priority).await
    }

    /// Best-effort timeline fetch; `None` when the upstream has no timeline
    /// for this match.
    pub async fn get_match_timeline(
        &self,
        match_id: &str,
        routing: &str,
        priority: Priority
    ) -> Result<Option<serde_json::Value>, ApiError> {
        let url = format!("https://{routing}.api.riotgames.com/lol/match/v5/matches/{match_id}/timeline");
        self.fetch_json_optional(&url, priority).await
    }

    /// Apex league list for the tier scan job. Only challenger, grandmaster
    /// and master have dedicated league endpoints.
    pub async fn get_apex_league(
        &self,
        platform: &str,
        tier: Tier,
        queue: &str,
        priority: Priority
    ) -> Result<LeagueListDto, ApiError> {
        let segment = match tier {
            Tier::Challenger => "challengerleagues",
            Tier::Grandmaster => "grandmasterleagues",
            _ => "masterleagues"
        };
        let url = format!("https://{platform}.api.riotgames.com/lol/league/v4/{segment}/by-queue/{queue}");
        self.fetch_json(&url, priority).await
    }
}

#[cfg(test)]
mod tests {
    use super::{parse_retry_after, regional_routing};
    use reqwest::header::{HeaderMap, HeaderValue};
    use std::time::Duration;

    #[test]
    fn test_regional_routing() {
        assert_eq!(regional_routing("euw1"), "europe");
        assert_eq!(regional_routing("na1"), "americas");
        assert_eq!(regional_routing("kr"), "asia");
        assert_eq!(regional_routing("sg2"), "sea");
        assert_eq!(regional_routing("unknown"), "americas");
    }

    #[test]
    fn test_parse_retry_after() {
        let mut headers = HeaderMap::new();
        assert_eq!(parse_retry_after(&headers), None);

        headers.insert("Retry-After", HeaderValue::from_static("7"));
        assert_eq!(parse_retry_after(&headers), Some(Duration::from_secs(7)));

        headers.insert("Retry-After", HeaderValue::from_static("soon"));
        assert_eq!(parse_retry_after(&headers), None);
    }
}
