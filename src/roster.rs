use std::time::Duration;

use serde::{Deserialize, Deserializer};
use thiserror::Error;

use crate::geo::Point;

/// One driver in the external feed: an id plus the driver's nominal
/// position. Feed ids arrive as bare JSON numbers while stored driver ids
/// are strings, so ids are normalized at the deserialization boundary.
#[derive(Debug, Clone, Deserialize)]
pub struct RosterEntry {
    #[serde(deserialize_with = "id_from_number_or_string")]
    pub id: String,
    pub lat: f64,
    pub lng: f64,
}

impl RosterEntry {
    pub fn position(&self) -> Point {
        Point::new(self.lat, self.lng)
    }
}

#[derive(Debug, Deserialize)]
struct RosterFeed {
    alfreds: Vec<RosterEntry>,
}

#[derive(Debug, Error)]
pub enum RosterError {
    #[error("roster request failed: {0}")]
    Http(reqwest::Error),
    #[error("roster feed could not be decoded: {0}")]
    Decode(reqwest::Error),
}

/// Thin HTTP client for the read-only driver roster feed. The feed is
/// fetched fresh per request and never cached; callers decide how to
/// degrade when the fetch fails.
#[derive(Debug, Clone)]
pub struct RosterClient {
    client: reqwest::Client,
    url: String,
}

impl RosterClient {
    pub fn new(url: &str, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("failed to build roster client");
        Self {
            client,
            url: url.to_string(),
        }
    }

    /// Fetch the current pool of drivers. Any failure (connect error,
    /// timeout, non-success status, malformed payload) surfaces as an
    /// error; no retries.
    pub async fn fetch(&self) -> Result<Vec<RosterEntry>, RosterError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(RosterError::Http)?;

        let feed: RosterFeed = response.json().await.map_err(RosterError::Decode)?;
        Ok(feed.alfreds)
    }
}

fn id_from_number_or_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrString {
        Number(i64),
        String(String),
    }

    Ok(match NumberOrString::deserialize(deserializer)? {
        NumberOrString::Number(id) => id.to_string(),
        NumberOrString::String(id) => id,
    })
}
