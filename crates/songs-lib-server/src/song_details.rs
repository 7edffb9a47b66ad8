//! HTTP client for the song info lookup API.
//!
//! One GET per song creation; no retries and a single client-wide timeout.

use std::time::Duration;

use anyhow::anyhow;

use crate::error::DetailsError;
use crate::models::SongDetails;
use crate::song_service::SongDetailsProvider;

/// Client for `GET {base_url}/info?group=..&song=..`.
#[derive(Clone)]
pub struct SongDetailsClient {
    base_url: String,
    agent: ureq::Agent,
}

impl SongDetailsClient {
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .build();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            agent: ureq::Agent::new_with_config(config),
        }
    }

    fn info_url(&self, group: &str, song: &str) -> String {
        format!(
            "{}/info?group={}&song={}",
            self.base_url,
            urlencoding::encode(group),
            urlencoding::encode(song)
        )
    }
}

impl SongDetailsProvider for SongDetailsClient {
    fn fetch_song_details(&self, group: &str, song: &str) -> Result<SongDetails, DetailsError> {
        let url = self.info_url(group, song);
        tracing::info!(url = %url, "fetching song details");

        let mut resp = self.agent.get(&url).call().map_err(|err| {
            tracing::error!(url = %url, error = %err, "song details request failed");
            anyhow!("song details request failed (transport) url={url}: {err}")
        })?;

        let code = resp.status().as_u16();
        match code {
            200..=299 => {}
            400 => {
                tracing::error!(url = %url, status = code, "song details request rejected");
                return Err(DetailsError::BadRequest);
            }
            500 => {
                tracing::error!(url = %url, status = code, "song details upstream error");
                return Err(DetailsError::Internal);
            }
            _ => {
                tracing::error!(url = %url, status = code, "song details unexpected status");
                return Err(anyhow!("song details request failed (status {code}) url={url}").into());
            }
        }

        resp.body_mut().read_json::<SongDetails>().map_err(|err| {
            tracing::error!(url = %url, error = %err, "failed to decode song details");
            DetailsError::Other(anyhow!("song details decode failed: {err}"))
        })
    }
}
