//! Rate limited to 1 request per second per MusicBrainz API policy.

use super::ProviderHit;
use crate::library::{EntityKind, ExternalSource};
use anyhow::{bail, Result};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

const MUSICBRAINZ_API_BASE: &str = "https://musicbrainz.org/ws/2";
const RATE_LIMIT_INTERVAL: Duration = Duration::from_millis(1100); // slightly over 1s for safety

pub struct MusicBrainzClient {
    client: Client,
    last_request: Mutex<Instant>,
}

#[derive(Deserialize)]
struct ArtistSearchResponse {
    #[serde(default)]
    artists: Vec<MbArtist>,
}

#[derive(Deserialize)]
struct MbArtist {
    id: String,
    name: String,
}

#[derive(Deserialize)]
struct ReleaseGroupSearchResponse {
    #[serde(rename = "release-groups", default)]
    release_groups: Vec<MbReleaseGroup>,
}

#[derive(Deserialize)]
struct MbReleaseGroup {
    id: String,
    title: String,
}

impl MusicBrainzClient {
    pub fn new(user_agent: &str) -> Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(MusicBrainzClient {
            client,
            last_request: Mutex::new(Instant::now() - RATE_LIMIT_INTERVAL),
        })
    }

    async fn rate_limit(&self) {
        let mut last = self.last_request.lock().await;
        let elapsed = last.elapsed();
        if elapsed < RATE_LIMIT_INTERVAL {
            tokio::time::sleep(RATE_LIMIT_INTERVAL - elapsed).await;
        }
        *last = Instant::now();
    }

    pub async fn search(&self, kind: EntityKind, query: &str) -> Result<Vec<ProviderHit>> {
        self.rate_limit().await;

        let path = match kind {
            EntityKind::Album => "release-group",
            EntityKind::Artist => "artist",
        };
        let url = format!(
            "{}/{}?query={}&fmt=json&limit=25",
            MUSICBRAINZ_API_BASE,
            path,
            urlencoding::encode(query)
        );
        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            if response.status().as_u16() == 503 {
                // Rate limited anyway, report an empty page rather than failing
                return Ok(vec![]);
            }
            bail!(
                "MusicBrainz search failed with status {}",
                response.status()
            );
        }

        // Cover art lives in a separate service, hits carry no image URL.
        let hits = match kind {
            EntityKind::Album => {
                let body: ReleaseGroupSearchResponse = response.json().await?;
                body.release_groups
                    .into_iter()
                    .map(|group| ProviderHit {
                        kind,
                        source: ExternalSource::Musicbrainz,
                        external_id: group.id,
                        title: Some(group.title),
                        image_url: None,
                    })
                    .collect()
            }
            EntityKind::Artist => {
                let body: ArtistSearchResponse = response.json().await?;
                body.artists
                    .into_iter()
                    .map(|artist| ProviderHit {
                        kind,
                        source: ExternalSource::Musicbrainz,
                        external_id: artist.id,
                        title: Some(artist.name),
                        image_url: None,
                    })
                    .collect()
            }
        };
        Ok(hits)
    }
}
