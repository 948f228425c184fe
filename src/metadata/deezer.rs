use super::ProviderHit;
use crate::library::{EntityKind, ExternalSource};
use anyhow::{bail, Result};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

const DEEZER_API_BASE: &str = "https://api.deezer.com";

pub struct DeezerClient {
    client: Client,
}

#[derive(Deserialize)]
struct SearchResponse<T> {
    #[serde(default = "Vec::new")]
    data: Vec<T>,
}

#[derive(Deserialize)]
struct DeezerAlbum {
    id: u64,
    title: String,
    cover_medium: Option<String>,
}

#[derive(Deserialize)]
struct DeezerArtist {
    id: u64,
    name: String,
    picture_medium: Option<String>,
}

impl DeezerClient {
    pub fn new(user_agent: &str) -> Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(DeezerClient { client })
    }

    pub async fn search(&self, kind: EntityKind, query: &str) -> Result<Vec<ProviderHit>> {
        let path = match kind {
            EntityKind::Album => "search/album",
            EntityKind::Artist => "search/artist",
        };
        let url = format!(
            "{}/{}?q={}&limit=25",
            DEEZER_API_BASE,
            path,
            urlencoding::encode(query)
        );
        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            bail!("Deezer search failed with status {}", response.status());
        }

        let hits = match kind {
            EntityKind::Album => {
                let body: SearchResponse<DeezerAlbum> = response.json().await?;
                body.data
                    .into_iter()
                    .map(|album| ProviderHit {
                        kind,
                        source: ExternalSource::Deezer,
                        external_id: album.id.to_string(),
                        title: Some(album.title),
                        image_url: album.cover_medium,
                    })
                    .collect()
            }
            EntityKind::Artist => {
                let body: SearchResponse<DeezerArtist> = response.json().await?;
                body.data
                    .into_iter()
                    .map(|artist| ProviderHit {
                        kind,
                        source: ExternalSource::Deezer,
                        external_id: artist.id.to_string(),
                        title: Some(artist.name),
                        image_url: artist.picture_medium,
                    })
                    .collect()
            }
        };
        Ok(hits)
    }
}
