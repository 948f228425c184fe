//! Search proxy towards the external metadata providers. Provider responses
//! are display data only, nothing here touches the local stores.

mod deezer;
mod musicbrainz;

use crate::error::{AppError, AppResult};
use crate::library::{EntityKind, ExternalSource};
pub use deezer::DeezerClient;
pub use musicbrainz::MusicBrainzClient;
use serde::{Deserialize, Serialize};

/// One search result as the frontend feeds it back into the add operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderHit {
    pub kind: EntityKind,
    pub source: ExternalSource,
    pub external_id: String,
    pub title: Option<String>,
    pub image_url: Option<String>,
}

pub struct MetadataService {
    deezer: DeezerClient,
    musicbrainz: MusicBrainzClient,
}

impl MetadataService {
    pub fn new(user_agent: &str) -> anyhow::Result<Self> {
        Ok(MetadataService {
            deezer: DeezerClient::new(user_agent)?,
            musicbrainz: MusicBrainzClient::new(user_agent)?,
        })
    }

    pub async fn search(
        &self,
        source: ExternalSource,
        kind: EntityKind,
        query: &str,
    ) -> AppResult<Vec<ProviderHit>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(AppError::validation("Search query must not be empty"));
        }
        match source {
            ExternalSource::Deezer => Ok(self.deezer.search(kind, query).await?),
            ExternalSource::Musicbrainz => Ok(self.musicbrainz.search(kind, query).await?),
            ExternalSource::Discogs => Err(AppError::validation(
                "Discogs search is not supported, add items by id",
            )),
        }
    }
}
