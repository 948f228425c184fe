use serde::{Deserialize, Serialize};

/// Kind of an externally-sourced catalogue entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Album,
    Artist,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Album => "album",
            EntityKind::Artist => "artist",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "album" => Some(EntityKind::Album),
            "artist" => Some(EntityKind::Artist),
            _ => None,
        }
    }
}

/// Upstream metadata provider and its id namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExternalSource {
    Discogs,
    Musicbrainz,
    Deezer,
}

impl ExternalSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExternalSource::Discogs => "discogs",
            ExternalSource::Musicbrainz => "musicbrainz",
            ExternalSource::Deezer => "deezer",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "discogs" => Some(ExternalSource::Discogs),
            "musicbrainz" => Some(ExternalSource::Musicbrainz),
            "deezer" => Some(ExternalSource::Deezer),
            _ => None,
        }
    }
}

/// Physical condition grading for a vinyl record or its sleeve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VinylState {
    Mint,
    NearMint,
    VeryGood,
    Good,
    Fair,
    Poor,
}

impl VinylState {
    pub fn as_str(&self) -> &'static str {
        match self {
            VinylState::Mint => "mint",
            VinylState::NearMint => "near_mint",
            VinylState::VeryGood => "very_good",
            VinylState::Good => "good",
            VinylState::Fair => "fair",
            VinylState::Poor => "poor",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "mint" => Some(VinylState::Mint),
            "near_mint" => Some(VinylState::NearMint),
            "very_good" => Some(VinylState::VeryGood),
            "good" => Some(VinylState::Good),
            "fair" => Some(VinylState::Fair),
            "poor" => Some(VinylState::Poor),
            _ => None,
        }
    }
}

/// A provider-side reference to an album or artist, as supplied by the
/// caller when adding to a wishlist or collection. Display fields are
/// optional and only used when the entity row does not exist yet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExternalRef {
    pub kind: EntityKind,
    pub source: ExternalSource,
    pub external_id: String,
    pub title: Option<String>,
    pub image_url: Option<String>,
}

/// A locally cached row for an externally-sourced album or artist.
///
/// Entity rows are shared reference data: created lazily on first use,
/// never deleted, display fields first-write-wins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    pub id: i64,
    pub kind: EntityKind,
    pub source: ExternalSource,
    pub external_id: String,
    pub title: Option<String>,
    pub image_url: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Outcome of attempting to insert an entity row. `AlreadyExists` is the
/// expected concurrent-creation race, not a failure: the caller re-reads.
#[derive(Debug)]
pub enum EntityInsert {
    Inserted(Entity),
    AlreadyExists,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Collection {
    pub id: i64,
    pub owner_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub is_public: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Per-membership metadata. All fields optional; on re-add only the
/// supplied fields overwrite the stored ones.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CollectionItemMetadata {
    pub state_record: Option<VinylState>,
    pub state_cover: Option<VinylState>,
    /// Acquisition month, `YYYY-MM`.
    pub acquisition_month_year: Option<String>,
}

/// A membership row joining a collection to an entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionItem {
    pub collection_id: i64,
    pub entity: Entity,
    pub state_record: Option<VinylState>,
    pub state_cover: Option<VinylState>,
    pub acquisition_month_year: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WishlistItem {
    pub id: i64,
    pub user_id: i64,
    pub entity: Entity,
    pub created_at: i64,
}
