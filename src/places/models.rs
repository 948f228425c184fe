use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaceKind {
    Shop,
    FleaMarket,
    Venue,
    Other,
}

impl PlaceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            PlaceKind::Shop => "shop",
            PlaceKind::FleaMarket => "flea_market",
            PlaceKind::Venue => "venue",
            PlaceKind::Other => "other",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "shop" => Some(PlaceKind::Shop),
            "flea_market" => Some(PlaceKind::FleaMarket),
            "venue" => Some(PlaceKind::Venue),
            "other" => Some(PlaceKind::Other),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModerationStatus {
    Pending,
    Approved,
    Rejected,
}

impl ModerationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ModerationStatus::Pending => "pending",
            ModerationStatus::Approved => "approved",
            ModerationStatus::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(ModerationStatus::Pending),
            "approved" => Some(ModerationStatus::Approved),
            "rejected" => Some(ModerationStatus::Rejected),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Place {
    pub id: i64,
    pub submitted_by: i64,
    pub name: String,
    pub description: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub kind: PlaceKind,
    pub status: ModerationStatus,
    pub likes: i64,
    pub created_at: i64,
}

/// Submission payload, before moderation fields exist.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPlace {
    pub name: String,
    pub description: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub kind: PlaceKind,
}
