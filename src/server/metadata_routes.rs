use super::session::Session;
use super::state::{GuardedMetadataService, ServerState};
use crate::error::AppResult;
use crate::library::{EntityKind, ExternalSource};
use crate::metadata::ProviderHit;
use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;

#[derive(Deserialize, Debug)]
struct SearchQuery {
    source: ExternalSource,
    kind: EntityKind,
    q: String,
}

async fn search(
    _session: Session,
    State(metadata): State<GuardedMetadataService>,
    Query(query): Query<SearchQuery>,
) -> AppResult<Json<Vec<ProviderHit>>> {
    Ok(Json(
        metadata.search(query.source, query.kind, &query.q).await?,
    ))
}

pub fn make_metadata_routes(state: ServerState) -> Router {
    Router::new().route("/search", get(search)).with_state(state)
}
