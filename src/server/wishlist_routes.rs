use super::session::Session;
use super::state::{GuardedLibraryManager, ServerState};
use crate::error::AppResult;
use crate::library::{EntityKind, ExternalRef, ExternalSource, WishlistItem};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

#[derive(Deserialize, Debug)]
struct AddWishlistItemBody {
    kind: EntityKind,
    source: ExternalSource,
    external_id: String,
    title: Option<String>,
    image_url: Option<String>,
}

#[derive(Serialize)]
struct AddWishlistItemResponse {
    item: WishlistItem,
    is_new: bool,
}

#[derive(Serialize)]
struct RemovedResponse {
    removed: bool,
}

async fn list_wishlist(
    session: Session,
    State(library): State<GuardedLibraryManager>,
) -> AppResult<Json<Vec<WishlistItem>>> {
    Ok(Json(library.list_wishlist(session.user_id)?))
}

async fn add_item(
    session: Session,
    State(library): State<GuardedLibraryManager>,
    Json(body): Json<AddWishlistItemBody>,
) -> AppResult<Response> {
    let external_ref = ExternalRef {
        kind: body.kind,
        source: body.source,
        external_id: body.external_id,
        title: body.title,
        image_url: body.image_url,
    };
    let (item, is_new) = library.add_to_wishlist(session.user_id, &external_ref)?;
    let status = if is_new {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(AddWishlistItemResponse { item, is_new })).into_response())
}

async fn remove_item(
    session: Session,
    State(library): State<GuardedLibraryManager>,
    Path(item_id): Path<i64>,
) -> AppResult<Json<RemovedResponse>> {
    let removed = library.remove_from_wishlist(session.user_id, item_id)?;
    Ok(Json(RemovedResponse { removed }))
}

pub fn make_wishlist_routes(state: ServerState) -> Router {
    Router::new()
        .route("/", get(list_wishlist))
        .route("/", post(add_item))
        .route("/{item_id}", delete(remove_item))
        .with_state(state)
}
