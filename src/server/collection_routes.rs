use super::session::Session;
use super::state::{GuardedLibraryManager, ServerState};
use crate::error::AppResult;
use crate::library::{
    Collection, CollectionItem, CollectionItemMetadata, EntityKind, ExternalRef, ExternalSource,
    VinylState,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};

#[derive(Deserialize, Debug)]
struct CreateCollectionBody {
    name: String,
    description: Option<String>,
    #[serde(default)]
    is_public: bool,
}

#[derive(Deserialize, Debug)]
struct UpdateCollectionBody {
    name: Option<String>,
    description: Option<String>,
    is_public: Option<bool>,
}

#[derive(Deserialize, Debug)]
struct AddItemBody {
    kind: EntityKind,
    source: ExternalSource,
    external_id: String,
    title: Option<String>,
    image_url: Option<String>,
    state_record: Option<VinylState>,
    state_cover: Option<VinylState>,
    acquisition_month_year: Option<String>,
}

#[derive(Serialize)]
struct AddItemResponse {
    item: CollectionItem,
    is_new: bool,
}

#[derive(Serialize)]
struct RemovedResponse {
    removed: bool,
}

#[derive(Deserialize)]
struct ItemsQuery {
    kind: Option<EntityKind>,
}

async fn create_collection(
    session: Session,
    State(library): State<GuardedLibraryManager>,
    Json(body): Json<CreateCollectionBody>,
) -> AppResult<(StatusCode, Json<Collection>)> {
    let collection = library.create_collection(
        session.user_id,
        &body.name,
        body.description.as_deref(),
        body.is_public,
    )?;
    Ok((StatusCode::CREATED, Json(collection)))
}

async fn list_own_collections(
    session: Session,
    State(library): State<GuardedLibraryManager>,
) -> AppResult<Json<Vec<Collection>>> {
    Ok(Json(library.list_own_collections(session.user_id)?))
}

async fn list_public_collections(
    _session: Session,
    State(library): State<GuardedLibraryManager>,
) -> AppResult<Json<Vec<Collection>>> {
    Ok(Json(library.list_public_collections()?))
}

async fn get_collection(
    session: Session,
    State(library): State<GuardedLibraryManager>,
    Path(id): Path<i64>,
) -> AppResult<Json<Collection>> {
    Ok(Json(library.get_collection(session.user_id, id)?))
}

async fn update_collection(
    session: Session,
    State(library): State<GuardedLibraryManager>,
    Path(id): Path<i64>,
    Json(body): Json<UpdateCollectionBody>,
) -> AppResult<Json<Collection>> {
    Ok(Json(library.update_collection(
        session.user_id,
        id,
        body.name.as_deref(),
        body.description.as_deref(),
        body.is_public,
    )?))
}

async fn delete_collection(
    session: Session,
    State(library): State<GuardedLibraryManager>,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    library.delete_collection(session.user_id, id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_items(
    session: Session,
    State(library): State<GuardedLibraryManager>,
    Path(id): Path<i64>,
    Query(query): Query<ItemsQuery>,
) -> AppResult<Json<Vec<CollectionItem>>> {
    Ok(Json(library.list_collection_items(
        session.user_id,
        id,
        query.kind,
    )?))
}

async fn add_item(
    session: Session,
    State(library): State<GuardedLibraryManager>,
    Path(id): Path<i64>,
    Json(body): Json<AddItemBody>,
) -> AppResult<Response> {
    let external_ref = ExternalRef {
        kind: body.kind,
        source: body.source,
        external_id: body.external_id,
        title: body.title,
        image_url: body.image_url,
    };
    let metadata = CollectionItemMetadata {
        state_record: body.state_record,
        state_cover: body.state_cover,
        acquisition_month_year: body.acquisition_month_year,
    };
    let (item, is_new) = library.add_to_collection(session.user_id, id, &external_ref, &metadata)?;
    let status = if is_new {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(AddItemResponse { item, is_new })).into_response())
}

async fn remove_item(
    session: Session,
    State(library): State<GuardedLibraryManager>,
    Path((id, kind, source, external_id)): Path<(i64, EntityKind, ExternalSource, String)>,
) -> AppResult<Json<RemovedResponse>> {
    let external_ref = ExternalRef {
        kind,
        source,
        external_id,
        title: None,
        image_url: None,
    };
    let removed = library.remove_from_collection(session.user_id, id, &external_ref)?;
    Ok(Json(RemovedResponse { removed }))
}

pub fn make_collection_routes(state: ServerState) -> Router {
    Router::new()
        .route("/", post(create_collection))
        .route("/", get(list_own_collections))
        .route("/public", get(list_public_collections))
        .route("/{id}", get(get_collection))
        .route("/{id}", put(update_collection))
        .route("/{id}", delete(delete_collection))
        .route("/{id}/items", get(list_items))
        .route("/{id}/items", post(add_item))
        .route(
            "/{id}/items/{kind}/{source}/{external_id}",
            delete(remove_item),
        )
        .with_state(state)
}
