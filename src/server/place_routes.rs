use super::session::{AdminSession, Session};
use super::state::{GuardedPlaceManager, ServerState};
use crate::error::AppResult;
use crate::places::{ModerationStatus, NewPlace, Place};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use serde::Serialize;
use tracing::info;

#[derive(Serialize)]
struct LikedResponse {
    liked: bool,
}

async fn list_approved(
    _session: Session,
    State(places): State<GuardedPlaceManager>,
) -> AppResult<Json<Vec<Place>>> {
    Ok(Json(places.list_approved()?))
}

async fn list_own(
    session: Session,
    State(places): State<GuardedPlaceManager>,
) -> AppResult<Json<Vec<Place>>> {
    Ok(Json(places.list_own(session.user_id)?))
}

async fn submit_place(
    session: Session,
    State(places): State<GuardedPlaceManager>,
    Json(body): Json<NewPlace>,
) -> AppResult<(StatusCode, Json<Place>)> {
    let place = places.submit_place(session.user_id, &body)?;
    Ok((StatusCode::CREATED, Json(place)))
}

async fn get_place(
    session: Session,
    State(places): State<GuardedPlaceManager>,
    Path(id): Path<i64>,
) -> AppResult<Json<Place>> {
    Ok(Json(places.get_place(session.user_id, id)?))
}

async fn delete_place(
    session: Session,
    State(places): State<GuardedPlaceManager>,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    places.delete_own_place(session.user_id, id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn like_place(
    session: Session,
    State(places): State<GuardedPlaceManager>,
    Path(id): Path<i64>,
) -> AppResult<Json<LikedResponse>> {
    places.like(session.user_id, id)?;
    Ok(Json(LikedResponse { liked: true }))
}

async fn unlike_place(
    session: Session,
    State(places): State<GuardedPlaceManager>,
    Path(id): Path<i64>,
) -> AppResult<Json<LikedResponse>> {
    places.unlike(session.user_id, id)?;
    Ok(Json(LikedResponse { liked: false }))
}

async fn list_pending(
    _session: AdminSession,
    State(places): State<GuardedPlaceManager>,
) -> AppResult<Json<Vec<Place>>> {
    Ok(Json(places.list_pending()?))
}

async fn approve_place(
    AdminSession(session): AdminSession,
    State(places): State<GuardedPlaceManager>,
    Path(id): Path<i64>,
) -> AppResult<Json<Place>> {
    let place = places.moderate(id, ModerationStatus::Approved)?;
    info!("Place {} approved by user_id={}", id, session.user_id);
    Ok(Json(place))
}

async fn reject_place(
    AdminSession(session): AdminSession,
    State(places): State<GuardedPlaceManager>,
    Path(id): Path<i64>,
) -> AppResult<Json<Place>> {
    let place = places.moderate(id, ModerationStatus::Rejected)?;
    info!("Place {} rejected by user_id={}", id, session.user_id);
    Ok(Json(place))
}

pub fn make_place_routes(state: ServerState) -> Router {
    Router::new()
        .route("/", get(list_approved))
        .route("/", post(submit_place))
        .route("/mine", get(list_own))
        .route("/{id}", get(get_place))
        .route("/{id}", delete(delete_place))
        .route("/{id}/like", post(like_place))
        .route("/{id}/like", delete(unlike_place))
        .route("/moderation/pending", get(list_pending))
        .route("/moderation/{id}/approve", post(approve_place))
        .route("/moderation/{id}/reject", post(reject_place))
        .with_state(state)
}
