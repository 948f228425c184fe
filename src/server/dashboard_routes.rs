use super::session::Session;
use super::state::{GuardedDashboardService, ServerState};
use crate::dashboard::{DashboardStats, UserStats};
use crate::error::AppResult;
use crate::library::CollectionItem;
use axum::{extract::State, routing::get, Json, Router};

async fn global_stats(
    _session: Session,
    State(dashboard): State<GuardedDashboardService>,
) -> AppResult<Json<DashboardStats>> {
    Ok(Json(dashboard.global_stats()?))
}

async fn latest_additions(
    _session: Session,
    State(dashboard): State<GuardedDashboardService>,
) -> AppResult<Json<Vec<CollectionItem>>> {
    Ok(Json(dashboard.latest_additions()?))
}

async fn user_stats(
    session: Session,
    State(dashboard): State<GuardedDashboardService>,
) -> AppResult<Json<UserStats>> {
    Ok(Json(dashboard.user_stats(session.user_id)?))
}

pub fn make_dashboard_routes(state: ServerState) -> Router {
    Router::new()
        .route("/stats", get(global_stats))
        .route("/latest", get(latest_additions))
        .route("/me", get(user_stats))
        .with_state(state)
}
