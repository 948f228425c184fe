use anyhow::Result;
use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use tracing::error;

use crate::dashboard::DashboardService;
use crate::library::{LibraryManager, LibraryStore};
use crate::metadata::MetadataService;
use crate::places::{PlaceManager, PlaceStore};
use crate::user::{auth::AuthTokenValue, FullUserStore, User, UserManager};
use axum_extra::extract::cookie::{Cookie, SameSite};
use tower_http::services::ServeDir;

use axum::{
    body::Body,
    extract::State,
    http::{response, HeaderValue, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use super::collection_routes::make_collection_routes;
use super::dashboard_routes::make_dashboard_routes;
use super::metadata_routes::make_metadata_routes;
use super::place_routes::make_place_routes;
use super::session::Session;
use super::wishlist_routes::make_wishlist_routes;
use super::{log_requests, state::*, ServerConfig};
use crate::error::AppResult;

#[derive(Serialize)]
struct ServerStats {
    pub uptime: String,
    pub hash: String,
    pub session_token: Option<String>,
}

fn format_uptime(duration: Duration) -> String {
    let total_seconds = duration.as_secs();

    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, seconds)
}

#[derive(Deserialize, Debug)]
struct RegisterBody {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
struct LoginBody {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for LoginBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginBody")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Serialize)]
struct LoginSuccessResponse {
    token: String,
}

async fn home(session: Option<Session>, State(state): State<ServerState>) -> impl IntoResponse {
    let stats = ServerStats {
        uptime: format_uptime(state.start_time.elapsed()),
        hash: state.hash.clone(),
        session_token: session.map(|s| s.token),
    };
    Json(stats)
}

async fn register(
    State(user_manager): State<GuardedUserManager>,
    Json(body): Json<RegisterBody>,
) -> AppResult<(StatusCode, Json<User>)> {
    let user = user_manager.register(&body.username, &body.email, &body.password)?;
    Ok((StatusCode::CREATED, Json(user)))
}

async fn login(
    State(user_manager): State<GuardedUserManager>,
    Json(body): Json<LoginBody>,
) -> Response {
    match user_manager.login(&body.username, &body.password) {
        Ok(Some((_, auth_token))) => {
            let response_body = LoginSuccessResponse {
                token: auth_token.value.0.clone(),
            };
            let response_body = serde_json::to_string(&response_body).unwrap();

            let cookie_value = HeaderValue::from_str(&format!(
                "session_token={}; Path=/; HttpOnly",
                auth_token.value.0
            ))
            .unwrap();
            response::Builder::new()
                .status(StatusCode::CREATED)
                .header(axum::http::header::SET_COOKIE, cookie_value)
                .body(Body::from(response_body))
                .unwrap()
        }
        Ok(None) => StatusCode::UNAUTHORIZED.into_response(),
        Err(err) => {
            error!("Login failed: {}", err);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn logout(State(user_manager): State<GuardedUserManager>, session: Session) -> Response {
    match user_manager.logout(session.user_id, &AuthTokenValue(session.token)) {
        Ok(()) => {
            let cookie_value = Cookie::build(Cookie::new("session_token", ""))
                .path("/")
                .expires(time::OffsetDateTime::now_utc() - time::Duration::days(1)) // Expire it in the past
                .same_site(SameSite::Lax)
                .build();

            response::Builder::new()
                .status(StatusCode::OK)
                .header(axum::http::header::SET_COOKIE, cookie_value.to_string())
                .body(Body::empty())
                .unwrap()
        }
        Err(_) => StatusCode::BAD_REQUEST.into_response(),
    }
}

async fn me(
    State(user_manager): State<GuardedUserManager>,
    session: Session,
) -> AppResult<Json<User>> {
    Ok(Json(user_manager.get_user(session.user_id)?))
}

impl ServerState {
    fn new(
        config: ServerConfig,
        library_manager: LibraryManager,
        user_manager: Arc<UserManager>,
        place_manager: Arc<PlaceManager>,
        dashboard: DashboardService,
        metadata: MetadataService,
    ) -> ServerState {
        ServerState {
            config,
            start_time: Instant::now(),
            library_manager: Arc::new(library_manager),
            user_manager,
            place_manager,
            dashboard: Arc::new(dashboard),
            metadata: Arc::new(metadata),
            hash: env!("GIT_HASH").to_owned(),
        }
    }
}

pub fn make_app(
    config: ServerConfig,
    library_store: Arc<dyn LibraryStore>,
    user_store: Arc<dyn FullUserStore>,
    place_store: Arc<dyn PlaceStore>,
) -> Result<Router> {
    let library_manager = LibraryManager::new(library_store.clone());
    let user_manager = Arc::new(UserManager::new(user_store));
    let place_manager = Arc::new(PlaceManager::new(place_store));
    let dashboard = DashboardService::new(
        library_store,
        place_manager.clone(),
        user_manager.clone(),
    );
    let metadata = MetadataService::new(&config.metadata_user_agent)?;
    let state = ServerState::new(
        config.clone(),
        library_manager,
        user_manager,
        place_manager,
        dashboard,
        metadata,
    );

    let auth_routes: Router = Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", get(logout))
        .route("/me", get(me))
        .with_state(state.clone());

    let home_router: Router = match &config.frontend_dir_path {
        Some(frontend_path) => {
            let static_files_service =
                ServeDir::new(frontend_path).append_index_html_on_directories(true);
            Router::new().fallback_service(static_files_service)
        }
        None => Router::new()
            .route("/", get(home))
            .with_state(state.clone()),
    };

    let mut app: Router = home_router
        .nest("/v1/auth", auth_routes)
        .nest("/v1/collections", make_collection_routes(state.clone()))
        .nest("/v1/wishlist", make_wishlist_routes(state.clone()))
        .nest("/v1/places", make_place_routes(state.clone()))
        .nest("/v1/dashboard", make_dashboard_routes(state.clone()))
        .nest("/v1/metadata", make_metadata_routes(state.clone()));

    app = app.layer(middleware::from_fn_with_state(state, log_requests));

    Ok(app)
}

pub async fn run_server(
    library_store: Arc<dyn LibraryStore>,
    user_store: Arc<dyn FullUserStore>,
    place_store: Arc<dyn PlaceStore>,
    config: ServerConfig,
) -> Result<()> {
    let port = config.port;
    let app = make_app(config, library_store, user_store, place_store)?;

    let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port)).await?;

    Ok(axum::serve(listener, app).await?)
}
