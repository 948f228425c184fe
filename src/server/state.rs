use axum::extract::FromRef;

use crate::dashboard::DashboardService;
use crate::library::LibraryManager;
use crate::metadata::MetadataService;
use crate::places::PlaceManager;
use crate::user::UserManager;
use std::sync::Arc;
use std::time::Instant;

use super::ServerConfig;

pub type GuardedLibraryManager = Arc<LibraryManager>;
pub type GuardedUserManager = Arc<UserManager>;
pub type GuardedPlaceManager = Arc<PlaceManager>;
pub type GuardedDashboardService = Arc<DashboardService>;
pub type GuardedMetadataService = Arc<MetadataService>;

#[derive(Clone)]
pub struct ServerState {
    pub config: ServerConfig,
    pub start_time: Instant,
    pub library_manager: GuardedLibraryManager,
    pub user_manager: GuardedUserManager,
    pub place_manager: GuardedPlaceManager,
    pub dashboard: GuardedDashboardService,
    pub metadata: GuardedMetadataService,
    pub hash: String,
}

impl FromRef<ServerState> for GuardedLibraryManager {
    fn from_ref(input: &ServerState) -> Self {
        input.library_manager.clone()
    }
}

impl FromRef<ServerState> for GuardedUserManager {
    fn from_ref(input: &ServerState) -> Self {
        input.user_manager.clone()
    }
}

impl FromRef<ServerState> for GuardedPlaceManager {
    fn from_ref(input: &ServerState) -> Self {
        input.place_manager.clone()
    }
}

impl FromRef<ServerState> for GuardedDashboardService {
    fn from_ref(input: &ServerState) -> Self {
        input.dashboard.clone()
    }
}

impl FromRef<ServerState> for GuardedMetadataService {
    fn from_ref(input: &ServerState) -> Self {
        input.metadata.clone()
    }
}

impl FromRef<ServerState> for ServerConfig {
    fn from_ref(input: &ServerState) -> Self {
        input.config.clone()
    }
}
