//! Test server lifecycle management
//!
//! Each test gets an isolated server with its own databases on a random port.
//! When dropped, the server shuts down and temp resources are cleaned up.

use super::constants::*;
use super::fixtures::create_test_stores;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::TcpListener;
use vinylkeeper_server::server::server::make_app;
use vinylkeeper_server::server::{RequestsLoggingLevel, ServerConfig};
use vinylkeeper_server::user::{FullUserStore, SqliteUserStore};

pub struct TestServer {
    /// Base URL for making requests (e.g., "http://127.0.0.1:12345")
    pub base_url: String,

    pub port: u16,

    /// User store for direct database access in tests
    pub user_store: Arc<SqliteUserStore>,

    // Private fields - keep resources alive until drop
    _temp_db_dir: TempDir,
    _shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl TestServer {
    /// Spawns a new test server on a random port with the standard test
    /// users already registered.
    pub async fn spawn() -> Self {
        let (temp_db_dir, stores) = create_test_stores().expect("Failed to create test stores");
        let user_store_for_test = stores.users.clone();

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let port = listener
            .local_addr()
            .expect("Failed to get local address")
            .port();
        let base_url = format!("http://127.0.0.1:{}", port);

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

        let config = ServerConfig {
            port,
            requests_logging_level: RequestsLoggingLevel::None,
            frontend_dir_path: None,
            ..ServerConfig::default()
        };

        let app = make_app(
            config,
            stores.library,
            stores.users as Arc<dyn FullUserStore>,
            stores.places,
        )
        .expect("Failed to build app");

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .expect("Server failed");
        });

        let server = Self {
            base_url,
            port,
            user_store: user_store_for_test,
            _temp_db_dir: temp_db_dir,
            _shutdown_tx: Some(shutdown_tx),
        };

        server.wait_for_ready().await;

        server
    }

    /// Waits for the server to become ready by polling the home endpoint.
    async fn wait_for_ready(&self) {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(100))
            .build()
            .expect("Failed to build reqwest client");

        let start = std::time::Instant::now();
        let timeout = Duration::from_millis(SERVER_READY_TIMEOUT_MS);

        loop {
            if start.elapsed() > timeout {
                panic!("Server did not become ready within {:?}", timeout);
            }
            if let Ok(response) = client.get(&self.base_url).send().await {
                if response.status().is_success() {
                    return;
                }
            }
            tokio::time::sleep(Duration::from_millis(SERVER_READY_POLL_INTERVAL_MS)).await;
        }
    }
}
