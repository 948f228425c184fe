//! HTTP client for end-to-end tests
//!
//! High-level wrapper around reqwest with methods for all server endpoints.
//! When API routes or request formats change, update only this file.

use super::constants::*;
use reqwest::Response;
use serde_json::{json, Value};
use std::time::Duration;

/// HTTP test client with cookie-based session management
pub struct TestClient {
    /// The underlying reqwest client (public for custom requests in tests)
    pub client: reqwest::Client,
    /// The base URL of the test server
    pub base_url: String,
}

#[allow(dead_code)]
impl TestClient {
    /// Creates a new unauthenticated client
    ///
    /// Use this for testing authentication flows.
    /// For most tests, use `authenticated()` or `authenticated_admin()` instead.
    pub fn new(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .cookie_store(true) // Automatically handle session cookies
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build reqwest client");

        Self { client, base_url }
    }

    /// Creates a client pre-authenticated as the regular test user
    pub async fn authenticated(base_url: String) -> Self {
        Self::authenticated_as(base_url, TEST_USER, TEST_PASS).await
    }

    /// Creates a client pre-authenticated as the second test user
    pub async fn authenticated_other(base_url: String) -> Self {
        Self::authenticated_as(base_url, OTHER_USER, OTHER_PASS).await
    }

    /// Creates a client pre-authenticated as the admin test user
    pub async fn authenticated_admin(base_url: String) -> Self {
        Self::authenticated_as(base_url, ADMIN_USER, ADMIN_PASS).await
    }

    async fn authenticated_as(base_url: String, username: &str, password: &str) -> Self {
        let client = Self::new(base_url);
        let response = client.login(username, password).await;
        assert_eq!(
            response.status(),
            reqwest::StatusCode::CREATED,
            "Authentication as {} failed: {:?}",
            username,
            response.text().await
        );
        client
    }

    // ========================================================================
    // Authentication Endpoints
    // ========================================================================

    /// POST /v1/auth/register
    pub async fn register(&self, username: &str, email: &str, password: &str) -> Response {
        self.client
            .post(format!("{}/v1/auth/register", self.base_url))
            .json(&json!({
                "username": username,
                "email": email,
                "password": password,
            }))
            .send()
            .await
            .expect("Register request failed")
    }

    /// POST /v1/auth/login
    pub async fn login(&self, username: &str, password: &str) -> Response {
        self.client
            .post(format!("{}/v1/auth/login", self.base_url))
            .json(&json!({
                "username": username,
                "password": password,
            }))
            .send()
            .await
            .expect("Login request failed")
    }

    /// GET /v1/auth/logout
    pub async fn logout(&self) -> Response {
        self.client
            .get(format!("{}/v1/auth/logout", self.base_url))
            .send()
            .await
            .expect("Logout request failed")
    }

    /// GET /v1/auth/me
    pub async fn me(&self) -> Response {
        self.client
            .get(format!("{}/v1/auth/me", self.base_url))
            .send()
            .await
            .expect("Me request failed")
    }

    // ========================================================================
    // Collection Endpoints
    // ========================================================================

    /// POST /v1/collections
    pub async fn create_collection(&self, name: &str, is_public: bool) -> Response {
        self.client
            .post(format!("{}/v1/collections", self.base_url))
            .json(&json!({
                "name": name,
                "is_public": is_public,
            }))
            .send()
            .await
            .expect("Create collection request failed")
    }

    /// GET /v1/collections
    pub async fn list_own_collections(&self) -> Response {
        self.client
            .get(format!("{}/v1/collections", self.base_url))
            .send()
            .await
            .expect("List collections request failed")
    }

    /// GET /v1/collections/public
    pub async fn list_public_collections(&self) -> Response {
        self.client
            .get(format!("{}/v1/collections/public", self.base_url))
            .send()
            .await
            .expect("List public collections request failed")
    }

    /// GET /v1/collections/{id}
    pub async fn get_collection(&self, id: i64) -> Response {
        self.client
            .get(format!("{}/v1/collections/{}", self.base_url, id))
            .send()
            .await
            .expect("Get collection request failed")
    }

    /// PUT /v1/collections/{id}
    pub async fn update_collection(&self, id: i64, body: Value) -> Response {
        self.client
            .put(format!("{}/v1/collections/{}", self.base_url, id))
            .json(&body)
            .send()
            .await
            .expect("Update collection request failed")
    }

    /// DELETE /v1/collections/{id}
    pub async fn delete_collection(&self, id: i64) -> Response {
        self.client
            .delete(format!("{}/v1/collections/{}", self.base_url, id))
            .send()
            .await
            .expect("Delete collection request failed")
    }

    /// POST /v1/collections/{id}/items with the default test album
    pub async fn add_album_to_collection(&self, id: i64, external_id: &str) -> Response {
        self.add_item_to_collection(
            id,
            json!({
                "kind": "album",
                "source": "discogs",
                "external_id": external_id,
                "title": ALBUM_1_TITLE,
            }),
        )
        .await
    }

    /// POST /v1/collections/{id}/items
    pub async fn add_item_to_collection(&self, id: i64, body: Value) -> Response {
        self.client
            .post(format!("{}/v1/collections/{}/items", self.base_url, id))
            .json(&body)
            .send()
            .await
            .expect("Add collection item request failed")
    }

    /// GET /v1/collections/{id}/items
    pub async fn list_collection_items(&self, id: i64) -> Response {
        self.client
            .get(format!("{}/v1/collections/{}/items", self.base_url, id))
            .send()
            .await
            .expect("List collection items request failed")
    }

    /// DELETE /v1/collections/{id}/items/{kind}/{source}/{external_id}
    pub async fn remove_item_from_collection(
        &self,
        id: i64,
        kind: &str,
        source: &str,
        external_id: &str,
    ) -> Response {
        self.client
            .delete(format!(
                "{}/v1/collections/{}/items/{}/{}/{}",
                self.base_url, id, kind, source, external_id
            ))
            .send()
            .await
            .expect("Remove collection item request failed")
    }

    // ========================================================================
    // Wishlist Endpoints
    // ========================================================================

    /// GET /v1/wishlist
    pub async fn list_wishlist(&self) -> Response {
        self.client
            .get(format!("{}/v1/wishlist", self.base_url))
            .send()
            .await
            .expect("List wishlist request failed")
    }

    /// POST /v1/wishlist with the default test album
    pub async fn add_album_to_wishlist(&self, external_id: &str) -> Response {
        self.add_item_to_wishlist(json!({
            "kind": "album",
            "source": "discogs",
            "external_id": external_id,
            "title": ALBUM_1_TITLE,
        }))
        .await
    }

    /// POST /v1/wishlist
    pub async fn add_item_to_wishlist(&self, body: Value) -> Response {
        self.client
            .post(format!("{}/v1/wishlist", self.base_url))
            .json(&body)
            .send()
            .await
            .expect("Add wishlist item request failed")
    }

    /// DELETE /v1/wishlist/{item_id}
    pub async fn remove_item_from_wishlist(&self, item_id: i64) -> Response {
        self.client
            .delete(format!("{}/v1/wishlist/{}", self.base_url, item_id))
            .send()
            .await
            .expect("Remove wishlist item request failed")
    }

    // ========================================================================
    // Place Endpoints
    // ========================================================================

    /// POST /v1/places
    pub async fn submit_place(&self, name: &str) -> Response {
        self.client
            .post(format!("{}/v1/places", self.base_url))
            .json(&json!({
                "name": name,
                "city": "Torino",
                "country": "Italy",
                "latitude": 45.07,
                "longitude": 7.68,
                "kind": "shop",
            }))
            .send()
            .await
            .expect("Submit place request failed")
    }

    /// GET /v1/places
    pub async fn list_places(&self) -> Response {
        self.client
            .get(format!("{}/v1/places", self.base_url))
            .send()
            .await
            .expect("List places request failed")
    }

    /// GET /v1/places/{id}
    pub async fn get_place(&self, id: i64) -> Response {
        self.client
            .get(format!("{}/v1/places/{}", self.base_url, id))
            .send()
            .await
            .expect("Get place request failed")
    }

    /// GET /v1/places/moderation/pending
    pub async fn list_pending_places(&self) -> Response {
        self.client
            .get(format!("{}/v1/places/moderation/pending", self.base_url))
            .send()
            .await
            .expect("List pending places request failed")
    }

    /// POST /v1/places/moderation/{id}/approve
    pub async fn approve_place(&self, id: i64) -> Response {
        self.client
            .post(format!(
                "{}/v1/places/moderation/{}/approve",
                self.base_url, id
            ))
            .send()
            .await
            .expect("Approve place request failed")
    }

    /// POST /v1/places/moderation/{id}/reject
    pub async fn reject_place(&self, id: i64) -> Response {
        self.client
            .post(format!(
                "{}/v1/places/moderation/{}/reject",
                self.base_url, id
            ))
            .send()
            .await
            .expect("Reject place request failed")
    }

    /// POST /v1/places/{id}/like
    pub async fn like_place(&self, id: i64) -> Response {
        self.client
            .post(format!("{}/v1/places/{}/like", self.base_url, id))
            .send()
            .await
            .expect("Like place request failed")
    }

    /// DELETE /v1/places/{id}/like
    pub async fn unlike_place(&self, id: i64) -> Response {
        self.client
            .delete(format!("{}/v1/places/{}/like", self.base_url, id))
            .send()
            .await
            .expect("Unlike place request failed")
    }

    // ========================================================================
    // Dashboard Endpoints
    // ========================================================================

    /// GET /v1/dashboard/stats
    pub async fn dashboard_stats(&self) -> Response {
        self.client
            .get(format!("{}/v1/dashboard/stats", self.base_url))
            .send()
            .await
            .expect("Dashboard stats request failed")
    }

    /// GET /v1/dashboard/latest
    pub async fn dashboard_latest(&self) -> Response {
        self.client
            .get(format!("{}/v1/dashboard/latest", self.base_url))
            .send()
            .await
            .expect("Dashboard latest request failed")
    }

    /// GET /v1/dashboard/me
    pub async fn dashboard_me(&self) -> Response {
        self.client
            .get(format!("{}/v1/dashboard/me", self.base_url))
            .send()
            .await
            .expect("Dashboard me request failed")
    }
}
