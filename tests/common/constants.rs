//! Shared constants for end-to-end tests
//!
//! This module contains all constants used across the test suite.
//! When test data changes (user credentials, external ids, etc.),
//! update only this file.

// ============================================================================
// Test User Credentials
// ============================================================================

/// Regular test user
pub const TEST_USER: &str = "testuser";
pub const TEST_EMAIL: &str = "testuser@example.com";
pub const TEST_PASS: &str = "testpass123";

/// Second regular test user, for ownership checks
pub const OTHER_USER: &str = "otheruser";
pub const OTHER_EMAIL: &str = "otheruser@example.com";
pub const OTHER_PASS: &str = "otherpass123";

/// Admin test user
pub const ADMIN_USER: &str = "admin";
pub const ADMIN_EMAIL: &str = "admin@example.com";
pub const ADMIN_PASS: &str = "adminpass123";

// ============================================================================
// Test External References
// ============================================================================

/// Discogs release id used as the default test album
pub const ALBUM_1_EXTERNAL_ID: &str = "1475243";
pub const ALBUM_1_TITLE: &str = "OK Computer";

/// Second Discogs release id
pub const ALBUM_2_EXTERNAL_ID: &str = "367084";
pub const ALBUM_2_TITLE: &str = "In Rainbows";

/// MusicBrainz artist id
pub const ARTIST_1_EXTERNAL_ID: &str = "a74b1b7f-71a5-4011-9441-d0b5e4122711";
pub const ARTIST_1_NAME: &str = "Radiohead";

// ============================================================================
// Test Timeouts and Configuration
// ============================================================================

/// Maximum time to wait for server to become ready (milliseconds)
pub const SERVER_READY_TIMEOUT_MS: u64 = 5000;

/// Timeout for individual HTTP requests (seconds)
pub const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Polling interval when waiting for server ready (milliseconds)
pub const SERVER_READY_POLL_INTERVAL_MS: u64 = 50;
