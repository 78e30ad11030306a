//! Shared constants for end-to-end tests
//!
//! When the seeded data changes, update only this file and `fixtures.rs`.

// ============================================================================
// Seeded Users
// ============================================================================

/// Has a profile whose vector is close to Bob's.
pub const ALICE_HANDLE: &str = "alice";
pub const ALICE_ID: usize = 1;
pub const ALICE_VECTOR: [f64; 3] = [1.0, 0.0, 0.5];

pub const BOB_HANDLE: &str = "bob";
pub const BOB_ID: usize = 2;
pub const BOB_VECTOR: [f64; 3] = [0.9, 0.1, 0.5];

/// Orthogonal to Alice.
pub const CAROL_HANDLE: &str = "carol";
pub const CAROL_ID: usize = 3;
pub const CAROL_VECTOR: [f64; 3] = [0.0, 1.0, 0.0];

/// Profile with a corrupted vector payload.
pub const DAVE_HANDLE: &str = "dave";
pub const DAVE_ID: usize = 4;
pub const DAVE_RAW_VECTOR: &str = "not-json";

/// No profile at all.
pub const ERIN_HANDLE: &str = "erin";
pub const ERIN_ID: usize = 5;

/// Id that no seeded row uses.
pub const MISSING_ID: usize = 9999;

// ============================================================================
// Seeded Songs
// ============================================================================

pub const SONG_1_ID: usize = 1;
pub const SONG_1_TITLE: &str = "Opening Track";
pub const SONG_2_ID: usize = 2;
pub const SONG_2_TITLE: &str = "Smooth Jazz";
pub const SONG_3_ID: usize = 3;
pub const SONG_3_TITLE: &str = "Closing Track";

// ============================================================================
// Onboarding Questions
// ============================================================================

pub const SEEDED_QUESTION_COUNT: usize = 3;

// ============================================================================
// Capacity Limits
// ============================================================================

pub const MAX_PLAYLISTS_PER_USER: usize = 40;
pub const MAX_PLAYLIST_ITEMS: usize = 500;

// ============================================================================
// Timeouts
// ============================================================================

/// Maximum time to wait for server to become ready (milliseconds)
pub const SERVER_READY_TIMEOUT_MS: u64 = 5000;

/// Timeout for individual HTTP requests (seconds)
pub const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Polling interval when waiting for server ready (milliseconds)
pub const SERVER_READY_POLL_INTERVAL_MS: u64 = 50;
