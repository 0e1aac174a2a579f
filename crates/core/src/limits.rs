//! Size and time limits for the capture engine.
//!
//! These caps bound memory use on the ingest path. Field-level string caps
//! are duplicated in `#[validate]` attributes because the derive macro needs
//! literals; keep both in sync when changing one.

// === Batch limits ===

/// Maximum interaction-batch payload size in bytes (1MB).
pub const MAX_BATCH_SIZE_BYTES: usize = 1024 * 1024;

/// Maximum interaction events per batch.
pub const MAX_BATCH_EVENTS: usize = 500;

// === Session chunk limits ===

/// Maximum session-chunk upload size in bytes (4MB).
///
/// Replay chunks are compressed client-side; 4MB covers several minutes of
/// dense recording on media-heavy pages.
pub const MAX_CHUNK_SIZE_BYTES: usize = 4 * 1024 * 1024;

/// Maximum console log entries accepted per chunk upload.
pub const MAX_CONSOLE_LOGS_PER_UPLOAD: usize = 200;

/// Maximum network request entries accepted per chunk upload.
pub const MAX_NETWORK_REQUESTS_PER_UPLOAD: usize = 200;

// === String field limits (chars) ===

/// Page URL max length. Matches typical browser URL limits.
pub const MAX_URL_LEN: usize = 2048;

/// User ID max length (UUIDs=36, emails=~50, custom IDs up to 128).
pub const MAX_USER_ID_LEN: usize = 128;

/// Custom event name max length.
pub const MAX_EVENT_NAME_LEN: usize = 100;

/// Element text sample max length (truncated client-side).
pub const MAX_ELEMENT_TEXT_LEN: usize = 200;

/// Element selector / signature max length.
pub const MAX_SELECTOR_LEN: usize = 256;

// === Timestamp bounds ===

/// Maximum allowed clock skew for future timestamps (seconds).
pub const MAX_FUTURE_SKEW_SECS: i64 = 5;

/// Maximum age for stale events (hours).
pub const MAX_EVENT_AGE_HOURS: i64 = 24;
