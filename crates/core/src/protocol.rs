//! Wire-level constants shared with the gateway backend.
//!
//! Paths are expressed as segment lists so they can be appended to any base
//! URL, including ones mounted under a prefix such as `/backend`.

/// Request header carrying the CSRF token.
pub const CSRF_HEADER: &str = "X-SGCsrf-Token";

/// Exact message the gateway returns for a stale or missing CSRF token.
pub const CSRF_SENTINEL: &str = "CSRF validation failed";

/// Mutation attempts per guarded call: the first plus one retry.
pub const MAX_ATTEMPTS: u32 = 2;

pub const CONTENT_TYPE_JSON: &str = "application/json";

// ---------------------------------------------------------------------------
// Endpoints
// ---------------------------------------------------------------------------

pub const TOKEN_PATH: &[&str] = &["secure-gateway-c"];
pub const SESSION_PATH: &[&str] = &["api", "v1", "auth", "get-session"];
pub const LOGIN_PATH: &[&str] = &["api", "v1", "auth", "login"];
pub const LOGOUT_PATH: &[&str] = &["api", "v1", "auth", "logout"];
pub const RESET_PASSWORD_PATH: &[&str] = &["api", "v1", "auth", "request-reset-password"];

pub const ROLES_PATH: &[&str] = &["auth", "role"];
pub const ROLES_ALL_PATH: &[&str] = &["auth", "role", "all"];

pub const USERS_PATH: &[&str] = &["users"];
pub const USERS_ALL_PATH: &[&str] = &["users", "all"];

pub const METRICS_PATH: &[&str] = &["metrics"];
pub const CIRCUIT_PATH: &[&str] = &["metrics", "circuit"];

pub const INFO_PATH: &[&str] = &["info"];
pub const RESTART_PATH: &[&str] = &["restart"];
pub const CONFIG_FILE_PATH: &[&str] = &["config-file"];
pub const LOG_STATS_PATH: &[&str] = &["log-stats-proxy"];
