//! CSRF-guarded mutation client and the typed admin APIs built on it.
//!
//! [`GuardedClient`] owns the token/retry protocol; the other modules add
//! thin, validated wrappers for sessions, roles, users, metrics and
//! gateway operations.

pub mod auth;
pub mod gateway;
pub mod guarded;
pub mod metrics;
pub mod password;
pub mod roles;
pub mod session;
pub mod users;

#[cfg(test)]
mod testing;

pub use auth::{is_valid_email, LoginOptions};
pub use gateway::{LogWindow, ProxyRoute};
pub use guarded::{decode, encode_payload, GuardedClient};
pub use metrics::{
    format_bytes, MetricsHistory, MetricsPoller, MetricsSample, Series, DEFAULT_POLL_INTERVAL,
    MAX_POINTS,
};
pub use password::{check_password_strength, PasswordStrength};
pub use roles::RoleList;
