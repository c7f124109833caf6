//! Domain models, wire envelopes, protocol constants, and error definitions.
//!
//! Foundation crate -- no async or I/O dependencies.

pub mod error;
pub mod protocol;
pub mod types;

pub use error::{FailureKind, GerbangError, GerbangResult, MutationError, MutationResult};
pub use types::{
    ApiEnvelope, CircuitStats, CsrfToken, DataList, HttpMethod, LoginInput, MetricsSnapshot,
    MutationMethod, OsMetrics, PasswordChange, ProcessMetrics, ProxyLogEntry, ProxyPathStats,
    ResetPasswordRequest, Role, RoleInput, ServiceConfig, ServiceInfo, Session, TokenEnvelope,
    UserAssignment, UserInput, UserList, UserProfile,
};
