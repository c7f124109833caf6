//! Domain types for the Gerbang admin client.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// HTTP verbs the client speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// State-changing operation kinds. Reads are never guarded, so there is no
/// GET here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MutationMethod {
    Create,
    Update,
    Delete,
}

impl MutationMethod {
    pub fn http_method(self) -> HttpMethod {
        match self {
            Self::Create => HttpMethod::Post,
            Self::Update => HttpMethod::Put,
            Self::Delete => HttpMethod::Delete,
        }
    }

    /// DELETE requests go out without a body.
    pub fn carries_body(self) -> bool {
        !matches!(self, Self::Delete)
    }
}

/// Single-use anti-CSRF token.
///
/// Deliberately not `Clone`: attaching it to a request consumes it, so a
/// token can never be sent twice.
#[derive(PartialEq, Eq)]
pub struct CsrfToken(String);

impl CsrfToken {
    /// Returns `None` for an empty or blank token.
    pub fn new(value: impl Into<String>) -> Option<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            None
        } else {
            Some(Self(value))
        }
    }

    pub fn into_header_value(self) -> String {
        self.0
    }
}

impl fmt::Debug for CsrfToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CsrfToken(<redacted>)")
    }
}

// ---------------------------------------------------------------------------
// Wire envelopes
// ---------------------------------------------------------------------------

/// Standard gateway response body: `{ status, message?, data?, total?, code? }`.
///
/// Only `status`, `message` and `data` drive the protocol. The other fields
/// are read leniently: a value of an unexpected type becomes `None` rather
/// than failing the whole body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiEnvelope {
    #[serde(default)]
    pub status: Value,
    #[serde(default, deserialize_with = "lenient_string")]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub total: Option<i64>,
    #[serde(default, deserialize_with = "lenient_u16")]
    pub code: Option<u16>,
}

impl ApiEnvelope {
    /// `status` evaluated with JavaScript truthiness, matching the dashboards
    /// this client replaces.
    pub fn is_ok(&self) -> bool {
        is_truthy(&self.status)
    }

    /// The server message, if it carries any text.
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref().filter(|m| !m.trim().is_empty())
    }
}

/// Body of the CSRF token endpoint: `{ data: "<token>" }`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenEnvelope {
    #[serde(default)]
    pub data: Option<String>,
}

fn lenient_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::String(s) => Some(s),
        _ => None,
    })
}

fn lenient_i64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i64>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

fn lenient_u16<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u16>, D::Error> {
    Ok(lenient_i64(d)?.and_then(|n| u16::try_from(n).ok()))
}

/// `false`, `0`, `NaN`, `""` and `null` are falsy; everything else is truthy.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(true, |f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

// ---------------------------------------------------------------------------
// Session and accounts
// ---------------------------------------------------------------------------

/// `statusAccount` of an enabled account; 9 marks it inactive.
pub const ACCOUNT_STATUS_ACTIVE: i32 = 10;

/// A gateway user account, as returned by the session and user endpoints.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserProfile {
    pub id_account: String,
    pub identity_number: Option<String>,
    pub username: String,
    pub full_name: String,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    /// RFC 3339 timestamp, passed through untouched.
    pub date_of_birth: Option<String>,
    pub status_account: i32,
    pub used_pin: i32,
    pub is_google_account: i32,
    pub login_ip: Option<String>,
    pub login_attempts: i32,
    pub login_time: i64,
    #[serde(rename = "user_assignments")]
    pub user_assignments: Vec<UserAssignment>,
}

impl UserProfile {
    pub fn is_active(&self) -> bool {
        self.status_account == ACCOUNT_STATUS_ACTIVE
    }

    pub fn role_names(&self) -> impl Iterator<Item = &str> {
        self.user_assignments
            .iter()
            .filter_map(|a| a.auth_rule.as_ref())
            .map(|r| r.name_auth_role.as_str())
    }
}

/// Role membership of an account.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserAssignment {
    pub account_id: String,
    pub auth_role_id: i64,
    pub auth_rule: Option<Role>,
}

/// Result of the session check. Consulted only; the client never mutates it.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Session {
    pub authenticated: bool,
    pub profile: Option<UserProfile>,
}

impl Session {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn authenticated(profile: Option<UserProfile>) -> Self {
        Self {
            authenticated: true,
            profile,
        }
    }
}

/// `GET /users/all` body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserList {
    #[serde(default)]
    pub items: Vec<UserProfile>,
}

/// Payload for creating or updating a user.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInput {
    pub username: String,
    pub full_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_account: Option<i32>,
}

/// Payload for a password change.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PasswordChange {
    pub password: String,
    #[serde(rename = "passwordConfirm")]
    pub password_confirm: String,
}

/// Credentials posted to the login endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoginInput {
    pub identity: String,
    pub password: String,
}

/// Body of the password-reset request: the account's e-mail.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResetPasswordRequest {
    pub identity: String,
}

// ---------------------------------------------------------------------------
// Roles
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Role {
    pub id_auth_role: i64,
    pub name_auth_role: String,
    pub desc_auth_role: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RoleInput {
    pub name_auth_role: String,
    pub desc_auth_role: String,
}

// ---------------------------------------------------------------------------
// Metrics
// ---------------------------------------------------------------------------

/// One reading of the gateway's `/metrics` monitor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsSnapshot {
    pub pid: ProcessMetrics,
    pub os: OsMetrics,
}

/// Gateway process figures. `ram` is in bytes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessMetrics {
    pub cpu: f64,
    pub ram: u64,
    pub conns: u64,
}

/// Host figures. `ram` is memory in use, `total_ram` the installed amount.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OsMetrics {
    pub cpu: f64,
    pub ram: u64,
    pub total_ram: u64,
    pub load_avg: f64,
    pub conns: u64,
}

// ---------------------------------------------------------------------------
// Gateway operations
// ---------------------------------------------------------------------------

/// `/metrics/circuit`: counters of the gateway's circuit breaker.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CircuitStats {
    pub state: Option<String>,
    pub total_requests: u64,
    pub successes: u64,
    pub failures: u64,
    pub success_threshold: u64,
    pub failure_threshold: u64,
    pub rejected_requests: u64,
    /// Timestamp as sent by the gateway.
    pub last_state_change: Option<String>,
}

/// One proxied service from the gateway's service configuration.
///
/// `status` is the live health check reported by `/info`; it is not part of
/// the stored configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceInfo {
    pub path: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    pub auth_protection: bool,
    pub csrf_protection: bool,
    pub session_protection: bool,
    pub jwt_protection: bool,
    pub rbac_protection: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<bool>,
}

/// Body of `POST /config-file`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub services: Vec<ServiceInfo>,
}

/// Proxy traffic grouped by service, method, path and status.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyPathStats {
    pub service: String,
    pub method: String,
    pub path: String,
    pub status: u16,
    /// Milliseconds.
    pub avg_duration: f64,
    pub request_count: i64,
}

/// A single proxied request from the log.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyLogEntry {
    pub id: u64,
    pub level: String,
    pub service: String,
    pub method: String,
    pub path: String,
    pub user_auth: Option<String>,
    pub status: u16,
    pub duration: f64,
    pub fields: Value,
    pub timestamp: String,
}

/// `{ data: [...] }` bodies of the log endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct DataList<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
}
