//! Login and password-reset requests. Both are guarded mutations.

use crate::guarded::{encode_payload, GuardedClient};
use gerbang_core::protocol::{LOGIN_PATH, RESET_PASSWORD_PATH};
use gerbang_core::{
    LoginInput, MutationError, MutationMethod, MutationResult, ResetPasswordRequest,
};
use gerbang_provider::Transport;
use regex::Regex;
use std::sync::LazyLock;
use url::Url;

/// Minimum length for identity and password, as enforced by the login form.
const MIN_CREDENTIAL_LEN: usize = 2;

/// WHATWG "valid e-mail address".
static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$",
    )
    .expect("email pattern compiles")
});

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_PATTERN.is_match(email)
}

/// Query flags understood by the gateway's login endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginOptions {
    /// Deliver tokens as HTTP-only cookies.
    pub http_only: bool,
    /// Also open a server-side session.
    pub session: bool,
    /// Cookie domain.
    pub domain: Option<String>,
    /// Front-end URL the gateway may redirect to.
    pub redirect_url: Option<String>,
}

impl Default for LoginOptions {
    fn default() -> Self {
        Self {
            http_only: true,
            session: true,
            domain: None,
            redirect_url: None,
        }
    }
}

impl<T: Transport> GuardedClient<T> {
    /// Posts credentials. On success the gateway sets the session cookies in
    /// the transport's jar and returns its login payload.
    pub async fn login(&self, input: &LoginInput, options: &LoginOptions) -> MutationResult {
        if input.identity.trim().chars().count() < MIN_CREDENTIAL_LEN {
            return Err(MutationError::rejected("Identity is required"));
        }
        if input.password.chars().count() < MIN_CREDENTIAL_LEN {
            return Err(MutationError::rejected("Password is required"));
        }

        let url = self.login_url(options);
        let payload = encode_payload(input)?;
        tracing::info!(identity = %input.identity, "logging in");
        self.mutate_url(&url, MutationMethod::Create, Some(&payload))
            .await
    }

    /// Asks the gateway to e-mail a reset link. `reset_base` is the base URL
    /// the link points at and defaults to this client's base.
    pub async fn request_password_reset(
        &self,
        email: &str,
        reset_base: Option<&str>,
    ) -> MutationResult {
        let email = email.trim();
        if !is_valid_email(email) {
            return Err(MutationError::rejected("Invalid email address"));
        }

        let base = reset_base
            .map(str::to_owned)
            .unwrap_or_else(|| self.base().to_string());
        let url = self
            .base()
            .endpoint_with_query(RESET_PASSWORD_PATH, &[("baseUrl", base.as_str())]);
        let payload = encode_payload(&ResetPasswordRequest {
            identity: email.to_owned(),
        })?;

        tracing::info!(%email, "requesting password reset");
        self.mutate_url(&url, MutationMethod::Create, Some(&payload))
            .await
    }

    fn login_url(&self, options: &LoginOptions) -> Url {
        let mut query: Vec<(&str, &str)> = vec![
            ("httponly", bool_str(options.http_only)),
            ("session", bool_str(options.session)),
        ];
        if let Some(domain) = options.domain.as_deref() {
            query.push(("domain", domain));
        }
        if let Some(redirect) = options.redirect_url.as_deref() {
            query.push(("url", redirect));
        }
        self.base().endpoint_with_query(LOGIN_PATH, &query)
    }
}

fn bool_str(b: bool) -> &'static str {
    if b {
        "true"
    } else {
        "false"
    }
}
