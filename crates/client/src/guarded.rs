//! CSRF-guarded mutation client.
//!
//! Every state-changing call runs the same protocol:
//!   1. fetch a fresh token from `/secure-gateway-c`,
//!   2. send the mutation with the token in `X-SGCsrf-Token`,
//!   3. if the gateway answers with the CSRF sentinel, run 1-2 once more.
//!
//! Tokens are never cached. Concurrent calls each fetch their own, so no
//! coordination between them is needed.

use gerbang_core::error::{GerbangError, GerbangResult, NETWORK_FAILURE_MESSAGE};
use gerbang_core::protocol::{
    CONTENT_TYPE_JSON, CSRF_HEADER, CSRF_SENTINEL, MAX_ATTEMPTS, TOKEN_PATH,
};
use gerbang_core::{
    ApiEnvelope, CsrfToken, MutationError, MutationMethod, MutationResult, TokenEnvelope,
};
use gerbang_provider::{
    ApiBase, HttpRequest, HttpResponse, HttpTransport, Transport, TransportConfig,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use url::Url;

/// Client for one gateway, parameterized by base URL and transport.
///
/// ```ignore
/// let client = GuardedClient::connect("http://localhost:9000", &TransportConfig::default())?;
/// let created = client
///     .mutate(&["auth", "role"], MutationMethod::Create, Some(&json!({ "name_auth_role": "x" })))
///     .await?;
/// ```
pub struct GuardedClient<T = HttpTransport> {
    base: ApiBase,
    transport: T,
}

impl GuardedClient<HttpTransport> {
    /// Builds a client on the reqwest transport.
    pub fn connect(base_url: &str, config: &TransportConfig) -> GerbangResult<Self> {
        let base = ApiBase::parse(base_url)?;
        let transport = HttpTransport::new(config, base.as_url())?;
        tracing::info!(base = %base, "client ready");
        Ok(Self::new(base, transport))
    }
}

impl<T: Transport> GuardedClient<T> {
    pub fn new(base: ApiBase, transport: T) -> Self {
        Self { base, transport }
    }

    pub fn base(&self) -> &ApiBase {
        &self.base
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Fetches a single-use CSRF token. No retry at this layer.
    pub async fn fetch_token(&self) -> Result<CsrfToken, MutationError> {
        let url = self.base.endpoint(TOKEN_PATH);
        tracing::debug!(%url, "fetching csrf token");

        let response = self
            .transport
            .send(HttpRequest::get(url))
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "csrf token endpoint unreachable");
                MutationError::token_unavailable(
                    "Unable to obtain a CSRF token: the server is unreachable",
                )
            })?;

        if !response.is_success() {
            tracing::warn!(status = response.status, "csrf token endpoint refused");
            return Err(MutationError::token_unavailable(format!(
                "Unable to obtain a CSRF token (HTTP {})",
                response.status
            )));
        }

        response
            .json::<TokenEnvelope>()
            .ok()
            .and_then(|envelope| envelope.data)
            .and_then(CsrfToken::new)
            .ok_or_else(|| {
                tracing::warn!("csrf token endpoint returned no token");
                MutationError::token_unavailable(
                    "Unable to obtain a CSRF token: the server returned no token",
                )
            })
    }

    /// Runs one guarded mutation against the URL produced by `endpoint`.
    ///
    /// `endpoint` is called once per attempt. `payload` becomes the JSON body
    /// and is dropped for [`MutationMethod::Delete`]. At most two attempts
    /// are made, and only the exact [`CSRF_SENTINEL`] message triggers the
    /// second one.
    pub async fn guarded_mutate<F>(
        &self,
        endpoint: F,
        method: MutationMethod,
        payload: Option<&Value>,
    ) -> MutationResult
    where
        F: Fn() -> Url + Send + Sync,
    {
        let body = payload
            .filter(|_| method.carries_body())
            .map(|p| p.to_string().into_bytes());

        let mut attempt = 1;
        loop {
            let url = endpoint();
            match self.attempt(url.clone(), method, body.clone()).await? {
                Attempt::Accepted(data) => {
                    tracing::info!(%url, attempt, "mutation accepted");
                    return Ok(data);
                }
                Attempt::CsrfStale if attempt < MAX_ATTEMPTS => {
                    tracing::info!(%url, attempt, "csrf token rejected, retrying with a fresh one");
                    attempt += 1;
                }
                Attempt::CsrfStale => {
                    tracing::warn!(%url, attempt, "csrf token rejected again, giving up");
                    return Err(MutationError::rejected(CSRF_SENTINEL));
                }
                Attempt::Rejected(message) => {
                    tracing::warn!(%url, attempt, %message, "mutation rejected");
                    return Err(MutationError::rejected(message));
                }
            }
        }
    }

    /// [`guarded_mutate`](Self::guarded_mutate) against `base + segments`.
    pub async fn mutate(
        &self,
        segments: &[&str],
        method: MutationMethod,
        payload: Option<&Value>,
    ) -> MutationResult {
        self.guarded_mutate(|| self.base.endpoint(segments), method, payload)
            .await
    }

    /// [`guarded_mutate`](Self::guarded_mutate) against a prebuilt URL.
    pub async fn mutate_url(
        &self,
        url: &Url,
        method: MutationMethod,
        payload: Option<&Value>,
    ) -> MutationResult {
        self.guarded_mutate(|| url.clone(), method, payload).await
    }

    /// One token fetch plus one mutation request. The token is moved into
    /// the request and dropped with it.
    async fn attempt(
        &self,
        url: Url,
        method: MutationMethod,
        body: Option<Vec<u8>>,
    ) -> Result<Attempt, MutationError> {
        let token = self.fetch_token().await?;

        let request = HttpRequest::new(method.http_method(), url)
            .header("Content-Type", CONTENT_TYPE_JSON)
            .header(CSRF_HEADER, token.into_header_value())
            .body(body);

        tracing::debug!(method = %request.method, url = %request.url, "sending guarded mutation");

        let response = self.transport.send(request).await.map_err(|e| {
            tracing::warn!(error = %e, "mutation request failed");
            MutationError::network(NETWORK_FAILURE_MESSAGE)
        })?;

        Ok(classify(&response))
    }

    /// Unguarded GET. Transport failures become [`GerbangError::Transport`].
    pub(crate) async fn get(&self, url: Url) -> GerbangResult<HttpResponse> {
        tracing::debug!(%url, "get");
        self.transport
            .send(HttpRequest::get(url).header("Accept", CONTENT_TYPE_JSON))
            .await
            .map_err(|e| GerbangError::Transport(e.to_string()))
    }

    /// Unguarded GET of a body that is not wrapped in the standard envelope.
    /// Non-2xx answers become [`GerbangError::Rejected`] with the server's
    /// message when it sent one.
    pub(crate) async fn get_json<R: DeserializeOwned>(&self, url: Url) -> GerbangResult<R> {
        let response = self.get(url).await?;

        if !response.is_success() {
            let message = response
                .json::<ApiEnvelope>()
                .ok()
                .and_then(|e| e.message().map(str::to_owned))
                .unwrap_or_else(|| status_message(response.status));
            return Err(GerbangError::Rejected(message));
        }

        response
            .json()
            .map_err(|e| GerbangError::Decode(e.to_string()))
    }

    /// Unguarded GET of a standard envelope; refused or falsy responses
    /// become [`GerbangError::Rejected`].
    pub(crate) async fn get_envelope(&self, url: Url) -> GerbangResult<ApiEnvelope> {
        let response = self.get(url).await?;
        let envelope = response.json::<ApiEnvelope>().ok();

        match envelope {
            Some(envelope) if response.is_success() && envelope.is_ok() => Ok(envelope),
            Some(envelope) => Err(GerbangError::Rejected(
                envelope
                    .message()
                    .map(str::to_owned)
                    .unwrap_or_else(|| status_message(response.status)),
            )),
            None if response.is_success() => Err(GerbangError::Decode(
                "response body is not a JSON envelope".into(),
            )),
            None => Err(GerbangError::Rejected(status_message(response.status))),
        }
    }
}

/// Classification of one mutation response.
#[derive(Debug, PartialEq)]
enum Attempt {
    Accepted(Value),
    /// The sentinel: the token was stale. Never surfaced to callers.
    CsrfStale,
    Rejected(String),
}

fn classify(response: &HttpResponse) -> Attempt {
    let Ok(envelope) = response.json::<ApiEnvelope>() else {
        return Attempt::Rejected(status_message(response.status));
    };

    if response.is_success() && envelope.is_ok() {
        return Attempt::Accepted(envelope.data.unwrap_or(Value::Null));
    }

    match envelope.message.as_deref() {
        Some(CSRF_SENTINEL) => Attempt::CsrfStale,
        _ => Attempt::Rejected(
            envelope
                .message()
                .map(str::to_owned)
                .unwrap_or_else(|| status_message(response.status)),
        ),
    }
}

fn status_message(status: u16) -> String {
    format!("Request failed (HTTP {status})")
}

/// Serializes a typed payload for [`GuardedClient::guarded_mutate`].
/// A payload that cannot be encoded is rejected before anything is sent.
pub fn encode_payload<P: Serialize + ?Sized>(payload: &P) -> Result<Value, MutationError> {
    serde_json::to_value(payload)
        .map_err(|e| MutationError::rejected(format!("Invalid request payload: {e}")))
}

/// Decodes the `data` of a successful mutation or envelope.
pub fn decode<T: DeserializeOwned>(data: Value) -> GerbangResult<T> {
    serde_json::from_value(data).map_err(|e| GerbangError::Decode(e.to_string()))
}
