//! Scripted in-memory transport for unit tests.

use crate::GuardedClient;
use async_trait::async_trait;
use gerbang_core::protocol::TOKEN_PATH;
use gerbang_core::HttpMethod;
use gerbang_provider::{ApiBase, HttpRequest, HttpResponse, Transport, TransportError};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Mutex;

/// Replays canned responses in order and records every request.
pub(crate) struct ScriptedTransport {
    script: Mutex<VecDeque<Result<HttpResponse, TransportError>>>,
    sent: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub(crate) fn new(
        script: impl IntoIterator<Item = Result<HttpResponse, TransportError>>,
    ) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            sent: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn requests(&self) -> Vec<HttpRequest> {
        self.sent.lock().unwrap().clone()
    }

    pub(crate) fn token_fetches(&self) -> usize {
        let token_path = format!("/{}", TOKEN_PATH.join("/"));
        self.requests()
            .iter()
            .filter(|r| r.method == HttpMethod::Get && r.url.path() == token_path)
            .count()
    }

    /// Everything that is not a GET.
    pub(crate) fn mutations(&self) -> Vec<HttpRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.method != HttpMethod::Get)
            .collect()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self.sent.lock().unwrap().push(request);
        let next = self.script.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Err(TransportError::Request("script exhausted".into())))
    }
}

pub(crate) fn json(status: u16, body: Value) -> Result<HttpResponse, TransportError> {
    Ok(HttpResponse::new(status, body.to_string()))
}

pub(crate) fn token(value: &str) -> Result<HttpResponse, TransportError> {
    json(200, serde_json::json!({ "data": value }))
}

pub(crate) fn client(transport: ScriptedTransport) -> GuardedClient<ScriptedTransport> {
    GuardedClient::new(ApiBase::parse("http://gateway.test").unwrap(), transport)
}
