//! Gateway operations: circuit breaker, proxied services, restart, service
//! configuration and proxy log statistics.

use crate::guarded::{encode_payload, GuardedClient};
use gerbang_core::error::GerbangResult;
use gerbang_core::protocol::{
    CIRCUIT_PATH, CONFIG_FILE_PATH, INFO_PATH, LOG_STATS_PATH, RESTART_PATH,
};
use gerbang_core::{
    CircuitStats, DataList, MutationError, MutationMethod, MutationResult, ProxyLogEntry,
    ProxyPathStats, ServiceConfig, ServiceInfo,
};
use gerbang_provider::Transport;

/// Time range for the proxy log, as timestamps the gateway parses
/// (RFC 3339, e.g. `2025-01-01T00:00:00Z`). Sent verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogWindow {
    pub from: String,
    pub to: String,
}

/// One row of the proxy statistics, used to drill into its log entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyRoute {
    pub service: String,
    pub method: String,
    pub path: String,
    pub status: u16,
}

impl From<&ProxyPathStats> for ProxyRoute {
    fn from(s: &ProxyPathStats) -> Self {
        Self {
            service: s.service.clone(),
            method: s.method.clone(),
            path: s.path.clone(),
            status: s.status,
        }
    }
}

impl<T: Transport> GuardedClient<T> {
    pub async fn circuit_stats(&self) -> GerbangResult<CircuitStats> {
        self.get_json(self.base().endpoint(CIRCUIT_PATH)).await
    }

    /// Proxied services with their live health in `status`.
    pub async fn services(&self) -> GerbangResult<Vec<ServiceInfo>> {
        let services: Vec<ServiceInfo> = self.get_json(self.base().endpoint(INFO_PATH)).await?;
        tracing::debug!(services = services.len(), "listed services");
        Ok(services)
    }

    /// Asks the gateway to restart itself.
    pub async fn restart(&self) -> MutationResult {
        tracing::info!("requesting gateway restart");
        self.mutate(RESTART_PATH, MutationMethod::Create, None).await
    }

    /// Replaces the gateway's service configuration. Health flags are
    /// stripped before sending; an empty list or a service without path or
    /// URL is refused locally.
    pub async fn update_services(&self, services: &[ServiceInfo]) -> MutationResult {
        if services.is_empty() {
            return Err(MutationError::rejected("At least one service is required"));
        }
        if services.iter().any(|s| s.path.trim().is_empty()) {
            return Err(MutationError::rejected("Service path is required"));
        }
        if services.iter().any(|s| s.url.trim().is_empty()) {
            return Err(MutationError::rejected("Service URL is required"));
        }

        let config = ServiceConfig {
            services: services
                .iter()
                .cloned()
                .map(|s| ServiceInfo { status: None, ..s })
                .collect(),
        };
        let payload = encode_payload(&config)?;
        tracing::info!(services = config.services.len(), "updating service config");
        self.mutate(CONFIG_FILE_PATH, MutationMethod::Create, Some(&payload))
            .await
    }

    /// Proxy traffic grouped by route. Without a window the gateway picks
    /// its default range.
    pub async fn proxy_log_stats(
        &self,
        window: Option<&LogWindow>,
    ) -> GerbangResult<Vec<ProxyPathStats>> {
        let query: Vec<(&str, &str)> = match window {
            Some(w) => vec![("from", w.from.as_str()), ("to", w.to.as_str())],
            None => Vec::new(),
        };
        let url = self.base().endpoint_with_query(LOG_STATS_PATH, &query);
        let list: DataList<ProxyPathStats> = self.get_json(url).await?;
        Ok(list.data)
    }

    /// Individual log entries for one route within `window`.
    pub async fn proxy_log_detail(
        &self,
        route: &ProxyRoute,
        window: &LogWindow,
    ) -> GerbangResult<Vec<ProxyLogEntry>> {
        let status = route.status.to_string();
        let url = self.base().endpoint_with_query(
            LOG_STATS_PATH,
            &[
                ("detail", "true"),
                ("service", route.service.as_str()),
                ("method", route.method.as_str()),
                ("path", route.path.as_str()),
                ("status", status.as_str()),
                ("from", window.from.as_str()),
                ("to", window.to.as_str()),
            ],
        );
        let list: DataList<ProxyLogEntry> = self.get_json(url).await?;
        Ok(list.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{client, json, token, ScriptedTransport};
    use gerbang_core::error::GerbangError;
    use gerbang_core::protocol::CSRF_HEADER;
    use gerbang_core::HttpMethod;
    use serde_json::{json as j, Value};

    fn window() -> LogWindow {
        LogWindow {
            from: "2025-01-01T00:00:00Z".into(),
            to: "2025-01-02T00:00:00Z".into(),
        }
    }

    fn orders(status: Option<bool>) -> ServiceInfo {
        ServiceInfo {
            path: "orders".into(),
            url: "http://orders:8080".into(),
            auth_protection: true,
            status,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn circuit_stats_is_a_plain_read() {
        let c = client(ScriptedTransport::new([json(
            200,
            j!({
                "totalRequests": 42, "failures": 1,
                "failureThreshold": 3, "rejectedRequests": 0
            }),
        )]));

        let stats = c.circuit_stats().await.unwrap();
        assert_eq!((stats.total_requests, stats.failures), (42, 1));
        assert_eq!(c.transport().requests()[0].url.path(), "/metrics/circuit");
        assert_eq!(c.transport().token_fetches(), 0);
    }

    #[tokio::test]
    async fn services_carry_health() {
        let c = client(ScriptedTransport::new([json(
            200,
            j!([
                {
                    "path": "orders", "url": "http://orders:8080",
                    "auth_protection": true, "status": true
                },
                { "path": "billing", "url": "http://billing:8080", "status": false }
            ]),
        )]));

        let services = c.services().await.unwrap();
        assert_eq!(services.len(), 2);
        assert_eq!(services[0].status, Some(true));
        assert!(services[0].auth_protection);
        assert_eq!(services[1].status, Some(false));
    }

    #[tokio::test]
    async fn restart_is_guarded_post_without_body() {
        let c = client(ScriptedTransport::new([
            token("T1"),
            json(200, j!({ "status": true, "message": "restarting" })),
        ]));

        c.restart().await.unwrap();

        let m = &c.transport().mutations()[0];
        assert_eq!((m.method, m.url.path()), (HttpMethod::Post, "/restart"));
        assert_eq!(m.header_value(CSRF_HEADER), Some("T1"));
        assert!(m.body.is_none());
    }

    #[tokio::test]
    async fn update_services_strips_health_and_posts_config() {
        let c = client(ScriptedTransport::new([
            token("T1"),
            json(200, j!({ "status": true })),
        ]));

        c.update_services(&[orders(Some(false))]).await.unwrap();

        let m = &c.transport().mutations()[0];
        assert_eq!((m.method, m.url.path()), (HttpMethod::Post, "/config-file"));
        let body: Value = serde_json::from_slice(m.body.as_deref().unwrap()).unwrap();
        assert_eq!(body["services"][0]["path"], "orders");
        assert!(body["services"][0].get("status").is_none());
    }

    #[tokio::test]
    async fn update_services_validates_locally() {
        let c = client(ScriptedTransport::new([]));

        let err = c.update_services(&[]).await.unwrap_err();
        assert_eq!(err.message(), "At least one service is required");

        let mut bad = orders(None);
        bad.url = " ".into();
        let err = c.update_services(&[bad]).await.unwrap_err();
        assert_eq!(err.message(), "Service URL is required");

        assert!(c.transport().requests().is_empty());
    }

    #[tokio::test]
    async fn update_services_stale_token_retries() {
        let c = client(ScriptedTransport::new([
            token("T1"),
            json(403, j!({ "status": false, "message": "CSRF validation failed" })),
            token("T2"),
            json(200, j!({ "status": true })),
        ]));

        c.update_services(&[orders(None)]).await.unwrap();
        assert_eq!(c.transport().token_fetches(), 2);
    }

    #[tokio::test]
    async fn log_stats_with_and_without_window() {
        let row = j!({
            "service": "orders", "method": "GET", "path": "/orders",
            "status": 200, "avg_duration": 12.5, "request_count": 9
        });
        let c = client(ScriptedTransport::new([
            json(200, j!({ "data": [row] })),
            json(200, j!({ "data": [] })),
        ]));

        let stats = c.proxy_log_stats(Some(&window())).await.unwrap();
        assert_eq!(stats[0].request_count, 9);
        assert_eq!(stats[0].avg_duration, 12.5);
        assert!(c.proxy_log_stats(None).await.unwrap().is_empty());

        let r = c.transport().requests();
        assert_eq!(
            r[0].url.query(),
            Some("from=2025-01-01T00%3A00%3A00Z&to=2025-01-02T00%3A00%3A00Z")
        );
        assert_eq!(r[1].url.query(), None);
    }

    #[tokio::test]
    async fn log_detail_filters_by_route() {
        let c = client(ScriptedTransport::new([json(
            200,
            j!({ "data": [{
                "id": 1, "level": "info", "service": "orders", "method": "GET",
                "path": "/orders", "user_auth": null, "status": 502, "duration": 31.0,
                "fields": { "ip": "10.0.0.1" }, "timestamp": "2025-01-01T10:00:00Z"
            }]}),
        )]));

        let route = ProxyRoute::from(&ProxyPathStats {
            service: "orders".into(),
            method: "GET".into(),
            path: "/orders".into(),
            status: 502,
            ..Default::default()
        });
        let entries = c.proxy_log_detail(&route, &window()).await.unwrap();
        assert_eq!(entries[0].status, 502);
        assert_eq!(entries[0].user_auth, None);

        let url = &c.transport().requests()[0].url;
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(pairs[0], ("detail".into(), "true".into()));
        assert_eq!(pairs[3], ("path".into(), "/orders".into()));
        assert_eq!(pairs[4], ("status".into(), "502".into()));
    }

    #[tokio::test]
    async fn log_stats_error_surfaces_message() {
        let c = client(ScriptedTransport::new([json(
            400,
            j!({ "status": false, "message": "invalid time range" }),
        )]));

        assert!(matches!(
            c.proxy_log_stats(Some(&window())).await,
            Err(GerbangError::Rejected(m)) if m == "invalid time range"
        ));
    }
}
