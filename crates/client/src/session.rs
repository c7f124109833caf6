//! Session check and logout. Both are plain GETs and carry no CSRF token.

use crate::guarded::{decode, GuardedClient};
use gerbang_core::error::{GerbangError, GerbangResult};
use gerbang_core::protocol::{LOGOUT_PATH, SESSION_PATH};
use gerbang_core::{ApiEnvelope, Session, UserProfile};
use gerbang_provider::Transport;

impl<T: Transport> GuardedClient<T> {
    /// Asks the gateway who we are.
    ///
    /// HTTP 401 or a falsy `status` yields [`Session::anonymous`]; only
    /// transport failures and unreadable bodies are errors.
    pub async fn session(&self) -> GerbangResult<Session> {
        let response = self.get(self.base().endpoint(SESSION_PATH)).await?;

        if response.status == 401 {
            tracing::debug!("no session");
            return Ok(Session::anonymous());
        }

        let envelope: ApiEnvelope = match response.json() {
            Ok(envelope) => envelope,
            Err(e) if response.is_success() => {
                return Err(GerbangError::Decode(format!("session response: {e}")));
            }
            Err(_) => {
                return Err(GerbangError::Rejected(format!(
                    "session check failed (HTTP {})",
                    response.status
                )));
            }
        };

        if !response.is_success() || !envelope.is_ok() {
            tracing::debug!(status = response.status, "session not authenticated");
            return Ok(Session::anonymous());
        }

        let profile: Option<UserProfile> = envelope.data.map(decode).transpose()?;
        tracing::info!(
            user = profile.as_ref().map(|p| p.username.as_str()).unwrap_or(""),
            "session authenticated"
        );
        Ok(Session::authenticated(profile))
    }

    /// Ends the current session on the gateway. `redirect` is forwarded as
    /// `redirectUrl`, the page the gateway sends a browser to afterwards.
    pub async fn logout(&self, redirect: Option<&str>) -> GerbangResult<()> {
        let query: Vec<(&str, &str)> = redirect.map(|r| ("redirectUrl", r)).into_iter().collect();
        let envelope = self
            .get_envelope(self.base().endpoint_with_query(LOGOUT_PATH, &query))
            .await?;
        tracing::info!(message = envelope.message().unwrap_or(""), "logged out");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::testing::{client, json, ScriptedTransport};
    use gerbang_core::error::GerbangError;
    use gerbang_provider::{HttpResponse, TransportError};
    use serde_json::json as j;

    #[tokio::test]
    async fn authenticated_session_carries_profile() {
        let c = client(ScriptedTransport::new([json(
            200,
            j!({
                "status": true,
                "message": "Success Get JWT",
                "data": { "idAccount": "a1", "username": "admin", "fullName": "Admin", "statusAccount": 10 }
            }),
        )]));

        let session = c.session().await.unwrap();
        assert!(session.authenticated);
        let profile = session.profile.unwrap();
        assert_eq!(profile.username, "admin");
        assert!(profile.is_active());
        assert!(c.transport().mutations().is_empty());
    }

    #[tokio::test]
    async fn null_data_is_authenticated_without_profile() {
        let c = client(ScriptedTransport::new([json(
            200,
            j!({ "status": true, "data": null }),
        )]));

        let session = c.session().await.unwrap();
        assert!(session.authenticated);
        assert!(session.profile.is_none());
    }

    #[tokio::test]
    async fn unauthorized_is_anonymous() {
        let c = client(ScriptedTransport::new([Ok(HttpResponse::new(
            401,
            "Unauthorized",
        ))]));
        assert!(!c.session().await.unwrap().authenticated);

        let c = client(ScriptedTransport::new([json(200, j!({ "status": false }))]));
        assert!(!c.session().await.unwrap().authenticated);
    }

    #[tokio::test]
    async fn transport_failure_is_an_error() {
        let c = client(ScriptedTransport::new([Err(TransportError::Connect(
            "refused".into(),
        ))]));
        assert!(matches!(
            c.session().await,
            Err(GerbangError::Transport(_))
        ));
    }

    #[tokio::test]
    async fn garbage_body_is_decode_error() {
        let c = client(ScriptedTransport::new([Ok(HttpResponse::new(200, "<html>"))]));
        assert!(matches!(c.session().await, Err(GerbangError::Decode(_))));
    }

    #[tokio::test]
    async fn logout_is_unguarded_get() {
        let c = client(ScriptedTransport::new([json(
            200,
            j!({ "status": true, "message": "Success Logout" }),
        )]));

        c.logout(None).await.unwrap();
        let requests = c.transport().requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].url.path(), "/api/v1/auth/logout");
        assert_eq!(requests[0].url.query(), None);
        assert_eq!(c.transport().token_fetches(), 0);
    }

    #[tokio::test]
    async fn logout_forwards_redirect_url() {
        let c = client(ScriptedTransport::new([json(200, j!({ "status": true }))]));

        c.logout(Some("http://localhost:5173/login")).await.unwrap();
        assert_eq!(
            c.transport().requests()[0].url.as_str(),
            "http://gateway.test/api/v1/auth/logout?redirectUrl=http%3A%2F%2Flocalhost%3A5173%2Flogin"
        );
    }

    #[tokio::test]
    async fn logout_without_session_is_rejected() {
        let c = client(ScriptedTransport::new([json(
            401,
            j!({ "status": false, "message": "missing refresh token" }),
        )]));

        match c.logout(None).await {
            Err(GerbangError::Rejected(m)) => assert_eq!(m, "missing refresh token"),
            other => panic!("expected Rejected, got {other:?}"),
        }
    }
}
