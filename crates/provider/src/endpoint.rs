//! Gateway base URL and endpoint construction.

use gerbang_core::error::{GerbangError, GerbangResult};
use url::Url;

/// Validated base URL of the gateway, e.g. `http://localhost:9000` or
/// `https://example.com/backend`.
///
/// Endpoints are built by appending percent-encoded path segments, so ids
/// taken from user input cannot escape their segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiBase {
    url: Url,
}

impl ApiBase {
    pub fn parse(raw: &str) -> GerbangResult<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(GerbangError::Config("base URL must not be empty".into()));
        }

        let mut url = Url::parse(raw)
            .map_err(|e| GerbangError::Config(format!("invalid base URL {raw}: {e}")))?;

        if url.cannot_be_a_base() || !matches!(url.scheme(), "http" | "https") {
            return Err(GerbangError::Config(format!(
                "base URL must be an http(s) URL, got {raw}"
            )));
        }

        url.set_query(None);
        url.set_fragment(None);
        Ok(Self { url })
    }

    pub fn as_url(&self) -> &Url {
        &self.url
    }

    /// Base URL with `segments` appended.
    pub fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.url.clone();
        // `parse` rejected cannot-be-a-base URLs, so this always succeeds.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    pub fn endpoint_with_query(&self, segments: &[&str], query: &[(&str, &str)]) -> Url {
        let mut url = self.endpoint(segments);
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        url
    }

    /// Splits a slash-separated resource path such as `auth/role/3`.
    pub fn resource(&self, path: &str) -> Url {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        self.endpoint(&segments)
    }
}

impl std::fmt::Display for ApiBase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.url.as_str().trim_end_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gerbang_core::protocol::{LOGIN_PATH, TOKEN_PATH};

    #[test]
    fn appends_to_bare_host() {
        let base = ApiBase::parse("http://localhost:9000").unwrap();
        assert_eq!(
            base.endpoint(TOKEN_PATH).as_str(),
            "http://localhost:9000/secure-gateway-c"
        );
    }

    #[test]
    fn appends_under_prefix_with_or_without_slash() {
        for raw in ["https://gw.example.com/backend", "https://gw.example.com/backend/"] {
            let base = ApiBase::parse(raw).unwrap();
            assert_eq!(
                base.endpoint(LOGIN_PATH).as_str(),
                "https://gw.example.com/backend/api/v1/auth/login"
            );
        }
    }

    #[test]
    fn segments_are_encoded() {
        let base = ApiBase::parse("http://localhost:9000").unwrap();
        let url = base.endpoint(&["users", "a/b c"]);
        assert_eq!(url.as_str(), "http://localhost:9000/users/a%2Fb%20c");
    }

    #[test]
    fn query_pairs_are_encoded() {
        let base = ApiBase::parse("http://localhost:9000").unwrap();
        let url = base.endpoint_with_query(&["x"], &[("url", "http://localhost:5173")]);
        assert_eq!(
            url.as_str(),
            "http://localhost:9000/x?url=http%3A%2F%2Flocalhost%3A5173"
        );
    }

    #[test]
    fn resource_path_splits_on_slash() {
        let base = ApiBase::parse("http://localhost:9000").unwrap();
        assert_eq!(
            base.resource("/auth/role/3").as_str(),
            "http://localhost:9000/auth/role/3"
        );
    }

    #[test]
    fn rejects_bad_bases() {
        assert!(ApiBase::parse("").is_err());
        assert!(ApiBase::parse("not a url").is_err());
        assert!(ApiBase::parse("mailto:admin@example.com").is_err());
        assert!(ApiBase::parse("ftp://example.com").is_err());
    }

    #[test]
    fn display_drops_trailing_slash() {
        let base = ApiBase::parse("http://localhost:9000/").unwrap();
        assert_eq!(base.to_string(), "http://localhost:9000");
    }
}
