use crate::{Error, Result};
use url::Url;

/// Default page size for the fallback pull endpoint.
pub const DEFAULT_PULL_LIMIT: usize = 10;

const STREAM_PATH: &str = "ws/notifications";
const PULL_PATH: &str = "notifications";

/// Backend endpoint configuration for the notification subsystem.
///
/// Holds the API base URL the rest of the client is configured with and
/// derives the two notification endpoints from it: the persistent stream
/// (scheme swapped to websocket) and the request/response pull endpoint.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    base_url: Url,
}

impl ApiConfig {
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url)?;
        match base_url.scheme() {
            "http" | "https" => Ok(Self { base_url }),
            other => Err(Error::UnsupportedScheme(other.to_string())),
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The persistent stream endpoint for `user_id`.
    ///
    /// `https://…` becomes `wss://…` and `http://…` becomes `ws://…`.
    pub fn stream_url(&self, user_id: &str) -> Result<Url> {
        let mut url = self.base_url.clone();
        let scheme = match url.scheme() {
            "https" => "wss",
            "http" => "ws",
            other => return Err(Error::UnsupportedScheme(other.to_string())),
        };
        if url.set_scheme(scheme).is_err() {
            return Err(Error::Generic(format!("could not switch scheme to {scheme}")));
        }
        url.set_path(&joined_path(&url, STREAM_PATH));
        url.query_pairs_mut().clear().append_pair("user_id", user_id);
        Ok(url)
    }

    /// The pull endpoint for `user_id`, limited to `limit` records.
    pub fn pull_url(&self, user_id: &str, limit: usize) -> Url {
        let mut url = self.base_url.clone();
        url.set_path(&joined_path(&url, PULL_PATH));
        url.query_pairs_mut()
            .clear()
            .append_pair("user_id", user_id)
            .append_pair("limit", &limit.to_string());
        url
    }
}

// keeps any path prefix the base url was configured with (ie, /api/v1)
fn joined_path(url: &Url, segment: &str) -> String {
    format!("{}/{}", url.path().trim_end_matches('/'), segment)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn https_base_becomes_wss_stream() {
        let config = ApiConfig::new("https://api.cropguard.example").unwrap();
        let url = config.stream_url("u1").unwrap();
        assert_eq!(url.as_str(), "wss://api.cropguard.example/ws/notifications?user_id=u1");
    }

    #[test]
    fn http_base_becomes_ws_stream() {
        let config = ApiConfig::new("http://localhost:8080").unwrap();
        let url = config.stream_url("u1").unwrap();
        assert_eq!(url.as_str(), "ws://localhost:8080/ws/notifications?user_id=u1");
    }

    #[test]
    fn stream_url_keeps_base_path_prefix() {
        let config = ApiConfig::new("https://api.cropguard.example/api/v1/").unwrap();
        let url = config.stream_url("u1").unwrap();
        assert_eq!(
            url.as_str(),
            "wss://api.cropguard.example/api/v1/ws/notifications?user_id=u1"
        );
    }

    #[test]
    fn pull_url_carries_user_and_limit() {
        let config = ApiConfig::new("https://api.cropguard.example").unwrap();
        let url = config.pull_url("u1", DEFAULT_PULL_LIMIT);
        assert_eq!(
            url.as_str(),
            "https://api.cropguard.example/notifications?user_id=u1&limit=10"
        );
    }

    #[test]
    fn non_http_base_is_rejected() {
        assert!(matches!(
            ApiConfig::new("ftp://api.cropguard.example"),
            Err(Error::UnsupportedScheme(_))
        ));
    }
}
