//! Network access for the agent.
//!
//! [`Network`] is the seam the policies fetch through. A fetch either yields
//! a response, whatever its status, or fails outright: connection refused,
//! DNS failure, timeout. Only the latter is an `Err`; a 404 or 500 from the
//! server is a perfectly good `Ok` response.
//!
//! [`HttpNetwork`] is the reqwest-backed implementation:
//! - Max redirects: 5
//! - Timeout and User-Agent from configuration
//!
//! There is no body size limit here. Large media passes straight through;
//! the cache size limit is applied by the agent before storing.

pub mod url;

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use shellcache_core::{AppConfig, Error, Request, Response, ResponseSource};

pub use self::url::{UrlError, normalize_trailing_slash, resolve, same_origin};

/// Something that can perform a fetch on behalf of the agent.
#[async_trait]
pub trait Network: Send + Sync {
    async fn fetch(&self, request: &Request) -> Result<Response, Error>;
}

/// Configuration for the HTTP network.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "shellcache/0.1")
    pub user_agent: String,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "shellcache/0.1".to_string(),
            timeout: Duration::from_millis(20000),
            max_redirects: 5,
        }
    }
}

impl From<&AppConfig> for FetchConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            timeout: config.timeout(),
            ..Default::default()
        }
    }
}

/// reqwest-backed [`Network`].
pub struct HttpNetwork {
    http: Client,
    config: FetchConfig,
}

impl HttpNetwork {
    /// Create a new network client with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { http, config })
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }
}

fn network_error(err: reqwest::Error) -> Error {
    if err.is_timeout() { Error::FetchTimeout(err.to_string()) } else { Error::Network(err.to_string()) }
}

#[async_trait]
impl Network for HttpNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        let start = Instant::now();

        let response = self
            .http
            .request(request.method.clone(), request.url.clone())
            .headers(request.headers.clone())
            .send()
            .await
            .map_err(network_error)?;

        let status = response.status();
        let final_url = response.url().clone();
        let headers = response.headers().clone();
        let body = response.bytes().await.map_err(network_error)?;

        tracing::debug!(
            "fetched {} {} -> {} ({}) in {}ms ({} bytes)",
            request.method,
            request.url,
            final_url,
            status.as_u16(),
            start.elapsed().as_millis(),
            body.len()
        );

        Ok(Response::new(status, headers, body, ResponseSource::Network))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ::url::Url;
    use reqwest::StatusCode;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request(server: &MockServer, p: &str) -> Request {
        Request::get(Url::parse(&format!("{}{}", server.uri(), p)).unwrap())
    }

    #[test]
    fn test_fetch_config_default() {
        let config = FetchConfig::default();
        assert_eq!(config.user_agent, "shellcache/0.1");
        assert_eq!(config.timeout, Duration::from_millis(20000));
        assert_eq!(config.max_redirects, 5);
    }

    #[test]
    fn test_fetch_config_from_app_config() {
        let app = AppConfig { user_agent: "test-agent".into(), timeout_ms: 1500, ..Default::default() };
        let config = FetchConfig::from(&app);
        assert_eq!(config.user_agent, "test-agent");
        assert_eq!(config.timeout, Duration::from_millis(1500));
    }

    #[tokio::test]
    async fn test_fetch_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/b-frame/index.html"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>shell</html>"))
            .mount(&server)
            .await;

        let network = HttpNetwork::new(FetchConfig::default()).unwrap();
        let resp = network.fetch(&request(&server, "/b-frame/index.html")).await.unwrap();

        assert_eq!(resp.status, StatusCode::OK);
        assert_eq!(resp.text(), "<html>shell</html>");
        assert_eq!(resp.source, ResponseSource::Network);
    }

    #[tokio::test]
    async fn test_fetch_error_status_is_a_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_string("missing"))
            .mount(&server)
            .await;

        let network = HttpNetwork::new(FetchConfig::default()).unwrap();
        let resp = network.fetch(&request(&server, "/nope.js")).await.unwrap();
        assert_eq!(resp.status, StatusCode::NOT_FOUND);
        assert!(!resp.is_ok());
    }

    #[tokio::test]
    async fn test_fetch_forwards_request_headers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(header("accept", "video/webm"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let network = HttpNetwork::new(FetchConfig::default()).unwrap();
        let req = request(&server, "/clip").with_header("Accept", "video/webm");
        let resp = network.fetch(&req).await.unwrap();
        assert_eq!(resp.status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_fetch_large_body_passes_through() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/movie.mp4"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![7u8; 2 * 1024 * 1024]))
            .mount(&server)
            .await;

        let app = AppConfig { max_bytes: 1024, ..Default::default() };
        let network = HttpNetwork::new(FetchConfig::from(&app)).unwrap();
        let resp = network.fetch(&request(&server, "/movie.mp4")).await.unwrap();
        assert_eq!(resp.status, StatusCode::OK);
        assert_eq!(resp.body.len(), 2 * 1024 * 1024);
    }

    #[tokio::test]
    async fn test_fetch_connection_refused() {
        let server = MockServer::start().await;
        let req = request(&server, "/gone");
        drop(server);

        let network = HttpNetwork::new(FetchConfig::default()).unwrap();
        let result = network.fetch(&req).await;
        assert!(matches!(result, Err(Error::Network(_)) | Err(Error::FetchTimeout(_))));
    }
}
