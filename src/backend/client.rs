//! Blocking HTTP client for the query service.

use std::time::Duration;

use reqwest::Method;
use reqwest::blocking::{Client, RequestBuilder};
use tracing::debug;
use url::Url;

use crate::common::config::BackendConfig;
use crate::common::errors::{SidekickError, SidekickResult};

use super::types::{QueryAnswer, QueryMode, QueryRequest};

/// Something that can answer a snippet in a given mode.
pub trait QueryService: Send + Sync {
    /// Ask the backend about `text`.
    ///
    /// # Errors
    /// Returns an error if the request fails or the answer cannot be decoded.
    fn query(&self, text: &str, mode: QueryMode) -> SidekickResult<QueryAnswer>;
}

/// Connection to the backend shared by every endpoint client.
pub(crate) struct BackendHttp {
    client: Client,
    base: Url,
}

impl BackendHttp {
    pub(crate) fn new(config: &BackendConfig) -> SidekickResult<Self> {
        let base = Url::parse(&config.base_url)?;
        if base.cannot_be_a_base() {
            return Err(SidekickError::InvalidConfig(format!(
                "backend URL cannot carry paths: {base}"
            )));
        }
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        Ok(Self { client, base })
    }

    /// URL of `segments` under the base, each segment percent-encoded.
    pub(crate) fn url(&self, segments: &[&str]) -> SidekickResult<Url> {
        endpoint_url(&self.base, segments)
    }

    pub(crate) fn request(&self, method: Method, segments: &[&str]) -> SidekickResult<RequestBuilder> {
        let url = self.url(segments)?;
        debug!(%method, %url, "Backend request");
        Ok(self.client.request(method, url))
    }

    /// Send `request` and return the body of a 2xx response.
    pub(crate) fn send(request: RequestBuilder) -> SidekickResult<String> {
        let response = request.send()?;
        let status = response.status();
        let body = response.text()?;
        if !status.is_success() {
            return Err(SidekickError::Backend {
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }
}

/// Query service reached over HTTP.
pub struct HttpQueryService {
    http: BackendHttp,
    endpoint: Url,
}

impl HttpQueryService {
    /// Build a client for the service at `config.base_url`.
    ///
    /// # Errors
    /// Returns an error if the URL is invalid or the HTTP client cannot be built.
    pub fn new(config: &BackendConfig) -> SidekickResult<Self> {
        let http = BackendHttp::new(config)?;
        let endpoint = http.url(&["query"])?;
        Ok(Self { http, endpoint })
    }

    /// Full URL queries are posted to.
    #[must_use]
    pub const fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

impl QueryService for HttpQueryService {
    fn query(&self, text: &str, mode: QueryMode) -> SidekickResult<QueryAnswer> {
        let request = QueryRequest {
            text: text.to_string(),
            mode,
        };
        let body = BackendHttp::send(self.http.request(Method::POST, &["query"])?.json(&request))?;
        QueryAnswer::from_json(&body)
    }
}

/// `base` with `segments` appended, tolerating a trailing slash on the base.
fn endpoint_url(base: &Url, segments: &[&str]) -> SidekickResult<Url> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|()| SidekickError::InvalidConfig(format!("backend URL cannot carry paths: {base}")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}
