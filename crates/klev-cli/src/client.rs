//! Shared HTTP client, error types, and request helpers for the CLI.

use std::fmt::{self, Display, Formatter};
use std::time::Duration;

use anyhow::anyhow;
use klev_api_models::{ApiError, ModelError};
use klev_telemetry::REQUEST_ID_HEADER;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;

pub(crate) const DEFAULT_BASE_URL: &str = "https://api.klev.dev";
pub(crate) const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// CLI-level error type separating user mistakes, remote errors, and transport failures.
#[derive(Debug)]
pub(crate) enum CliError {
    Validation(String),
    Remote { status: StatusCode, error: ApiError },
    Failure(anyhow::Error),
}

/// Convenience alias for functions returning a `CliError`.
pub(crate) type CliResult<T> = Result<T, CliError>;

impl CliError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub(crate) fn failure(error: impl Into<anyhow::Error>) -> Self {
        Self::Failure(error.into())
    }

    pub(crate) const fn exit_code(&self) -> i32 {
        match self {
            Self::Remote { .. } => 1,
            Self::Validation(_) => 2,
            Self::Failure(_) => 3,
        }
    }

    pub(crate) fn display_message(&self) -> String {
        match self {
            Self::Validation(message) => message.clone(),
            Self::Remote { status, error } => format!("{error} (status {status})"),
            Self::Failure(error) => format!("{error:#}"),
        }
    }
}

impl Display for CliError {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.display_message())
    }
}

impl std::error::Error for CliError {}

impl From<ModelError> for CliError {
    fn from(error: ModelError) -> Self {
        Self::Validation(error.to_string())
    }
}

/// Connection settings gathered from flags and environment.
#[derive(Debug, Clone)]
pub(crate) struct ClientConfig {
    pub(crate) base_url: Url,
    pub(crate) token: Option<String>,
    pub(crate) timeout: Duration,
}

impl ClientConfig {
    /// Validate the credentials and build the context handed to every command.
    pub(crate) fn connect(self, trace_id: &str) -> CliResult<AppContext> {
        let token = self
            .token
            .map(|token| token.trim().to_string())
            .filter(|token| !token.is_empty())
            .ok_or_else(|| {
                CliError::validation("authtoken is missing: pass --authtoken or set KLEV_TOKEN")
            })?;

        let mut default_headers = HeaderMap::new();
        let request_id = HeaderValue::from_str(trace_id).map_err(|_| {
            CliError::failure(anyhow!("trace identifier contains invalid characters"))
        })?;
        default_headers.insert(REQUEST_ID_HEADER, request_id);

        let client = Client::builder()
            .timeout(self.timeout)
            .default_headers(default_headers)
            .build()
            .map_err(|err| CliError::failure(anyhow!("failed to build HTTP client: {err}")))?;

        Ok(AppContext {
            client,
            base_url: self.base_url,
            token,
            timeout: self.timeout,
        })
    }
}

/// Application context passed to command handlers.
#[derive(Clone)]
pub(crate) struct AppContext {
    pub(crate) client: Client,
    pub(crate) base_url: Url,
    pub(crate) token: String,
    pub(crate) timeout: Duration,
}

impl AppContext {
    /// Resolve path segments against the base URL, escaping each segment.
    pub(crate) fn endpoint(&self, segments: &[&str]) -> CliResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| CliError::failure(anyhow!("invalid base URL: {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, segments: &[&str]) -> CliResult<RequestBuilder> {
        let url = self.endpoint(segments)?;
        Ok(self.client.request(method, url).bearer_auth(&self.token))
    }

    pub(crate) async fn get<T: DeserializeOwned>(&self, segments: &[&str]) -> CliResult<T> {
        let request = self.request(Method::GET, segments)?;
        execute(request).await
    }

    pub(crate) async fn get_with_query<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        query: &[(&str, String)],
        timeout: Option<Duration>,
    ) -> CliResult<T> {
        let mut request = self.request(Method::GET, segments)?.query(query);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }
        execute(request).await
    }

    pub(crate) async fn post<B, T>(&self, segments: &[&str], body: &B) -> CliResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self.request(Method::POST, segments)?.json(body);
        execute(request).await
    }

    pub(crate) async fn patch<B, T>(&self, segments: &[&str], body: &B) -> CliResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self.request(Method::PATCH, segments)?.json(body);
        execute(request).await
    }

    pub(crate) async fn delete<T: DeserializeOwned>(&self, segments: &[&str]) -> CliResult<T> {
        let request = self.request(Method::DELETE, segments)?;
        execute(request).await
    }

    /// Fetch a collection, switching to the metadata search when a filter is given.
    pub(crate) async fn list_or_find<T: DeserializeOwned>(
        &self,
        collection: &str,
        metadata: Option<String>,
    ) -> CliResult<T> {
        match metadata {
            Some(metadata) => {
                self.get_with_query(&[collection], &[("metadata", metadata)], None)
                    .await
            }
            None => self.get(&[collection]).await,
        }
    }
}

async fn execute<T: DeserializeOwned>(request: RequestBuilder) -> CliResult<T> {
    let response = request.send().await.map_err(|err| {
        let target = err
            .url()
            .map_or_else(|| "klev API".to_string(), |url| url.path().to_string());
        CliError::failure(anyhow!("request to {target} failed: {err}"))
    })?;

    if !response.status().is_success() {
        return Err(classify_problem(response).await);
    }

    let path = response.url().path().to_string();
    response
        .json::<T>()
        .await
        .map_err(|err| CliError::failure(anyhow!("failed to decode response from {path}: {err}")))
}

/// Classify an HTTP error response into a CLI error.
pub(crate) async fn classify_problem(response: Response) -> CliError {
    let status = response.status();
    let path = response.url().path().to_string();
    let bytes = response.bytes().await.unwrap_or_default();

    if let Ok(error) = serde_json::from_slice::<ApiError>(&bytes) {
        return CliError::Remote { status, error };
    }

    let body_text = String::from_utf8_lossy(&bytes).trim().to_string();
    if body_text.is_empty() {
        CliError::failure(anyhow!("request to {path} failed with status {status}"))
    } else {
        CliError::failure(anyhow!(
            "request to {path} failed with status {status}: {body_text}"
        ))
    }
}

/// Parse the base URL provided to the CLI.
pub(crate) fn parse_url(input: &str) -> Result<Url, String> {
    input
        .parse::<Url>()
        .map_err(|err| format!("invalid URL '{input}': {err}"))
}


#[cfg(test)]
mod tests {
    use super::test_support::{TEST_TOKEN, context_with};
    use super::*;
    use httpmock::MockServer;
    use httpmock::prelude::*;
    use serde_json::{Value, json};

    fn config(token: Option<&str>) -> ClientConfig {
        ClientConfig {
            base_url: DEFAULT_BASE_URL.parse().expect("valid URL"),
            token: token.map(str::to_string),
            timeout: Duration::from_secs(1),
        }
    }

    #[test]
    fn missing_or_blank_token_is_a_validation_error() {
        for token in [None, Some(""), Some("   ")] {
            let err = config(token)
                .connect("trace")
                .err()
                .expect("token should be required");
            assert!(matches!(err, CliError::Validation(_)));
            assert_eq!(err.exit_code(), 2);
        }
        assert!(config(Some("tok")).connect("trace").is_ok());
    }

    #[test]
    fn endpoint_escapes_segments_and_keeps_base_path() {
        let ctx = ClientConfig {
            base_url: "http://localhost:8080/api/".parse().expect("valid URL"),
            token: Some("tok".into()),
            timeout: Duration::from_secs(1),
        }
        .connect("trace")
        .expect("context");
        let url = ctx.endpoint(&["log", "log_1/../x"]).expect("url");
        assert_eq!(url.as_str(), "http://localhost:8080/api/log/log_1%2F..%2Fx");
    }

    #[tokio::test]
    async fn requests_carry_bearer_and_request_id() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/paths")
                .header("authorization", format!("Bearer {TEST_TOKEN}"))
                .header(REQUEST_ID_HEADER, "trace-test");
            then.status(200).json_body(json!({"/logs": "list logs"}));
        });

        let ctx = context_with(&server);
        let paths: Value = ctx.get(&["paths"]).await.expect("paths should succeed");
        assert_eq!(paths["/logs"], "list logs");
        mock.assert();
    }

    #[tokio::test]
    async fn structured_error_bodies_become_remote_errors() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/log/log_missing");
            then.status(404)
                .json_body(json!({"code": "not_found", "message": "log not found"}));
        });

        let ctx = context_with(&server);
        let err = ctx
            .get::<Value>(&["log", "log_missing"])
            .await
            .expect_err("should fail");
        match &err {
            CliError::Remote { status, error } => {
                assert_eq!(*status, StatusCode::NOT_FOUND);
                assert_eq!(error.code, "not_found");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(err.exit_code(), 1);
    }

    #[tokio::test]
    async fn unstructured_error_bodies_become_failures() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/paths");
            then.status(502).body("bad gateway");
        });

        let ctx = context_with(&server);
        let err = ctx.get::<Value>(&["paths"]).await.expect_err("should fail");
        assert!(matches!(err, CliError::Failure(_)));
        assert!(err.display_message().contains("bad gateway"));
        assert_eq!(err.exit_code(), 3);
    }

    #[tokio::test]
    async fn list_or_find_switches_on_metadata_presence() {
        let server = MockServer::start_async().await;
        let find = server.mock(|when, then| {
            when.method(GET).path("/logs").query_param("metadata", "");
            then.status(200).json_body(json!({"logs": []}));
        });

        let ctx = context_with(&server);
        let _: Value = ctx
            .list_or_find("logs", Some(String::new()))
            .await
            .expect("find should succeed");
        find.assert();
    }
}
