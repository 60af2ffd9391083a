//! Backblaze B2 API Client
//!
//! Holds the authorized session and the shared request/response plumbing used
//! by every bucket and file operation: building authenticated requests,
//! decoding JSON success bodies, and turning non-success responses into
//! [`B2Error::Api`].

use base64::Engine;
use reqwest::header::{HeaderMap, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

use super::endpoints::Endpoint;
use super::errors::{B2Error, Result};
use super::types::{Credentials, Session};
use crate::config::ClientConfig;

/// Content type sent with every JSON API call
pub const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// B2 API client for making authenticated requests
///
/// Cloning is cheap: clones share the session and the connection pool.
#[derive(Clone)]
pub struct B2Client {
    /// HTTP client for making requests
    http_client: Client,
    /// Session from b2_authorize_account, never modified after construction
    session: Arc<Session>,
}

impl B2Client {
    /// Authorize with B2 using the default configuration
    pub async fn authorize(credentials: &Credentials) -> Result<Self> {
        Self::authorize_with_config(credentials, &ClientConfig::default()).await
    }

    /// Authorize with B2 and create a new client
    ///
    /// # Arguments
    /// * `credentials` - Account (or application key) ID and application key
    /// * `config` - Authorization URL and request timeout
    ///
    /// # Returns
    /// A new B2Client ready for API calls
    pub async fn authorize_with_config(
        credentials: &Credentials,
        config: &ClientConfig,
    ) -> Result<Self> {
        info!(account_id = %credentials.account_id, "Authorizing with B2 API...");

        let http_client = build_http_client(config)?;

        // Create Basic Auth header
        let pair = format!("{}:{}", credentials.account_id, credentials.application_key);
        let encoded = base64::engine::general_purpose::STANDARD.encode(pair);
        let auth_header = format!("Basic {}", encoded);

        let request = http_client
            .get(&config.auth_url)
            .header(AUTHORIZATION, auth_header);

        let session: Session = request_json(request).await?;

        debug!(
            api_url = %session.api_url,
            download_url = %session.download_url,
            "B2 authorization successful"
        );

        Ok(Self {
            http_client,
            session: Arc::new(session),
        })
    }

    /// Create a client from a session obtained earlier, without a network call
    pub fn from_session(session: Session, config: &ClientConfig) -> Result<Self> {
        Ok(Self {
            http_client: build_http_client(config)?,
            session: Arc::new(session),
        })
    }

    /// The authorized session
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Get the account ID
    pub fn account_id(&self) -> &str {
        &self.session.account_id
    }

    /// Full URL of an API endpoint
    pub(crate) fn api_url(&self, endpoint: Endpoint) -> String {
        format!("{}{}", self.session.api_url, endpoint.path())
    }

    /// Full URL of a path under the download URL
    pub(crate) fn download_url(&self, path: &str) -> String {
        format!("{}{}", self.session.download_url, path)
    }

    pub(crate) fn http_client(&self) -> &Client {
        &self.http_client
    }

    /// Apply the Authorization and Content-Type headers used by JSON API calls
    pub(crate) fn set_headers(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header(AUTHORIZATION, &self.session.authorization_token)
            .header(CONTENT_TYPE, JSON_CONTENT_TYPE)
    }

    /// Build an authenticated JSON POST to an arbitrary URL
    pub(crate) fn post_json<B: Serialize>(&self, url: &str, body: &B) -> Result<RequestBuilder> {
        let body = serde_json::to_vec(body)?;
        Ok(self.set_headers(self.http_client.post(url)).body(body))
    }

    /// POST a JSON body to an API endpoint and decode the JSON response
    pub(crate) async fn call<B, T>(&self, endpoint: Endpoint, body: &B) -> Result<T>
    where
        B: Serialize,
        T: DeserializeOwned,
    {
        debug!(endpoint = endpoint.name(), "Calling B2 API");
        let request = self.post_json(&self.api_url(endpoint), body)?;
        request_json(request).await
    }
}

/// Build the shared HTTP client
fn build_http_client(config: &ClientConfig) -> Result<Client> {
    Ok(Client::builder().timeout(config.timeout).build()?)
}

/// Send a request and read the full response
async fn execute(request: RequestBuilder) -> Result<(StatusCode, HeaderMap, Vec<u8>)> {
    let response = request.send().await?;
    let status = response.status();
    let headers = response.headers().clone();
    let body = response.bytes().await?;
    Ok((status, headers, body.to_vec()))
}

/// Execute a request and decode a JSON success body.
///
/// Any status other than `200 OK` is decoded as a B2 error document.
pub(crate) async fn request_json<T: DeserializeOwned>(request: RequestBuilder) -> Result<T> {
    let (status, _, body) = execute(request).await?;
    if status != StatusCode::OK {
        return Err(B2Error::from_status(status.as_u16(), &body));
    }
    Ok(serde_json::from_slice(&body)?)
}

/// Execute a request and return the raw body with the response headers.
pub(crate) async fn request_bytes(request: RequestBuilder) -> Result<(Vec<u8>, HeaderMap)> {
    let (status, headers, body) = execute(request).await?;
    if status != StatusCode::OK {
        return Err(B2Error::from_status(status.as_u16(), &body));
    }
    Ok((body, headers))
}

#[cfg(test)]
impl B2Client {
    /// Client whose API and download URLs both point at `base_url`
    pub(crate) fn for_tests(base_url: &str) -> Self {
        let session = Session {
            account_id: "a".to_string(),
            api_url: base_url.to_string(),
            authorization_token: "t".to_string(),
            download_url: base_url.to_string(),
        };
        Self::from_session(session, &ClientConfig::default()).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde::Deserialize;
    use serde_json::json;

    fn config_for(server: &MockServer) -> ClientConfig {
        ClientConfig {
            auth_url: server.url(Endpoint::AuthorizeAccount.path()),
            ..ClientConfig::default()
        }
    }

    #[tokio::test]
    async fn test_authorize_populates_session() {
        let server = MockServer::start_async().await;
        let expected_auth = format!(
            "Basic {}",
            base64::engine::general_purpose::STANDARD.encode("a:secret")
        );

        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/b2api/v1/b2_authorize_account")
                    .header("authorization", expected_auth.as_str());
                then.status(200).json_body(json!({
                    "accountId": "a",
                    "apiUrl": "u",
                    "authorizationToken": "t",
                    "downloadUrl": "d"
                }));
            })
            .await;

        let client = B2Client::authorize_with_config(
            &Credentials::new("a", "secret"),
            &config_for(&server),
        )
        .await
        .unwrap();

        mock.assert_async().await;
        assert_eq!(
            client.session(),
            &Session {
                account_id: "a".to_string(),
                api_url: "u".to_string(),
                authorization_token: "t".to_string(),
                download_url: "d".to_string(),
            }
        );
        assert_eq!(client.account_id(), "a");
    }

    #[tokio::test]
    async fn test_authorize_bad_credentials() {
        let server = MockServer::start_async().await;

        server
            .mock_async(|when, then| {
                when.method(GET).path("/b2api/v1/b2_authorize_account");
                then.status(401).json_body(json!({
                    "code": "unauthorized",
                    "message": "Invalid accountId or applicationKeyId",
                    "status": 401
                }));
            })
            .await;

        let err = B2Client::authorize_with_config(
            &Credentials::new("a", "wrong"),
            &config_for(&server),
        )
        .await
        .err()
        .expect("authorization should fail");

        assert!(err.is_unauthorized());
        assert_eq!(err.api_error().unwrap().code, "unauthorized");
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Echo {
        value: u32,
    }

    #[tokio::test]
    async fn test_call_sends_auth_headers_and_decodes() {
        let server = MockServer::start_async().await;

        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/b2api/v1/b2_get_file_info")
                    .header("authorization", "t")
                    .header("content-type", JSON_CONTENT_TYPE)
                    .json_body(json!({"fileId": "f1"}));
                then.status(200).json_body(json!({"value": 7}));
            })
            .await;

        let client = B2Client::for_tests(&server.base_url());
        let echo: Echo = client
            .call(Endpoint::GetFileInfo, &json!({"fileId": "f1"}))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(echo, Echo { value: 7 });
    }

    #[tokio::test]
    async fn test_non_success_yields_only_api_error() {
        let server = MockServer::start_async().await;

        server
            .mock_async(|when, then| {
                when.method(POST).path("/b2api/v1/b2_get_file_info");
                // A body that would also decode as the success type
                then.status(400).json_body(json!({
                    "code": "bad_request",
                    "message": "fileId is invalid",
                    "status": 400,
                    "value": 7
                }));
            })
            .await;

        let client = B2Client::for_tests(&server.base_url());
        let err = client
            .call::<_, Echo>(Endpoint::GetFileInfo, &json!({"fileId": "nope"}))
            .await
            .unwrap_err();

        match err {
            B2Error::Api(api) => {
                assert_eq!(api.code, "bad_request");
                assert_eq!(api.message, "fileId is invalid");
                assert_eq!(api.status, 400);
            }
            other => panic!("Expected Api error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_malformed_error_body() {
        let server = MockServer::start_async().await;

        server
            .mock_async(|when, then| {
                when.method(POST).path("/b2api/v1/b2_get_file_info");
                then.status(503).body("Service Unavailable");
            })
            .await;

        let client = B2Client::for_tests(&server.base_url());
        let err = client
            .call::<_, Echo>(Endpoint::GetFileInfo, &json!({"fileId": "f1"}))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            B2Error::UnexpectedResponse { status: 503, .. }
        ));
        assert!(err.api_error().is_none());
    }

    #[tokio::test]
    async fn test_malformed_success_body() {
        let server = MockServer::start_async().await;

        server
            .mock_async(|when, then| {
                when.method(POST).path("/b2api/v1/b2_get_file_info");
                then.status(200).body("not json");
            })
            .await;

        let client = B2Client::for_tests(&server.base_url());
        let err = client
            .call::<_, Echo>(Endpoint::GetFileInfo, &json!({"fileId": "f1"}))
            .await
            .unwrap_err();

        assert!(matches!(err, B2Error::Decode(_)));
    }

    #[tokio::test]
    async fn test_request_bytes_returns_body_and_headers() {
        let server = MockServer::start_async().await;

        server
            .mock_async(|when, then| {
                when.method(GET).path("/raw");
                then.status(200).header("X-Bz-File-Id", "f1").body("hello");
            })
            .await;

        let client = B2Client::for_tests(&server.base_url());
        let request = client.http_client().get(client.download_url("/raw"));
        let (body, headers) = request_bytes(request).await.unwrap();

        assert_eq!(body, b"hello");
        assert_eq!(headers.get("x-bz-file-id").unwrap(), "f1");
    }

    #[tokio::test]
    async fn test_connection_failure_is_transport_error() {
        // Nothing listens on port 9 (discard) in the test environment
        let client = B2Client::for_tests("http://127.0.0.1:9");
        let err = client
            .call::<_, Echo>(Endpoint::GetFileInfo, &json!({"fileId": "f1"}))
            .await
            .unwrap_err();

        assert!(matches!(err, B2Error::Http(_)));
    }
}
