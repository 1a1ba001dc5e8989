use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderName, HeaderValue};
use reqwest::{Method, Request, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::credentials::{CredentialResolver, Credentials};
use crate::error::ApiError;
use crate::fetch::{BasicClient, HttpClient};
use crate::marketplaces::Marketplace;
use crate::services::feeds_api::{
    ApiResponse, CreateFeedDocumentResponse, CreateFeedResponse, CreateFeedSpecification,
    DOCUMENTS_PATH, FEEDS_PATH, Feed, FeedDocument, FeedsApi, GetFeedsQuery, GetFeedsResponse,
};

/// Login with Amazon token endpoint.
pub const LWA_TOKEN_URL: &str = "https://api.amazon.com/auth/o2/token";

const ACCESS_TOKEN_HEADER: HeaderName = HeaderName::from_static("x-amz-access-token");
const RATE_LIMIT_HEADER: &str = "x-amzn-ratelimit-limit";
const REQUEST_ID_HEADER: &str = "x-amzn-requestid";

/// Access tokens are refreshed this long before they actually expire.
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    3600
}

struct CachedToken {
    value: String,
    expires_at: Instant,
}

/// Selling Partner API client for one account and marketplace.
///
/// The refresh token from the resolved [`Credentials`] is exchanged for an
/// access token on first use; the access token is cached until shortly
/// before it expires.
pub struct SellingPartnerClient<C = BasicClient> {
    pub(super) http: C,
    endpoint: Url,
    token_url: Url,
    marketplace: Marketplace,
    credentials: Credentials,
    access_token: Mutex<Option<CachedToken>>,
}

impl SellingPartnerClient<BasicClient> {
    pub fn new(credentials: Credentials, marketplace: Marketplace) -> Result<Self, ApiError> {
        Self::with_http(BasicClient::new()?, credentials, marketplace)
    }

    /// Resolves credentials for `account` through the default chain and builds a client.
    pub async fn for_account(account: &str, marketplace: Marketplace) -> Result<Self, ApiError> {
        let resolver = CredentialResolver::from_environment(account).await?;
        Self::new(resolver.into_credentials(), marketplace)
    }
}

impl<C: HttpClient> SellingPartnerClient<C> {
    pub fn with_http(
        http: C,
        credentials: Credentials,
        marketplace: Marketplace,
    ) -> Result<Self, ApiError> {
        Ok(Self {
            http,
            endpoint: Url::parse(marketplace.endpoint())?,
            token_url: Url::parse(LWA_TOKEN_URL)?,
            marketplace,
            credentials,
            access_token: Mutex::new(None),
        })
    }

    /// Overrides the API host, e.g. for a proxy or a local mock.
    pub fn with_endpoint(mut self, endpoint: &str) -> Result<Self, ApiError> {
        self.endpoint = Url::parse(endpoint)?;
        Ok(self)
    }

    pub fn with_token_url(mut self, token_url: &str) -> Result<Self, ApiError> {
        self.token_url = Url::parse(token_url)?;
        Ok(self)
    }

    /// Points the client at the regional sandbox host.
    pub fn sandbox(self) -> Result<Self, ApiError> {
        let endpoint = self.marketplace.region().sandbox_endpoint();
        self.with_endpoint(endpoint)
    }

    pub fn marketplace(&self) -> Marketplace {
        self.marketplace
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    async fn access_token(&self) -> Result<String, ApiError> {
        let mut cached = self.access_token.lock().await;
        if let Some(token) = cached.as_ref().filter(|t| t.expires_at > Instant::now()) {
            return Ok(token.value.clone());
        }

        let token = self.exchange_token().await?;
        let value = token.value.clone();
        *cached = Some(token);
        Ok(value)
    }

    async fn exchange_token(&self) -> Result<CachedToken, ApiError> {
        let refresh_token = self
            .credentials
            .refresh_token
            .as_deref()
            .ok_or(ApiError::RefreshTokenRequired)?;

        let body = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("grant_type", "refresh_token")
            .append_pair("refresh_token", refresh_token)
            .append_pair("client_id", &self.credentials.lwa_app_id)
            .append_pair("client_secret", &self.credentials.lwa_client_secret)
            .finish();

        let mut req = Request::new(Method::POST, self.token_url.clone());
        req.headers_mut().insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/x-www-form-urlencoded;charset=UTF-8"),
        );
        *req.body_mut() = Some(body.into());

        let response = self.http.execute(req).await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!(%status, "Access token exchange rejected");
            return Err(ApiError::TokenExchange { status, body });
        }

        let token: TokenResponse = serde_json::from_slice(&response.bytes().await?)?;
        debug!(expires_in = token.expires_in, "Exchanged refresh token for access token");

        let lifetime = Duration::from_secs(token.expires_in).saturating_sub(TOKEN_EXPIRY_MARGIN);
        Ok(CachedToken {
            value: token.access_token,
            expires_at: Instant::now() + lifetime,
        })
    }

    /// Resolves `path` against the endpoint, appending `id` as a single
    /// percent-encoded segment.
    fn resource_url(&self, path: &str, id: Option<&str>) -> Result<Url, ApiError> {
        let mut url = self.endpoint.join(path)?;
        if let Some(id) = id {
            if matches!(id, "" | "." | "..") {
                return Err(ApiError::InvalidIdentifier(id.to_string()));
            }
            url.path_segments_mut()
                .map_err(|()| ApiError::Url(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
                .push(id);
        }
        Ok(url)
    }

    /// Sends an authenticated API call and decodes the JSON response.
    ///
    /// An empty body decodes as JSON `null`, which is what `()` expects.
    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        mut url: Url,
        query: &[(&str, String)],
        body: Option<serde_json::Value>,
    ) -> Result<ApiResponse<T>, ApiError> {
        let access_token = HeaderValue::from_str(&self.access_token().await?)?;

        if !query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(query.iter().map(|(k, v)| (*k, v.as_str())));
        }

        let path = url.path().to_string();
        let mut req = Request::new(method.clone(), url);
        req.headers_mut().insert(ACCESS_TOKEN_HEADER, access_token);
        req.headers_mut()
            .insert(ACCEPT, HeaderValue::from_static("application/json"));
        if let Some(body) = body {
            req.headers_mut()
                .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
            *req.body_mut() = Some(serde_json::to_vec(&body)?.into());
        }

        debug!(%method, path = %path, "Calling Selling Partner API");
        let response = self.http.execute(req).await?;

        let status = response.status();
        let rate_limit = response
            .headers()
            .get(RATE_LIMIT_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok());
        let request_id = response
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let text = response.text().await?;

        if !status.is_success() {
            warn!(
                %method,
                path = %path,
                %status,
                request_id = ?request_id,
                "Selling Partner API call failed"
            );
            return Err(ApiError::from_status(status, &text));
        }

        let payload = if text.trim().is_empty() {
            serde_json::from_str("null")?
        } else {
            serde_json::from_str(&text)?
        };

        Ok(ApiResponse {
            payload,
            rate_limit,
            request_id,
        })
    }
}

#[async_trait]
impl<C: HttpClient> FeedsApi for SellingPartnerClient<C> {
    async fn get_feeds(
        &self,
        query: &GetFeedsQuery,
    ) -> Result<ApiResponse<GetFeedsResponse>, ApiError> {
        let url = self.resource_url(FEEDS_PATH, None)?;
        self.request(Method::GET, url, &query.to_query_pairs(), None)
            .await
    }

    async fn create_feed(
        &self,
        spec: &CreateFeedSpecification,
    ) -> Result<ApiResponse<CreateFeedResponse>, ApiError> {
        let body = serde_json::to_value(spec)?;
        let url = self.resource_url(FEEDS_PATH, None)?;
        self.request(Method::POST, url, &[], Some(body)).await
    }

    async fn cancel_feed(&self, feed_id: &str) -> Result<ApiResponse<()>, ApiError> {
        let url = self.resource_url(FEEDS_PATH, Some(feed_id))?;
        self.request(Method::DELETE, url, &[], None).await
    }

    async fn get_feed(&self, feed_id: &str) -> Result<ApiResponse<Feed>, ApiError> {
        let url = self.resource_url(FEEDS_PATH, Some(feed_id))?;
        self.request(Method::GET, url, &[], None).await
    }

    async fn create_feed_document(
        &self,
        content_type: &str,
    ) -> Result<ApiResponse<CreateFeedDocumentResponse>, ApiError> {
        let body = serde_json::json!({ "contentType": content_type });
        let url = self.resource_url(DOCUMENTS_PATH, None)?;
        self.request(Method::POST, url, &[], Some(body)).await
    }

    async fn get_feed_document(
        &self,
        feed_document_id: &str,
    ) -> Result<ApiResponse<FeedDocument>, ApiError> {
        let url = self.resource_url(DOCUMENTS_PATH, Some(feed_document_id))?;
        self.request(Method::GET, url, &[], None).await
    }
}
