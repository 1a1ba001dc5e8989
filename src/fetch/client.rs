use async_trait::async_trait;
use reqwest::{Request, Response};

/// Executes a fully built request. Implemented by [`BasicClient`] and by test
/// doubles; the Selling Partner client is generic over it.
///
/// [`BasicClient`]: super::BasicClient
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, req: Request) -> reqwest::Result<Response>;
}
