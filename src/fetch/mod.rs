//! Raw HTTP plumbing shared by the API client and the document helpers.

mod basic;
mod client;

pub use basic::BasicClient;
pub use client::HttpClient;

use reqwest::header::{CONTENT_TYPE, HeaderValue};
use reqwest::{Method, Request, Url};

/// Downloads `url` and returns the body, failing on non-success statuses.
pub async fn fetch_bytes<C: HttpClient>(client: &C, url: Url) -> reqwest::Result<Vec<u8>> {
    let req = Request::new(Method::GET, url);
    let resp = client.execute(req).await?.error_for_status()?;
    Ok(resp.bytes().await?.to_vec())
}

/// Uploads `body` to `url` with a PUT, as presigned upload URLs expect.
pub async fn put_bytes<C: HttpClient>(
    client: &C,
    url: Url,
    content_type: HeaderValue,
    body: bytes::Bytes,
) -> reqwest::Result<()> {
    let mut req = Request::new(Method::PUT, url);
    req.headers_mut().insert(CONTENT_TYPE, content_type);
    *req.body_mut() = Some(body.into());
    client.execute(req).await?.error_for_status()?;
    Ok(())
}
