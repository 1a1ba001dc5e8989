//! Feed document upload and download on top of the Feeds API.

use bytes::Bytes;
use flate2::read::GzDecoder;
use reqwest::Url;
use reqwest::header::HeaderValue;
use std::collections::BTreeMap;
use std::io::Read;
use tracing::info;

use super::client::SellingPartnerClient;
use crate::error::ApiError;
use crate::fetch::{HttpClient, fetch_bytes, put_bytes};
use crate::services::feeds_api::{
    ApiResponse, CompressionAlgorithm, CreateFeedDocumentResponse, CreateFeedResponse,
    CreateFeedSpecification, FeedsApi,
};

/// Feed submission parameters beyond the content itself.
#[derive(Debug, Clone, Default)]
pub struct SubmitFeedOptions {
    /// Defaults to the client's marketplace when empty.
    pub marketplace_ids: Vec<String>,
    pub feed_options: Option<BTreeMap<String, String>>,
}

impl<C: HttpClient> SellingPartnerClient<C> {
    /// Creates a feed document, uploads `content` to it and creates the feed.
    ///
    /// Returns the document that was created alongside the `createFeed` response.
    pub async fn submit_feed(
        &self,
        feed_type: &str,
        content: impl Into<Bytes>,
        content_type: &str,
        options: SubmitFeedOptions,
    ) -> Result<(CreateFeedDocumentResponse, ApiResponse<CreateFeedResponse>), ApiError> {
        let document = self.create_feed_document(content_type).await?.payload;

        let content = content.into();
        info!(
            feed_document_id = %document.feed_document_id,
            bytes = content.len(),
            "Uploading feed document"
        );
        put_bytes(
            &self.http,
            Url::parse(&document.url)?,
            HeaderValue::from_str(content_type)?,
            content,
        )
        .await?;

        let marketplace_ids = if options.marketplace_ids.is_empty() {
            vec![self.marketplace().id().to_string()]
        } else {
            options.marketplace_ids
        };

        let spec = CreateFeedSpecification {
            feed_type: feed_type.to_string(),
            marketplace_ids,
            input_feed_document_id: document.feed_document_id.clone(),
            feed_options: options.feed_options,
        };
        let feed = self.create_feed(&spec).await?;
        info!(feed_id = %feed.payload.feed_id, feed_type, "Feed submitted");

        Ok((document, feed))
    }

    /// Downloads a feed document (typically a processing report), inflating
    /// it when the API reports GZIP compression.
    pub async fn download_feed_document(
        &self,
        feed_document_id: &str,
    ) -> Result<Vec<u8>, ApiError> {
        let document = self.get_feed_document(feed_document_id).await?.payload;
        let raw = fetch_bytes(&self.http, Url::parse(&document.url)?).await?;

        match document.compression_algorithm {
            Some(CompressionAlgorithm::Gzip) => Ok(gunzip(&raw)?),
            None => Ok(raw),
        }
    }
}

fn gunzip(data: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut out = Vec::new();
    GzDecoder::new(data).read_to_end(&mut out)?;
    Ok(out)
}
