//! Trait and types for the Feeds API (version 2021-06-30).

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::ApiError;

pub const FEEDS_PATH: &str = "/feeds/2021-06-30/feeds";
pub const DOCUMENTS_PATH: &str = "/feeds/2021-06-30/documents";

/// Processing state of a submitted feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProcessingStatus {
    Cancelled,
    Done,
    Fatal,
    InProgress,
    InQueue,
}

impl ProcessingStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ProcessingStatus::Cancelled => "CANCELLED",
            ProcessingStatus::Done => "DONE",
            ProcessingStatus::Fatal => "FATAL",
            ProcessingStatus::InProgress => "IN_PROGRESS",
            ProcessingStatus::InQueue => "IN_QUEUE",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Feed {
    pub feed_id: String,
    pub feed_type: String,
    #[serde(default)]
    pub marketplace_ids: Vec<String>,
    pub created_time: DateTime<Utc>,
    pub processing_status: ProcessingStatus,
    #[serde(default)]
    pub processing_start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub processing_end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub result_feed_document_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetFeedsResponse {
    #[serde(default)]
    pub feeds: Vec<Feed>,
    #[serde(default)]
    pub next_token: Option<String>,
}

/// Body of `createFeed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFeedSpecification {
    pub feed_type: String,
    pub marketplace_ids: Vec<String>,
    pub input_feed_document_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feed_options: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFeedResponse {
    pub feed_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFeedDocumentResponse {
    pub feed_document_id: String,
    pub url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CompressionAlgorithm {
    Gzip,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedDocument {
    pub feed_document_id: String,
    pub url: String,
    #[serde(default)]
    pub compression_algorithm: Option<CompressionAlgorithm>,
}

/// Filters for `getFeeds`. Either `feed_types` or `next_token` must be set;
/// when paging with `next_token` the API rejects any other parameter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GetFeedsQuery {
    pub feed_types: Vec<String>,
    pub marketplace_ids: Vec<String>,
    pub processing_statuses: Vec<ProcessingStatus>,
    pub page_size: Option<u32>,
    pub created_since: Option<DateTime<Utc>>,
    pub created_until: Option<DateTime<Utc>>,
    pub next_token: Option<String>,
}

impl GetFeedsQuery {
    pub fn feed_types<I, S>(types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            feed_types: types.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn next_page(token: impl Into<String>) -> Self {
        Self {
            next_token: Some(token.into()),
            ..Self::default()
        }
    }

    /// Query string pairs; list values are comma-joined, times are RFC 3339.
    pub fn to_query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if !self.feed_types.is_empty() {
            pairs.push(("feedTypes", self.feed_types.join(",")));
        }
        if !self.marketplace_ids.is_empty() {
            pairs.push(("marketplaceIds", self.marketplace_ids.join(",")));
        }
        if !self.processing_statuses.is_empty() {
            let statuses: Vec<_> = self.processing_statuses.iter().map(|s| s.as_str()).collect();
            pairs.push(("processingStatuses", statuses.join(",")));
        }
        if let Some(size) = self.page_size {
            pairs.push(("pageSize", size.to_string()));
        }
        if let Some(since) = self.created_since {
            pairs.push(("createdSince", since.to_rfc3339_opts(SecondsFormat::Secs, true)));
        }
        if let Some(until) = self.created_until {
            pairs.push(("createdUntil", until.to_rfc3339_opts(SecondsFormat::Secs, true)));
        }
        if let Some(token) = &self.next_token {
            pairs.push(("nextToken", token.clone()));
        }
        pairs
    }
}

/// A decoded response plus the metadata headers worth keeping.
#[derive(Debug, Clone)]
pub struct ApiResponse<T> {
    pub payload: T,
    /// Requests per second allowed for the operation (`x-amzn-RateLimit-Limit`).
    pub rate_limit: Option<f64>,
    pub request_id: Option<String>,
}

/// The Feeds API operations.
#[async_trait]
pub trait FeedsApi {
    /// Returns feed details for the feeds that match the query.
    async fn get_feeds(
        &self,
        query: &GetFeedsQuery,
    ) -> Result<ApiResponse<GetFeedsResponse>, ApiError>;

    async fn create_feed(
        &self,
        spec: &CreateFeedSpecification,
    ) -> Result<ApiResponse<CreateFeedResponse>, ApiError>;

    /// Cancels a feed; only feeds in `IN_QUEUE` can be cancelled.
    async fn cancel_feed(&self, feed_id: &str) -> Result<ApiResponse<()>, ApiError>;

    async fn get_feed(&self, feed_id: &str) -> Result<ApiResponse<Feed>, ApiError>;

    /// Creates a feed document and returns a presigned URL to upload its content to.
    async fn create_feed_document(
        &self,
        content_type: &str,
    ) -> Result<ApiResponse<CreateFeedDocumentResponse>, ApiError>;

    async fn get_feed_document(
        &self,
        feed_document_id: &str,
    ) -> Result<ApiResponse<FeedDocument>, ApiError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_query_pairs_join_lists() {
        let query = GetFeedsQuery {
            feed_types: vec![
                "POST_PRODUCT_DATA".into(),
                "POST_INVENTORY_AVAILABILITY_DATA".into(),
            ],
            marketplace_ids: vec!["ATVPDKIKX0DER".into()],
            processing_statuses: vec![ProcessingStatus::Done, ProcessingStatus::InQueue],
            page_size: Some(25),
            created_since: Some(Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()),
            ..GetFeedsQuery::default()
        };

        assert_eq!(
            query.to_query_pairs(),
            vec![
                (
                    "feedTypes",
                    "POST_PRODUCT_DATA,POST_INVENTORY_AVAILABILITY_DATA".to_string()
                ),
                ("marketplaceIds", "ATVPDKIKX0DER".to_string()),
                ("processingStatuses", "DONE,IN_QUEUE".to_string()),
                ("pageSize", "25".to_string()),
                ("createdSince", "2024-03-01T12:00:00Z".to_string()),
            ]
        );
    }

    #[test]
    fn test_next_page_only_sends_token() {
        assert_eq!(
            GetFeedsQuery::next_page("abc").to_query_pairs(),
            vec![("nextToken", "abc".to_string())]
        );
    }

    #[test]
    fn test_feed_decodes_from_api_shape() {
        let feed: Feed = serde_json::from_str(
            r#"{
                "feedId": "23492394",
                "feedType": "POST_PRODUCT_DATA",
                "marketplaceIds": ["ATVPDKIKX0DER"],
                "createdTime": "2019-12-11T13:16:24.630Z",
                "processingStatus": "DONE",
                "processingStartTime": "2019-12-11T13:16:30.000Z",
                "processingEndTime": "2019-12-11T13:17:24.630Z",
                "resultFeedDocumentId": "0356cf79-b8b0-4226-b4b9-0ee058ea5760"
            }"#,
        )
        .unwrap();

        assert_eq!(feed.processing_status, ProcessingStatus::Done);
        assert_eq!(
            feed.result_feed_document_id.as_deref(),
            Some("0356cf79-b8b0-4226-b4b9-0ee058ea5760")
        );
    }

    #[test]
    fn test_create_feed_spec_omits_missing_options() {
        let spec = CreateFeedSpecification {
            feed_type: "POST_PRODUCT_DATA".into(),
            marketplace_ids: vec!["ATVPDKIKX0DER".into()],
            input_feed_document_id: "doc-1".into(),
            feed_options: None,
        };
        let json = serde_json::to_value(&spec).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "feedType": "POST_PRODUCT_DATA",
                "marketplaceIds": ["ATVPDKIKX0DER"],
                "inputFeedDocumentId": "doc-1"
            })
        );
    }

    #[test]
    fn test_feed_document_compression() {
        let doc: FeedDocument = serde_json::from_str(
            r#"{"feedDocumentId": "d", "url": "https://example.com/d", "compressionAlgorithm": "GZIP"}"#,
        )
        .unwrap();
        assert_eq!(doc.compression_algorithm, Some(CompressionAlgorithm::Gzip));
    }
}
