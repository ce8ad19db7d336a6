//! DynamoDB JSON protocol store
//!
//! Writes batches with the `BatchWriteItem` action of the DynamoDB JSON 1.0
//! protocol. Aimed at DynamoDB Local and compatible emulators, which accept
//! any well-formed credentials; requests carry a SigV4-shaped Authorization
//! header that is not cryptographically signed.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::{HeaderMap, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

use super::{check_batch_size, BatchStore, StoreError, StoreResult};
use crate::loader::config::CONNECTION_POOL_HEADROOM;
use crate::Record;

/// HTTP connect timeout (seconds) - time to establish TCP connection
const HTTP_CONNECT_TIMEOUT_SECS: u64 = 10;
/// HTTP request timeout (seconds) - overall time for the entire request
const HTTP_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Value of the X-Amz-Target header for batch writes
pub const BATCH_WRITE_TARGET: &str = "DynamoDB_20120810.BatchWriteItem";
/// Content type of the JSON 1.0 protocol
pub const AMZ_JSON_CONTENT_TYPE: &str = "application/x-amz-json-1.0";
/// Default endpoint of DynamoDB Local
pub const DEFAULT_ENDPOINT: &str = "http://localhost:8000";

const REQUEST_ID_HEADER: &str = "x-amzn-requestid";

/// Store that talks to a DynamoDB-compatible HTTP endpoint
pub struct DynamoDbHttpStore {
    client: Client,
    endpoint: String,
    region: String,
    access_key: String,
}

impl DynamoDbHttpStore {
    /// Create a store for `endpoint`.
    ///
    /// The connection pool keeps `max_workers + 5` idle connections per host
    /// so every worker can hold one.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built
    pub fn new(endpoint: &str, region: &str, max_workers: usize) -> StoreResult<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(HTTP_CONNECT_TIMEOUT_SECS))
            .timeout(Duration::from_secs(HTTP_REQUEST_TIMEOUT_SECS))
            .pool_max_idle_per_host(max_workers + CONNECTION_POOL_HEADROOM)
            .build()
            .map_err(|e| StoreError::Other(format!("failed to build HTTP client: {e}")))?;

        let access_key =
            std::env::var("AWS_ACCESS_KEY_ID").unwrap_or_else(|_| "local".to_string());

        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            region: region.to_string(),
            access_key,
        })
    }

    /// Endpoint base URL
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn authorization(&self, date: &str) -> String {
        format!(
            "AWS4-HMAC-SHA256 Credential={}/{}/{}/dynamodb/aws4_request, \
             SignedHeaders=content-type;host;x-amz-date;x-amz-target, Signature={}",
            self.access_key,
            &date[..8],
            self.region,
            "0".repeat(64)
        )
    }
}

/// Build the `BatchWriteItem` request body. Every value is written as a string attribute.
pub fn batch_write_body(table: &str, records: &[Record]) -> Value {
    let requests: Vec<Value> = records
        .iter()
        .map(|record| {
            let item: Map<String, Value> = record
                .iter()
                .map(|(name, value)| (name.to_string(), json!({ "S": value })))
                .collect();
            json!({ "PutRequest": { "Item": item } })
        })
        .collect();

    let mut request_items = Map::new();
    request_items.insert(table.to_string(), Value::Array(requests));
    json!({ "RequestItems": request_items })
}

#[derive(Debug, Default, Deserialize)]
struct BatchWriteResponse {
    #[serde(rename = "UnprocessedItems", default)]
    unprocessed_items: HashMap<String, Vec<Value>>,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(rename = "__type")]
    error_type: Option<String>,
    message: Option<String>,
    #[serde(rename = "Message")]
    message_upper: Option<String>,
}

/// Count unprocessed items in a successful `BatchWriteItem` response body
pub fn count_unprocessed(body: &str) -> usize {
    serde_json::from_str::<BatchWriteResponse>(body)
        .map(|response| response.unprocessed_items.values().map(Vec::len).sum())
        .unwrap_or(0)
}

/// Turn an error response into a [`StoreError`].
///
/// The error code is the part of `__type` after the last `#`
/// (`com.amazonaws.dynamodb.v20120810#ValidationException`).
pub fn parse_error_response(
    status: StatusCode,
    body: &str,
    request_id: Option<String>,
) -> StoreError {
    let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();

    let code = parsed
        .error_type
        .as_deref()
        .map(|t| t.rsplit('#').next().unwrap_or(t).to_string())
        .filter(|c| !c.is_empty())
        .or_else(|| match status {
            StatusCode::INTERNAL_SERVER_ERROR => Some("InternalServerError".to_string()),
            StatusCode::SERVICE_UNAVAILABLE => Some("ServiceUnavailable".to_string()),
            StatusCode::TOO_MANY_REQUESTS => Some("TooManyRequestsException".to_string()),
            StatusCode::REQUEST_TIMEOUT => Some("RequestTimeout".to_string()),
            _ => None,
        });

    match code {
        Some(code) => StoreError::Service {
            code,
            message: parsed
                .message
                .or(parsed.message_upper)
                .unwrap_or_else(|| status.to_string()),
            request_id,
        },
        None => StoreError::Other(format!("HTTP {status}: {body}")),
    }
}

fn request_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

fn map_send_error(e: reqwest::Error) -> StoreError {
    if e.is_timeout() {
        StoreError::Timeout(e.to_string())
    } else if e.is_connect() {
        StoreError::Connection(e.to_string())
    } else {
        StoreError::Network(e.to_string())
    }
}

#[async_trait]
impl BatchStore for DynamoDbHttpStore {
    async fn write_batch(&self, table: &str, records: &[Record]) -> StoreResult<()> {
        check_batch_size(records)?;

        let date = Utc::now().format("%Y%m%dT%H%M%SZ").to_string();
        let body = batch_write_body(table, records);

        debug!(table, items = records.len(), endpoint = %self.endpoint, "Sending BatchWriteItem");

        let response = self
            .client
            .post(format!("{}/", self.endpoint))
            .header(CONTENT_TYPE, AMZ_JSON_CONTENT_TYPE)
            .header("X-Amz-Target", BATCH_WRITE_TARGET)
            .header("X-Amz-Date", &date)
            .header(AUTHORIZATION, self.authorization(&date))
            .body(body.to_string())
            .send()
            .await
            .map_err(map_send_error)?;

        let status = response.status();
        let request_id = request_id(response.headers());
        let text = response.text().await.map_err(map_send_error)?;

        if !status.is_success() {
            return Err(parse_error_response(status, &text, request_id));
        }

        let unprocessed = count_unprocessed(&text);
        if unprocessed > 0 {
            return Err(StoreError::Unprocessed {
                unprocessed,
                total: records.len(),
            });
        }

        Ok(())
    }

    fn describe(&self) -> String {
        format!("dynamodb({})", self.endpoint)
    }
}
