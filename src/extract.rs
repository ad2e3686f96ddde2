//! Paged reads from the legacy REST source.

use std::collections::BTreeSet;
use std::time::Duration;

use reqwest::{header, RequestBuilder, Response};
use serde_json::Value;
use tracing::{debug, info};

use crate::config::Config;
use crate::entity::{Entity, OWNER_COLUMN, PRIMARY_KEY_COLUMN};
use crate::error::ExtractionError;
use crate::transform::SourceRow;

const API_KEY_HEADER: &str = "apikey";
const PREFER_EXACT_COUNT: &str = "count=exact";

/// Client for a PostgREST-style collection API.
#[derive(Debug, Clone)]
pub struct SourceClient {
    http: reqwest::Client,
    base_url: String,
    key: String,
    page_size: usize,
}

impl SourceClient {
    pub fn new(
        base_url: impl Into<String>,
        key: impl Into<String>,
        page_size: usize,
        request_timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(request_timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            key: key.into(),
            page_size: page_size.max(1),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, reqwest::Error> {
        Self::new(
            &config.source_url,
            &config.source_key,
            config.page_size,
            config.request_timeout,
        )
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    fn request(&self, collection: &str) -> RequestBuilder {
        self.http
            .get(format!("{}/{}", self.base_url, collection))
            .header(API_KEY_HEADER, &self.key)
            .bearer_auth(&self.key)
    }

    /// Every row of `collection`, ordered by primary key. Pages are fetched
    /// one after another until a short page; any failure discards what was
    /// read so far.
    pub async fn fetch_all(&self, collection: &str) -> Result<Vec<SourceRow>, ExtractionError> {
        self.fetch_pages(collection, "*").await
    }

    async fn fetch_pages(
        &self,
        collection: &str,
        select: &str,
    ) -> Result<Vec<SourceRow>, ExtractionError> {
        let order = format!("{PRIMARY_KEY_COLUMN}.asc");
        let limit = self.page_size.to_string();
        let mut rows = Vec::new();
        let mut offset = 0usize;
        loop {
            let request = self.request(collection).query(&[
                ("select", select),
                ("order", order.as_str()),
                ("limit", limit.as_str()),
                ("offset", offset.to_string().as_str()),
            ]);
            let page = read_rows(collection, request).await?;
            let fetched = page.len();
            debug!(target: "journal_migrate", event = "extract_page", collection, offset, fetched);
            rows.extend(page);
            if fetched < self.page_size {
                break;
            }
            offset += fetched;
        }
        info!(target: "journal_migrate", event = "extract_complete", collection, rows = rows.len());
        Ok(rows)
    }

    /// Exact row count as reported by the source's `Content-Range` header.
    pub async fn count(&self, collection: &str) -> Result<u64, ExtractionError> {
        let request = self
            .request(collection)
            .header("Prefer", PREFER_EXACT_COUNT)
            .query(&[("select", PRIMARY_KEY_COLUMN), ("limit", "1")]);
        let response = send(collection, request).await?;
        let header = response
            .headers()
            .get(header::CONTENT_RANGE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        header
            .as_deref()
            .and_then(parse_content_range)
            .ok_or_else(|| ExtractionError::MissingCount {
                collection: collection.to_string(),
                header,
            })
    }

    /// Sorted, de-duplicated owner ids taken from the profile collection.
    pub async fn distinct_owners(&self) -> Result<Vec<String>, ExtractionError> {
        let rows = self
            .fetch_pages(Entity::Profiles.source_collection(), OWNER_COLUMN)
            .await?;
        let owners: BTreeSet<String> = rows
            .iter()
            .filter_map(|row| row.get(OWNER_COLUMN).and_then(Value::as_str))
            .map(str::to_string)
            .collect();
        Ok(owners.into_iter().collect())
    }

    /// The first `n` rows of `collection` by primary key.
    pub async fn sample(&self, collection: &str, n: usize) -> Result<Vec<SourceRow>, ExtractionError> {
        let request = self.request(collection).query(&[
            ("select", "*".to_string()),
            ("order", format!("{PRIMARY_KEY_COLUMN}.asc")),
            ("limit", n.to_string()),
        ]);
        read_rows(collection, request).await
    }
}

async fn send(collection: &str, request: RequestBuilder) -> Result<Response, ExtractionError> {
    let response = request
        .send()
        .await
        .map_err(|source| ExtractionError::Transport {
            collection: collection.to_string(),
            source,
        })?;
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ExtractionError::Status {
        collection: collection.to_string(),
        status: status.as_u16(),
        body,
    })
}

async fn read_rows(
    collection: &str,
    request: RequestBuilder,
) -> Result<Vec<SourceRow>, ExtractionError> {
    let body = send(collection, request)
        .await?
        .bytes()
        .await
        .map_err(|source| ExtractionError::Transport {
            collection: collection.to_string(),
            source,
        })?;
    serde_json::from_slice(&body).map_err(|source| ExtractionError::Decode {
        collection: collection.to_string(),
        source,
    })
}

/// Total from a `Content-Range` value such as `0-24/3573` or `*/0`.
pub fn parse_content_range(value: &str) -> Option<u64> {
    let (_, total) = value.trim().rsplit_once('/')?;
    total.trim().parse().ok()
}
