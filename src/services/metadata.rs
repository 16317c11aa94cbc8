//! External book metadata source (Google Books volumes API)
//!
//! Ordinary failures never cross this boundary as errors: a lookup that
//! cannot reach the upstream yields a placeholder record, and a popular
//! search that fails for every topic yields an empty list. Only
//! configuration problems surface as `AppError`.

use std::{collections::HashSet, time::Duration};

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

use crate::{
    config::MetadataConfig,
    error::{AppError, AppResult},
    models::book::{normalize_isbn, BookMetadata, NO_DESCRIPTION, UNKNOWN_AUTHOR, UNKNOWN_TITLE},
};

const DESCRIPTION_PREVIEW_CHARS: usize = 200;

static HTML_TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("valid html tag pattern"));

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MetadataSource: Send + Sync {
    /// Best-effort lookup. `None` means the source has no such ISBN.
    async fn lookup_by_isbn(&self, isbn: &str) -> AppResult<Option<BookMetadata>>;

    /// One query per topic, merged, deduplicated and truncated
    async fn search_popular(&self, topics: &[String]) -> Vec<BookMetadata>;
}

#[derive(Debug, Deserialize)]
struct VolumesResponse {
    #[serde(default)]
    items: Vec<Volume>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Volume {
    id: String,
    #[serde(default)]
    volume_info: VolumeInfo,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VolumeInfo {
    title: Option<String>,
    authors: Option<Vec<String>>,
    description: Option<String>,
    published_date: Option<String>,
    image_links: Option<ImageLinks>,
    #[serde(default)]
    industry_identifiers: Vec<IndustryIdentifier>,
}

#[derive(Debug, Deserialize)]
struct ImageLinks {
    thumbnail: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IndustryIdentifier {
    #[serde(rename = "type")]
    kind: String,
    identifier: String,
}

impl VolumeInfo {
    fn title(&self) -> String {
        self.title.clone().unwrap_or_else(|| UNKNOWN_TITLE.to_string())
    }

    fn authors(&self) -> Vec<String> {
        match self.authors {
            Some(ref authors) if !authors.is_empty() => authors.clone(),
            _ => vec![UNKNOWN_AUTHOR.to_string()],
        }
    }

    fn thumbnail(&self) -> String {
        self.image_links
            .as_ref()
            .and_then(|links| links.thumbnail.as_deref())
            .map(|url| url.replacen("http://", "https://", 1))
            .unwrap_or_default()
    }

    /// ISBN-13 when present, else the first identifier
    fn isbn(&self) -> Option<String> {
        self.industry_identifiers
            .iter()
            .find(|id| id.kind == "ISBN_13")
            .or_else(|| self.industry_identifiers.first())
            .map(|id| id.identifier.clone())
    }
}

/// Metadata for an exact ISBN match
fn lookup_from_volume(isbn: &str, volume: Volume) -> BookMetadata {
    let info = &volume.volume_info;
    BookMetadata {
        source_id: Some(volume.id.clone()),
        isbn: isbn.to_string(),
        title: info.title(),
        authors: info.authors(),
        description: info
            .description
            .clone()
            .unwrap_or_else(|| NO_DESCRIPTION.to_string()),
        image_url: info.thumbnail(),
        published_date: info.published_date.clone(),
        degraded: false,
    }
}

/// Metadata for a popular-listing card
fn popular_from_volume(volume: Volume) -> BookMetadata {
    let info = &volume.volume_info;
    BookMetadata {
        isbn: info.isbn().unwrap_or_else(|| volume.id.clone()),
        title: info.title(),
        authors: info.authors(),
        description: info
            .description
            .as_deref()
            .map(|d| preview(&strip_html(d), DESCRIPTION_PREVIEW_CHARS))
            .unwrap_or_else(|| NO_DESCRIPTION.to_string()),
        image_url: info.thumbnail(),
        published_date: Some(info.published_date.clone().unwrap_or_default()),
        degraded: false,
        source_id: Some(volume.id),
    }
}

/// Remove complete tags only; a lone `<` is ordinary text
fn strip_html(s: &str) -> String {
    HTML_TAG_RE.replace_all(s, "").into_owned()
}

/// First `max_chars` characters followed by an ellipsis
fn preview(s: &str, max_chars: usize) -> String {
    let cut = s.char_indices().nth(max_chars).map_or(s.len(), |(i, _)| i);
    format!("{}...", &s[..cut])
}

/// Merge per-topic batches: first occurrence wins, then truncate
pub fn merge_popular(batches: Vec<Vec<BookMetadata>>, limit: usize) -> Vec<BookMetadata> {
    let mut seen = HashSet::new();
    batches
        .into_iter()
        .flatten()
        .filter(|book| seen.insert(book.dedup_key().to_string()))
        .take(limit)
        .collect()
}

/// HTTP client for the Google Books volumes API
#[derive(Clone)]
pub struct GoogleBooksClient {
    http: reqwest::Client,
    base_url: String,
    max_results_per_topic: u32,
    popular_limit: usize,
}

impl GoogleBooksClient {
    pub fn new(config: &MetadataConfig) -> AppResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build metadata client: {}", e)))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            max_results_per_topic: config.max_results_per_topic,
            popular_limit: config.popular_limit,
        })
    }

    async fn volumes(&self, query: &[(&str, String)]) -> Result<VolumesResponse, reqwest::Error> {
        self.http
            .get(format!("{}/volumes", self.base_url))
            .query(query)
            .send()
            .await?
            .error_for_status()?
            .json::<VolumesResponse>()
            .await
    }
}

#[async_trait]
impl MetadataSource for GoogleBooksClient {
    async fn lookup_by_isbn(&self, isbn: &str) -> AppResult<Option<BookMetadata>> {
        let clean = normalize_isbn(isbn);

        match self.volumes(&[("q", format!("isbn:{}", clean))]).await {
            Ok(response) => Ok(response
                .items
                .into_iter()
                .next()
                .map(|volume| lookup_from_volume(&clean, volume))),
            Err(e) if e.is_builder() => Err(AppError::Internal(format!(
                "Invalid metadata source url {}: {}",
                self.base_url, e
            ))),
            Err(e) => {
                tracing::warn!(isbn = %clean, timeout = e.is_timeout(), "Metadata lookup failed, using placeholder: {}", e);
                Ok(Some(BookMetadata::placeholder(&clean)))
            }
        }
    }

    async fn search_popular(&self, topics: &[String]) -> Vec<BookMetadata> {
        let mut batches = Vec::with_capacity(topics.len());

        for topic in topics {
            let query = [
                ("q", topic.clone()),
                ("maxResults", self.max_results_per_topic.to_string()),
                ("orderBy", "relevance".to_string()),
            ];
            match self.volumes(&query).await {
                Ok(response) => {
                    batches.push(response.items.into_iter().map(popular_from_volume).collect());
                }
                Err(e) => {
                    tracing::warn!(topic = %topic, "Popular books query failed: {}", e);
                }
            }
        }

        merge_popular(batches, self.popular_limit)
    }
}
