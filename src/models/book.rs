//! Book (catalog entry) model and external metadata types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Catalog book. `isbn` is the canonical key, `id` the internal one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub id: Uuid,
    pub isbn: String,
    pub title: String,
    pub authors: Vec<String>,
    pub description: String,
    pub image_url: String,
    pub available: bool,
    /// Librarian who added the book; none for auto-imported books
    pub added_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Book fields handed to the store on creation
#[derive(Debug, Clone)]
pub struct NewBook {
    pub isbn: String,
    pub title: String,
    pub authors: Vec<String>,
    pub description: String,
    pub image_url: String,
    pub added_by: Option<Uuid>,
}

impl NewBook {
    /// Auto-import draft from external metadata, keyed by the requested ISBN
    pub fn from_metadata(isbn: &str, metadata: BookMetadata) -> Self {
        let title = if metadata.title.is_empty() {
            UNKNOWN_TITLE.to_string()
        } else {
            metadata.title
        };
        let authors = if metadata.authors.is_empty() && !metadata.degraded {
            vec![UNKNOWN_AUTHOR.to_string()]
        } else {
            metadata.authors
        };
        let description = if metadata.description.is_empty() {
            NO_DESCRIPTION.to_string()
        } else {
            metadata.description
        };

        NewBook {
            isbn: isbn.to_string(),
            title,
            authors,
            description,
            image_url: metadata.image_url,
            added_by: None,
        }
    }
}

/// Canonical catalog form of an ISBN: no hyphens, no whitespace
pub fn normalize_isbn(isbn: &str) -> String {
    isbn.chars()
        .filter(|c| *c != '-' && !c.is_whitespace())
        .collect()
}

pub const UNKNOWN_TITLE: &str = "Unknown Title";
pub const UNKNOWN_AUTHOR: &str = "Unknown Author";
pub const NO_DESCRIPTION: &str = "No description available.";

/// Create book request (librarian)
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateBook {
    #[validate(length(min = 1, message = "ISBN is required"))]
    pub isbn: String,
    #[validate(length(min = 1, message = "Title is required"))]
    pub title: String,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image_url: String,
}

/// Partial update (librarian). `available` is written only by the rental engine.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBook {
    #[validate(length(min = 1, message = "ISBN cannot be empty"))]
    pub isbn: Option<String>,
    #[validate(length(min = 1, message = "Title cannot be empty"))]
    pub title: Option<String>,
    pub authors: Option<Vec<String>>,
    pub description: Option<String>,
    pub image_url: Option<String>,
}

impl UpdateBook {
    pub fn apply(&self, book: &mut Book) {
        if let Some(ref isbn) = self.isbn {
            book.isbn = isbn.clone();
        }
        if let Some(ref title) = self.title {
            book.title = title.clone();
        }
        if let Some(ref authors) = self.authors {
            book.authors = authors.clone();
        }
        if let Some(ref description) = self.description {
            book.description = description.clone();
        }
        if let Some(ref image_url) = self.image_url {
            book.image_url = image_url.clone();
        }
    }
}

/// Metadata returned by the external book source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BookMetadata {
    /// Identifier at the source (volume id)
    #[serde(rename = "id", skip_serializing_if = "Option::is_none")]
    pub source_id: Option<String>,
    pub isbn: String,
    pub title: String,
    pub authors: Vec<String>,
    pub description: String,
    pub image_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_date: Option<String>,
    /// Placeholder built because the source could not be reached
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub degraded: bool,
}

impl BookMetadata {
    pub const PLACEHOLDER_TITLE: &'static str = "Book Title Unavailable";

    /// Record served when the upstream is down, so rentals keep working
    pub fn placeholder(isbn: &str) -> Self {
        BookMetadata {
            source_id: None,
            isbn: isbn.to_string(),
            title: Self::PLACEHOLDER_TITLE.to_string(),
            authors: Vec::new(),
            description: "Description temporarily unavailable.".to_string(),
            image_url: String::new(),
            published_date: None,
            degraded: true,
        }
    }

    /// Key used to deduplicate merged result sets
    pub fn dedup_key(&self) -> &str {
        if !self.isbn.is_empty() {
            &self.isbn
        } else {
            self.source_id.as_deref().unwrap_or("")
        }
    }
}
