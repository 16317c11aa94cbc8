//! Shared fixtures for integration tests

use async_trait::async_trait;

use bookrent_server::{
    models::book::{normalize_isbn, BookMetadata},
    services::metadata::MetadataSource,
    AppResult,
};

/// ISBN the stub source knows about
pub const KNOWN_ISBN: &str = "9780134685991";

/// Metadata source answering from a fixed table
pub struct StubMetadata;

pub fn effective_java() -> BookMetadata {
    BookMetadata {
        source_id: Some("ka2VUBqHiWkC".to_string()),
        isbn: KNOWN_ISBN.to_string(),
        title: "Effective Java".to_string(),
        authors: vec!["Joshua Bloch".to_string()],
        description: "Best practices for the Java platform".to_string(),
        image_url: "https://books.google.com/ej.jpg".to_string(),
        published_date: Some("2017-12-27".to_string()),
        degraded: false,
    }
}

#[async_trait]
impl MetadataSource for StubMetadata {
    async fn lookup_by_isbn(&self, isbn: &str) -> AppResult<Option<BookMetadata>> {
        if normalize_isbn(isbn) == KNOWN_ISBN {
            Ok(Some(effective_java()))
        } else {
            Ok(None)
        }
    }

    async fn search_popular(&self, _topics: &[String]) -> Vec<BookMetadata> {
        vec![effective_java()]
    }
}
