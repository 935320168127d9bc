//! Book model and related types

use async_graphql::{InputObject, SimpleObject};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Book model from database, with the owning author's name joined in
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, SimpleObject)]
#[graphql(complex)]
pub struct Book {
    pub id: i32,
    pub title: String,
    pub isbn: Option<String>,
    pub author_id: Option<i32>,
    pub author_name: Option<String>,
    pub publication_year: Option<i32>,
    pub genre: Option<String>,
    pub description: Option<String>,
    pub total_copies: i32,
    pub available_copies: i32,
    pub created_at: DateTime<Utc>,
}

/// Create or replace a book
#[derive(Debug, Clone, Deserialize, Validate, InputObject)]
pub struct BookInput {
    #[validate(length(min = 1, max = 500, message = "Title is required"))]
    pub title: String,
    #[validate(length(min = 10, max = 17, message = "ISBN must be 10 to 17 characters"))]
    pub isbn: Option<String>,
    pub author_id: Option<i32>,
    #[validate(range(min = -3000, max = 3000, message = "Publication year is out of range"))]
    pub publication_year: Option<i32>,
    pub genre: Option<String>,
    pub description: Option<String>,
    #[graphql(default = 1)]
    #[serde(default = "default_total_copies")]
    #[validate(range(min = 1, message = "A book has at least one copy"))]
    pub total_copies: i32,
}

fn default_total_copies() -> i32 {
    1
}

impl BookInput {
    /// Trims text fields and drops blank optional ones
    pub fn normalized(mut self) -> Self {
        fn blank_to_none(value: Option<String>) -> Option<String> {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        }

        self.title = self.title.trim().to_string();
        self.isbn = blank_to_none(self.isbn);
        self.genre = blank_to_none(self.genre);
        self.description = blank_to_none(self.description);
        self
    }
}

/// Escape LIKE metacharacters and wrap the term for a substring match
pub fn search_pattern(query: &str) -> String {
    let mut escaped = String::with_capacity(query.len() + 2);
    escaped.push('%');
    for c in query.trim().chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}
