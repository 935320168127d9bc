//! Author model and related types

use async_graphql::{InputObject, SimpleObject};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Author model from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, SimpleObject)]
#[graphql(complex)]
pub struct Author {
    pub id: i32,
    pub name: String,
    pub biography: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

/// Create or replace an author
#[derive(Debug, Clone, Deserialize, Validate, InputObject)]
pub struct AuthorInput {
    #[validate(length(min = 1, max = 200, message = "Name is required"))]
    pub name: String,
    #[validate(length(max = 10000, message = "Biography is too long"))]
    pub biography: Option<String>,
    pub birth_date: Option<NaiveDate>,
}

impl AuthorInput {
    /// Trimmed copy; a blank name is then caught by validation
    pub fn normalized(mut self) -> Self {
        self.name = self.name.trim().to_string();
        self.biography = self.biography.filter(|b| !b.trim().is_empty());
        self
    }
}
