//! Books repository for database operations

use async_trait::async_trait;
use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::book::{search_pattern, Book, BookInput},
};

const BOOK_SELECT: &str = r#"
    SELECT b.id, b.title, b.isbn, b.author_id, a.name AS author_name,
           b.publication_year, b.genre, b.description,
           b.total_copies, b.available_copies, b.created_at
    FROM books b
    LEFT JOIN authors a ON a.id = b.author_id
"#;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BooksStore: Send + Sync {
    async fn list(&self) -> AppResult<Vec<Book>>;
    async fn find_by_id(&self, id: i32) -> AppResult<Option<Book>>;
    async fn list_by_author(&self, author_id: i32) -> AppResult<Vec<Book>>;
    /// Case-insensitive substring match on title or author name
    async fn search(&self, query: &str) -> AppResult<Vec<Book>>;
    /// New books start with every copy available
    async fn create(&self, input: &BookInput) -> AppResult<Book>;
    /// Replace all fields, recomputing availability from active loans.
    /// `None` when the book does not exist.
    async fn update(&self, id: i32, input: &BookInput) -> AppResult<Option<Book>>;
    /// Refuses while loans are active; `false` when the book does not exist
    async fn delete(&self, id: i32) -> AppResult<bool>;
}

#[derive(Clone)]
pub struct BooksRepository {
    pool: Pool<Postgres>,
}

impl BooksRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BooksStore for BooksRepository {
    async fn list(&self) -> AppResult<Vec<Book>> {
        let books = sqlx::query_as::<_, Book>(&format!("{} ORDER BY b.title, b.id", BOOK_SELECT))
            .fetch_all(&self.pool)
            .await?;
        Ok(books)
    }

    async fn find_by_id(&self, id: i32) -> AppResult<Option<Book>> {
        let book = sqlx::query_as::<_, Book>(&format!("{} WHERE b.id = $1", BOOK_SELECT))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(book)
    }

    async fn list_by_author(&self, author_id: i32) -> AppResult<Vec<Book>> {
        let books = sqlx::query_as::<_, Book>(&format!(
            "{} WHERE b.author_id = $1 ORDER BY b.title, b.id",
            BOOK_SELECT
        ))
        .bind(author_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(books)
    }

    async fn search(&self, query: &str) -> AppResult<Vec<Book>> {
        let pattern = search_pattern(query);
        let books = sqlx::query_as::<_, Book>(&format!(
            "{} WHERE b.title ILIKE $1 OR a.name ILIKE $1 ORDER BY b.title, b.id",
            BOOK_SELECT
        ))
        .bind(pattern)
        .fetch_all(&self.pool)
        .await?;
        Ok(books)
    }

    async fn create(&self, input: &BookInput) -> AppResult<Book> {
        let mut tx = self.pool.begin().await?;

        let id: i32 = sqlx::query_scalar(
            r#"
            INSERT INTO books (title, isbn, author_id, publication_year, genre, description,
                               total_copies, available_copies)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
            RETURNING id
            "#,
        )
        .bind(&input.title)
        .bind(&input.isbn)
        .bind(input.author_id)
        .bind(input.publication_year)
        .bind(&input.genre)
        .bind(&input.description)
        .bind(input.total_copies)
        .fetch_one(&mut *tx)
        .await?;

        let book = sqlx::query_as::<_, Book>(&format!("{} WHERE b.id = $1", BOOK_SELECT))
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(book)
    }

    async fn update(&self, id: i32, input: &BookInput) -> AppResult<Option<Book>> {
        let mut tx = self.pool.begin().await?;

        // Lock the row first so no borrow or return interleaves with the recount
        let locked: Option<i32> = sqlx::query_scalar("SELECT id FROM books WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        if locked.is_none() {
            return Ok(None);
        }

        let active: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM loans WHERE book_id = $1 AND status = 'active'",
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        if (input.total_copies as i64) < active {
            return Err(AppError::Conflict(format!(
                "Book {} has {} active loans; total copies cannot drop to {}",
                id, active, input.total_copies
            )));
        }

        sqlx::query(
            r#"
            UPDATE books
            SET title = $2, isbn = $3, author_id = $4, publication_year = $5,
                genre = $6, description = $7,
                total_copies = $8, available_copies = $8 - $9
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&input.title)
        .bind(&input.isbn)
        .bind(input.author_id)
        .bind(input.publication_year)
        .bind(&input.genre)
        .bind(&input.description)
        .bind(input.total_copies)
        .bind(active as i32)
        .execute(&mut *tx)
        .await?;

        let book = sqlx::query_as::<_, Book>(&format!("{} WHERE b.id = $1", BOOK_SELECT))
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some(book))
    }

    async fn delete(&self, id: i32) -> AppResult<bool> {
        let mut tx = self.pool.begin().await?;

        let locked: Option<i32> = sqlx::query_scalar("SELECT id FROM books WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        if locked.is_none() {
            return Ok(false);
        }

        let active: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM loans WHERE book_id = $1 AND status = 'active'",
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        if active > 0 {
            return Err(AppError::Conflict(format!(
                "Book {} cannot be deleted while {} loan(s) are active",
                id, active
            )));
        }

        sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(true)
    }
}
