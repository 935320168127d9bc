//! Catalog management service (authors and books)

use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{
        author::{Author, AuthorInput},
        book::{Book, BookInput},
        user::Requester,
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
}

impl CatalogService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    // =========================================================================
    // AUTHORS
    // =========================================================================

    pub async fn list_authors(&self) -> AppResult<Vec<Author>> {
        self.repository.authors.list().await
    }

    pub async fn get_author(&self, id: i32) -> AppResult<Author> {
        self.repository
            .authors
            .find_by_id(id)
            .await?
            .ok_or_else(|| author_not_found(id))
    }

    pub async fn create_author(&self, requester: &Requester, input: AuthorInput) -> AppResult<Author> {
        requester.require_admin()?;
        let input = input.normalized();
        input.validate()?;

        let author = self.repository.authors.create(&input).await?;
        tracing::info!("Created author id={}", author.id);
        Ok(author)
    }

    pub async fn update_author(
        &self,
        requester: &Requester,
        id: i32,
        input: AuthorInput,
    ) -> AppResult<Author> {
        requester.require_admin()?;
        let input = input.normalized();
        input.validate()?;

        self.repository
            .authors
            .update(id, &input)
            .await?
            .ok_or_else(|| author_not_found(id))
    }

    /// Books of the author stay in the catalog without an author
    pub async fn delete_author(&self, requester: &Requester, id: i32) -> AppResult<()> {
        requester.require_admin()?;
        if !self.repository.authors.delete(id).await? {
            return Err(author_not_found(id));
        }
        tracing::info!("Deleted author id={}", id);
        Ok(())
    }

    // =========================================================================
    // BOOKS
    // =========================================================================

    pub async fn list_books(&self) -> AppResult<Vec<Book>> {
        self.repository.books.list().await
    }

    pub async fn get_book(&self, id: i32) -> AppResult<Book> {
        self.repository
            .books
            .find_by_id(id)
            .await?
            .ok_or_else(|| book_not_found(id))
    }

    pub async fn books_by_author(&self, author_id: i32) -> AppResult<Vec<Book>> {
        self.repository.books.list_by_author(author_id).await
    }

    /// Substring search on title or author name. A blank query matches everything.
    pub async fn search_books(&self, query: &str) -> AppResult<Vec<Book>> {
        self.repository.books.search(query).await
    }

    pub async fn create_book(&self, requester: &Requester, input: BookInput) -> AppResult<Book> {
        requester.require_admin()?;
        let input = input.normalized();
        input.validate()?;
        self.check_author(input.author_id).await?;

        let book = self.repository.books.create(&input).await?;
        tracing::info!("Created book id={} with {} copies", book.id, book.total_copies);
        Ok(book)
    }

    pub async fn update_book(&self, requester: &Requester, id: i32, input: BookInput) -> AppResult<Book> {
        requester.require_admin()?;
        let input = input.normalized();
        input.validate()?;
        self.check_author(input.author_id).await?;

        self.repository
            .books
            .update(id, &input)
            .await?
            .ok_or_else(|| book_not_found(id))
    }

    pub async fn delete_book(&self, requester: &Requester, id: i32) -> AppResult<()> {
        requester.require_admin()?;
        if !self.repository.books.delete(id).await? {
            return Err(book_not_found(id));
        }
        tracing::info!("Deleted book id={}", id);
        Ok(())
    }

    /// Referential integrity is enforced at write time
    async fn check_author(&self, author_id: Option<i32>) -> AppResult<()> {
        if let Some(author_id) = author_id {
            self.get_author(author_id).await?;
        }
        Ok(())
    }
}

fn author_not_found(id: i32) -> AppError {
    AppError::NotFound(format!("Author with id {} not found", id))
}

fn book_not_found(id: i32) -> AppError {
    AppError::NotFound(format!("Book with id {} not found", id))
}
