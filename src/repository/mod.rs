//! Repository layer for database operations
//!
//! Each entity has a store trait (the seam the services depend on) and a
//! PostgreSQL implementation built on a shared `sqlx` pool.

pub mod authors;
pub mod books;
pub mod loans;
pub mod users;

use std::sync::Arc;

use sqlx::{Pool, Postgres};

pub use authors::AuthorsStore;
pub use books::BooksStore;
pub use loans::LoansStore;
pub use users::UsersStore;

/// Main repository struct holding one store per entity
#[derive(Clone)]
pub struct Repository {
    pub authors: Arc<dyn AuthorsStore>,
    pub books: Arc<dyn BooksStore>,
    pub users: Arc<dyn UsersStore>,
    pub loans: Arc<dyn LoansStore>,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            authors: Arc::new(authors::AuthorsRepository::new(pool.clone())),
            books: Arc::new(books::BooksRepository::new(pool.clone())),
            users: Arc::new(users::UsersRepository::new(pool.clone())),
            loans: Arc::new(loans::LoansRepository::new(pool)),
        }
    }

    /// Assemble a repository from arbitrary store implementations
    pub fn from_stores(
        authors: Arc<dyn AuthorsStore>,
        books: Arc<dyn BooksStore>,
        users: Arc<dyn UsersStore>,
        loans: Arc<dyn LoansStore>,
    ) -> Self {
        Self {
            authors,
            books,
            users,
            loans,
        }
    }
}
