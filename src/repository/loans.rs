//! Loans repository for database operations
//!
//! Borrow and return each run in a single transaction whose counter change is a
//! conditional update on the book row. The row lock taken by that update is
//! what serializes concurrent borrowers, across any number of server processes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::loan::{Loan, LoanError, LoanStatus, NewLoan},
};

const LOAN_SELECT: &str = r#"
    SELECT l.id, l.user_id, l.book_id, u.username, b.title AS book_title,
           l.loan_date, l.due_date, l.return_date, l.status
    FROM loans l
    JOIN users u ON u.id = l.user_id
    JOIN books b ON b.id = l.book_id
"#;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LoansStore: Send + Sync {
    /// All loans, most recent first
    async fn list(&self) -> AppResult<Vec<Loan>>;
    async fn list_active(&self) -> AppResult<Vec<Loan>>;
    async fn list_by_user(&self, user_id: i32) -> AppResult<Vec<Loan>>;
    async fn list_by_book(&self, book_id: i32) -> AppResult<Vec<Loan>>;
    async fn find_by_id(&self, id: i32) -> AppResult<Option<Loan>>;
    /// Take one copy and record an active loan, atomically.
    /// Fails with `BookNotFound`, `UserNotFound` or `NoCopiesAvailable`.
    async fn borrow(&self, loan: &NewLoan) -> AppResult<Loan>;
    /// Close an active loan and give its copy back, atomically.
    /// Fails with `LoanNotFound` or `AlreadyReturned`.
    async fn return_loan(&self, id: i32, returned_at: DateTime<Utc>) -> AppResult<Loan>;
}

#[derive(Clone)]
pub struct LoansRepository {
    pool: Pool<Postgres>,
}

impl LoansRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LoansStore for LoansRepository {
    async fn list(&self) -> AppResult<Vec<Loan>> {
        let loans = sqlx::query_as::<_, Loan>(&format!(
            "{} ORDER BY l.loan_date DESC, l.id DESC",
            LOAN_SELECT
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(loans)
    }

    async fn list_active(&self) -> AppResult<Vec<Loan>> {
        let loans = sqlx::query_as::<_, Loan>(&format!(
            "{} WHERE l.status = 'active' ORDER BY l.loan_date DESC, l.id DESC",
            LOAN_SELECT
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(loans)
    }

    async fn list_by_user(&self, user_id: i32) -> AppResult<Vec<Loan>> {
        let loans = sqlx::query_as::<_, Loan>(&format!(
            "{} WHERE l.user_id = $1 ORDER BY l.loan_date DESC, l.id DESC",
            LOAN_SELECT
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(loans)
    }

    async fn list_by_book(&self, book_id: i32) -> AppResult<Vec<Loan>> {
        let loans = sqlx::query_as::<_, Loan>(&format!(
            "{} WHERE l.book_id = $1 ORDER BY l.loan_date DESC, l.id DESC",
            LOAN_SELECT
        ))
        .bind(book_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(loans)
    }

    async fn find_by_id(&self, id: i32) -> AppResult<Option<Loan>> {
        let loan = sqlx::query_as::<_, Loan>(&format!("{} WHERE l.id = $1", LOAN_SELECT))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(loan)
    }

    async fn borrow(&self, loan: &NewLoan) -> AppResult<Loan> {
        let mut tx = self.pool.begin().await?;

        // Check and decrement in one statement: it cannot take a copy that is not there
        let taken: Option<i32> = sqlx::query_scalar(
            r#"
            UPDATE books SET available_copies = available_copies - 1
            WHERE id = $1 AND available_copies > 0
            RETURNING id
            "#,
        )
        .bind(loan.book_id)
        .fetch_optional(&mut *tx)
        .await?;

        if taken.is_none() {
            let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM books WHERE id = $1)")
                .bind(loan.book_id)
                .fetch_one(&mut *tx)
                .await?;
            let err = if exists {
                LoanError::NoCopiesAvailable(loan.book_id)
            } else {
                LoanError::BookNotFound(loan.book_id)
            };
            return Err(err.into());
        }

        let id: i32 = sqlx::query_scalar(
            r#"
            INSERT INTO loans (user_id, book_id, loan_date, due_date, status)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(loan.user_id)
        .bind(loan.book_id)
        .bind(loan.loan_date)
        .bind(loan.due_date)
        .bind(LoanStatus::Active)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            let user_missing = e
                .as_database_error()
                .and_then(|db_err| db_err.constraint())
                == Some("loans_user_id_fkey");
            if user_missing {
                AppError::from(LoanError::UserNotFound(loan.user_id))
            } else {
                AppError::from(e)
            }
        })?;

        let created = sqlx::query_as::<_, Loan>(&format!("{} WHERE l.id = $1", LOAN_SELECT))
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(created)
    }

    async fn return_loan(&self, id: i32, returned_at: DateTime<Utc>) -> AppResult<Loan> {
        let mut tx = self.pool.begin().await?;

        // Only an active loan can transition; a concurrent second return matches nothing
        let book_id: Option<i32> = sqlx::query_scalar(
            r#"
            UPDATE loans SET status = $2, return_date = GREATEST($3, loan_date)
            WHERE id = $1 AND status = $4
            RETURNING book_id
            "#,
        )
        .bind(id)
        .bind(LoanStatus::Returned)
        .bind(returned_at)
        .bind(LoanStatus::Active)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(book_id) = book_id else {
            let status: Option<LoanStatus> = sqlx::query_scalar("SELECT status FROM loans WHERE id = $1")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
            let err = match status {
                Some(_) => LoanError::AlreadyReturned(id),
                None => LoanError::LoanNotFound(id),
            };
            return Err(err.into());
        };

        sqlx::query("UPDATE books SET available_copies = available_copies + 1 WHERE id = $1")
            .bind(book_id)
            .execute(&mut *tx)
            .await?;

        let returned = sqlx::query_as::<_, Loan>(&format!("{} WHERE l.id = $1", LOAN_SELECT))
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(returned)
    }
}
