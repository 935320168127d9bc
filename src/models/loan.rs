//! Loan (borrow) model and related types

use async_graphql::{Enum, SimpleObject};
use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Decode, Encode, FromRow, Postgres};
use thiserror::Error;

use crate::error::AppError;

/// Loan lifecycle status. `Active` moves to `Returned` exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Enum)]
#[serde(rename_all = "lowercase")]
pub enum LoanStatus {
    Active,
    Returned,
}

impl LoanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoanStatus::Active => "active",
            LoanStatus::Returned => "returned",
        }
    }
}

impl std::str::FromStr for LoanStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(LoanStatus::Active),
            "returned" => Ok(LoanStatus::Returned),
            _ => Err(format!("Invalid loan status: {}", s)),
        }
    }
}

impl sqlx::Type<Postgres> for LoanStatus {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<Postgres>>::type_info()
    }
}

impl<'r> Decode<'r, Postgres> for LoanStatus {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s: String = Decode::<Postgres>::decode(value)?;
        s.parse().map_err(|e: String| e.into())
    }
}

impl Encode<'_, Postgres> for LoanStatus {
    fn encode_by_ref(&self, buf: &mut sqlx::postgres::PgArgumentBuffer) -> sqlx::encode::IsNull {
        <&str as Encode<Postgres>>::encode(self.as_str(), buf)
    }
}

/// Loan with the borrower's username and the book title denormalized
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, SimpleObject)]
#[graphql(complex)]
pub struct Loan {
    pub id: i32,
    pub user_id: i32,
    pub book_id: i32,
    pub username: String,
    pub book_title: String,
    pub loan_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub return_date: Option<DateTime<Utc>>,
    pub status: LoanStatus,
}

impl Loan {
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.status == LoanStatus::Active && self.due_date < now
    }
}

/// Borrow request after date resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLoan {
    pub user_id: i32,
    pub book_id: i32,
    pub loan_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
}

impl NewLoan {
    /// Fill in defaults: loan date is `now`, due date is `duration_days` after the loan date
    pub fn resolve(
        user_id: i32,
        book_id: i32,
        loan_date: Option<DateTime<Utc>>,
        due_date: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
        duration_days: i64,
    ) -> Result<Self, AppError> {
        let loan_date = loan_date.unwrap_or(now);
        let due_date = due_date.unwrap_or_else(|| loan_date + Duration::days(duration_days));

        if due_date < loan_date {
            return Err(AppError::Validation(
                "Due date must not be earlier than the loan date".to_string(),
            ));
        }

        Ok(Self {
            user_id,
            book_id,
            loan_date,
            due_date,
        })
    }
}

/// Years a loan date may carry; the store's timestamp range is far wider
const LOAN_YEARS: std::ops::RangeInclusive<i32> = 1..=9999;

/// Parse a client-supplied date: RFC 3339 timestamp or a plain `YYYY-MM-DD` (midnight UTC)
pub fn parse_loan_date(field: &str, value: &str) -> Result<DateTime<Utc>, AppError> {
    let value = value.trim();
    let parsed = match DateTime::parse_from_rfc3339(value) {
        Ok(dt) => Some(dt.with_timezone(&Utc)),
        Err(_) => NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|dt| dt.and_utc()),
    };

    parsed
        .filter(|dt| LOAN_YEARS.contains(&dt.year()))
        .ok_or_else(|| {
            AppError::Validation(format!(
                "{} must be an RFC 3339 timestamp or YYYY-MM-DD with a year between 1 and 9999, got '{}'",
                field, value
            ))
        })
}

/// Failures of the borrow/return lifecycle
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoanError {
    #[error("Book with id {0} not found")]
    BookNotFound(i32),

    #[error("User with id {0} not found")]
    UserNotFound(i32),

    #[error("Loan with id {0} not found")]
    LoanNotFound(i32),

    #[error("No copies of book {0} are available")]
    NoCopiesAvailable(i32),

    #[error("Loan {0} has already been returned")]
    AlreadyReturned(i32),
}

impl From<LoanError> for AppError {
    fn from(e: LoanError) -> Self {
        let message = e.to_string();
        match e {
            LoanError::BookNotFound(_) | LoanError::UserNotFound(_) | LoanError::LoanNotFound(_) => {
                AppError::NotFound(message)
            }
            LoanError::NoCopiesAvailable(_) => AppError::Unavailable(message),
            LoanError::AlreadyReturned(_) => AppError::Conflict(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    #[test]
    fn defaults_to_now_plus_duration() {
        let now = at(2024, 3, 1);
        let loan = NewLoan::resolve(1, 2, None, None, now, 14).unwrap();
        assert_eq!(loan.loan_date, now);
        assert_eq!(loan.due_date, at(2024, 3, 15));
    }

    #[test]
    fn due_date_follows_explicit_loan_date() {
        let loan = NewLoan::resolve(1, 2, Some(at(2024, 1, 10)), None, at(2024, 3, 1), 14).unwrap();
        assert_eq!(loan.due_date, at(2024, 1, 24));
    }

    #[test]
    fn due_before_loan_is_rejected() {
        let err = NewLoan::resolve(1, 2, Some(at(2024, 1, 10)), Some(at(2024, 1, 9)), at(2024, 3, 1), 14)
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn parses_both_date_forms() {
        assert_eq!(parse_loan_date("loanDate", "2024-05-02").unwrap(), at(2024, 5, 2));
        assert_eq!(
            parse_loan_date("loanDate", "2024-05-02T10:00:00+02:00").unwrap(),
            Utc.with_ymd_and_hms(2024, 5, 2, 8, 0, 0).unwrap()
        );
        assert!(matches!(
            parse_loan_date("dueDate", "next tuesday"),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn out_of_range_years_are_validation_errors() {
        for value in ["-5000-01-01", "+12345-01-01", "0000-06-01"] {
            assert!(
                matches!(parse_loan_date("loanDate", value), Err(AppError::Validation(_))),
                "accepted {}",
                value
            );
        }
        assert_eq!(parse_loan_date("loanDate", "9999-12-31").unwrap(), at(9999, 12, 31));
        assert_eq!(parse_loan_date("loanDate", "0001-01-01").unwrap(), at(1, 1, 1));
    }

    #[test]
    fn loan_errors_map_onto_taxonomy() {
        assert!(matches!(AppError::from(LoanError::NoCopiesAvailable(1)), AppError::Unavailable(_)));
        assert!(matches!(AppError::from(LoanError::AlreadyReturned(1)), AppError::Conflict(_)));
        assert!(matches!(AppError::from(LoanError::LoanNotFound(1)), AppError::NotFound(_)));
        assert!(matches!(AppError::from(LoanError::BookNotFound(1)), AppError::NotFound(_)));
    }

    #[test]
    fn only_active_loans_are_overdue() {
        let mut loan = Loan {
            id: 1,
            user_id: 1,
            book_id: 1,
            username: "ada".to_string(),
            book_title: "Dune".to_string(),
            loan_date: at(2024, 1, 1),
            due_date: at(2024, 1, 15),
            return_date: None,
            status: LoanStatus::Active,
        };
        assert!(loan.is_overdue(at(2024, 2, 1)));
        assert!(!loan.is_overdue(at(2024, 1, 10)));
        loan.status = LoanStatus::Returned;
        loan.return_date = Some(at(2024, 1, 20));
        assert!(!loan.is_overdue(at(2024, 2, 1)));
    }
}
