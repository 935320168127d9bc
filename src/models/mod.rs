//! Data models for Bibliotheca

pub mod author;
pub mod book;
pub mod loan;
pub mod user;

// Re-export commonly used types
pub use author::Author;
pub use book::Book;
pub use loan::{Loan, LoanError, LoanStatus};
pub use user::{Requester, Role, User};
