//! Loan management service

use chrono::{DateTime, Utc};

use crate::{
    error::{AppError, AppResult},
    models::{
        loan::{Loan, LoanError, NewLoan},
        user::Requester,
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct LoansService {
    repository: Repository,
    default_duration_days: i64,
}

impl LoansService {
    pub fn new(repository: Repository, default_duration_days: i64) -> Self {
        Self {
            repository,
            default_duration_days,
        }
    }

    /// Borrow one copy of a book for a user.
    /// Plain users may only borrow for themselves.
    pub async fn borrow(
        &self,
        requester: &Requester,
        user_id: i32,
        book_id: i32,
        loan_date: Option<DateTime<Utc>>,
        due_date: Option<DateTime<Utc>>,
    ) -> AppResult<Loan> {
        requester.require_self_or_admin(user_id)?;

        // Verify user exists
        if self.repository.users.find_by_id(user_id).await?.is_none() {
            return Err(LoanError::UserNotFound(user_id).into());
        }

        let new_loan = NewLoan::resolve(
            user_id,
            book_id,
            loan_date,
            due_date,
            Utc::now(),
            self.default_duration_days,
        )?;

        let loan = match self.repository.loans.borrow(&new_loan).await {
            Ok(loan) => loan,
            Err(e) => {
                tracing::warn!("Borrow rejected: user={} book={}: {}", user_id, book_id, e);
                return Err(e);
            }
        };
        tracing::info!(
            "Loan {} created: user={} book={} due={}",
            loan.id,
            user_id,
            book_id,
            loan.due_date
        );
        Ok(loan)
    }

    /// Return a borrowed book. Plain users may only return their own loans.
    pub async fn return_book(&self, requester: &Requester, loan_id: i32) -> AppResult<Loan> {
        requester.require_authenticated()?;

        let loan = self
            .repository
            .loans
            .find_by_id(loan_id)
            .await?
            .ok_or(LoanError::LoanNotFound(loan_id))?;
        requester.require_self_or_admin(loan.user_id)?;

        let returned = self.repository.loans.return_loan(loan_id, Utc::now()).await?;
        tracing::info!("Loan {} returned: book={}", returned.id, returned.book_id);
        Ok(returned)
    }

    pub async fn list(&self, requester: &Requester) -> AppResult<Vec<Loan>> {
        requester.require_admin()?;
        self.repository.loans.list().await
    }

    pub async fn list_active(&self, requester: &Requester) -> AppResult<Vec<Loan>> {
        requester.require_admin()?;
        self.repository.loans.list_active().await
    }

    /// Loan history of a user, most recent first
    pub async fn list_by_user(&self, requester: &Requester, user_id: i32) -> AppResult<Vec<Loan>> {
        requester.require_self_or_admin(user_id)?;
        self.repository.loans.list_by_user(user_id).await
    }

    /// Circulation history of a book
    pub async fn list_by_book(&self, requester: &Requester, book_id: i32) -> AppResult<Vec<Loan>> {
        requester.require_admin()?;
        self.repository.loans.list_by_book(book_id).await
    }

    pub async fn get(&self, requester: &Requester, loan_id: i32) -> AppResult<Loan> {
        requester.require_authenticated()?;
        let loan = self
            .repository
            .loans
            .find_by_id(loan_id)
            .await?
            .ok_or_else(|| AppError::from(LoanError::LoanNotFound(loan_id)))?;
        requester.require_self_or_admin(loan.user_id)?;
        Ok(loan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::{
            loan::LoanStatus,
            user::{Role, User},
        },
        repository::mock::MockStores,
    };
    use chrono::{Duration, TimeZone};

    fn user(id: i32) -> User {
        User {
            id,
            username: format!("user{}", id),
            email: format!("user{}@example.org", id),
            role: Role::User,
            created_at: Utc::now(),
        }
    }

    fn loan(id: i32, user_id: i32, status: LoanStatus) -> Loan {
        let loan_date = Utc::now() - Duration::days(3);
        Loan {
            id,
            user_id,
            book_id: 9,
            username: format!("user{}", user_id),
            book_title: "Dune".to_string(),
            loan_date,
            due_date: loan_date + Duration::days(14),
            return_date: None,
            status,
        }
    }

    fn from_new(new: &NewLoan) -> Loan {
        Loan {
            id: 100,
            user_id: new.user_id,
            book_id: new.book_id,
            username: format!("user{}", new.user_id),
            book_title: "Dune".to_string(),
            loan_date: new.loan_date,
            due_date: new.due_date,
            return_date: None,
            status: LoanStatus::Active,
        }
    }

    #[tokio::test]
    async fn borrow_uses_default_duration() {
        let mut stores = MockStores::default();
        stores.users.expect_find_by_id().returning(|id| Ok(Some(user(id))));
        stores
            .loans
            .expect_borrow()
            .withf(|new| new.due_date - new.loan_date == Duration::days(21))
            .returning(|new| Ok(from_new(new)));
        let service = LoansService::new(stores.into_repository(), 21);

        let loan = service
            .borrow(&Requester::User { id: 4 }, 4, 9, None, None)
            .await
            .unwrap();
        assert_eq!(loan.status, LoanStatus::Active);
        assert_eq!(loan.user_id, 4);
    }

    #[tokio::test]
    async fn user_cannot_borrow_for_someone_else() {
        let mut stores = MockStores::default();
        stores.loans.expect_borrow().never();
        let service = LoansService::new(stores.into_repository(), 14);

        let err = service
            .borrow(&Requester::User { id: 4 }, 5, 9, None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Authorization(_)));

        let err = service
            .borrow(&Requester::Anonymous, 5, 9, None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Authentication(_)));
    }

    #[tokio::test]
    async fn admin_may_borrow_on_behalf_of_a_user() {
        let mut stores = MockStores::default();
        stores.users.expect_find_by_id().returning(|id| Ok(Some(user(id))));
        stores
            .loans
            .expect_borrow()
            .withf(|new| new.user_id == 5)
            .returning(|new| Ok(from_new(new)));
        let service = LoansService::new(stores.into_repository(), 14);

        let loan = service
            .borrow(&Requester::Admin { id: 1 }, 5, 9, None, None)
            .await
            .unwrap();
        assert_eq!(loan.user_id, 5);
    }

    #[tokio::test]
    async fn unknown_user_is_not_found() {
        let mut stores = MockStores::default();
        stores.users.expect_find_by_id().returning(|_| Ok(None));
        stores.loans.expect_borrow().never();
        let service = LoansService::new(stores.into_repository(), 14);

        let err = service
            .borrow(&Requester::Admin { id: 1 }, 77, 9, None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn no_copies_surfaces_as_unavailable() {
        let mut stores = MockStores::default();
        stores.users.expect_find_by_id().returning(|id| Ok(Some(user(id))));
        stores
            .loans
            .expect_borrow()
            .returning(|new| Err(LoanError::NoCopiesAvailable(new.book_id).into()));
        let service = LoansService::new(stores.into_repository(), 14);

        let err = service
            .borrow(&Requester::User { id: 4 }, 4, 9, None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unavailable(_)));
    }

    #[tokio::test]
    async fn due_date_before_loan_date_never_reaches_store() {
        let mut stores = MockStores::default();
        stores.users.expect_find_by_id().returning(|id| Ok(Some(user(id))));
        stores.loans.expect_borrow().never();
        let service = LoansService::new(stores.into_repository(), 14);

        let loan_date = Utc.with_ymd_and_hms(2024, 6, 10, 0, 0, 0).unwrap();
        let err = service
            .borrow(
                &Requester::User { id: 4 },
                4,
                9,
                Some(loan_date),
                Some(loan_date - Duration::days(1)),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn second_return_is_a_conflict() {
        let mut stores = MockStores::default();
        stores
            .loans
            .expect_find_by_id()
            .returning(|id| Ok(Some(loan(id, 4, LoanStatus::Returned))));
        stores
            .loans
            .expect_return_loan()
            .returning(|id, _| Err(LoanError::AlreadyReturned(id).into()));
        let service = LoansService::new(stores.into_repository(), 14);

        let err = service
            .return_book(&Requester::User { id: 4 }, 12)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn cannot_return_someone_elses_loan() {
        let mut stores = MockStores::default();
        stores
            .loans
            .expect_find_by_id()
            .returning(|id| Ok(Some(loan(id, 5, LoanStatus::Active))));
        stores.loans.expect_return_loan().never();
        let service = LoansService::new(stores.into_repository(), 14);

        let err = service
            .return_book(&Requester::User { id: 4 }, 12)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Authorization(_)));
    }

    #[tokio::test]
    async fn unknown_loan_is_not_found() {
        let mut stores = MockStores::default();
        stores.loans.expect_find_by_id().returning(|_| Ok(None));
        let service = LoansService::new(stores.into_repository(), 14);

        let err = service
            .return_book(&Requester::Admin { id: 1 }, 404)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn listings_are_gated() {
        let mut stores = MockStores::default();
        stores
            .loans
            .expect_list_by_user()
            .returning(|user_id| Ok(vec![loan(1, user_id, LoanStatus::Active)]));
        stores.loans.expect_list().never();
        stores.loans.expect_list_by_book().never();
        let service = LoansService::new(stores.into_repository(), 14);

        let reader = Requester::User { id: 4 };
        assert_eq!(service.list_by_user(&reader, 4).await.unwrap().len(), 1);
        assert!(matches!(
            service.list_by_user(&reader, 5).await,
            Err(AppError::Authorization(_))
        ));
        assert!(matches!(service.list(&reader).await, Err(AppError::Authorization(_))));
        assert!(matches!(
            service.list_by_book(&reader, 9).await,
            Err(AppError::Authorization(_))
        ));
        assert!(matches!(
            service.list_active(&Requester::Anonymous).await,
            Err(AppError::Authentication(_))
        ));
    }
}
