//! GraphQL mutation root

use async_graphql::{Context, Object, Result, ResultExt};

use super::{requester, services};
use crate::models::{
    author::AuthorInput,
    book::BookInput,
    loan::parse_loan_date,
    user::{AuthPayload, CreateUserInput, LoginInput, RegisterInput, UpdateUserInput},
    Author, Book, Loan, User,
};

#[derive(Default)]
pub struct MutationRoot;

#[Object]
impl MutationRoot {
    // =========================================================================
    // CATALOG
    // =========================================================================

    async fn create_author(&self, ctx: &Context<'_>, input: AuthorInput) -> Result<Author> {
        services(ctx)
            .catalog
            .create_author(&requester(ctx), input)
            .await
            .extend()
    }

    async fn update_author(&self, ctx: &Context<'_>, id: i32, input: AuthorInput) -> Result<Author> {
        services(ctx)
            .catalog
            .update_author(&requester(ctx), id, input)
            .await
            .extend()
    }

    /// Books of the author are kept, without an author
    async fn delete_author(&self, ctx: &Context<'_>, id: i32) -> Result<bool> {
        services(ctx)
            .catalog
            .delete_author(&requester(ctx), id)
            .await
            .extend()?;
        Ok(true)
    }

    async fn create_book(&self, ctx: &Context<'_>, input: BookInput) -> Result<Book> {
        services(ctx)
            .catalog
            .create_book(&requester(ctx), input)
            .await
            .extend()
    }

    async fn update_book(&self, ctx: &Context<'_>, id: i32, input: BookInput) -> Result<Book> {
        services(ctx)
            .catalog
            .update_book(&requester(ctx), id, input)
            .await
            .extend()
    }

    async fn delete_book(&self, ctx: &Context<'_>, id: i32) -> Result<bool> {
        services(ctx)
            .catalog
            .delete_book(&requester(ctx), id)
            .await
            .extend()?;
        Ok(true)
    }

    // =========================================================================
    // ACCOUNTS
    // =========================================================================

    async fn register(&self, ctx: &Context<'_>, input: RegisterInput) -> Result<AuthPayload> {
        services(ctx).auth.register(input).await.extend()
    }

    async fn login(&self, ctx: &Context<'_>, input: LoginInput) -> Result<AuthPayload> {
        services(ctx).auth.login(input).await.extend()
    }

    async fn create_user(&self, ctx: &Context<'_>, input: CreateUserInput) -> Result<User> {
        services(ctx)
            .users
            .create_user(&requester(ctx), input)
            .await
            .extend()
    }

    async fn update_user(&self, ctx: &Context<'_>, id: i32, input: UpdateUserInput) -> Result<User> {
        services(ctx)
            .users
            .update_user(&requester(ctx), id, input)
            .await
            .extend()
    }

    async fn delete_user(&self, ctx: &Context<'_>, id: i32) -> Result<bool> {
        services(ctx)
            .users
            .delete_user(&requester(ctx), id)
            .await
            .extend()?;
        Ok(true)
    }

    // =========================================================================
    // LOANS
    // =========================================================================

    /// Borrow one copy. Dates are RFC 3339 or YYYY-MM-DD.
    async fn borrow_book(
        &self,
        ctx: &Context<'_>,
        user_id: i32,
        book_id: i32,
        loan_date: Option<String>,
        due_date: Option<String>,
    ) -> Result<Loan> {
        let loan_date = loan_date
            .map(|d| parse_loan_date("loanDate", &d))
            .transpose()
            .extend()?;
        let due_date = due_date
            .map(|d| parse_loan_date("dueDate", &d))
            .transpose()
            .extend()?;

        services(ctx)
            .loans
            .borrow(&requester(ctx), user_id, book_id, loan_date, due_date)
            .await
            .extend()
    }

    async fn return_book(&self, ctx: &Context<'_>, loan_id: i32) -> Result<Loan> {
        services(ctx)
            .loans
            .return_book(&requester(ctx), loan_id)
            .await
            .extend()
    }
}
