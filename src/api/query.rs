//! GraphQL query root

use async_graphql::{Context, Object, Result, ResultExt};

use super::{optional, requester, services};
use crate::models::{Author, Book, Loan, User};

#[derive(Default)]
pub struct QueryRoot;

#[Object]
impl QueryRoot {
    // =========================================================================
    // CATALOG
    // =========================================================================

    async fn authors(&self, ctx: &Context<'_>) -> Result<Vec<Author>> {
        services(ctx).catalog.list_authors().await.extend()
    }

    async fn author(&self, ctx: &Context<'_>, id: i32) -> Result<Option<Author>> {
        optional(services(ctx).catalog.get_author(id).await)
    }

    async fn books(&self, ctx: &Context<'_>) -> Result<Vec<Book>> {
        services(ctx).catalog.list_books().await.extend()
    }

    async fn book(&self, ctx: &Context<'_>, id: i32) -> Result<Option<Book>> {
        optional(services(ctx).catalog.get_book(id).await)
    }

    async fn books_by_author(&self, ctx: &Context<'_>, author_id: i32) -> Result<Vec<Book>> {
        services(ctx).catalog.books_by_author(author_id).await.extend()
    }

    /// Case-insensitive substring match on title or author name
    async fn search_books(&self, ctx: &Context<'_>, query: String) -> Result<Vec<Book>> {
        services(ctx).catalog.search_books(&query).await.extend()
    }

    // =========================================================================
    // USERS
    // =========================================================================

    async fn users(&self, ctx: &Context<'_>) -> Result<Vec<User>> {
        services(ctx).users.list_users(&requester(ctx)).await.extend()
    }

    async fn user(&self, ctx: &Context<'_>, id: i32) -> Result<Option<User>> {
        optional(services(ctx).users.get_user(&requester(ctx), id).await)
    }

    /// The signed-in user, or null
    async fn me(&self, ctx: &Context<'_>) -> Result<Option<User>> {
        services(ctx).users.me(&requester(ctx)).await.extend()
    }

    // =========================================================================
    // LOANS
    // =========================================================================

    async fn loans(&self, ctx: &Context<'_>) -> Result<Vec<Loan>> {
        services(ctx).loans.list(&requester(ctx)).await.extend()
    }

    async fn loan(&self, ctx: &Context<'_>, id: i32) -> Result<Option<Loan>> {
        optional(services(ctx).loans.get(&requester(ctx), id).await)
    }

    async fn user_loans(&self, ctx: &Context<'_>, user_id: i32) -> Result<Vec<Loan>> {
        services(ctx)
            .loans
            .list_by_user(&requester(ctx), user_id)
            .await
            .extend()
    }

    async fn active_loans(&self, ctx: &Context<'_>) -> Result<Vec<Loan>> {
        services(ctx).loans.list_active(&requester(ctx)).await.extend()
    }
}
