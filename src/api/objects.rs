//! Relation fields resolved lazily through the services

use async_graphql::{ComplexObject, Context, Result, ResultExt};
use chrono::Utc;

use super::{optional, requester, services};
use crate::models::{Author, Book, Loan, User};

#[ComplexObject]
impl Author {
    async fn books(&self, ctx: &Context<'_>) -> Result<Vec<Book>> {
        services(ctx).catalog.books_by_author(self.id).await.extend()
    }
}

#[ComplexObject]
impl Book {
    async fn author(&self, ctx: &Context<'_>) -> Result<Option<Author>> {
        match self.author_id {
            Some(id) => optional(services(ctx).catalog.get_author(id).await),
            None => Ok(None),
        }
    }

    /// Every loan of this book, most recent first; admins only
    async fn loans(&self, ctx: &Context<'_>) -> Result<Vec<Loan>> {
        services(ctx)
            .loans
            .list_by_book(&requester(ctx), self.id)
            .await
            .extend()
    }
}

#[ComplexObject]
impl User {
    /// Loan history, visible to the user and to admins
    async fn loans(&self, ctx: &Context<'_>) -> Result<Vec<Loan>> {
        services(ctx)
            .loans
            .list_by_user(&requester(ctx), self.id)
            .await
            .extend()
    }
}

#[ComplexObject]
impl Loan {
    async fn user(&self, ctx: &Context<'_>) -> Result<Option<User>> {
        optional(
            services(ctx)
                .users
                .get_visible_user(&requester(ctx), self.user_id)
                .await,
        )
    }

    async fn book(&self, ctx: &Context<'_>) -> Result<Option<Book>> {
        optional(services(ctx).catalog.get_book(self.book_id).await)
    }

    #[graphql(name = "isOverdue")]
    async fn overdue(&self) -> bool {
        self.is_overdue(Utc::now())
    }
}
