//! Demo catalog for development databases

use chrono::{Duration, NaiveDate, Utc};

use crate::{
    error::AppResult,
    models::{
        author::AuthorInput,
        book::BookInput,
        loan::NewLoan,
        user::{NewUser, Role},
    },
    repository::Repository,
    services::auth::AuthService,
};

struct DemoAuthor {
    name: &'static str,
    biography: &'static str,
    born: (i32, u32, u32),
}

struct DemoBook {
    title: &'static str,
    isbn: &'static str,
    /// Index into `AUTHORS`
    author: usize,
    year: i32,
    genre: &'static str,
    description: &'static str,
    copies: i32,
}

struct DemoLoan {
    /// Indexes into `USERS` and `BOOKS`
    user: usize,
    book: usize,
    days: i64,
}

const AUTHORS: &[DemoAuthor] = &[
    DemoAuthor {
        name: "J.K. Rowling",
        biography: "British author best known for the Harry Potter series",
        born: (1965, 7, 31),
    },
    DemoAuthor {
        name: "George R.R. Martin",
        biography: "American novelist, author of A Song of Ice and Fire",
        born: (1948, 9, 20),
    },
    DemoAuthor {
        name: "Stephen King",
        biography: "American author of horror and suspense novels",
        born: (1947, 9, 21),
    },
    DemoAuthor {
        name: "Agatha Christie",
        biography: "English writer of detective novels",
        born: (1890, 9, 15),
    },
];

const BOOKS: &[DemoBook] = &[
    DemoBook {
        title: "Harry Potter à l'école des sorciers",
        isbn: "9782070541270",
        author: 0,
        year: 1997,
        genre: "Fantasy",
        description: "Harry discovers he is a wizard on his eleventh birthday",
        copies: 5,
    },
    DemoBook {
        title: "Harry Potter et la Chambre des secrets",
        isbn: "9782070541287",
        author: 0,
        year: 1998,
        genre: "Fantasy",
        description: "Harry's second year at Hogwarts",
        copies: 3,
    },
    DemoBook {
        title: "Le Trône de fer",
        isbn: "9782253151224",
        author: 1,
        year: 1996,
        genre: "Fantasy",
        description: "Noble houses fight for the Iron Throne",
        copies: 4,
    },
    DemoBook {
        title: "Ça",
        isbn: "9782253003608",
        author: 2,
        year: 1986,
        genre: "Horreur",
        description: "Seven friends face a creature that feeds on fear",
        copies: 2,
    },
    DemoBook {
        title: "Le Crime de l'Orient-Express",
        isbn: "9782226132688",
        author: 3,
        year: 1934,
        genre: "Policier",
        description: "Hercule Poirot investigates a murder aboard a snowbound train",
        copies: 3,
    },
];

const USERS: &[(&str, &str, Role)] = &[
    ("admin", "admin@bibliotheque.com", Role::Admin),
    ("john_doe", "john@example.com", Role::User),
    ("jane_smith", "jane@example.com", Role::User),
];

const LOANS: &[DemoLoan] = &[
    DemoLoan { user: 1, book: 0, days: 7 },
    DemoLoan { user: 2, book: 2, days: 10 },
];

/// Counts of rows written by a seeding run
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub authors: usize,
    pub books: usize,
    pub users: usize,
    pub loans: usize,
}

#[derive(Clone)]
pub struct SeedService {
    repository: Repository,
    auth: AuthService,
}

impl SeedService {
    pub fn new(repository: Repository, auth: AuthService) -> Self {
        Self { repository, auth }
    }

    /// Load the demo catalog, accounts and loans.
    /// Does nothing once any author exists; accounts whose email is already
    /// registered are reused rather than recreated.
    pub async fn seed_demo_data(&self, password: &str) -> AppResult<Option<SeedSummary>> {
        if !self.repository.authors.list().await?.is_empty() {
            tracing::info!("Catalog already populated, skipping demo data");
            return Ok(None);
        }

        let mut summary = SeedSummary::default();

        let mut author_ids = Vec::with_capacity(AUTHORS.len());
        for demo in AUTHORS {
            let (y, m, d) = demo.born;
            let author = self
                .repository
                .authors
                .create(&AuthorInput {
                    name: demo.name.to_string(),
                    biography: Some(demo.biography.to_string()),
                    birth_date: NaiveDate::from_ymd_opt(y, m, d),
                })
                .await?;
            author_ids.push(author.id);
            summary.authors += 1;
        }

        let mut book_ids = Vec::with_capacity(BOOKS.len());
        for demo in BOOKS {
            let book = self
                .repository
                .books
                .create(&BookInput {
                    title: demo.title.to_string(),
                    isbn: Some(demo.isbn.to_string()),
                    author_id: author_ids.get(demo.author).copied(),
                    publication_year: Some(demo.year),
                    genre: Some(demo.genre.to_string()),
                    description: Some(demo.description.to_string()),
                    total_copies: demo.copies,
                })
                .await?;
            book_ids.push(book.id);
            summary.books += 1;
        }

        let password_hash = self.auth.hash_password(password)?;
        let mut user_ids = Vec::with_capacity(USERS.len());
        for (username, email, role) in USERS {
            let id = match self.repository.users.find_credentials_by_email(email).await? {
                Some(existing) => existing.user.id,
                None => {
                    summary.users += 1;
                    self.repository
                        .users
                        .create(&NewUser {
                            username: username.to_string(),
                            email: email.to_string(),
                            password_hash: password_hash.clone(),
                            role: *role,
                        })
                        .await?
                        .id
                }
            };
            user_ids.push(id);
        }

        let now = Utc::now();
        for demo in LOANS {
            let (Some(&user_id), Some(&book_id)) = (user_ids.get(demo.user), book_ids.get(demo.book))
            else {
                continue;
            };
            let new_loan = NewLoan::resolve(
                user_id,
                book_id,
                None,
                Some(now + Duration::days(demo.days)),
                now,
                demo.days,
            )?;
            self.repository.loans.borrow(&new_loan).await?;
            summary.loans += 1;
        }

        tracing::info!(
            "Seeded demo data: {} authors, {} books, {} users, {} loans",
            summary.authors,
            summary.books,
            summary.users,
            summary.loans
        );
        Ok(Some(summary))
    }
}
