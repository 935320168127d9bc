//! Business logic services

pub mod auth;
pub mod catalog;
pub mod loans;
pub mod seed;
pub mod users;

use crate::{config::AppConfig, repository::Repository};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub auth: auth::AuthService,
    pub catalog: catalog::CatalogService,
    pub users: users::UsersService,
    pub loans: loans::LoansService,
    pub seed: seed::SeedService,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(repository: Repository, config: &AppConfig) -> Self {
        let auth = auth::AuthService::new(repository.clone(), config.auth.clone());
        Self {
            catalog: catalog::CatalogService::new(repository.clone()),
            users: users::UsersService::new(repository.clone(), auth.clone()),
            loans: loans::LoansService::new(repository.clone(), config.loans.default_duration_days),
            seed: seed::SeedService::new(repository, auth.clone()),
            auth,
        }
    }
}
