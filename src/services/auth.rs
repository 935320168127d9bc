//! Authentication service: passwords, tokens, registration and requester resolution

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use validator::Validate;

use crate::{
    config::AuthConfig,
    error::{AppError, AppResult},
    models::user::{
        AuthPayload, LoginInput, NewUser, RegisterInput, Requester, Role, User, UserClaims,
    },
    repository::Repository,
};

const INVALID_CREDENTIALS: &str = "Invalid email or password";

#[derive(Clone)]
pub struct AuthService {
    repository: Repository,
    config: AuthConfig,
}

impl AuthService {
    pub fn new(repository: Repository, config: AuthConfig) -> Self {
        Self { repository, config }
    }

    /// Resolve a bearer token to a requester, reading the user's current role.
    /// Missing, invalid or expired tokens and deleted users all resolve to `Anonymous`.
    pub async fn resolve(&self, token: Option<&str>) -> AppResult<Requester> {
        let Some(token) = token else {
            return Ok(Requester::Anonymous);
        };

        let claims = match UserClaims::from_token(token, &self.config.jwt_secret) {
            Ok(claims) => claims,
            Err(e) => {
                tracing::debug!("Ignoring invalid bearer token: {}", e);
                return Ok(Requester::Anonymous);
            }
        };

        let Some(user_id) = claims.user_id() else {
            return Ok(Requester::Anonymous);
        };

        Ok(self
            .repository
            .users
            .find_by_id(user_id)
            .await?
            .map(|user| Requester::from_user(&user))
            .unwrap_or(Requester::Anonymous))
    }

    /// Self-service registration; always creates a plain user
    pub async fn register(&self, input: RegisterInput) -> AppResult<AuthPayload> {
        let input = input.normalized();
        input.validate()?;

        if self.repository.users.email_exists(&input.email, None).await? {
            return Err(AppError::Conflict("A user with this email already exists".to_string()));
        }

        let user = self
            .repository
            .users
            .create(&NewUser {
                username: input.username,
                email: input.email,
                password_hash: self.hash_password(&input.password)?,
                role: Role::User,
            })
            .await?;

        tracing::info!("Registered user id={}", user.id);

        let token = self.issue_token(&user)?;
        Ok(AuthPayload { token, user })
    }

    /// Authenticate by email and password
    pub async fn login(&self, input: LoginInput) -> AppResult<AuthPayload> {
        input.validate()?;

        let credentials = self
            .repository
            .users
            .find_credentials_by_email(input.email.trim())
            .await?
            .ok_or_else(|| AppError::Authentication(INVALID_CREDENTIALS.to_string()))?;

        if !self.verify_password(&credentials.password_hash, &input.password)? {
            return Err(AppError::Authentication(INVALID_CREDENTIALS.to_string()));
        }

        let user = credentials.user;
        let token = self.issue_token(&user)?;
        Ok(AuthPayload { token, user })
    }

    /// Create the configured administrator when the store holds none
    pub async fn ensure_admin(&self) -> AppResult<Option<User>> {
        let (Some(email), Some(password)) = (&self.config.admin_email, &self.config.admin_password)
        else {
            return Ok(None);
        };

        if self.repository.users.count_by_role(Role::Admin).await? > 0 {
            return Ok(None);
        }

        let user = self
            .repository
            .users
            .create(&NewUser {
                username: self
                    .config
                    .admin_username
                    .clone()
                    .unwrap_or_else(|| "admin".to_string()),
                email: email.clone(),
                password_hash: self.hash_password(password)?,
                role: Role::Admin,
            })
            .await?;

        tracing::info!("Bootstrapped administrator id={} ({})", user.id, user.email);
        Ok(Some(user))
    }

    /// Create a signed token carrying the user's identity
    pub fn issue_token(&self, user: &User) -> AppResult<String> {
        UserClaims::new(user.id, self.config.jwt_expiration_hours)
            .create_token(&self.config.jwt_secret)
            .map_err(|e| AppError::Internal(format!("Failed to create token: {}", e)))
    }

    /// Hash a password using Argon2
    pub fn hash_password(&self, password: &str) -> AppResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;
        Ok(hash.to_string())
    }

    fn verify_password(&self, hash: &str, password: &str) -> AppResult<bool> {
        let parsed_hash = PasswordHash::new(hash)
            .map_err(|_| AppError::Internal("Invalid password hash".to_string()))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::UserCredentials;
    use crate::repository::mock::MockStores;
    use chrono::Utc;
    use mockall::predicate::eq;

    fn config() -> AuthConfig {
        AuthConfig {
            jwt_secret: "test-secret".to_string(),
            jwt_expiration_hours: 1,
            admin_username: None,
            admin_email: None,
            admin_password: None,
        }
    }

    fn user(id: i32, role: Role) -> User {
        User {
            id,
            username: format!("user{}", id),
            email: format!("user{}@example.org", id),
            role,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn missing_or_garbage_token_is_anonymous() {
        let service = AuthService::new(MockStores::default().into_repository(), config());
        assert_eq!(service.resolve(None).await.unwrap(), Requester::Anonymous);
        assert_eq!(service.resolve(Some("not-a-jwt")).await.unwrap(), Requester::Anonymous);
    }

    #[tokio::test]
    async fn role_is_read_from_the_store_on_every_call() {
        let mut stores = MockStores::default();
        let mut calls = 0;
        stores
            .users
            .expect_find_by_id()
            .with(eq(7))
            .times(2)
            .returning(move |id| {
                calls += 1;
                // Admin on the first call, demoted on the second
                let role = if calls == 1 { Role::Admin } else { Role::User };
                Ok(Some(user(id, role)))
            });
        let service = AuthService::new(stores.into_repository(), config());
        let token = service.issue_token(&user(7, Role::Admin)).unwrap();

        assert_eq!(service.resolve(Some(&token)).await.unwrap(), Requester::Admin { id: 7 });
        assert_eq!(service.resolve(Some(&token)).await.unwrap(), Requester::User { id: 7 });
    }

    #[tokio::test]
    async fn deleted_user_token_is_anonymous() {
        let mut stores = MockStores::default();
        stores.users.expect_find_by_id().returning(|_| Ok(None));
        let service = AuthService::new(stores.into_repository(), config());
        let token = service.issue_token(&user(5, Role::User)).unwrap();
        assert_eq!(service.resolve(Some(&token)).await.unwrap(), Requester::Anonymous);
    }

    #[tokio::test]
    async fn register_rejects_duplicate_email() {
        let mut stores = MockStores::default();
        stores.users.expect_email_exists().returning(|_, _| Ok(true));
        stores.users.expect_create().never();
        let service = AuthService::new(stores.into_repository(), config());

        let err = service
            .register(RegisterInput {
                username: "ada".to_string(),
                email: "ada@example.org".to_string(),
                password: "secret123".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn register_rejects_whitespace_username() {
        let mut stores = MockStores::default();
        stores.users.expect_email_exists().never();
        stores.users.expect_create().never();
        let service = AuthService::new(stores.into_repository(), config());

        let err = service
            .register(RegisterInput {
                username: "   ".to_string(),
                email: "ada@example.org".to_string(),
                password: "secret123".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn register_creates_plain_user_with_hashed_password() {
        let mut stores = MockStores::default();
        stores.users.expect_email_exists().returning(|_, _| Ok(false));
        stores
            .users
            .expect_create()
            .withf(|new| new.role == Role::User && new.password_hash.starts_with("$argon2"))
            .returning(|new| {
                Ok(User {
                    id: 11,
                    username: new.username.clone(),
                    email: new.email.clone(),
                    role: new.role,
                    created_at: Utc::now(),
                })
            });
        let service = AuthService::new(stores.into_repository(), config());

        let payload = service
            .register(RegisterInput {
                username: " ada ".to_string(),
                email: "ada@example.org".to_string(),
                password: "secret123".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(payload.user.username, "ada");
        let claims = UserClaims::from_token(&payload.token, "test-secret").unwrap();
        assert_eq!(claims.user_id(), Some(11));
    }

    #[tokio::test]
    async fn login_checks_password() {
        let service = AuthService::new(MockStores::default().into_repository(), config());
        let hash = service.hash_password("correct horse").unwrap();

        let mut stores = MockStores::default();
        stores
            .users
            .expect_find_credentials_by_email()
            .returning(move |_| {
                Ok(Some(UserCredentials {
                    user: user(3, Role::User),
                    password_hash: hash.clone(),
                }))
            });
        let service = AuthService::new(stores.into_repository(), config());

        let ok = service
            .login(LoginInput {
                email: "user3@example.org".to_string(),
                password: "correct horse".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(ok.user.id, 3);

        let err = service
            .login(LoginInput {
                email: "user3@example.org".to_string(),
                password: "wrong".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Authentication(_)));
    }

    #[tokio::test]
    async fn unknown_email_fails_like_bad_password() {
        let mut stores = MockStores::default();
        stores
            .users
            .expect_find_credentials_by_email()
            .returning(|_| Ok(None));
        let service = AuthService::new(stores.into_repository(), config());

        let err = service
            .login(LoginInput {
                email: "nobody@example.org".to_string(),
                password: "whatever".to_string(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.client_message(), INVALID_CREDENTIALS);
    }

    #[tokio::test]
    async fn admin_bootstrap_only_when_none_exists() {
        let mut cfg = config();
        cfg.admin_email = Some("root@example.org".to_string());
        cfg.admin_password = Some("bootstrap-pass".to_string());

        let mut stores = MockStores::default();
        stores.users.expect_count_by_role().with(eq(Role::Admin)).returning(|_| Ok(1));
        stores.users.expect_create().never();
        let service = AuthService::new(stores.into_repository(), cfg.clone());
        assert!(service.ensure_admin().await.unwrap().is_none());

        let mut stores = MockStores::default();
        stores.users.expect_count_by_role().returning(|_| Ok(0));
        stores
            .users
            .expect_create()
            .withf(|new| new.role == Role::Admin && new.username == "admin")
            .returning(|new| {
                Ok(User {
                    id: 1,
                    username: new.username.clone(),
                    email: new.email.clone(),
                    role: new.role,
                    created_at: Utc::now(),
                })
            });
        let service = AuthService::new(stores.into_repository(), cfg);
        let created = service.ensure_admin().await.unwrap().unwrap();
        assert_eq!(created.role, Role::Admin);
    }
}
