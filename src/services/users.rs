//! User administration service

use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::user::{CreateUserInput, NewUser, Requester, User, UpdateUserInput, UserChanges},
    repository::Repository,
    services::auth::AuthService,
};

#[derive(Clone)]
pub struct UsersService {
    repository: Repository,
    auth: AuthService,
}

impl UsersService {
    pub fn new(repository: Repository, auth: AuthService) -> Self {
        Self { repository, auth }
    }

    /// The caller's own account, if signed in
    pub async fn me(&self, requester: &Requester) -> AppResult<Option<User>> {
        match requester.user_id() {
            Some(id) => self.repository.users.find_by_id(id).await,
            None => Ok(None),
        }
    }

    pub async fn list_users(&self, requester: &Requester) -> AppResult<Vec<User>> {
        requester.require_admin()?;
        self.repository.users.list().await
    }

    pub async fn get_user(&self, requester: &Requester, id: i32) -> AppResult<User> {
        requester.require_admin()?;
        self.find(id).await
    }

    /// Users can see their own account; admins can see any
    pub async fn get_visible_user(&self, requester: &Requester, id: i32) -> AppResult<User> {
        requester.require_self_or_admin(id)?;
        self.find(id).await
    }

    pub async fn create_user(&self, requester: &Requester, input: CreateUserInput) -> AppResult<User> {
        requester.require_admin()?;
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
                password_hash: self.auth.hash_password(&input.password)?,
                role: input.role.unwrap_or_default(),
            })
            .await?;

        tracing::info!("Created user id={} role={}", user.id, user.role);
        Ok(user)
    }

    pub async fn update_user(
        &self,
        requester: &Requester,
        id: i32,
        input: UpdateUserInput,
    ) -> AppResult<User> {
        requester.require_admin()?;
        let input = input.normalized();
        input.validate()?;
        if input.is_empty() {
            return Err(AppError::Validation("No fields to update".to_string()));
        }

        self.find(id).await?;

        if let Some(ref email) = input.email {
            if self.repository.users.email_exists(email, Some(id)).await? {
                return Err(AppError::Conflict("A user with this email already exists".to_string()));
            }
        }

        let password_hash = match input.password {
            Some(ref password) => Some(self.auth.hash_password(password)?),
            None => None,
        };

        let changes = UserChanges {
            username: input.username,
            email: input.email,
            password_hash,
            role: input.role,
        };

        let updated = self
            .repository
            .users
            .update(id, &changes)
            .await?
            .ok_or_else(|| user_not_found(id))?;

        if let Some(role) = changes.role {
            tracing::info!("User id={} role set to {}", id, role);
        }
        Ok(updated)
    }

    /// Refused while the user still has active loans
    pub async fn delete_user(&self, requester: &Requester, id: i32) -> AppResult<()> {
        requester.require_admin()?;
        if !self.repository.users.delete(id).await? {
            return Err(user_not_found(id));
        }
        tracing::info!("Deleted user id={}", id);
        Ok(())
    }

    async fn find(&self, id: i32) -> AppResult<User> {
        self.repository
            .users
            .find_by_id(id)
            .await?
            .ok_or_else(|| user_not_found(id))
    }
}

fn user_not_found(id: i32) -> AppError {
    AppError::NotFound(format!("User with id {} not found", id))
}
