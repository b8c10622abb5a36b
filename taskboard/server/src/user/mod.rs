use crate::auth::AuthState;
use crate::entities::*;
use chrono::{DateTime, Utc};
use sea_orm::*;
use std::sync::Arc;
use uuid::Uuid;

pub mod api;
mod password;

pub use password::PasswordHashError;

const NAME_MIN_CHARS: usize = 2;
const PASSWORD_MIN_CHARS: usize = 6;

#[derive(Debug, PartialEq, Clone, Eq)]
pub struct User {
    id: Uuid,
    name: String,
    email: String,
    created_at: DateTime<Utc>,
}

impl User {
    pub fn new(id: Uuid, name: String, email: String, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            name,
            email,
            created_at,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl From<user::Model> for User {
    fn from(model: user::Model) -> Self {
        User::new(
            model.id,
            model.name,
            model.email,
            model.created_at.with_timezone(&Utc),
        )
    }
}

/// Error type for UserService operations.
#[derive(Debug, thiserror::Error)]
pub enum UserServiceError {
    #[error("{0}")]
    Validation(String),
    #[error("User already exists")]
    AlreadyExists,
    /// Unknown email and wrong password are reported the same way.
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("User not found")]
    NotFound,
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),
    #[error("Password hash error: {0}")]
    PasswordHash(#[from] PasswordHashError),
}

#[derive(Clone)]
pub struct UserState {
    pub db: Arc<DatabaseConnection>,
    pub auth: Arc<AuthState>,
    pub password_hash_iterations: u32,
}

pub struct UserService<'a> {
    db: &'a DatabaseConnection,
    password_hash_iterations: u32,
}

/// Lower-cases and trims an email address.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Loose structural check: one `@`, non-empty local part, dotted domain, no whitespace.
pub fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !email.chars().any(char::is_whitespace)
}

impl UserService<'_> {
    pub fn new(db: &DatabaseConnection, password_hash_iterations: u32) -> UserService<'_> {
        UserService {
            db,
            password_hash_iterations,
        }
    }

    /// Registers a new account.
    ///
    /// # Returns
    ///
    /// The created `User`, `Validation` for bad input, or `AlreadyExists` if the email is taken.
    #[tracing::instrument(skip(self, password))]
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<User, UserServiceError> {
        let name = name.trim();
        if name.chars().count() < NAME_MIN_CHARS {
            return Err(UserServiceError::Validation(format!(
                "Name must be at least {} characters",
                NAME_MIN_CHARS
            )));
        }
        let email = normalize_email(email);
        if !is_valid_email(&email) {
            return Err(UserServiceError::Validation(
                "Invalid email address".to_string(),
            ));
        }
        if password.chars().count() < PASSWORD_MIN_CHARS {
            return Err(UserServiceError::Validation(format!(
                "Password must be at least {} characters",
                PASSWORD_MIN_CHARS
            )));
        }
        if self.find_by_email(&email).await?.is_some() {
            return Err(UserServiceError::AlreadyExists);
        }

        let password_hash = password::hash(password, self.password_hash_iterations).await?;
        let now = Utc::now().fixed_offset();
        let active_model = user::ActiveModel {
            id: ActiveValue::Set(Uuid::new_v4()),
            name: ActiveValue::Set(name.to_string()),
            email: ActiveValue::Set(email),
            password_hash: ActiveValue::Set(password_hash),
            created_at: ActiveValue::Set(now),
            updated_at: ActiveValue::Set(now),
        };
        let created_model = active_model.insert(self.db).await.map_err(|err| {
            match err.sql_err() {
                // Lost a race with a concurrent registration for the same email.
                Some(SqlErr::UniqueConstraintViolation(_)) => UserServiceError::AlreadyExists,
                _ => UserServiceError::Database(err),
            }
        })?;
        tracing::info!(user_id = %created_model.id, "Registered user");
        Ok(User::from(created_model))
    }

    /// Checks an email and password pair.
    #[tracing::instrument(skip(self, password))]
    pub async fn authenticate(
        &self,
        email: &str,
        password: &str,
    ) -> Result<User, UserServiceError> {
        let email = normalize_email(email);
        let Some(model) = self.find_by_email(&email).await? else {
            let dummy = password::dummy_hash(self.password_hash_iterations);
            password::verify(password, &dummy).await?;
            return Err(UserServiceError::InvalidCredentials);
        };
        if !password::verify(password, &model.password_hash).await? {
            return Err(UserServiceError::InvalidCredentials);
        }
        Ok(User::from(model))
    }

    /// Retrieves a user by ID.
    #[tracing::instrument(skip(self))]
    pub async fn get_user(&self, id: Uuid) -> Result<User, UserServiceError> {
        user::Entity::find_by_id(id)
            .one(self.db)
            .await?
            .map(User::from)
            .ok_or(UserServiceError::NotFound)
    }

    /// Deletes a user. Their tasks are removed by the database cascade.
    #[tracing::instrument(skip(self))]
    pub async fn delete_user(&self, id: Uuid) -> Result<(), UserServiceError> {
        let result = user::Entity::delete_by_id(id).exec(self.db).await?;
        if result.rows_affected == 0 {
            return Err(UserServiceError::NotFound);
        }
        tracing::info!(user_id = %id, "Deleted user");
        Ok(())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<user::Model>, UserServiceError> {
        let model = user::Entity::find()
            .filter(user::Column::Email.eq(email))
            .one(self.db)
            .await?;
        Ok(model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn can_normalize_email() {
        assert_eq!(normalize_email("  Ada@Example.COM "), "ada@example.com");
    }

    #[test]
    fn can_validate_email_shape() {
        assert!(is_valid_email("ada@example.com"));
        assert!(is_valid_email("ada.lovelace+tasks@mail.example.org"));
        assert!(!is_valid_email("ada"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("ada@example"));
        assert!(!is_valid_email("ada@.com"));
        assert!(!is_valid_email("ada@example.com."));
        assert!(!is_valid_email("ada@@example.com"));
        assert!(!is_valid_email("ada lovelace@example.com"));
    }
}
