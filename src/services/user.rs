//! User service
//!
//! Implements business logic for user management:
//! - Registration (first user becomes admin)
//! - Login/logout with opaque session tokens
//! - Session validation for the auth middleware
//! - Public profiles with the viewer's subscription flag

use crate::db::repositories::{FollowRepository, SessionRepository, UserRepository};
use crate::models::{CreateUserInput, Session, User, UserProfile, UserRole};
use crate::services::password::{hash_password, verify_password};
use anyhow::Context;
use chrono::Duration;
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;

/// Default session expiration time in days
const DEFAULT_SESSION_EXPIRATION_DAYS: i64 = 7;

const MAX_EMAIL_LENGTH: usize = 254;
const MAX_NAME_LENGTH: usize = 150;

/// Usernames reserved for routing
const RESERVED_USERNAMES: &[&str] = &["me"];

static USERNAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\w.@+-]+$").expect("valid username regex"));

/// Error types for user service operations
#[derive(Debug, thiserror::Error)]
pub enum UserServiceError {
    /// Authentication failed (invalid credentials)
    #[error("Authentication failed: {0}")]
    AuthenticationError(String),

    /// Validation error (invalid input)
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// User already exists
    #[error("User already exists: {0}")]
    UserExists(String),

    /// User not found
    #[error("User not found: {0}")]
    NotFound(i64),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// User service for managing users and authentication
pub struct UserService {
    user_repo: Arc<dyn UserRepository>,
    session_repo: Arc<dyn SessionRepository>,
    follow_repo: Arc<dyn FollowRepository>,
    session_expiration_days: i64,
}

impl UserService {
    /// Create a new user service with the given repositories
    pub fn new(
        user_repo: Arc<dyn UserRepository>,
        session_repo: Arc<dyn SessionRepository>,
        follow_repo: Arc<dyn FollowRepository>,
    ) -> Self {
        Self::with_session_expiration(
            user_repo,
            session_repo,
            follow_repo,
            DEFAULT_SESSION_EXPIRATION_DAYS,
        )
    }

    /// Create a new user service with custom session expiration
    pub fn with_session_expiration(
        user_repo: Arc<dyn UserRepository>,
        session_repo: Arc<dyn SessionRepository>,
        follow_repo: Arc<dyn FollowRepository>,
        session_expiration_days: i64,
    ) -> Self {
        Self {
            user_repo,
            session_repo,
            follow_repo,
            session_expiration_days,
        }
    }

    /// Register a new user
    ///
    /// If this is the first user in the system, they are assigned the
    /// Admin role.
    ///
    /// # Errors
    ///
    /// - `ValidationError` if a field is empty, too long or malformed
    /// - `UserExists` if username or email is already taken
    /// - `InternalError` for database errors
    pub async fn register(&self, input: CreateUserInput) -> Result<User, UserServiceError> {
        let input = CreateUserInput {
            email: input.email.trim().to_string(),
            username: input.username.trim().to_string(),
            first_name: input.first_name.trim().to_string(),
            last_name: input.last_name.trim().to_string(),
            password: input.password,
        };
        validate_register_input(&input)?;

        if self
            .user_repo
            .get_by_username(&input.username)
            .await
            .context("Failed to check username")?
            .is_some()
        {
            return Err(UserServiceError::UserExists(format!(
                "Username '{}' is already taken",
                input.username
            )));
        }

        if self
            .user_repo
            .get_by_email(&input.email)
            .await
            .context("Failed to check email")?
            .is_some()
        {
            return Err(UserServiceError::UserExists(format!(
                "Email '{}' is already registered",
                input.email
            )));
        }

        let role = if self.is_first_user().await? {
            UserRole::Admin
        } else {
            UserRole::User
        };

        let password_hash = hash_password(&input.password).context("Failed to hash password")?;

        let user = User::new(
            input.email,
            input.username,
            input.first_name,
            input.last_name,
            password_hash,
            role,
        );

        let created = self
            .user_repo
            .create(&user)
            .await
            .context("Failed to create user")?;

        tracing::info!(user_id = created.id, role = %created.role, "User registered");
        Ok(created)
    }

    /// Login with email and password
    ///
    /// # Errors
    ///
    /// - `AuthenticationError` if credentials are invalid
    /// - `InternalError` for database errors
    pub async fn login(&self, email: &str, password: &str) -> Result<Session, UserServiceError> {
        let invalid =
            || UserServiceError::AuthenticationError("Invalid email or password".to_string());

        let user = self
            .user_repo
            .get_by_email(email.trim())
            .await
            .context("Failed to get user by email")?
            .ok_or_else(invalid)?;

        let password_valid =
            verify_password(password, &user.password_hash).context("Failed to verify password")?;
        if !password_valid {
            return Err(invalid());
        }

        let session = Session::issue(user.id, Duration::days(self.session_expiration_days));
        let created = self
            .session_repo
            .create(&session)
            .await
            .context("Failed to create session")?;

        Ok(created)
    }

    /// Logout (invalidate session)
    pub async fn logout(&self, token: &str) -> Result<(), UserServiceError> {
        self.session_repo
            .delete(token)
            .await
            .context("Failed to delete session")?;
        Ok(())
    }

    /// Validate a session token and return the associated user
    ///
    /// Returns `None` if the session doesn't exist or is expired. Expired
    /// sessions are removed on sight.
    pub async fn validate_session(&self, token: &str) -> Result<Option<User>, UserServiceError> {
        let session = match self
            .session_repo
            .get_by_id(token)
            .await
            .context("Failed to get session")?
        {
            Some(s) => s,
            None => return Ok(None),
        };

        if session.is_expired() {
            if let Err(e) = self.session_repo.delete(token).await {
                tracing::warn!("Failed to delete expired session: {:#}", e);
            }
            return Ok(None);
        }

        let user = self
            .user_repo
            .get_by_id(session.user_id)
            .await
            .context("Failed to get user")?;

        Ok(user)
    }

    /// Get user by ID
    pub async fn get_by_id(&self, id: i64) -> Result<Option<User>, UserServiceError> {
        let user = self
            .user_repo
            .get_by_id(id)
            .await
            .context("Failed to get user by ID")?;
        Ok(user)
    }

    /// Public profile of `user_id` as seen by `viewer`.
    ///
    /// `is_subscribed` is false for anonymous viewers.
    pub async fn profile(
        &self,
        user_id: i64,
        viewer: Option<&User>,
    ) -> Result<UserProfile, UserServiceError> {
        let user = self
            .get_by_id(user_id)
            .await?
            .ok_or(UserServiceError::NotFound(user_id))?;
        let is_subscribed = self.is_subscribed(viewer, user.id).await?;
        Ok(user.profile(is_subscribed))
    }

    /// Whether `viewer` follows `author_id`
    pub async fn is_subscribed(
        &self,
        viewer: Option<&User>,
        author_id: i64,
    ) -> Result<bool, UserServiceError> {
        match viewer {
            Some(viewer) => Ok(self
                .follow_repo
                .exists(viewer.id, author_id)
                .await
                .context("Failed to check subscription")?),
            None => Ok(false),
        }
    }

    /// Check if this is the first user (for auto-admin)
    pub async fn is_first_user(&self) -> Result<bool, UserServiceError> {
        let count = self
            .user_repo
            .count()
            .await
            .context("Failed to count users")?;
        Ok(count == 0)
    }

    /// Delete all expired sessions, returning how many were removed
    pub async fn cleanup_expired_sessions(&self) -> Result<u64, UserServiceError> {
        let count = self
            .session_repo
            .delete_expired()
            .await
            .context("Failed to delete expired sessions")?;
        Ok(count)
    }
}

fn validate_register_input(input: &CreateUserInput) -> Result<(), UserServiceError> {
    let invalid = |msg: &str| Err(UserServiceError::ValidationError(msg.to_string()));

    if input.email.is_empty() {
        return invalid("Email cannot be empty");
    }
    if input.email.chars().count() > MAX_EMAIL_LENGTH {
        return invalid("Email must be at most 254 characters");
    }
    if !input.email.contains('@') {
        return invalid("Invalid email format");
    }

    if input.username.is_empty() {
        return invalid("Username cannot be empty");
    }
    if input.username.chars().count() > MAX_NAME_LENGTH {
        return invalid("Username must be at most 150 characters");
    }
    if !USERNAME_RE.is_match(&input.username) {
        return invalid("Username may contain only letters, digits and @/./+/-/_");
    }
    if RESERVED_USERNAMES.contains(&input.username.as_str()) {
        return Err(UserServiceError::ValidationError(format!(
            "Username '{}' is reserved",
            input.username
        )));
    }

    for (field, value) in [("First name", &input.first_name), ("Last name", &input.last_name)] {
        if value.is_empty() {
            return Err(UserServiceError::ValidationError(format!("{} cannot be empty", field)));
        }
        if value.chars().count() > MAX_NAME_LENGTH {
            return Err(UserServiceError::ValidationError(format!(
                "{} must be at most 150 characters",
                field
            )));
        }
    }

    if input.password.is_empty() {
        return invalid("Password cannot be empty");
    }

    Ok(())
}
