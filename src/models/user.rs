//! User model
//!
//! Registered users, their roles and the public summary shown next to recipes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// User entity representing a registered user in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier
    pub id: i64,
    /// Email address (unique, used to log in)
    pub email: String,
    /// Username (unique)
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    /// Password hash (argon2)
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// User role
    pub role: UserRole,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Create a new User with the given parameters.
    ///
    /// The password must already be hashed, see `services::password::hash_password()`.
    pub fn new(
        email: String,
        username: String,
        first_name: String,
        last_name: String,
        password_hash: String,
        role: UserRole,
    ) -> Self {
        Self {
            id: 0, // Will be set by the database
            email,
            username,
            first_name,
            last_name,
            password_hash,
            role,
            created_at: Utc::now(),
        }
    }

    /// Check if the user is an administrator
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    /// Check if the user may modify a recipe written by `author_id`.
    ///
    /// Admins can edit any recipe, everyone else only their own.
    pub fn can_edit(&self, author_id: i64) -> bool {
        self.is_admin() || self.id == author_id
    }

    /// Public summary of this user as seen by a viewer.
    pub fn profile(&self, is_subscribed: bool) -> UserProfile {
        UserProfile {
            email: self.email.clone(),
            id: self.id,
            username: self.username.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            is_subscribed,
        }
    }
}

/// User role for authorization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    /// Administrator - may edit or delete any recipe
    Admin,
    /// Regular user - owns their recipes only
    #[default]
    User,
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserRole::Admin => write!(f, "admin"),
            UserRole::User => write!(f, "user"),
        }
    }
}

impl FromStr for UserRole {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "admin" => Ok(UserRole::Admin),
            "user" => Ok(UserRole::User),
            _ => Err(anyhow::anyhow!("Invalid user role: {}", s)),
        }
    }
}

/// User summary returned by the API.
///
/// `is_subscribed` is relative to the viewer and is always false for
/// anonymous requests.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserProfile {
    pub email: String,
    pub id: i64,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub is_subscribed: bool,
}

/// Input for registering a new user (before password hashing)
#[derive(Debug, Clone, Deserialize)]
pub struct CreateUserInput {
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    /// Plaintext password (will be hashed)
    pub password: String,
}

impl CreateUserInput {
    pub fn new(
        email: impl Into<String>,
        username: impl Into<String>,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            email: email.into(),
            username: username.into(),
            first_name: first_name.into(),
            last_name: last_name.into(),
            password: password.into(),
        }
    }
}
