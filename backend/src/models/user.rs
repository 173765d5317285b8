//! Models that represent users, roles, and account status.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sqlx::FromRow;
use validator::Validate;

use crate::types::UserId;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
/// Database representation of a user account.
///
/// The password credential is not part of this model; it lives in a sibling
/// table keyed by user id (see `repositories::credential`).
pub struct User {
    /// Unique identifier for the user.
    pub id: UserId,
    /// Unique, case-normalized email address used for login.
    pub email: String,
    /// Role describing the user's position in the privilege hierarchy.
    pub role: UserRole,
    /// Whether the account may authenticate at all.
    pub status: UserStatus,
    /// Whether the email address has been verified.
    pub email_verified: bool,
    /// Creation timestamp for auditing.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp for auditing.
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, sqlx::Type, Default)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
/// Supported user roles, totally ordered by privilege.
///
/// Variant order is the privilege order; `PartialOrd`/`Ord` derive from it.
pub enum UserRole {
    #[default]
    User,
    Moderator,
    Admin,
    SuperUser,
}

impl UserRole {
    /// Returns the canonical snake_case representation of the role.
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::User => "user",
            UserRole::Moderator => "moderator",
            UserRole::Admin => "admin",
            UserRole::SuperUser => "super_user",
        }
    }

    /// Position on the total order, used for margin arithmetic.
    pub fn rank(&self) -> i16 {
        match self {
            UserRole::User => 0,
            UserRole::Moderator => 1,
            UserRole::Admin => 2,
            UserRole::SuperUser => 3,
        }
    }
}

impl Serialize for UserRole {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for UserRole {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        match s.as_str() {
            // primary canonical values (snake_case)
            "user" => Ok(UserRole::User),
            "moderator" => Ok(UserRole::Moderator),
            "admin" => Ok(UserRole::Admin),
            "super_user" => Ok(UserRole::SuperUser),
            // tolerate common legacy casings
            "User" | "USER" => Ok(UserRole::User),
            "Moderator" | "MODERATOR" => Ok(UserRole::Moderator),
            "Admin" | "ADMIN" => Ok(UserRole::Admin),
            "SuperUser" | "superuser" | "SUPER_USER" => Ok(UserRole::SuperUser),
            other => Err(serde::de::Error::unknown_variant(
                other,
                &["user", "moderator", "admin", "super_user"],
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Default)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
/// Account status, independent of the role axis.
pub enum UserStatus {
    #[default]
    Active,
    Blocked,
}

impl UserStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserStatus::Active => "active",
            UserStatus::Blocked => "blocked",
        }
    }
}

impl Serialize for UserStatus {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for UserStatus {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        match s.as_str() {
            "active" | "Active" | "ACTIVE" => Ok(UserStatus::Active),
            "blocked" | "Blocked" | "BLOCKED" => Ok(UserStatus::Blocked),
            other => Err(serde::de::Error::unknown_variant(
                other,
                &["active", "blocked"],
            )),
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
/// Payload submitted when registering a new account.
pub struct RegisterUser {
    #[validate(email)]
    pub email: String,
    pub password: String,
}

impl User {
    /// Constructs a new active user with a freshly generated identifier.
    pub fn new(email: String, role: UserRole) -> Self {
        let now = Utc::now();
        Self {
            id: UserId::new(),
            email,
            role,
            status: UserStatus::Active,
            email_verified: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns `true` when the account is blocked from acting.
    pub fn is_blocked(&self) -> bool {
        matches!(self.status, UserStatus::Blocked)
    }
}
