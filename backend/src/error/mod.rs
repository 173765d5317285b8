//! Error taxonomy shared by every component of the engine.
//!
//! Transport adapters map [`AppError::code`] to their wire representation;
//! the engine itself never renders HTTP statuses.

use thiserror::Error;

/// Resource kinds referenced by not-found / already-exists errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    User,
    Session,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::User => "user",
            ResourceKind::Session => "session",
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Detected inconsistencies between claimed and stored session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictKind {
    /// The presented refresh token no longer matches the stored ciphertext.
    SessionTokenMismatch,
    /// The presented client descriptor differs from the one recorded at login.
    SessionClientMismatch,
}

impl ConflictKind {
    pub fn code(&self) -> &'static str {
        match self {
            ConflictKind::SessionTokenMismatch => "SESSION_TOKEN_MISMATCH",
            ConflictKind::SessionClientMismatch => "SESSION_CLIENT_MISMATCH",
        }
    }
}

impl std::fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConflictKind::SessionTokenMismatch => {
                f.write_str("presented refresh token has been superseded")
            }
            ConflictKind::SessionClientMismatch => {
                f.write_str("presented client does not match the session client")
            }
        }
    }
}

/// Signature/expiry verification outcome for a presented token.
///
/// Expired and invalid are separate variants so callers can apply different
/// policies (an expired token proves nothing about signature validity and is
/// reported without leaking it).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("token expired")]
    Expired,
    #[error("token invalid")]
    Invalid,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{kind} {id} not found")]
    NotFound { kind: ResourceKind, id: String },
    #[error("{kind} {id} already exists")]
    AlreadyExists { kind: ResourceKind, id: String },
    #[error("unauthenticated: {0}")]
    Unauthenticated(String),
    #[error("no permissions: {0}")]
    NoPermissions(String),
    #[error("{0}")]
    Conflict(ConflictKind),
    #[error("validation failed")]
    Validation(Vec<String>),
    #[error("internal error")]
    Internal(#[source] anyhow::Error),
}

impl AppError {
    pub fn not_found(kind: ResourceKind, id: impl Into<String>) -> Self {
        AppError::NotFound {
            kind,
            id: id.into(),
        }
    }

    pub fn already_exists(kind: ResourceKind, id: impl Into<String>) -> Self {
        AppError::AlreadyExists {
            kind,
            id: id.into(),
        }
    }

    pub fn unauthenticated(reason: impl Into<String>) -> Self {
        AppError::Unauthenticated(reason.into())
    }

    pub fn no_permissions(reason: impl Into<String>) -> Self {
        AppError::NoPermissions(reason.into())
    }

    /// Stable machine-readable code for transport rendering.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::NotFound { .. } => "NOT_FOUND",
            AppError::AlreadyExists { .. } => "ALREADY_EXISTS",
            AppError::Unauthenticated(_) => "UNAUTHENTICATED",
            AppError::NoPermissions(_) => "NO_PERMISSIONS",
            AppError::Conflict(kind) => kind.code(),
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::Internal(_) => "INTERNAL",
        }
    }

    /// Message safe to show outside the service. Internal causes are logged
    /// at the site that produced them and rendered generically here.
    pub fn public_message(&self) -> String {
        match self {
            AppError::Internal(_) => "internal error".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err)
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Internal(err.into())
    }
}

impl From<TokenError> for AppError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Expired => AppError::Unauthenticated("refresh token expired".into()),
            TokenError::Invalid => AppError::Unauthenticated("refresh token invalid".into()),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let messages: Vec<String> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter()
                    .map(move |e| format!("{}: {}", field, e.code))
            })
            .collect();
        AppError::Validation(messages)
    }
}
