//! Data models shared across database access and the service layer.

use serde::{Deserialize, Serialize};

/// Query parameters for paginated session listings.
#[derive(Debug, Clone, Deserialize)]
pub struct PaginationQuery {
    /// Maximum number of records to return (default: 50, max: 100).
    #[serde(default = "default_limit")]
    pub limit: i64,
    /// Number of records to skip (default: 0).
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    50
}

impl PaginationQuery {
    /// Returns a clamped limit value (1..=100).
    pub fn limit(&self) -> i64 {
        self.limit.clamp(1, 100)
    }

    /// Returns offset, floored at 0.
    pub fn offset(&self) -> i64 {
        self.offset.max(0)
    }
}

impl Default for PaginationQuery {
    fn default() -> Self {
        Self {
            limit: default_limit(),
            offset: 0,
        }
    }
}

/// Page metadata derived from a peek row, without a COUNT query.
#[derive(Debug, Clone, Serialize)]
pub struct PageInfo {
    pub limit: i64,
    pub offset: i64,
    pub has_more: bool,
}

/// Sort fields accepted by session listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionSortField {
    #[default]
    CreatedAt,
    LastUsedAt,
}

impl SessionSortField {
    /// Column name the field maps to; never derived from caller input.
    pub fn column(&self) -> &'static str {
        match self {
            SessionSortField::CreatedAt => "created_at",
            SessionSortField::LastUsedAt => "last_used_at",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// Caller-specified ordering for session listings.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct SessionSort {
    #[serde(default)]
    pub field: SessionSortField,
    #[serde(default)]
    pub direction: SortDirection,
}

pub mod session;
pub mod user;
