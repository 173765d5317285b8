//! Single-sign-on credential and session engine.
//!
//! The crate authenticates principals, issues and rotates access/refresh
//! token pairs, persists sessions with their refresh tokens encrypted at
//! rest, and enforces a role-hierarchy authorization model for
//! administrative operations. Transport layers (HTTP/RPC) are external
//! collaborators that call [`state::AppState`]'s services.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod repositories;
pub mod services;
pub mod state;
pub mod types;
pub mod utils;
pub mod validation;
