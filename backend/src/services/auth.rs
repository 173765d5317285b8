//! Session & login orchestrator.
//!
//! Composes the credential manager, session store, and user service into the
//! login, refresh, logout, and admin workflows. Transport adapters call these
//! operations; nothing here knows about HTTP.

use std::sync::Arc;

use crate::db::connection::DbPool;
use crate::error::{AppError, ConflictKind};
use crate::models::session::{SessionInfo, TokensPair};
use crate::models::user::{User, UserRole, UserStatus};
use crate::models::{PageInfo, PaginationQuery, SessionSort};
use crate::repositories::{session as session_repo, transaction};
use crate::services::session_store::SessionStore;
use crate::services::users::UserService;
use crate::types::{SessionId, UserId};

/// Margin every admin entry point passes to the hierarchy rule: the
/// initiator must strictly outrank the target.
pub const ADMIN_RIGHTS_MARGIN: i16 = 1;

/// How a login proves the principal's identity.
pub enum CredentialProof<'a> {
    /// Password checked against the sibling credential store.
    Password(&'a str),
    /// Identity already asserted by an external OAuth handshake that
    /// yielded a verified email.
    AssertedIdentity,
}

pub struct AuthService {
    pool: DbPool,
    users: Arc<UserService>,
    sessions: Arc<SessionStore>,
}

impl AuthService {
    pub fn new(pool: DbPool, users: Arc<UserService>, sessions: Arc<SessionStore>) -> Self {
        Self {
            pool,
            users,
            sessions,
        }
    }

    /// Authenticates a principal and opens a session.
    ///
    /// Unknown email, wrong password, and blocked account all collapse into
    /// the same `Unauthenticated` so login does not leak account existence.
    pub async fn login(
        &self,
        email: &str,
        proof: CredentialProof<'_>,
        client: &str,
        ip: &str,
    ) -> Result<TokensPair, AppError> {
        let user = match self.users.get_by_email(email).await {
            Ok(user) => user,
            Err(AppError::NotFound { .. }) => return Err(invalid_credentials()),
            Err(err) => return Err(err),
        };
        if user.is_blocked() {
            return Err(invalid_credentials());
        }

        match proof {
            CredentialProof::Password(password) => {
                if !self.users.verify_password(user.id, password).await? {
                    return Err(invalid_credentials());
                }
            }
            CredentialProof::AssertedIdentity => {}
        }

        let (_session, pair) = self.sessions.create(&user, client, ip).await?;
        Ok(pair)
    }

    /// Rotates a session's token pair.
    ///
    /// The client descriptor must match the one recorded at login; a
    /// divergence is replay across devices and fails before any rotation.
    pub async fn refresh(
        &self,
        user_id: UserId,
        session_id: SessionId,
        client: &str,
        presented: &str,
    ) -> Result<TokensPair, AppError> {
        let claims = self
            .sessions
            .credentials()
            .parse_refresh_claims(presented)?;
        if claims.sub != user_id.to_string() || claims.sid != session_id.to_string() {
            return Err(AppError::unauthenticated(
                "refresh token does not match the claimed session",
            ));
        }

        let user = self.users.get_by_id(user_id).await?;
        if user.is_blocked() {
            return Err(AppError::unauthenticated("account is blocked"));
        }

        let session = self.sessions.get(session_id, user_id).await?;
        if session.client != client {
            return Err(AppError::Conflict(ConflictKind::SessionClientMismatch));
        }

        let (_session, pair) = self.sessions.refresh(&user, session_id, presented).await?;
        Ok(pair)
    }

    pub async fn logout(&self, user_id: UserId, session_id: SessionId) -> Result<(), AppError> {
        self.sessions.delete(session_id, user_id).await
    }

    pub async fn list_sessions(
        &self,
        user_id: UserId,
        page: &PaginationQuery,
        sort: &SessionSort,
    ) -> Result<(Vec<SessionInfo>, PageInfo), AppError> {
        self.sessions.list_for_user(user_id, page, sort).await
    }

    pub async fn get_session(
        &self,
        user_id: UserId,
        session_id: SessionId,
    ) -> Result<SessionInfo, AppError> {
        self.sessions
            .get(session_id, user_id)
            .await
            .map(SessionInfo::from)
    }

    pub async fn delete_session(
        &self,
        user_id: UserId,
        session_id: SessionId,
    ) -> Result<(), AppError> {
        self.sessions.delete(session_id, user_id).await
    }

    pub async fn delete_all_sessions(&self, user_id: UserId) -> Result<u64, AppError> {
        self.sessions.delete_all_for_user(user_id).await
    }

    /// Changes the caller's password and terminates every session of the
    /// account in the same transaction as the credential update.
    pub async fn change_password(
        &self,
        user_id: UserId,
        current: &str,
        new_password: &str,
    ) -> Result<(), AppError> {
        let user = self.users.get_initiator(user_id).await?;
        if !self.users.verify_password(user.id, current).await? {
            return Err(AppError::unauthenticated("current password does not match"));
        }

        let mut tx = transaction::begin_transaction(self.pool.as_ref()).await?;
        self.users
            .update_password(&mut *tx, user.id, new_password)
            .await?;
        session_repo::delete_sessions_for_user(&mut *tx, user.id).await?;
        transaction::commit_transaction(tx).await?;

        self.sessions.evict_user(user.id).await;
        Ok(())
    }

    /// Changes a user's role. Every outstanding session of the target dies
    /// with the old privileges, in the same transaction as the role update.
    pub async fn admin_update_role(
        &self,
        initiator_id: UserId,
        target_id: UserId,
        role: UserRole,
    ) -> Result<User, AppError> {
        let (initiator, target) = self
            .users
            .compare_rights_for_admins(initiator_id, target_id, ADMIN_RIGHTS_MARGIN)
            .await?;
        if initiator.id == target.id {
            return Err(AppError::no_permissions("cannot change own role"));
        }

        let mut tx = transaction::begin_transaction(self.pool.as_ref()).await?;
        let updated = self.users.update_role(&mut *tx, target.id, role).await?;
        session_repo::delete_sessions_for_user(&mut *tx, target.id).await?;
        transaction::commit_transaction(tx).await?;

        self.sessions.evict_user(target.id).await;
        Ok(updated)
    }

    /// Blocks or unblocks a user, terminating their sessions either way.
    pub async fn admin_set_status(
        &self,
        initiator_id: UserId,
        target_id: UserId,
        status: UserStatus,
    ) -> Result<User, AppError> {
        let (initiator, target) = self
            .users
            .compare_rights_for_admins(initiator_id, target_id, ADMIN_RIGHTS_MARGIN)
            .await?;
        if initiator.id == target.id {
            return Err(AppError::no_permissions("cannot change own status"));
        }

        let mut tx = transaction::begin_transaction(self.pool.as_ref()).await?;
        let updated = self.users.set_status(&mut *tx, target.id, status).await?;
        session_repo::delete_sessions_for_user(&mut *tx, target.id).await?;
        transaction::commit_transaction(tx).await?;

        self.sessions.evict_user(target.id).await;
        Ok(updated)
    }

    /// Overrides the email-verification flag. Sessions are purged because
    /// outstanding refresh tokens carry the old verification claim.
    pub async fn admin_set_verified(
        &self,
        initiator_id: UserId,
        target_id: UserId,
        verified: bool,
    ) -> Result<User, AppError> {
        let (_initiator, target) = self
            .users
            .compare_rights_for_admins(initiator_id, target_id, ADMIN_RIGHTS_MARGIN)
            .await?;

        let mut tx = transaction::begin_transaction(self.pool.as_ref()).await?;
        let updated = self
            .users
            .set_email_verified(&mut *tx, target.id, verified)
            .await?;
        session_repo::delete_sessions_for_user(&mut *tx, target.id).await?;
        transaction::commit_transaction(tx).await?;

        self.sessions.evict_user(target.id).await;
        Ok(updated)
    }

    pub async fn admin_list_sessions(
        &self,
        initiator_id: UserId,
        target_id: UserId,
        page: &PaginationQuery,
        sort: &SessionSort,
    ) -> Result<(Vec<SessionInfo>, PageInfo), AppError> {
        let (_initiator, target) = self
            .users
            .compare_rights_for_admins(initiator_id, target_id, ADMIN_RIGHTS_MARGIN)
            .await?;
        self.sessions.list_for_user(target.id, page, sort).await
    }

    pub async fn admin_get_session(
        &self,
        initiator_id: UserId,
        target_id: UserId,
        session_id: SessionId,
    ) -> Result<SessionInfo, AppError> {
        let (_initiator, target) = self
            .users
            .compare_rights_for_admins(initiator_id, target_id, ADMIN_RIGHTS_MARGIN)
            .await?;
        // The ownership filter rejects a session id that belongs to a
        // different user than the one named in the request.
        self.sessions
            .get(session_id, target.id)
            .await
            .map(SessionInfo::from)
    }

    pub async fn admin_delete_session(
        &self,
        initiator_id: UserId,
        target_id: UserId,
        session_id: SessionId,
    ) -> Result<(), AppError> {
        let (_initiator, target) = self
            .users
            .compare_rights_for_admins(initiator_id, target_id, ADMIN_RIGHTS_MARGIN)
            .await?;
        self.sessions.delete(session_id, target.id).await
    }

    pub async fn admin_terminate_all_sessions(
        &self,
        initiator_id: UserId,
        target_id: UserId,
    ) -> Result<u64, AppError> {
        let (_initiator, target) = self
            .users
            .compare_rights_for_admins(initiator_id, target_id, ADMIN_RIGHTS_MARGIN)
            .await?;
        self.sessions.delete_all_for_user(target.id).await
    }

    /// Deletes a user account. Credentials and sessions cascade in the same
    /// statement, so no multi-step transaction is needed.
    pub async fn admin_delete_user(
        &self,
        initiator_id: UserId,
        target_id: UserId,
    ) -> Result<(), AppError> {
        let (initiator, target) = self
            .users
            .compare_rights_for_admins(initiator_id, target_id, ADMIN_RIGHTS_MARGIN)
            .await?;
        if initiator.id == target.id {
            return Err(AppError::no_permissions("cannot delete own account"));
        }

        self.users.delete(target.id).await?;
        self.sessions.evict_user(target.id).await;
        Ok(())
    }
}

fn invalid_credentials() -> AppError {
    AppError::unauthenticated("invalid credentials")
}
