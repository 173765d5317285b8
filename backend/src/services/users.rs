//! User identity, status, and the role-hierarchy authorization rule.

use sqlx::PgExecutor;
use validator::Validate;

use crate::db::connection::DbPool;
use crate::error::{AppError, ResourceKind};
use crate::models::user::{RegisterUser, User, UserRole, UserStatus};
use crate::repositories::{
    credential as credential_repo, transaction, user as user_repo,
};
use crate::types::UserId;
use crate::utils::password::{hash_password, verify_password};
use crate::validation::rules;

/// Pure hierarchy rule shared by every admin entry point.
///
/// Self-operations pass unconditionally; a SuperUser target requires a
/// SuperUser initiator; otherwise the initiator must outrank the target by
/// at least `margin` positions on the total order.
pub fn ensure_role_margin(initiator: &User, target: &User, margin: i16) -> Result<(), AppError> {
    if initiator.id == target.id {
        return Ok(());
    }
    if target.role == UserRole::SuperUser {
        return if initiator.role == UserRole::SuperUser {
            Ok(())
        } else {
            Err(AppError::no_permissions(
                "only a super user may act on a super user",
            ))
        };
    }
    if initiator.role.rank() - target.role.rank() < margin {
        return Err(AppError::no_permissions(
            "initiator does not outrank target by the required margin",
        ));
    }
    Ok(())
}

pub struct UserService {
    pool: DbPool,
    password_min_length: usize,
}

impl UserService {
    pub fn new(pool: DbPool, password_min_length: usize) -> Self {
        Self {
            pool,
            password_min_length,
        }
    }

    /// Creates a user and its password credential in one transaction.
    pub async fn register(&self, payload: RegisterUser) -> Result<User, AppError> {
        payload.validate()?;
        rules::validate_password(&payload.password, self.password_min_length)
            .map_err(|e| AppError::Validation(vec![format!("password: {}", e.code)]))?;

        let email = rules::normalize_email(&payload.email);
        let password_hash = hash_password(&payload.password)?;
        let user = User::new(email, UserRole::User);

        let mut tx = transaction::begin_transaction(self.pool.as_ref()).await?;
        if let Err(err) = user_repo::insert_user(&mut *tx, &user).await {
            if user_repo::is_unique_violation(&err) {
                return Err(AppError::already_exists(ResourceKind::User, user.email.clone()));
            }
            return Err(err.into());
        }
        credential_repo::upsert_password_hash(&mut *tx, user.id, &password_hash).await?;
        transaction::commit_transaction(tx).await?;

        Ok(user)
    }

    pub async fn get_by_id(&self, user_id: UserId) -> Result<User, AppError> {
        user_repo::find_user_by_id(self.pool.as_ref(), user_id)
            .await?
            .ok_or_else(|| AppError::not_found(ResourceKind::User, user_id.to_string()))
    }

    pub async fn get_by_email(&self, email: &str) -> Result<User, AppError> {
        let email = rules::normalize_email(email);
        user_repo::find_user_by_email(self.pool.as_ref(), &email)
            .await?
            .ok_or_else(|| AppError::not_found(ResourceKind::User, email))
    }

    /// Resolves an acting principal. A blocked account cannot act even with
    /// a still-valid access token.
    pub async fn get_initiator(&self, user_id: UserId) -> Result<User, AppError> {
        let user = self.get_by_id(user_id).await?;
        if user.is_blocked() {
            return Err(AppError::unauthenticated("initiator account is blocked"));
        }
        Ok(user)
    }

    /// Resolves initiator and target and applies [`ensure_role_margin`].
    pub async fn compare_rights_for_admins(
        &self,
        initiator_id: UserId,
        target_id: UserId,
        margin: i16,
    ) -> Result<(User, User), AppError> {
        let initiator = self.get_initiator(initiator_id).await?;
        if initiator_id == target_id {
            return Ok((initiator.clone(), initiator));
        }
        let target = self.get_by_id(target_id).await?;
        ensure_role_margin(&initiator, &target, margin)?;
        Ok((initiator, target))
    }

    /// Verifies a presented password against the sibling credential store.
    /// A missing credential row behaves like a mismatch.
    pub async fn verify_password(&self, user_id: UserId, password: &str) -> Result<bool, AppError> {
        let Some(hash) = credential_repo::fetch_password_hash(self.pool.as_ref(), user_id).await?
        else {
            return Ok(false);
        };
        verify_password(password, &hash).map_err(AppError::from)
    }

    // The mutators below take an executor so the orchestrator can run them
    // inside the same transaction as the cascading session purge.

    pub async fn set_status<'e>(
        &self,
        exec: impl PgExecutor<'e>,
        user_id: UserId,
        status: UserStatus,
    ) -> Result<User, AppError> {
        user_repo::update_status(exec, user_id, status)
            .await?
            .ok_or_else(|| AppError::not_found(ResourceKind::User, user_id.to_string()))
    }

    pub async fn update_role<'e>(
        &self,
        exec: impl PgExecutor<'e>,
        user_id: UserId,
        role: UserRole,
    ) -> Result<User, AppError> {
        user_repo::update_role(exec, user_id, role)
            .await?
            .ok_or_else(|| AppError::not_found(ResourceKind::User, user_id.to_string()))
    }

    pub async fn set_email_verified<'e>(
        &self,
        exec: impl PgExecutor<'e>,
        user_id: UserId,
        verified: bool,
    ) -> Result<User, AppError> {
        user_repo::update_email_verified(exec, user_id, verified)
            .await?
            .ok_or_else(|| AppError::not_found(ResourceKind::User, user_id.to_string()))
    }

    pub async fn update_password<'e>(
        &self,
        exec: impl PgExecutor<'e>,
        user_id: UserId,
        new_password: &str,
    ) -> Result<(), AppError> {
        rules::validate_password(new_password, self.password_min_length)
            .map_err(|e| AppError::Validation(vec![format!("password: {}", e.code)]))?;
        let password_hash = hash_password(new_password)?;
        credential_repo::upsert_password_hash(exec, user_id, &password_hash).await?;
        Ok(())
    }

    /// Removes the user row; credentials and sessions cascade with it.
    pub async fn delete(&self, user_id: UserId) -> Result<(), AppError> {
        let deleted = user_repo::delete_user(self.pool.as_ref(), user_id).await?;
        if !deleted {
            return Err(AppError::not_found(ResourceKind::User, user_id.to_string()));
        }
        Ok(())
    }
}
