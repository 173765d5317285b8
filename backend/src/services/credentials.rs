//! Credential manager: signing of token pairs and at-rest encryption of
//! refresh tokens.
//!
//! Signing and at-rest encryption use distinct secrets, so a database dump
//! alone cannot yield usable refresh tokens.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use anyhow::anyhow;
use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine as _};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use rand::{rngs::OsRng, RngCore};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::config::Config;
use crate::error::{AppError, TokenError};
use crate::models::user::UserRole;
use crate::types::{SessionId, UserId};

const NONCE_LENGTH: usize = 12;
const ENVELOPE_PREFIX: &str = "enc:v1";

#[derive(Debug, Serialize, Deserialize)]
/// Claims carried by a short-TTL access token.
pub struct AccessClaims {
    pub sub: String, // user_id
    pub sid: String, // session_id
    pub role: String,
    pub exp: i64,
    pub iat: i64,
    pub jti: String,
}

#[derive(Debug, Serialize, Deserialize)]
/// Claims carried by a long-TTL refresh token.
pub struct RefreshClaims {
    pub sub: String,
    pub sid: String,
    pub role: String,
    pub email_verified: bool,
    pub exp: i64,
    pub iat: i64,
    pub jti: String,
}

/// Stateless token factory configured with secrets and TTLs at construction.
pub struct CredentialService {
    jwt_secret: String,
    encryption_key: [u8; 32],
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl CredentialService {
    pub fn new(config: &Config) -> Self {
        Self {
            jwt_secret: config.jwt_secret.clone(),
            encryption_key: derive_encryption_key(&config.token_encryption_key),
            access_ttl: Duration::minutes(config.access_token_ttl_minutes),
            refresh_ttl: Duration::days(config.refresh_token_ttl_days),
        }
    }

    pub fn refresh_ttl(&self) -> Duration {
        self.refresh_ttl
    }

    /// Signs a short-TTL token binding user, session, and role.
    pub fn generate_access(
        &self,
        user_id: UserId,
        session_id: SessionId,
        role: UserRole,
    ) -> Result<String, AppError> {
        let now = Utc::now();
        let claims = AccessClaims {
            sub: user_id.to_string(),
            sid: session_id.to_string(),
            role: role.as_str().to_string(),
            exp: (now + self.access_ttl).timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_ref()),
        )
        .map_err(|e| AppError::Internal(anyhow!("access token signing failed: {}", e)))
    }

    /// Signs a long-TTL token with the same claims plus verification state.
    pub fn generate_refresh(
        &self,
        user_id: UserId,
        session_id: SessionId,
        role: UserRole,
        email_verified: bool,
    ) -> Result<String, AppError> {
        let now = Utc::now();
        let claims = RefreshClaims {
            sub: user_id.to_string(),
            sid: session_id.to_string(),
            role: role.as_str().to_string(),
            email_verified,
            exp: (now + self.refresh_ttl).timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_ref()),
        )
        .map_err(|e| AppError::Internal(anyhow!("refresh token signing failed: {}", e)))
    }

    /// Validates signature and expiry of an access token.
    pub fn parse_access_claims(&self, token: &str) -> Result<AccessClaims, TokenError> {
        decode::<AccessClaims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_ref()),
            &Validation::default(),
        )
        .map(|data| data.claims)
        .map_err(classify_jwt_error)
    }

    /// Validates signature and expiry of a refresh token, keeping expired and
    /// invalid distinguishable.
    pub fn parse_refresh_claims(&self, token: &str) -> Result<RefreshClaims, TokenError> {
        decode::<RefreshClaims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_ref()),
            &Validation::default(),
        )
        .map(|data| data.claims)
        .map_err(classify_jwt_error)
    }

    /// Seals a refresh token into an `enc:v1:<nonce>:<ciphertext>` envelope
    /// with a fresh random nonce.
    pub fn encrypt_refresh(&self, token: &str) -> Result<String, AppError> {
        let mut nonce_bytes = [0u8; NONCE_LENGTH];
        OsRng.fill_bytes(&mut nonce_bytes);

        let cipher = Aes256Gcm::new_from_slice(&self.encryption_key)
            .map_err(|_| AppError::Internal(anyhow!("invalid refresh encryption key")))?;
        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce_bytes), token.as_bytes())
            .map_err(|_| AppError::Internal(anyhow!("refresh token encryption failed")))?;

        Ok(format!(
            "{}:{}:{}",
            ENVELOPE_PREFIX,
            STANDARD_NO_PAD.encode(nonce_bytes),
            STANDARD_NO_PAD.encode(ciphertext)
        ))
    }

    /// Opens a stored envelope. Any malformed input or authentication-tag
    /// mismatch is rejected; partial plaintext is never returned.
    pub fn decrypt_refresh(&self, stored: &str) -> Result<String, AppError> {
        let payload = stored
            .strip_prefix(ENVELOPE_PREFIX)
            .and_then(|rest| rest.strip_prefix(':'))
            .ok_or_else(|| AppError::unauthenticated("unrecognized refresh envelope"))?;

        let (nonce_part, cipher_part) = payload
            .split_once(':')
            .ok_or_else(|| AppError::unauthenticated("malformed refresh envelope"))?;

        let nonce_bytes = STANDARD_NO_PAD
            .decode(nonce_part)
            .map_err(|_| AppError::unauthenticated("invalid nonce encoding"))?;
        if nonce_bytes.len() != NONCE_LENGTH {
            return Err(AppError::unauthenticated("invalid nonce length"));
        }
        let ciphertext = STANDARD_NO_PAD
            .decode(cipher_part)
            .map_err(|_| AppError::unauthenticated("invalid ciphertext encoding"))?;

        let cipher = Aes256Gcm::new_from_slice(&self.encryption_key)
            .map_err(|_| AppError::Internal(anyhow!("invalid refresh decryption key")))?;
        let plaintext = cipher
            .decrypt(Nonce::from_slice(&nonce_bytes), ciphertext.as_ref())
            .map_err(|_| AppError::unauthenticated("refresh ciphertext failed authentication"))?;
        String::from_utf8(plaintext)
            .map_err(|_| AppError::unauthenticated("decrypted refresh token is not UTF-8"))
    }
}

fn classify_jwt_error(err: jsonwebtoken::errors::Error) -> TokenError {
    match err.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
        _ => TokenError::Invalid,
    }
}

fn derive_encryption_key(secret: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(b"refresh-token-at-rest");
    hasher.update(b"|");
    hasher.update(secret.as_bytes());
    let digest = hasher.finalize();
    let mut key = [0u8; 32];
    key.copy_from_slice(&digest);
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> CredentialService {
        let config = Config {
            database_url: "postgres://test".into(),
            redis_url: None,
            redis_pool_size: 10,
            redis_connect_timeout: 5,
            jwt_secret: "a_signing_secret_that_is_long_enough_123".into(),
            token_encryption_key: "an_encryption_secret_that_is_long_enough_456".into(),
            access_token_ttl_minutes: 15,
            refresh_token_ttl_days: 30,
            session_cache_ttl_seconds: 3600,
            password_min_length: 8,
        };
        CredentialService::new(&config)
    }

    #[test]
    fn access_token_carries_user_session_and_role() {
        let service = service();
        let user_id = UserId::new();
        let session_id = SessionId::new();
        let token = service
            .generate_access(user_id, session_id, UserRole::Admin)
            .expect("generate access");
        let claims = service.parse_access_claims(&token).expect("parse access");
        assert_eq!(claims.sub, user_id.to_string());
        assert_eq!(claims.sid, session_id.to_string());
        assert_eq!(claims.role, "admin");
    }

    #[test]
    fn refresh_token_carries_verification_state() {
        let service = service();
        let token = service
            .generate_refresh(UserId::new(), SessionId::new(), UserRole::User, true)
            .expect("generate refresh");
        let claims = service.parse_refresh_claims(&token).expect("parse refresh");
        assert!(claims.email_verified);
        assert_eq!(claims.role, "user");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn parse_distinguishes_expired_from_invalid() {
        let service = service();

        // Hand-craft an already-expired refresh token with the right key.
        let now = Utc::now();
        let expired = RefreshClaims {
            sub: UserId::new().to_string(),
            sid: SessionId::new().to_string(),
            role: "user".into(),
            email_verified: false,
            exp: (now - Duration::hours(2)).timestamp(),
            iat: (now - Duration::hours(3)).timestamp(),
            jti: Uuid::new_v4().to_string(),
        };
        let token = encode(
            &Header::default(),
            &expired,
            &EncodingKey::from_secret("a_signing_secret_that_is_long_enough_123".as_ref()),
        )
        .expect("sign expired token");
        assert!(matches!(
            service.parse_refresh_claims(&token),
            Err(TokenError::Expired)
        ));

        // Signed with the wrong key: invalid, not expired.
        let foreign = encode(
            &Header::default(),
            &expired,
            &EncodingKey::from_secret("some_other_key".as_ref()),
        )
        .expect("sign foreign token");
        assert!(matches!(
            service.parse_refresh_claims(&foreign),
            Err(TokenError::Invalid)
        ));

        assert!(matches!(
            service.parse_refresh_claims("garbage"),
            Err(TokenError::Invalid)
        ));
    }

    #[test]
    fn encrypt_decrypt_round_trip() {
        let service = service();
        let token = service
            .generate_refresh(UserId::new(), SessionId::new(), UserRole::User, false)
            .expect("generate refresh");
        let envelope = service.encrypt_refresh(&token).expect("encrypt");
        assert!(envelope.starts_with("enc:v1:"));
        let decrypted = service.decrypt_refresh(&envelope).expect("decrypt");
        assert_eq!(decrypted, token);
    }

    #[test]
    fn encryption_uses_a_fresh_nonce_per_call() {
        let service = service();
        let first = service.encrypt_refresh("same-token").expect("encrypt");
        let second = service.encrypt_refresh("same-token").expect("encrypt");
        assert_ne!(first, second);
    }

    #[test]
    fn tampered_ciphertext_is_rejected() {
        let service = service();
        let envelope = service.encrypt_refresh("a-refresh-token").expect("encrypt");

        // Flip a character inside the ciphertext segment.
        let mut parts: Vec<String> = envelope.splitn(4, ':').map(str::to_string).collect();
        let cipher = parts.last_mut().expect("cipher part");
        let flipped = if cipher.ends_with('A') { "B" } else { "A" };
        cipher.replace_range(cipher.len() - 1.., flipped);
        let tampered = parts.join(":");

        assert!(service.decrypt_refresh(&tampered).is_err());
    }

    #[test]
    fn malformed_envelopes_fail_closed() {
        let service = service();
        assert!(service.decrypt_refresh("").is_err());
        assert!(service.decrypt_refresh("plaintext-token").is_err());
        assert!(service.decrypt_refresh("enc:v1:only-one-part").is_err());
        assert!(service.decrypt_refresh("enc:v1:!!!:???").is_err());
    }
}
