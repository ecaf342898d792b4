//! Password-reset token lifecycle.
//!
//! Per user the token moves through `NoToken → TokenIssued →
//! (Consumed | Expired) → NoToken`. A token is valid for exactly one
//! successful password change or until its expiry elapses, whichever
//! comes first; both outcomes clear the token fields. Delivery of the
//! returned token (email, etc.) is the caller's problem.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Duration, Utc};
use ring::rand::{SecureRandom, SystemRandom};
use tracing::{info, instrument};

use crate::error::{StoreError, StoreResult};
use crate::users::{UserStore, hash_password};

/// How long an issued token stays valid.
pub const TOKEN_TTL_MINUTES: i64 = 15;

/// Token entropy in bytes, base64url-encoded for transport.
const TOKEN_LEN: usize = 32;

/// Generate an unguessable single-use token.
fn generate_token() -> StoreResult<String> {
    let rng = SystemRandom::new();
    let mut bytes = [0u8; TOKEN_LEN];
    rng.fill(&mut bytes)
        .map_err(|_| StoreError::Validation("failed to generate reset token".into()))?;
    Ok(URL_SAFE_NO_PAD.encode(bytes))
}

/// Issues, validates, and expires password-reset tokens.
#[derive(Clone)]
pub struct RecoveryService {
    users: UserStore,
}

impl RecoveryService {
    pub fn new(users: UserStore) -> Self {
        Self { users }
    }

    /// Issue a reset token for the account behind `email`.
    ///
    /// Fails with [`StoreError::NotFound`] when no account matches.
    /// Issuing again replaces any previously live token.
    pub async fn request_reset(&self, email: &str) -> StoreResult<String> {
        self.request_reset_at(email, Utc::now()).await
    }

    /// [`Self::request_reset`] with an explicit clock, for tests.
    #[instrument(skip(self, now))]
    pub async fn request_reset_at(
        &self,
        email: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<String> {
        let Some(mut user) = self.users.get_by_email(email).await? else {
            return Err(StoreError::NotFound {
                entity: "users",
                id: email.to_string(),
            });
        };

        let token = generate_token()?;
        user.reset_token = Some(token.clone());
        user.reset_token_expiry = Some((now + Duration::minutes(TOKEN_TTL_MINUTES)).timestamp());
        let user = self.users.update(user).await?;

        info!(user_id = %user.id, "reset token issued");
        Ok(token)
    }

    /// Consume a token and set a new password.
    ///
    /// Fails with [`StoreError::InvalidToken`] when no user carries the
    /// token, or [`StoreError::TokenExpired`] when its window has closed
    /// (clearing the dead token either way).
    pub async fn reset_password(&self, token: &str, new_password: &str) -> StoreResult<()> {
        self.reset_password_at(token, new_password, Utc::now()).await
    }

    /// [`Self::reset_password`] with an explicit clock, for tests.
    #[instrument(skip(self, token, new_password, now))]
    pub async fn reset_password_at(
        &self,
        token: &str,
        new_password: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<()> {
        if new_password.is_empty() {
            return Err(StoreError::Validation("password must not be empty".into()));
        }

        let mut user = self
            .users
            .get_all()
            .await?
            .into_iter()
            .find(|u| u.reset_token.as_deref() == Some(token))
            .ok_or(StoreError::InvalidToken)?;

        let live = user
            .reset_token_expiry
            .is_some_and(|expiry| now.timestamp() <= expiry);

        user.reset_token = None;
        user.reset_token_expiry = None;

        if !live {
            self.users.update(user).await?;
            return Err(StoreError::TokenExpired);
        }

        user.password_hash = hash_password(new_password)?;
        let user = self.users.update(user).await?;
        info!(user_id = %user.id, "password reset completed");
        Ok(())
    }
}

// ── tests ────────────────────────────────────────────────────────────
