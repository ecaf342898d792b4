//! User accounts and credentials.
//!
//! Provides the typed repository over the `users` collection, with
//! password hashing via PBKDF2-HMAC-SHA256 (ring). Passwords are stored
//! as `base64(salt):base64(hash)` strings, using 600,000 iterations per
//! OWASP 2023 recommendations.
//!
//! Login bookkeeping lives here too: a login on the day after the
//! previous one extends the streak, a login on any other day resets it
//! to 1, and a second login on the same calendar day leaves it alone.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, Utc};
use ring::pbkdf2;
use ring::rand::{SecureRandom, SystemRandom};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::engine::{ObjectStore, USERS};
use crate::error::{StoreError, StoreResult};

// ═══════════════════════════════════════════════════════════════════════
//  Types
// ═══════════════════════════════════════════════════════════════════════

/// Maximum number of retained login-history entries per user.
pub const LOGIN_HISTORY_CAP: usize = 100;

/// A user account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier (UUID v7).
    pub id: String,
    /// Display name.
    pub name: String,
    /// Unique login email.
    pub email: String,
    /// `base64(salt):base64(hash)` PBKDF2 credential.
    pub password_hash: String,
    /// Opaque avatar image reference.
    pub avatar_url: String,
    /// Role set; every account holds at least [`UserRole::User`].
    pub roles: Vec<UserRole>,
    /// Opaque virtual try-on image reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub try_on_image_url: Option<String>,
    /// Opaque style-DNA report, persisted verbatim for the AI layer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style_dna: Option<serde_json::Value>,
    /// Unix timestamp of the most recent login.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_login: Option<i64>,
    /// Unix timestamps of past logins, most recent last, capped.
    #[serde(default)]
    pub login_history: Vec<i64>,
    /// Consecutive-day login counter.
    #[serde(default)]
    pub login_streak: u32,
    /// Granted achievement ids. Monotonic — never removed.
    #[serde(default)]
    pub achievements: Vec<String>,
    /// Outfits this user has collected, duplicate-free.
    #[serde(default)]
    pub collected_outfit_ids: Vec<String>,
    /// Live password-reset token, if one has been issued.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reset_token: Option<String>,
    /// Unix timestamp after which the reset token is dead.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reset_token_expiry: Option<i64>,
    /// Unix timestamp when the account was created.
    pub created_at: i64,
    /// Unix timestamp when the record was last updated.
    pub updated_at: i64,
}

impl User {
    /// Whether the account holds the admin role.
    pub fn is_admin(&self) -> bool {
        self.roles.contains(&UserRole::Admin)
    }
}

/// Role-based access levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    /// Standard account.
    User,
    /// Administrative account.
    Admin,
}

// ═══════════════════════════════════════════════════════════════════════
//  Password hashing
// ═══════════════════════════════════════════════════════════════════════

/// PBKDF2-HMAC-SHA256 with 600,000 iterations (OWASP 2023).
const PBKDF2_ITERATIONS: u32 = 600_000;

/// Salt length in bytes.
const SALT_LEN: usize = 32;

/// Derived key length in bytes.
const KEY_LEN: usize = 32;

/// PBKDF2 algorithm.
static PBKDF2_ALG: pbkdf2::Algorithm = pbkdf2::PBKDF2_HMAC_SHA256;

/// Hash a password and return a storable string of the form `base64(salt):base64(hash)`.
pub(crate) fn hash_password(password: &str) -> StoreResult<String> {
    let rng = SystemRandom::new();

    let mut salt = [0u8; SALT_LEN];
    rng.fill(&mut salt)
        .map_err(|_| StoreError::Validation("failed to generate random salt".into()))?;

    let mut hash = [0u8; KEY_LEN];
    let iterations =
        std::num::NonZeroU32::new(PBKDF2_ITERATIONS).expect("PBKDF2_ITERATIONS is non-zero");
    pbkdf2::derive(PBKDF2_ALG, iterations, &salt, password.as_bytes(), &mut hash);

    Ok(format!("{}:{}", BASE64.encode(salt), BASE64.encode(hash)))
}

/// Verify a password against a stored hash string (`base64(salt):base64(hash)`).
pub(crate) fn verify_password(password: &str, stored: &str) -> StoreResult<bool> {
    let parts: Vec<&str> = stored.splitn(2, ':').collect();
    if parts.len() != 2 {
        return Err(StoreError::Validation("malformed password hash".into()));
    }

    let salt = BASE64
        .decode(parts[0])
        .map_err(|e| StoreError::Validation(format!("invalid salt encoding: {e}")))?;
    let expected_hash = BASE64
        .decode(parts[1])
        .map_err(|e| StoreError::Validation(format!("invalid hash encoding: {e}")))?;

    let iterations =
        std::num::NonZeroU32::new(PBKDF2_ITERATIONS).expect("PBKDF2_ITERATIONS is non-zero");

    Ok(pbkdf2::verify(
        PBKDF2_ALG,
        iterations,
        &salt,
        password.as_bytes(),
        &expected_hash,
    )
    .is_ok())
}

/// Deterministic initials-avatar reference for a new account.
fn default_avatar_url(name: &str) -> String {
    format!("https://api.dicebear.com/8.x/initials/svg?seed={name}")
}

// ═══════════════════════════════════════════════════════════════════════
//  UserStore
// ═══════════════════════════════════════════════════════════════════════

/// CRUD operations on user accounts with credential management.
#[derive(Clone)]
pub struct UserStore {
    store: ObjectStore,
}

impl UserStore {
    /// Create a new user store over `store`.
    pub fn new(store: ObjectStore) -> Self {
        Self { store }
    }

    /// Create a new account with the standard role.
    ///
    /// Fails with [`StoreError::Conflict`] when the email is taken.
    #[instrument(skip(self, password))]
    pub async fn sign_up(&self, name: &str, email: &str, password: &str) -> StoreResult<User> {
        if name.is_empty() {
            return Err(StoreError::Validation("name must not be empty".into()));
        }
        if email.is_empty() {
            return Err(StoreError::Validation("email must not be empty".into()));
        }
        if password.is_empty() {
            return Err(StoreError::Validation("password must not be empty".into()));
        }

        let now = Utc::now().timestamp();
        let user = User {
            id: Uuid::now_v7().to_string(),
            name: name.to_string(),
            email: email.to_string(),
            password_hash: hash_password(password)?,
            avatar_url: default_avatar_url(name),
            roles: vec![UserRole::User],
            try_on_image_url: None,
            style_dna: None,
            last_login: None,
            login_history: Vec::new(),
            login_streak: 0,
            achievements: Vec::new(),
            collected_outfit_ids: Vec::new(),
            reset_token: None,
            reset_token_expiry: None,
            created_at: now,
            updated_at: now,
        };

        self.store.add(&USERS, &user.id, &user).await?;
        debug!(user_id = %user.id, "user created");
        Ok(user)
    }

    /// Fetch a single user by id, returning `None` if not found.
    pub async fn get(&self, id: &str) -> StoreResult<Option<User>> {
        self.store.get(&USERS, id).await
    }

    /// Fetch a single user by id, failing with [`StoreError::NotFound`].
    pub async fn get_required(&self, id: &str) -> StoreResult<User> {
        self.get(id).await?.ok_or_else(|| StoreError::NotFound {
            entity: "users",
            id: id.to_string(),
        })
    }

    /// Fetch a single user by email via the unique index.
    pub async fn get_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let mut matches: Vec<User> = self
            .store
            .get_all_by_index(&USERS, "email", email)
            .await?;
        Ok(matches.pop())
    }

    /// Every account, in sign-up order.
    pub async fn get_all(&self) -> StoreResult<Vec<User>> {
        self.store.get_all(&USERS).await
    }

    /// Persist a modified user record, bumping `updated_at`.
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn update(&self, mut user: User) -> StoreResult<User> {
        user.updated_at = Utc::now().timestamp();
        self.store.put(&USERS, &user.id, &user).await?;
        Ok(user)
    }

    /// Verify credentials, returning `Some(User)` on a match.
    #[instrument(skip(self, password))]
    pub async fn authenticate(&self, email: &str, password: &str) -> StoreResult<Option<User>> {
        let Some(user) = self.get_by_email(email).await? else {
            return Ok(None);
        };
        if verify_password(password, &user.password_hash)? {
            Ok(Some(user))
        } else {
            Ok(None)
        }
    }

    /// Record a successful login: streak bookkeeping plus a capped
    /// history entry. Returns the updated user.
    pub async fn record_login(&self, user_id: &str) -> StoreResult<User> {
        self.record_login_at(user_id, Utc::now()).await
    }

    /// [`Self::record_login`] with an explicit clock, for tests.
    pub async fn record_login_at(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<User> {
        let mut user = self.get_required(user_id).await?;

        let today = now.date_naive();
        let last_day = user
            .last_login
            .and_then(|ts| DateTime::from_timestamp(ts, 0))
            .map(|dt| dt.date_naive());

        user.login_streak = match last_day {
            Some(day) if day == today => user.login_streak,
            Some(day) if today.pred_opt() == Some(day) => user.login_streak + 1,
            _ => 1,
        };

        user.last_login = Some(now.timestamp());
        user.login_history.push(now.timestamp());
        if user.login_history.len() > LOGIN_HISTORY_CAP {
            let excess = user.login_history.len() - LOGIN_HISTORY_CAP;
            user.login_history.drain(..excess);
        }

        self.update(user).await
    }

    /// Replace a user's credential with a fresh hash of `new_password`.
    #[instrument(skip(self, new_password))]
    pub async fn change_password(&self, user_id: &str, new_password: &str) -> StoreResult<User> {
        if new_password.is_empty() {
            return Err(StoreError::Validation("password must not be empty".into()));
        }
        let mut user = self.get_required(user_id).await?;
        user.password_hash = hash_password(new_password)?;
        self.update(user).await
    }

    /// Number of accounts.
    pub async fn count(&self) -> StoreResult<i64> {
        self.store.count(&USERS).await
    }

    /// Seed the administrative account when the collection is empty.
    ///
    /// Returns `true` when the admin was created by this call.
    pub async fn seed_admin_if_empty(&self) -> StoreResult<bool> {
        if self.count().await? > 0 {
            return Ok(false);
        }

        let now = Utc::now().timestamp();
        let admin = User {
            id: Uuid::now_v7().to_string(),
            name: "Admin".to_string(),
            email: "admin@chroma.ai".to_string(),
            password_hash: hash_password("password123")?,
            avatar_url: default_avatar_url("Admin"),
            roles: vec![UserRole::User, UserRole::Admin],
            try_on_image_url: None,
            style_dna: None,
            last_login: None,
            login_history: Vec::new(),
            login_streak: 0,
            achievements: Vec::new(),
            collected_outfit_ids: Vec::new(),
            reset_token: None,
            reset_token_expiry: None,
            created_at: now,
            updated_at: now,
        };
        self.store.add(&USERS, &admin.id, &admin).await?;
        info!(user_id = %admin.id, "seeded administrative account");
        Ok(true)
    }
}

// ── tests ────────────────────────────────────────────────────────────
