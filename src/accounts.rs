//! Account registration, login and session verification.

use crate::auth::{hash_password, verify_password, TokenError, TokenManager};
use crate::error::{ApiError, ApiResult};
use crate::models::{User, UserProfile};
use crate::storage::{normalize_email, Storage};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Deserialize)]
pub struct Signup {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub interests: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub expires_in: i64,
    pub user: UserProfile,
}

#[derive(Clone)]
pub struct AuthService {
    storage: Storage,
    tokens: TokenManager,
    bcrypt_cost: u32,
    // Verified against when the email is unknown, so both login failures cost a bcrypt round.
    dummy_hash: Arc<OnceCell<String>>,
}

impl AuthService {
    pub fn new(storage: Storage, tokens: TokenManager, bcrypt_cost: u32) -> Self {
        Self {
            storage,
            tokens,
            bcrypt_cost,
            dummy_hash: Arc::new(OnceCell::new()),
        }
    }

    async fn hash(&self, password: String) -> ApiResult<String> {
        let cost = self.bcrypt_cost;
        tokio::task::spawn_blocking(move || hash_password(&password, cost))
            .await
            .map_err(|e| ApiError::Internal(e.to_string()))?
            .map_err(|e| ApiError::Internal(e.to_string()))
    }

    /// `Ok(false)` on mismatch; a hash bcrypt cannot read is an internal error.
    async fn check_password(&self, password: &str, hash: String) -> ApiResult<bool> {
        let password = password.to_string();
        tokio::task::spawn_blocking(move || verify_password(&password, &hash))
            .await
            .map_err(|e| ApiError::Internal(e.to_string()))?
            .map_err(|e| ApiError::Internal(format!("stored password hash is unusable: {e}")))
    }

    /// Create an account. Does not log the user in.
    pub async fn register(&self, signup: Signup) -> ApiResult<()> {
        let name = signup.name.trim().to_string();
        let email = normalize_email(&signup.email);
        if name.is_empty() {
            return Err(ApiError::Validation("name is required".into()));
        }
        if email.is_empty() || !email.contains('@') {
            return Err(ApiError::Validation("a valid email is required".into()));
        }
        if signup.password.trim().is_empty() {
            return Err(ApiError::Validation("password is required".into()));
        }
        let interests = signup
            .interests
            .iter()
            .map(|i| i.trim())
            .filter(|i| !i.is_empty())
            .map(str::to_string)
            .collect();

        // Cheap pre-check; the insert below is the authoritative one.
        if self.storage.get_user_by_email(&email)?.is_some() {
            return Err(ApiError::Conflict("user already exists".into()));
        }

        let password_hash = self.hash(signup.password).await?;

        let user = User {
            id: Uuid::new_v4(),
            name,
            email,
            password_hash,
            interests,
            created_at: Utc::now(),
        };
        self.storage.create_user(&user)?;
        info!(user_id = %user.id, "user registered");
        Ok(())
    }

    pub async fn login(&self, email: &str, password: &str) -> ApiResult<LoginResponse> {
        let Some(user) = self.storage.get_user_by_email(email)? else {
            let dummy = self
                .dummy_hash
                .get_or_try_init(|| self.hash("newsdesk-unknown-account".to_string()))
                .await?
                .clone();
            self.check_password(password, dummy).await?;
            warn!("login for unknown email");
            return Err(ApiError::Unauthorized);
        };

        if !self.check_password(password, user.password_hash.clone()).await? {
            warn!(user_id = %user.id, "login with wrong password");
            return Err(ApiError::Unauthorized);
        }

        let token = self
            .tokens
            .issue(user.id)
            .map_err(|e| ApiError::Internal(e.to_string()))?;
        info!(user_id = %user.id, "user logged in");
        Ok(LoginResponse {
            token,
            expires_in: self.tokens.ttl_secs(),
            user: user.into(),
        })
    }

    /// Resolve a bearer token to the user id it was issued for.
    pub fn authenticate(&self, token: &str) -> ApiResult<Uuid> {
        self.tokens.verify(token).map_err(|e| {
            match e {
                TokenError::Expired => debug!("expired session token"),
                other => debug!(error = %other, "rejected session token"),
            }
            ApiError::Unauthorized
        })
    }

    pub fn profile(&self, user_id: Uuid) -> ApiResult<UserProfile> {
        self.storage
            .get_user(user_id)?
            .map(UserProfile::from)
            .ok_or_else(|| ApiError::NotFound("user not found".into()))
    }
}
