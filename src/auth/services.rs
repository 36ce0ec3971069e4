use std::sync::Arc;

use lazy_static::lazy_static;
use time::OffsetDateTime;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::auth::{
    dto::Credentials,
    errors::{AuthError, PasswordError},
    jwt::{IssuedToken, JwtKeys},
    password::{hash_password, verify_password},
    repo::UserStore,
    repo_types::User,
};

lazy_static! {
    // Verified against when the username is unknown, so both failure paths do the same work.
    static ref DUMMY_DIGEST: Option<String> = hash_password("placeholder-credential").ok();
}

/// Register/login orchestration over an injected store and the token keys.
#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn UserStore>,
    keys: JwtKeys,
}

impl AuthService {
    pub fn new(store: Arc<dyn UserStore>, keys: JwtKeys) -> Self {
        // hash at start-up so the first unknown-user login costs one verify, not hash + verify
        lazy_static::initialize(&DUMMY_DIGEST);
        Self { store, keys }
    }

    pub fn keys(&self) -> &JwtKeys {
        &self.keys
    }

    #[instrument(skip(self, creds), fields(username = %creds.username))]
    pub async fn register(&self, creds: Credentials) -> Result<User, AuthError> {
        validate(&creds)?;

        if self.store.exists(&creds.username).await? {
            warn!("username already registered");
            return Err(AuthError::Conflict);
        }

        let Credentials { username, password } = creds;
        let password_hash = run_blocking(move || hash_password(&password)).await?;

        let user = User {
            id: Uuid::new_v4(),
            username,
            password_hash,
            created_at: OffsetDateTime::now_utc(),
        };
        // a concurrent registration can still win the race; the store reports it as Duplicate
        self.store.create(&user).await?;

        info!(user_id = %user.id, "user registered");
        Ok(user)
    }

    #[instrument(skip(self, creds), fields(username = %creds.username))]
    pub async fn login(&self, creds: Credentials) -> Result<IssuedToken, AuthError> {
        validate(&creds)?;

        let user = self.store.find_by_username(&creds.username).await?;

        let password = creds.password;
        let stored = user.as_ref().map(|u| u.password_hash.clone());
        let verified = run_blocking(move || match stored.or_else(|| DUMMY_DIGEST.clone()) {
            Some(digest) => verify_password(&password, &digest),
            None => Ok(false),
        })
        .await;
        let matched = match verified {
            Ok(ok) => ok,
            Err(PasswordError::CorruptDigest(e)) => {
                error!(error = %e, "stored password digest is corrupt");
                false
            }
            Err(e) => return Err(e.into()),
        };

        let user = match user {
            Some(u) if matched => u,
            Some(u) => {
                warn!(user_id = %u.id, "login invalid password");
                return Err(AuthError::InvalidCredentials);
            }
            None => {
                warn!("login unknown username");
                return Err(AuthError::InvalidCredentials);
            }
        };

        let issued = self.keys.issue(&user.username)?;
        info!(user_id = %user.id, "user logged in");
        Ok(issued)
    }
}

fn validate(creds: &Credentials) -> Result<(), AuthError> {
    if creds.username.trim().is_empty() || creds.password.is_empty() {
        warn!("missing username or password");
        return Err(AuthError::Validation("missing username or password"));
    }
    Ok(())
}

/// Argon2 is CPU-bound; keep it off the async workers.
async fn run_blocking<T, F>(f: F) -> Result<T, PasswordError>
where
    F: FnOnce() -> Result<T, PasswordError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| PasswordError::Hashing(e.to_string()))?
}
