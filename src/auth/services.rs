use tower_sessions::Session;
use tracing::{debug, info, warn};

use crate::{
    auth::{
        dto::{LoginRequest, RegisterRequest, SessionUser},
        password::{hash_password, verify_password},
        repo::UserStore,
        repo_types::{Role, User},
    },
    error::AppError,
};

/// Session key holding the [`SessionUser`].
pub const SESSION_USER_KEY: &str = "user";

/// Creates a customer account. The role is never taken from the request.
pub async fn register(users: &dyn UserStore, req: RegisterRequest) -> Result<User, AppError> {
    let username = req.username.trim();
    if username.is_empty() || req.password.is_empty() {
        return Err(AppError::validation("Username and password are required"));
    }
    if req.password != req.repeat_password {
        return Err(AppError::validation("Passwords do not match"));
    }

    if users.find_by_username(username).await?.is_some() {
        warn!(%username, "username already registered");
        return Err(AppError::validation("Username already exists"));
    }

    let hash = hash_password(&req.password).await?;
    let user = users
        .create(username, &hash, Role::Customer)
        .await?
        // Lost a race against a concurrent registration.
        .ok_or_else(|| AppError::validation("Username already exists"))?;

    info!(user_id = %user.id, username = %user.username, "user registered");
    Ok(user)
}

/// Checks credentials without revealing which of the two was wrong.
pub async fn authenticate(users: &dyn UserStore, req: &LoginRequest) -> Result<User, AppError> {
    let username = req.username.trim();
    let Some(user) = users.find_by_username(username).await? else {
        warn!(%username, "login unknown username");
        return Err(AppError::InvalidCredentials);
    };

    if !verify_password(&req.password, &user.password_hash).await? {
        warn!(%username, user_id = %user.id, "login invalid password");
        return Err(AppError::InvalidCredentials);
    }

    info!(user_id = %user.id, %username, "user logged in");
    Ok(user)
}

/// Binds the identity to a fresh session id.
pub async fn start_session(session: &Session, user: &User) -> anyhow::Result<SessionUser> {
    let identity = SessionUser::from(user);
    session.cycle_id().await?;
    session.insert(SESSION_USER_KEY, &identity).await?;
    debug!(user_id = %identity.id, "session established");
    Ok(identity)
}

pub async fn session_user(session: &Session) -> anyhow::Result<Option<SessionUser>> {
    Ok(session.get::<SessionUser>(SESSION_USER_KEY).await?)
}
