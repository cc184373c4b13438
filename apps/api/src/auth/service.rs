use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::password::{hash_password, verify_password};
use crate::auth::{AuthError, Session};
use crate::errors::AppError;
use crate::models::user::{Account, Role, User};
use crate::state::AppState;
use crate::store::{DocumentStore, StoreError};
use crate::validation::{require, validate_email, validate_password, validate_username};

#[derive(Debug, Serialize)]
pub struct LoginOutcome {
    pub token: String,
    pub user: User,
}

/// Everything needed to open a new login plus its profile.
#[derive(Debug, Clone, Deserialize)]
pub struct NewAccount {
    pub username: String,
    pub password: String,
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub department: String,
    pub employment_type: Option<String>,
    #[serde(default)]
    pub role: Role,
}

/// anonymous -> authenticating -> authenticated, or back to anonymous with a reason.
pub async fn login(state: &AppState, identifier: &str, secret: &str) -> Result<LoginOutcome, AuthError> {
    let identifier = identifier.trim();
    if identifier.is_empty() || secret.is_empty() {
        return Err(AuthError::MissingCredentials);
    }

    let max_failures = state.config.login_max_failures;
    let window = state.config.login_lockout_secs;
    if state.sessions.failures(identifier).await? >= max_failures {
        warn!("Login for '{identifier}' refused: rate limited");
        return Err(AuthError::RateLimited);
    }

    let Some(account) = state.store.get_account(identifier).await? else {
        state.sessions.record_failure(identifier, window).await?;
        return Err(AuthError::UnknownIdentifier);
    };

    if !verify_password(secret, &account.password_hash).await? {
        let attempts = state.sessions.record_failure(identifier, window).await?;
        warn!("Wrong password for '{identifier}' ({attempts}/{max_failures})");
        return Err(AuthError::WrongSecret);
    }
    state.sessions.clear_failures(identifier).await?;

    let user = match state.store.get_user(account.user_id).await? {
        Some(user) => user,
        None => synthesize_profile(state.store.as_ref(), &account).await?,
    };

    let token = state
        .sessions
        .create(user.id, state.config.session_ttl_secs)
        .await?;
    info!("User {} ({}) logged in", user.username, user.id);

    Ok(LoginOutcome { token, user })
}

/// A valid credential with no profile gets one, always as an employee.
async fn synthesize_profile(store: &dyn DocumentStore, account: &Account) -> Result<User, StoreError> {
    warn!(
        "No profile for account '{}', creating an employee profile",
        account.username
    );
    let user = User::new(
        account.user_id,
        &account.username,
        &account.name,
        Role::Employee,
        "",
    );
    store.put_user(&user).await?;
    Ok(user)
}

pub async fn logout(state: &AppState, session: &Session) -> Result<(), AuthError> {
    state.sessions.revoke(&session.token).await?;
    info!("User {} logged out", session.user.username);
    Ok(())
}

/// Validates and hashes a new login, and builds the profile that goes with it.
async fn prepare_account(new: NewAccount) -> Result<(Account, User), AppError> {
    validate_username(&new.username)?;
    require("name", &new.name)?;
    validate_password(&new.password)?;
    if !new.email.trim().is_empty() {
        validate_email(&new.email)?;
    }

    let username = new.username.trim().to_string();
    let name = new.name.trim().to_string();
    let user_id = Uuid::new_v4();
    let password_hash = hash_password(&new.password).await?;

    let mut user = User::new(user_id, &username, &name, new.role, &new.department);
    user.email = new.email.trim().to_string();
    user.employment_type = new.employment_type;
    user.created_at = Utc::now();

    let account = Account {
        username,
        name,
        user_id,
        password_hash,
    };
    Ok((account, user))
}

/// Writes the account first so a taken login name fails before any profile exists.
pub async fn create_account(store: &dyn DocumentStore, new: NewAccount) -> Result<User, AppError> {
    let (account, user) = prepare_account(new).await?;

    store.insert_account(&account).await.map_err(|e| match e {
        StoreError::Conflict(_) => AppError::Conflict(format!(
            "login name '{}' is already registered",
            account.username
        )),
        other => other.into(),
    })?;
    store.put_user(&user).await?;

    info!("Created {} account '{}' ({})", user.role, user.username, user.id);
    Ok(user)
}

/// First-run bootstrap: only allowed while no account exists. The emptiness
/// check and the insert are one atomic store operation.
pub async fn setup(state: &AppState, new: NewAccount) -> Result<User, AppError> {
    let (account, user) = prepare_account(new).await?;

    if !state.store.insert_first_account(&account).await? {
        return Err(AppError::Conflict(
            "setup has already been completed".to_string(),
        ));
    }
    state.store.put_user(&user).await?;

    info!("Setup created {} account '{}' ({})", user.role, user.username, user.id);
    Ok(user)
}

/// Re-verifies the current password before replacing it.
pub async fn change_password(
    state: &AppState,
    session: &Session,
    current: &str,
    new_password: &str,
) -> Result<(), AppError> {
    validate_password(new_password)?;
    let account = state
        .store
        .get_account_for_user(session.user_id())
        .await?
        .ok_or_else(|| AppError::NotFound("no login is linked to this profile".to_string()))?;

    if !verify_password(current, &account.password_hash).await? {
        return Err(AuthError::WrongSecret.into());
    }

    let hash = hash_password(new_password).await?;
    state.store.set_password_hash(session.user_id(), &hash).await?;
    info!("Password changed for user {}", session.user.username);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{new_account, seed_user, test_app, TEST_PASSWORD};

    #[tokio::test]
    async fn test_login_returns_that_users_profile() {
        let app = test_app();
        let wang = seed_user(&app.state, "wang", Role::Employee).await;
        seed_user(&app.state, "li", Role::Employee).await;

        let outcome = login(&app.state, "wang", TEST_PASSWORD).await.unwrap();
        assert_eq!(outcome.user, wang);

        let resolved = app.state.sessions.resolve(&outcome.token).await.unwrap();
        assert_eq!(resolved, Some(wang.id));
    }

    #[tokio::test]
    async fn test_login_rejects_unknown_and_wrong_secret() {
        let app = test_app();
        seed_user(&app.state, "wang", Role::Employee).await;

        assert!(matches!(
            login(&app.state, "nobody", TEST_PASSWORD).await,
            Err(AuthError::UnknownIdentifier)
        ));
        assert!(matches!(
            login(&app.state, "wang", "wrong-pass").await,
            Err(AuthError::WrongSecret)
        ));
        assert!(matches!(
            login(&app.state, "  ", "").await,
            Err(AuthError::MissingCredentials)
        ));
    }

    #[tokio::test]
    async fn test_repeated_failures_are_rate_limited() {
        let app = test_app();
        seed_user(&app.state, "wang", Role::Employee).await;
        for _ in 0..app.state.config.login_max_failures {
            let _ = login(&app.state, "wang", "wrong-pass").await;
        }
        // Even the right password is refused while locked out.
        assert!(matches!(
            login(&app.state, "wang", TEST_PASSWORD).await,
            Err(AuthError::RateLimited)
        ));
    }

    #[tokio::test]
    async fn test_missing_profile_is_synthesized_as_employee() {
        let app = test_app();
        let user_id = Uuid::new_v4();
        app.state
            .store
            .insert_account(&Account {
                username: "orphan".into(),
                name: "Orphan".into(),
                user_id,
                password_hash: hash_password(TEST_PASSWORD).await.unwrap(),
            })
            .await
            .unwrap();

        let outcome = login(&app.state, "orphan", TEST_PASSWORD).await.unwrap();
        assert_eq!(outcome.user.id, user_id);
        assert_eq!(outcome.user.role, Role::Employee);
        assert!(app.state.store.get_user(user_id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_logout_revokes_token() {
        let app = test_app();
        seed_user(&app.state, "wang", Role::Employee).await;
        let outcome = login(&app.state, "wang", TEST_PASSWORD).await.unwrap();
        let session = Session {
            token: outcome.token.clone(),
            user: outcome.user,
        };
        logout(&app.state, &session).await.unwrap();
        assert_eq!(app.state.sessions.resolve(&outcome.token).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_setup_only_runs_once() {
        let app = test_app();
        let admin = setup(&app.state, new_account("boss", Role::Admin)).await.unwrap();
        assert!(admin.is_admin());

        let again = setup(&app.state, new_account("boss2", Role::Admin)).await;
        assert!(matches!(again, Err(AppError::Conflict(_))));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_setup_creates_a_single_account() {
        let app = test_app();
        let first = {
            let state = app.state.clone();
            tokio::spawn(async move { setup(&state, new_account("admin1", Role::Admin)).await })
        };
        let second = {
            let state = app.state.clone();
            tokio::spawn(async move { setup(&state, new_account("admin2", Role::Admin)).await })
        };
        let results = [first.await.unwrap(), second.await.unwrap()];

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(results
            .iter()
            .any(|r| matches!(r, Err(AppError::Conflict(_)))));
        assert_eq!(app.state.store.count_accounts().await.unwrap(), 1);
        assert_eq!(app.state.store.list_admins().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_create_account_validates_before_writing() {
        let app = test_app();
        let mut weak = new_account("wang", Role::Employee);
        weak.password = "123".into();
        assert!(matches!(
            create_account(app.state.store.as_ref(), weak).await,
            Err(AppError::Validation(_))
        ));

        let mut bad_email = new_account("wang", Role::Employee);
        bad_email.email = "wang-at-example".into();
        assert!(matches!(
            create_account(app.state.store.as_ref(), bad_email).await,
            Err(AppError::Validation(_))
        ));
        assert_eq!(app.state.store.count_accounts().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_duplicate_login_name_is_a_conflict() {
        let app = test_app();
        seed_user(&app.state, "wang", Role::Employee).await;
        let result = create_account(
            app.state.store.as_ref(),
            new_account("wang", Role::Employee),
        )
        .await;
        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_change_password_requires_current_secret() {
        let app = test_app();
        let wang = seed_user(&app.state, "wang", Role::Employee).await;
        let session = Session {
            token: "t".into(),
            user: wang,
        };

        let wrong = change_password(&app.state, &session, "nope-nope", "brand-new").await;
        assert!(matches!(wrong, Err(AppError::Auth(AuthError::WrongSecret))));

        change_password(&app.state, &session, TEST_PASSWORD, "brand-new")
            .await
            .unwrap();
        assert!(login(&app.state, "wang", "brand-new").await.is_ok());
    }
}
