use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, warn};

use super::dto::{AuthResponse, RegisterRequest};
use super::jwt::JwtKeys;
use super::password::{hash_password, is_strong_enough, verify_password};
use crate::accounts::{Account, AccountStore, NewAccount};
use crate::config::SeedAdminConfig;
use crate::error::ApiError;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Validates the request and creates a member account with the starting credits.
pub async fn register_member<S: AccountStore + ?Sized>(
    store: &S,
    req: RegisterRequest,
) -> Result<Account, ApiError> {
    let email = normalize_email(&req.email);
    let name = req.name.trim().to_string();
    let phone = req.phone.trim().to_string();
    let member_number = req.member_number.trim().to_string();

    if name.is_empty()
        || email.is_empty()
        || phone.is_empty()
        || member_number.is_empty()
        || req.password.is_empty()
    {
        return Err(ApiError::BadRequest("All fields are required".into()));
    }
    if !is_valid_email(&email) {
        warn!(%email, "invalid email");
        return Err(ApiError::BadRequest("Invalid email".into()));
    }
    if !is_strong_enough(&req.password) {
        return Err(ApiError::BadRequest("Password too short".into()));
    }

    let taken = || {
        ApiError::Conflict("User with provided email or roll number already exists".into())
    };
    if store
        .find_by_email_or_member_number(&email, &member_number)
        .await
        .map_err(ApiError::store)?
        .is_some()
    {
        warn!(%email, %member_number, "registration conflict");
        return Err(taken());
    }

    let password_hash = hash_password(&req.password)?;
    let account = store
        .insert(NewAccount::member(name, email, phone, member_number, password_hash))
        .await
        .map_err(ApiError::store)?
        .ok_or_else(taken)?;

    info!(user_id = %account.id, email = %account.email, "user registered");
    Ok(account)
}

/// Returns the account when `password` matches; the same error covers unknown email and bad password.
pub async fn authenticate<S: AccountStore + ?Sized>(
    store: &S,
    email: &str,
    password: &str,
) -> Result<Account, ApiError> {
    let email = normalize_email(email);
    if email.is_empty() || password.is_empty() {
        return Err(ApiError::BadRequest("Email and password are required".into()));
    }

    let invalid = || ApiError::Unauthorized("Invalid email or password".into());
    let Some(account) = store.find_by_email(&email).await.map_err(ApiError::store)? else {
        warn!(%email, "login unknown email");
        return Err(invalid());
    };
    if !verify_password(password, &account.password_hash)? {
        warn!(%email, user_id = %account.id, "login invalid password");
        return Err(invalid());
    }
    Ok(account)
}

pub fn issue_tokens(keys: &JwtKeys, account: Account) -> Result<AuthResponse, ApiError> {
    Ok(AuthResponse {
        access_token: keys.sign_access(account.id, account.role)?,
        refresh_token: keys.sign_refresh(account.id, account.role)?,
        user: account,
    })
}

/// Makes sure at least one administrator exists.
///
/// An existing account with the seed email is promoted; otherwise a fresh admin is created.
pub async fn seed_admin<S: AccountStore + ?Sized>(
    store: &S,
    cfg: &SeedAdminConfig,
) -> anyhow::Result<()> {
    if let Some(admin) = store.find_any_admin().await? {
        info!(email = %admin.email, "admin user already exists");
        return Ok(());
    }

    let email = normalize_email(&cfg.email);
    if let Some(mut account) = store.find_by_email(&email).await? {
        account.role = crate::accounts::Role::Admin;
        store.save(&account).await?;
        info!(%email, "promoted existing account to admin");
        return Ok(());
    }

    let hash = hash_password(&cfg.password)?;
    let admin = NewAccount::admin(
        cfg.name.clone(),
        email,
        cfg.phone.clone(),
        cfg.member_number.clone(),
        hash,
    );
    match store.insert(admin).await? {
        Some(admin) => info!(email = %admin.email, "admin user created"),
        None => warn!("admin seed skipped: member number already taken"),
    }
    Ok(())
}
