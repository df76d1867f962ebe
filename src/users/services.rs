use std::sync::Arc;

use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, warn};

use crate::{
    auth::{
        password::{hash_password, hash_password_blocking, verify_password_blocking},
        AuthUser,
    },
    error::{AppError, AppResult},
    users::{
        dto::{ProfileUpdate, RegisterRequest},
        repo::UserStore,
        repo_types::{NewUser, User},
    },
};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Trims an optional field; blank means "unset".
fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Registration, login and self-service profile operations.
///
/// Profile and password mutations take the caller's [`AuthUser`], never an
/// identity from the request body.
#[derive(Clone)]
pub struct AccountService {
    store: Arc<dyn UserStore>,
    // verified against on unknown emails so both login failures cost one argon2 run
    decoy_hash: Arc<str>,
}

impl AccountService {
    pub fn new(store: Arc<dyn UserStore>) -> anyhow::Result<Self> {
        let decoy_hash = hash_password("decoy-password-never-stored")?;
        Ok(Self {
            store,
            decoy_hash: decoy_hash.into(),
        })
    }

    pub async fn register(&self, req: RegisterRequest) -> AppResult<User> {
        let email = normalize_email(&req.email);
        if !is_valid_email(&email) {
            warn!(email = %email, "invalid email");
            return Err(AppError::Validation("invalid email".into()));
        }
        if req.password.is_empty() {
            return Err(AppError::Validation("password is required".into()));
        }

        let password_hash = hash_password_blocking(&req.password).await?;
        let user = self
            .store
            .create(NewUser {
                email,
                password_hash,
                first_name: clean(req.first_name),
                last_name: clean(req.last_name),
                phone_number: clean(req.phone_number),
                address: clean(req.address),
                display_pic: clean(req.display_pic),
            })
            .await
            .inspect_err(|e| warn!(error = %e, "create user failed"))?;

        info!(user_id = user.id, email = %user.email, "user registered");
        Ok(user)
    }

    pub async fn login(&self, email: &str, password: &str) -> AppResult<User> {
        let email = normalize_email(email);
        let found = if is_valid_email(&email) {
            self.store.find_by_email(&email).await?
        } else {
            None
        };

        let Some(user) = found else {
            let _ = verify_password_blocking(password, &self.decoy_hash).await;
            warn!(email = %email, "login unknown email");
            return Err(AppError::InvalidCredentials);
        };

        if !verify_password_blocking(password, &user.password_hash).await? {
            warn!(user_id = user.id, "login invalid password");
            return Err(AppError::InvalidCredentials);
        }

        info!(user_id = user.id, "user logged in");
        Ok(user)
    }

    /// Merges the supplied profile fields into the caller's own record.
    pub async fn build_profile(&self, who: &AuthUser, update: ProfileUpdate) -> AppResult<User> {
        let mut user = self.account_of(who).await?;

        if let Some(v) = update.first_name {
            user.first_name = clean(Some(v));
        }
        if let Some(v) = update.last_name {
            user.last_name = clean(Some(v));
        }
        if let Some(v) = update.phone_number {
            user.phone_number = clean(Some(v));
        }
        if let Some(v) = update.address {
            user.address = clean(Some(v));
        }
        if let Some(v) = update.display_pic {
            user.display_pic = clean(Some(v));
        }

        if !user.has_full_name() {
            return Err(AppError::Validation(
                "first_name and last_name are required".into(),
            ));
        }

        let user = self.store.update(&user).await?;
        info!(user_id = user.id, "profile updated");
        Ok(user)
    }

    pub async fn get_profile(&self, who: &AuthUser) -> AppResult<User> {
        self.account_of(who).await
    }

    pub async fn change_password(&self, who: &AuthUser, new_password: &str) -> AppResult<()> {
        if new_password.is_empty() {
            return Err(AppError::Validation("password is required".into()));
        }

        let mut user = self.account_of(who).await?;
        user.password_hash = hash_password_blocking(new_password).await?;
        self.store.update(&user).await?;

        info!(user_id = user.id, "password changed");
        Ok(())
    }

    /// Loads the live account the token was issued for. A token whose id no
    /// longer matches the email's current owner is treated as stale.
    async fn account_of(&self, who: &AuthUser) -> AppResult<User> {
        match self.store.find_by_email(&who.email).await? {
            Some(user) if user.id == who.id => Ok(user),
            Some(user) => {
                warn!(token_user_id = who.id, user_id = user.id, "token issued for a previous owner of this email");
                Err(AppError::NotFound)
            }
            None => Err(AppError::NotFound),
        }
    }
}
