use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, warn};
use uuid::Uuid;

use super::{
    dto::{AuthResponse, LoginRequest, PublicUser, RegisterRequest, UpdateProfileRequest},
    password::{hash_password, verify_password, MIN_PASSWORD_LEN},
    repo_types::{DuplicateUser, NewUser, ProfilePatch, User},
};
use crate::{
    error::{AppError, FieldError},
    state::AppState,
};

const MAX_USERNAME_LEN: usize = 50;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn check_username(username: &str, errors: &mut Vec<FieldError>) {
    if username.is_empty() {
        errors.push(FieldError::new("username", "Username is required"));
    } else if username.chars().count() > MAX_USERNAME_LEN {
        errors.push(FieldError::new("username", "Username is too long"));
    } else if username.chars().any(char::is_whitespace) {
        errors.push(FieldError::new("username", "Username must not contain spaces"));
    }
}

fn duplicate_to_validation(err: anyhow::Error) -> AppError {
    match err.downcast_ref::<DuplicateUser>() {
        Some(dup) => AppError::field(dup.field, &dup.to_string()),
        None => AppError::Internal(err),
    }
}

fn issue(st: &AppState, user: User) -> Result<AuthResponse, AppError> {
    let access_token = st.jwt.sign_access(user.id)?;
    Ok(AuthResponse::bearer(access_token, user.into()))
}

pub async fn register(st: &AppState, req: RegisterRequest) -> Result<AuthResponse, AppError> {
    let email = normalize_email(&req.email);
    let username = req.username.trim().to_string();
    let full_name = req
        .full_name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty());

    let mut errors = Vec::new();
    if !is_valid_email(&email) {
        errors.push(FieldError::new("email", "Invalid email"));
    }
    check_username(&username, &mut errors);
    if req.password.len() < MIN_PASSWORD_LEN {
        errors.push(FieldError::new("password", "Password too short"));
    }
    if !errors.is_empty() {
        warn!(?errors, "registration rejected");
        return Err(AppError::Validation(errors));
    }

    if st.users.find_by_email(&email).await?.is_some() {
        warn!(email = %email, "email already registered");
        return Err(AppError::field("email", "Email already registered"));
    }
    if st.users.find_by_username(&username).await?.is_some() {
        warn!(username = %username, "username already taken");
        return Err(AppError::field("username", "Username already taken"));
    }

    let password_hash = hash_password(&req.password)?;
    let user = st
        .users
        .create(NewUser {
            email,
            username,
            password_hash,
            full_name,
        })
        .await
        .map_err(duplicate_to_validation)?;

    info!(user_id = %user.id, email = %user.email, "user registered");
    issue(st, user)
}

pub async fn login(st: &AppState, req: LoginRequest) -> Result<AuthResponse, AppError> {
    let email = normalize_email(&req.email);

    let Some(user) = st.users.find_by_email(&email).await? else {
        warn!(email = %email, "login unknown email");
        return Err(AppError::unauthorized("Invalid credentials"));
    };

    if !verify_password(&req.password, &user.password_hash)? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(AppError::unauthorized("Invalid credentials"));
    }
    if !user.is_active {
        warn!(user_id = %user.id, "login inactive user");
        return Err(AppError::unauthorized("Invalid credentials"));
    }

    info!(user_id = %user.id, email = %user.email, "user logged in");
    issue(st, user)
}

/// Load the active user behind an already verified token.
pub async fn current_user(st: &AppState, user_id: Uuid) -> Result<User, AppError> {
    match st.users.find_by_id(user_id).await? {
        Some(user) if user.is_active => Ok(user),
        Some(_) => Err(AppError::unauthorized("Inactive user")),
        None => Err(AppError::unauthorized("User not found")),
    }
}

pub async fn update_profile(
    st: &AppState,
    user_id: Uuid,
    req: UpdateProfileRequest,
) -> Result<PublicUser, AppError> {
    let user = current_user(st, user_id).await?;

    let mut errors = Vec::new();
    let email = req.email.map(|e| normalize_email(&e));
    if let Some(email) = &email {
        if !is_valid_email(email) {
            errors.push(FieldError::new("email", "Invalid email"));
        }
    }
    let username = req.username.map(|u| u.trim().to_string());
    if let Some(username) = &username {
        check_username(username, &mut errors);
    }
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    // Changing to your own current value is a no-op, not a conflict.
    let email = email.filter(|e| *e != user.email);
    let username = username.filter(|u| *u != user.username);

    if let Some(email) = &email {
        if st.users.find_by_email(email).await?.is_some() {
            return Err(AppError::field("email", "Email already registered"));
        }
    }
    if let Some(username) = &username {
        if st.users.find_by_username(username).await?.is_some() {
            return Err(AppError::field("username", "Username already taken"));
        }
    }

    let patch = ProfilePatch {
        email,
        username,
        full_name: req
            .full_name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty()),
    };
    let updated = st
        .users
        .update_profile(user_id, patch)
        .await
        .map_err(duplicate_to_validation)?
        .ok_or_else(|| AppError::unauthorized("User not found"))?;

    info!(user_id = %updated.id, "profile updated");
    Ok(updated.into())
}
