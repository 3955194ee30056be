use lazy_static::lazy_static;
use tracing::{error, info, warn};

use crate::{
    auth::{
        dto::{AuthResponse, LoginRequest, RegisterRequest},
        jwt::JwtKeys,
        password::{hash_password, verify_password},
        validators::{validate_email, validate_password, validate_username},
    },
    error::ApiError,
    users::{model::PublicUser, repo::UserRepository},
};

lazy_static! {
    // Verified against when the email is unknown so both login failures cost
    // one argon2 verification.
    static ref DUMMY_HASH: Option<String> = hash_password("dummy-Passw0rd").ok();
}

/// Build the dummy hash up front so the first unknown-email login is not
/// slower than the rest.
pub fn prime_dummy_hash() {
    lazy_static::initialize(&DUMMY_HASH);
}

/// Validate, create the user and hand back a token for it.
pub async fn register(
    users: &UserRepository,
    keys: &JwtKeys,
    req: RegisterRequest,
) -> Result<AuthResponse, ApiError> {
    let (Some(email), Some(username), Some(password)) = (req.email, req.username, req.password)
    else {
        warn!("register missing fields");
        return Err(ApiError::validation("Missing required fields"));
    };

    if !validate_email(&email) {
        warn!(email = %email, "invalid email");
        return Err(ApiError::validation("Invalid email format"));
    }

    let password_errors = validate_password(&password);
    if !password_errors.is_empty() {
        warn!(rules = password_errors.len(), "weak password");
        return Err(ApiError::validation_with("Invalid password", password_errors));
    }

    let username_errors = validate_username(&username);
    if !username_errors.is_empty() {
        warn!(username = %username, "invalid username");
        return Err(ApiError::validation_with("Invalid username", username_errors));
    }

    if users.get_by_email(&email).await?.is_some() {
        warn!(email = %email, "email already registered");
        return Err(ApiError::Conflict("Email already registered".into()));
    }
    if users.get_by_username(&username).await?.is_some() {
        warn!(username = %username, "username already taken");
        return Err(ApiError::Conflict("Username already taken".into()));
    }

    // the store re-checks uniqueness atomically; a lost race surfaces here as
    // the same conflict
    let user = users.create(&email, &username, &password).await?;
    let access_token = keys.sign(user.id)?;

    info!(user_id = user.id, email = %user.email, "user registered");
    Ok(AuthResponse {
        message: "User registered successfully",
        user: user.into(),
        access_token,
    })
}

pub async fn login(
    users: &UserRepository,
    keys: &JwtKeys,
    req: LoginRequest,
) -> Result<AuthResponse, ApiError> {
    let (Some(email), Some(password)) = (req.email, req.password) else {
        warn!("login missing fields");
        return Err(ApiError::validation("Missing email or password"));
    };

    let Some(user) = users.get_by_email(&email).await? else {
        if let Some(dummy) = DUMMY_HASH.as_deref() {
            let _ = verify_password(&password, dummy);
        }
        warn!(email = %email, "login unknown email");
        return Err(ApiError::InvalidCredentials);
    };

    let ok = verify_password(&password, &user.password_hash).inspect_err(|e| {
        error!(error = %e, user_id = user.id, "stored password hash could not be parsed");
    })?;
    if !ok {
        warn!(user_id = user.id, "login invalid password");
        return Err(ApiError::InvalidCredentials);
    }

    if !user.is_active {
        warn!(user_id = user.id, "login for deactivated account");
        return Err(ApiError::Deactivated);
    }

    let access_token = keys.sign(user.id)?;

    info!(user_id = user.id, "user logged in");
    Ok(AuthResponse {
        message: "Login successful",
        user: user.into(),
        access_token,
    })
}

/// Resolve the user behind a verified token. Deactivated users still resolve.
pub async fn current_user(users: &UserRepository, user_id: i64) -> Result<PublicUser, ApiError> {
    match users.get_by_id(user_id).await? {
        Some(user) => Ok(user.into()),
        None => {
            warn!(user_id, "token subject no longer exists");
            Err(ApiError::NotFound)
        }
    }
}
