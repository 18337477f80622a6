use sha2::{Digest, Sha256};

use crate::io::store::{
    BlobStore, CURRENT_USER_BLOB, StoreError, USERS_BLOB, read_json, write_json,
};
use crate::model::user::{ProfileUpdate, User, UserAccount};

/// Minimum accepted password length at signup
pub const MIN_PASSWORD_LEN: usize = 6;

/// Error type for account and session operations
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("{0}")]
    Validation(String),
    #[error("an account with email {0} already exists")]
    EmailTaken(String),
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("not logged in")]
    NoSession,
    #[error("storage error: {0}")]
    Storage(#[from] StoreError),
}

/// Supplies the identity of the logged-in user, if any.
pub trait SessionContext {
    fn active_user_id(&self) -> Option<String>;
}

impl SessionContext for Option<String> {
    fn active_user_id(&self) -> Option<String> {
        self.clone()
    }
}

/// The session as recorded in the `currentUser` blob.
#[derive(Debug, Clone, Default)]
pub struct StoredSession {
    pub user: Option<User>,
}

impl StoredSession {
    /// Read the current session. An unreadable blob counts as logged out.
    pub fn read<S: BlobStore + ?Sized>(store: &S) -> Self {
        let user = match read_json::<User, _>(store, CURRENT_USER_BLOB) {
            Ok(user) => user,
            Err(e) => {
                tracing::warn!(error = %e, "could not read session, treating as logged out");
                None
            }
        };
        StoredSession { user }
    }
}

impl SessionContext for StoredSession {
    fn active_user_id(&self) -> Option<String> {
        self.user.as_ref().map(|u| u.id.clone())
    }
}

// ---------------------------------------------------------------------------
// Credentials
// ---------------------------------------------------------------------------

/// Salted SHA-256 of a password, salted with the user id
fn hash_password(user_id: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(user_id.as_bytes());
    hasher.update(b":");
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn validate_email(email: &str) -> Result<(), SessionError> {
    let email = email.trim();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(()),
        _ => Err(SessionError::Validation(format!(
            "invalid email address '{}'",
            email
        ))),
    }
}

fn required(value: &str, name: &str) -> Result<String, SessionError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(SessionError::Validation(format!("{} is required", name)));
    }
    Ok(value.to_string())
}

fn load_accounts<S: BlobStore + ?Sized>(store: &S) -> Result<Vec<UserAccount>, SessionError> {
    Ok(read_json::<Vec<UserAccount>, _>(store, USERS_BLOB)?.unwrap_or_default())
}

// ---------------------------------------------------------------------------
// Account operations
// ---------------------------------------------------------------------------

/// Fields collected at signup
#[derive(Debug, Clone, Default)]
pub struct Signup {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

/// Register a new account. Does not log in.
pub fn signup<S: BlobStore + ?Sized>(store: &mut S, form: Signup) -> Result<User, SessionError> {
    let first_name = required(&form.first_name, "first name")?;
    let last_name = required(&form.last_name, "last name")?;
    let email = required(&form.email, "email")?;
    validate_email(&email)?;
    if form.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(SessionError::Validation(format!(
            "password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    if form.password != form.confirm_password {
        return Err(SessionError::Validation("passwords do not match".into()));
    }

    let mut accounts = load_accounts(&*store)?;
    let key = normalize_email(&email);
    if accounts.iter().any(|a| normalize_email(&a.user.email) == key) {
        return Err(SessionError::EmailTaken(email));
    }

    let id = uuid::Uuid::now_v7().to_string();
    let user = User {
        id: id.clone(),
        first_name,
        last_name,
        email,
        ..User::default()
    };
    accounts.push(UserAccount {
        user: user.clone(),
        password_hash: hash_password(&id, &form.password),
    });
    write_json(store, USERS_BLOB, &accounts)?;
    tracing::info!(user = %user.id, "account created");
    Ok(user)
}

/// Check credentials and record the session.
pub fn login<S: BlobStore + ?Sized>(
    store: &mut S,
    email: &str,
    password: &str,
) -> Result<User, SessionError> {
    let key = normalize_email(email);
    let accounts = load_accounts(&*store)?;
    let account = accounts
        .into_iter()
        .find(|a| normalize_email(&a.user.email) == key)
        .filter(|a| a.password_hash == hash_password(&a.user.id, password))
        .ok_or(SessionError::InvalidCredentials)?;
    write_json(store, CURRENT_USER_BLOB, &account.user)?;
    tracing::info!(user = %account.user.id, "logged in");
    Ok(account.user)
}

/// End the session. Logging out twice is fine.
pub fn logout<S: BlobStore + ?Sized>(store: &mut S) -> Result<(), SessionError> {
    store.remove_blob(CURRENT_USER_BLOB)?;
    tracing::info!("logged out");
    Ok(())
}

/// The logged-in user, if any.
pub fn current_user<S: BlobStore + ?Sized>(store: &S) -> Option<User> {
    StoredSession::read(store).user
}

fn apply_optional(slot: &mut Option<String>, value: Option<String>) {
    if let Some(v) = value {
        let v = v.trim().to_string();
        *slot = if v.is_empty() { None } else { Some(v) };
    }
}

/// Edit the logged-in user's profile. Both the session record and the
/// stored account are rewritten; the credential is kept.
pub fn update_profile<S: BlobStore + ?Sized>(
    store: &mut S,
    update: ProfileUpdate,
) -> Result<User, SessionError> {
    let mut user = current_user(&*store).ok_or(SessionError::NoSession)?;
    let mut accounts = load_accounts(&*store)?;

    if let Some(first) = update.first_name {
        user.first_name = required(&first, "first name")?;
    }
    if let Some(last) = update.last_name {
        user.last_name = required(&last, "last name")?;
    }
    if let Some(email) = update.email {
        let email = required(&email, "email")?;
        validate_email(&email)?;
        let key = normalize_email(&email);
        if accounts
            .iter()
            .any(|a| a.user.id != user.id && normalize_email(&a.user.email) == key)
        {
            return Err(SessionError::EmailTaken(email));
        }
        user.email = email;
    }
    apply_optional(&mut user.address, update.address);
    apply_optional(&mut user.contact_number, update.contact_number);
    apply_optional(&mut user.birthday, update.birthday);
    apply_optional(&mut user.profile_photo, update.profile_photo);

    match accounts.iter_mut().find(|a| a.user.id == user.id) {
        Some(account) => account.user = user.clone(),
        None => {
            tracing::warn!(user = %user.id, "session user has no stored account");
            return Err(SessionError::NoSession);
        }
    }
    write_json(store, USERS_BLOB, &accounts)?;
    write_json(store, CURRENT_USER_BLOB, &user)?;
    tracing::info!(user = %user.id, "profile updated");
    Ok(user)
}
