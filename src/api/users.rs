//! Users, only as far as meetings need them: log in, look at yourself, and let a super admin
//! manage accounts

use axum::Extension;
use serde::Deserialize;
use serde::Serialize;
use uuid::Uuid;

use crate::password;
use crate::storage::CreateUserValues;
use crate::storage::Storage;
use crate::users::Role;
use crate::users::User;

use super::CurrentUser;
use super::Error;
use super::Form;
use super::JwtKeys;
use super::PathParameters;
use super::Success;
use super::current_user::Token;

/// A user as shown to clients, credentials stay behind
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: Uuid,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,

    /// Only set right after the password was generated
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            role: user.role,
            password: None,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Credentials {
    username: String,
    password: String,
}

/// Exchange credentials for an access token
///
/// ```sh
/// curl -H 'Content-Type: application/json' \
///     -d '{ "username": "admin", "password": "verysecret" }' \
///     http://localhost:6000/api/users/token
/// ```
pub async fn token<S: Storage>(
    Extension(jwt_keys): Extension<JwtKeys>,
    Extension(storage): Extension<S>,
    Form(credentials): Form<Credentials>,
) -> Result<Success<Token>, Error> {
    let user = storage
        .find_single_user_by_username(&credentials.username)
        .await
        .map_err(Error::internal_server_error)?
        .filter(|user| !user.deleted)
        .filter(|user| password::verify(&user.hashed_password, &credentials.password));

    let Some(user) = user else {
        tracing::debug!("Failed login for `{}`", credentials.username);
        return Err(Error::bad_request("Invalid user"));
    };

    jwt_keys.issue(&user).map(Success::ok)
}

/// The caller itself
pub async fn me<S: Storage>(current_user: CurrentUser<S>) -> Success<UserResponse> {
    Success::ok(UserResponse::from(&*current_user))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    role: Role,
    username: String,
    first_name: String,
    last_name: String,

    /// Generated when missing, and returned once in the response
    password: Option<String>,
}

/// Add a user, super admins only
///
/// ```sh
/// curl -H 'Content-Type: application/json' \
///     -H 'Authorization: Bearer tokentokentoken' \
///     -d '{ "role": "user", "username": "ada", "firstName": "Ada", "lastName": "Lovelace" }' \
///     http://localhost:6000/api/users
/// ```
pub async fn create<S: Storage>(
    Extension(storage): Extension<S>,
    current_user: CurrentUser<S>,
    Form(new_user): Form<NewUser>,
) -> Result<Success<UserResponse>, Error> {
    current_user.role.is_allowed(Role::SuperAdmin)?;

    ensure_username_is_free(&storage, &new_user.username).await?;

    let (plain_password, generated_password) = match new_user.password {
        Some(given) => (given, None),
        None => {
            let generated = password::generate();
            (generated.clone(), Some(generated))
        }
    };

    let hashed_password = password::hash(&plain_password).map_err(Error::internal_server_error)?;

    let user = storage
        .create_user(&CreateUserValues {
            session_id: &Uuid::new_v4(),
            role: new_user.role,
            username: &new_user.username,
            first_name: &new_user.first_name,
            last_name: &new_user.last_name,
            hashed_password: &hashed_password,
        })
        .await
        .map_err(Error::internal_server_error)?;

    tracing::info!("User `{}` added by `{}`", user.username, current_user.username);

    Ok(Success::created(UserResponse {
        password: generated_password,
        ..UserResponse::from(&user)
    }))
}

/// Usernames stay taken after a soft-delete
async fn ensure_username_is_free<S: Storage>(storage: &S, username: &str) -> Result<(), Error> {
    let existing = storage
        .find_single_user_by_username(username)
        .await
        .map_err(Error::internal_server_error)?;

    match existing {
        Some(user) if user.deleted => Err(Error::bad_request("User already exists and is deleted")),
        Some(_) => Err(Error::bad_request("User already exists")),
        None => Ok(()),
    }
}

/// Soft-delete a user, super admins only
///
/// The meetings of a deleted user drop out of every list
pub async fn delete<S: Storage>(
    Extension(storage): Extension<S>,
    current_user: CurrentUser<S>,
    PathParameters(user_id): PathParameters<Uuid>,
) -> Result<Success<()>, Error> {
    current_user.role.is_allowed(Role::SuperAdmin)?;

    let user = storage
        .find_single_user_by_id(&user_id)
        .await
        .map_err(Error::internal_server_error)?
        .ok_or_else(|| Error::not_found("User not found"))?;

    storage
        .delete_user(&user)
        .await
        .map_err(Error::internal_server_error)?;

    tracing::info!("User `{}` deleted by `{}`", user.username, current_user.username);

    Ok(Success::no_content())
}
