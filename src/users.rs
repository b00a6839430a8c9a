use anyhow::Result;
use serde::Deserialize;
use serde::Serialize;
use uuid::Uuid;

use crate::config::env_var_or_else;
use crate::password::generate;
use crate::password::hash;
use crate::storage::CreateUserValues;
use crate::storage::Storage;

/// User roles
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Role {
    /// Sees every meeting and manages users
    SuperAdmin,
    /// Sees the meetings they created or attend
    User,
}

impl Role {
    /// Privileged roles are exempt from the meeting visibility rules
    pub fn is_privileged(self) -> bool {
        matches!(self, Role::SuperAdmin)
    }
}

#[derive(Clone, Debug)]
pub struct User {
    pub id: Uuid,
    pub session_id: Uuid,
    pub username: String,
    pub hashed_password: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    pub deleted: bool,
}

impl User {
    /// Name shown on the meetings created by this user
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Make sure there is at least one user to log in with
///
/// The first user is always a super admin
pub async fn ensure_initial_user<S: Storage>(storage: &S) -> Result<()> {
    let user = storage.find_any_single_user().await?;

    if user.is_none() {
        let username = env_var_or_else("INITIAL_USERNAME", || {
            let initial_username = Uuid::new_v4().to_string();
            tracing::info!(
                "`INITIAL_USERNAME` not set, generating new username: {initial_username}"
            );
            initial_username
        });

        let password = env_var_or_else("INITIAL_PASSWORD", || {
            let initial_password = generate();
            tracing::info!(
                "`INITIAL_PASSWORD` not set, generating new password: {initial_password}"
            );
            initial_password
        });

        let hashed_password = hash(&password)?;

        let values = CreateUserValues {
            session_id: &Uuid::new_v4(),
            role: Role::SuperAdmin,
            username: &username,
            first_name: "Super",
            last_name: "Admin",
            hashed_password: &hashed_password,
        };

        let user = storage.create_user(&values).await?;

        tracing::info!("Created initial user `{}`", user.username);
    }

    Ok(())
}
