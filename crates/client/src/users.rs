//! User account CRUD and password changes.

use crate::guarded::{encode_payload, GuardedClient};
use crate::password::{check_password_strength, PasswordStrength};
use gerbang_core::error::GerbangResult;
use gerbang_core::protocol::{USERS_ALL_PATH, USERS_PATH};
use gerbang_core::{
    MutationError, MutationMethod, MutationResult, PasswordChange, UserInput, UserList,
    UserProfile,
};
use gerbang_provider::Transport;

impl<T: Transport> GuardedClient<T> {
    /// `GET /users/all`. This endpoint answers `{ items }` rather than the
    /// usual envelope.
    pub async fn list_users(&self) -> GerbangResult<Vec<UserProfile>> {
        let list: UserList = self.get_json(self.base().endpoint(USERS_ALL_PATH)).await?;
        tracing::debug!(users = list.items.len(), "listed users");
        Ok(list.items)
    }

    pub async fn create_user(&self, input: &UserInput) -> MutationResult {
        let payload = user_payload(input)?;
        self.mutate(USERS_PATH, MutationMethod::Create, Some(&payload))
            .await
    }

    pub async fn update_user(&self, id: &str, input: &UserInput) -> MutationResult {
        let payload = user_payload(input)?;
        self.mutate(&[USERS_PATH[0], id], MutationMethod::Update, Some(&payload))
            .await
    }

    pub async fn delete_user(&self, id: &str) -> MutationResult {
        self.mutate(&[USERS_PATH[0], id], MutationMethod::Delete, None)
            .await
    }

    /// Sets a new password. Mismatched confirmations and passwords weaker
    /// than [`PasswordStrength::Good`] are refused before any request.
    pub async fn change_password(
        &self,
        id: &str,
        password: &str,
        confirm: &str,
    ) -> MutationResult {
        if password != confirm {
            return Err(MutationError::rejected("Password confirmation does not match"));
        }
        let strength = check_password_strength(password);
        if strength < PasswordStrength::Good {
            return Err(MutationError::rejected(format!(
                "Password is too weak ({})",
                strength.label()
            )));
        }

        let payload = encode_payload(&PasswordChange {
            password: password.to_owned(),
            password_confirm: confirm.to_owned(),
        })?;
        self.mutate(
            &[USERS_PATH[0], id, "password"],
            MutationMethod::Update,
            Some(&payload),
        )
        .await
    }
}

fn user_payload(input: &UserInput) -> Result<serde_json::Value, MutationError> {
    if input.username.trim().is_empty() {
        return Err(MutationError::rejected("Username is required"));
    }
    if input.full_name.trim().is_empty() {
        return Err(MutationError::rejected("Full name is required"));
    }
    if let Some(password) = input.password.as_deref() {
        if check_password_strength(password) < PasswordStrength::Good {
            return Err(MutationError::rejected("Password is too weak"));
        }
    }
    encode_payload(input)
}
