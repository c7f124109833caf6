//! Auth-role CRUD.

use crate::guarded::{decode, encode_payload, GuardedClient};
use gerbang_core::error::GerbangResult;
use gerbang_core::protocol::{ROLES_ALL_PATH, ROLES_PATH};
use gerbang_core::{MutationError, MutationMethod, MutationResult, Role, RoleInput};
use gerbang_provider::Transport;

/// Roles plus the server-side count.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoleList {
    pub roles: Vec<Role>,
    pub total: Option<i64>,
}

impl<T: Transport> GuardedClient<T> {
    pub async fn list_roles(&self) -> GerbangResult<RoleList> {
        let envelope = self.get_envelope(self.base().endpoint(ROLES_ALL_PATH)).await?;
        let roles: Vec<Role> = match envelope.data {
            Some(data) => decode(data)?,
            None => Vec::new(),
        };
        tracing::debug!(roles = roles.len(), "listed roles");
        Ok(RoleList {
            roles,
            total: envelope.total,
        })
    }

    pub async fn create_role(&self, input: &RoleInput) -> MutationResult {
        let payload = role_payload(input)?;
        self.mutate(ROLES_PATH, MutationMethod::Create, Some(&payload))
            .await
    }

    pub async fn update_role(&self, id: i64, input: &RoleInput) -> MutationResult {
        let payload = role_payload(input)?;
        let id = id.to_string();
        self.mutate(&role_path(&id), MutationMethod::Update, Some(&payload))
            .await
    }

    pub async fn delete_role(&self, id: i64) -> MutationResult {
        let id = id.to_string();
        self.mutate(&role_path(&id), MutationMethod::Delete, None)
            .await
    }

    /// Update when `id` is known, create otherwise.
    pub async fn save_role(&self, id: Option<i64>, input: &RoleInput) -> MutationResult {
        match id {
            Some(id) => self.update_role(id, input).await,
            None => self.create_role(input).await,
        }
    }
}

fn role_path(id: &str) -> [&str; 3] {
    [ROLES_PATH[0], ROLES_PATH[1], id]
}

fn role_payload(input: &RoleInput) -> Result<serde_json::Value, MutationError> {
    if input.name_auth_role.trim().is_empty() {
        return Err(MutationError::rejected("Role name is required"));
    }
    encode_payload(input)
}
