//! User management API (admin only).

use crate::client::PatrolClient;
use crate::error::Result;
use crate::types::{CreateUserRequest, Identity, ProfileUpdate};

/// User management API client.
pub struct UsersApi {
    client: PatrolClient,
}

impl UsersApi {
    pub(crate) fn new(client: PatrolClient) -> Self {
        Self { client }
    }

    /// List users in the caller's organization.
    pub async fn list(&self) -> Result<Vec<Identity>> {
        self.client.get("auth/users/").await
    }

    /// Get a user by ID.
    pub async fn get(&self, id: u64) -> Result<Identity> {
        self.client.get(&format!("auth/users/{}/", id)).await
    }

    /// Create a user in the caller's organization.
    pub async fn create(&self, request: &CreateUserRequest) -> Result<Identity> {
        self.client.post("auth/users/", request).await
    }

    /// Update a user's editable fields.
    pub async fn update(&self, id: u64, update: &ProfileUpdate) -> Result<Identity> {
        self.client.put(&format!("auth/users/{}/", id), update).await
    }

    /// Delete a user.
    pub async fn delete(&self, id: u64) -> Result<()> {
        self.client.delete(&format!("auth/users/{}/", id)).await
    }
}
