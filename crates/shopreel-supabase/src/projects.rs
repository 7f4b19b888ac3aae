//! Repository for the `projects` table (shop profiles).

use tracing::info;

use shopreel_models::{ProjectPatch, ShopProfile};

use crate::client::SupabaseClient;
use crate::error::{SupabaseError, SupabaseResult};
use crate::query::Query;

const TABLE: &str = "projects";

/// Shop profiles, always scoped to their owner.
#[derive(Clone)]
pub struct ProjectRepository {
    client: SupabaseClient,
}

impl ProjectRepository {
    pub fn new(client: SupabaseClient) -> Self {
        Self { client }
    }

    pub async fn list(&self, user_id: &str) -> SupabaseResult<Vec<ShopProfile>> {
        self.client
            .select(
                TABLE,
                &Query::new().eq("user_id", user_id).order_desc("created_at"),
            )
            .await
    }

    pub async fn get(&self, user_id: &str, id: &str) -> SupabaseResult<Option<ShopProfile>> {
        self.client
            .select_one(TABLE, &Query::new().eq("id", id).eq("user_id", user_id))
            .await
    }

    /// Store a new profile owned by `user_id`.
    pub async fn create(&self, user_id: &str, profile: &ShopProfile) -> SupabaseResult<ShopProfile> {
        let mut row = profile.clone();
        row.id = None;
        row.user_id = user_id.to_string();

        let created: Vec<ShopProfile> = self.client.insert(TABLE, &row).await?;
        let created = created
            .into_iter()
            .next()
            .ok_or_else(|| SupabaseError::invalid_response("project insert returned no row"))?;
        info!(user_id, project_id = ?created.id, "Project created");
        Ok(created)
    }

    /// Apply a partial update; `None` when the project does not exist for this user.
    pub async fn update(&self, user_id: &str, id: &str, patch: &ProjectPatch) -> SupabaseResult<Option<ShopProfile>> {
        let updated: Vec<ShopProfile> = self
            .client
            .update(TABLE, &Query::new().eq("id", id).eq("user_id", user_id), patch)
            .await?;
        Ok(updated.into_iter().next())
    }

    /// Delete a project; `false` when nothing matched.
    pub async fn delete(&self, user_id: &str, id: &str) -> SupabaseResult<bool> {
        let removed = self
            .client
            .delete(TABLE, &Query::new().eq("id", id).eq("user_id", user_id))
            .await?;
        if removed > 0 {
            info!(user_id, project_id = id, "Project deleted");
        }
        Ok(removed > 0)
    }
}
