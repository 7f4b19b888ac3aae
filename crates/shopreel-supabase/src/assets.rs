//! Repository for the `user_digital_assets` table.

use tracing::{info, warn};

use shopreel_models::{AssetWritePlan, UserDigitalAssets};

use crate::client::SupabaseClient;
use crate::error::{SupabaseError, SupabaseResult};
use crate::query::Query;

const TABLE: &str = "user_digital_assets";

#[derive(Clone)]
pub struct DigitalAssetRepository {
    client: SupabaseClient,
}

impl DigitalAssetRepository {
    pub fn new(client: SupabaseClient) -> Self {
        Self { client }
    }

    /// Most recently updated row for a user.
    pub async fn latest(&self, user_id: &str) -> SupabaseResult<Option<UserDigitalAssets>> {
        self.client
            .select_one(
                TABLE,
                &Query::new().eq("user_id", user_id).order_desc("updated_at"),
            )
            .await
    }

    /// Every row for a user, oldest id first.
    pub async fn all_for_user(&self, user_id: &str) -> SupabaseResult<Vec<UserDigitalAssets>> {
        self.client
            .select(TABLE, &Query::new().eq("user_id", user_id).order_asc("id"))
            .await
    }

    /// Apply a write plan: drop duplicates, then update or insert.
    pub async fn apply(&self, plan: &AssetWritePlan) -> SupabaseResult<UserDigitalAssets> {
        if plan.unidentified_duplicates > 0 {
            warn!(
                user_id = %plan.row.user_id,
                skipped = plan.unidentified_duplicates,
                "Duplicate digital asset rows have no id and were left in place"
            );
        }
        if !plan.duplicate_ids.is_empty() {
            let removed = self
                .client
                .delete(TABLE, &Query::new().is_in("id", &plan.duplicate_ids))
                .await?;
            warn!(
                user_id = %plan.row.user_id,
                removed,
                "Removed duplicate digital asset rows"
            );
        }

        let stored: Vec<UserDigitalAssets> = match &plan.target_id {
            Some(id) => {
                self.client
                    .update(TABLE, &Query::new().eq("id", id), &plan.row)
                    .await?
            }
            None => self.client.insert(TABLE, &plan.row).await?,
        };

        let row = stored
            .into_iter()
            .next()
            .ok_or_else(|| SupabaseError::invalid_response("asset write returned no row"))?;
        info!(user_id = %row.user_id, insert = plan.is_insert(), "Digital assets saved");
        Ok(row)
    }
}
