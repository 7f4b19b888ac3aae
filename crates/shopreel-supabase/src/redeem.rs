//! Repository for the `redeem_codes` table.

use chrono::{DateTime, Utc};
use serde_json::json;
use tracing::{info, warn};

use shopreel_models::RedeemCode;

use crate::client::SupabaseClient;
use crate::error::SupabaseResult;
use crate::query::Query;

const TABLE: &str = "redeem_codes";

#[derive(Clone)]
pub struct RedeemCodeRepository {
    client: SupabaseClient,
}

impl RedeemCodeRepository {
    pub fn new(client: SupabaseClient) -> Self {
        Self { client }
    }

    /// Look up a code; `code` must already be normalized.
    pub async fn find(&self, code: &str) -> SupabaseResult<Option<RedeemCode>> {
        self.client
            .select_one(TABLE, &Query::new().eq("code", code))
            .await
    }

    /// Mark a code used by `user_id`, only if it is still unused.
    ///
    /// Returns `false` when another request claimed it first.
    pub async fn claim(&self, code: &str, user_id: &str, now: DateTime<Utc>) -> SupabaseResult<bool> {
        let claimed: Vec<RedeemCode> = self
            .client
            .update(
                TABLE,
                &Query::new().eq("code", code).eq("is_used", false),
                &json!({ "is_used": true, "used_by": user_id, "used_at": now }),
            )
            .await?;

        if claimed.is_empty() {
            warn!(code, user_id, "Redeem code already claimed");
            return Ok(false);
        }
        info!(code, user_id, "Redeem code claimed");
        Ok(true)
    }

    /// Undo a claim when the membership update that followed it failed.
    pub async fn release(&self, code: &str, user_id: &str) -> SupabaseResult<()> {
        let _: Vec<RedeemCode> = self
            .client
            .update(
                TABLE,
                &Query::new().eq("code", code).eq("used_by", user_id),
                &json!({ "is_used": false, "used_by": null, "used_at": null }),
            )
            .await?;
        Ok(())
    }
}
