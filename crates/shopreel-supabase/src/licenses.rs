//! Repository for the `license_keys` table.

use shopreel_models::LicenseKey;

use crate::client::SupabaseClient;
use crate::error::SupabaseResult;
use crate::query::Query;

const TABLE: &str = "license_keys";

#[derive(Clone)]
pub struct LicenseKeyRepository {
    client: SupabaseClient,
}

impl LicenseKeyRepository {
    pub fn new(client: SupabaseClient) -> Self {
        Self { client }
    }

    /// Every license bound to a device, expired or not.
    pub async fn for_device(&self, device_id: &str) -> SupabaseResult<Vec<LicenseKey>> {
        self.client
            .select(
                TABLE,
                &Query::new()
                    .select("device_id,expires_at")
                    .eq("device_id", device_id),
            )
            .await
    }
}
