//! Membership, quota and redeem-code types.

use chrono::{DateTime, Duration, FixedOffset, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Free generations per day for a logged-in user without membership.
pub const DAILY_LIMIT_FREE: u32 = 3;

/// Total free generations for an anonymous device without a license.
pub const DEVICE_FREE_LIMIT: u32 = 5;

/// Validity of a redeem code when the row does not carry `days`.
pub const DEFAULT_REDEEM_DAYS: i64 = 30;

/// Quota days roll over at midnight China Standard Time.
const QUOTA_DAY_OFFSET_SECS: i32 = 8 * 3600;

/// Membership tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "lowercase")]
pub enum MembershipLevel {
    #[default]
    Free,
    Premium,
    Enterprise,
}

impl MembershipLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            MembershipLevel::Free => "free",
            MembershipLevel::Premium => "premium",
            MembershipLevel::Enterprise => "enterprise",
        }
    }

    /// Whether the tier is a paid one (expiry still has to be checked).
    pub fn is_paid(&self) -> bool {
        !matches!(self, MembershipLevel::Free)
    }
}

impl std::fmt::Display for MembershipLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Row of the `profiles` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct UserProfile {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default)]
    pub membership_level: MembershipLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub membership_expire_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub daily_usage_count: u32,
    #[serde(default = "default_max_daily_usage")]
    pub max_daily_usage: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

fn default_max_daily_usage() -> u32 {
    DAILY_LIMIT_FREE
}

impl UserProfile {
    /// A fresh free-tier profile, as created on first redeem.
    pub fn new_free(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            phone: None,
            membership_level: MembershipLevel::Free,
            membership_expire_at: None,
            daily_usage_count: 0,
            max_daily_usage: DAILY_LIMIT_FREE,
            updated_at: None,
        }
    }

    /// Paid tier with an expiry in the future.
    pub fn is_member_active(&self, now: DateTime<Utc>) -> bool {
        self.membership_level.is_paid()
            && self.membership_expire_at.is_some_and(|expiry| expiry > now)
    }

    /// Usage counted against today; a count last touched on an earlier day is stale.
    pub fn usage_today(&self, now: DateTime<Utc>) -> u32 {
        match self.updated_at {
            Some(updated) if same_quota_day(updated, now) => self.daily_usage_count,
            _ => 0,
        }
    }

    /// Decide whether this user may run one more generation.
    pub fn check_quota(&self, now: DateTime<Utc>) -> QuotaDecision {
        if self.is_member_active(now) {
            return QuotaDecision::Unlimited;
        }
        let used = self.usage_today(now);
        if used >= DAILY_LIMIT_FREE {
            QuotaDecision::Exceeded {
                used,
                limit: DAILY_LIMIT_FREE,
            }
        } else {
            QuotaDecision::Allowed {
                used,
                limit: DAILY_LIMIT_FREE,
            }
        }
    }

    /// Extend membership by `days`; the level becomes premium.
    ///
    /// The extension starts from the current expiry when it is still in the future,
    /// otherwise from `now`. Returns the new expiry.
    pub fn extend_membership(&mut self, days: i64, now: DateTime<Utc>) -> DateTime<Utc> {
        let base = match self.membership_expire_at {
            Some(expiry) if expiry > now => expiry,
            _ => now,
        };
        let expiry = base + Duration::days(days);
        self.membership_expire_at = Some(expiry);
        self.membership_level = MembershipLevel::Premium;
        self.updated_at = Some(now);
        expiry
    }
}

fn same_quota_day(a: DateTime<Utc>, b: DateTime<Utc>) -> bool {
    let Some(tz) = FixedOffset::east_opt(QUOTA_DAY_OFFSET_SECS) else {
        return a.date_naive() == b.date_naive();
    };
    a.with_timezone(&tz).date_naive() == b.with_timezone(&tz).date_naive()
}

/// Result of a quota check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, JsonSchema)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum QuotaDecision {
    /// Active member or licensed device; nothing is consumed.
    Unlimited,
    /// Within the free allowance.
    Allowed { used: u32, limit: u32 },
    /// Free allowance used up.
    Exceeded { used: u32, limit: u32 },
}

impl QuotaDecision {
    pub fn is_allowed(&self) -> bool {
        !matches!(self, QuotaDecision::Exceeded { .. })
    }

    /// Whether a successful call should bump the stored counter.
    pub fn consumes_quota(&self) -> bool {
        matches!(self, QuotaDecision::Allowed { .. })
    }

    /// Quota decision for an anonymous device.
    ///
    /// Any unexpired license makes the device unlimited; otherwise the
    /// client-reported count is compared to the trial allowance.
    pub fn for_device(licenses: &[LicenseKey], reported_count: u32, now: DateTime<Utc>) -> Self {
        if licenses.iter().any(|l| l.is_valid(now)) {
            return QuotaDecision::Unlimited;
        }
        if reported_count >= DEVICE_FREE_LIMIT {
            QuotaDecision::Exceeded {
                used: reported_count,
                limit: DEVICE_FREE_LIMIT,
            }
        } else {
            QuotaDecision::Allowed {
                used: reported_count,
                limit: DEVICE_FREE_LIMIT,
            }
        }
    }
}

/// Row of the `license_keys` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct LicenseKey {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    pub expires_at: DateTime<Utc>,
}

impl LicenseKey {
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}

/// Row of the `redeem_codes` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RedeemCode {
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub days: Option<i64>,
    #[serde(default)]
    pub is_used: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub used_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub used_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl RedeemCode {
    /// Normalize user input the way codes are stored.
    pub fn normalize(input: &str) -> String {
        input.trim().to_uppercase()
    }

    pub fn validity_days(&self) -> i64 {
        match self.days {
            Some(d) if d > 0 => d,
            _ => DEFAULT_REDEEM_DAYS,
        }
    }
}
