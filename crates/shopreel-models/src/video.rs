//! Sora image-to-video options.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Default clip length in seconds.
pub const DEFAULT_SORA_DURATION_SECS: u32 = 15;

/// Output aspect ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
pub enum AspectRatio {
    #[default]
    #[serde(rename = "16:9")]
    Landscape,
    #[serde(rename = "9:16")]
    Portrait,
}

impl AspectRatio {
    pub fn as_str(&self) -> &'static str {
        match self {
            AspectRatio::Landscape => "16:9",
            AspectRatio::Portrait => "9:16",
        }
    }
}

/// Sora model variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
pub enum SoraModel {
    #[default]
    #[serde(rename = "sora-2")]
    Sora2,
    #[serde(rename = "sora-2-pro")]
    Sora2Pro,
}

impl SoraModel {
    /// Anything other than an explicit `sora-2-pro` selects the standard model.
    pub fn from_request(model: Option<&str>) -> Self {
        match model {
            Some("sora-2-pro") => SoraModel::Sora2Pro,
            _ => SoraModel::Sora2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SoraModel::Sora2 => "sora-2",
            SoraModel::Sora2Pro => "sora-2-pro",
        }
    }
}

/// Kind of clip; selects the director prompt used to rewrite the user's description.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "lowercase")]
pub enum SoraShotType {
    /// First-person walk into the shop.
    #[default]
    Store,
    /// Studio-style product advert.
    Product,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_selection() {
        assert_eq!(SoraModel::from_request(Some("sora-2-pro")), SoraModel::Sora2Pro);
        assert_eq!(SoraModel::from_request(Some("sora-3")), SoraModel::Sora2);
        assert_eq!(SoraModel::from_request(None), SoraModel::Sora2);
    }

    #[test]
    fn test_ratio_serde() {
        let ratio: AspectRatio = serde_json::from_str("\"9:16\"").unwrap();
        assert_eq!(ratio, AspectRatio::Portrait);
        assert_eq!(serde_json::to_string(&AspectRatio::Landscape).unwrap(), "\"16:9\"");
    }
}
