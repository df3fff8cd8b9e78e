//! Render settings. Every field has a default, so a partial JSON document
//! (or none at all) is a valid configuration.

use serde::{Deserialize, Serialize};

/// Percentiles used by the intensity contrast stretch, in `[0, 100]`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Percentiles {
    pub low: f64,
    pub high: f64,
    /// Samples below this percentile are zeroed before stretching.
    pub background: f64,
}

impl Default for Percentiles {
    fn default() -> Self {
        Self {
            low: 1.0,
            high: 99.0,
            background: 10.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderOptions {
    pub percentiles: Percentiles,
    /// Alpha of painted overlay pixels.
    pub overlay_alpha: u8,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            percentiles: Percentiles::default(),
            overlay_alpha: 128,
        }
    }
}

impl RenderOptions {
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }
}
