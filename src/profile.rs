//! Serializable viewer configuration.
//!
//! A [`ViewerProfile`] captures the settings that outlive a single session:
//! the style every imported layer starts from, the export file name and the
//! snapshot image settings. It is plain JSON so frontends, the CLI and tests
//! can share one file.
//!
//! # Example
//!
//! ```
//! use geostyle::{HexColor, SnapshotSettings, StylePatch, ViewerProfile};
//!
//! let profile = ViewerProfile::new()
//!     .with_default_style(StylePatch::new().with_stroke_weight(1))
//!     .with_export_name("parks")
//!     .with_snapshot(SnapshotSettings {
//!         width: 800,
//!         height: 600,
//!         background: HexColor::new(0, 0, 0),
//!     });
//!
//! let json = profile.to_json().unwrap();
//! let restored = ViewerProfile::from_json(&json).unwrap();
//! assert_eq!(restored.export.file_name, "parks");
//! ```

use serde::{Deserialize, Serialize};

use crate::style::{HexColor, StylePatch};

// ============================================================================
// Settings
// ============================================================================

/// Settings for GeoJSON export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
#[serde(rename_all = "camelCase")]
pub struct ExportSettings {
    /// File stem typed by the user. Blank means the default name.
    #[serde(default)]
    pub file_name: String,
}

/// Settings for rendered snapshot images.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
#[serde(rename_all = "camelCase", default)]
pub struct SnapshotSettings {
    /// Image width in pixels.
    pub width: u32,

    /// Image height in pixels.
    pub height: u32,

    /// Color behind all layers.
    #[cfg_attr(feature = "jsonschema", schemars(with = "String"))]
    pub background: HexColor,
}

impl Default for SnapshotSettings {
    fn default() -> Self {
        Self {
            width: 1024,
            height: 768,
            background: HexColor::new(0xff, 0xff, 0xff),
        }
    }
}

// ============================================================================
// ViewerProfile
// ============================================================================

/// A serializable profile containing all viewer settings.
///
/// # JSON Format
///
/// ```json
/// {
///   "defaultStyle": { "weight": 1, "fillOpacity": 0.5 },
///   "export": { "fileName": "parks" },
///   "snapshot": { "width": 1024, "height": 768, "background": "#ffffff" }
/// }
/// ```
///
/// Every section is optional; missing sections take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
#[serde(rename_all = "camelCase")]
pub struct ViewerProfile {
    /// Applied under whatever style an imported feature carries.
    #[serde(default, skip_serializing_if = "StylePatch::is_empty")]
    pub default_style: StylePatch,

    #[serde(default)]
    pub export: ExportSettings,

    #[serde(default)]
    pub snapshot: SnapshotSettings,
}

impl ViewerProfile {
    /// Creates a profile with every setting at its default.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the default layer style.
    pub fn with_default_style(mut self, style: StylePatch) -> Self {
        self.default_style = style;
        self
    }

    /// Sets the export file stem.
    pub fn with_export_name(mut self, name: impl Into<String>) -> Self {
        self.export.file_name = name.into();
        self
    }

    /// Sets the snapshot settings.
    pub fn with_snapshot(mut self, settings: SnapshotSettings) -> Self {
        self.snapshot = settings;
        self
    }

    /// Serializes the profile to a JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serializes the profile to a pretty-printed JSON string.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserializes a profile from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

// ============================================================================
// Tests
// ============================================================================
