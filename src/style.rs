//! Per-layer visual style records.
//!
//! A [`StyleRecord`] is always complete: every attribute has a default, so a
//! partially specified [`StylePatch`] can always be completed against
//! [`StyleRecord::default`].
//!
//! The serialized field names match the keys written into GeoJSON
//! `properties` on export (`color`, `weight`, `fillColor`, `fillOpacity`,
//! `radius`), so a record and a property bag share one vocabulary.

use std::fmt;
use std::str::FromStr;

use palette::Srgb;
use palette::rgb::FromHexError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Property key holding the stroke color.
pub const KEY_COLOR: &str = "color";
/// Property key holding the stroke weight.
pub const KEY_WEIGHT: &str = "weight";
/// Property key holding the fill color.
pub const KEY_FILL_COLOR: &str = "fillColor";
/// Property key holding the fill opacity.
pub const KEY_FILL_OPACITY: &str = "fillOpacity";
/// Property key holding the point radius.
pub const KEY_RADIUS: &str = "radius";
/// Legacy alias of [`KEY_COLOR`] understood by other GeoJSON tools.
pub const KEY_STROKE: &str = "stroke";
/// Legacy alias of [`KEY_WEIGHT`] understood by other GeoJSON tools.
pub const KEY_STROKE_WIDTH: &str = "stroke-width";
/// Property key of a style object embedded by earlier sessions.
pub const KEY_EMBEDDED_STYLE: &str = "_style";
/// Stroke opacity key. Never written, but stripped on export.
pub const KEY_OPACITY: &str = "opacity";

/// Keys removed from every feature before the layer style is written back.
pub const STRIPPED_KEYS: [&str; 9] = [
    KEY_EMBEDDED_STYLE,
    KEY_COLOR,
    KEY_WEIGHT,
    KEY_FILL_COLOR,
    KEY_FILL_OPACITY,
    KEY_RADIUS,
    KEY_STROKE,
    KEY_STROKE_WIDTH,
    KEY_OPACITY,
];

// ============================================================================
// HexColor
// ============================================================================

/// An 8-bit sRGB color written as `#rrggbb`.
///
/// Parsing accepts `#rrggbb` and `#rgb`, with or without the leading `#`,
/// in any letter case. Formatting is always lowercase `#rrggbb`.
///
/// ```
/// use geostyle::HexColor;
///
/// let color: HexColor = "#3388FF".parse().unwrap();
/// assert_eq!(color.to_string(), "#3388ff");
/// assert_eq!("#abc".parse::<HexColor>().unwrap().to_string(), "#aabbcc");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HexColor([u8; 3]);

impl HexColor {
    /// Creates a color from its red, green and blue channels.
    pub const fn new(red: u8, green: u8, blue: u8) -> Self {
        Self([red, green, blue])
    }

    /// Returns the `(red, green, blue)` channels.
    pub fn channels(&self) -> (u8, u8, u8) {
        (self.0[0], self.0[1], self.0[2])
    }

    /// Returns the color as a `palette` sRGB value.
    pub fn to_srgb(&self) -> Srgb<u8> {
        Srgb::new(self.0[0], self.0[1], self.0[2])
    }
}

impl FromStr for HexColor {
    type Err = FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let rgb: Srgb<u8> = s.trim().parse()?;
        Ok(Self::new(rgb.red, rgb.green, rgb.blue))
    }
}

impl fmt::Display for HexColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (r, g, b) = self.channels();
        write!(f, "#{:02x}{:02x}{:02x}", r, g, b)
    }
}

impl Serialize for HexColor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for HexColor {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse()
            .map_err(|e| serde::de::Error::custom(format!("invalid color {raw:?}: {e}")))
    }
}

/// Default stroke and fill color, `#3388ff`.
pub const DEFAULT_COLOR: HexColor = HexColor::new(0x33, 0x88, 0xff);
/// Default stroke weight.
pub const DEFAULT_WEIGHT: u32 = 3;
/// Default fill opacity.
pub const DEFAULT_FILL_OPACITY: f64 = 0.2;
/// Default point radius.
pub const DEFAULT_RADIUS: u32 = 8;

// ============================================================================
// StyleRecord
// ============================================================================

/// The complete visual style of one layer.
///
/// # JSON Format
///
/// ```json
/// {
///   "color": "#3388ff",
///   "weight": 3,
///   "fillColor": "#3388ff",
///   "fillOpacity": 0.2,
///   "radius": 8
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
#[serde(rename_all = "camelCase", default)]
pub struct StyleRecord {
    /// Stroke color of lines and polygon outlines.
    #[serde(rename = "color")]
    #[cfg_attr(feature = "jsonschema", schemars(with = "String"))]
    pub stroke_color: HexColor,

    /// Stroke width in pixels.
    #[serde(rename = "weight")]
    pub stroke_weight: u32,

    /// Fill color of polygons and point markers.
    #[cfg_attr(feature = "jsonschema", schemars(with = "String"))]
    pub fill_color: HexColor,

    /// Fill opacity (0.0-1.0). Zero disables polygon fill entirely.
    pub fill_opacity: f64,

    /// Marker radius in pixels for point geometries. Always at least 1.
    #[serde(rename = "radius")]
    pub point_radius: u32,
}

impl Default for StyleRecord {
    fn default() -> Self {
        Self {
            stroke_color: DEFAULT_COLOR,
            stroke_weight: DEFAULT_WEIGHT,
            fill_color: DEFAULT_COLOR,
            fill_opacity: DEFAULT_FILL_OPACITY,
            point_radius: DEFAULT_RADIUS,
        }
    }
}

impl StyleRecord {
    /// Completes a patch against the defaults.
    pub fn from_patch(patch: &StylePatch) -> Self {
        let mut style = Self::default();
        style.apply(patch);
        style
    }

    /// Merges a patch into this record in place.
    ///
    /// Opacity is clamped to 0.0-1.0 and the radius to at least 1.
    pub fn apply(&mut self, patch: &StylePatch) {
        if let Some(color) = patch.stroke_color {
            self.stroke_color = color;
        }
        if let Some(weight) = patch.stroke_weight {
            self.stroke_weight = weight;
        }
        if let Some(color) = patch.fill_color {
            self.fill_color = color;
        }
        if let Some(opacity) = patch.fill_opacity {
            self.fill_opacity = clamp_opacity(opacity);
        }
        if let Some(radius) = patch.point_radius {
            self.point_radius = radius.max(1);
        }
    }

    /// Returns a patch that sets every attribute to this record's value.
    pub fn to_patch(&self) -> StylePatch {
        StylePatch {
            stroke_color: Some(self.stroke_color),
            stroke_weight: Some(self.stroke_weight),
            fill_color: Some(self.fill_color),
            fill_opacity: Some(self.fill_opacity),
            point_radius: Some(self.point_radius),
        }
    }

    /// Returns the property bag written for this style on export.
    ///
    /// Contains the five record keys plus the legacy `stroke` and
    /// `stroke-width` aliases.
    pub fn to_properties(&self) -> serde_json::Map<String, serde_json::Value> {
        use serde_json::Value;

        let mut props = serde_json::Map::new();
        props.insert(KEY_COLOR.into(), Value::from(self.stroke_color.to_string()));
        props.insert(KEY_WEIGHT.into(), Value::from(self.stroke_weight));
        props.insert(KEY_FILL_COLOR.into(), Value::from(self.fill_color.to_string()));
        props.insert(KEY_FILL_OPACITY.into(), Value::from(self.fill_opacity));
        props.insert(KEY_RADIUS.into(), Value::from(self.point_radius));
        props.insert(KEY_STROKE.into(), Value::from(self.stroke_color.to_string()));
        props.insert(KEY_STROKE_WIDTH.into(), Value::from(self.stroke_weight));
        props
    }
}

impl fmt::Display for StyleRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "color {}, weight {}, fillColor {}, fillOpacity {}, radius {}",
            self.stroke_color,
            self.stroke_weight,
            self.fill_color,
            self.fill_opacity,
            self.point_radius
        )
    }
}

fn clamp_opacity(value: f64) -> f64 {
    if value.is_nan() { DEFAULT_FILL_OPACITY } else { value.clamp(0.0, 1.0) }
}

// ============================================================================
// StylePatch
// ============================================================================

/// A partially specified style.
///
/// Used for user edits, for styles extracted from imported properties and
/// for profile defaults. Absent fields leave the target untouched.
///
/// ```
/// use geostyle::{StylePatch, StyleRecord};
///
/// let patch = StylePatch::new().with_fill_opacity(0.0).with_point_radius(4);
/// let style = StyleRecord::from_patch(&patch);
/// assert_eq!(style.fill_opacity, 0.0);
/// assert_eq!(style.point_radius, 4);
/// assert_eq!(style.stroke_weight, 3);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
#[serde(rename_all = "camelCase")]
pub struct StylePatch {
    #[serde(rename = "color", default, skip_serializing_if = "Option::is_none")]
    #[cfg_attr(feature = "jsonschema", schemars(with = "Option<String>"))]
    pub stroke_color: Option<HexColor>,

    #[serde(rename = "weight", default, skip_serializing_if = "Option::is_none")]
    pub stroke_weight: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[cfg_attr(feature = "jsonschema", schemars(with = "Option<String>"))]
    pub fill_color: Option<HexColor>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill_opacity: Option<f64>,

    #[serde(rename = "radius", default, skip_serializing_if = "Option::is_none")]
    pub point_radius: Option<u32>,
}

impl StylePatch {
    /// Creates an empty patch.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stroke_color(mut self, color: HexColor) -> Self {
        self.stroke_color = Some(color);
        self
    }

    pub fn with_stroke_weight(mut self, weight: u32) -> Self {
        self.stroke_weight = Some(weight);
        self
    }

    pub fn with_fill_color(mut self, color: HexColor) -> Self {
        self.fill_color = Some(color);
        self
    }

    pub fn with_fill_opacity(mut self, opacity: f64) -> Self {
        self.fill_opacity = Some(opacity);
        self
    }

    pub fn with_point_radius(mut self, radius: u32) -> Self {
        self.point_radius = Some(radius);
        self
    }

    /// Returns true if no attribute is set.
    pub fn is_empty(&self) -> bool {
        self.stroke_color.is_none()
            && self.stroke_weight.is_none()
            && self.fill_color.is_none()
            && self.fill_opacity.is_none()
            && self.point_radius.is_none()
    }

    /// Overlays `other` onto this patch. Fields set in `other` win.
    pub fn merge(&mut self, other: &StylePatch) {
        if other.stroke_color.is_some() {
            self.stroke_color = other.stroke_color;
        }
        if other.stroke_weight.is_some() {
            self.stroke_weight = other.stroke_weight;
        }
        if other.fill_color.is_some() {
            self.fill_color = other.fill_color;
        }
        if other.fill_opacity.is_some() {
            self.fill_opacity = other.fill_opacity;
        }
        if other.point_radius.is_some() {
            self.point_radius = other.point_radius;
        }
    }

    /// Returns a new patch with `other` overlaid onto `self`.
    pub fn overlaid(&self, other: &StylePatch) -> StylePatch {
        let mut merged = self.clone();
        merged.merge(other);
        merged
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let style = StyleRecord::default();
        assert_eq!(style.stroke_color.to_string(), "#3388ff");
        assert_eq!(style.stroke_weight, 3);
        assert_eq!(style.fill_color.to_string(), "#3388ff");
        assert_eq!(style.fill_opacity, 0.2);
        assert_eq!(style.point_radius, 8);
    }

    #[test]
    fn hex_color_parsing() {
        assert_eq!("#ff0000".parse::<HexColor>().unwrap(), HexColor::new(255, 0, 0));
        assert_eq!("00FF00".parse::<HexColor>().unwrap(), HexColor::new(0, 255, 0));
        assert_eq!("#00f".parse::<HexColor>().unwrap(), HexColor::new(0, 0, 255));
        assert!("blue".parse::<HexColor>().is_err());
        assert!("#12345".parse::<HexColor>().is_err());
    }

    #[test]
    fn apply_clamps_out_of_range_values() {
        let mut style = StyleRecord::default();
        style.apply(&StylePatch::new().with_fill_opacity(1.7).with_point_radius(0));
        assert_eq!(style.fill_opacity, 1.0);
        assert_eq!(style.point_radius, 1);

        style.apply(&StylePatch::new().with_fill_opacity(-0.5));
        assert_eq!(style.fill_opacity, 0.0);
    }

    #[test]
    fn empty_patch_leaves_record_untouched() {
        let mut style = StyleRecord::default();
        style.apply(&StylePatch::new());
        assert_eq!(style, StyleRecord::default());
        assert!(StylePatch::new().is_empty());
    }

    #[test]
    fn patch_merge_prefers_later_values() {
        let base = StylePatch::new().with_stroke_weight(5).with_point_radius(2);
        let merged = base.overlaid(&StylePatch::new().with_stroke_weight(9));
        assert_eq!(merged.stroke_weight, Some(9));
        assert_eq!(merged.point_radius, Some(2));
    }

    #[test]
    fn record_json_uses_property_keys() {
        let json = serde_json::to_value(StyleRecord::default()).unwrap();
        assert_eq!(json["color"], "#3388ff");
        assert_eq!(json["weight"], 3);
        assert_eq!(json["fillColor"], "#3388ff");
        assert_eq!(json["fillOpacity"], 0.2);
        assert_eq!(json["radius"], 8);
    }

    #[test]
    fn partial_record_json_completes_with_defaults() {
        let style: StyleRecord = serde_json::from_str(r##"{"color": "#FF0000"}"##).unwrap();
        assert_eq!(style.stroke_color, HexColor::new(255, 0, 0));
        assert_eq!(style.point_radius, 8);
    }

    #[test]
    fn patch_json_skips_unset_fields() {
        let json = serde_json::to_string(&StylePatch::new().with_stroke_weight(2)).unwrap();
        assert_eq!(json, r#"{"weight":2}"#);
    }

    #[test]
    fn properties_carry_legacy_aliases() {
        let style = StyleRecord::from_patch(
            &StylePatch::new()
                .with_stroke_color(HexColor::new(0x11, 0x22, 0x33))
                .with_stroke_weight(7),
        );
        let props = style.to_properties();
        assert_eq!(props.len(), 7);
        assert_eq!(props[KEY_STROKE], "#112233");
        assert_eq!(props[KEY_STROKE_WIDTH], 7);
        assert_eq!(props[KEY_COLOR], props[KEY_STROKE]);
    }
}
