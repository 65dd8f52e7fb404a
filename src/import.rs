//! Import normalization: GeoJSON text in, one layer candidate per feature out.
//!
//! A `FeatureCollection` is split so every feature becomes its own layer,
//! named after its source and 1-based position. A bare `Feature` becomes a
//! single layer named after its source. Style attributes left in
//! `properties` by an earlier export are recovered so files round-trip
//! their look.

use geojson::{Feature, GeoJson, JsonObject, JsonValue};
use log::{info, warn};

use crate::error::{Result, ViewerError};
use crate::style::{
    HexColor, KEY_COLOR, KEY_EMBEDDED_STYLE, KEY_FILL_COLOR, KEY_FILL_OPACITY, KEY_RADIUS,
    KEY_STROKE, KEY_STROKE_WIDTH, KEY_WEIGHT, StylePatch,
};

/// A layer ready to be added to the registry.
#[derive(Debug, Clone)]
pub struct ImportedLayer {
    /// A single `Feature`.
    pub data: GeoJson,
    pub name: String,
    /// Style recovered from the feature's properties.
    pub style: StylePatch,
}

/// Parses GeoJSON text.
///
/// Malformed JSON and malformed GeoJSON both surface as
/// [`ViewerError::InvalidGeoJson`].
pub fn parse(text: &str, source_name: &str) -> Result<GeoJson> {
    text.parse::<GeoJson>()
        .map_err(|e| ViewerError::invalid(source_name, e))
}

/// Splits a GeoJSON document into layer candidates.
///
/// ```
/// use geostyle::import::{normalize, parse};
///
/// let text = r##"{"type":"FeatureCollection","features":[
///     {"type":"Feature","properties":{"color":"#ff0000"},"geometry":null},
///     {"type":"Feature","properties":{},"geometry":null}
/// ]}"##;
/// let layers = normalize(parse(text, "roads.geojson").unwrap(), "roads.geojson").unwrap();
/// assert_eq!(layers[1].name, "roads.geojson - feature 2");
/// assert!(layers[0].style.stroke_color.is_some());
/// ```
pub fn normalize(geojson: GeoJson, source_name: &str) -> Result<Vec<ImportedLayer>> {
    let layers: Vec<ImportedLayer> = match geojson {
        GeoJson::FeatureCollection(collection) => collection
            .features
            .into_iter()
            .enumerate()
            .map(|(i, feature)| imported(feature, format!("{source_name} - feature {}", i + 1)))
            .collect(),
        GeoJson::Feature(feature) => vec![imported(feature, source_name.to_string())],
        GeoJson::Geometry(_) => {
            return Err(ViewerError::invalid(
                source_name,
                "root must be a Feature or FeatureCollection, found a bare geometry",
            ));
        }
    };

    info!("{source_name}: {} feature(s) ready to load", layers.len());
    Ok(layers)
}

/// Parses and normalizes GeoJSON text in one step.
pub fn import_text(text: &str, source_name: &str) -> Result<Vec<ImportedLayer>> {
    normalize(parse(text, source_name)?, source_name)
}

fn imported(feature: Feature, name: String) -> ImportedLayer {
    let style = extract_style(feature.properties.as_ref());
    ImportedLayer {
        data: GeoJson::Feature(feature),
        name,
        style,
    }
}

/// Recovers a style from a feature's properties.
///
/// An embedded `_style` object is the only source when present. Otherwise
/// the style keys are read directly from the properties. Within either
/// source `color` beats `stroke` and `weight` beats `stroke-width`.
/// Values of the wrong type are skipped.
pub fn extract_style(properties: Option<&JsonObject>) -> StylePatch {
    let Some(properties) = properties else {
        return StylePatch::default();
    };

    match properties.get(KEY_EMBEDDED_STYLE) {
        Some(JsonValue::Object(embedded)) => patch_from(embedded),
        Some(JsonValue::Null) | None => patch_from(properties),
        Some(other) => {
            warn!("ignoring non-object {KEY_EMBEDDED_STYLE}: {other}");
            patch_from(properties)
        }
    }
}

fn patch_from(map: &JsonObject) -> StylePatch {
    StylePatch {
        stroke_color: first_of(map, &[KEY_COLOR, KEY_STROKE], color_value),
        stroke_weight: first_of(map, &[KEY_WEIGHT, KEY_STROKE_WIDTH], non_negative_int),
        fill_color: first_of(map, &[KEY_FILL_COLOR], color_value),
        fill_opacity: first_of(map, &[KEY_FILL_OPACITY], opacity_value),
        point_radius: first_of(map, &[KEY_RADIUS], positive_int),
    }
}

/// Returns the first key whose value converts.
fn first_of<T>(map: &JsonObject, keys: &[&str], convert: fn(&JsonValue) -> Option<T>) -> Option<T> {
    keys.iter().find_map(|key| {
        let value = map.get(*key)?;
        let converted = convert(value);
        if converted.is_none() {
            warn!("ignoring style value {key}={value}");
        }
        converted
    })
}

fn number(value: &JsonValue) -> Option<f64> {
    let n = match value {
        JsonValue::Number(n) => n.as_f64(),
        JsonValue::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    n.filter(|n| n.is_finite())
}

/// Hex strings, or CSS color keywords such as `red`.
fn color_value(value: &JsonValue) -> Option<HexColor> {
    let raw = value.as_str()?.trim();
    raw.parse().ok().or_else(|| {
        let named = palette::named::from_str(&raw.to_ascii_lowercase())?;
        Some(HexColor::new(named.red, named.green, named.blue))
    })
}

fn non_negative_int(value: &JsonValue) -> Option<u32> {
    let n = number(value)?.round();
    (0.0..=u32::MAX as f64).contains(&n).then_some(n as u32)
}

fn positive_int(value: &JsonValue) -> Option<u32> {
    non_negative_int(value).filter(|n| *n > 0)
}

fn opacity_value(value: &JsonValue) -> Option<f64> {
    number(value).filter(|n| (0.0..=1.0).contains(n))
}

// ============================================================================
// Tests
// ============================================================================
