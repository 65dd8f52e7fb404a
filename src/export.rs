//! Export serialization: every layer back into one `FeatureCollection`.
//!
//! Each feature is written with its owning layer's style flattened into its
//! `properties`, so any GeoJSON consumer (and a later import) sees the same
//! look the user configured.

use geojson::{Feature, JsonObject};
use log::info;

use crate::error::Result;
use crate::layer::Layer;
use crate::style::{STRIPPED_KEYS, StyleRecord};

/// File stem used when the user leaves the export name blank.
pub const DEFAULT_EXPORT_NAME: &str = "EasyBIMaps";

/// Extension appended to exported GeoJSON file names.
pub const EXPORT_EXTENSION: &str = ".geojson";

/// Returns a copy of `feature` carrying `style` in its properties.
///
/// Every known style key (including `_style` and `opacity`) is removed from
/// the copy first. The style keys are then written and the remaining
/// original properties are laid over them.
pub fn styled_feature(feature: &Feature, style: &StyleRecord) -> Feature {
    let mut copy = feature.clone();

    let mut stripped: JsonObject = copy.properties.take().unwrap_or_default();
    for key in STRIPPED_KEYS {
        stripped.remove(key);
    }

    let mut properties = style.to_properties();
    properties.extend(stripped);
    copy.properties = Some(properties);
    copy
}

/// Produces every exported feature, in layer order.
pub fn export_features<'a, H: 'a>(layers: impl IntoIterator<Item = &'a Layer<H>>) -> Vec<Feature> {
    layers
        .into_iter()
        .flat_map(|layer| {
            let style = layer.style();
            layer.features().map(move |f| styled_feature(f, style))
        })
        .collect()
}

/// Serializes all layers as one `FeatureCollection`.
///
/// The document lists one feature per line:
///
/// ```text
/// {
/// "type": "FeatureCollection",
/// "features": [
/// {"type":"Feature",...},
/// {"type":"Feature",...}
/// ]
/// }
/// ```
pub fn serialize<'a, H: 'a>(layers: impl IntoIterator<Item = &'a Layer<H>>) -> Result<String> {
    let features = export_features(layers);
    let lines = features
        .iter()
        .map(serde_json::to_string)
        .collect::<std::result::Result<Vec<_>, _>>()?;

    info!("serialized {} feature(s)", lines.len());
    Ok(format!(
        "{{\n\"type\": \"FeatureCollection\",\n\"features\": [\n{}\n]\n}}",
        lines.join(",\n")
    ))
}

/// Builds the download file name from what the user typed.
///
/// ```
/// use geostyle::export::export_file_name;
///
/// assert_eq!(export_file_name("  rivers "), "rivers.geojson");
/// assert_eq!(export_file_name(""), "EasyBIMaps.geojson");
/// ```
pub fn export_file_name(requested: &str) -> String {
    let stem = requested.trim();
    let stem = if stem.is_empty() { DEFAULT_EXPORT_NAME } else { stem };
    format!("{stem}{EXPORT_EXTENSION}")
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::import_text;
    use crate::layer::tests::{RecordedHandle, RecordingSurface};
    use crate::layer::LayerRegistry;
    use crate::style::{HexColor, StylePatch};
    use geojson::GeoJson;
    use serde_json::{json, Value};

    fn load(
        registry: &mut LayerRegistry<RecordedHandle>,
        surface: &mut RecordingSurface,
        text: &str,
        name: &str,
    ) {
        for imported in import_text(text, name).unwrap() {
            let style = StyleRecord::from_patch(&imported.style);
            registry.add_layer(surface, imported.data, imported.name, style);
        }
    }

    const POLYGONS: &str = r##"{"type":"FeatureCollection","features":[
        {"type":"Feature","properties":{"name":"a","opacity":0.4},"geometry":{"type":"Polygon","coordinates":[[[0,0],[1,0],[1,1],[0,0]]]}},
        {"type":"Feature","properties":{"name":"b","_style":{"color":"#ff0000"}},"geometry":{"type":"Polygon","coordinates":[[[2,2],[3,2],[3,3],[2,2]]]}}
    ]}"##;

    #[test]
    fn export_is_valid_feature_collection() {
        let mut surface = RecordingSurface::default();
        let mut registry = LayerRegistry::new();
        load(&mut registry, &mut surface, POLYGONS, "p.geojson");

        let text = serialize(registry.iter()).unwrap();
        let parsed: GeoJson = text.parse().unwrap();
        let GeoJson::FeatureCollection(collection) = parsed else {
            panic!("export must be a FeatureCollection");
        };
        assert_eq!(collection.features.len(), 2);
        assert_eq!(text.lines().count(), 7);
    }

    #[test]
    fn fill_opacity_zero_is_written_without_leaking_keys() {
        let mut surface = RecordingSurface::default();
        let mut registry = LayerRegistry::new();
        load(&mut registry, &mut surface, POLYGONS, "p.geojson");
        for index in 0..registry.len() {
            registry
                .update_style(&mut surface, index, &StylePatch::new().with_fill_opacity(0.0))
                .unwrap();
        }

        let text = serialize(registry.iter()).unwrap();
        let doc: Value = serde_json::from_str(&text).unwrap();
        for feature in doc["features"].as_array().unwrap() {
            let props = feature["properties"].as_object().unwrap();
            assert_eq!(props["fillOpacity"].as_f64(), Some(0.0));
            assert!(props.get("_style").is_none());
            assert!(props.get("opacity").is_none());
        }

        // Only the style keys plus the feature's own properties appear.
        let first = doc["features"][0]["properties"].as_object().unwrap();
        let mut keys: Vec<_> = first.keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(
            keys,
            vec![
                "color",
                "fillColor",
                "fillOpacity",
                "name",
                "radius",
                "stroke",
                "stroke-width",
                "weight"
            ]
        );
        assert!(!first.contains_key("fill"));
    }

    #[test]
    fn style_round_trips_through_export_and_import() {
        let mut surface = RecordingSurface::default();
        let mut registry = LayerRegistry::new();
        load(&mut registry, &mut surface, POLYGONS, "p.geojson");
        registry
            .update_style(
                &mut surface,
                0,
                &StylePatch::new()
                    .with_stroke_color(HexColor::new(0x12, 0x34, 0x56))
                    .with_stroke_weight(0)
                    .with_fill_opacity(0.55)
                    .with_point_radius(14),
            )
            .unwrap();
        let before: Vec<StyleRecord> = registry.iter().map(|l| l.style().clone()).collect();

        let text = serialize(registry.iter()).unwrap();

        let mut surface2 = RecordingSurface::default();
        let mut reloaded = LayerRegistry::new();
        load(&mut reloaded, &mut surface2, &text, "export.geojson");
        let after: Vec<StyleRecord> = reloaded.iter().map(|l| l.style().clone()).collect();

        assert_eq!(before, after);
    }

    #[test]
    fn embedded_style_is_flattened() {
        let mut surface = RecordingSurface::default();
        let mut registry = LayerRegistry::new();
        load(&mut registry, &mut surface, POLYGONS, "p.geojson");

        let features = export_features(registry.iter());
        let props = features[1].properties.as_ref().unwrap();
        assert_eq!(props["color"], "#ff0000");
        assert_eq!(props["stroke"], "#ff0000");
        assert_eq!(props["stroke-width"], 3);
        assert!(!props.contains_key("_style"));
    }

    #[test]
    fn feature_without_properties_gains_style() {
        let feature = Feature {
            bbox: None,
            geometry: None,
            id: None,
            properties: None,
            foreign_members: None,
        };
        let styled = styled_feature(&feature, &StyleRecord::default());
        assert_eq!(
            Value::Object(styled.properties.unwrap()),
            json!({
                "color": "#3388ff",
                "weight": 3,
                "fillColor": "#3388ff",
                "fillOpacity": 0.2,
                "radius": 8,
                "stroke": "#3388ff",
                "stroke-width": 3
            })
        );
    }

    #[test]
    fn empty_registry_serializes_to_empty_collection() {
        let registry: LayerRegistry<()> = LayerRegistry::new();
        let text = serialize(registry.iter()).unwrap();
        let doc: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(doc["features"], json!([]));
    }
}
