//! JavaScript bindings for browser frontends.
//!
//! [`WasmViewer`] wraps a [`Viewer`] over a [`SnapshotSurface`] so a web UI
//! can load GeoJSON, edit styles and download exports without a tile map.
//!
//! # Feature Flag
//!
//! This module is only available with the `wasm` feature enabled:
//!
//! ```toml
//! [dependencies]
//! geostyle = { version = "0.1", features = ["wasm"] }
//! ```
//!
//! # Example (JavaScript/TypeScript)
//!
//! ```javascript
//! import init, { WasmViewer } from 'geostyle';
//!
//! await init();
//!
//! const viewer = new WasmViewer();
//! viewer.loadText('parks.geojson', text);
//! viewer.updateStyleJson(0, '{"fillOpacity": 0}');
//!
//! const { fileName, content } = viewer.exportGeojson('parks');
//! const png = viewer.renderPng(800, 600);
//! ```

use serde::Serialize;
use wasm_bindgen::prelude::*;

use crate::layer::SnapshotSurface;
use crate::profile::ViewerProfile;
use crate::style::StylePatch;
use crate::viewer::{Configurable, Viewer};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ExportResult {
    file_name: String,
    content: String,
}

fn js_error(e: impl std::fmt::Display) -> JsError {
    JsError::new(&e.to_string())
}

// ============================================================================
// WasmViewer
// ============================================================================

/// A [`Viewer`] exposed to JavaScript via wasm-bindgen.
#[wasm_bindgen]
pub struct WasmViewer {
    viewer: Viewer<SnapshotSurface>,
}

impl Default for WasmViewer {
    fn default() -> Self {
        Self::new()
    }
}

#[wasm_bindgen]
impl WasmViewer {
    #[wasm_bindgen(constructor)]
    pub fn new() -> WasmViewer {
        Self {
            viewer: Viewer::new(SnapshotSurface::new()),
        }
    }

    // ---- Layers ----

    /// Loads GeoJSON text and returns the number of layers added.
    #[wasm_bindgen(js_name = "loadText")]
    pub fn load_text(&mut self, source_name: &str, text: &str) -> Result<u32, JsError> {
        let report = self.viewer.load_text(source_name, text).map_err(js_error)?;
        Ok(report.count() as u32)
    }

    /// Removes a layer. Returns the new panel state.
    #[wasm_bindgen(js_name = "removeLayer")]
    pub fn remove_layer(&mut self, index: usize) -> Result<JsValue, JsError> {
        let panel = self.viewer.remove_layer(index).map_err(js_error)?;
        serde_wasm_bindgen::to_value(&panel).map_err(js_error)
    }

    /// Selects a layer for editing; `undefined` hides the panel.
    #[wasm_bindgen(js_name = "setActive")]
    pub fn set_active(&mut self, index: Option<usize>) -> Result<JsValue, JsError> {
        let panel = self.viewer.set_active(index).map_err(js_error)?;
        serde_wasm_bindgen::to_value(&panel).map_err(js_error)
    }

    #[wasm_bindgen(js_name = "moveLayer")]
    pub fn move_layer(&mut self, from: usize, to: usize) -> Result<(), JsError> {
        self.viewer.move_layer(from, to).map_err(js_error)
    }

    /// Patches a layer's style from a JSON object such as `{"weight": 2}`.
    #[wasm_bindgen(js_name = "updateStyleJson")]
    pub fn update_style_json(&mut self, index: usize, patch_json: &str) -> Result<(), JsError> {
        let patch: StylePatch = serde_json::from_str(patch_json)
            .map_err(|e| JsError::new(&format!("Failed to parse style: {}", e)))?;
        self.viewer.update_style(index, &patch).map_err(js_error)?;
        Ok(())
    }

    /// Names of all layers, in draw order.
    #[wasm_bindgen(js_name = "layerNames")]
    pub fn layer_names(&self) -> Vec<String> {
        self.viewer
            .registry()
            .iter()
            .map(|layer| layer.name().to_string())
            .collect()
    }

    /// The style preview listing as an array of `{name, style, active}`.
    pub fn previews(&self) -> Result<JsValue, JsError> {
        serde_wasm_bindgen::to_value(&self.viewer.previews()).map_err(js_error)
    }

    // ---- Export ----

    /// Exports every layer. Returns `{fileName, content}`.
    #[wasm_bindgen(js_name = "exportGeojson")]
    pub fn export_geojson(&mut self, file_name: &str) -> Result<JsValue, JsError> {
        let mut profile = self.viewer.export_profile();
        profile.export.file_name = file_name.to_string();
        self.viewer.apply_profile(&profile);

        let export = self.viewer.export_geojson().map_err(js_error)?;
        serde_wasm_bindgen::to_value(&ExportResult {
            file_name: export.file_name,
            content: export.content,
        })
        .map_err(js_error)
    }

    /// Renders the current view as PNG bytes.
    #[wasm_bindgen(js_name = "renderPng")]
    pub fn render_png(&mut self, width: u32, height: u32) -> Result<Vec<u8>, JsError> {
        self.viewer.export_image(width, height).map_err(js_error)
    }

    // ---- Profile Import/Export ----

    #[wasm_bindgen(js_name = "exportProfileJson")]
    pub fn export_profile_json(&self) -> Result<String, JsError> {
        self.viewer
            .export_profile()
            .to_json()
            .map_err(|e| JsError::new(&format!("Failed to serialize profile: {}", e)))
    }

    #[wasm_bindgen(js_name = "importProfileJson")]
    pub fn import_profile_json(&mut self, json: &str) -> Result<(), JsError> {
        let profile = ViewerProfile::from_json(json)
            .map_err(|e| JsError::new(&format!("Failed to parse profile: {}", e)))?;
        self.viewer.apply_profile(&profile);
        Ok(())
    }

    /// Removes every layer.
    pub fn clear(&mut self) {
        self.viewer.clear();
    }
}
