//! Viewer controller: the single owner of the layer registry.
//!
//! [`Viewer`] ties the pieces together. It reads GeoJSON from files or from a
//! text editor, turns it into layers on a [`MapSurface`], forwards style
//! edits and produces exports. Every method is scoped: a failure leaves the
//! registry exactly as it was before the call.

use std::fmt;
use std::ops::Range;
use std::path::Path;

use log::{error, info};

use crate::error::{Result, ViewerError};
use crate::export::{export_file_name, serialize};
use crate::import::{normalize, parse};
use crate::layer::{LayerPreview, LayerRegistry, MapSurface, PanelState, SnapshotSurface};
use crate::profile::ViewerProfile;
use crate::style::{StylePatch, StyleRecord};

/// Source name used for layers loaded from the editor.
pub const EDITOR_SOURCE: &str = "editor";

// ============================================================================
// Collaborator traits
// ============================================================================

/// Trait for types that can be configured from a [`ViewerProfile`].
pub trait Configurable {
    /// Applies a profile's settings to this instance.
    fn apply_profile(&mut self, profile: &ViewerProfile);

    /// Exports the current settings as a profile.
    fn export_profile(&self) -> ViewerProfile;
}

/// The text editor collaborator: a widget holding the full GeoJSON text.
pub trait TextEditor {
    fn text(&self) -> String;
    fn set_text(&mut self, text: String);
}

/// A [`TextEditor`] backed by a plain string.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StringEditor {
    text: String,
}

impl StringEditor {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

impl TextEditor for StringEditor {
    fn text(&self) -> String {
        self.text.clone()
    }

    fn set_text(&mut self, text: String) {
        self.text = text;
    }
}

// ============================================================================
// Reports
// ============================================================================

/// Outcome of a successful load.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadReport {
    pub source_name: String,
    /// Registry indices of the layers that were added.
    pub layers: Range<usize>,
}

impl LoadReport {
    /// Number of layers (features) added.
    pub fn count(&self) -> usize {
        self.layers.len()
    }
}

impl fmt::Display for LoadReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} loaded ({} features)", self.source_name, self.count())
    }
}

/// An export ready to be written or downloaded.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoJsonExport {
    pub file_name: String,
    pub content: String,
}

// ============================================================================
// Viewer
// ============================================================================

/// Main viewer controller.
///
/// # Example
///
/// ```
/// use geostyle::{StylePatch, SnapshotSurface, Viewer};
///
/// let mut viewer = Viewer::new(SnapshotSurface::new());
/// let text = r#"{"type":"FeatureCollection","features":[
///     {"type":"Feature","properties":{},"geometry":{"type":"Point","coordinates":[0,0]}},
///     {"type":"Feature","properties":{},"geometry":{"type":"Point","coordinates":[1,1]}}
/// ]}"#;
///
/// let report = viewer.load_text("points.geojson", text).unwrap();
/// assert_eq!(report.count(), 2);
/// assert_eq!(viewer.registry().active(), Some(1));
///
/// viewer.update_style(0, &StylePatch::new().with_point_radius(3)).unwrap();
/// let export = viewer.export_geojson().unwrap();
/// assert_eq!(export.file_name, "EasyBIMaps.geojson");
/// ```
pub struct Viewer<S: MapSurface, E: TextEditor = StringEditor> {
    surface: S,
    registry: LayerRegistry<S::Handle>,
    editor: Option<E>,
    profile: ViewerProfile,
}

impl<S: MapSurface> Viewer<S> {
    /// Creates a viewer with no editor attached.
    pub fn new(surface: S) -> Self {
        Self {
            surface,
            registry: LayerRegistry::new(),
            editor: None,
            profile: ViewerProfile::default(),
        }
    }
}

impl<S: MapSurface, E: TextEditor> Viewer<S, E> {
    /// Creates a viewer with a text editor attached.
    pub fn with_editor(surface: S, editor: E) -> Self {
        Self {
            surface,
            registry: LayerRegistry::new(),
            editor: Some(editor),
            profile: ViewerProfile::default(),
        }
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn registry(&self) -> &LayerRegistry<S::Handle> {
        &self.registry
    }

    pub fn editor(&self) -> Option<&E> {
        self.editor.as_ref()
    }

    pub fn editor_mut(&mut self) -> Option<&mut E> {
        self.editor.as_mut()
    }

    /// Returns what the style panel should show.
    pub fn panel(&self) -> PanelState {
        self.registry.panel()
    }

    /// Returns the style preview listing.
    pub fn previews(&self) -> Vec<LayerPreview> {
        self.registry.previews()
    }

    // ---- Loading ----

    /// Loads GeoJSON text as one layer per feature.
    ///
    /// Nothing is added unless the whole document is valid.
    pub fn load_text(&mut self, source_name: &str, text: &str) -> Result<LoadReport> {
        let geojson = parse(text, source_name)?;
        self.load_geojson(source_name, geojson)
    }

    fn load_geojson(&mut self, source_name: &str, geojson: geojson::GeoJson) -> Result<LoadReport> {
        let imported = normalize(geojson, source_name)?;

        let start = self.registry.len();
        for layer in imported {
            let patch = self.profile.default_style.overlaid(&layer.style);
            let style = StyleRecord::from_patch(&patch);
            self.registry.add_layer(&mut self.surface, layer.data, layer.name, style);
        }

        let report = LoadReport {
            source_name: source_name.to_string(),
            layers: start..self.registry.len(),
        };
        info!("{report}");
        Ok(report)
    }

    /// Reads and loads a GeoJSON file. The layers are named after the file.
    ///
    /// On success the editor, if any, receives the pretty-printed document.
    pub fn load_file(&mut self, path: impl AsRef<Path>) -> Result<LoadReport> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ViewerError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let source_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let geojson = parse(&text, &source_name)?;
        let pretty = serde_json::to_string_pretty(&geojson)?;
        let report = self.load_geojson(&source_name, geojson)?;

        if let Some(editor) = self.editor.as_mut() {
            editor.set_text(pretty);
        }
        Ok(report)
    }

    /// Loads several files independently.
    ///
    /// A file that fails to load does not affect the others; its error is
    /// returned in its own slot.
    pub fn load_files<P: AsRef<Path>>(&mut self, paths: &[P]) -> Vec<Result<LoadReport>> {
        paths
            .iter()
            .map(|path| {
                let result = self.load_file(path);
                if let Err(e) = &result {
                    error!("{e}");
                }
                result
            })
            .collect()
    }

    /// Loads the editor's text as layers.
    pub fn render_editor(&mut self) -> Result<LoadReport> {
        let text = self.editor.as_ref().map(TextEditor::text).unwrap_or_default();
        if text.trim().is_empty() {
            return Err(ViewerError::EmptyEditor);
        }
        self.load_text(EDITOR_SOURCE, &text)
    }

    // ---- Editing ----

    /// Selects the layer being edited, or clears the selection.
    pub fn set_active(&mut self, index: Option<usize>) -> Result<PanelState> {
        self.registry.set_active(index)
    }

    /// Removes a layer and returns the new panel state.
    pub fn remove_layer(&mut self, index: usize) -> Result<PanelState> {
        let removed = self.registry.remove_layer(&mut self.surface, index)?;
        info!("removed layer {:?}", removed.name());
        Ok(self.registry.panel())
    }

    /// Moves a layer in the draw order.
    pub fn move_layer(&mut self, from: usize, to: usize) -> Result<()> {
        self.registry.move_layer(&mut self.surface, from, to)
    }

    /// Patches one layer's style.
    pub fn update_style(&mut self, index: usize, patch: &StylePatch) -> Result<&StyleRecord> {
        self.registry.update_style(&mut self.surface, index, patch)
    }

    /// Patches the active layer's style, as the style panel does.
    pub fn update_active_style(&mut self, patch: &StylePatch) -> Result<PanelState> {
        if let Some(index) = self.registry.active() {
            self.registry.update_style(&mut self.surface, index, patch)?;
        }
        Ok(self.registry.panel())
    }

    /// Patches every layer's style.
    pub fn update_all_styles(&mut self, patch: &StylePatch) -> Result<()> {
        for index in 0..self.registry.len() {
            self.registry.update_style(&mut self.surface, index, patch)?;
        }
        Ok(())
    }

    /// Removes every layer.
    pub fn clear(&mut self) {
        self.registry.clear(&mut self.surface);
    }

    // ---- Export ----

    /// Exports all layers as one styled `FeatureCollection`.
    ///
    /// With no layers, falls back to the editor text if it parses as JSON.
    /// With neither, fails with [`ViewerError::EmptyExport`].
    pub fn export_geojson(&self) -> Result<GeoJsonExport> {
        let file_name = export_file_name(&self.profile.export.file_name);

        if !self.registry.is_empty() {
            let content = serialize(self.registry.iter())?;
            info!("exporting {} layers as {file_name}", self.registry.len());
            return Ok(GeoJsonExport { file_name, content });
        }

        let text = self.editor.as_ref().map(TextEditor::text).unwrap_or_default();
        if text.trim().is_empty() {
            return Err(ViewerError::EmptyExport);
        }
        serde_json::from_str::<serde_json::Value>(&text)
            .map_err(|e| ViewerError::invalid(EDITOR_SOURCE, e))?;

        info!("no layers loaded; exporting editor text as {file_name}");
        Ok(GeoJsonExport {
            file_name,
            content: text,
        })
    }
}

impl<E: TextEditor> Viewer<SnapshotSurface, E> {
    /// Renders the current view as PNG.
    pub fn export_image(&mut self, width: u32, height: u32) -> Result<Vec<u8>> {
        self.surface.set_background(self.profile.snapshot.background);
        self.surface.render_png(width, height)
    }

    /// Renders the current view at the profile's snapshot size.
    pub fn export_snapshot(&mut self) -> Result<Vec<u8>> {
        let (width, height) = (self.profile.snapshot.width, self.profile.snapshot.height);
        self.export_image(width, height)
    }
}

impl<S: MapSurface, E: TextEditor> Configurable for Viewer<S, E> {
    /// Applies a profile. The default style affects layers loaded afterwards.
    fn apply_profile(&mut self, profile: &ViewerProfile) {
        self.profile = profile.clone();
    }

    fn export_profile(&self) -> ViewerProfile {
        self.profile.clone()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::tests::RecordingSurface;
    use crate::style::HexColor;
    use std::io::Write;

    const THREE_POINTS: &str = r#"{"type":"FeatureCollection","features":[
        {"type":"Feature","properties":{"id":1},"geometry":{"type":"Point","coordinates":[0,0]}},
        {"type":"Feature","properties":{"id":2},"geometry":{"type":"Point","coordinates":[1,1]}},
        {"type":"Feature","properties":{"id":3},"geometry":{"type":"Point","coordinates":[2,2]}}
    ]}"#;

    const ONE_FEATURE: &str =
        r#"{"type":"Feature","properties":{"radius":4},"geometry":{"type":"Point","coordinates":[5,5]}}"#;

    fn write_temp(dir: &tempfile::TempDir, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn collection_loads_one_layer_per_feature() {
        let mut viewer = Viewer::new(RecordingSurface::default());
        let report = viewer.load_text("src", THREE_POINTS).unwrap();

        assert_eq!(report.layers, 0..3);
        let names: Vec<_> = viewer.registry().iter().map(|l| l.name().to_string()).collect();
        assert_eq!(names, vec!["src - feature 1", "src - feature 2", "src - feature 3"]);
        assert_eq!(viewer.registry().active(), Some(2));
    }

    #[test]
    fn bare_feature_file_is_named_after_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_temp(&dir, "a.geojson", ONE_FEATURE);

        let mut viewer = Viewer::new(RecordingSurface::default());
        viewer.load_file(&path).unwrap();

        assert_eq!(viewer.registry().len(), 1);
        let layer = viewer.registry().get(0).unwrap();
        assert_eq!(layer.name(), "a.geojson");
        assert_eq!(layer.style().point_radius, 4);
    }

    #[test]
    fn invalid_input_leaves_registry_unchanged() {
        let mut viewer = Viewer::new(RecordingSurface::default());
        viewer.load_text("ok", ONE_FEATURE).unwrap();

        let err = viewer
            .load_text("geom", r#"{"type":"Point","coordinates":[0,0]}"#)
            .unwrap_err();
        assert!(matches!(err, ViewerError::InvalidGeoJson { .. }));
        assert_eq!(viewer.registry().len(), 1);
        assert_eq!(viewer.registry().active(), Some(0));
    }

    #[test]
    fn failing_file_does_not_block_others() {
        let dir = tempfile::tempdir().unwrap();
        let good = write_temp(&dir, "good.geojson", THREE_POINTS);
        let bad = write_temp(&dir, "bad.geojson", "{ nope");
        let missing = dir.path().join("missing.geojson");

        let mut viewer = Viewer::new(RecordingSurface::default());
        let results = viewer.load_files(&[bad, missing, good]);

        assert!(matches!(results[0], Err(ViewerError::InvalidGeoJson { .. })));
        assert!(matches!(results[1], Err(ViewerError::Io { .. })));
        assert_eq!(results[2].as_ref().unwrap().count(), 3);
        assert_eq!(viewer.registry().len(), 3);
    }

    #[test]
    fn file_load_fills_editor() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_temp(&dir, "a.geojson", ONE_FEATURE);

        let mut viewer = Viewer::with_editor(RecordingSurface::default(), StringEditor::default());
        viewer.load_file(&path).unwrap();

        let text = viewer.editor().unwrap().text();
        assert!(text.contains('\n'), "editor text is pretty-printed");
        assert!(text.contains("\"Feature\""));
    }

    #[test]
    fn render_editor_loads_layers() {
        let mut viewer = Viewer::with_editor(
            RecordingSurface::default(),
            StringEditor::new(THREE_POINTS),
        );
        let report = viewer.render_editor().unwrap();
        assert_eq!(report.count(), 3);
        assert_eq!(viewer.registry().get(0).unwrap().name(), "editor - feature 1");
    }

    #[test]
    fn render_empty_editor_fails() {
        let mut viewer = Viewer::with_editor(
            RecordingSurface::default(),
            StringEditor::new("  \n"),
        );
        assert!(matches!(viewer.render_editor(), Err(ViewerError::EmptyEditor)));
    }

    #[test]
    fn export_without_content_fails() {
        let viewer = Viewer::new(RecordingSurface::default());
        assert!(matches!(viewer.export_geojson(), Err(ViewerError::EmptyExport)));

        let viewer = Viewer::with_editor(RecordingSurface::default(), StringEditor::new(""));
        assert!(matches!(viewer.export_geojson(), Err(ViewerError::EmptyExport)));
    }

    #[test]
    fn export_falls_back_to_editor_text() {
        let viewer = Viewer::with_editor(
            RecordingSurface::default(),
            StringEditor::new(ONE_FEATURE),
        );
        let export = viewer.export_geojson().unwrap();
        assert_eq!(export.content, ONE_FEATURE);

        let broken = Viewer::with_editor(RecordingSurface::default(), StringEditor::new("{"));
        assert!(matches!(broken.export_geojson(), Err(ViewerError::InvalidGeoJson { .. })));
    }

    #[test]
    fn export_uses_profile_file_name() {
        let mut viewer = Viewer::new(RecordingSurface::default());
        viewer.apply_profile(&ViewerProfile::new().with_export_name("parks"));
        viewer.load_text("a", ONE_FEATURE).unwrap();
        assert_eq!(viewer.export_geojson().unwrap().file_name, "parks.geojson");
    }

    #[test]
    fn profile_default_style_sits_under_extracted_style() {
        let mut viewer = Viewer::new(RecordingSurface::default());
        viewer.apply_profile(
            &ViewerProfile::new().with_default_style(
                StylePatch::new()
                    .with_point_radius(20)
                    .with_fill_color(HexColor::new(0, 0, 0)),
            ),
        );
        viewer.load_text("a", ONE_FEATURE).unwrap();

        let style = viewer.registry().get(0).unwrap().style();
        assert_eq!(style.point_radius, 4, "feature's own radius wins");
        assert_eq!(style.fill_color, HexColor::new(0, 0, 0));
        assert_eq!(viewer.export_profile().default_style.point_radius, Some(20));
    }

    #[test]
    fn active_style_edits_follow_selection() {
        let mut viewer = Viewer::new(RecordingSurface::default());
        viewer.load_text("src", THREE_POINTS).unwrap();
        viewer.set_active(Some(0)).unwrap();

        let panel = viewer
            .update_active_style(&StylePatch::new().with_stroke_weight(7))
            .unwrap();
        match panel {
            PanelState::Editing { index, style, .. } => {
                assert_eq!(index, 0);
                assert_eq!(style.stroke_weight, 7);
            }
            PanelState::Hidden => panic!("layer 0 should be active"),
        }
        assert_eq!(viewer.registry().get(1).unwrap().style().stroke_weight, 3);

        viewer.remove_layer(0).unwrap();
        assert_eq!(
            viewer.update_active_style(&StylePatch::new()).unwrap(),
            PanelState::Hidden
        );
    }

    #[test]
    fn export_image_renders_png() {
        let mut viewer = Viewer::new(SnapshotSurface::new());
        viewer.load_text("src", THREE_POINTS).unwrap();
        let png = viewer.export_image(64, 48).unwrap();
        let decoded = image::load_from_memory(&png).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (64, 48));

        viewer.apply_profile(&ViewerProfile::new().with_snapshot(crate::profile::SnapshotSettings {
            width: 20,
            height: 10,
            background: HexColor::new(0, 0, 0),
        }));
        let png = viewer.export_snapshot().unwrap();
        let decoded = image::load_from_memory(&png).unwrap().to_rgba8();
        assert_eq!(decoded.dimensions(), (20, 10));
        assert_eq!(viewer.surface().background(), HexColor::new(0, 0, 0));
    }
}
