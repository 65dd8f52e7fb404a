//! An in-memory map surface that can be rendered to an image.
//!
//! [`SnapshotSurface`] keeps the resolved parameters of every feature it has
//! been given and rasterizes the current view on request. It backs headless
//! use, the CLI and the exported-image feature.

use std::collections::HashMap;

use geojson::{Feature, GeoJson};
use image::RgbaImage;
use log::debug;

use super::surface::{Bounds, MapSurface};
use super::svg::{Projection, SceneBuilder, encode_png, rasterize};
use crate::error::{Result, ViewerError};
use crate::resolver::{FeatureStyler, RenderParams};
use crate::style::HexColor;

/// View shown before anything has been fitted.
const WORLD: Bounds = Bounds {
    min_lon: -180.0,
    min_lat: -85.0,
    max_lon: 180.0,
    max_lat: 85.0,
};

/// Handle to a drawable owned by a [`SnapshotSurface`].
///
/// Deliberately not `Clone`: each handle belongs to exactly one layer.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct SnapshotHandle(u64);

impl SnapshotHandle {
    /// Returns the surface-wide identifier of this drawable.
    pub fn id(&self) -> u64 {
        self.0
    }
}

#[derive(Debug)]
struct StyledFeature {
    feature: Feature,
    params: RenderParams,
}

#[derive(Debug)]
struct Drawable {
    features: Vec<StyledFeature>,
    bounds: Option<Bounds>,
}

/// A [`MapSurface`] that records drawables and renders them via SVG.
#[derive(Debug)]
pub struct SnapshotSurface {
    next_id: u64,
    drawables: HashMap<u64, Drawable>,
    view: Vec<u64>,
    viewport: Option<Bounds>,
    background: HexColor,
}

impl Default for SnapshotSurface {
    fn default() -> Self {
        Self {
            next_id: 0,
            drawables: HashMap::new(),
            view: Vec::new(),
            viewport: None,
            background: HexColor::new(0xff, 0xff, 0xff),
        }
    }
}

impl SnapshotSurface {
    /// Creates an empty surface with a white background.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the background color of rendered images.
    pub fn set_background(&mut self, color: HexColor) {
        self.background = color;
    }

    pub fn background(&self) -> HexColor {
        self.background
    }

    /// Returns the last fitted bounds.
    pub fn viewport(&self) -> Option<Bounds> {
        self.viewport
    }

    /// Returns drawable ids in view (draw) order.
    pub fn view_order(&self) -> &[u64] {
        &self.view
    }

    /// Returns the number of live drawables, in view or not.
    pub fn drawable_count(&self) -> usize {
        self.drawables.len()
    }

    /// Returns the current parameters of every feature of a drawable.
    pub fn params(&self, handle: &SnapshotHandle) -> Vec<&RenderParams> {
        self.drawables
            .get(&handle.0)
            .map(|d| d.features.iter().map(|f| &f.params).collect())
            .unwrap_or_default()
    }

    /// Renders the current view to an RGBA image.
    pub fn render(&self, width: u32, height: u32) -> Result<RgbaImage> {
        if width == 0 || height == 0 {
            return Err(ViewerError::Render(format!("invalid image size {width}x{height}")));
        }

        let bounds = self.viewport.unwrap_or(WORLD);
        let projection = Projection::fit(&bounds, width, height);
        let mut scene = SceneBuilder::new(projection, width, height, self.background);
        for id in &self.view {
            let Some(drawable) = self.drawables.get(id) else { continue };
            for styled in &drawable.features {
                if let Some(geometry) = &styled.feature.geometry {
                    scene.geometry(geometry, &styled.params);
                }
            }
        }

        debug!("rasterizing {} drawables at {width}x{height}", self.view.len());
        rasterize(&scene.finish(), width, height)
            .ok_or_else(|| ViewerError::Render("scene could not be rasterized".into()))
    }

    /// Renders the current view as PNG bytes.
    pub fn render_png(&self, width: u32, height: u32) -> Result<Vec<u8>> {
        let image = self.render(width, height)?;
        encode_png(&image).map_err(|e| ViewerError::Render(e.to_string()))
    }
}

fn features_of(data: &GeoJson) -> Vec<Feature> {
    match data {
        GeoJson::FeatureCollection(collection) => collection.features.clone(),
        GeoJson::Feature(feature) => vec![feature.clone()],
        GeoJson::Geometry(geometry) => vec![Feature::from(geometry.clone())],
    }
}

impl MapSurface for SnapshotSurface {
    type Handle = SnapshotHandle;

    fn add_geojson(&mut self, data: &GeoJson, styler: &dyn FeatureStyler) -> SnapshotHandle {
        let features = features_of(data)
            .into_iter()
            .map(|feature| {
                // Points go through the marker callback, everything else
                // through the style callback.
                let params = styler
                    .marker(&feature)
                    .map(RenderParams::Marker)
                    .unwrap_or_else(|| styler.style(&feature));
                StyledFeature { feature, params }
            })
            .collect();

        self.next_id += 1;
        let id = self.next_id;
        self.drawables.insert(
            id,
            Drawable {
                features,
                bounds: Bounds::of_geojson(data),
            },
        );
        SnapshotHandle(id)
    }

    fn bounds(&self, handle: &SnapshotHandle) -> Option<Bounds> {
        self.drawables.get(&handle.0).and_then(|d| d.bounds)
    }

    fn fit_bounds(&mut self, bounds: Bounds) {
        self.viewport = Some(bounds);
    }

    fn set_style(&mut self, handle: &mut SnapshotHandle, styler: &dyn FeatureStyler) {
        if let Some(drawable) = self.drawables.get_mut(&handle.0) {
            for styled in &mut drawable.features {
                styled.params = styler.style(&styled.feature);
            }
        }
    }

    fn set_marker_style(&mut self, handle: &mut SnapshotHandle, styler: &dyn FeatureStyler) {
        if let Some(drawable) = self.drawables.get_mut(&handle.0) {
            for styled in &mut drawable.features {
                if let Some(marker) = styler.marker(&styled.feature) {
                    styled.params = RenderParams::Marker(marker);
                }
            }
        }
    }

    fn add_to_view(&mut self, handle: &SnapshotHandle) {
        self.view.retain(|id| *id != handle.0);
        self.view.push(handle.0);
    }

    fn remove_from_view(&mut self, handle: &SnapshotHandle) {
        self.view.retain(|id| *id != handle.0);
    }

    fn release(&mut self, handle: SnapshotHandle) {
        self.view.retain(|id| *id != handle.0);
        self.drawables.remove(&handle.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::LayerRegistry;
    use crate::style::{StylePatch, StyleRecord};

    fn collection() -> GeoJson {
        r#"{"type":"FeatureCollection","features":[
            {"type":"Feature","properties":{},"geometry":{"type":"Point","coordinates":[0,0]}},
            {"type":"Feature","properties":{},"geometry":{"type":"Polygon","coordinates":[[[1,1],[2,1],[2,2],[1,1]]]}}
        ]}"#
        .parse()
        .unwrap()
    }

    #[test]
    fn add_resolves_markers_and_paths() {
        let mut surface = SnapshotSurface::new();
        let mut registry = LayerRegistry::new();
        registry.add_layer(&mut surface, collection(), "mixed", StyleRecord::default());

        let layer = registry.get(0).unwrap();
        let params = surface.params(layer.handle());
        assert!(params[0].as_marker().is_some());
        assert_eq!(params[1].as_path().unwrap().fill, Some(true));
        assert_eq!(surface.viewport().unwrap().max_lon, 2.0);
    }

    #[test]
    fn restyle_updates_stored_params() {
        let mut surface = SnapshotSurface::new();
        let mut registry = LayerRegistry::new();
        registry.add_layer(&mut surface, collection(), "mixed", StyleRecord::default());
        registry
            .update_style(
                &mut surface,
                0,
                &StylePatch::new().with_fill_opacity(0.0).with_point_radius(3),
            )
            .unwrap();

        let params = surface.params(registry.get(0).unwrap().handle());
        assert_eq!(params[0].as_marker().unwrap().radius, 3);
        assert_eq!(params[1].as_path().unwrap().fill, Some(false));
    }

    #[test]
    fn release_drops_drawable() {
        let mut surface = SnapshotSurface::new();
        let mut registry = LayerRegistry::new();
        registry.add_layer(&mut surface, collection(), "a", StyleRecord::default());
        registry.add_layer(&mut surface, collection(), "b", StyleRecord::default());
        assert_eq!(surface.view_order(), &[1, 2]);

        registry.remove_layer(&mut surface, 0).unwrap();
        assert_eq!(surface.drawable_count(), 1);
        assert_eq!(surface.view_order(), &[2]);
    }

    #[test]
    fn render_png_produces_image() {
        let mut surface = SnapshotSurface::new();
        let mut registry = LayerRegistry::new();
        registry.add_layer(&mut surface, collection(), "a", StyleRecord::default());

        let png = surface.render_png(120, 80).unwrap();
        let decoded = image::load_from_memory(&png).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (120, 80));
    }

    #[test]
    fn render_rejects_zero_size() {
        let surface = SnapshotSurface::new();
        assert!(matches!(surface.render(0, 10), Err(ViewerError::Render(_))));
    }
}
