//! Layer infrastructure for the viewer.
//!
//! A [`Layer`] pairs imported GeoJSON with its own [`StyleRecord`] and the
//! surface handle that draws it. The [`LayerRegistry`] keeps layers in draw
//! order and tracks which one, if any, is being edited.
//!
//! # Architecture
//!
//! The registry never draws anything itself. Every operation that changes
//! what is on screen goes through a [`MapSurface`]:
//!
//! ```text
//! add_layer ───► surface.add_geojson(data, LayerStyler) ──► Handle
//!                surface.add_to_view / fit_bounds
//! update_style ► surface.set_style + set_marker_style
//! move_layer ──► surface.remove_from_view / add_to_view for every layer
//! remove_layer ► surface.remove_from_view + release(Handle)
//! ```

pub mod snapshot;
pub mod surface;
pub mod svg;

pub use snapshot::{SnapshotHandle, SnapshotSurface};
pub use surface::{Bounds, MapSurface};

use geojson::{Feature, GeoJson};
use log::{debug, warn};
use serde::Serialize;

use crate::error::{Result, ViewerError};
use crate::resolver::LayerStyler;
use crate::style::{StylePatch, StyleRecord};

// ============================================================================
// Layer
// ============================================================================

/// One named, independently styled piece of GeoJSON.
#[derive(Debug)]
pub struct Layer<H> {
    name: String,
    data: GeoJson,
    style: StyleRecord,
    handle: H,
}

impl<H> Layer<H> {
    /// Returns the layer name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the layer's GeoJSON (a `Feature` or `FeatureCollection`).
    pub fn data(&self) -> &GeoJson {
        &self.data
    }

    /// Returns the layer's style.
    pub fn style(&self) -> &StyleRecord {
        &self.style
    }

    /// Returns the surface handle drawing this layer.
    pub fn handle(&self) -> &H {
        &self.handle
    }

    /// Iterates over the features this layer contributes.
    ///
    /// A `FeatureCollection` contributes all of its features, a `Feature`
    /// contributes itself and a bare geometry contributes nothing.
    pub fn features(&self) -> impl Iterator<Item = &Feature> {
        let features: &[Feature] = match &self.data {
            GeoJson::FeatureCollection(collection) => &collection.features,
            GeoJson::Feature(feature) => std::slice::from_ref(feature),
            GeoJson::Geometry(_) => &[],
        };
        features.iter()
    }
}

// ============================================================================
// Panel State
// ============================================================================

/// What the style panel should show after a registry change.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum PanelState {
    /// No layer is active; the panel is hidden.
    Hidden,
    /// The panel edits the active layer.
    Editing {
        index: usize,
        name: String,
        style: StyleRecord,
    },
}

/// A line of the style preview listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayerPreview {
    pub name: String,
    pub style: StyleRecord,
    pub active: bool,
}

// ============================================================================
// Layer Registry
// ============================================================================

/// Ordered layers plus the active layer index.
///
/// Order is draw order: the last layer draws on top. The active index, when
/// present, always addresses an existing layer.
pub struct LayerRegistry<H> {
    layers: Vec<Layer<H>>,
    active: Option<usize>,
}

impl<H> Default for LayerRegistry<H> {
    fn default() -> Self {
        Self {
            layers: Vec::new(),
            active: None,
        }
    }
}

impl<H> LayerRegistry<H> {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Layer<H>> {
        self.layers.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Layer<H>> {
        self.layers.iter()
    }

    /// Returns the active layer index.
    pub fn active(&self) -> Option<usize> {
        self.active
    }

    /// Returns the active layer.
    pub fn active_layer(&self) -> Option<&Layer<H>> {
        self.active.and_then(|index| self.layers.get(index))
    }

    /// Returns the panel state for the current active layer.
    pub fn panel(&self) -> PanelState {
        match self.active_layer() {
            Some(layer) => PanelState::Editing {
                index: self.active.unwrap_or_default(),
                name: layer.name.clone(),
                style: layer.style.clone(),
            },
            None => PanelState::Hidden,
        }
    }

    /// Returns one preview entry per layer, in draw order.
    pub fn previews(&self) -> Vec<LayerPreview> {
        self.layers
            .iter()
            .enumerate()
            .map(|(index, layer)| LayerPreview {
                name: layer.name.clone(),
                style: layer.style.clone(),
                active: self.active == Some(index),
            })
            .collect()
    }

    fn check_index(&self, index: usize) -> Result<()> {
        if index < self.layers.len() {
            Ok(())
        } else {
            Err(ViewerError::IndexOutOfRange {
                index,
                len: self.layers.len(),
            })
        }
    }

    /// Selects the layer being edited, or clears the selection.
    ///
    /// Returns the panel state to display.
    pub fn set_active(&mut self, index: Option<usize>) -> Result<PanelState> {
        if let Some(index) = index {
            self.check_index(index)?;
        }
        self.active = index;
        debug!("active layer set to {:?}", index);
        Ok(self.panel())
    }

    /// Appends a layer, makes it active and fits the view to it.
    ///
    /// Degenerate bounds skip the fit and are not an error.
    pub fn add_layer<S>(
        &mut self,
        surface: &mut S,
        data: GeoJson,
        name: impl Into<String>,
        style: StyleRecord,
    ) -> usize
    where
        S: MapSurface<Handle = H>,
    {
        let name = name.into();
        let handle = surface.add_geojson(&data, &LayerStyler::new(&style));
        surface.add_to_view(&handle);

        match surface.bounds(&handle) {
            Some(bounds) if bounds.is_valid() => surface.fit_bounds(bounds),
            _ => warn!("layer {name:?} has no valid bounds; view left unchanged"),
        }

        debug!("adding layer {name:?} with {style}");
        self.layers.push(Layer {
            name,
            data,
            style,
            handle,
        });
        let index = self.layers.len() - 1;
        self.active = Some(index);
        index
    }

    /// Removes a layer and releases its handle.
    ///
    /// Removing the active layer clears the selection; removing a layer
    /// before it shifts the active index down by one.
    pub fn remove_layer<S>(&mut self, surface: &mut S, index: usize) -> Result<Layer<()>>
    where
        S: MapSurface<Handle = H>,
    {
        self.check_index(index)?;
        let layer = self.layers.remove(index);
        surface.remove_from_view(&layer.handle);

        self.active = match self.active {
            Some(active) if active == index => None,
            Some(active) if active > index => Some(active - 1),
            other => other,
        };

        debug!("removed layer {:?}, active now {:?}", layer.name, self.active);
        let Layer {
            name,
            data,
            style,
            handle,
        } = layer;
        surface.release(handle);
        Ok(Layer {
            name,
            data,
            style,
            handle: (),
        })
    }

    /// Moves a layer to a new position in the draw order.
    ///
    /// Every handle is resubmitted to the surface in the new order so the
    /// view stacks exactly like the registry. Moving a layer onto itself
    /// does nothing. The active selection follows the moved layer.
    pub fn move_layer<S>(&mut self, surface: &mut S, from: usize, to: usize) -> Result<()>
    where
        S: MapSurface<Handle = H>,
    {
        self.check_index(from)?;
        self.check_index(to)?;
        if from == to {
            return Ok(());
        }

        let moved = self.layers.remove(from);
        self.layers.insert(to, moved);

        self.active = self.active.map(|active| shifted_index(active, from, to));

        for layer in &self.layers {
            surface.remove_from_view(&layer.handle);
            surface.add_to_view(&layer.handle);
        }

        debug!("moved layer {from} to {to}");
        Ok(())
    }

    /// Merges a patch into a layer's style and restyles its features.
    ///
    /// Paths and point markers are restyled in separate passes.
    pub fn update_style<S>(
        &mut self,
        surface: &mut S,
        index: usize,
        patch: &StylePatch,
    ) -> Result<&StyleRecord>
    where
        S: MapSurface<Handle = H>,
    {
        self.check_index(index)?;
        let layer = &mut self.layers[index];
        layer.style.apply(patch);

        let styler = LayerStyler::new(&layer.style);
        surface.set_style(&mut layer.handle, &styler);
        surface.set_marker_style(&mut layer.handle, &styler);

        debug!("restyled layer {:?}: {}", layer.name, layer.style);
        Ok(&layer.style)
    }

    /// Removes every layer, releasing all handles.
    pub fn clear<S>(&mut self, surface: &mut S)
    where
        S: MapSurface<Handle = H>,
    {
        for layer in self.layers.drain(..) {
            surface.remove_from_view(&layer.handle);
            surface.release(layer.handle);
        }
        self.active = None;
    }
}

/// Where an index ends up after the element at `from` moves to `to`.
fn shifted_index(index: usize, from: usize, to: usize) -> usize {
    if index == from {
        to
    } else if from < index && index <= to {
        index - 1
    } else if to <= index && index < from {
        index + 1
    } else {
        index
    }
}

// ============================================================================
// Tests
// ============================================================================
