//! geostyle: per-layer styling for GeoJSON viewers
//!
//! This crate turns GeoJSON documents into independently styled layers,
//! keeps them ordered on a map surface and writes them back out as one
//! `FeatureCollection` with every style flattened into feature properties.
//!
//! # Example
//!
//! ```
//! use geostyle::{GeometryKind, HexColor, SnapshotSurface, StylePatch, Viewer};
//!
//! let mut viewer = Viewer::new(SnapshotSurface::new());
//! viewer
//!     .load_text(
//!         "parks.geojson",
//!         r#"{"type":"Feature","properties":{"name":"park"},
//!             "geometry":{"type":"Polygon","coordinates":[[[0,0],[1,0],[1,1],[0,0]]]}}"#,
//!     )
//!     .unwrap();
//!
//! // Edit the active layer the way the style panel does
//! viewer
//!     .update_active_style(
//!         &StylePatch::new()
//!             .with_fill_color(HexColor::new(0x22, 0xaa, 0x44))
//!             .with_fill_opacity(0.0),
//!     )
//!     .unwrap();
//!
//! let layer = viewer.registry().get(0).unwrap();
//! let params = geostyle::resolve(GeometryKind::Polygon, layer.style());
//! assert_eq!(params.as_path().unwrap().fill, Some(false));
//!
//! let export = viewer.export_geojson().unwrap();
//! assert!(export.content.contains("\"fillOpacity\":0.0"));
//! ```
//!
//! # Surfaces
//!
//! Drawing goes through the [`MapSurface`] trait. [`SnapshotSurface`] is the
//! built-in implementation; it renders the current view to PNG.
//!
//! # Serializable Profiles
//!
//! Defaults shared between frontends live in a [`ViewerProfile`], applied
//! through the [`Configurable`] trait:
//!
//! ```
//! use geostyle::{Configurable, SnapshotSurface, StylePatch, Viewer, ViewerProfile};
//!
//! let mut viewer = Viewer::new(SnapshotSurface::new());
//! viewer.apply_profile(
//!     &ViewerProfile::new().with_default_style(StylePatch::new().with_stroke_weight(1)),
//! );
//!
//! let json = viewer.export_profile().to_json().unwrap();
//! assert!(json.contains("\"weight\":1"));
//! ```

mod error;
mod layer;
mod profile;
mod resolver;
mod style;
mod viewer;

pub mod export;
pub mod import;

#[cfg(feature = "wasm")]
mod bindings;

#[cfg(feature = "wasm")]
pub use bindings::WasmViewer;
pub use error::{Result, ViewerError};
pub use layer::svg::Projection;
pub use layer::{
    Bounds, Layer, LayerPreview, LayerRegistry, MapSurface, PanelState, SnapshotHandle,
    SnapshotSurface,
};
pub use profile::{ExportSettings, SnapshotSettings, ViewerProfile};
pub use resolver::{
    FeatureStyler, GeometryKind, LayerStyler, MarkerParams, PathParams, RenderParams, resolve,
};
pub use style::{HexColor, StylePatch, StyleRecord};
pub use viewer::{
    Configurable, EDITOR_SOURCE, GeoJsonExport, LoadReport, StringEditor, TextEditor, Viewer,
};
