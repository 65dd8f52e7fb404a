//! Style resolution: from a geometry kind and a [`StyleRecord`] to the
//! concrete parameters a map surface draws with.
//!
//! [`resolve`] is pure. Surfaces call it through [`LayerStyler`] for every
//! feature on every render and again whenever a layer's style is edited.

use geojson::{Feature, Value};
use serde::Serialize;

use crate::style::{HexColor, StyleRecord};

/// Stroke weight of point markers. Not user-configurable.
pub const MARKER_WEIGHT: u32 = 1;
/// Stroke opacity of point markers. Not user-configurable.
pub const MARKER_OPACITY: f64 = 1.0;
/// Fill opacity of point markers. Not user-configurable.
pub const MARKER_FILL_OPACITY: f64 = 0.7;
/// Stroke opacity of paths.
pub const PATH_OPACITY: f64 = 1.0;

// ============================================================================
// GeometryKind
// ============================================================================

/// The RFC 7946 geometry type of a feature, as far as styling cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GeometryKind {
    Point,
    MultiPoint,
    LineString,
    MultiLineString,
    Polygon,
    MultiPolygon,
    /// Geometry collections and features without geometry.
    Other,
}

impl GeometryKind {
    /// Classifies a geometry value.
    pub fn of_value(value: &Value) -> Self {
        match value {
            Value::Point(_) => Self::Point,
            Value::MultiPoint(_) => Self::MultiPoint,
            Value::LineString(_) => Self::LineString,
            Value::MultiLineString(_) => Self::MultiLineString,
            Value::Polygon(_) => Self::Polygon,
            Value::MultiPolygon(_) => Self::MultiPolygon,
            Value::GeometryCollection(_) => Self::Other,
        }
    }

    /// Classifies a feature by its geometry. Features without geometry are
    /// [`GeometryKind::Other`].
    pub fn of_feature(feature: &Feature) -> Self {
        feature
            .geometry
            .as_ref()
            .map_or(Self::Other, |geometry| Self::of_value(&geometry.value))
    }

    /// Returns true for `Point` and `MultiPoint`.
    pub fn is_point(&self) -> bool {
        matches!(self, Self::Point | Self::MultiPoint)
    }
}

// ============================================================================
// RenderParams
// ============================================================================

/// Drawing parameters for a point marker.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkerParams {
    pub radius: u32,
    pub color: HexColor,
    pub fill_color: HexColor,
    pub weight: u32,
    pub opacity: f64,
    pub fill_opacity: f64,
}

/// Drawing parameters for a line, polygon or other path geometry.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PathParams {
    pub color: HexColor,
    pub weight: u32,
    pub opacity: f64,
    pub fill_color: HexColor,
    pub fill_opacity: f64,
    /// Whether the interior is filled. `None` leaves the surface default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fill: Option<bool>,
}

/// Resolved parameters for one feature.
///
/// Serializes to a flat options object, e.g.
/// `{"color":"#3388ff","weight":3,"opacity":1.0,"fillColor":"#3388ff","fillOpacity":0.2,"fill":true}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RenderParams {
    Marker(MarkerParams),
    Path(PathParams),
}

impl RenderParams {
    /// Returns the marker parameters, if this is a point marker.
    pub fn as_marker(&self) -> Option<&MarkerParams> {
        match self {
            Self::Marker(params) => Some(params),
            Self::Path(_) => None,
        }
    }

    /// Returns the path parameters, if this is not a point marker.
    pub fn as_path(&self) -> Option<&PathParams> {
        match self {
            Self::Path(params) => Some(params),
            Self::Marker(_) => None,
        }
    }
}

// ============================================================================
// Resolution
// ============================================================================

/// Resolves the drawing parameters of a geometry kind under a style.
///
/// Points become markers whose stroke and fill both use the layer's fill
/// color, with fixed weight, opacity and fill opacity. Everything else is a
/// path. Polygons are filled unless the fill opacity is exactly zero; lines
/// are never filled.
///
/// ```
/// use geostyle::{resolve, GeometryKind, StylePatch, StyleRecord};
///
/// let style = StyleRecord::from_patch(&StylePatch::new().with_fill_opacity(0.0));
/// let params = resolve(GeometryKind::Polygon, &style);
/// assert_eq!(params.as_path().unwrap().fill, Some(false));
/// ```
pub fn resolve(kind: GeometryKind, style: &StyleRecord) -> RenderParams {
    if kind.is_point() {
        return RenderParams::Marker(MarkerParams {
            radius: style.point_radius,
            color: style.fill_color,
            fill_color: style.fill_color,
            weight: MARKER_WEIGHT,
            opacity: MARKER_OPACITY,
            fill_opacity: MARKER_FILL_OPACITY,
        });
    }

    let fill = match kind {
        GeometryKind::Polygon | GeometryKind::MultiPolygon => Some(style.fill_opacity != 0.0),
        GeometryKind::LineString | GeometryKind::MultiLineString => Some(false),
        _ => None,
    };

    RenderParams::Path(PathParams {
        color: style.stroke_color,
        weight: style.stroke_weight,
        opacity: PATH_OPACITY,
        fill_color: style.fill_color,
        fill_opacity: style.fill_opacity,
        fill,
    })
}

// ============================================================================
// Styler callbacks
// ============================================================================

/// Per-feature callbacks handed to a map surface.
///
/// `style` is consulted for every feature; `marker` is consulted when the
/// surface turns a point into a marker object.
pub trait FeatureStyler {
    fn style(&self, feature: &Feature) -> RenderParams;

    fn marker(&self, feature: &Feature) -> Option<MarkerParams> {
        match self.style(feature) {
            RenderParams::Marker(params) => Some(params),
            RenderParams::Path(_) => None,
        }
    }
}

/// Resolves every feature of one layer against that layer's style.
#[derive(Debug, Clone, Copy)]
pub struct LayerStyler<'a> {
    style: &'a StyleRecord,
}

impl<'a> LayerStyler<'a> {
    pub fn new(style: &'a StyleRecord) -> Self {
        Self { style }
    }
}

impl FeatureStyler for LayerStyler<'_> {
    fn style(&self, feature: &Feature) -> RenderParams {
        resolve(GeometryKind::of_feature(feature), self.style)
    }
}

// ============================================================================
// Tests
// ============================================================================
