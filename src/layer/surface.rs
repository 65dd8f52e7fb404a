//! The mapping collaborator contract.
//!
//! A [`MapSurface`] turns GeoJSON into drawable objects and owns how they
//! appear on screen. The registry only ever holds opaque handles.

use geojson::{Feature, GeoJson, Geometry, Value};

use crate::resolver::FeatureStyler;

// ============================================================================
// Bounds
// ============================================================================

/// A longitude/latitude bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl Bounds {
    /// Creates a box around a single position.
    pub fn from_point(lon: f64, lat: f64) -> Self {
        Self {
            min_lon: lon,
            min_lat: lat,
            max_lon: lon,
            max_lat: lat,
        }
    }

    /// Grows the box to include a position.
    pub fn extend(&mut self, lon: f64, lat: f64) {
        self.min_lon = self.min_lon.min(lon);
        self.min_lat = self.min_lat.min(lat);
        self.max_lon = self.max_lon.max(lon);
        self.max_lat = self.max_lat.max(lat);
    }

    /// Returns the smallest box containing both.
    pub fn union(&self, other: &Bounds) -> Bounds {
        let mut merged = *self;
        merged.extend(other.min_lon, other.min_lat);
        merged.extend(other.max_lon, other.max_lat);
        merged
    }

    /// Returns true if all corners are finite and ordered.
    ///
    /// A single point is a valid (zero-area) box.
    pub fn is_valid(&self) -> bool {
        [self.min_lon, self.min_lat, self.max_lon, self.max_lat]
            .iter()
            .all(|v| v.is_finite())
            && self.min_lon <= self.max_lon
            && self.min_lat <= self.max_lat
    }

    pub fn width(&self) -> f64 {
        self.max_lon - self.min_lon
    }

    pub fn height(&self) -> f64 {
        self.max_lat - self.min_lat
    }

    /// Computes the bounds of every position in a GeoJSON object.
    ///
    /// Returns `None` when the object has no positions or any position is
    /// malformed.
    pub fn of_geojson(geojson: &GeoJson) -> Option<Bounds> {
        let mut acc = BoundsAccumulator::default();
        match geojson {
            GeoJson::Geometry(geometry) => acc.geometry(geometry),
            GeoJson::Feature(feature) => acc.feature(feature),
            GeoJson::FeatureCollection(collection) => {
                collection.features.iter().for_each(|f| acc.feature(f))
            }
        }
        acc.finish()
    }

    /// Computes the bounds of one feature.
    pub fn of_feature(feature: &Feature) -> Option<Bounds> {
        let mut acc = BoundsAccumulator::default();
        acc.feature(feature);
        acc.finish()
    }
}

#[derive(Default)]
struct BoundsAccumulator {
    bounds: Option<Bounds>,
    malformed: bool,
}

impl BoundsAccumulator {
    fn feature(&mut self, feature: &Feature) {
        if let Some(geometry) = &feature.geometry {
            self.geometry(geometry);
        }
    }

    fn geometry(&mut self, geometry: &Geometry) {
        match &geometry.value {
            Value::Point(p) => self.position(p),
            Value::MultiPoint(ps) | Value::LineString(ps) => {
                ps.iter().for_each(|p| self.position(p))
            }
            Value::MultiLineString(lines) | Value::Polygon(lines) => lines
                .iter()
                .flatten()
                .for_each(|p| self.position(p)),
            Value::MultiPolygon(polygons) => polygons
                .iter()
                .flatten()
                .flatten()
                .for_each(|p| self.position(p)),
            Value::GeometryCollection(geometries) => {
                geometries.iter().for_each(|g| self.geometry(g))
            }
        }
    }

    fn position(&mut self, position: &[f64]) {
        let [lon, lat, ..] = position else {
            self.malformed = true;
            return;
        };
        match &mut self.bounds {
            Some(bounds) => bounds.extend(*lon, *lat),
            None => self.bounds = Some(Bounds::from_point(*lon, *lat)),
        }
    }

    fn finish(self) -> Option<Bounds> {
        if self.malformed {
            return None;
        }
        self.bounds.filter(Bounds::is_valid)
    }
}

// ============================================================================
// MapSurface
// ============================================================================

/// The mapping collaborator consumed by the layer registry.
///
/// Handles are created from GeoJSON plus a [`FeatureStyler`], owned by
/// exactly one layer and given back through [`release`](Self::release) when
/// the layer goes away. View order is submission order: the last handle
/// added to the view draws on top.
pub trait MapSurface {
    /// Opaque drawable representing one layer.
    type Handle;

    /// Builds a drawable for `data`, styling each feature through `styler`.
    fn add_geojson(&mut self, data: &GeoJson, styler: &dyn FeatureStyler) -> Self::Handle;

    /// Returns the drawable's bounds, or `None` if they are degenerate.
    fn bounds(&self, handle: &Self::Handle) -> Option<Bounds>;

    /// Moves the view so the bounds are visible.
    fn fit_bounds(&mut self, bounds: Bounds);

    /// Re-resolves the style of every feature in the drawable.
    fn set_style(&mut self, handle: &mut Self::Handle, styler: &dyn FeatureStyler);

    /// Re-resolves the style of the drawable's point markers.
    ///
    /// Markers are separate objects from paths on most surfaces, so they are
    /// restyled in their own pass.
    fn set_marker_style(&mut self, handle: &mut Self::Handle, styler: &dyn FeatureStyler);

    /// Puts the drawable on top of the current view.
    fn add_to_view(&mut self, handle: &Self::Handle);

    /// Takes the drawable out of the view without destroying it.
    fn remove_from_view(&mut self, handle: &Self::Handle);

    /// Destroys the drawable.
    fn release(&mut self, handle: Self::Handle);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> GeoJson {
        json.parse().unwrap()
    }

    #[test]
    fn bounds_cover_all_features() {
        let geojson = parse(
            r#"{"type":"FeatureCollection","features":[
                {"type":"Feature","properties":{},"geometry":{"type":"Point","coordinates":[10.0,-5.0]}},
                {"type":"Feature","properties":{},"geometry":{"type":"LineString","coordinates":[[-3.0,1.0],[4.0,8.0]]}}
            ]}"#,
        );
        let bounds = Bounds::of_geojson(&geojson).unwrap();
        assert_eq!(bounds.min_lon, -3.0);
        assert_eq!(bounds.max_lon, 10.0);
        assert_eq!(bounds.min_lat, -5.0);
        assert_eq!(bounds.max_lat, 8.0);
    }

    #[test]
    fn single_point_bounds_are_valid() {
        let geojson = parse(
            r#"{"type":"Feature","properties":null,"geometry":{"type":"Point","coordinates":[1.5,2.5]}}"#,
        );
        let bounds = Bounds::of_geojson(&geojson).unwrap();
        assert!(bounds.is_valid());
        assert_eq!(bounds.width(), 0.0);
    }

    #[test]
    fn features_without_geometry_have_no_bounds() {
        let geojson = parse(r#"{"type":"Feature","properties":{},"geometry":null}"#);
        assert!(Bounds::of_geojson(&geojson).is_none());
    }

    #[test]
    fn union_spans_both_boxes() {
        let a = Bounds::from_point(0.0, 0.0);
        let b = Bounds::from_point(5.0, -2.0);
        let u = a.union(&b);
        assert_eq!((u.min_lon, u.min_lat, u.max_lon, u.max_lat), (0.0, -2.0, 5.0, 0.0));
    }
}
