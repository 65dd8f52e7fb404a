//! SVG scene building and rasterization using resvg/usvg.
//!
//! The snapshot surface describes its current view as an SVG document and
//! rasterizes it here. Coordinates are projected plate-carree into the
//! output pixel grid.

use std::fmt::Write as _;
use std::io::Cursor;

use geojson::{Geometry, Value};
use image::{ImageFormat, RgbaImage};
use resvg::tiny_skia::{Pixmap, Transform};
use resvg::usvg::{Options, Tree};

use super::surface::Bounds;
use crate::resolver::{MarkerParams, PathParams, RenderParams};
use crate::style::HexColor;

/// Blank margin kept around the fitted bounds, in pixels.
pub const VIEW_PADDING: f64 = 16.0;

/// Span (degrees) used when the view collapses to a single point.
const MIN_SPAN: f64 = 0.01;

/// Marker radius for points nested in geometry collections, which have no
/// marker parameters of their own.
const COLLECTION_POINT_RADIUS: u32 = 10;

// ============================================================================
// Projection
// ============================================================================

/// Maps longitude/latitude into pixel space for one output size.
#[derive(Debug, Clone, Copy)]
pub struct Projection {
    scale: f64,
    offset_x: f64,
    offset_y: f64,
    min_lon: f64,
    max_lat: f64,
}

impl Projection {
    /// Fits `bounds` into a `width` x `height` image, centered, preserving
    /// aspect ratio.
    pub fn fit(bounds: &Bounds, width: u32, height: u32) -> Self {
        let span_x = bounds.width().max(MIN_SPAN);
        let span_y = bounds.height().max(MIN_SPAN);
        let center_lon = (bounds.min_lon + bounds.max_lon) / 2.0;
        let center_lat = (bounds.min_lat + bounds.max_lat) / 2.0;

        let avail_x = (width as f64 - 2.0 * VIEW_PADDING).max(1.0);
        let avail_y = (height as f64 - 2.0 * VIEW_PADDING).max(1.0);
        let scale = (avail_x / span_x).min(avail_y / span_y);

        let min_lon = center_lon - span_x / 2.0;
        let max_lat = center_lat + span_y / 2.0;
        Self {
            scale,
            offset_x: (width as f64 - span_x * scale) / 2.0,
            offset_y: (height as f64 - span_y * scale) / 2.0,
            min_lon,
            max_lat,
        }
    }

    /// Projects a position to `(x, y)` pixels.
    pub fn project(&self, lon: f64, lat: f64) -> (f64, f64) {
        (
            self.offset_x + (lon - self.min_lon) * self.scale,
            self.offset_y + (self.max_lat - lat) * self.scale,
        )
    }
}

// ============================================================================
// Scene building
// ============================================================================

/// Builds SVG markup for styled features.
pub struct SceneBuilder {
    projection: Projection,
    body: String,
    width: u32,
    height: u32,
    background: HexColor,
}

impl SceneBuilder {
    pub fn new(projection: Projection, width: u32, height: u32, background: HexColor) -> Self {
        Self {
            projection,
            body: String::new(),
            width,
            height,
            background,
        }
    }

    /// Draws one geometry with its resolved parameters.
    pub fn geometry(&mut self, geometry: &Geometry, params: &RenderParams) {
        match params {
            RenderParams::Marker(marker) => self.markers(&geometry.value, marker),
            RenderParams::Path(path) => self.paths(&geometry.value, path),
        }
    }

    fn markers(&mut self, value: &Value, marker: &MarkerParams) {
        match value {
            Value::Point(p) => self.circle(p, marker),
            Value::MultiPoint(ps) => ps.iter().for_each(|p| self.circle(p, marker)),
            // Marker params only ever come from point kinds.
            _ => {}
        }
    }

    fn paths(&mut self, value: &Value, path: &PathParams) {
        match value {
            Value::LineString(line) => self.line(line, path),
            Value::MultiLineString(lines) => lines.iter().for_each(|l| self.line(l, path)),
            Value::Polygon(rings) => self.polygon(rings, path),
            Value::MultiPolygon(polygons) => polygons.iter().for_each(|r| self.polygon(r, path)),
            Value::GeometryCollection(members) => {
                for member in members {
                    self.paths(&member.value, path);
                }
            }
            Value::Point(p) => self.circle(p, &collection_marker(path)),
            Value::MultiPoint(ps) => {
                let marker = collection_marker(path);
                ps.iter().for_each(|p| self.circle(p, &marker));
            }
        }
    }

    fn circle(&mut self, position: &[f64], marker: &MarkerParams) {
        let [lon, lat, ..] = position else { return };
        let (x, y) = self.projection.project(*lon, *lat);
        let _ = writeln!(
            self.body,
            r#"<circle cx="{x:.2}" cy="{y:.2}" r="{}" fill="{}" fill-opacity="{}" stroke="{}" stroke-width="{}" stroke-opacity="{}"/>"#,
            marker.radius,
            marker.fill_color,
            marker.fill_opacity,
            marker.color,
            marker.weight,
            marker.opacity,
        );
    }

    fn line(&mut self, line: &[Vec<f64>], path: &PathParams) {
        let d = self.path_data(line, false);
        if d.is_empty() {
            return;
        }
        let _ = writeln!(
            self.body,
            r#"<path d="{d}" fill="none" stroke="{}" stroke-width="{}" stroke-opacity="{}" stroke-linecap="round" stroke-linejoin="round"/>"#,
            path.color, path.weight, path.opacity,
        );
    }

    fn polygon(&mut self, rings: &[Vec<Vec<f64>>], path: &PathParams) {
        let d: String = rings
            .iter()
            .map(|ring| self.path_data(ring, true))
            .collect::<Vec<_>>()
            .join(" ");
        if d.trim().is_empty() {
            return;
        }
        let fill = if path.fill == Some(false) {
            "none".to_string()
        } else {
            path.fill_color.to_string()
        };
        let _ = writeln!(
            self.body,
            r#"<path d="{d}" fill="{fill}" fill-opacity="{}" fill-rule="evenodd" stroke="{}" stroke-width="{}" stroke-opacity="{}" stroke-linejoin="round"/>"#,
            path.fill_opacity, path.color, path.weight, path.opacity,
        );
    }

    fn path_data(&self, positions: &[Vec<f64>], close: bool) -> String {
        let mut d = String::new();
        for (i, position) in positions.iter().enumerate() {
            let [lon, lat, ..] = position.as_slice() else { continue };
            let (x, y) = self.projection.project(*lon, *lat);
            let cmd = if i == 0 { 'M' } else { 'L' };
            let _ = write!(d, "{cmd}{x:.2} {y:.2} ");
        }
        if close && !d.is_empty() {
            d.push('Z');
        }
        d.trim_end().to_string()
    }

    /// Finishes the document.
    pub fn finish(self) -> String {
        format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}"><rect width="{w}" height="{h}" fill="{bg}"/>
{body}</svg>"#,
            w = self.width,
            h = self.height,
            bg = self.background,
            body = self.body,
        )
    }
}

fn collection_marker(path: &PathParams) -> MarkerParams {
    MarkerParams {
        radius: COLLECTION_POINT_RADIUS,
        color: path.color,
        fill_color: path.fill_color,
        weight: path.weight,
        opacity: path.opacity,
        fill_opacity: path.fill_opacity,
    }
}

// ============================================================================
// Rasterization
// ============================================================================

/// Renders an SVG document to an RGBA image of exactly `width` x `height`.
///
/// Returns `None` if the SVG cannot be parsed or the size is zero.
pub fn rasterize(svg_data: &str, width: u32, height: u32) -> Option<RgbaImage> {
    let opts = Options::default();
    let tree = Tree::from_str(svg_data, &opts).ok()?;

    let svg_size = tree.size();
    let sx = width as f32 / svg_size.width();
    let sy = height as f32 / svg_size.height();

    let mut pixmap = Pixmap::new(width, height)?;
    resvg::render(&tree, Transform::from_scale(sx, sy), &mut pixmap.as_mut());

    pixmap_to_rgba_image(&pixmap)
}

/// Converts a tiny_skia Pixmap to an image::RgbaImage.
fn pixmap_to_rgba_image(pixmap: &Pixmap) -> Option<RgbaImage> {
    // tiny_skia stores premultiplied alpha
    let raw: Vec<u8> = pixmap
        .pixels()
        .iter()
        .flat_map(|pixel| {
            let c = pixel.demultiply();
            [c.red(), c.green(), c.blue(), c.alpha()]
        })
        .collect();
    RgbaImage::from_raw(pixmap.width(), pixmap.height(), raw)
}

/// Encodes an image as PNG bytes.
pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, image::ImageError> {
    let mut bytes = Vec::new();
    image.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
    Ok(bytes)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::{resolve, GeometryKind};
    use crate::style::StyleRecord;

    const WHITE: HexColor = HexColor::new(255, 255, 255);

    fn world() -> Bounds {
        Bounds {
            min_lon: -10.0,
            min_lat: -10.0,
            max_lon: 10.0,
            max_lat: 10.0,
        }
    }

    #[test]
    fn projection_centers_bounds() {
        let projection = Projection::fit(&world(), 100, 100);
        let (x, y) = projection.project(0.0, 0.0);
        assert!((x - 50.0).abs() < 1e-9);
        assert!((y - 50.0).abs() < 1e-9);

        let (left, top) = projection.project(-10.0, 10.0);
        assert!((left - VIEW_PADDING).abs() < 1e-9);
        assert!((top - VIEW_PADDING).abs() < 1e-9);
    }

    #[test]
    fn projection_handles_single_point() {
        let projection = Projection::fit(&Bounds::from_point(3.0, 4.0), 64, 64);
        let (x, y) = projection.project(3.0, 4.0);
        assert!((x - 32.0).abs() < 1e-6);
        assert!((y - 32.0).abs() < 1e-6);
    }

    #[test]
    fn unfilled_polygon_uses_fill_none() {
        let mut style = StyleRecord::default();
        style.fill_opacity = 0.0;
        let params = resolve(GeometryKind::Polygon, &style);

        let mut scene = SceneBuilder::new(Projection::fit(&world(), 100, 100), 100, 100, WHITE);
        let polygon = Geometry::new(Value::Polygon(vec![vec![
            vec![-5.0, -5.0],
            vec![5.0, -5.0],
            vec![5.0, 5.0],
            vec![-5.0, -5.0],
        ]]));
        scene.geometry(&polygon, &params);
        let svg = scene.finish();
        assert!(svg.contains(r#"fill="none""#));
        assert!(svg.contains('Z'));
    }

    #[test]
    fn render_point_marker() {
        let params = resolve(GeometryKind::Point, &StyleRecord::default());
        let mut scene = SceneBuilder::new(Projection::fit(&world(), 64, 64), 64, 64, WHITE);
        scene.geometry(&Geometry::new(Value::Point(vec![0.0, 0.0])), &params);

        let img = rasterize(&scene.finish(), 64, 64).expect("scene should rasterize");
        assert_eq!(img.dimensions(), (64, 64));

        // Center is inside the marker (fill #3388ff), corner is background.
        let center = img.get_pixel(32, 32);
        assert!(center[2] > center[0], "marker should be blue-ish");
        assert_eq!(img.get_pixel(0, 0).0, [255, 255, 255, 255]);
    }

    #[test]
    fn invalid_svg_returns_none() {
        assert!(rasterize("not svg", 10, 10).is_none());
    }

    #[test]
    fn png_encoding_has_signature() {
        let img = RgbaImage::new(4, 4);
        let png = encode_png(&img).unwrap();
        assert_eq!(&png[..4], &[0x89, b'P', b'N', b'G']);
    }
}
