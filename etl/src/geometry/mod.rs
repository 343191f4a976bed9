//! Normalized polygon → WKT conversion.
//!
//! Output uses exactly two decimals per ordinate. Downstream consumers diff these files
//! textually, so the formatting is part of the output contract.

use mongodb::bson::{Bson, Document};

use crate::types::document::number;

/// Convert a GeoJSON-like `Polygon` with coordinates normalized to `[0, 1]` into a closed
/// WKT `POLYGON`, scaling by the image's pixel dimensions.
///
/// Only the outer ring is used. Returns `None` for anything malformed: wrong `type`,
/// missing or empty coordinates, points that are not numeric `[x, y]` pairs, or a zero
/// dimension.
pub fn polygon_to_wkt(geometry: &Document, width: u32, height: u32) -> Option<String> {
    if width == 0 || height == 0 {
        return None;
    }
    if geometry.get_str("type").ok()? != "Polygon" {
        return None;
    }
    let outer = geometry.get_array("coordinates").ok()?.first()?.as_array()?;
    ring_to_wkt(outer, f64::from(width), f64::from(height))
}

/// Format one ring, appending the first point when the ring is open.
///
/// Closure is decided on the formatted points, so two inputs that differ below the
/// second decimal count as the same point.
pub fn ring_to_wkt(ring: &[Bson], width: f64, height: f64) -> Option<String> {
    let mut points = ring.iter().map(|point| format_point(point, width, height)).collect::<Option<Vec<_>>>()?;
    let first = points.first()?.clone();
    if points.last() != Some(&first) {
        points.push(first);
    }
    Some(format!("POLYGON (({}))", points.join(", ")))
}

fn format_point(point: &Bson, width: f64, height: f64) -> Option<String> {
    let [x, y] = point.as_array()?.as_slice() else {
        return None;
    };
    let px = number(x)? * width;
    let py = number(y)? * height;
    if !px.is_finite() || !py.is_finite() {
        return None;
    }
    Some(format!("{:.2} {:.2}", px, py))
}
