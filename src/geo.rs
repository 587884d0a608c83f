// AssetWatch - Asset tracking core
// Copyright (c) 2025 AssetWatch contributors
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Geographic primitives
//!
//! [`GeoPoint`] is the position value carried through the whole system.
//! [`Polygon`] implements the even-odd containment test for any closed ring
//! of three or more vertices.

use serde::{Deserialize, Serialize};

/// Minimum number of vertices that forms a polygon
pub const MIN_POLYGON_VERTICES: usize = 3;

/// A WGS84 position in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Latitude in degrees
    pub latitude: f64,
    /// Longitude in degrees
    pub longitude: f64,
}

impl GeoPoint {
    /// Create a new point
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Check that both coordinates are finite and within WGS84 bounds
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

impl std::fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.6}, {:.6})", self.latitude, self.longitude)
    }
}

/// A closed polygonal ring
///
/// Vertices are kept in insertion order. The edge from the last vertex back
/// to the first is implicit.
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon<'a> {
    vertices: &'a [GeoPoint],
}

impl<'a> Polygon<'a> {
    /// View a vertex slice as a polygon.
    ///
    /// Returns `None` when fewer than [`MIN_POLYGON_VERTICES`] are given.
    pub fn new(vertices: &'a [GeoPoint]) -> Option<Self> {
        if vertices.len() < MIN_POLYGON_VERTICES {
            return None;
        }
        Some(Self { vertices })
    }

    /// Number of vertices
    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    /// Always false: a polygon has at least three vertices
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Even-odd (ray casting) containment test.
    ///
    /// For each edge `(vi, vj)` the edge counts when the point's latitude lies
    /// strictly on one side of exactly one endpoint and the edge's longitude
    /// at that latitude is greater than the point's longitude. The parity of
    /// the counted edges is the result.
    ///
    /// Points lying exactly on an edge are decided by the floating point
    /// arithmetic below; the answer is stable for identical inputs.
    pub fn contains(&self, point: GeoPoint) -> bool {
        let lat = point.latitude;
        let lon = point.longitude;
        let n = self.vertices.len();

        let mut inside = false;
        let mut j = n - 1;
        for i in 0..n {
            let vi = self.vertices[i];
            let vj = self.vertices[j];

            if (vi.latitude > lat) != (vj.latitude > lat) {
                // Straddling edge: latitudes differ, no division by zero
                let crossing = (vj.longitude - vi.longitude) * (lat - vi.latitude)
                    / (vj.latitude - vi.latitude)
                    + vi.longitude;
                if lon < crossing {
                    inside = !inside;
                }
            }
            j = i;
        }

        inside
    }

    /// Axis-aligned bounds as `(south_west, north_east)`
    pub fn bounds(&self) -> (GeoPoint, GeoPoint) {
        let mut sw = self.vertices[0];
        let mut ne = self.vertices[0];
        for v in &self.vertices[1..] {
            sw.latitude = sw.latitude.min(v.latitude);
            sw.longitude = sw.longitude.min(v.longitude);
            ne.latitude = ne.latitude.max(v.latitude);
            ne.longitude = ne.longitude.max(v.longitude);
        }
        (sw, ne)
    }
}
