// AssetWatch - Asset tracking core
// Copyright (c) 2025 AssetWatch contributors
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Geofence boundary definition
//!
//! A boundary is built one vertex at a time from user input and behaves as a
//! bounded ring buffer: once it holds `capacity` vertices, adding another
//! evicts the oldest. The boundary is *complete* when it holds exactly
//! `capacity` vertices; only complete boundaries are evaluated.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::error::AssetwatchError;
use crate::geo::{GeoPoint, Polygon, MIN_POLYGON_VERTICES};

/// Number of vertices a user-defined geofence must have
pub const REQUIRED_VERTICES: usize = 6;

/// An ordered, bounded sequence of geofence vertices
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "BoundaryRepr")]
pub struct GeofenceBoundary {
    vertices: VecDeque<GeoPoint>,
    capacity: usize,
}

impl GeofenceBoundary {
    /// Create an empty six-vertex boundary
    pub fn new() -> Self {
        Self::with_capacity(REQUIRED_VERTICES)
    }

    /// Create an empty boundary completing at `capacity` vertices.
    ///
    /// Capacities below three are raised to three.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(MIN_POLYGON_VERTICES);
        Self {
            vertices: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Build a six-vertex boundary by pushing each vertex in order
    pub fn from_vertices(vertices: impl IntoIterator<Item = GeoPoint>) -> Self {
        let mut boundary = Self::new();
        for v in vertices {
            boundary.push(v);
        }
        boundary
    }

    /// Append a vertex, evicting the oldest when full.
    ///
    /// Returns the evicted vertex, if any.
    pub fn push(&mut self, vertex: GeoPoint) -> Option<GeoPoint> {
        let evicted = if self.vertices.len() >= self.capacity {
            self.vertices.pop_front()
        } else {
            None
        };
        self.vertices.push_back(vertex);
        evicted
    }

    /// Remove all vertices
    pub fn clear(&mut self) {
        self.vertices.clear();
    }

    /// Number of vertices currently defined
    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    /// True when no vertex is defined
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Vertex count at which the boundary is complete
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// True when the boundary holds exactly `capacity` vertices
    pub fn is_complete(&self) -> bool {
        self.vertices.len() == self.capacity
    }

    /// Vertices in insertion order
    pub fn vertices(&self) -> Vec<GeoPoint> {
        self.vertices.iter().copied().collect()
    }

    /// Containment test against the ring.
    ///
    /// Returns `None` for an incomplete boundary.
    pub fn contains(&self, point: GeoPoint) -> Option<bool> {
        if !self.is_complete() {
            return None;
        }
        let vertices = self.vertices();
        Polygon::new(&vertices).map(|polygon| polygon.contains(point))
    }
}

impl Default for GeofenceBoundary {
    fn default() -> Self {
        Self::new()
    }
}

/// Unchecked wire form of a boundary
#[derive(Deserialize)]
struct BoundaryRepr {
    vertices: Vec<GeoPoint>,
    capacity: usize,
}

impl TryFrom<BoundaryRepr> for GeofenceBoundary {
    type Error = AssetwatchError;

    fn try_from(repr: BoundaryRepr) -> Result<Self, Self::Error> {
        if repr.capacity < MIN_POLYGON_VERTICES {
            return Err(AssetwatchError::InvalidBoundary(format!(
                "capacity {} is below {}",
                repr.capacity, MIN_POLYGON_VERTICES
            )));
        }
        if repr.vertices.len() > repr.capacity {
            return Err(AssetwatchError::InvalidBoundary(format!(
                "{} vertices exceed capacity {}",
                repr.vertices.len(),
                repr.capacity
            )));
        }
        if let Some(bad) = repr.vertices.iter().find(|v| !v.is_valid()) {
            return Err(AssetwatchError::InvalidBoundary(format!(
                "vertex {bad} out of range"
            )));
        }
        Ok(Self {
            vertices: repr.vertices.into(),
            capacity: repr.capacity,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(i: usize) -> GeoPoint {
        GeoPoint::new(i as f64, i as f64 * 2.0)
    }

    #[test]
    fn test_boundary_starts_empty() {
        let boundary = GeofenceBoundary::new();
        assert!(boundary.is_empty());
        assert!(!boundary.is_complete());
        assert_eq!(boundary.capacity(), REQUIRED_VERTICES);
    }

    #[test]
    fn test_boundary_completes_at_six() {
        let mut boundary = GeofenceBoundary::new();
        for i in 0..5 {
            assert!(boundary.push(point(i)).is_none());
            assert!(!boundary.is_complete());
        }
        boundary.push(point(5));
        assert!(boundary.is_complete());
        assert_eq!(boundary.len(), 6);
    }

    #[test]
    fn test_seventh_vertex_evicts_oldest() {
        let mut boundary = GeofenceBoundary::new();
        for i in 0..6 {
            boundary.push(point(i));
        }
        let evicted = boundary.push(point(6));
        assert_eq!(evicted, Some(point(0)));
        assert_eq!(boundary.len(), 6);
        assert_eq!(boundary.vertices()[0], point(1));
        assert_eq!(boundary.vertices()[5], point(6));
    }

    #[test]
    fn test_clear() {
        let mut boundary = GeofenceBoundary::from_vertices((0..6).map(point));
        assert!(boundary.is_complete());
        boundary.clear();
        assert!(boundary.is_empty());
        assert!(boundary.contains(GeoPoint::new(0.0, 0.0)).is_none());
    }

    #[test]
    fn test_capacity_floor() {
        let boundary = GeofenceBoundary::with_capacity(1);
        assert_eq!(boundary.capacity(), MIN_POLYGON_VERTICES);
    }

    #[test]
    fn test_custom_capacity_triangle() {
        let mut boundary = GeofenceBoundary::with_capacity(3);
        boundary.push(GeoPoint::new(0.0, 0.0));
        boundary.push(GeoPoint::new(0.0, 4.0));
        assert_eq!(boundary.contains(GeoPoint::new(1.0, 1.0)), None);
        boundary.push(GeoPoint::new(4.0, 0.0));
        assert_eq!(boundary.contains(GeoPoint::new(1.0, 1.0)), Some(true));
    }

    #[test]
    fn test_serde_roundtrip_keeps_capacity() {
        let boundary = GeofenceBoundary::from_vertices((0..4).map(point));
        let json = serde_json::to_string(&boundary).unwrap();
        let back: GeofenceBoundary = serde_json::from_str(&json).unwrap();
        assert_eq!(back, boundary);
        assert_eq!(back.capacity(), REQUIRED_VERTICES);
    }

    #[test]
    fn test_deserialize_rejects_overfull_ring() {
        let json = serde_json::json!({
            "vertices": (0..7).map(point).collect::<Vec<_>>(),
            "capacity": 6
        });
        let err = serde_json::from_value::<GeofenceBoundary>(json).unwrap_err();
        assert!(err.to_string().contains("exceed capacity"));
    }

    #[test]
    fn test_deserialize_rejects_small_capacity() {
        let json = r#"{ "vertices": [], "capacity": 2 }"#;
        let err = serde_json::from_str::<GeofenceBoundary>(json).unwrap_err();
        assert!(err.to_string().contains("below 3"));
    }

    #[test]
    fn test_deserialize_rejects_invalid_vertex() {
        let json = r#"{ "vertices": [{ "latitude": 95.0, "longitude": 0.0 }], "capacity": 6 }"#;
        assert!(serde_json::from_str::<GeofenceBoundary>(json).is_err());
    }

    #[test]
    fn test_deserialized_full_ring_is_complete() {
        let json = serde_json::json!({
            "vertices": (0..3).map(point).collect::<Vec<_>>(),
            "capacity": 3
        });
        let mut boundary: GeofenceBoundary = serde_json::from_value(json).unwrap();
        assert!(boundary.is_complete());
        assert_eq!(boundary.push(point(3)), Some(point(0)));
        assert!(boundary.is_complete());
    }
}
