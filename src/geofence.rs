// AssetWatch - Asset tracking core
// Copyright (c) 2025 AssetWatch contributors
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Geofence containment engine
//!
//! [`GeofenceEngine::evaluate`] maps a boundary, a position sample and the
//! previously known state to the new state and an optional transition. It
//! performs no I/O; callers turn the transition into a [`BreachEvent`] and
//! deliver it.
//!
//! # Alert cadence
//!
//! | previous | new     | transition (default policy) |
//! |----------|---------|-----------------------------|
//! | Unknown  | Inside  | none                        |
//! | Unknown  | Outside | exited                      |
//! | Inside   | Outside | exited                      |
//! | Outside  | Inside  | entered                     |
//! | Outside  | Outside | exited (every sample)       |
//! | Inside   | Inside  | none                        |

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::boundary::GeofenceBoundary;
use crate::geo::GeoPoint;
use crate::telemetry::AssetId;

/// Containment state of a tracked asset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeofenceState {
    /// No complete boundary, or no sample evaluated yet
    #[default]
    Unknown,
    /// Inside the boundary
    Inside,
    /// Outside the boundary
    Outside,
}

impl GeofenceState {
    pub fn as_str(&self) -> &'static str {
        match self {
            GeofenceState::Unknown => "unknown",
            GeofenceState::Inside => "inside",
            GeofenceState::Outside => "outside",
        }
    }
}

/// Direction of a boundary transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreachKind {
    /// The asset is (now) inside
    Entered,
    /// The asset is (still) outside
    Exited,
}

impl BreachKind {
    /// Wire name of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            BreachKind::Entered => "entered",
            BreachKind::Exited => "exited",
        }
    }
}

impl std::fmt::Display for BreachKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A detected boundary event, handed to the alert sink
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreachEvent {
    /// Asset that produced the sample
    pub asset_id: AssetId,
    /// Event name
    #[serde(rename = "event")]
    pub kind: BreachKind,
    /// Sample position
    pub position: GeoPoint,
    /// Detection time
    pub timestamp: DateTime<Utc>,
}

/// Whether an asset that stays outside keeps producing alerts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RealertPolicy {
    /// Emit `exited` for every sample evaluated outside
    #[default]
    EverySample,
    /// Emit only on state changes (and an initial outside fix)
    TransitionsOnly,
}

/// Result of evaluating one sample
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Evaluation {
    /// State after this sample
    pub state: GeofenceState,
    /// Transition to alert on, if any
    pub transition: Option<BreachKind>,
}

impl Evaluation {
    /// Attach the sample context to the transition
    pub fn into_event(
        self,
        asset_id: AssetId,
        position: GeoPoint,
        timestamp: DateTime<Utc>,
    ) -> Option<BreachEvent> {
        self.transition.map(|kind| BreachEvent {
            asset_id,
            kind,
            position,
            timestamp,
        })
    }
}

/// Stateless geofence evaluator
#[derive(Debug, Clone, Copy, Default)]
pub struct GeofenceEngine {
    realert: RealertPolicy,
}

impl GeofenceEngine {
    /// Engine with the default (every sample) re-alert policy
    pub fn new() -> Self {
        Self::default()
    }

    /// Engine with an explicit re-alert policy
    pub fn with_policy(realert: RealertPolicy) -> Self {
        Self { realert }
    }

    /// Re-alert policy in use
    pub fn policy(&self) -> RealertPolicy {
        self.realert
    }

    /// Evaluate one position sample.
    ///
    /// An incomplete boundary yields `Unknown` and no transition.
    pub fn evaluate(
        &self,
        boundary: &GeofenceBoundary,
        point: GeoPoint,
        previous: GeofenceState,
    ) -> Evaluation {
        let inside = match boundary.contains(point) {
            Some(inside) => inside,
            None => {
                return Evaluation {
                    state: GeofenceState::Unknown,
                    transition: None,
                }
            }
        };

        let state = if inside {
            GeofenceState::Inside
        } else {
            GeofenceState::Outside
        };

        let transition = match (previous, state) {
            (_, GeofenceState::Unknown) => None,
            (GeofenceState::Unknown, GeofenceState::Inside) => None,
            (GeofenceState::Unknown, GeofenceState::Outside) => Some(BreachKind::Exited),
            (GeofenceState::Inside, GeofenceState::Inside) => None,
            (GeofenceState::Inside, GeofenceState::Outside) => Some(BreachKind::Exited),
            (GeofenceState::Outside, GeofenceState::Inside) => Some(BreachKind::Entered),
            (GeofenceState::Outside, GeofenceState::Outside) => match self.realert {
                RealertPolicy::EverySample => Some(BreachKind::Exited),
                RealertPolicy::TransitionsOnly => None,
            },
        };

        Evaluation { state, transition }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Hexagon of radius ~0.05 degrees around (9.03, 38.74)
    fn hexagon() -> GeofenceBoundary {
        GeofenceBoundary::from_vertices([
            GeoPoint::new(9.08, 38.74),
            GeoPoint::new(9.055, 38.79),
            GeoPoint::new(9.005, 38.79),
            GeoPoint::new(8.98, 38.74),
            GeoPoint::new(9.005, 38.69),
            GeoPoint::new(9.055, 38.69),
        ])
    }

    const INSIDE: GeoPoint = GeoPoint::new(9.03, 38.74);
    const OUTSIDE: GeoPoint = GeoPoint::new(9.10, 38.90);

    #[test]
    fn test_incomplete_boundary_is_unknown() {
        let engine = GeofenceEngine::new();
        let mut boundary = GeofenceBoundary::new();
        for v in hexagon().vertices().into_iter().take(5) {
            boundary.push(v);
            for previous in [
                GeofenceState::Unknown,
                GeofenceState::Inside,
                GeofenceState::Outside,
            ] {
                let eval = engine.evaluate(&boundary, OUTSIDE, previous);
                assert_eq!(eval.state, GeofenceState::Unknown);
                assert!(eval.transition.is_none());
            }
        }
    }

    #[test]
    fn test_unknown_to_inside_is_silent() {
        let eval = GeofenceEngine::new().evaluate(&hexagon(), INSIDE, GeofenceState::Unknown);
        assert_eq!(eval.state, GeofenceState::Inside);
        assert!(eval.transition.is_none());
    }

    #[test]
    fn test_unknown_to_outside_alerts() {
        let eval = GeofenceEngine::new().evaluate(&hexagon(), OUTSIDE, GeofenceState::Unknown);
        assert_eq!(eval.state, GeofenceState::Outside);
        assert_eq!(eval.transition, Some(BreachKind::Exited));
    }

    #[test]
    fn test_exit_and_reentry() {
        let engine = GeofenceEngine::new();
        let out = engine.evaluate(&hexagon(), OUTSIDE, GeofenceState::Inside);
        assert_eq!(out.transition, Some(BreachKind::Exited));
        let back = engine.evaluate(&hexagon(), INSIDE, out.state);
        assert_eq!(back.state, GeofenceState::Inside);
        assert_eq!(back.transition, Some(BreachKind::Entered));
    }

    #[test]
    fn test_inside_to_inside_never_alerts() {
        let engine = GeofenceEngine::new();
        let mut state = GeofenceState::Inside;
        for _ in 0..5 {
            let eval = engine.evaluate(&hexagon(), INSIDE, state);
            assert!(eval.transition.is_none());
            state = eval.state;
        }
    }

    #[test]
    fn test_outside_realerts_every_sample() {
        let engine = GeofenceEngine::new();
        let mut state = GeofenceState::Outside;
        let mut events = 0;
        for _ in 0..3 {
            let eval = engine.evaluate(&hexagon(), OUTSIDE, state);
            if eval.transition == Some(BreachKind::Exited) {
                events += 1;
            }
            state = eval.state;
        }
        assert_eq!(events, 3);
    }

    #[test]
    fn test_transitions_only_policy() {
        let engine = GeofenceEngine::with_policy(RealertPolicy::TransitionsOnly);
        let first = engine.evaluate(&hexagon(), OUTSIDE, GeofenceState::Unknown);
        assert_eq!(first.transition, Some(BreachKind::Exited));
        let second = engine.evaluate(&hexagon(), OUTSIDE, first.state);
        assert!(second.transition.is_none());
        let third = engine.evaluate(&hexagon(), INSIDE, second.state);
        assert_eq!(third.transition, Some(BreachKind::Entered));
    }

    #[test]
    fn test_evaluation_deterministic() {
        let engine = GeofenceEngine::new();
        for point in [INSIDE, OUTSIDE, GeoPoint::new(9.08, 38.74)] {
            for previous in [
                GeofenceState::Unknown,
                GeofenceState::Inside,
                GeofenceState::Outside,
            ] {
                let a = engine.evaluate(&hexagon(), point, previous);
                let b = engine.evaluate(&hexagon(), point, previous);
                assert_eq!(a, b);
            }
        }
    }

    #[test]
    fn test_into_event() {
        let now = Utc::now();
        let eval = GeofenceEngine::new().evaluate(&hexagon(), OUTSIDE, GeofenceState::Inside);
        let event = eval
            .into_event(AssetId::from("Car-1"), OUTSIDE, now)
            .unwrap();
        assert_eq!(event.kind, BreachKind::Exited);
        assert_eq!(event.asset_id.as_str(), "Car-1");
        assert_eq!(event.position, OUTSIDE);
        assert_eq!(event.timestamp, now);

        let quiet = GeofenceEngine::new().evaluate(&hexagon(), INSIDE, GeofenceState::Inside);
        assert!(quiet.into_event(AssetId::from("Car-1"), INSIDE, now).is_none());
    }

    #[test]
    fn test_event_wire_names() {
        assert_eq!(BreachKind::Entered.as_str(), "entered");
        assert_eq!(BreachKind::Exited.to_string(), "exited");
    }
}
