//! Serializable result snapshots.
//!
//! These are plain data types for export by front ends; the core owns no
//! file format.

use pn_core::Real;
use serde::{Deserialize, Serialize};

/// One point on a saturation-vs-pressure curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurvePoint {
    /// Applied (ordinary) or running-max (invasion) capillary pressure.
    pub pressure: Real,
    /// Invading-phase saturation, in `[0, 1]`.
    pub saturation: Real,
}

/// Ordered saturation-vs-pressure curve.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PercolationCurve {
    points: Vec<CurvePoint>,
}

impl PercolationCurve {
    pub(crate) fn new(points: Vec<CurvePoint>) -> Self {
        Self { points }
    }

    pub fn points(&self) -> &[CurvePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Saturation at the last (highest-pressure) point.
    pub fn final_saturation(&self) -> Option<Real> {
        self.points.last().map(|p| p.saturation)
    }
}

/// Full invasion-state snapshot for export.
///
/// Sequence and cluster arrays use `-1` for elements never invaded; the
/// trapped vectors are empty until a trapping pass is attached.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvasionReport {
    pub pore_sequence: Vec<i64>,
    pub throat_sequence: Vec<i64>,
    pub pore_clusters: Vec<i64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pore_trapped: Vec<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub throat_trapped: Vec<bool>,
}

impl InvasionReport {
    /// Attach the outcome of a trapping pass.
    pub fn with_trapping(mut self, outcome: &crate::trapping::TrappingOutcome) -> Self {
        self.pore_trapped = outcome.pore_trapped.clone();
        self.throat_trapped = outcome.throat_trapped.clone();
        self
    }
}
