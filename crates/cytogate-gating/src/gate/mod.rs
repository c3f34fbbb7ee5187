//! # Gates
//!
//! A [`Gate`] is a name plus one of a closed set of geometries
//! ([`GateKind`]). Gates are pure predicates: given the parent population
//! and the resolved dimension columns they return a membership mask, and
//! they hold no per-sample state.
//!
//! ## Boundary conventions
//!
//! | Kind | Membership |
//! |---|---|
//! | rectangle / range | `min <= x < max` on every bounded dimension |
//! | polygon | non-zero winding number |
//! | ellipsoid | `(x−μ)ᵀ Σ⁻¹ (x−μ) <= d²` |
//! | quadrant | `min <= x < max` on every divider range |
//! | boolean | AND / OR / NOT of references, within the parent |

pub mod boolean;
pub mod ellipsoid;
pub mod polygon;
pub mod quadrant;
pub mod rectangle;

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use cytogate_core::GateName;

pub use boolean::{BooleanGate, BooleanOp, GateReference};
pub use ellipsoid::{EllipsoidGate, EllipsoidSpec};
pub use polygon::PolygonGate;
pub use quadrant::{Divider, DividerRange, Quadrant, QuadrantGate};
pub use rectangle::RectangleGate;

use crate::dimension::Dimension;

/// Malformed gate geometry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct GeometryError(String);

impl GeometryError {
    pub(crate) fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }

    /// What is wrong.
    pub fn reason(&self) -> &str {
        &self.0
    }
}

/// The closed set of gate geometries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GateKind {
    /// Per-dimension `[min, max)` bounds.
    Rectangle(RectangleGate),
    /// Two-dimensional polygon.
    Polygon(PolygonGate),
    /// N-dimensional ellipsoid.
    Ellipsoid(EllipsoidGate),
    /// Dividers and named quadrants.
    Quadrant(QuadrantGate),
    /// AND/OR/NOT of other gates.
    Boolean(BooleanGate),
}

/// A named gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gate {
    name: GateName,
    #[serde(flatten)]
    kind: GateKind,
}

impl Gate {
    /// Wrap a validated geometry.
    pub fn new(name: GateName, kind: GateKind) -> Self {
        Self { name, kind }
    }

    /// Rectangle or range gate.
    pub fn rectangle(name: GateName, dimensions: Vec<Dimension>) -> Result<Self, GeometryError> {
        Ok(Self::new(name, GateKind::Rectangle(RectangleGate::new(dimensions)?)))
    }

    /// Polygon gate over `x` and `y`.
    pub fn polygon(
        name: GateName,
        x: Dimension,
        y: Dimension,
        vertices: Vec<(f64, f64)>,
    ) -> Result<Self, GeometryError> {
        Ok(Self::new(name, GateKind::Polygon(PolygonGate::new(x, y, vertices)?)))
    }

    /// Ellipsoid gate.
    pub fn ellipsoid(
        name: GateName,
        dimensions: Vec<Dimension>,
        mean: Vec<f64>,
        covariance: Vec<Vec<f64>>,
        distance_square: f64,
    ) -> Result<Self, GeometryError> {
        let gate = EllipsoidGate::new(dimensions, mean, covariance, distance_square)?;
        Ok(Self::new(name, GateKind::Ellipsoid(gate)))
    }

    /// Quadrant gate.
    pub fn quadrant(
        name: GateName,
        dividers: Vec<Divider>,
        quadrants: Vec<Quadrant>,
    ) -> Result<Self, GeometryError> {
        Ok(Self::new(name, GateKind::Quadrant(QuadrantGate::new(dividers, quadrants)?)))
    }

    /// Boolean gate.
    pub fn boolean(
        name: GateName,
        op: BooleanOp,
        references: Vec<GateReference>,
    ) -> Result<Self, GeometryError> {
        Ok(Self::new(name, GateKind::Boolean(BooleanGate::new(op, references)?)))
    }

    /// Gate name.
    pub fn name(&self) -> &GateName {
        &self.name
    }

    /// Geometry.
    pub fn kind(&self) -> &GateKind {
        &self.kind
    }

    /// `RectangleGate`, `PolygonGate`, ...
    pub fn type_name(&self) -> &'static str {
        match self.kind {
            GateKind::Rectangle(_) => "RectangleGate",
            GateKind::Polygon(_) => "PolygonGate",
            GateKind::Ellipsoid(_) => "EllipsoidGate",
            GateKind::Quadrant(_) => "QuadrantGate",
            GateKind::Boolean(_) => "BooleanGate",
        }
    }

    /// Dimensions the geometry is evaluated over; empty for boolean gates.
    pub fn dimensions(&self) -> Vec<&Dimension> {
        match &self.kind {
            GateKind::Rectangle(g) => g.dimensions().iter().collect(),
            GateKind::Polygon(g) => g.dimensions().iter().collect(),
            GateKind::Ellipsoid(g) => g.dimensions().iter().collect(),
            GateKind::Quadrant(g) => g.dimensions(),
            GateKind::Boolean(_) => Vec::new(),
        }
    }

    /// Re-check geometry, e.g. after deserialization.
    pub fn validate(&self) -> Result<(), GeometryError> {
        match &self.kind {
            GateKind::Rectangle(g) => g.validate(),
            GateKind::Polygon(g) => g.validate(),
            GateKind::Ellipsoid(_) => Ok(()),
            GateKind::Quadrant(g) => g.validate(),
            GateKind::Boolean(g) => g.validate(),
        }
    }

    /// Geometric membership within `parent`. `quadrant` selects the region
    /// of a quadrant gate. Boolean gates have no geometry and select
    /// nothing here; the engine combines their references.
    pub(crate) fn membership(
        &self,
        quadrant: Option<usize>,
        columns: &[&[f64]],
        parent: &[bool],
    ) -> Vec<bool> {
        match &self.kind {
            GateKind::Rectangle(g) => g.membership(columns, parent),
            GateKind::Polygon(g) => g.membership(columns, parent),
            GateKind::Ellipsoid(g) => g.membership(columns, parent),
            GateKind::Quadrant(g) => g.membership(quadrant.unwrap_or(0), columns, parent),
            GateKind::Boolean(_) => vec![false; parent.len()],
        }
    }

    /// Display form with an explicit parent label.
    pub(crate) fn describe(&self, parent: &str, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({}, parent: {parent}, ", self.type_name(), self.name)?;
        match &self.kind {
            GateKind::Rectangle(g) => write!(f, "dims: {})", g.dimensions().len()),
            GateKind::Polygon(g) => write!(f, "vertices: {})", g.vertices().len()),
            GateKind::Ellipsoid(g) => write!(f, "coords: {:?})", g.mean()),
            GateKind::Quadrant(g) => write!(f, "quadrants: {})", g.quadrants().len()),
            GateKind::Boolean(g) => write!(f, "type: {})", g.op()),
        }
    }
}

impl fmt::Display for Gate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.describe("root", f)
    }
}
