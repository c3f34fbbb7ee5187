//! # Quadrant Gates
//!
//! Dividers cut one dimension each at one or more values; named quadrants
//! select a `[min, max)` interval per divider, where every finite bound must
//! be one of that divider's values. Despite the name, dividers may cut the
//! space into any number of regions.
//!
//! A quadrant gate is not a node of the gate tree itself: a strategy
//! registers one node per quadrant, and it is quadrants that children and
//! boolean gates reference.

use std::fmt;

use serde::{Deserialize, Serialize};

use cytogate_core::GateName;

use super::GeometryError;
use crate::dimension::Dimension;

/// One divider: a dimension cut at the given values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Divider {
    /// Identifier referenced by quadrants.
    pub id: String,
    /// The divided dimension.
    pub dimension: Dimension,
    /// Cut positions.
    pub values: Vec<f64>,
}

/// Interval of one divider selected by a quadrant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DividerRange {
    /// Divider identifier.
    pub divider: String,
    /// Inclusive lower bound; open when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    /// Exclusive upper bound; open when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

impl DividerRange {
    fn contains(&self, value: f64) -> bool {
        self.min.map_or(true, |min| value >= min) && self.max.map_or(true, |max| value < max)
    }
}

/// A named region of a quadrant gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quadrant {
    /// Quadrant name, used as the gate name of its tree node.
    pub id: GateName,
    /// One interval per referenced divider.
    pub ranges: Vec<DividerRange>,
}

impl fmt::Display for Quadrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Quadrant({}, dividers: {})", self.id, self.ranges.len())
    }
}

/// Dividers plus the quadrants they produce.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuadrantGate {
    dividers: Vec<Divider>,
    quadrants: Vec<Quadrant>,
}

impl QuadrantGate {
    /// Validate divider and quadrant definitions.
    pub fn new(dividers: Vec<Divider>, quadrants: Vec<Quadrant>) -> Result<Self, GeometryError> {
        let gate = Self {
            dividers,
            quadrants,
        };
        gate.validate()?;
        Ok(gate)
    }

    /// Dividers.
    pub fn dividers(&self) -> &[Divider] {
        &self.dividers
    }

    /// Quadrants.
    pub fn quadrants(&self) -> &[Quadrant] {
        &self.quadrants
    }

    /// One dimension per divider, in divider order.
    pub fn dimensions(&self) -> Vec<&Dimension> {
        self.dividers.iter().map(|d| &d.dimension).collect()
    }

    pub(crate) fn validate(&self) -> Result<(), GeometryError> {
        if self.dividers.is_empty() {
            return Err(GeometryError::new("quadrant gates need at least one divider"));
        }
        for (i, divider) in self.dividers.iter().enumerate() {
            if self.dividers[..i].iter().any(|d| d.id == divider.id) {
                return Err(GeometryError::new(format!(
                    "divider '{}' is defined twice",
                    divider.id
                )));
            }
            if divider.values.is_empty() || divider.values.iter().any(|v| !v.is_finite()) {
                return Err(GeometryError::new(format!(
                    "divider '{}' needs at least one finite value",
                    divider.id
                )));
            }
        }

        if self.quadrants.is_empty() {
            return Err(GeometryError::new("quadrant gates need at least one quadrant"));
        }
        for (i, quadrant) in self.quadrants.iter().enumerate() {
            if self.quadrants[..i].iter().any(|q| q.id == quadrant.id) {
                return Err(GeometryError::new(format!(
                    "quadrant '{}' is defined twice",
                    quadrant.id
                )));
            }
            for (j, range) in quadrant.ranges.iter().enumerate() {
                let divider = self
                    .dividers
                    .iter()
                    .find(|d| d.id == range.divider)
                    .ok_or_else(|| {
                        GeometryError::new(format!(
                            "quadrant '{}' references unknown divider '{}'",
                            quadrant.id, range.divider
                        ))
                    })?;
                if quadrant.ranges[..j].iter().any(|r| r.divider == range.divider) {
                    return Err(GeometryError::new(format!(
                        "quadrant '{}' references divider '{}' twice",
                        quadrant.id, range.divider
                    )));
                }
                for bound in [range.min, range.max].into_iter().flatten() {
                    if !divider.values.contains(&bound) {
                        return Err(GeometryError::new(format!(
                            "quadrant '{}' bound {bound} is not a value of divider '{}'",
                            quadrant.id, divider.id
                        )));
                    }
                }
                if let (Some(min), Some(max)) = (range.min, range.max) {
                    if !(min < max) {
                        return Err(GeometryError::new(format!(
                            "quadrant '{}' has empty range [{min}, {max})",
                            quadrant.id
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    /// Membership of quadrant `index`; `columns` follow divider order.
    pub(crate) fn membership(
        &self,
        index: usize,
        columns: &[&[f64]],
        parent: &[bool],
    ) -> Vec<bool> {
        let Some(quadrant) = self.quadrants.get(index) else {
            return vec![false; parent.len()];
        };
        let selected: Vec<(&DividerRange, &[f64])> = quadrant
            .ranges
            .iter()
            .filter_map(|range| {
                self.dividers
                    .iter()
                    .position(|d| d.id == range.divider)
                    .map(|i| (range, columns[i]))
            })
            .collect();

        parent
            .iter()
            .enumerate()
            .map(|(event, &inside)| {
                inside
                    && selected
                        .iter()
                        .all(|(range, column)| range.contains(column[event]))
            })
            .collect()
    }
}
