//! Rectangle gates: the conjunction of per-dimension `[min, max)` bounds.
//! One dimension makes a range gate, three a box, more a hyper-rectangle.

use serde::{Deserialize, Serialize};

use super::GeometryError;
use crate::dimension::Dimension;

/// Axis-aligned (hyper-)rectangle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RectangleGate {
    dimensions: Vec<Dimension>,
}

impl RectangleGate {
    /// Validate that every dimension is bounded on at least one side.
    pub fn new(dimensions: Vec<Dimension>) -> Result<Self, GeometryError> {
        let gate = Self { dimensions };
        gate.validate()?;
        Ok(gate)
    }

    /// Bounded dimensions.
    pub fn dimensions(&self) -> &[Dimension] {
        &self.dimensions
    }

    pub(crate) fn validate(&self) -> Result<(), GeometryError> {
        if self.dimensions.is_empty() {
            return Err(GeometryError::new("rectangle gates need at least one dimension"));
        }
        for dim in &self.dimensions {
            if dim.min().is_none() && dim.max().is_none() {
                return Err(GeometryError::new(format!(
                    "dimension '{}' has neither min nor max",
                    dim.label()
                )));
            }
        }
        Ok(())
    }

    pub(crate) fn membership(&self, columns: &[&[f64]], parent: &[bool]) -> Vec<bool> {
        parent
            .iter()
            .enumerate()
            .map(|(event, &inside)| {
                inside
                    && self
                        .dimensions
                        .iter()
                        .zip(columns)
                        .all(|(dim, column)| dim.in_range(column[event]))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boundary_events() {
        let gate = RectangleGate::new(vec![
            Dimension::channel("x").with_range(Some(0.0), Some(10.0))
        ])
        .unwrap();
        let column = [0.0, 10.0, 5.0, -1.0];
        let out = gate.membership(&[&column], &[true; 4]);
        assert_eq!(out, vec![true, false, true, false]);
    }

    #[test]
    fn excluded_parent_events_stay_excluded() {
        let gate =
            RectangleGate::new(vec![Dimension::channel("x").with_range(None, Some(10.0))]).unwrap();
        let out = gate.membership(&[&[1.0, 1.0]], &[true, false]);
        assert_eq!(out, vec![true, false]);
    }

    #[test]
    fn two_dimensions_conjoin() {
        let gate = RectangleGate::new(vec![
            Dimension::channel("x").with_range(Some(0.0), None),
            Dimension::channel("y").with_range(Some(0.0), None),
        ])
        .unwrap();
        let out = gate.membership(&[&[1.0, 1.0, -1.0], &[1.0, -1.0, 1.0]], &[true; 3]);
        assert_eq!(out, vec![true, false, false]);
    }

    #[test]
    fn unbounded_dimension_is_rejected() {
        assert!(RectangleGate::new(vec![Dimension::channel("x")]).is_err());
        assert!(RectangleGate::new(Vec::new()).is_err());
    }
}
