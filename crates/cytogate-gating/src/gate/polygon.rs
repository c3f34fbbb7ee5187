//! # Polygon Gates
//!
//! A closed ring of vertices over exactly two dimensions. Membership is the
//! non-zero winding number rule, so a ring that winds around a region twice
//! still contains it. Self-intersecting rings are accepted; which regions
//! they enclose is whatever the winding number says and is otherwise
//! undefined.
//!
//! Edge crossings are counted half-open in `y`: an upward edge counts when
//! `y0 <= y < y1`, a downward edge when `y1 <= y < y0`. Events that lie
//! exactly on an edge have a zero cross product and do not change the
//! winding number.

use serde::{Deserialize, Serialize};

use super::GeometryError;
use crate::dimension::Dimension;

/// Two-dimensional polygon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolygonGate {
    dimensions: Vec<Dimension>,
    vertices: Vec<(f64, f64)>,
}

impl PolygonGate {
    /// Validate dimension and vertex counts.
    pub fn new(x: Dimension, y: Dimension, vertices: Vec<(f64, f64)>) -> Result<Self, GeometryError> {
        let gate = Self {
            dimensions: vec![x, y],
            vertices,
        };
        gate.validate()?;
        Ok(gate)
    }

    /// The `x` and `y` dimensions.
    pub fn dimensions(&self) -> &[Dimension] {
        &self.dimensions
    }

    /// Ring vertices; the last connects back to the first.
    pub fn vertices(&self) -> &[(f64, f64)] {
        &self.vertices
    }

    pub(crate) fn validate(&self) -> Result<(), GeometryError> {
        if self.dimensions.len() != 2 {
            return Err(GeometryError::new(format!(
                "polygon gates need exactly 2 dimensions, got {}",
                self.dimensions.len()
            )));
        }
        if self.vertices.len() < 3 {
            return Err(GeometryError::new(format!(
                "polygon gates need at least 3 vertices, got {}",
                self.vertices.len()
            )));
        }
        if self.vertices.iter().any(|(x, y)| !(x.is_finite() && y.is_finite())) {
            return Err(GeometryError::new("polygon vertices must be finite"));
        }
        Ok(())
    }

    /// Winding number of the ring around `(x, y)`.
    pub fn winding_number(&self, x: f64, y: f64) -> i32 {
        let n = self.vertices.len();
        let mut winding = 0;
        for i in 0..n {
            let (x0, y0) = self.vertices[i];
            let (x1, y1) = self.vertices[(i + 1) % n];
            let side = (x1 - x0) * (y - y0) - (x - x0) * (y1 - y0);
            if y0 <= y {
                if y1 > y && side > 0.0 {
                    winding += 1;
                }
            } else if y1 <= y && side < 0.0 {
                winding -= 1;
            }
        }
        winding
    }

    pub(crate) fn membership(&self, columns: &[&[f64]], parent: &[bool]) -> Vec<bool> {
        let (xs, ys) = (columns[0], columns[1]);
        parent
            .iter()
            .enumerate()
            .map(|(event, &inside)| inside && self.winding_number(xs[event], ys[event]) != 0)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn polygon(vertices: Vec<(f64, f64)>) -> PolygonGate {
        PolygonGate::new(Dimension::channel("x"), Dimension::channel("y"), vertices).unwrap()
    }

    #[test]
    fn square_interior_and_exterior() {
        let gate = polygon(vec![(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)]);
        let out = gate.membership(&[&[5.0, 15.0, -1.0], &[5.0, 5.0, 5.0]], &[true; 3]);
        assert_eq!(out, vec![true, false, false]);
    }

    #[test]
    fn orientation_does_not_matter() {
        let ccw = polygon(vec![(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)]);
        let cw = polygon(vec![(0.0, 0.0), (0.0, 10.0), (10.0, 10.0), (10.0, 0.0)]);
        assert_eq!(ccw.winding_number(5.0, 5.0), 1);
        assert_eq!(cw.winding_number(5.0, 5.0), -1);
    }

    #[test]
    fn concave_notch_is_outside() {
        // U shape open at the top between x = 3 and x = 7
        let gate = polygon(vec![
            (0.0, 0.0),
            (10.0, 0.0),
            (10.0, 10.0),
            (7.0, 10.0),
            (7.0, 3.0),
            (3.0, 3.0),
            (3.0, 10.0),
            (0.0, 10.0),
        ]);
        assert_eq!(gate.winding_number(5.0, 6.0), 0);
        assert_ne!(gate.winding_number(1.0, 6.0), 0);
        assert_ne!(gate.winding_number(5.0, 1.0), 0);
    }

    #[test]
    fn pentagram_center_is_inside_under_nonzero_rule() {
        let star: Vec<(f64, f64)> = (0..5)
            .map(|k| {
                let angle = std::f64::consts::FRAC_PI_2 + (k * 2) as f64 * 2.0 * std::f64::consts::PI / 5.0;
                (angle.cos(), angle.sin())
            })
            .collect();
        let gate = polygon(star);
        // the center is wound twice; even-odd would exclude it
        assert_eq!(gate.winding_number(0.0, 0.0).abs(), 2);
        assert!(gate.membership(&[&[0.0], &[0.0]], &[true])[0]);
    }

    #[test]
    fn degenerate_rings_are_rejected() {
        assert!(PolygonGate::new(
            Dimension::channel("x"),
            Dimension::channel("y"),
            vec![(0.0, 0.0), (1.0, 1.0)]
        )
        .is_err());
        assert!(PolygonGate::new(
            Dimension::channel("x"),
            Dimension::channel("y"),
            vec![(0.0, 0.0), (1.0, f64::NAN), (1.0, 0.0)]
        )
        .is_err());
    }
}
