//! # Ellipsoid Gates
//!
//! An event `x` is inside when its squared Mahalanobis distance from the
//! mean is at most `distance_square`:
//!
//! ```text
//! (x − mean)ᵀ · covariance⁻¹ · (x − mean) ≤ distance_square
//! ```
//!
//! The boundary is inclusive. The covariance inverse is computed once at
//! construction (also on deserialization).

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use super::GeometryError;
use crate::dimension::Dimension;

/// N-dimensional ellipsoid, `N >= 2`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "EllipsoidSpec", into = "EllipsoidSpec")]
pub struct EllipsoidGate {
    spec: EllipsoidSpec,
    /// Row-major covariance inverse.
    inverse: Vec<f64>,
}

/// Serialized form of an [`EllipsoidGate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EllipsoidSpec {
    /// One dimension per axis.
    pub dimensions: Vec<Dimension>,
    /// Center.
    pub mean: Vec<f64>,
    /// Row-major covariance matrix.
    pub covariance: Vec<Vec<f64>>,
    /// Squared Mahalanobis radius.
    pub distance_square: f64,
}

impl EllipsoidGate {
    /// Validate shapes and invert the covariance.
    pub fn new(
        dimensions: Vec<Dimension>,
        mean: Vec<f64>,
        covariance: Vec<Vec<f64>>,
        distance_square: f64,
    ) -> Result<Self, GeometryError> {
        Self::try_from(EllipsoidSpec {
            dimensions,
            mean,
            covariance,
            distance_square,
        })
    }

    /// Axes.
    pub fn dimensions(&self) -> &[Dimension] {
        &self.spec.dimensions
    }

    /// Center.
    pub fn mean(&self) -> &[f64] {
        &self.spec.mean
    }

    /// Covariance rows.
    pub fn covariance(&self) -> &[Vec<f64>] {
        &self.spec.covariance
    }

    /// Squared radius.
    pub fn distance_square(&self) -> f64 {
        self.spec.distance_square
    }

    /// Squared Mahalanobis distance of a point from the mean.
    pub fn mahalanobis_square(&self, point: &[f64]) -> f64 {
        let n = self.spec.mean.len();
        let mut total = 0.0;
        for i in 0..n {
            let di = point[i] - self.spec.mean[i];
            let mut row = 0.0;
            for j in 0..n {
                row += self.inverse[i * n + j] * (point[j] - self.spec.mean[j]);
            }
            total += di * row;
        }
        total
    }

    pub(crate) fn membership(&self, columns: &[&[f64]], parent: &[bool]) -> Vec<bool> {
        let mut point = vec![0.0; columns.len()];
        parent
            .iter()
            .enumerate()
            .map(|(event, &inside)| {
                if !inside {
                    return false;
                }
                for (slot, column) in point.iter_mut().zip(columns) {
                    *slot = column[event];
                }
                self.mahalanobis_square(&point) <= self.spec.distance_square
            })
            .collect()
    }
}

impl TryFrom<EllipsoidSpec> for EllipsoidGate {
    type Error = GeometryError;

    fn try_from(spec: EllipsoidSpec) -> Result<Self, Self::Error> {
        let n = spec.dimensions.len();
        if n < 2 {
            return Err(GeometryError::new(format!(
                "ellipsoid gates need at least 2 dimensions, got {n}"
            )));
        }
        if spec.mean.len() != n {
            return Err(GeometryError::new(format!(
                "mean has {} coordinates for {n} dimensions",
                spec.mean.len()
            )));
        }
        if spec.covariance.len() != n || spec.covariance.iter().any(|row| row.len() != n) {
            return Err(GeometryError::new(format!("covariance must be {n}x{n}")));
        }
        if !(spec.distance_square.is_finite() && spec.distance_square > 0.0) {
            return Err(GeometryError::new(format!(
                "distance square must be positive, got {}",
                spec.distance_square
            )));
        }
        if spec
            .mean
            .iter()
            .chain(spec.covariance.iter().flatten())
            .any(|v| !v.is_finite())
        {
            return Err(GeometryError::new("ellipsoid geometry must be finite"));
        }

        let covariance = DMatrix::from_fn(n, n, |i, j| spec.covariance[i][j]);
        let inverse = covariance
            .try_inverse()
            .ok_or_else(|| GeometryError::new("covariance matrix is singular"))?;
        let inverse = (0..n)
            .flat_map(|i| (0..n).map(move |j| (i, j)))
            .map(|(i, j)| inverse[(i, j)])
            .collect();

        Ok(Self { spec, inverse })
    }
}

impl From<EllipsoidGate> for EllipsoidSpec {
    fn from(gate: EllipsoidGate) -> Self {
        gate.spec
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dims() -> Vec<Dimension> {
        vec![Dimension::channel("x"), Dimension::channel("y")]
    }

    #[test]
    fn axis_aligned_ellipse_boundary_is_inclusive() {
        // semi-axes 2 (x) and 1 (y)
        let gate = EllipsoidGate::new(
            dims(),
            vec![0.0, 0.0],
            vec![vec![4.0, 0.0], vec![0.0, 1.0]],
            1.0,
        )
        .unwrap();
        let xs = [2.0, 0.0, 2.1, 1.0];
        let ys = [0.0, 1.0, 0.0, 0.5];
        assert_eq!(
            gate.membership(&[&xs, &ys], &[true; 4]),
            vec![true, true, false, true]
        );
    }

    #[test]
    fn correlated_covariance() {
        let gate = EllipsoidGate::new(
            dims(),
            vec![1.0, 1.0],
            vec![vec![2.0, 1.0], vec![1.0, 2.0]],
            1.0,
        )
        .unwrap();
        // along the major axis (1, 1) the radius is sqrt(3)
        let t = 3f64.sqrt() / 2f64.sqrt();
        assert!((gate.mahalanobis_square(&[1.0 + t, 1.0 + t]) - 1.0).abs() < 1e-12);
        assert!(gate.mahalanobis_square(&[1.0 + t, 1.0 - t]) > 1.0);
    }

    #[test]
    fn invalid_geometry_is_rejected() {
        assert!(EllipsoidGate::new(
            vec![Dimension::channel("x")],
            vec![0.0],
            vec![vec![1.0]],
            1.0
        )
        .is_err());
        assert!(EllipsoidGate::new(
            dims(),
            vec![0.0, 0.0],
            vec![vec![1.0, 1.0], vec![1.0, 1.0]],
            1.0
        )
        .is_err());
        assert!(EllipsoidGate::new(dims(), vec![0.0], vec![vec![1.0, 0.0], vec![0.0, 1.0]], 1.0)
            .is_err());
    }

    #[test]
    fn deserialization_recomputes_inverse() {
        let gate = EllipsoidGate::new(
            dims(),
            vec![0.0, 0.0],
            vec![vec![4.0, 0.0], vec![0.0, 1.0]],
            1.0,
        )
        .unwrap();
        let json = serde_json::to_string(&gate).unwrap();
        let back: EllipsoidGate = serde_json::from_str(&json).unwrap();
        assert_eq!(back, gate);
    }
}
