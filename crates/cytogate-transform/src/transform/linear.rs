//! Linear scaling `y = (x + a) / (t + a)`.

use serde::{Deserialize, Serialize};

use super::{require_param, ParameterError, Parameters, ScaleFunction};

/// Linear transform with top-of-scale `t` and offset `a`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "LinearParams", into = "LinearParams")]
pub struct LinearTransform {
    t: f64,
    a: f64,
}

/// Serialized parameter set of [`LinearTransform`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearParams {
    /// Top of scale.
    pub t: f64,
    /// Offset added before scaling.
    #[serde(default)]
    pub a: f64,
}

impl LinearTransform {
    /// Validate `t > 0`, `0 <= a <= t`.
    pub fn new(t: f64, a: f64) -> Result<Self, ParameterError> {
        if !(t.is_finite() && t > 0.0) {
            return Err(ParameterError::new(format!("t must be positive, got {t}")));
        }
        if !(a.is_finite() && (0.0..=t).contains(&a)) {
            return Err(ParameterError::new(format!("a must lie in [0, t], got {a}")));
        }
        Ok(Self { t, a })
    }

    pub(crate) fn from_parameters(p: &Parameters) -> Result<Self, ParameterError> {
        Self::new(require_param(p, "t")?, require_param(p, "a")?)
    }
}

impl ScaleFunction for LinearTransform {
    fn apply(&self, x: f64) -> Option<f64> {
        Some((x + self.a) / (self.t + self.a))
    }

    fn invert(&self, y: f64) -> f64 {
        y * (self.t + self.a) - self.a
    }

    fn parameters(&self) -> Vec<(&'static str, f64)> {
        vec![("t", self.t), ("a", self.a)]
    }
}

impl TryFrom<LinearParams> for LinearTransform {
    type Error = ParameterError;

    fn try_from(p: LinearParams) -> Result<Self, Self::Error> {
        Self::new(p.t, p.a)
    }
}

impl From<LinearTransform> for LinearParams {
    fn from(x: LinearTransform) -> Self {
        Self { t: x.t, a: x.a }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_range_onto_unit_interval() {
        let lin = LinearTransform::new(10000.0, 0.0).unwrap();
        assert_eq!(lin.apply(0.0), Some(0.0));
        assert_eq!(lin.apply(10000.0), Some(1.0));
        assert_eq!(lin.invert(0.5), 5000.0);
    }

    #[test]
    fn offset_shifts_zero() {
        let lin = LinearTransform::new(100.0, 100.0).unwrap();
        assert_eq!(lin.apply(-100.0), Some(0.0));
        assert_eq!(lin.invert(1.0), 100.0);
    }

    #[test]
    fn rejects_non_positive_top() {
        assert!(LinearTransform::new(0.0, 0.0).is_err());
        assert!(LinearTransform::new(10.0, 11.0).is_err());
    }
}
