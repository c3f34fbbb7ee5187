//! Inverse hyperbolic sine transform.
//!
//! `y = (asinh(x · sinh(m·ln10) / t) + a·ln10) / ((m + a)·ln10)`

use std::f64::consts::LN_10;

use serde::{Deserialize, Serialize};

use super::{require_param, ParameterError, Parameters, ScaleFunction};

/// Arcsinh transform with top-of-scale `t`, `m` positive decades and `a`
/// additional negative decades.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "AsinhParams", into = "AsinhParams")]
pub struct AsinhTransform {
    t: f64,
    m: f64,
    a: f64,
}

/// Serialized parameter set of [`AsinhTransform`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AsinhParams {
    /// Top of scale.
    pub t: f64,
    /// Positive decades.
    pub m: f64,
    /// Additional negative decades.
    #[serde(default)]
    pub a: f64,
}

impl AsinhTransform {
    /// Validate `t > 0`, `m > 0`, `0 <= a <= m`.
    pub fn new(t: f64, m: f64, a: f64) -> Result<Self, ParameterError> {
        if !(t.is_finite() && t > 0.0) {
            return Err(ParameterError::new(format!("t must be positive, got {t}")));
        }
        if !(m.is_finite() && m > 0.0) {
            return Err(ParameterError::new(format!("m must be positive, got {m}")));
        }
        if !(a.is_finite() && (0.0..=m).contains(&a)) {
            return Err(ParameterError::new(format!("a must lie in [0, m], got {a}")));
        }
        Ok(Self { t, m, a })
    }

    pub(crate) fn from_parameters(p: &Parameters) -> Result<Self, ParameterError> {
        Self::new(
            require_param(p, "t")?,
            require_param(p, "m")?,
            require_param(p, "a")?,
        )
    }

    fn gain(&self) -> f64 {
        (self.m * LN_10).sinh() / self.t
    }
}

impl ScaleFunction for AsinhTransform {
    fn apply(&self, x: f64) -> Option<f64> {
        Some(((x * self.gain()).asinh() + self.a * LN_10) / ((self.m + self.a) * LN_10))
    }

    fn invert(&self, y: f64) -> f64 {
        (y * (self.m + self.a) * LN_10 - self.a * LN_10).sinh() / self.gain()
    }

    fn parameters(&self) -> Vec<(&'static str, f64)> {
        vec![("t", self.t), ("m", self.m), ("a", self.a)]
    }
}

impl TryFrom<AsinhParams> for AsinhTransform {
    type Error = ParameterError;

    fn try_from(p: AsinhParams) -> Result<Self, Self::Error> {
        Self::new(p.t, p.m, p.a)
    }
}

impl From<AsinhTransform> for AsinhParams {
    fn from(x: AsinhTransform) -> Self {
        Self {
            t: x.t,
            m: x.m,
            a: x.a,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn top_of_scale_maps_to_one() {
        let xf = AsinhTransform::new(10000.0, 4.5, 0.0).unwrap();
        assert!((xf.apply(10000.0).unwrap() - 1.0).abs() < 1e-12);
        assert_eq!(xf.apply(0.0), Some(0.0));
    }

    #[test]
    fn negative_decades_shift_zero() {
        let xf = AsinhTransform::new(10000.0, 4.0, 1.0).unwrap();
        assert!((xf.apply(0.0).unwrap() - 0.2).abs() < 1e-12);
    }
}
