//! Logarithmic transforms.
//!
//! - [`LogTransform`]: `y = log10(x / t) / m + 1`, so `t` maps to 1 and
//!   `t·10^-m` maps to 0.
//! - [`WspLogTransform`]: FlowJo-style `y = log10(x / offset) / decades`,
//!   so `offset` maps to 0.
//!
//! Both are defined for strictly positive input only; the domain floor is
//! the input that maps to 0.

use serde::{Deserialize, Serialize};

use super::{require_param, ParameterError, Parameters, ScaleFunction};

/// Logarithmic transform with top-of-scale `t` spanning `m` decades.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "LogParams", into = "LogParams")]
pub struct LogTransform {
    t: f64,
    m: f64,
}

/// Serialized parameter set of [`LogTransform`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LogParams {
    /// Top of scale.
    pub t: f64,
    /// Number of decades.
    pub m: f64,
}

impl LogTransform {
    /// Validate `t > 0`, `m > 0`.
    pub fn new(t: f64, m: f64) -> Result<Self, ParameterError> {
        if !(t.is_finite() && t > 0.0) {
            return Err(ParameterError::new(format!("t must be positive, got {t}")));
        }
        if !(m.is_finite() && m > 0.0) {
            return Err(ParameterError::new(format!("m must be positive, got {m}")));
        }
        Ok(Self { t, m })
    }

    pub(crate) fn from_parameters(p: &Parameters) -> Result<Self, ParameterError> {
        Self::new(require_param(p, "t")?, require_param(p, "m")?)
    }
}

impl ScaleFunction for LogTransform {
    fn apply(&self, x: f64) -> Option<f64> {
        if x <= 0.0 {
            return None;
        }
        Some((x / self.t).log10() / self.m + 1.0)
    }

    fn invert(&self, y: f64) -> f64 {
        self.t * 10f64.powf(self.m * (y - 1.0))
    }

    fn domain_floor(&self) -> Option<f64> {
        Some(self.t * 10f64.powf(-self.m))
    }

    fn parameters(&self) -> Vec<(&'static str, f64)> {
        vec![("t", self.t), ("m", self.m)]
    }
}

impl TryFrom<LogParams> for LogTransform {
    type Error = ParameterError;

    fn try_from(p: LogParams) -> Result<Self, Self::Error> {
        Self::new(p.t, p.m)
    }
}

impl From<LogTransform> for LogParams {
    fn from(x: LogTransform) -> Self {
        Self { t: x.t, m: x.m }
    }
}

/// FlowJo logarithmic display transform.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "WspLogParams", into = "WspLogParams")]
pub struct WspLogTransform {
    offset: f64,
    decades: f64,
}

/// Serialized parameter set of [`WspLogTransform`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WspLogParams {
    /// Smallest representable input; maps to 0.
    pub offset: f64,
    /// Decades displayed.
    pub decades: f64,
}

impl WspLogTransform {
    /// Validate `offset > 0`, `decades > 0`.
    pub fn new(offset: f64, decades: f64) -> Result<Self, ParameterError> {
        if !(offset.is_finite() && offset > 0.0) {
            return Err(ParameterError::new(format!(
                "offset must be positive, got {offset}"
            )));
        }
        if !(decades.is_finite() && decades > 0.0) {
            return Err(ParameterError::new(format!(
                "decades must be positive, got {decades}"
            )));
        }
        Ok(Self { offset, decades })
    }

    pub(crate) fn from_parameters(p: &Parameters) -> Result<Self, ParameterError> {
        Self::new(require_param(p, "offset")?, require_param(p, "decades")?)
    }
}

impl ScaleFunction for WspLogTransform {
    fn apply(&self, x: f64) -> Option<f64> {
        if x < self.offset {
            return None;
        }
        Some((x / self.offset).log10() / self.decades)
    }

    fn invert(&self, y: f64) -> f64 {
        self.offset * 10f64.powf(y * self.decades)
    }

    fn domain_floor(&self) -> Option<f64> {
        Some(self.offset)
    }

    fn parameters(&self) -> Vec<(&'static str, f64)> {
        vec![("offset", self.offset), ("decades", self.decades)]
    }
}

impl TryFrom<WspLogParams> for WspLogTransform {
    type Error = ParameterError;

    fn try_from(p: WspLogParams) -> Result<Self, Self::Error> {
        Self::new(p.offset, p.decades)
    }
}

impl From<WspLogTransform> for WspLogParams {
    fn from(x: WspLogTransform) -> Self {
        Self {
            offset: x.offset,
            decades: x.decades,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_endpoints() {
        let log = LogTransform::new(10000.0, 4.0).unwrap();
        assert!((log.apply(10000.0).unwrap() - 1.0).abs() < 1e-15);
        assert!(log.apply(1.0).unwrap().abs() < 1e-15);
        assert!((log.domain_floor().unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn log_rejects_non_positive() {
        let log = LogTransform::new(10000.0, 4.5).unwrap();
        assert_eq!(log.apply(0.0), None);
        assert_eq!(log.apply(-3.0), None);
    }

    #[test]
    fn wsp_log_below_offset_is_outside_domain() {
        let wsp = WspLogTransform::new(0.5, 4.5).unwrap();
        assert_eq!(wsp.apply(0.25), None);
        assert_eq!(wsp.apply(0.5), Some(0.0));
        assert!((wsp.invert(1.0) - 0.5 * 10f64.powf(4.5)).abs() < 1e-6);
    }
}
