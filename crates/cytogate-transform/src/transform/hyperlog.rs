//! # Hyperlog Transform
//!
//! Bagwell's hyperlog replaces the negative exponential of the logicle
//! function with a linear term:
//!
//! ```text
//! B(y) = a·e^(b·y) + c·y − f      for y >= x1
//! B(y) = −B(2·x1 − y)             for y <  x1
//! ```
//!
//! The forward/inverse construction matches [`super::logicle`]: the
//! inverse evaluates `B` (Taylor series near `x1`), the forward solves
//! against the same piecewise `B`.

use std::f64::consts::LN_10;

use serde::{Deserialize, Serialize};

use super::logicle::{LogicleParams, TAYLOR_LENGTH};
use super::solver::{self, Evaluation};
use super::{ParameterError, Parameters, ScaleFunction};

#[derive(Debug, Clone, PartialEq)]
struct Coefficients {
    a: f64,
    b: f64,
    c: f64,
    f: f64,
    x1: f64,
    x_taylor: f64,
    taylor: [f64; TAYLOR_LENGTH],
}

/// Hyperlog transform, parameterized like logicle but with `w > 0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "LogicleParams", into = "LogicleParams")]
pub struct HyperlogTransform {
    params: LogicleParams,
    coef: Coefficients,
}

impl HyperlogTransform {
    /// Validate parameters and derive the coefficients.
    pub fn new(params: LogicleParams) -> Result<Self, ParameterError> {
        params.validate(true)?;
        let LogicleParams { t, w: width, m, a: neg } = params;

        let w = width / (m + neg);
        let x2 = neg / (m + neg);
        let x1 = x2 + w;
        let x0 = x2 + 2.0 * w;
        let b = (m + neg) * LN_10;
        let e0 = (b * x0).exp();
        let c_a = e0 / w;
        let f_a = (b * x1).exp() + c_a * x1;
        let a = t / (((b).exp() + c_a) - f_a);
        let c = c_a * a;
        let f = f_a * a;

        let mut taylor = [0.0; TAYLOR_LENGTH];
        let mut coef = a * (b * x1).exp();
        for (i, slot) in taylor.iter_mut().enumerate() {
            coef *= b / (i as f64 + 1.0);
            *slot = coef;
        }
        taylor[0] += c;

        if ![a, c, f].iter().all(|v| v.is_finite()) {
            return Err(ParameterError::new(
                "parameters produce non-finite hyperlog coefficients",
            ));
        }

        Ok(Self {
            params,
            coef: Coefficients {
                a,
                b,
                c,
                f,
                x1,
                x_taylor: x1 + w / 4.0,
                taylor,
            },
        })
    }

    pub(crate) fn from_parameters(p: &Parameters) -> Result<Self, ParameterError> {
        Self::new(LogicleParams::from_parameters(p)?)
    }

    /// The user parameters.
    pub fn params(&self) -> LogicleParams {
        self.params
    }

    /// Display value of data zero.
    pub fn zero_point(&self) -> f64 {
        self.coef.x1
    }

    fn series(&self, y: f64) -> f64 {
        let k = &self.coef;
        let x = y - k.x1;
        let mut sum = k.taylor[TAYLOR_LENGTH - 1] * x;
        for i in (0..TAYLOR_LENGTH - 1).rev() {
            sum = (sum + k.taylor[i]) * x;
        }
        sum
    }

    fn hyperlog_upper(&self, y: f64) -> f64 {
        let k = &self.coef;
        if y < k.x_taylor {
            self.series(y)
        } else {
            (k.a * (k.b * y).exp() + k.c * y) - k.f
        }
    }

    fn evaluate_upper(&self, y: f64, target: f64) -> Evaluation {
        let k = &self.coef;
        let abe2by = k.a * k.b * (k.b * y).exp();
        Evaluation {
            value: self.hyperlog_upper(y) - target,
            slope: abe2by + k.c,
            curvature: k.b * abe2by,
        }
    }
}

impl ScaleFunction for HyperlogTransform {
    fn apply(&self, value: f64) -> Option<f64> {
        let x1 = self.coef.x1;
        if value == 0.0 {
            return Some(x1);
        }
        let negative = value < 0.0;
        let target = value.abs();

        let mut hi = 1.0;
        while self.hyperlog_upper(hi) < target {
            hi = x1 + 2.0 * (hi - x1);
        }

        let k = &self.coef;
        let guess = if target < k.f {
            x1 + target / k.taylor[0]
        } else {
            (target / k.a).ln() / k.b
        };
        let y = solver::solve_increasing(|y| self.evaluate_upper(y, target), x1, hi, guess);

        Some(if negative { 2.0 * x1 - y } else { y })
    }

    fn invert(&self, y: f64) -> f64 {
        let x1 = self.coef.x1;
        if y < x1 {
            -self.hyperlog_upper(2.0 * x1 - y)
        } else {
            self.hyperlog_upper(y)
        }
    }

    fn parameters(&self) -> Vec<(&'static str, f64)> {
        self.params.as_list()
    }
}

impl TryFrom<LogicleParams> for HyperlogTransform {
    type Error = ParameterError;

    fn try_from(p: LogicleParams) -> Result<Self, Self::Error> {
        Self::new(p)
    }
}

impl From<HyperlogTransform> for LogicleParams {
    fn from(x: HyperlogTransform) -> Self {
        x.params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn standard() -> HyperlogTransform {
        HyperlogTransform::new(LogicleParams {
            t: 10000.0,
            w: 0.5,
            m: 4.5,
            a: 0.0,
        })
        .unwrap()
    }

    #[test]
    fn endpoints() {
        let xf = standard();
        assert!((xf.apply(10000.0).unwrap() - 1.0).abs() < 1e-12);
        assert_eq!(xf.apply(0.0), Some(xf.zero_point()));
        assert_eq!(xf.invert(xf.zero_point()), 0.0);
    }

    #[test]
    fn zero_width_is_rejected() {
        let err = HyperlogTransform::new(LogicleParams {
            t: 10000.0,
            w: 0.0,
            m: 4.5,
            a: 0.0,
        });
        assert!(err.is_err());
    }

    #[test]
    fn round_trip_through_linear_region() {
        let xf = standard();
        for x in [-5.0, -0.01, 0.01, 1.0, 3.5] {
            let back = xf.invert(xf.apply(x).unwrap());
            assert!((back - x).abs() <= 1e-9 * x.abs().max(1.0), "{x} -> {back}");
        }
    }
}
