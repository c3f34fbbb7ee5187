//! # Logicle Transform
//!
//! The logicle scale (Parks, Roederer & Moore, 2006) is defined implicitly:
//! the display value `y` for data value `x` is the root of
//!
//! ```text
//! B(y) = a·e^(b·y) − c·e^(−d·y) + f = x        for y >= x1
//! B(y) = −B(2·x1 − y)                            for y <  x1
//! ```
//!
//! with `a, b, c, d, f` derived from the user parameters `(t, w, m, a)`.
//! `B(x1) = 0` and `B(1) = t`.
//!
//! ## Forward / inverse symmetry
//!
//! [`LogicleTransform::invert`] evaluates `B` directly. Near the zero point
//! the exponential form loses precision to cancellation, so within a
//! quarter of the linearization width `B` is evaluated from its Taylor
//! series about `x1` instead. The forward direction solves against the very
//! same piecewise `B`, so `invert(apply(x))` recovers `x` to within a few
//! ulps of the root's precision, including at the series boundary.

use std::f64::consts::LN_10;

use serde::{Deserialize, Serialize};

use super::solver::{self, Evaluation};
use super::{require_param, ParameterError, Parameters, ScaleFunction};

/// Number of Taylor coefficients kept for the near-zero series.
pub(crate) const TAYLOR_LENGTH: usize = 16;

/// Logicle-family user parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LogicleParams {
    /// Top of scale data value.
    pub t: f64,
    /// Linearization width, in decades.
    pub w: f64,
    /// Total display width, in decades.
    pub m: f64,
    /// Additional negative decades.
    #[serde(default)]
    pub a: f64,
}

impl LogicleParams {
    /// Check the logicle constraints: `t > 0`, `m > 0`, `0 <= w <= m/2`,
    /// `-w <= a <= m - 2w`.
    pub(crate) fn validate(&self, require_positive_width: bool) -> Result<(), ParameterError> {
        let LogicleParams { t, w, m, a } = *self;
        if !(t.is_finite() && t > 0.0) {
            return Err(ParameterError::new(format!("t must be positive, got {t}")));
        }
        if !(m.is_finite() && m > 0.0) {
            return Err(ParameterError::new(format!("m must be positive, got {m}")));
        }
        let width_ok = if require_positive_width {
            w > 0.0 && w <= m / 2.0
        } else {
            w >= 0.0 && w <= m / 2.0
        };
        if !(w.is_finite() && width_ok) {
            return Err(ParameterError::new(format!(
                "w must lie in {}0, m/2], got {w}",
                if require_positive_width { "(" } else { "[" }
            )));
        }
        if !(a.is_finite() && a >= -w && a <= m - 2.0 * w) {
            return Err(ParameterError::new(format!(
                "a must lie in [-w, m - 2w], got {a}"
            )));
        }
        Ok(())
    }

    pub(crate) fn from_parameters(p: &Parameters) -> Result<Self, ParameterError> {
        Ok(Self {
            t: require_param(p, "t")?,
            w: require_param(p, "w")?,
            m: require_param(p, "m")?,
            a: require_param(p, "a")?,
        })
    }

    pub(crate) fn as_list(&self) -> Vec<(&'static str, f64)> {
        vec![("t", self.t), ("w", self.w), ("m", self.m), ("a", self.a)]
    }
}

/// Derived biexponential coefficients.
#[derive(Debug, Clone, PartialEq)]
struct Coefficients {
    a: f64,
    b: f64,
    c: f64,
    d: f64,
    f: f64,
    x1: f64,
    x_taylor: f64,
    taylor: [f64; TAYLOR_LENGTH],
}

/// Logicle transform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "LogicleParams", into = "LogicleParams")]
pub struct LogicleTransform {
    params: LogicleParams,
    coef: Coefficients,
}

impl LogicleTransform {
    /// Validate parameters and derive the biexponential coefficients.
    pub fn new(params: LogicleParams) -> Result<Self, ParameterError> {
        params.validate(false)?;
        let LogicleParams { t, w: width, m, a: neg } = params;

        let w = width / (m + neg);
        let x2 = neg / (m + neg);
        let x1 = x2 + w;
        let x0 = x2 + 2.0 * w;
        let b = (m + neg) * LN_10;
        let d = solve_d(b, w);

        let c_a = (x0 * (b + d)).exp();
        let mf_a = (b * x1).exp() - c_a / (d * x1).exp();
        let a = t / (((b).exp() - mf_a) - c_a / d.exp());
        let c = c_a * a;
        let f = -mf_a * a;

        let mut taylor = [0.0; TAYLOR_LENGTH];
        let mut pos_coef = a * (b * x1).exp();
        let mut neg_coef = -c / (d * x1).exp();
        for (i, slot) in taylor.iter_mut().enumerate() {
            pos_coef *= b / (i as f64 + 1.0);
            neg_coef *= -d / (i as f64 + 1.0);
            *slot = pos_coef + neg_coef;
        }
        // the logicle condition makes the second-order term vanish exactly
        taylor[1] = 0.0;

        if ![a, c, d, f].iter().all(|v| v.is_finite()) {
            return Err(ParameterError::new(
                "parameters produce non-finite logicle coefficients",
            ));
        }

        Ok(Self {
            params,
            coef: Coefficients {
                a,
                b,
                c,
                d,
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
        for i in (2..TAYLOR_LENGTH - 1).rev() {
            sum = (sum + k.taylor[i]) * x;
        }
        (sum * x + k.taylor[0]) * x
    }

    /// `B(y)` for `y >= x1`.
    fn biexponential_upper(&self, y: f64) -> f64 {
        let k = &self.coef;
        if y < k.x_taylor {
            self.series(y)
        } else {
            (k.a * (k.b * y).exp() + k.f) - k.c / (k.d * y).exp()
        }
    }

    fn evaluate_upper(&self, y: f64, target: f64) -> Evaluation {
        let k = &self.coef;
        let ae2by = k.a * (k.b * y).exp();
        let ce2mdy = k.c / (k.d * y).exp();
        let abe2by = k.b * ae2by;
        let cde2mdy = k.d * ce2mdy;
        Evaluation {
            value: self.biexponential_upper(y) - target,
            slope: abe2by + cde2mdy,
            curvature: k.b * abe2by - k.d * cde2mdy,
        }
    }
}

impl ScaleFunction for LogicleTransform {
    fn apply(&self, value: f64) -> Option<f64> {
        let x1 = self.coef.x1;
        if value == 0.0 {
            return Some(x1);
        }
        let negative = value < 0.0;
        let target = value.abs();

        // B is increasing on [x1, inf) with B(x1) = 0 and B(1) = t; widen
        // the upper end until it brackets the target.
        let mut hi = 1.0;
        while self.biexponential_upper(hi) < target {
            hi = x1 + 2.0 * (hi - x1);
        }

        let k = &self.coef;
        let guess = if target < k.f.abs() {
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
            -self.biexponential_upper(2.0 * x1 - y)
        } else {
            self.biexponential_upper(y)
        }
    }

    fn parameters(&self) -> Vec<(&'static str, f64)> {
        self.params.as_list()
    }
}

/// Solve `2·ln(d) + w·d = 2·ln(b) − w·b` for `d` in `(0, b]`.
pub(crate) fn solve_d(b: f64, w: f64) -> f64 {
    if w == 0.0 {
        return b;
    }
    let f_b = -2.0 * b.ln() + w * b;
    solver::solve_increasing(
        |d| Evaluation {
            value: 2.0 * d.ln() + w * d + f_b,
            slope: 2.0 / d + w,
            curvature: -2.0 / (d * d),
        },
        0.0,
        b,
        b / 2.0,
    )
}

impl TryFrom<LogicleParams> for LogicleTransform {
    type Error = ParameterError;

    fn try_from(p: LogicleParams) -> Result<Self, Self::Error> {
        Self::new(p)
    }
}

impl From<LogicleTransform> for LogicleParams {
    fn from(x: LogicleTransform) -> Self {
        x.params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn standard() -> LogicleTransform {
        LogicleTransform::new(LogicleParams {
            t: 10000.0,
            w: 0.5,
            m: 4.5,
            a: 0.0,
        })
        .unwrap()
    }

    #[test]
    fn top_of_scale_maps_to_one() {
        let xf = standard();
        assert!((xf.apply(10000.0).unwrap() - 1.0).abs() < 1e-12);
        assert!((xf.invert(1.0) - 10000.0).abs() < 1e-8);
    }

    #[test]
    fn zero_maps_to_zero_point() {
        let xf = standard();
        assert!((xf.zero_point() - 0.5 / 4.5).abs() < 1e-15);
        assert_eq!(xf.apply(0.0), Some(xf.zero_point()));
        assert_eq!(xf.invert(xf.zero_point()), 0.0);
    }

    #[test]
    fn negative_values_mirror_about_zero_point() {
        let xf = standard();
        let x1 = xf.zero_point();
        let up = xf.apply(25.0).unwrap();
        let down = xf.apply(-25.0).unwrap();
        assert!(((up - x1) - (x1 - down)).abs() < 1e-14);
    }

    #[test]
    fn forward_is_monotonic() {
        let xf = standard();
        let mut last = f64::NEG_INFINITY;
        for i in -200..=200 {
            let x = (i as f64) * 60.0;
            let y = xf.apply(x).unwrap();
            assert!(y >= last, "non-monotonic at {x}");
            last = y;
        }
    }

    #[test]
    fn series_and_exponential_agree_at_boundary() {
        let xf = standard();
        let k = &xf.coef;
        let series = xf.series(k.x_taylor);
        let exact = (k.a * (k.b * k.x_taylor).exp() + k.f) - k.c / (k.d * k.x_taylor).exp();
        assert!((series - exact).abs() <= 1e-9 * exact.abs().max(1.0));
    }

    #[test]
    fn zero_width_is_pure_log_like() {
        let xf = LogicleTransform::new(LogicleParams {
            t: 10000.0,
            w: 0.0,
            m: 4.5,
            a: 0.0,
        })
        .unwrap();
        let y = xf.apply(100.0).unwrap();
        assert!((xf.invert(y) - 100.0).abs() < 1e-9 * 100.0);
    }

    #[test]
    fn rejects_invalid_width() {
        let err = LogicleTransform::new(LogicleParams {
            t: 10000.0,
            w: 3.0,
            m: 4.5,
            a: 0.0,
        });
        assert!(err.is_err());
    }

    #[test]
    fn d_solver_satisfies_equation() {
        let b = 4.5 * LN_10;
        let w = 0.5 / 4.5;
        let d = solve_d(b, w);
        let lhs = 2.0 * d.ln() + w * d;
        let rhs = 2.0 * b.ln() - w * b;
        assert!((lhs - rhs).abs() < 1e-12);
        assert!(d > 0.0 && d < b);
    }
}
