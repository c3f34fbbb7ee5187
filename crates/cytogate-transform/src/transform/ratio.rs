//! Ratio of two channels, `y = a·(x − b) / (z − c)`.
//!
//! Unlike the other kinds this needs two columns: the numerator channel `x`
//! and a denominator `z` that is either another channel or a constant. The
//! inverse recovers the numerator given the same denominator.

use serde::{Deserialize, Serialize};

use super::{require_param, ParameterError, Parameters};

/// Denominator of a ratio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RatioDenominator {
    /// Another channel of the same sample.
    Channel(String),
    /// A fixed value.
    Constant(f64),
}

/// Ratio transform between two channels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RatioParams", into = "RatioParams")]
pub struct RatioTransform {
    numerator: String,
    denominator: RatioDenominator,
    a: f64,
    b: f64,
    c: f64,
}

/// Serialized form of [`RatioTransform`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatioParams {
    /// Numerator channel.
    pub numerator: String,
    /// Denominator channel or constant.
    pub denominator: RatioDenominator,
    /// Scale factor.
    #[serde(default = "one")]
    pub a: f64,
    /// Numerator offset.
    #[serde(default)]
    pub b: f64,
    /// Denominator offset.
    #[serde(default)]
    pub c: f64,
}

fn one() -> f64 {
    1.0
}

impl RatioTransform {
    /// Validate `a != 0` and finite offsets.
    pub fn new(
        numerator: impl Into<String>,
        denominator: RatioDenominator,
        a: f64,
        b: f64,
        c: f64,
    ) -> Result<Self, ParameterError> {
        if !(a.is_finite() && a != 0.0) {
            return Err(ParameterError::new(format!("a must be non-zero, got {a}")));
        }
        if !(b.is_finite() && c.is_finite()) {
            return Err(ParameterError::new("b and c must be finite"));
        }
        if let RatioDenominator::Constant(z) = denominator {
            if !z.is_finite() || z == c {
                return Err(ParameterError::new(format!(
                    "constant denominator {z} makes the ratio undefined"
                )));
            }
        }
        Ok(Self {
            numerator: numerator.into(),
            denominator,
            a,
            b,
            c,
        })
    }

    pub(crate) fn rebuild(&self, p: &Parameters) -> Result<Self, ParameterError> {
        Self::new(
            self.numerator.clone(),
            self.denominator.clone(),
            require_param(p, "a")?,
            require_param(p, "b")?,
            require_param(p, "c")?,
        )
    }

    /// Numerator channel name.
    pub fn numerator(&self) -> &str {
        &self.numerator
    }

    /// Denominator.
    pub fn denominator(&self) -> &RatioDenominator {
        &self.denominator
    }

    /// Ratio for one event; `None` where the denominator equals `c`.
    pub fn ratio(&self, x: f64, z: f64) -> Option<f64> {
        let denom = z - self.c;
        if denom == 0.0 {
            return None;
        }
        Some(self.a * (x - self.b) / denom)
    }

    /// Numerator recovered from a ratio and its denominator.
    pub fn numerator_from(&self, y: f64, z: f64) -> f64 {
        y * (z - self.c) / self.a + self.b
    }

    pub(crate) fn parameters(&self) -> Vec<(&'static str, f64)> {
        vec![("a", self.a), ("b", self.b), ("c", self.c)]
    }

    pub(crate) fn denominator_label(&self) -> String {
        match &self.denominator {
            RatioDenominator::Channel(name) => name.clone(),
            RatioDenominator::Constant(z) => z.to_string(),
        }
    }
}

impl TryFrom<RatioParams> for RatioTransform {
    type Error = ParameterError;

    fn try_from(p: RatioParams) -> Result<Self, Self::Error> {
        Self::new(p.numerator, p.denominator, p.a, p.b, p.c)
    }
}

impl From<RatioTransform> for RatioParams {
    fn from(x: RatioTransform) -> Self {
        Self {
            numerator: x.numerator,
            denominator: x.denominator,
            a: x.a,
            b: x.b,
            c: x.c,
        }
    }
}
