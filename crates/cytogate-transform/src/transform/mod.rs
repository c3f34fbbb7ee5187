//! # Transforms
//!
//! A [`Transform`] is a named, parameterized scalar map from raw channel
//! values into an analysis scale, together with its exact inverse. The
//! kind is a closed sum type ([`TransformKind`]); every dispatch below is
//! an exhaustive `match`, so adding a kind is a compile error until each
//! path handles it.
//!
//! ## Kinds
//!
//! | Kind | Parameters | Domain |
//! |---|---|---|
//! | `linear` | `t, a` | all reals |
//! | `logarithmic` | `t, m` | `x > 0` |
//! | `asinh` | `t, m, a` | all reals |
//! | `logicle` | `t, w, m, a` | all reals |
//! | `hyperlog` | `t, w, m, a` | all reals |
//! | `biexponential` | `positive, negative, width, max_value, channel_range` | all reals |
//! | `wsp_log` | `offset, decades` | `x >= offset` |
//! | `ratio` | `a, b, c` + numerator/denominator | denominator `!= c` |
//!
//! ## Column evaluation
//!
//! All evaluation takes whole columns. Scalar helpers are the length-1
//! special case.
//!
//! ## Domain policy
//!
//! Out-of-domain input is a [`TransformError::Domain`] under
//! [`DomainPolicy::Reject`] (the default). [`DomainPolicy::Clamp`] replaces
//! every input below the kind's domain floor, the input that maps to the
//! bottom of the display scale, by the floor itself, so the clamped map
//! stays monotonic. Kinds without a floor still reject.

mod asinh;
mod biex;
mod hyperlog;
mod linear;
mod log;
mod logicle;
mod ratio;
mod solver;

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use cytogate_core::{TransformError, TransformName};

pub use asinh::{AsinhParams, AsinhTransform};
pub use biex::{BiexParams, BiexTransform};
pub use hyperlog::HyperlogTransform;
pub use linear::{LinearParams, LinearTransform};
pub use log::{LogParams, LogTransform, WspLogParams, WspLogTransform};
pub use logicle::{LogicleParams, LogicleTransform};
pub use ratio::{RatioDenominator, RatioParams, RatioTransform};

/// A parameter set rejected by a transform constructor.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct ParameterError(String);

impl ParameterError {
    pub(crate) fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }

    /// The rejection reason.
    pub fn reason(&self) -> &str {
        &self.0
    }
}

/// Named parameter values of one transform.
pub(crate) type Parameters = BTreeMap<String, f64>;

pub(crate) fn require_param(p: &Parameters, key: &str) -> Result<f64, ParameterError> {
    p.get(key)
        .copied()
        .ok_or_else(|| ParameterError::new(format!("missing parameter '{key}'")))
}

/// Single-column scale map implemented by every kind except ratio.
pub(crate) trait ScaleFunction {
    /// Forward map of one value, `None` outside the domain.
    fn apply(&self, x: f64) -> Option<f64>;

    /// Inverse map of one value.
    fn invert(&self, y: f64) -> f64;

    /// Smallest in-domain input, for kinds with a restricted domain.
    fn domain_floor(&self) -> Option<f64> {
        None
    }

    /// Parameters in display order.
    fn parameters(&self) -> Vec<(&'static str, f64)>;
}

/// What to do with input outside a transform's domain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DomainPolicy {
    /// Fail with [`TransformError::Domain`].
    #[default]
    Reject,
    /// Replace by the kind's domain floor.
    Clamp,
}

/// Per-call parameter replacements, keyed by parameter name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParamOverrides(BTreeMap<String, f64>);

impl ParamOverrides {
    /// No overrides.
    pub fn new() -> Self {
        Self::default()
    }

    /// Override one parameter.
    pub fn set(mut self, key: impl Into<String>, value: f64) -> Self {
        self.0.insert(key.into(), value);
        self
    }

    /// Whether any parameter is overridden.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// The closed set of transform kinds with their parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransformKind {
    /// `(x + a) / (t + a)`.
    Linear(LinearTransform),
    /// `log10(x / t) / m + 1`.
    Logarithmic(LogTransform),
    /// Inverse hyperbolic sine.
    Asinh(AsinhTransform),
    /// Logicle biexponential.
    Logicle(LogicleTransform),
    /// Hyperlog.
    Hyperlog(HyperlogTransform),
    /// FlowJo lookup-table biexponential.
    Biexponential(BiexTransform),
    /// FlowJo logarithmic.
    WspLog(WspLogTransform),
    /// Two-channel ratio.
    Ratio(RatioTransform),
}

impl TransformKind {
    /// Kind label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Linear(_) => "linear",
            Self::Logarithmic(_) => "logarithmic",
            Self::Asinh(_) => "asinh",
            Self::Logicle(_) => "logicle",
            Self::Hyperlog(_) => "hyperlog",
            Self::Biexponential(_) => "biexponential",
            Self::WspLog(_) => "wsp_log",
            Self::Ratio(_) => "ratio",
        }
    }

    fn type_name(&self) -> &'static str {
        match self {
            Self::Linear(_) => "LinearTransform",
            Self::Logarithmic(_) => "LogTransform",
            Self::Asinh(_) => "AsinhTransform",
            Self::Logicle(_) => "LogicleTransform",
            Self::Hyperlog(_) => "HyperlogTransform",
            Self::Biexponential(_) => "BiexTransform",
            Self::WspLog(_) => "WspLogTransform",
            Self::Ratio(_) => "RatioTransform",
        }
    }

    fn scale_function(&self) -> Option<&dyn ScaleFunction> {
        match self {
            Self::Linear(x) => Some(x),
            Self::Logarithmic(x) => Some(x),
            Self::Asinh(x) => Some(x),
            Self::Logicle(x) => Some(x),
            Self::Hyperlog(x) => Some(x),
            Self::Biexponential(x) => Some(x),
            Self::WspLog(x) => Some(x),
            Self::Ratio(_) => None,
        }
    }

    /// Parameters in display order.
    pub fn parameters(&self) -> Vec<(&'static str, f64)> {
        match self {
            Self::Ratio(r) => r.parameters(),
            other => other
                .scale_function()
                .map(|scale| scale.parameters())
                .unwrap_or_default(),
        }
    }

    fn rebuild(&self, p: &Parameters) -> Result<Self, ParameterError> {
        Ok(match self {
            Self::Linear(_) => Self::Linear(LinearTransform::from_parameters(p)?),
            Self::Logarithmic(_) => Self::Logarithmic(LogTransform::from_parameters(p)?),
            Self::Asinh(_) => Self::Asinh(AsinhTransform::from_parameters(p)?),
            Self::Logicle(_) => Self::Logicle(LogicleTransform::from_parameters(p)?),
            Self::Hyperlog(_) => Self::Hyperlog(HyperlogTransform::from_parameters(p)?),
            Self::Biexponential(_) => Self::Biexponential(BiexTransform::from_parameters(p)?),
            Self::WspLog(_) => Self::WspLog(WspLogTransform::from_parameters(p)?),
            Self::Ratio(r) => Self::Ratio(r.rebuild(p)?),
        })
    }
}

/// A named transform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    name: TransformName,
    #[serde(flatten)]
    kind: TransformKind,
}

impl Transform {
    /// Wrap an already-validated kind.
    pub fn new(name: TransformName, kind: TransformKind) -> Self {
        Self { name, kind }
    }

    /// Linear transform.
    pub fn linear(name: TransformName, t: f64, a: f64) -> Result<Self, TransformError> {
        let kind = LinearTransform::new(t, a).map_err(|e| invalid(&name, e))?;
        Ok(Self::new(name, TransformKind::Linear(kind)))
    }

    /// Logarithmic transform.
    pub fn logarithmic(name: TransformName, t: f64, m: f64) -> Result<Self, TransformError> {
        let kind = LogTransform::new(t, m).map_err(|e| invalid(&name, e))?;
        Ok(Self::new(name, TransformKind::Logarithmic(kind)))
    }

    /// Arcsinh transform.
    pub fn asinh(name: TransformName, t: f64, m: f64, a: f64) -> Result<Self, TransformError> {
        let kind = AsinhTransform::new(t, m, a).map_err(|e| invalid(&name, e))?;
        Ok(Self::new(name, TransformKind::Asinh(kind)))
    }

    /// Logicle transform.
    pub fn logicle(
        name: TransformName,
        t: f64,
        w: f64,
        m: f64,
        a: f64,
    ) -> Result<Self, TransformError> {
        let kind = LogicleTransform::new(LogicleParams { t, w, m, a }).map_err(|e| invalid(&name, e))?;
        Ok(Self::new(name, TransformKind::Logicle(kind)))
    }

    /// Hyperlog transform.
    pub fn hyperlog(
        name: TransformName,
        t: f64,
        w: f64,
        m: f64,
        a: f64,
    ) -> Result<Self, TransformError> {
        let kind =
            HyperlogTransform::new(LogicleParams { t, w, m, a }).map_err(|e| invalid(&name, e))?;
        Ok(Self::new(name, TransformKind::Hyperlog(kind)))
    }

    /// FlowJo biexponential transform.
    pub fn biexponential(name: TransformName, params: BiexParams) -> Result<Self, TransformError> {
        let kind = BiexTransform::new(params).map_err(|e| invalid(&name, e))?;
        Ok(Self::new(name, TransformKind::Biexponential(kind)))
    }

    /// FlowJo logarithmic transform.
    pub fn wsp_log(name: TransformName, offset: f64, decades: f64) -> Result<Self, TransformError> {
        let kind = WspLogTransform::new(offset, decades).map_err(|e| invalid(&name, e))?;
        Ok(Self::new(name, TransformKind::WspLog(kind)))
    }

    /// Ratio transform.
    pub fn ratio(
        name: TransformName,
        numerator: impl Into<String>,
        denominator: RatioDenominator,
        a: f64,
        b: f64,
        c: f64,
    ) -> Result<Self, TransformError> {
        let kind =
            RatioTransform::new(numerator, denominator, a, b, c).map_err(|e| invalid(&name, e))?;
        Ok(Self::new(name, TransformKind::Ratio(kind)))
    }

    /// Registry name.
    pub fn name(&self) -> &TransformName {
        &self.name
    }

    /// Kind and parameters.
    pub fn kind(&self) -> &TransformKind {
        &self.kind
    }

    /// The ratio definition, if this is a ratio transform.
    pub fn as_ratio(&self) -> Option<&RatioTransform> {
        match &self.kind {
            TransformKind::Ratio(r) => Some(r),
            _ => None,
        }
    }

    /// Forward map of a column, rejecting out-of-domain input.
    pub fn forward(&self, values: &[f64]) -> Result<Vec<f64>, TransformError> {
        self.forward_with_policy(values, DomainPolicy::Reject)
    }

    /// Forward map of one value.
    pub fn forward_scalar(&self, value: f64) -> Result<f64, TransformError> {
        let scale = self.scale_function()?;
        scale.apply(value).ok_or_else(|| self.domain_error(value))
    }

    /// Forward map of a column under an explicit domain policy.
    pub fn forward_with_policy(
        &self,
        values: &[f64],
        policy: DomainPolicy,
    ) -> Result<Vec<f64>, TransformError> {
        let scale = self.scale_function()?;
        let floor = match policy {
            DomainPolicy::Clamp => scale
                .domain_floor()
                .and_then(|x| scale.apply(x).map(|y| (x, y))),
            DomainPolicy::Reject => None,
        };

        let mut clamped = 0usize;
        let mut out = Vec::with_capacity(values.len());
        for &x in values {
            match (floor, scale.apply(x)) {
                // everything below the floor clamps, not only what `apply` rejects
                (Some((x_floor, y_floor)), _) if x < x_floor => {
                    clamped += 1;
                    out.push(y_floor);
                }
                (_, Some(y)) => out.push(y),
                (Some((_, y_floor)), None) => {
                    clamped += 1;
                    out.push(y_floor);
                }
                (None, None) => return Err(self.domain_error(x)),
            }
        }

        if clamped > 0 {
            tracing::warn!(
                transform = %self.name,
                clamped,
                floor = ?floor.map(|(x, _)| x),
                "clamped out-of-domain values to the transform floor"
            );
        }
        Ok(out)
    }

    /// Forward map with some parameters replaced for this call only.
    pub fn forward_with(
        &self,
        values: &[f64],
        overrides: &ParamOverrides,
    ) -> Result<Vec<f64>, TransformError> {
        if overrides.is_empty() {
            return self.forward(values);
        }
        self.with_overrides(overrides)?.forward(values)
    }

    /// Copy of this transform with some parameters replaced; the result is
    /// re-validated.
    pub fn with_overrides(&self, overrides: &ParamOverrides) -> Result<Self, TransformError> {
        let mut params: Parameters = self
            .kind
            .parameters()
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        for (key, value) in &overrides.0 {
            match params.get_mut(key) {
                Some(slot) => *slot = *value,
                None => {
                    return Err(TransformError::InvalidParameter {
                        transform: self.name.to_string(),
                        reason: format!("unknown parameter '{key}' for {} transform", self.kind.label()),
                    })
                }
            }
        }
        let kind = self.kind.rebuild(&params).map_err(|e| invalid(&self.name, e))?;
        Ok(Self::new(self.name.clone(), kind))
    }

    /// Inverse map of a column.
    pub fn inverse(&self, values: &[f64]) -> Result<Vec<f64>, TransformError> {
        let scale = self.scale_function()?;
        Ok(values.iter().map(|&y| scale.invert(y)).collect())
    }

    /// Inverse map of one value.
    pub fn inverse_scalar(&self, value: f64) -> Result<f64, TransformError> {
        Ok(self.scale_function()?.invert(value))
    }

    /// Ratio of two aligned columns.
    pub fn forward_ratio(
        &self,
        numerator: &[f64],
        denominator: &[f64],
    ) -> Result<Vec<f64>, TransformError> {
        let ratio = self.require_ratio("forward_ratio")?;
        self.check_lengths(numerator, denominator)?;
        numerator
            .iter()
            .zip(denominator)
            .map(|(&x, &z)| ratio.ratio(x, z).ok_or_else(|| self.domain_error(z)))
            .collect()
    }

    /// Numerator recovered from ratio values and their denominators.
    pub fn inverse_ratio(
        &self,
        ratios: &[f64],
        denominator: &[f64],
    ) -> Result<Vec<f64>, TransformError> {
        let ratio = self.require_ratio("inverse_ratio")?;
        self.check_lengths(ratios, denominator)?;
        Ok(ratios
            .iter()
            .zip(denominator)
            .map(|(&y, &z)| ratio.numerator_from(y, z))
            .collect())
    }

    fn scale_function(&self) -> Result<&dyn ScaleFunction, TransformError> {
        self.kind
            .scale_function()
            .ok_or_else(|| TransformError::RequiresReference {
                transform: self.name.to_string(),
            })
    }

    fn require_ratio(&self, operation: &str) -> Result<&RatioTransform, TransformError> {
        self.as_ratio()
            .ok_or_else(|| TransformError::UnsupportedOperation {
                transform: self.name.to_string(),
                kind: self.kind.label().to_string(),
                operation: operation.to_string(),
            })
    }

    fn check_lengths(&self, a: &[f64], b: &[f64]) -> Result<(), TransformError> {
        if a.len() != b.len() {
            return Err(TransformError::LengthMismatch {
                transform: self.name.to_string(),
                expected: a.len(),
                found: b.len(),
            });
        }
        Ok(())
    }

    fn domain_error(&self, value: f64) -> TransformError {
        TransformError::Domain {
            transform: self.name.to_string(),
            value,
        }
    }
}

fn invalid(name: &TransformName, err: ParameterError) -> TransformError {
    TransformError::InvalidParameter {
        transform: name.to_string(),
        reason: err.0,
    }
}

impl fmt::Display for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({}", self.kind.type_name(), self.name)?;
        if let TransformKind::Ratio(r) = &self.kind {
            write!(f, ", {} / {}", r.numerator(), r.denominator_label())?;
        }
        for (key, value) in self.kind.parameters() {
            write!(f, ", {key}: {value:?}")?;
        }
        f.write_str(")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(s: &str) -> TransformName {
        TransformName::new(s).unwrap()
    }

    #[test]
    fn display_matches_parameter_order() {
        let xf = Transform::logicle(name("logicle"), 10000.0, 0.5, 4.5, 0.0).unwrap();
        assert_eq!(
            xf.to_string(),
            "LogicleTransform(logicle, t: 10000.0, w: 0.5, m: 4.5, a: 0.0)"
        );
        let ratio = Transform::ratio(
            name("ratio"),
            "FL1-H",
            RatioDenominator::Channel("FL2-H".into()),
            1.0,
            0.0,
            0.0,
        )
        .unwrap();
        assert_eq!(
            ratio.to_string(),
            "RatioTransform(ratio, FL1-H / FL2-H, a: 1.0, b: 0.0, c: 0.0)"
        );
    }

    #[test]
    fn log_rejects_non_positive_input() {
        let xf = Transform::logarithmic(name("log"), 10000.0, 4.5).unwrap();
        let err = xf.forward(&[10.0, 0.0, 5.0]).unwrap_err();
        assert_eq!(
            err,
            TransformError::Domain {
                transform: "log".into(),
                value: 0.0
            }
        );
    }

    #[test]
    fn clamp_policy_maps_to_floor() {
        let xf = Transform::logarithmic(name("log"), 10000.0, 4.0).unwrap();
        let out = xf
            .forward_with_policy(&[-5.0, 0.0, 10000.0], DomainPolicy::Clamp)
            .unwrap();
        assert!(out[0].abs() < 1e-12);
        assert!(out[1].abs() < 1e-12);
        assert!((out[2] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn clamp_policy_is_monotonic_below_the_floor() {
        let xf = Transform::logarithmic(name("log"), 10000.0, 4.0).unwrap();
        let out = xf
            .forward_with_policy(&[-1.0, 0.0, 0.01, 0.5, 1.0, 10000.0], DomainPolicy::Clamp)
            .unwrap();
        assert!(out.windows(2).all(|w| w[0] <= w[1]), "{out:?}");
        for y in &out[..5] {
            assert!(y.abs() < 1e-12, "{out:?}");
        }
        assert!((out[5] - 1.0).abs() < 1e-12);

        let wsp = Transform::wsp_log(name("wsp"), 10.0, 4.5).unwrap();
        let out = wsp
            .forward_with_policy(&[0.0, 1.0, 9.99, 10.0, 100.0], DomainPolicy::Clamp)
            .unwrap();
        assert!(out.windows(2).all(|w| w[0] <= w[1]), "{out:?}");
        assert_eq!(out[0], out[3]);
    }

    #[test]
    fn invalid_parameters_name_the_transform() {
        let err = Transform::logicle(name("bad"), -1.0, 0.5, 4.5, 0.0).unwrap_err();
        assert!(matches!(err, TransformError::InvalidParameter { ref transform, .. } if transform == "bad"));
    }

    #[test]
    fn overrides_apply_per_call_only() {
        let xf = Transform::linear(name("lin"), 100.0, 0.0).unwrap();
        let overridden = xf
            .forward_with(&[50.0], &ParamOverrides::new().set("t", 200.0))
            .unwrap();
        assert_eq!(overridden, vec![0.25]);
        assert_eq!(xf.forward(&[50.0]).unwrap(), vec![0.5]);
    }

    #[test]
    fn overrides_are_validated() {
        let xf = Transform::logicle(name("l"), 10000.0, 0.5, 4.5, 0.0).unwrap();
        assert!(xf
            .with_overrides(&ParamOverrides::new().set("w", 10.0))
            .is_err());
        assert!(xf
            .with_overrides(&ParamOverrides::new().set("q", 1.0))
            .is_err());
    }

    #[test]
    fn ratio_requires_reference_column() {
        let xf = Transform::ratio(
            name("r"),
            "A",
            RatioDenominator::Channel("B".into()),
            1.0,
            0.0,
            0.0,
        )
        .unwrap();
        assert!(matches!(
            xf.forward(&[1.0]),
            Err(TransformError::RequiresReference { .. })
        ));
        let y = xf.forward_ratio(&[6.0, 9.0], &[2.0, 3.0]).unwrap();
        assert_eq!(y, vec![3.0, 3.0]);
        assert_eq!(xf.inverse_ratio(&y, &[2.0, 3.0]).unwrap(), vec![6.0, 9.0]);
        assert!(matches!(
            xf.forward_ratio(&[1.0], &[0.0]),
            Err(TransformError::Domain { .. })
        ));
    }

    #[test]
    fn forward_ratio_on_scale_kind_is_unsupported() {
        let xf = Transform::linear(name("lin"), 1.0, 0.0).unwrap();
        assert!(matches!(
            xf.forward_ratio(&[1.0], &[1.0]),
            Err(TransformError::UnsupportedOperation { .. })
        ));
    }

    #[test]
    fn serde_round_trip_rebuilds_coefficients() {
        let xf = Transform::hyperlog(name("hyper"), 10000.0, 0.5, 4.5, 0.0).unwrap();
        let json = serde_json::to_value(&xf).unwrap();
        assert_eq!(json["kind"], "hyperlog");
        assert_eq!(json["name"], "hyper");
        let back: Transform = serde_json::from_value(json).unwrap();
        assert_eq!(back, xf);
    }

    #[test]
    fn serde_rejects_invalid_parameters() {
        let json = serde_json::json!({"name": "l", "kind": "logicle", "t": 10000.0, "w": 9.0, "m": 4.5});
        assert!(serde_json::from_value::<Transform>(json).is_err());
    }
}
