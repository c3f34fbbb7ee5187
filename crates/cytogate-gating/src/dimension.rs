//! # Dimensions
//!
//! A [`Dimension`] is one gate axis: a source column (a channel label or a
//! registered ratio transform), an optional compensation reference, an
//! optional transform and, for range-style gates, an optional `[min, max)`
//! interval.
//!
//! Resolution order is fixed: compensation first (on raw intensities),
//! then the ratio if the source is one, then the transform.

use std::fmt;

use serde::{Deserialize, Serialize};

use cytogate_core::{
    CompensationName, CytogateError, DimensionError, EventMatrix, Sample, StrategyError,
    TransformError, TransformName,
};
use cytogate_transform::{DomainPolicy, RatioDenominator};

use crate::registry::Registry;

/// Which spillover matrix, if any, a dimension is compensated with.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompensationRef {
    /// Raw intensities.
    #[default]
    Uncompensated,
    /// The matrix embedded in the sample.
    Sample,
    /// A matrix registered in the strategy.
    Named(CompensationName),
}

impl fmt::Display for CompensationRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uncompensated => f.write_str("uncompensated"),
            Self::Sample => f.write_str("sample"),
            Self::Named(name) => write!(f, "{name}"),
        }
    }
}

/// Where a dimension's values come from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DimensionSource {
    /// A channel of the sample, by name.
    Channel(String),
    /// A registered ratio transform over two channels.
    Ratio(TransformName),
}

/// Memoization key: dimensions that agree on source, transform and
/// compensation resolve to the same column.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DimensionKey {
    source: DimensionSource,
    transform: Option<TransformName>,
    compensation: CompensationRef,
}

/// One axis of a gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dimension {
    #[serde(flatten)]
    source: DimensionSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    transform: Option<TransformName>,
    #[serde(default)]
    compensation: CompensationRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    max: Option<f64>,
}

impl Dimension {
    /// Uncompensated, untransformed channel.
    pub fn channel(label: impl Into<String>) -> Self {
        Self::from_source(DimensionSource::Channel(label.into()))
    }

    /// Ratio of two channels through a registered ratio transform.
    pub fn ratio(transform: TransformName) -> Self {
        Self::from_source(DimensionSource::Ratio(transform))
    }

    fn from_source(source: DimensionSource) -> Self {
        Self {
            source,
            transform: None,
            compensation: CompensationRef::Uncompensated,
            min: None,
            max: None,
        }
    }

    /// Apply a registered transform after compensation.
    pub fn with_transform(mut self, transform: TransformName) -> Self {
        self.transform = Some(transform);
        self
    }

    /// Compensate before transforming.
    pub fn with_compensation(mut self, compensation: CompensationRef) -> Self {
        self.compensation = compensation;
        self
    }

    /// Bound to `[min, max)`; either end may be open.
    pub fn with_range(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.min = min;
        self.max = max;
        self
    }

    /// Source column.
    pub fn source(&self) -> &DimensionSource {
        &self.source
    }

    /// Transform reference.
    pub fn transform(&self) -> Option<&TransformName> {
        self.transform.as_ref()
    }

    /// Compensation reference.
    pub fn compensation(&self) -> &CompensationRef {
        &self.compensation
    }

    /// Inclusive lower bound.
    pub fn min(&self) -> Option<f64> {
        self.min
    }

    /// Exclusive upper bound.
    pub fn max(&self) -> Option<f64> {
        self.max
    }

    /// Channel label or ratio transform name.
    pub fn label(&self) -> &str {
        match &self.source {
            DimensionSource::Channel(label) => label,
            DimensionSource::Ratio(name) => name.as_str(),
        }
    }

    /// Whether `value` lies in `[min, max)`.
    pub fn in_range(&self, value: f64) -> bool {
        self.min.map_or(true, |min| value >= min) && self.max.map_or(true, |max| value < max)
    }

    /// Memoization key of this dimension.
    pub fn key(&self) -> DimensionKey {
        DimensionKey {
            source: self.source.clone(),
            transform: self.transform.clone(),
            compensation: self.compensation.clone(),
        }
    }

    /// Check references against a registry. `gate` names the owner in
    /// errors.
    pub(crate) fn validate(&self, gate: &str, registry: &Registry) -> Result<(), StrategyError> {
        if let DimensionSource::Ratio(name) = &self.source {
            let transform = registry
                .transform(name)
                .ok_or_else(|| undefined_transform(gate, name))?;
            if transform.as_ratio().is_none() {
                return Err(StrategyError::InvalidGeometry {
                    gate: gate.to_string(),
                    reason: format!("'{name}' is not a ratio transform"),
                });
            }
        }
        if let Some(name) = &self.transform {
            let transform = registry
                .transform(name)
                .ok_or_else(|| undefined_transform(gate, name))?;
            if transform.as_ratio().is_some() {
                return Err(StrategyError::InvalidGeometry {
                    gate: gate.to_string(),
                    reason: format!("ratio transform '{name}' cannot transform a single column"),
                });
            }
        }
        if let CompensationRef::Named(name) = &self.compensation {
            if registry.compensation(name).is_none() {
                return Err(StrategyError::UndefinedCompensation {
                    gate: gate.to_string(),
                    compensation: name.to_string(),
                });
            }
        }
        if let (Some(min), Some(max)) = (self.min, self.max) {
            if !(min < max) {
                return Err(StrategyError::InvalidGeometry {
                    gate: gate.to_string(),
                    reason: format!("dimension '{}' has empty range [{min}, {max})", self.label()),
                });
            }
        }
        Ok(())
    }

    /// Resolve against a sample without memoization: look up the column,
    /// compensate, then transform.
    pub fn resolve(
        &self,
        sample: &Sample,
        registry: &Registry,
        policy: DomainPolicy,
    ) -> Result<Vec<f64>, CytogateError> {
        match registry.matrix_for(&self.compensation, sample)? {
            Some(matrix) => {
                let compensated = matrix.apply(sample.events())?;
                self.resolve_from(&compensated, registry, policy)
            }
            None => self.resolve_from(sample.events(), registry, policy),
        }
    }

    /// Resolve against events that already carry this dimension's
    /// compensation.
    pub(crate) fn resolve_from(
        &self,
        events: &EventMatrix,
        registry: &Registry,
        policy: DomainPolicy,
    ) -> Result<Vec<f64>, CytogateError> {
        let values = match &self.source {
            DimensionSource::Channel(label) => column(events, label)?.to_vec(),
            DimensionSource::Ratio(name) => {
                let transform = registry
                    .transform(name)
                    .ok_or_else(|| undefined_transform(self.label(), name))?;
                let ratio = transform.as_ratio().ok_or_else(|| {
                    TransformError::UnsupportedOperation {
                        transform: name.to_string(),
                        kind: transform.kind().label().to_string(),
                        operation: "ratio dimension".to_string(),
                    }
                })?;
                let numerator = column(events, ratio.numerator())?;
                let denominator = match ratio.denominator() {
                    RatioDenominator::Channel(label) => column(events, label)?.to_vec(),
                    RatioDenominator::Constant(z) => vec![*z; numerator.len()],
                };
                transform.forward_ratio(numerator, &denominator)?
            }
        };

        match &self.transform {
            None => Ok(values),
            Some(name) => {
                let transform = registry
                    .transform(name)
                    .ok_or_else(|| undefined_transform(self.label(), name))?;
                Ok(transform.forward_with_policy(&values, policy)?)
            }
        }
    }
}

fn column<'a>(events: &'a EventMatrix, label: &str) -> Result<&'a [f64], DimensionError> {
    events
        .column(label)
        .ok_or_else(|| DimensionError::MissingChannel {
            channel: label.to_string(),
        })
}

fn undefined_transform(gate: &str, name: &TransformName) -> StrategyError {
    StrategyError::UndefinedTransform {
        gate: gate.to_string(),
        transform: name.to_string(),
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source {
            DimensionSource::Channel(label) => write!(f, "Dimension(label: {label})"),
            DimensionSource::Ratio(name) => write!(f, "RatioDimension(ratio_reference: {name})"),
        }
    }
}
