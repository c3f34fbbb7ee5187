//! # Biexponential (FlowJo) Transform
//!
//! FlowJo's biexponential display is specified by positive and negative
//! decades, a width basis and the instrument's maximum value, and is
//! realised as a lookup table of `channel_range + 1` data values, one per
//! display channel. Data values between table entries are linearly
//! interpolated.
//!
//! ## Exact inverse
//!
//! The table is strictly increasing, so the piecewise-linear map
//! data → channel is a bijection and its inverse is the same table read
//! the other way (channel → data). Both directions extrapolate linearly
//! beyond the end entries using the first/last segment, which keeps the
//! pair inverse to each other for inputs outside the table as well. This
//! is what makes exported, already-transformed values reversible.
//!
//! Output is normalised to `[0, 1]` over the channel range.

use std::f64::consts::LN_10;

use serde::{Deserialize, Serialize};

use super::logicle::solve_d;
use super::{require_param, ParameterError, Parameters, ScaleFunction};

/// Serialized parameter set of [`BiexTransform`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BiexParams {
    /// Positive decades.
    #[serde(default = "default_positive")]
    pub positive: f64,
    /// Negative decades.
    #[serde(default)]
    pub negative: f64,
    /// Width basis; must be negative (FlowJo convention).
    #[serde(default = "default_width")]
    pub width: f64,
    /// Data value at the top of scale.
    #[serde(default = "default_max_value")]
    pub max_value: f64,
    /// Number of display channels.
    #[serde(default = "default_channel_range")]
    pub channel_range: f64,
}

fn default_positive() -> f64 {
    4.418540715220095
}

fn default_width() -> f64 {
    -10.0
}

fn default_max_value() -> f64 {
    262144.0
}

fn default_channel_range() -> f64 {
    4096.0
}

impl Default for BiexParams {
    fn default() -> Self {
        Self {
            positive: default_positive(),
            negative: 0.0,
            width: default_width(),
            max_value: default_max_value(),
            channel_range: default_channel_range(),
        }
    }
}

/// FlowJo biexponential transform backed by a monotone lookup table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "BiexParams", into = "BiexParams")]
pub struct BiexTransform {
    params: BiexParams,
    /// Data value at each channel, strictly increasing.
    data: Vec<f64>,
    /// Channel positions `0..=channel_range`.
    channels: Vec<f64>,
}

impl BiexTransform {
    /// Validate parameters and build the lookup table.
    pub fn new(params: BiexParams) -> Result<Self, ParameterError> {
        let BiexParams {
            positive,
            negative,
            width,
            max_value,
            channel_range,
        } = params;
        if !(positive.is_finite() && positive > 0.0) {
            return Err(ParameterError::new(format!(
                "positive decades must be positive, got {positive}"
            )));
        }
        if !(negative.is_finite() && negative >= 0.0) {
            return Err(ParameterError::new(format!(
                "negative decades must be non-negative, got {negative}"
            )));
        }
        if !(width.is_finite() && width < 0.0) {
            return Err(ParameterError::new(format!(
                "width basis must be negative, got {width}"
            )));
        }
        if !(max_value.is_finite() && max_value > 0.0) {
            return Err(ParameterError::new(format!(
                "max value must be positive, got {max_value}"
            )));
        }
        if !(channel_range.is_finite() && channel_range >= 16.0 && channel_range.fract() == 0.0) {
            return Err(ParameterError::new(format!(
                "channel range must be a whole number >= 16, got {channel_range}"
            )));
        }

        let (data, channels) = build_table(&params)?;
        Ok(Self {
            params,
            data,
            channels,
        })
    }

    pub(crate) fn from_parameters(p: &Parameters) -> Result<Self, ParameterError> {
        Self::new(BiexParams {
            positive: require_param(p, "positive")?,
            negative: require_param(p, "negative")?,
            width: require_param(p, "width")?,
            max_value: require_param(p, "max_value")?,
            channel_range: require_param(p, "channel_range")?,
        })
    }

    /// The user parameters.
    pub fn params(&self) -> BiexParams {
        self.params
    }

    /// Number of lookup-table entries.
    pub fn table_len(&self) -> usize {
        self.data.len()
    }
}

fn build_table(params: &BiexParams) -> Result<(Vec<f64>, Vec<f64>), ParameterError> {
    let channel_range = params.channel_range;
    let log_width = (-params.width).log10();

    let mut decades = params.positive - log_width / 2.0;
    let extra = params.negative.max(0.0) + log_width / 2.0;
    if decades <= 0.0 {
        return Err(ParameterError::new(
            "width basis consumes all positive decades",
        ));
    }

    let zero_point = ((extra * channel_range / (extra + decades)) as usize)
        .min((channel_range / 2.0) as usize);
    if zero_point > 0 {
        decades = extra * (channel_range - zero_point as f64) / zero_point as f64;
    }
    let width = log_width / (2.0 * decades);

    let positive_range = LN_10 * decades;
    let minimum = params.max_value / positive_range.exp();
    let negative_range = solve_d(positive_range, width);

    let n_points = channel_range as usize + 1;
    let n = n_points as f64;
    let scale = ((positive_range + negative_range) * (width + extra / decades)).exp();

    let pos: Vec<f64> = (0..n_points)
        .map(|i| (i as f64 / n * positive_range).exp())
        .collect();
    let neg: Vec<f64> = (0..n_points)
        .map(|i| (i as f64 / n * -negative_range).exp() * scale)
        .collect();

    let shift = pos[zero_point] - neg[zero_point];
    let mut data = vec![0.0; n_points];
    for i in zero_point..n_points {
        data[i] = minimum * ((pos[i] - neg[i]) - shift);
    }
    for i in 0..zero_point {
        data[i] = -data[2 * zero_point - i];
    }

    if !data.windows(2).all(|pair| pair[1] > pair[0]) || !data.iter().all(|v| v.is_finite()) {
        return Err(ParameterError::new(
            "parameters produce a non-monotonic biexponential table",
        ));
    }

    let channels = (0..n_points).map(|i| i as f64).collect();
    Ok((data, channels))
}

/// Piecewise-linear interpolation over a strictly increasing `xs`, with
/// linear extrapolation from the end segments.
fn interpolate(xs: &[f64], ys: &[f64], x: f64) -> f64 {
    let upper = xs.partition_point(|&v| v <= x).clamp(1, xs.len() - 1);
    let lower = upper - 1;
    let (x0, x1) = (xs[lower], xs[upper]);
    let (y0, y1) = (ys[lower], ys[upper]);
    y0 + (x - x0) * (y1 - y0) / (x1 - x0)
}

impl ScaleFunction for BiexTransform {
    fn apply(&self, x: f64) -> Option<f64> {
        Some(interpolate(&self.data, &self.channels, x) / self.params.channel_range)
    }

    fn invert(&self, y: f64) -> f64 {
        interpolate(&self.channels, &self.data, y * self.params.channel_range)
    }

    fn parameters(&self) -> Vec<(&'static str, f64)> {
        vec![
            ("positive", self.params.positive),
            ("negative", self.params.negative),
            ("width", self.params.width),
            ("max_value", self.params.max_value),
            ("channel_range", self.params.channel_range),
        ]
    }
}

impl TryFrom<BiexParams> for BiexTransform {
    type Error = ParameterError;

    fn try_from(p: BiexParams) -> Result<Self, Self::Error> {
        Self::new(p)
    }
}

impl From<BiexTransform> for BiexParams {
    fn from(x: BiexTransform) -> Self {
        x.params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_table_is_monotonic_and_anchored() {
        let xf = BiexTransform::new(BiexParams::default()).unwrap();
        assert_eq!(xf.table_len(), 4097);
        let zero = xf.apply(0.0).unwrap();
        assert!(zero > 0.0 && zero < 0.5);
        assert!(xf.apply(262144.0).unwrap() > 0.9);
    }

    #[test]
    fn knots_are_exact() {
        let xf = BiexTransform::new(BiexParams::default()).unwrap();
        for channel in [0usize, 17, 2048, 4096] {
            let y = channel as f64 / 4096.0;
            let x = xf.invert(y);
            assert!((xf.apply(x).unwrap() - y).abs() < 1e-12);
        }
    }

    #[test]
    fn extrapolates_beyond_table() {
        let xf = BiexTransform::new(BiexParams::default()).unwrap();
        let above = xf.apply(1.0e6).unwrap();
        assert!(above > 1.0);
        assert!((xf.invert(above) - 1.0e6).abs() < 1e-6 * 1.0e6);
    }

    #[test]
    fn negative_decades_widen_negative_side() {
        let narrow = BiexTransform::new(BiexParams::default()).unwrap();
        let wide = BiexTransform::new(BiexParams {
            negative: 1.0,
            ..BiexParams::default()
        })
        .unwrap();
        assert!(wide.apply(0.0).unwrap() > narrow.apply(0.0).unwrap());
    }

    #[test]
    fn positive_width_basis_is_rejected() {
        assert!(BiexTransform::new(BiexParams {
            width: 10.0,
            ..BiexParams::default()
        })
        .is_err());
    }
}
