//! # Forward/Inverse Symmetry Self-Check
//!
//! Verifies `inverse(forward(x)) ≈ x` for a transform over a set of inputs.
//! The check is relative with an absolute floor near zero:
//!
//! ```text
//! |inverse(forward(x)) − x| ≤ tolerance · max(1, |x|)
//! ```
//!
//! This is a diagnostic. Evaluation never calls it; a failure is reported
//! as [`ToleranceViolation`] naming the first offending input.

use cytogate_core::{CytogateError, ToleranceViolation};

use crate::transform::{Transform, TransformKind};

/// Default relative tolerance.
pub const DEFAULT_TOLERANCE: f64 = 1e-9;

/// Outcome of a passing symmetry check.
#[derive(Debug, Clone, PartialEq)]
pub struct SymmetryReport {
    /// Number of inputs checked.
    pub checked: usize,
    /// Largest scaled error `|recovered − x| / max(1, |x|)` observed.
    pub max_error: f64,
}

/// Check the round trip of every input.
///
/// Inputs outside the transform's domain are a domain error, not a
/// violation. Ratio transforms need a denominator column and fail with
/// `RequiresReference`.
pub fn check_symmetry(
    transform: &Transform,
    inputs: &[f64],
    tolerance: f64,
) -> Result<SymmetryReport, CytogateError> {
    let forward = transform.forward(inputs)?;
    let recovered = transform.inverse(&forward)?;

    let mut max_error = 0.0_f64;
    for (&x, &back) in inputs.iter().zip(&recovered) {
        let error = (back - x).abs() / x.abs().max(1.0);
        if !(error <= tolerance) {
            return Err(ToleranceViolation {
                transform: transform.name().to_string(),
                input: x,
                recovered: back,
                tolerance,
            }
            .into());
        }
        max_error = max_error.max(error);
    }

    tracing::debug!(
        transform = %transform.name(),
        checked = inputs.len(),
        max_error,
        "symmetry check passed"
    );
    Ok(SymmetryReport {
        checked: inputs.len(),
        max_error,
    })
}

/// Representative inputs spanning a transform's domain: near zero, around
/// the linear region, at top of scale and beyond it.
pub fn probe_points(transform: &Transform) -> Vec<f64> {
    let param = |key: &str| {
        transform
            .kind()
            .parameters()
            .into_iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v)
    };

    match transform.kind() {
        TransformKind::Logarithmic(_) => {
            let top = param("t").unwrap_or(1.0);
            let decades = param("m").unwrap_or(1.0);
            let floor = top * 10f64.powf(-decades);
            vec![floor, floor * 1.5, 1e-3 * top, 0.5 * top, top, 10.0 * top]
        }
        TransformKind::WspLog(_) => {
            let offset = param("offset").unwrap_or(1.0);
            let decades = param("decades").unwrap_or(1.0);
            let top = offset * 10f64.powf(decades);
            vec![offset, offset * 1.01, offset * 10.0, 0.5 * top, top, 10.0 * top]
        }
        TransformKind::Ratio(_) => Vec::new(),
        _ => {
            let top = param("t").or_else(|| param("max_value")).unwrap_or(1.0);
            vec![
                -top,
                -100.0,
                -1.0,
                -1e-6,
                0.0,
                1e-9,
                1e-6,
                1e-3,
                0.5,
                1.0,
                10.0,
                100.0,
                0.5 * top,
                top,
                10.0 * top,
            ]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::BiexParams;
    use cytogate_core::{TransformError, TransformName};

    fn name(s: &str) -> TransformName {
        TransformName::new(s).unwrap()
    }

    fn all_scale_kinds() -> Vec<Transform> {
        vec![
            Transform::linear(name("linear"), 262144.0, 0.0).unwrap(),
            Transform::logarithmic(name("log"), 262144.0, 4.5).unwrap(),
            Transform::asinh(name("asinh"), 262144.0, 4.0, 1.0).unwrap(),
            Transform::logicle(name("logicle"), 262144.0, 0.5, 4.5, 0.0).unwrap(),
            Transform::logicle(name("logicle-a"), 262144.0, 1.0, 4.5, 0.5).unwrap(),
            Transform::hyperlog(name("hyperlog"), 262144.0, 0.5, 4.5, 0.0).unwrap(),
            Transform::biexponential(name("biex"), BiexParams::default()).unwrap(),
            Transform::wsp_log(name("wsp"), 1.0, 4.5).unwrap(),
        ]
    }

    #[test]
    fn every_kind_is_symmetric_over_its_probes() {
        for xf in all_scale_kinds() {
            let probes = probe_points(&xf);
            let report = check_symmetry(&xf, &probes, DEFAULT_TOLERANCE)
                .unwrap_or_else(|e| panic!("{xf}: {e}"));
            assert_eq!(report.checked, probes.len());
        }
    }

    #[test]
    fn out_of_domain_probe_is_a_domain_error() {
        let xf = Transform::logarithmic(name("log"), 10000.0, 4.0).unwrap();
        let err = check_symmetry(&xf, &[0.0], DEFAULT_TOLERANCE).unwrap_err();
        assert!(matches!(
            err,
            CytogateError::Transform(TransformError::Domain { .. })
        ));
    }

    #[test]
    fn zero_tolerance_reports_the_offending_input() {
        let xf = Transform::logicle(name("logicle"), 10000.0, 0.5, 4.5, 0.0).unwrap();
        // a negative tolerance can never be met
        let err = check_symmetry(&xf, &[42.0], -1.0).unwrap_err();
        match err {
            CytogateError::Tolerance(v) => {
                assert_eq!(v.transform, "logicle");
                assert_eq!(v.input, 42.0);
            }
            other => panic!("unexpected {other}"),
        }
    }

    #[test]
    fn ratio_needs_a_denominator() {
        let xf = Transform::ratio(
            name("r"),
            "A",
            crate::transform::RatioDenominator::Constant(2.0),
            1.0,
            0.0,
            0.0,
        )
        .unwrap();
        assert!(probe_points(&xf).is_empty());
        assert!(check_symmetry(&xf, &[1.0], DEFAULT_TOLERANCE).is_err());
    }
}
