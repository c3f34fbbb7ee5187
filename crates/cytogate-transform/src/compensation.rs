//! # Spillover Compensation
//!
//! A [`CompensationMatrix`] is the square spillover matrix `S` over an
//! ordered set of detectors. Compensated events are `raw · S⁻¹`, computed
//! as an LU solve against `Sᵀ` rather than by forming the inverse, and
//! applied only to the detector columns the matrix names. All other
//! channels pass through untouched.
//!
//! ## Invertibility
//!
//! Invertibility is not enforced at construction. It is checked whenever
//! the matrix is used: a pivot ratio below [`SINGULAR_TOLERANCE`] in the
//! LU factorization is reported as [`CompensationError::Singular`]. A NaN
//! or infinite coefficient is rejected at construction as
//! [`CompensationError::NonFinite`].

use nalgebra::{DMatrix, Dyn, LU};
use serde::{Deserialize, Serialize};

use cytogate_core::{
    CompensationError, CompensationName, CytogateError, EmbeddedSpillover, EventMatrix,
};

/// Smallest accepted ratio between the smallest and largest LU pivot.
pub const SINGULAR_TOLERANCE: f64 = 1e-12;

/// Square spillover operator over an ordered detector list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "CompensationSpec", into = "CompensationSpec")]
pub struct CompensationMatrix {
    name: CompensationName,
    detectors: Vec<String>,
    fluorochromes: Option<Vec<String>>,
    spillover: DMatrix<f64>,
}

/// Serialized form of a [`CompensationMatrix`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompensationSpec {
    /// Registry name.
    pub name: CompensationName,
    /// Detector (channel) names, in matrix order.
    pub detectors: Vec<String>,
    /// Optional fluorochrome label per detector.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fluorochromes: Option<Vec<String>>,
    /// Row-major spillover coefficients.
    pub values: Vec<Vec<f64>>,
}

impl CompensationMatrix {
    /// Build from row-major spillover coefficients.
    pub fn new(
        name: CompensationName,
        detectors: Vec<String>,
        values: Vec<Vec<f64>>,
    ) -> Result<Self, CompensationError> {
        let k = detectors.len();
        let shape_error = |cols| CompensationError::Shape {
            matrix: name.to_string(),
            rows: values.len(),
            cols,
            detectors: k,
        };
        if values.len() != k {
            return Err(shape_error(values.first().map_or(0, Vec::len)));
        }
        if let Some(row) = values.iter().find(|row| row.len() != k) {
            return Err(shape_error(row.len()));
        }
        for (i, detector) in detectors.iter().enumerate() {
            if detectors[..i].contains(detector) {
                return Err(CompensationError::DuplicateDetector {
                    matrix: name.to_string(),
                    detector: detector.clone(),
                });
            }
        }

        for (row, coefficients) in values.iter().enumerate() {
            let bad = coefficients.iter().enumerate().find(|(_, v)| !v.is_finite());
            if let Some((col, &value)) = bad {
                return Err(CompensationError::NonFinite {
                    matrix: name.to_string(),
                    row,
                    col,
                    value,
                });
            }
        }
        let spillover = DMatrix::from_fn(k, k, |i, j| values[i][j]);
        if (0..k).any(|i| (spillover[(i, i)] - 1.0).abs() > 1e-9) {
            tracing::warn!(matrix = %name, "spillover matrix diagonal is not unit");
        }

        Ok(Self {
            name,
            detectors,
            fluorochromes: None,
            spillover,
        })
    }

    /// Build from the spillover recorded in a sample.
    pub fn from_embedded(
        name: CompensationName,
        spill: &EmbeddedSpillover,
    ) -> Result<Self, CompensationError> {
        Self::new(name, spill.detectors.clone(), spill.values.clone())
    }

    /// Attach fluorochrome labels, one per detector.
    pub fn with_fluorochromes(
        mut self,
        fluorochromes: Vec<String>,
    ) -> Result<Self, CompensationError> {
        if fluorochromes.len() != self.detectors.len() {
            return Err(CompensationError::Shape {
                matrix: self.name.to_string(),
                rows: fluorochromes.len(),
                cols: fluorochromes.len(),
                detectors: self.detectors.len(),
            });
        }
        self.fluorochromes = Some(fluorochromes);
        Ok(self)
    }

    /// Registry name.
    pub fn name(&self) -> &CompensationName {
        &self.name
    }

    /// Detector names in matrix order.
    pub fn detectors(&self) -> &[String] {
        &self.detectors
    }

    /// Fluorochrome labels, if attached.
    pub fn fluorochromes(&self) -> Option<&[String]> {
        self.fluorochromes.as_deref()
    }

    /// Whether the matrix covers a channel.
    pub fn covers(&self, channel: &str) -> bool {
        self.detectors.iter().any(|d| d == channel)
    }

    /// Spillover coefficient from detector `row` into detector `col`.
    pub fn coefficient(&self, row: usize, col: usize) -> Option<f64> {
        self.spillover.get((row, col)).copied()
    }

    /// Rename, e.g. before registering an inverted matrix.
    pub fn renamed(mut self, name: CompensationName) -> Self {
        self.name = name;
        self
    }

    fn factor(&self) -> Result<LU<f64, Dyn, Dyn>, CompensationError> {
        let lu = self.spillover.transpose().lu();
        let pivots = lu.u().diagonal().map(f64::abs);
        let largest = pivots.max();
        let smallest = pivots.min();
        if !(largest > 0.0 && smallest / largest > SINGULAR_TOLERANCE) {
            return Err(CompensationError::Singular {
                matrix: self.name.to_string(),
            });
        }
        Ok(lu)
    }

    /// Compensate detector columns given in matrix order.
    pub fn apply_columns(&self, columns: &[&[f64]]) -> Result<Vec<Vec<f64>>, CompensationError> {
        let k = self.detectors.len();
        if columns.len() != k {
            return Err(CompensationError::Shape {
                matrix: self.name.to_string(),
                rows: columns.len(),
                cols: columns.len(),
                detectors: k,
            });
        }
        let n = columns.first().map_or(0, |c| c.len());
        if let Some(i) = columns.iter().position(|c| c.len() != n) {
            return Err(CompensationError::Shape {
                matrix: self.name.to_string(),
                rows: n,
                cols: columns[i].len(),
                detectors: k,
            });
        }

        let lu = self.factor()?;
        // Sᵀ · X = Rᵀ, so row i of X is the compensated column of detector i
        let raw_t = DMatrix::from_fn(k, n, |i, j| columns[i][j]);
        let solved = lu.solve(&raw_t).ok_or_else(|| CompensationError::Singular {
            matrix: self.name.to_string(),
        })?;
        Ok((0..k)
            .map(|i| solved.row(i).iter().copied().collect())
            .collect())
    }

    /// Compensate an event matrix, returning a new matrix in which the
    /// detector columns are replaced. The input is not modified.
    pub fn apply(&self, events: &EventMatrix) -> Result<EventMatrix, CytogateError> {
        let mut indices = Vec::with_capacity(self.detectors.len());
        let mut raw = Vec::with_capacity(self.detectors.len());
        for detector in &self.detectors {
            let index = events
                .channel_index(detector)
                .ok_or_else(|| CompensationError::MissingChannel {
                    matrix: self.name.to_string(),
                    channel: detector.clone(),
                })?;
            indices.push(index);
            raw.push(events.column_at(index).unwrap_or_default());
        }
        let compensated = self.apply_columns(&raw)?;

        let mut columns: Vec<Vec<f64>> = (0..events.channel_count())
            .map(|i| events.column_at(i).unwrap_or_default().to_vec())
            .collect();
        for (index, column) in indices.into_iter().zip(compensated) {
            columns[index] = column;
        }
        Ok(EventMatrix::from_columns(events.channels().to_vec(), columns)?)
    }

    /// The inverse operator: applying it to compensated data restores the
    /// raw intensities.
    pub fn invert(&self) -> Result<Self, CompensationError> {
        self.factor()?;
        let inverse =
            self.spillover
                .clone()
                .try_inverse()
                .ok_or_else(|| CompensationError::Singular {
                    matrix: self.name.to_string(),
                })?;
        Ok(Self {
            name: self.name.clone(),
            detectors: self.detectors.clone(),
            fluorochromes: self.fluorochromes.clone(),
            spillover: inverse,
        })
    }
}

impl TryFrom<CompensationSpec> for CompensationMatrix {
    type Error = CompensationError;

    fn try_from(spec: CompensationSpec) -> Result<Self, Self::Error> {
        let matrix = Self::new(spec.name, spec.detectors, spec.values)?;
        match spec.fluorochromes {
            Some(labels) => matrix.with_fluorochromes(labels),
            None => Ok(matrix),
        }
    }
}

impl From<CompensationMatrix> for CompensationSpec {
    fn from(m: CompensationMatrix) -> Self {
        let k = m.detectors.len();
        let values = (0..k)
            .map(|i| (0..k).map(|j| m.spillover[(i, j)]).collect())
            .collect();
        Self {
            name: m.name,
            detectors: m.detectors,
            fluorochromes: m.fluorochromes,
            values,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cytogate_core::Channel;

    fn name(s: &str) -> CompensationName {
        CompensationName::new(s).unwrap()
    }

    fn two_color() -> CompensationMatrix {
        CompensationMatrix::new(
            name("spill"),
            vec!["FL1-H".into(), "FL2-H".into()],
            vec![vec![1.0, 0.2], vec![0.1, 1.0]],
        )
        .unwrap()
    }

    #[test]
    fn compensation_removes_spillover() {
        // true signals (100, 50) observed through S
        let m = two_color();
        let raw_fl1 = 100.0 * 1.0 + 50.0 * 0.1;
        let raw_fl2 = 100.0 * 0.2 + 50.0 * 1.0;
        let out = m.apply_columns(&[&[raw_fl1], &[raw_fl2]]).unwrap();
        assert!((out[0][0] - 100.0).abs() < 1e-10);
        assert!((out[1][0] - 50.0).abs() < 1e-10);
    }

    #[test]
    fn apply_leaves_other_channels_untouched() {
        let events = EventMatrix::from_rows(
            vec![Channel::new("FSC-A"), Channel::new("FL1-H"), Channel::new("FL2-H")],
            &[vec![7.0, 105.0, 70.0], vec![8.0, 0.0, 0.0]],
        )
        .unwrap();
        let out = two_color().apply(&events).unwrap();
        assert_eq!(out.column("FSC-A").unwrap(), &[7.0, 8.0]);
        assert!((out.column("FL1-H").unwrap()[0] - 100.0).abs() < 1e-10);
        assert_eq!(events.column("FL1-H").unwrap(), &[105.0, 0.0]);
    }

    #[test]
    fn missing_detector_is_reported() {
        let events = EventMatrix::from_rows(vec![Channel::new("FL1-H")], &[vec![1.0]]).unwrap();
        let err = two_color().apply(&events).unwrap_err();
        assert!(matches!(
            err,
            CytogateError::Compensation(CompensationError::MissingChannel { ref channel, .. })
                if channel == "FL2-H"
        ));
    }

    #[test]
    fn singular_matrix_is_detected_at_use() {
        let m = CompensationMatrix::new(
            name("bad"),
            vec!["A".into(), "B".into()],
            vec![vec![1.0, 1.0], vec![1.0, 1.0]],
        )
        .unwrap();
        assert!(matches!(
            m.apply_columns(&[&[1.0], &[1.0]]),
            Err(CompensationError::Singular { .. })
        ));
        assert!(matches!(m.invert(), Err(CompensationError::Singular { .. })));
    }

    #[test]
    fn non_finite_coefficient_is_named() {
        let err = CompensationMatrix::new(
            name("nan"),
            vec!["A".into(), "B".into()],
            vec![vec![1.0, 0.1], vec![f64::INFINITY, 1.0]],
        )
        .unwrap_err();
        assert!(matches!(
            err,
            CompensationError::NonFinite { row: 1, col: 0, value, .. } if value == f64::INFINITY
        ));
        assert!(err.to_string().contains("non-finite"));
    }

    #[test]
    fn inverse_restores_raw() {
        let m = two_color();
        let raw: [&[f64]; 2] = [&[105.0, 3.0], &[70.0, -2.0]];
        let comp = m.apply_columns(&raw).unwrap();
        let back = m
            .invert()
            .unwrap()
            .apply_columns(&[&comp[0], &comp[1]])
            .unwrap();
        for (orig, got) in raw.iter().zip(&back) {
            for (a, b) in orig.iter().zip(got) {
                assert!((a - b).abs() < 1e-10);
            }
        }
    }

    #[test]
    fn shape_mismatch_is_rejected() {
        let err = CompensationMatrix::new(
            name("bad"),
            vec!["A".into(), "B".into()],
            vec![vec![1.0, 0.0]],
        )
        .unwrap_err();
        assert!(matches!(err, CompensationError::Shape { .. }));
    }

    #[test]
    fn duplicate_detectors_are_rejected() {
        let err = CompensationMatrix::new(
            name("dup"),
            vec!["A".into(), "A".into()],
            vec![vec![1.0, 0.0], vec![0.0, 1.0]],
        )
        .unwrap_err();
        assert!(matches!(err, CompensationError::DuplicateDetector { .. }));
    }

    #[test]
    fn serde_round_trip() {
        let m = two_color()
            .with_fluorochromes(vec!["FITC".into(), "PE".into()])
            .unwrap();
        let json = serde_json::to_string(&m).unwrap();
        let back: CompensationMatrix = serde_json::from_str(&json).unwrap();
        assert_eq!(back, m);
        assert_eq!(back.coefficient(0, 1), Some(0.2));
    }
}
