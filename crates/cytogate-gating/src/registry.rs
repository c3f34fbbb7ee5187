//! # Transform and Compensation Registry
//!
//! Each strategy owns one registry. Dimensions name transforms and matrices
//! rather than embedding them, so redefining a registered transform changes
//! every gate that references it.

use std::borrow::Cow;
use std::collections::BTreeMap;

use cytogate_core::{
    CompensationName, CytogateError, DimensionError, Sample, StrategyError, TransformName,
};
use cytogate_transform::{CompensationMatrix, Transform};

use crate::dimension::CompensationRef;

/// Name under which a sample's embedded spillover is reported.
pub const SAMPLE_SPILLOVER: &str = "FCS";

/// Strategy-scoped lookup of transforms and compensation matrices.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    transforms: BTreeMap<TransformName, Transform>,
    compensations: BTreeMap<CompensationName, CompensationMatrix>,
}

impl Registry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or redefine a transform, returning the previous definition.
    pub fn insert_transform(&mut self, transform: Transform) -> Option<Transform> {
        self.transforms.insert(transform.name().clone(), transform)
    }

    /// Register or redefine a matrix, returning the previous definition.
    pub fn insert_compensation(&mut self, matrix: CompensationMatrix) -> Option<CompensationMatrix> {
        self.compensations.insert(matrix.name().clone(), matrix)
    }

    /// Transform by name.
    pub fn transform(&self, name: &TransformName) -> Option<&Transform> {
        self.transforms.get(name)
    }

    /// Matrix by name.
    pub fn compensation(&self, name: &CompensationName) -> Option<&CompensationMatrix> {
        self.compensations.get(name)
    }

    /// All transforms, by name.
    pub fn transforms(&self) -> impl Iterator<Item = &Transform> {
        self.transforms.values()
    }

    /// All matrices, by name.
    pub fn compensations(&self) -> impl Iterator<Item = &CompensationMatrix> {
        self.compensations.values()
    }

    /// The matrix a reference selects for a sample, if any.
    pub fn matrix_for(
        &self,
        reference: &CompensationRef,
        sample: &Sample,
    ) -> Result<Option<Cow<'_, CompensationMatrix>>, CytogateError> {
        match reference {
            CompensationRef::Uncompensated => Ok(None),
            CompensationRef::Named(name) => {
                let matrix =
                    self.compensation(name)
                        .ok_or_else(|| StrategyError::UndefinedCompensation {
                            gate: String::new(),
                            compensation: name.to_string(),
                        })?;
                Ok(Some(Cow::Borrowed(matrix)))
            }
            CompensationRef::Sample => {
                let spill = sample
                    .spillover()
                    .ok_or_else(|| DimensionError::MissingSpillover {
                        sample: sample.id().to_string(),
                    })?;
                let name = CompensationName::new(SAMPLE_SPILLOVER)?;
                Ok(Some(Cow::Owned(CompensationMatrix::from_embedded(name, spill)?)))
            }
        }
    }
}
