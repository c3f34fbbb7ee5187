//! Boolean gates combine the memberships of other gates of the same sample.
//!
//! Each reference may be complemented. The combined result is always
//! intersected with the boolean gate's own parent population, so `NOT A`
//! under parent `P` is `P ∖ A`, not the complement over all events.

use std::fmt;

use serde::{Deserialize, Serialize};

use cytogate_core::{GateName, GatePath};

use super::GeometryError;

/// Logical operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BooleanOp {
    /// All references.
    And,
    /// Any reference.
    Or,
    /// Not the single reference.
    Not,
}

impl fmt::Display for BooleanOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::And => "and",
            Self::Or => "or",
            Self::Not => "not",
        })
    }
}

/// A reference to another gate.
///
/// Without a path, the name resolves to a sibling first, then to the
/// nearest ancestor, then to the only gate of that name anywhere in the
/// tree. With a path, it resolves to the gate `name` under exactly that
/// parent path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GateReference {
    /// Referenced gate name.
    pub name: GateName,
    /// Parent path of the referenced gate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<GatePath>,
    /// Use the complement of the referenced membership.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub complement: bool,
}

impl GateReference {
    /// Unqualified reference.
    pub fn new(name: GateName) -> Self {
        Self {
            name,
            path: None,
            complement: false,
        }
    }

    /// Reference to `name` under the parent path `path`.
    pub fn at(path: GatePath, name: GateName) -> Self {
        Self {
            name,
            path: Some(path),
            complement: false,
        }
    }

    /// Complement this reference.
    pub fn complemented(mut self) -> Self {
        self.complement = !self.complement;
        self
    }
}

impl fmt::Display for GateReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.complement {
            f.write_str("!")?;
        }
        match &self.path {
            Some(path) => write!(f, "{}", path.child(self.name.clone())),
            None => write!(f, "{}", self.name),
        }
    }
}

/// AND/OR/NOT over referenced gates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BooleanGate {
    op: BooleanOp,
    references: Vec<GateReference>,
}

impl BooleanGate {
    /// Validate the reference count: NOT takes one, AND/OR at least two.
    pub fn new(op: BooleanOp, references: Vec<GateReference>) -> Result<Self, GeometryError> {
        let gate = Self { op, references };
        gate.validate()?;
        Ok(gate)
    }

    /// Operator.
    pub fn op(&self) -> BooleanOp {
        self.op
    }

    /// References, in order.
    pub fn references(&self) -> &[GateReference] {
        &self.references
    }

    /// Same operator over a reference list of equal length.
    pub(crate) fn with_references(&self, references: Vec<GateReference>) -> Self {
        debug_assert_eq!(references.len(), self.references.len());
        Self {
            op: self.op,
            references,
        }
    }

    pub(crate) fn validate(&self) -> Result<(), GeometryError> {
        let n = self.references.len();
        match self.op {
            BooleanOp::Not if n != 1 => Err(GeometryError::new(format!(
                "not gates take exactly one reference, got {n}"
            ))),
            BooleanOp::And | BooleanOp::Or if n < 2 => Err(GeometryError::new(format!(
                "{} gates take at least two references, got {n}",
                self.op
            ))),
            _ => Ok(()),
        }
    }

    /// Combine reference memberships (aligned with [`Self::references`])
    /// within the parent population.
    pub(crate) fn combine(&self, inputs: &[&[bool]], parent: &[bool]) -> Vec<bool> {
        let value = |event: usize, k: usize| inputs[k][event] != self.references[k].complement;
        parent
            .iter()
            .enumerate()
            .map(|(event, &inside)| {
                inside
                    && match self.op {
                        BooleanOp::And => (0..inputs.len()).all(|k| value(event, k)),
                        BooleanOp::Or => (0..inputs.len()).any(|k| value(event, k)),
                        BooleanOp::Not => !value(event, 0),
                    }
            })
            .collect()
    }
}
