//! # cytogate-transform: Transforms and Compensation
//!
//! Provides the numeric layer between raw instrument values and gate
//! geometry:
//!
//! - **Transforms** ([`Transform`]): linear, logarithmic, asinh, logicle,
//!   hyperlog, FlowJo biexponential, FlowJo log and two-channel ratio,
//!   each with an exact inverse.
//! - **Compensation** ([`CompensationMatrix`]): spillover correction by LU
//!   solve over the matrix's detector columns, and its inverse.
//! - **Symmetry self-check** ([`symmetry::check_symmetry`]): verifies
//!   `inverse(forward(x)) ≈ x` to a relative tolerance.
//!
//! ## Crate Policy
//!
//! - Depends only on `cytogate-core` internally.
//! - Transforms are immutable once constructed. Parameter changes build a
//!   new, re-validated transform.
//! - No `unsafe` code.

pub mod compensation;
pub mod symmetry;
pub mod transform;

pub use compensation::{CompensationMatrix, CompensationSpec};
pub use symmetry::{check_symmetry, probe_points, SymmetryReport};
pub use transform::{
    AsinhParams, AsinhTransform, BiexParams, BiexTransform, DomainPolicy, HyperlogTransform,
    LinearParams, LinearTransform, LogParams, LogTransform, LogicleParams, LogicleTransform,
    ParamOverrides, ParameterError, RatioDenominator, RatioParams, RatioTransform, Transform,
    TransformKind, WspLogParams, WspLogTransform,
};
