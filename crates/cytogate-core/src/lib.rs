//! # cytogate-core: Foundational Types
//!
//! The leaf of the cytogate crate graph. Defines the sample data model and
//! the identifiers and errors shared by the transform and gating layers.
//!
//! ## Key Design Principles
//!
//! 1. **Immutable event data.** An [`EventMatrix`] is validated once at
//!    construction (shape, unique channel names, finite values) and never
//!    mutated afterwards. Transforms and gates derive new columns.
//!
//! 2. **Newtype identifiers.** [`GateName`], [`TransformName`] and
//!    [`CompensationName`] are validated at construction and on
//!    deserialization. No bare strings for registry keys.
//!
//! 3. **One error hierarchy.** Every fallible operation returns one of the
//!    concern-specific enums in [`error`], all convertible into
//!    [`CytogateError`].
//!
//! ## Crate Policy
//!
//! - No dependencies on other `cytogate-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod error;
pub mod identity;
pub mod sample;

pub use error::{
    CompensationError, CytogateError, DimensionError, SampleError, StrategyError,
    ToleranceViolation, TransformError, ValidationError,
};
pub use identity::{CompensationName, GateId, GateName, GatePath, TransformName};
pub use sample::{Channel, DisplayHint, EmbeddedSpillover, EventMatrix, Sample};
