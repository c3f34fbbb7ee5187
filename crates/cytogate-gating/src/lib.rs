//! # cytogate-gating: Hierarchical Gating
//!
//! Turns samples into gated populations:
//!
//! - **Dimension** (`dimension.rs`): one gate axis. Channel or ratio
//!   source, compensation reference, optional transform and range.
//!   Resolution order is always compensate, then ratio, then transform.
//!
//! - **Gate** (`gate/`): rectangle, polygon, ellipsoid, quadrant and
//!   boolean geometries as one tagged enum. Gates are pure predicates.
//!
//! - **Strategy** (`strategy.rs`): arena-backed gate tree with a
//!   strategy-scoped transform/compensation registry. All structural
//!   validation (names, references, cycles) happens when the tree changes.
//!
//! - **Evaluation** (`evaluation.rs`): topological walk over the tree with
//!   a per-call dimension memo. Produces [`GatingResults`].
//!
//! - **Session** (`session.rs`): many samples against one strategy,
//!   optionally on a rayon pool.
//!
//! - **Definition** (`definition.rs`): serde form of a strategy for
//!   interchange.
//!
//! - **Config** (`config.rs`): evaluation options from YAML or JSON.
//!
//! ## Crate Policy
//!
//! - Depends on `cytogate-core` and `cytogate-transform` internally.
//! - A strategy is immutable while it is being evaluated; evaluation state
//!   lives in the call, never in the strategy.
//! - No `unsafe` code.

pub mod config;
pub mod definition;
pub mod dimension;
pub mod evaluation;
pub mod gate;
pub mod registry;
pub mod results;
pub mod session;
pub mod strategy;

pub use config::{ConfigError, EvaluationConfig};
pub use definition::{DefinitionError, GateDefinition, StrategyDefinition};
pub use dimension::{CompensationRef, Dimension, DimensionKey, DimensionSource};
pub use evaluation::{EvaluationError, Evaluator};
pub use gate::{
    BooleanGate, BooleanOp, Divider, DividerRange, EllipsoidGate, Gate, GateKind, GateReference,
    GeometryError, PolygonGate, Quadrant, QuadrantGate, RectangleGate,
};
pub use registry::{Registry, SAMPLE_SPILLOVER};
pub use results::{GateResult, GatingResults, PercentBasis, ReportRow};
pub use session::{ResultsSink, SampleOutcome, Session, SessionResults};
pub use strategy::{GateView, GatingStrategy};
