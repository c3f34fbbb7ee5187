//! # Evaluation Engine
//!
//! Evaluates a [`GatingStrategy`] against one [`Sample`]:
//!
//! 1. Walk the gates in the strategy's precomputed topological order.
//! 2. Resolve each gate's dimensions through a [`DimensionCache`] scoped to
//!    this call, so gates sharing a (source, transform, compensation)
//!    combination reuse one column and compensation runs once per matrix.
//! 3. Compute membership restricted to the parent's mask (boolean gates
//!    combine the masks of their references instead).
//! 4. Collect a [`GateResult`] per gate, in tree order.
//!
//! Nothing here mutates the strategy or the sample. The cache is passed
//! explicitly and dropped with the call, so concurrent evaluations of
//! different samples share no mutable state.
//!
//! Numeric errors abort the sample and are reported with its id in an
//! [`EvaluationError`]; no partial results are returned.

use std::collections::HashMap;

use thiserror::Error;

use cytogate_core::{CytogateError, EventMatrix, GateId, Sample, StrategyError, TransformName};
use cytogate_transform::{check_symmetry, probe_points, DomainPolicy, SymmetryReport};

use crate::config::EvaluationConfig;
use crate::dimension::{CompensationRef, Dimension, DimensionKey};
use crate::gate::GateKind;
use crate::registry::Registry;
use crate::results::{GateResult, GatingResults};
use crate::strategy::GatingStrategy;

/// Evaluation of one sample failed.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("evaluation of sample '{sample}' failed: {source}")]
pub struct EvaluationError {
    /// Sample identifier.
    pub sample: String,
    /// Underlying error.
    pub source: CytogateError,
}

impl EvaluationError {
    fn new(sample: &Sample, source: impl Into<CytogateError>) -> Self {
        Self {
            sample: sample.id().to_string(),
            source: source.into(),
        }
    }
}

/// Per-call memo of resolved dimension columns.
pub(crate) struct DimensionCache<'s> {
    sample: &'s Sample,
    registry: &'s Registry,
    policy: DomainPolicy,
    compensated: HashMap<CompensationRef, EventMatrix>,
    keys: HashMap<DimensionKey, usize>,
    columns: Vec<Vec<f64>>,
    hits: usize,
}

impl<'s> DimensionCache<'s> {
    pub(crate) fn new(sample: &'s Sample, registry: &'s Registry, policy: DomainPolicy) -> Self {
        Self {
            sample,
            registry,
            policy,
            compensated: HashMap::new(),
            keys: HashMap::new(),
            columns: Vec::new(),
            hits: 0,
        }
    }

    /// Slot of the resolved column, computing it on first use.
    pub(crate) fn resolve(&mut self, dimension: &Dimension) -> Result<usize, CytogateError> {
        let key = dimension.key();
        if let Some(&slot) = self.keys.get(&key) {
            self.hits += 1;
            return Ok(slot);
        }

        let reference = dimension.compensation();
        if *reference != CompensationRef::Uncompensated && !self.compensated.contains_key(reference) {
            if let Some(matrix) = self.registry.matrix_for(reference, self.sample)? {
                let events = matrix.apply(self.sample.events())?;
                tracing::trace!(sample = %self.sample.id(), matrix = %matrix.name(), "compensated events");
                self.compensated.insert(reference.clone(), events);
            }
        }
        let events = self
            .compensated
            .get(reference)
            .unwrap_or_else(|| self.sample.events());
        let values = dimension.resolve_from(events, self.registry, self.policy)?;

        let slot = self.columns.len();
        self.columns.push(values);
        self.keys.insert(key, slot);
        Ok(slot)
    }

    pub(crate) fn column(&self, slot: usize) -> &[f64] {
        &self.columns[slot]
    }

    /// Distinct columns computed so far.
    pub(crate) fn len(&self) -> usize {
        self.columns.len()
    }

    /// Lookups answered from the memo.
    pub(crate) fn hits(&self) -> usize {
        self.hits
    }
}

/// Evaluates a strategy under one configuration.
#[derive(Debug, Clone, Copy)]
pub struct Evaluator<'a> {
    strategy: &'a GatingStrategy,
    config: &'a EvaluationConfig,
}

impl<'a> Evaluator<'a> {
    /// Bind a strategy and a configuration.
    pub fn new(strategy: &'a GatingStrategy, config: &'a EvaluationConfig) -> Self {
        Self { strategy, config }
    }

    /// Evaluate every gate of the strategy against `sample`.
    pub fn evaluate(&self, sample: &Sample) -> Result<GatingResults, EvaluationError> {
        let total = sample.event_count();
        let all = vec![true; total];
        let mut cache = DimensionCache::new(sample, self.strategy.registry(), self.config.domain_policy);
        let mut masks: Vec<Option<Vec<bool>>> = vec![None; self.strategy.len()];

        for &id in self.strategy.order() {
            let node = self.strategy.node(id);
            let parent = match node.parent {
                Some(p) => self.mask(&masks, p).map_err(|e| EvaluationError::new(sample, e))?,
                None => &all[..],
            };

            let mask = match node.gate.kind() {
                GateKind::Boolean(boolean) => {
                    let inputs = node
                        .references
                        .iter()
                        .map(|&r| self.mask(&masks, r))
                        .collect::<Result<Vec<_>, _>>()
                        .map_err(|e| EvaluationError::new(sample, e))?;
                    boolean.combine(&inputs, parent)
                }
                _ => {
                    let slots = node
                        .gate
                        .dimensions()
                        .into_iter()
                        .map(|d| cache.resolve(d))
                        .collect::<Result<Vec<_>, _>>()
                        .map_err(|e| EvaluationError::new(sample, e))?;
                    let columns: Vec<&[f64]> = slots.iter().map(|&s| cache.column(s)).collect();
                    node.gate.membership(node.quadrant, &columns, parent)
                }
            };

            tracing::debug!(
                sample = %sample.id(),
                gate = %node.name,
                parent_count = parent.iter().filter(|&&m| m).count(),
                count = mask.iter().filter(|&&m| m).count(),
                "evaluated gate"
            );
            masks[id.index()] = Some(mask);
        }

        let mut results = Vec::with_capacity(self.strategy.len());
        for id in self.strategy.tree_order() {
            let node = self.strategy.node(id);
            let mask = self.mask(&masks, id).map_err(|e| EvaluationError::new(sample, e))?;
            let parent_count = match node.parent {
                Some(p) => self
                    .mask(&masks, p)
                    .map_err(|e| EvaluationError::new(sample, e))?
                    .iter()
                    .filter(|&&m| m)
                    .count(),
                None => total,
            };
            let gate_type = if node.quadrant.is_some() {
                "Quadrant"
            } else {
                node.gate.type_name()
            };
            results.push(GateResult::from_mask(
                self.strategy.path_of(id),
                gate_type,
                mask,
                parent_count,
            ));
        }

        tracing::info!(
            sample = %sample.id(),
            events = total,
            gates = results.len(),
            columns = cache.len(),
            memo_hits = cache.hits(),
            "evaluated sample"
        );
        Ok(GatingResults::new(sample.id(), total, results))
    }

    /// Resolve one dimension against a sample with this configuration's
    /// domain policy, e.g. for plotting.
    pub fn resolve_dimension(
        &self,
        sample: &Sample,
        dimension: &Dimension,
    ) -> Result<Vec<f64>, EvaluationError> {
        dimension
            .resolve(sample, self.strategy.registry(), self.config.domain_policy)
            .map_err(|e| EvaluationError::new(sample, e))
    }

    /// Forward/inverse symmetry check of every registered scalar transform
    /// over its probe points, with the configured tolerance.
    pub fn self_check(&self) -> Result<Vec<(TransformName, SymmetryReport)>, CytogateError> {
        self.strategy
            .registry()
            .transforms()
            .filter(|t| t.as_ratio().is_none())
            .map(|t| {
                let report = check_symmetry(t, &probe_points(t), self.config.symmetry_tolerance)?;
                Ok((t.name().clone(), report))
            })
            .collect()
    }

    fn mask<'m>(&self, masks: &'m [Option<Vec<bool>>], id: GateId) -> Result<&'m [bool], StrategyError> {
        masks[id.index()]
            .as_deref()
            .ok_or_else(|| StrategyError::GateNotFound {
                path: self.strategy.path_of(id).to_string(),
            })
    }
}
