//! # Strategy Definitions
//!
//! [`StrategyDefinition`] is the serializable form of a [`GatingStrategy`]:
//! the registry contents plus the gate tree as nested [`GateDefinition`]s.
//! It is what an interchange parser produces and what a writer consumes;
//! JSON is the on-disk form.
//!
//! Building goes through the public build-time API (`add_transform`,
//! `add_compensation`, `add_gate`), so a definition gets exactly the
//! structural validation a hand-built strategy gets. Geometric gates are
//! added before boolean gates and a boolean whose references are not yet
//! present is retried once more of the tree exists, so definitions may list
//! gates in any order.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use cytogate_core::{GateId, GateName, GatePath, StrategyError};
use cytogate_transform::{CompensationMatrix, Transform};

use crate::gate::{Gate, GateKind, GateReference};
use crate::strategy::{GateNode, GatingStrategy};

/// Error loading a strategy definition.
#[derive(Error, Debug)]
pub enum DefinitionError {
    /// The document does not match the definition schema.
    #[error("invalid strategy definition: {0}")]
    Parse(String),

    /// The definition describes an invalid strategy.
    #[error(transparent)]
    Strategy(#[from] StrategyError),
}

/// One gate with its subtree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateDefinition {
    /// The gate.
    #[serde(flatten)]
    pub gate: Gate,
    /// Child gates.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<GateDefinition>,
    /// Children of each quadrant, by quadrant id (quadrant gates only).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub quadrant_children: BTreeMap<GateName, Vec<GateDefinition>>,
}

impl GateDefinition {
    /// A leaf definition.
    pub fn new(gate: Gate) -> Self {
        Self {
            gate,
            children: Vec::new(),
            quadrant_children: BTreeMap::new(),
        }
    }

    /// Add a child.
    pub fn with_child(mut self, child: GateDefinition) -> Self {
        self.children.push(child);
        self
    }

    /// Subtrees to add once this gate exists under `parent`.
    fn subtrees<'d>(&'d self, parent: &GatePath) -> Vec<(GatePath, &'d GateDefinition)> {
        let own = parent.child(self.gate.name().clone());
        let mut out: Vec<(GatePath, &GateDefinition)> =
            self.children.iter().map(|c| (own.clone(), c)).collect();
        for (quadrant, children) in &self.quadrant_children {
            let at = parent.child(quadrant.clone());
            out.extend(children.iter().map(|c| (at.clone(), c)));
        }
        out
    }
}

/// Registry plus gate tree.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StrategyDefinition {
    /// Transforms.
    #[serde(default)]
    pub transforms: Vec<Transform>,
    /// Compensation matrices.
    #[serde(default)]
    pub compensations: Vec<CompensationMatrix>,
    /// Top-level gates.
    #[serde(default)]
    pub gates: Vec<GateDefinition>,
}

impl StrategyDefinition {
    /// Snapshot of a strategy.
    pub fn from_strategy(strategy: &GatingStrategy) -> Self {
        Self {
            transforms: strategy.registry().transforms().cloned().collect(),
            compensations: strategy.registry().compensations().cloned().collect(),
            gates: subtree(strategy, strategy.roots()),
        }
    }

    /// Build a strategy.
    pub fn build(&self) -> Result<GatingStrategy, StrategyError> {
        let mut strategy = GatingStrategy::new();
        for transform in &self.transforms {
            strategy.add_transform(transform.clone())?;
        }
        for matrix in &self.compensations {
            strategy.add_compensation(matrix.clone())?;
        }

        let mut pending: Vec<(GatePath, &GateDefinition)> =
            self.gates.iter().map(|g| (GatePath::root(), g)).collect();
        let mut booleans = false;
        while !pending.is_empty() {
            let mut deferred = Vec::with_capacity(pending.len());
            let mut blocked = None;
            let mut progress = false;

            for (parent, def) in pending {
                if matches!(def.gate.kind(), GateKind::Boolean(_)) != booleans {
                    deferred.push((parent, def));
                    continue;
                }
                match strategy.add_gate(&parent, def.gate.clone()) {
                    Ok(_) => {
                        progress = true;
                        deferred.extend(def.subtrees(&parent));
                    }
                    Err(
                        e @ (StrategyError::UndefinedGateReference { .. }
                        | StrategyError::ParentNotFound { .. }),
                    ) => {
                        blocked.get_or_insert(e);
                        deferred.push((parent, def));
                    }
                    Err(e) => return Err(e),
                }
            }
            pending = deferred;

            if progress {
                booleans = false;
            } else if !booleans {
                booleans = true;
            } else {
                return Err(blocked.unwrap_or_else(|| StrategyError::ParentNotFound {
                    parent: pending
                        .first()
                        .map(|(p, _)| p.to_string())
                        .unwrap_or_default(),
                }));
            }
        }

        tracing::debug!(
            gates = strategy.len(),
            transforms = self.transforms.len(),
            compensations = self.compensations.len(),
            "built strategy from definition"
        );
        Ok(strategy)
    }

    /// Pretty JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Parse JSON.
    pub fn from_json(raw: &str) -> Result<Self, DefinitionError> {
        serde_json::from_str(raw).map_err(|e| DefinitionError::Parse(e.to_string()))
    }

    /// Parse JSON and build the strategy.
    pub fn load_json(raw: &str) -> Result<GatingStrategy, DefinitionError> {
        Ok(Self::from_json(raw)?.build()?)
    }
}

fn subtree(strategy: &GatingStrategy, ids: &[GateId]) -> Vec<GateDefinition> {
    let mut out = Vec::new();
    for &id in ids {
        let node = strategy.node(id);
        match node.quadrant {
            None => out.push(GateDefinition {
                gate: pinned(strategy, node),
                children: subtree(strategy, &node.children),
                quadrant_children: BTreeMap::new(),
            }),
            // the first quadrant node stands for the whole quadrant gate
            Some(0) => {
                let quadrant_children = ids
                    .iter()
                    .map(|&s| strategy.node(s))
                    .filter(|s| s.quadrant.is_some() && s.gate == node.gate && !s.children.is_empty())
                    .map(|s| (s.name.clone(), subtree(strategy, &s.children)))
                    .collect();
                out.push(GateDefinition {
                    gate: node.gate.clone(),
                    children: Vec::new(),
                    quadrant_children,
                });
            }
            Some(_) => {}
        }
    }
    out
}

/// The node's gate with every boolean reference qualified by the path of
/// the gate it resolved to, so rebuilding never re-resolves a bare name
/// against a tree that has grown since.
fn pinned(strategy: &GatingStrategy, node: &GateNode) -> Gate {
    let GateKind::Boolean(boolean) = node.gate.kind() else {
        return node.gate.clone();
    };
    let references = boolean
        .references()
        .iter()
        .zip(&node.references)
        .map(|(reference, &target)| {
            let target = strategy.node(target);
            let parent = target
                .parent
                .map(|p| strategy.path_of(p))
                .unwrap_or_else(GatePath::root);
            GateReference {
                path: Some(parent),
                name: target.name.clone(),
                complement: reference.complement,
            }
        })
        .collect();
    Gate::new(
        node.gate.name().clone(),
        GateKind::Boolean(boolean.with_references(references)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use cytogate_core::TransformName;

    use cytogate_core::{Channel, EventMatrix, Sample};

    use crate::dimension::Dimension;
    use crate::gate::BooleanOp;

    fn name(s: &str) -> GateName {
        GateName::new(s).unwrap()
    }

    fn range(n: &str, lo: f64) -> Gate {
        Gate::rectangle(name(n), vec![Dimension::channel("x").with_range(Some(lo), None)]).unwrap()
    }

    #[test]
    fn boolean_listed_before_its_references_still_builds() {
        let def = StrategyDefinition {
            gates: vec![
                GateDefinition::new(
                    Gate::boolean(
                        name("AB"),
                        BooleanOp::And,
                        vec![GateReference::new(name("A")), GateReference::new(name("B"))],
                    )
                    .unwrap(),
                ),
                GateDefinition::new(range("A", 1.0)),
                GateDefinition::new(range("B", 2.0)),
            ],
            ..StrategyDefinition::default()
        };
        let strategy = def.build().unwrap();
        assert_eq!(strategy.len(), 3);
    }

    #[test]
    fn unresolvable_reference_is_reported() {
        let def = StrategyDefinition {
            gates: vec![GateDefinition::new(
                Gate::boolean(name("N"), BooleanOp::Not, vec![GateReference::new(name("ghost"))])
                    .unwrap(),
            )],
            ..StrategyDefinition::default()
        };
        assert!(matches!(
            def.build(),
            Err(StrategyError::UndefinedGateReference { .. })
        ));
    }

    #[test]
    fn json_rebuild_preserves_tree() {
        let mut strategy = GatingStrategy::new();
        let t = TransformName::new("lin").unwrap();
        strategy
            .add_transform(Transform::linear(t.clone(), 100.0, 0.0).unwrap())
            .unwrap();
        strategy
            .add_gate(
                &GatePath::root(),
                Gate::rectangle(
                    name("P"),
                    vec![Dimension::channel("x")
                        .with_transform(t)
                        .with_range(Some(0.1), None)],
                )
                .unwrap(),
            )
            .unwrap();
        let p = GatePath::parse("/P").unwrap();
        strategy.add_gate(&p, range("C", 5.0)).unwrap();
        strategy
            .add_gate(
                &p,
                Gate::boolean(name("notC"), BooleanOp::Not, vec![GateReference::new(name("C"))])
                    .unwrap(),
            )
            .unwrap();

        let json = StrategyDefinition::from_strategy(&strategy).to_json().unwrap();
        let rebuilt = StrategyDefinition::load_json(&json).unwrap();
        assert_eq!(rebuilt.gate_paths(), strategy.gate_paths());
        assert_eq!(
            rebuilt.gate(&GatePath::parse("/P/notC").unwrap()).unwrap().references(),
            vec![GatePath::parse("/P/C").unwrap()]
        );
        assert_eq!(
            StrategyDefinition::from_strategy(&rebuilt),
            StrategyDefinition::from_strategy(&strategy)
        );
    }

    #[test]
    fn references_keep_their_targets_after_later_gates_shadow_them() {
        let mut strategy = GatingStrategy::new();
        let root = GatePath::root();
        let p = GatePath::parse("/P").unwrap();
        let q = GatePath::parse("/Q").unwrap();
        let r = GatePath::parse("/R").unwrap();
        strategy.add_gate(&root, range("P", 0.0)).unwrap();
        strategy.add_gate(&root, range("Q", 0.0)).unwrap();
        strategy.add_gate(&root, range("R", 0.0)).unwrap();
        strategy.add_gate(&p, range("A", 5.0)).unwrap();
        strategy.add_gate(&p, range("C", 1.0)).unwrap();
        // both resolve to the only candidate under /P
        strategy
            .add_gate(
                &q,
                Gate::boolean(name("X"), BooleanOp::Not, vec![GateReference::new(name("A"))])
                    .unwrap(),
            )
            .unwrap();
        strategy
            .add_gate(
                &q,
                Gate::boolean(
                    name("Y"),
                    BooleanOp::Or,
                    vec![GateReference::new(name("C")), GateReference::new(name("X"))],
                )
                .unwrap(),
            )
            .unwrap();
        // a sibling A now shadows /P/A and a second C makes the name ambiguous
        strategy.add_gate(&q, range("A", 1.0)).unwrap();
        strategy.add_gate(&r, range("C", 3.0)).unwrap();

        let json = StrategyDefinition::from_strategy(&strategy).to_json().unwrap();
        let rebuilt = StrategyDefinition::load_json(&json).unwrap();

        for gate in ["/Q/X", "/Q/Y"] {
            let at = GatePath::parse(gate).unwrap();
            assert_eq!(
                rebuilt.gate(&at).unwrap().references(),
                strategy.gate(&at).unwrap().references()
            );
        }
        assert_eq!(
            rebuilt.gate(&GatePath::parse("/Q/X").unwrap()).unwrap().references(),
            vec![GatePath::parse("/P/A").unwrap()]
        );

        let events = EventMatrix::from_columns(
            vec![Channel::new("x")],
            vec![vec![0.0, 2.0, 7.0]],
        )
        .unwrap();
        let sample = Sample::new("s", events);
        let before = strategy.evaluate(&sample).unwrap();
        let after = rebuilt.evaluate(&sample).unwrap();
        let x = GatePath::parse("/Q/X").unwrap();
        assert_eq!(before.get(&x).unwrap().members(), &[0, 1]);
        assert_eq!(after.get(&x).unwrap().members(), &[0, 1]);
        for result in before.iter() {
            assert_eq!(after.get(result.path()), Some(result));
        }
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        assert!(matches!(
            StrategyDefinition::from_json("{\"gates\": 3}"),
            Err(DefinitionError::Parse(_))
        ));
    }
}
