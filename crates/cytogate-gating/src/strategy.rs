//! # Gating Strategy
//!
//! A tree of named gates under an implicit "all events" root, plus the
//! [`Registry`] of transforms and compensation matrices its dimensions
//! reference.
//!
//! ## Arena
//!
//! Gates live in a flat arena indexed by [`GateId`]. Parent/child links and
//! boolean references are stored as ids, never as owning pointers, so the
//! dependency graph is a plain index graph.
//!
//! ## Structural validation
//!
//! Everything that can be checked without a sample is checked when the
//! strategy is changed, never during evaluation:
//!
//! - gate names are unique among siblings;
//! - dimensions reference registered transforms and matrices;
//! - boolean references resolve to existing gates;
//! - the parent/reference graph is acyclic.
//!
//! The evaluation order (a topological sort) is recomputed after every
//! structural change. A change that would make the graph cyclic is rolled
//! back and reported as [`StrategyError::CyclicGateGraph`].

use std::collections::BTreeSet;
use std::fmt;

use cytogate_core::{
    CompensationName, GateId, GateName, GatePath, Sample, StrategyError, TransformName,
};
use cytogate_transform::{CompensationMatrix, Transform};

use crate::config::EvaluationConfig;
use crate::dimension::Dimension;
use crate::evaluation::{EvaluationError, Evaluator};
use crate::gate::{Gate, GateKind, GateReference, GeometryError, Quadrant};
use crate::registry::Registry;
use crate::results::GatingResults;

/// One node of the gate tree.
#[derive(Debug, Clone)]
pub(crate) struct GateNode {
    pub(crate) name: GateName,
    pub(crate) parent: Option<GateId>,
    pub(crate) children: Vec<GateId>,
    pub(crate) gate: Gate,
    /// Region index when this node is one quadrant of a quadrant gate.
    pub(crate) quadrant: Option<usize>,
    /// Resolved boolean references, aligned with the gate's reference list.
    pub(crate) references: Vec<GateId>,
}

/// A gate tree with its transform and compensation registry.
#[derive(Debug, Clone, Default)]
pub struct GatingStrategy {
    registry: Registry,
    nodes: Vec<GateNode>,
    roots: Vec<GateId>,
    order: Vec<GateId>,
}

impl GatingStrategy {
    /// Empty strategy.
    pub fn new() -> Self {
        Self::default()
    }

    // -- Registry --------------------------------------------------------

    /// Register or redefine a transform. Every gate referencing the name
    /// sees the new definition. A redefinition that breaks an existing
    /// dimension (e.g. turns a scalar transform into a ratio) is rejected
    /// and the old definition kept.
    pub fn add_transform(&mut self, transform: Transform) -> Result<(), StrategyError> {
        let mut candidate = self.registry.clone();
        let name = transform.name().clone();
        candidate.insert_transform(transform);
        self.nodes
            .iter()
            .try_for_each(|n| check_dimensions(&candidate, &n.name, &n.gate.dimensions()))?;
        self.registry = candidate;
        tracing::debug!(transform = %name, "registered transform");
        Ok(())
    }

    /// Register or redefine a compensation matrix.
    pub fn add_compensation(&mut self, matrix: CompensationMatrix) -> Result<(), StrategyError> {
        tracing::debug!(matrix = %matrix.name(), detectors = matrix.detectors().len(), "registered compensation");
        self.registry.insert_compensation(matrix);
        Ok(())
    }

    /// Transform by name.
    pub fn transform(&self, name: &TransformName) -> Option<&Transform> {
        self.registry.transform(name)
    }

    /// Compensation matrix by name.
    pub fn compensation(&self, name: &CompensationName) -> Option<&CompensationMatrix> {
        self.registry.compensation(name)
    }

    /// The registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    // -- Tree construction ------------------------------------------------

    /// Add a gate under `parent` (the root path for top-level gates).
    ///
    /// Returns the ids of the nodes created: one for most gates, one per
    /// quadrant for quadrant gates. Boolean references must already exist.
    pub fn add_gate(&mut self, parent: &GatePath, gate: Gate) -> Result<Vec<GateId>, StrategyError> {
        let parent_id = self.parent_id(parent)?;
        self.check_gate(&gate)?;

        let names: Vec<(GateName, Option<usize>)> = match gate.kind() {
            GateKind::Quadrant(q) => q
                .quadrants()
                .iter()
                .enumerate()
                .map(|(i, quadrant)| (quadrant.id.clone(), Some(i)))
                .collect(),
            _ => vec![(gate.name().clone(), None)],
        };
        for (i, (name, _)) in names.iter().enumerate() {
            if self.find_child(parent_id, name).is_some() || names[..i].iter().any(|(n, _)| n == name) {
                return Err(StrategyError::DuplicateGateName {
                    gate: name.to_string(),
                    parent: parent.to_string(),
                });
            }
        }

        let references = self.resolve_references(parent_id, None, &gate)?;

        let mut ids = Vec::with_capacity(names.len());
        for (name, quadrant) in names {
            let id = GateId::new(self.nodes.len());
            self.nodes.push(GateNode {
                name,
                parent: parent_id,
                children: Vec::new(),
                gate: gate.clone(),
                quadrant,
                references: references.clone(),
            });
            match parent_id {
                Some(p) => self.nodes[p.index()].children.push(id),
                None => self.roots.push(id),
            }
            ids.push(id);
        }

        match self.compute_order() {
            Ok(order) => self.order = order,
            Err(e) => {
                self.rollback_add(&ids, parent_id);
                return Err(e);
            }
        }

        tracing::debug!(
            gate = %gate.name(),
            kind = gate.type_name(),
            parent = %parent,
            nodes = ids.len(),
            "added gate"
        );
        Ok(ids)
    }

    /// Replace the definition of the gate at `path` in place. Children stay
    /// attached. References are re-resolved against the current tree, so
    /// the replacement may reference gates defined after it; a resulting
    /// cycle is rejected and the old definition restored.
    pub fn replace_gate(&mut self, path: &GatePath, gate: Gate) -> Result<(), StrategyError> {
        let id = self.find(path).ok_or_else(|| StrategyError::GateNotFound {
            path: path.to_string(),
        })?;
        let node = &self.nodes[id.index()];
        if node.quadrant.is_some() || matches!(gate.kind(), GateKind::Quadrant(_)) {
            return Err(geometry(
                gate.name(),
                GeometryError::new("quadrant gates cannot be replaced in place"),
            ));
        }
        self.check_gate(&gate)?;

        let parent_id = node.parent;
        if gate.name() != &node.name {
            if let Some(existing) = self.find_child(parent_id, gate.name()) {
                if existing != id {
                    return Err(StrategyError::DuplicateGateName {
                        gate: gate.name().to_string(),
                        parent: self.parent_path(parent_id).to_string(),
                    });
                }
            }
        }

        let references = self.resolve_references(parent_id, Some(id), &gate)?;
        let name = gate.name().clone();
        let slot = &mut self.nodes[id.index()];
        let old_gate = std::mem::replace(&mut slot.gate, gate);
        let old_name = std::mem::replace(&mut slot.name, name);
        let old_references = std::mem::replace(&mut slot.references, references);

        match self.compute_order() {
            Ok(order) => {
                self.order = order;
                tracing::debug!(gate = %path, "replaced gate");
                Ok(())
            }
            Err(e) => {
                let slot = &mut self.nodes[id.index()];
                slot.gate = old_gate;
                slot.name = old_name;
                slot.references = old_references;
                Err(e)
            }
        }
    }

    // -- Accessors --------------------------------------------------------

    /// The gate at `path`.
    pub fn gate(&self, path: &GatePath) -> Result<GateView<'_>, StrategyError> {
        let id = self.find(path).ok_or_else(|| StrategyError::GateNotFound {
            path: path.to_string(),
        })?;
        Ok(GateView { strategy: self, id })
    }

    /// Paths of the children of `path` (the root path lists top-level
    /// gates), in insertion order.
    pub fn children(&self, path: &GatePath) -> Result<Vec<GatePath>, StrategyError> {
        let ids = if path.is_root() {
            &self.roots
        } else {
            let id = self.find(path).ok_or_else(|| StrategyError::GateNotFound {
                path: path.to_string(),
            })?;
            &self.nodes[id.index()].children
        };
        Ok(ids.iter().map(|&c| self.path_of(c)).collect())
    }

    /// Every gate path, depth first in insertion order.
    pub fn gate_paths(&self) -> Vec<GatePath> {
        self.tree_order()
            .into_iter()
            .map(|id| self.path_of(id))
            .collect()
    }

    /// Gate paths in evaluation order.
    pub fn evaluation_order(&self) -> Vec<GatePath> {
        self.order.iter().map(|&id| self.path_of(id)).collect()
    }

    /// Number of gate nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the strategy has no gates.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Id of the gate at `path`.
    pub fn find(&self, path: &GatePath) -> Option<GateId> {
        let mut current: Option<GateId> = None;
        for name in path.names() {
            current = Some(self.find_child(current, name)?);
        }
        current
    }

    /// Full path of a gate.
    pub fn path_of(&self, id: GateId) -> GatePath {
        let mut names = Vec::new();
        let mut current = Some(id);
        while let Some(c) = current {
            let node = &self.nodes[c.index()];
            names.push(node.name.clone());
            current = node.parent;
        }
        names.reverse();
        GatePath::from_names(names)
    }

    /// Evaluate one sample with the default configuration.
    pub fn evaluate(&self, sample: &Sample) -> Result<GatingResults, EvaluationError> {
        Evaluator::new(self, &EvaluationConfig::default()).evaluate(sample)
    }

    pub(crate) fn node(&self, id: GateId) -> &GateNode {
        &self.nodes[id.index()]
    }

    pub(crate) fn order(&self) -> &[GateId] {
        &self.order
    }

    pub(crate) fn roots(&self) -> &[GateId] {
        &self.roots
    }

    /// Depth-first, children in insertion order.
    pub(crate) fn tree_order(&self) -> Vec<GateId> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<GateId> = self.roots.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.nodes[id.index()].children.iter().rev().copied());
        }
        out
    }

    // -- Internals --------------------------------------------------------

    fn parent_id(&self, parent: &GatePath) -> Result<Option<GateId>, StrategyError> {
        if parent.is_root() {
            return Ok(None);
        }
        self.find(parent)
            .map(Some)
            .ok_or_else(|| StrategyError::ParentNotFound {
                parent: parent.to_string(),
            })
    }

    fn parent_path(&self, parent: Option<GateId>) -> GatePath {
        parent.map_or_else(GatePath::root, |p| self.path_of(p))
    }

    fn siblings(&self, parent: Option<GateId>) -> &[GateId] {
        match parent {
            Some(p) => &self.nodes[p.index()].children,
            None => &self.roots,
        }
    }

    fn find_child(&self, parent: Option<GateId>, name: &GateName) -> Option<GateId> {
        self.siblings(parent)
            .iter()
            .copied()
            .find(|&c| &self.nodes[c.index()].name == name)
    }

    fn check_gate(&self, gate: &Gate) -> Result<(), StrategyError> {
        gate.validate().map_err(|e| geometry(gate.name(), e))?;
        check_dimensions(&self.registry, gate.name(), &gate.dimensions())
    }

    fn resolve_references(
        &self,
        parent: Option<GateId>,
        own: Option<GateId>,
        gate: &Gate,
    ) -> Result<Vec<GateId>, StrategyError> {
        match gate.kind() {
            GateKind::Boolean(b) => b
                .references()
                .iter()
                .map(|r| self.resolve_reference(parent, own, gate.name(), r))
                .collect(),
            _ => Ok(Vec::new()),
        }
    }

    fn resolve_reference(
        &self,
        parent: Option<GateId>,
        own: Option<GateId>,
        gate: &GateName,
        reference: &GateReference,
    ) -> Result<GateId, StrategyError> {
        let undefined = || StrategyError::UndefinedGateReference {
            gate: gate.to_string(),
            reference: GateReference {
                complement: false,
                ..reference.clone()
            }
            .to_string(),
        };

        if let Some(path) = &reference.path {
            return self
                .find(&path.child(reference.name.clone()))
                .filter(|&id| Some(id) != own)
                .ok_or_else(undefined);
        }

        // siblings
        if let Some(id) = self
            .siblings(parent)
            .iter()
            .copied()
            .find(|&c| Some(c) != own && self.nodes[c.index()].name == reference.name)
        {
            return Ok(id);
        }

        // nearest ancestor
        let mut current = parent;
        while let Some(a) = current {
            let node = &self.nodes[a.index()];
            if node.name == reference.name {
                return Ok(a);
            }
            current = node.parent;
        }

        // unique anywhere
        let mut matches = self
            .nodes
            .iter()
            .enumerate()
            .filter(|(i, n)| Some(GateId::new(*i)) != own && n.name == reference.name)
            .map(|(i, _)| GateId::new(i));
        match (matches.next(), matches.next()) {
            (Some(id), None) => Ok(id),
            (Some(_), Some(_)) => Err(StrategyError::AmbiguousGateReference {
                gate: gate.to_string(),
                reference: reference.name.to_string(),
            }),
            _ => Err(undefined()),
        }
    }

    /// Kahn's algorithm over parent→child and reference→boolean edges,
    /// always taking the smallest ready id so the order is deterministic.
    fn compute_order(&self) -> Result<Vec<GateId>, StrategyError> {
        let n = self.nodes.len();
        let mut indegree = vec![0usize; n];
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); n];
        for (i, node) in self.nodes.iter().enumerate() {
            if let Some(p) = node.parent {
                dependents[p.index()].push(i);
                indegree[i] += 1;
            }
            for r in &node.references {
                dependents[r.index()].push(i);
                indegree[i] += 1;
            }
        }

        let mut ready: BTreeSet<usize> = (0..n).filter(|&i| indegree[i] == 0).collect();
        let mut order = Vec::with_capacity(n);
        while let Some(i) = ready.pop_first() {
            order.push(GateId::new(i));
            for &d in &dependents[i] {
                indegree[d] -= 1;
                if indegree[d] == 0 {
                    ready.insert(d);
                }
            }
        }

        if order.len() < n {
            let mut gates: Vec<String> = (0..n)
                .filter(|&i| indegree[i] > 0)
                .map(|i| self.path_of(GateId::new(i)).to_string())
                .collect();
            gates.sort();
            return Err(StrategyError::CyclicGateGraph { gates });
        }
        Ok(order)
    }

    fn rollback_add(&mut self, ids: &[GateId], parent: Option<GateId>) {
        let siblings = match parent {
            Some(p) => &mut self.nodes[p.index()].children,
            None => &mut self.roots,
        };
        siblings.retain(|c| !ids.contains(c));
        self.nodes.truncate(self.nodes.len() - ids.len());
    }
}

fn check_dimensions(
    registry: &Registry,
    gate: &GateName,
    dims: &[&Dimension],
) -> Result<(), StrategyError> {
    dims.iter()
        .try_for_each(|d| d.validate(gate.as_str(), registry))
}

fn geometry(gate: &GateName, err: GeometryError) -> StrategyError {
    StrategyError::InvalidGeometry {
        gate: gate.to_string(),
        reason: err.reason().to_string(),
    }
}

/// Read-only view of one gate node.
#[derive(Debug, Clone, Copy)]
pub struct GateView<'a> {
    strategy: &'a GatingStrategy,
    id: GateId,
}

impl<'a> GateView<'a> {
    /// Arena id.
    pub fn id(&self) -> GateId {
        self.id
    }

    /// Node name (the quadrant id for quadrant nodes).
    pub fn name(&self) -> &'a GateName {
        &self.strategy.node(self.id).name
    }

    /// Full path.
    pub fn path(&self) -> GatePath {
        self.strategy.path_of(self.id)
    }

    /// The gate definition (the whole quadrant gate for quadrant nodes).
    pub fn gate(&self) -> &'a Gate {
        &self.strategy.node(self.id).gate
    }

    /// The quadrant this node stands for, if any.
    pub fn quadrant(&self) -> Option<&'a Quadrant> {
        let node = self.strategy.node(self.id);
        match (node.gate.kind(), node.quadrant) {
            (GateKind::Quadrant(q), Some(i)) => q.quadrants().get(i),
            _ => None,
        }
    }

    /// Paths of resolved boolean references.
    pub fn references(&self) -> Vec<GatePath> {
        self.strategy
            .node(self.id)
            .references
            .iter()
            .map(|&r| self.strategy.path_of(r))
            .collect()
    }

    /// Paths of the children.
    pub fn children(&self) -> Vec<GatePath> {
        self.strategy
            .node(self.id)
            .children
            .iter()
            .map(|&c| self.strategy.path_of(c))
            .collect()
    }
}

impl fmt::Display for GateView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(quadrant) = self.quadrant() {
            return write!(f, "{quadrant}");
        }
        let node = self.strategy.node(self.id);
        let parent = node
            .parent
            .map_or("root", |p| self.strategy.node(p).name.as_str());
        node.gate.describe(parent, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate::{BooleanOp, Divider, DividerRange};

    fn name(s: &str) -> GateName {
        GateName::new(s).unwrap()
    }

    fn path(s: &str) -> GatePath {
        GatePath::parse(s).unwrap()
    }

    fn range_gate(n: &str, channel: &str) -> Gate {
        Gate::rectangle(
            name(n),
            vec![Dimension::channel(channel).with_range(Some(0.0), Some(10.0))],
        )
        .unwrap()
    }

    fn boolean(n: &str, op: BooleanOp, refs: &[&str]) -> Gate {
        Gate::boolean(
            name(n),
            op,
            refs.iter().map(|r| GateReference::new(name(r))).collect(),
        )
        .unwrap()
    }

    #[test]
    fn builds_paths_and_children() {
        let mut s = GatingStrategy::new();
        s.add_gate(&GatePath::root(), range_gate("Live", "FSC")).unwrap();
        s.add_gate(&path("/Live"), range_gate("CD3", "FL1")).unwrap();
        s.add_gate(&path("/Live"), range_gate("CD19", "FL2")).unwrap();
        assert_eq!(
            s.gate_paths(),
            vec![path("/Live"), path("/Live/CD3"), path("/Live/CD19")]
        );
        assert_eq!(
            s.children(&path("/Live")).unwrap(),
            vec![path("/Live/CD3"), path("/Live/CD19")]
        );
        assert_eq!(s.children(&GatePath::root()).unwrap(), vec![path("/Live")]);
        assert_eq!(
            s.gate(&path("/Live/CD3")).unwrap().to_string(),
            "RectangleGate(CD3, parent: Live, dims: 1)"
        );
    }

    #[test]
    fn sibling_names_are_unique_but_cousins_may_repeat() {
        let mut s = GatingStrategy::new();
        s.add_gate(&GatePath::root(), range_gate("A", "x")).unwrap();
        s.add_gate(&GatePath::root(), range_gate("B", "x")).unwrap();
        s.add_gate(&path("/A"), range_gate("C", "x")).unwrap();
        s.add_gate(&path("/B"), range_gate("C", "x")).unwrap();
        assert!(matches!(
            s.add_gate(&path("/A"), range_gate("C", "y")),
            Err(StrategyError::DuplicateGateName { .. })
        ));
    }

    #[test]
    fn missing_parent_is_reported() {
        let mut s = GatingStrategy::new();
        assert_eq!(
            s.add_gate(&path("/nope"), range_gate("A", "x")).unwrap_err(),
            StrategyError::ParentNotFound {
                parent: "/nope".into()
            }
        );
    }

    #[test]
    fn undeclared_transform_is_rejected_at_add_time() {
        let mut s = GatingStrategy::new();
        let gate = Gate::rectangle(
            name("A"),
            vec![Dimension::channel("x")
                .with_transform(TransformName::new("logicle").unwrap())
                .with_range(Some(0.0), None)],
        )
        .unwrap();
        assert!(matches!(
            s.add_gate(&GatePath::root(), gate),
            Err(StrategyError::UndefinedTransform { .. })
        ));
        assert!(s.is_empty());
    }

    #[test]
    fn forward_boolean_reference_is_undefined() {
        let mut s = GatingStrategy::new();
        s.add_gate(&GatePath::root(), range_gate("A", "x")).unwrap();
        let err = s
            .add_gate(&GatePath::root(), boolean("AB", BooleanOp::And, &["A", "B"]))
            .unwrap_err();
        assert_eq!(
            err,
            StrategyError::UndefinedGateReference {
                gate: "AB".into(),
                reference: "B".into()
            }
        );
    }

    #[test]
    fn references_resolve_sibling_then_ancestor_then_unique() {
        let mut s = GatingStrategy::new();
        s.add_gate(&GatePath::root(), range_gate("P", "x")).unwrap();
        s.add_gate(&GatePath::root(), range_gate("Q", "x")).unwrap();
        s.add_gate(&path("/P"), range_gate("A", "x")).unwrap();
        s.add_gate(&path("/Q"), range_gate("Z", "x")).unwrap();
        s.add_gate(&path("/P"), boolean("PA", BooleanOp::And, &["A", "P"]))
            .unwrap();
        s.add_gate(&path("/P"), boolean("AZ", BooleanOp::Or, &["A", "Z"]))
            .unwrap();
        assert_eq!(
            s.gate(&path("/P/PA")).unwrap().references(),
            vec![path("/P/A"), path("/P")]
        );
        assert_eq!(
            s.gate(&path("/P/AZ")).unwrap().references(),
            vec![path("/P/A"), path("/Q/Z")]
        );
    }

    #[test]
    fn ambiguous_unqualified_reference() {
        let mut s = GatingStrategy::new();
        s.add_gate(&GatePath::root(), range_gate("P", "x")).unwrap();
        s.add_gate(&GatePath::root(), range_gate("Q", "x")).unwrap();
        s.add_gate(&GatePath::root(), range_gate("R", "x")).unwrap();
        s.add_gate(&path("/P"), range_gate("C", "x")).unwrap();
        s.add_gate(&path("/Q"), range_gate("C", "x")).unwrap();
        s.add_gate(&path("/R"), range_gate("D", "x")).unwrap();
        assert!(matches!(
            s.add_gate(&path("/R"), boolean("X", BooleanOp::And, &["C", "D"])),
            Err(StrategyError::AmbiguousGateReference { .. })
        ));
        let qualified = Gate::boolean(
            name("X"),
            BooleanOp::And,
            vec![
                GateReference::at(path("/Q"), name("C")),
                GateReference::new(name("D")),
            ],
        )
        .unwrap();
        s.add_gate(&path("/R"), qualified).unwrap();
        assert_eq!(
            s.gate(&path("/R/X")).unwrap().references()[0],
            path("/Q/C")
        );
    }

    #[test]
    fn replace_gate_introducing_cycle_is_rolled_back() {
        let mut s = GatingStrategy::new();
        s.add_gate(&GatePath::root(), range_gate("A", "x")).unwrap();
        s.add_gate(&GatePath::root(), range_gate("B", "x")).unwrap();
        s.add_gate(&GatePath::root(), boolean("C", BooleanOp::And, &["A", "B"]))
            .unwrap();
        // A := NOT C closes A -> C -> A
        let err = s
            .replace_gate(&path("/A"), boolean("A", BooleanOp::Not, &["C"]))
            .unwrap_err();
        assert_eq!(
            err,
            StrategyError::CyclicGateGraph {
                gates: vec!["/A".into(), "/C".into()]
            }
        );
        assert_eq!(s.gate(&path("/A")).unwrap().gate().type_name(), "RectangleGate");
    }

    #[test]
    fn replace_gate_allows_later_references() {
        let mut s = GatingStrategy::new();
        s.add_gate(&GatePath::root(), range_gate("A", "x")).unwrap();
        s.add_gate(&GatePath::root(), range_gate("B", "x")).unwrap();
        s.add_gate(&GatePath::root(), range_gate("C", "x")).unwrap();
        s.replace_gate(&path("/A"), boolean("A", BooleanOp::Or, &["B", "C"]))
            .unwrap();
        let order = s.evaluation_order();
        let pos = |p: &str| order.iter().position(|x| x == &path(p)).unwrap();
        assert!(pos("/B") < pos("/A"));
        assert!(pos("/C") < pos("/A"));
    }

    #[test]
    fn boolean_referencing_own_child_is_cyclic() {
        let mut s = GatingStrategy::new();
        s.add_gate(&GatePath::root(), range_gate("A", "x")).unwrap();
        s.add_gate(&GatePath::root(), range_gate("B", "x")).unwrap();
        s.add_gate(&path("/A"), range_gate("K", "x")).unwrap();
        let gate = Gate::boolean(
            name("A"),
            BooleanOp::And,
            vec![
                GateReference::at(path("/A"), name("K")),
                GateReference::new(name("B")),
            ],
        )
        .unwrap();
        assert!(matches!(
            s.replace_gate(&path("/A"), gate),
            Err(StrategyError::CyclicGateGraph { .. })
        ));
    }

    #[test]
    fn quadrant_gate_registers_one_node_per_quadrant() {
        let mut s = GatingStrategy::new();
        let dividers = vec![Divider {
            id: "d".into(),
            dimension: Dimension::channel("x"),
            values: vec![5.0],
        }];
        let quadrants = vec![
            Quadrant {
                id: name("lo"),
                ranges: vec![DividerRange {
                    divider: "d".into(),
                    min: None,
                    max: Some(5.0),
                }],
            },
            Quadrant {
                id: name("hi"),
                ranges: vec![DividerRange {
                    divider: "d".into(),
                    min: Some(5.0),
                    max: None,
                }],
            },
        ];
        let ids = s
            .add_gate(
                &GatePath::root(),
                Gate::quadrant(name("split"), dividers, quadrants).unwrap(),
            )
            .unwrap();
        assert_eq!(ids.len(), 2);
        assert_eq!(s.gate_paths(), vec![path("/lo"), path("/hi")]);
        assert_eq!(
            s.gate(&path("/hi")).unwrap().to_string(),
            "Quadrant(hi, dividers: 1)"
        );
        assert!(s
            .replace_gate(&path("/hi"), range_gate("hi", "x"))
            .is_err());
    }

    #[test]
    fn redefining_transform_into_ratio_is_rejected() {
        let mut s = GatingStrategy::new();
        let t = TransformName::new("t").unwrap();
        s.add_transform(Transform::linear(t.clone(), 1.0, 0.0).unwrap())
            .unwrap();
        s.add_gate(
            &GatePath::root(),
            Gate::rectangle(
                name("A"),
                vec![Dimension::channel("x")
                    .with_transform(t.clone())
                    .with_range(Some(0.0), None)],
            )
            .unwrap(),
        )
        .unwrap();
        let ratio = Transform::ratio(
            t.clone(),
            "x",
            cytogate_transform::RatioDenominator::Constant(2.0),
            1.0,
            0.0,
            0.0,
        )
        .unwrap();
        assert!(s.add_transform(ratio).is_err());
        assert!(s.transform(&t).unwrap().as_ratio().is_none());
    }
}
