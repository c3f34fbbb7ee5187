//! # Gating Results
//!
//! Created fresh by every evaluation and never mutated afterwards. Each
//! [`GateResult`] keeps the member event indices (ascending) plus the
//! counts needed for both percentage bases, so reporting never has to go
//! back to the sample.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use cytogate_core::GatePath;

/// Denominator of a percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PercentBasis {
    /// Members of the parent population.
    Parent,
    /// All events of the sample.
    Total,
}

/// Membership of one gate for one sample.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateResult {
    path: GatePath,
    gate_type: String,
    members: Vec<usize>,
    parent_count: usize,
    total: usize,
}

impl GateResult {
    pub(crate) fn from_mask(
        path: GatePath,
        gate_type: &str,
        mask: &[bool],
        parent_count: usize,
    ) -> Self {
        let members = mask
            .iter()
            .enumerate()
            .filter(|&(_, &inside)| inside)
            .map(|(event, _)| event)
            .collect();
        Self {
            path,
            gate_type: gate_type.to_string(),
            members,
            parent_count,
            total: mask.len(),
        }
    }

    /// Gate path.
    pub fn path(&self) -> &GatePath {
        &self.path
    }

    /// `RectangleGate`, `Quadrant`, ...
    pub fn gate_type(&self) -> &str {
        &self.gate_type
    }

    /// Member event indices, ascending.
    pub fn members(&self) -> &[usize] {
        &self.members
    }

    /// Whether an event is a member.
    pub fn contains(&self, event: usize) -> bool {
        self.members.binary_search(&event).is_ok()
    }

    /// Membership as a mask over all events.
    pub fn mask(&self) -> Vec<bool> {
        let mut mask = vec![false; self.total];
        for &event in &self.members {
            mask[event] = true;
        }
        mask
    }

    /// Member count.
    pub fn count(&self) -> usize {
        self.members.len()
    }

    /// Members of the parent population (the total for top-level gates).
    pub fn parent_count(&self) -> usize {
        self.parent_count
    }

    /// Events in the sample.
    pub fn total(&self) -> usize {
        self.total
    }

    /// Percentage of the chosen basis; `0.0` when the basis is empty.
    pub fn percent(&self, basis: PercentBasis) -> f64 {
        let denominator = match basis {
            PercentBasis::Parent => self.parent_count,
            PercentBasis::Total => self.total,
        };
        if denominator == 0 {
            0.0
        } else {
            100.0 * self.count() as f64 / denominator as f64
        }
    }

    /// Percentage of the parent population.
    pub fn percent_of_parent(&self) -> f64 {
        self.percent(PercentBasis::Parent)
    }

    /// Percentage of all events.
    pub fn percent_of_total(&self) -> f64 {
        self.percent(PercentBasis::Total)
    }
}

/// Every gate's result for one sample, in tree order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatingResults {
    sample_id: String,
    total: usize,
    results: Vec<GateResult>,
    index: HashMap<GatePath, usize>,
}

impl GatingResults {
    pub(crate) fn new(sample_id: impl Into<String>, total: usize, results: Vec<GateResult>) -> Self {
        let index = results
            .iter()
            .enumerate()
            .map(|(i, r)| (r.path.clone(), i))
            .collect();
        Self {
            sample_id: sample_id.into(),
            total,
            results,
            index,
        }
    }

    /// Sample identifier.
    pub fn sample_id(&self) -> &str {
        &self.sample_id
    }

    /// Events in the sample.
    pub fn total(&self) -> usize {
        self.total
    }

    /// Result of one gate.
    pub fn get(&self, path: &GatePath) -> Option<&GateResult> {
        self.index.get(path).map(|&i| &self.results[i])
    }

    /// Member count of one gate.
    pub fn count(&self, path: &GatePath) -> Option<usize> {
        self.get(path).map(GateResult::count)
    }

    /// Results in tree order.
    pub fn iter(&self) -> impl Iterator<Item = &GateResult> {
        self.results.iter()
    }

    /// Number of gates.
    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// Whether no gate was evaluated.
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Flat report rows.
    pub fn report(&self) -> Vec<ReportRow> {
        self.results
            .iter()
            .map(|r| ReportRow {
                sample: self.sample_id.clone(),
                gate_path: r.path.to_string(),
                gate_name: r.path.name().map(|n| n.to_string()).unwrap_or_default(),
                gate_type: r.gate_type.clone(),
                parent: r
                    .path
                    .parent()
                    .unwrap_or_else(GatePath::root)
                    .to_string(),
                count: r.count(),
                parent_count: r.parent_count,
                total: r.total,
                percent_of_parent: r.percent_of_parent(),
                percent_of_total: r.percent_of_total(),
            })
            .collect()
    }
}

/// One row of a tabular report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRow {
    /// Sample id.
    pub sample: String,
    /// Full gate path.
    pub gate_path: String,
    /// Last path component.
    pub gate_name: String,
    /// `RectangleGate`, `Quadrant`, ...
    pub gate_type: String,
    /// Parent path; `/` for top-level gates.
    pub parent: String,
    /// Events in the gate.
    pub count: usize,
    /// Events in the parent population.
    pub parent_count: usize,
    /// Events in the sample.
    pub total: usize,
    /// `count / parent_count` as a percentage, 0 for an empty parent.
    pub percent_of_parent: f64,
    /// `count / total` as a percentage, 0 for an empty sample.
    pub percent_of_total: f64,
}
