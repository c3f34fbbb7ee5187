//! # Multi-Sample Session
//!
//! A [`Session`] evaluates one immutable strategy against many samples.
//! With `parallel` enabled the samples run on a rayon pool (optionally
//! capped at `max_threads`); each worker has its own dimension cache, and
//! the only shared mutable state is the append-only [`ResultsSink`].
//!
//! Outcomes are returned in sample order regardless of completion order.
//! A failing sample is reported in its slot and does not affect the others.

use parking_lot::Mutex;
use rayon::prelude::*;
use serde::Serialize;

use cytogate_core::Sample;

use crate::config::{ConfigError, EvaluationConfig};
use crate::evaluation::{EvaluationError, Evaluator};
use crate::results::{GatingResults, ReportRow};
use crate::strategy::GatingStrategy;

/// Outcome of one sample.
pub type SampleOutcome = Result<GatingResults, EvaluationError>;

/// Thread-safe, append-only collection of per-sample outcomes.
///
/// `parking_lot::Mutex` because it never poisons: a panicking worker does
/// not make the outcomes of the others unreadable.
#[derive(Debug, Default)]
pub struct ResultsSink {
    entries: Mutex<Vec<(usize, SampleOutcome)>>,
}

impl ResultsSink {
    /// Empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the outcome of the sample at `index`.
    pub fn push(&self, index: usize, outcome: SampleOutcome) {
        self.entries.lock().push((index, outcome));
    }

    /// Outcomes recorded so far.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Outcomes ordered by sample index.
    pub fn into_ordered(self) -> Vec<SampleOutcome> {
        let mut entries = self.entries.into_inner();
        entries.sort_by_key(|(index, _)| *index);
        entries.into_iter().map(|(_, outcome)| outcome).collect()
    }
}

/// A strategy plus the samples to evaluate it against.
#[derive(Debug, Clone)]
pub struct Session {
    strategy: GatingStrategy,
    samples: Vec<Sample>,
    config: EvaluationConfig,
}

impl Session {
    /// Session with the default configuration.
    pub fn new(strategy: GatingStrategy) -> Self {
        Self {
            strategy,
            samples: Vec::new(),
            config: EvaluationConfig::default(),
        }
    }

    /// Session with a validated configuration.
    pub fn with_config(strategy: GatingStrategy, config: EvaluationConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            strategy,
            samples: Vec::new(),
            config,
        })
    }

    /// Queue a sample.
    pub fn add_sample(&mut self, sample: Sample) {
        self.samples.push(sample);
    }

    /// Queued samples, in order.
    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// The strategy.
    pub fn strategy(&self) -> &GatingStrategy {
        &self.strategy
    }

    /// The configuration.
    pub fn config(&self) -> &EvaluationConfig {
        &self.config
    }

    /// Evaluate every sample.
    pub fn evaluate(&self) -> SessionResults {
        let evaluator = Evaluator::new(&self.strategy, &self.config);
        let sink = ResultsSink::new();

        if self.config.parallel {
            let run = || {
                self.samples
                    .par_iter()
                    .enumerate()
                    .for_each(|(i, sample)| sink.push(i, evaluator.evaluate(sample)));
            };
            match self.config.max_threads {
                Some(threads) => match rayon::ThreadPoolBuilder::new().num_threads(threads).build() {
                    Ok(pool) => pool.install(run),
                    Err(e) => {
                        tracing::warn!(threads, error = %e, "cannot build worker pool, using the global pool");
                        run();
                    }
                },
                None => run(),
            }
        } else {
            for (i, sample) in self.samples.iter().enumerate() {
                sink.push(i, evaluator.evaluate(sample));
            }
        }

        let outcomes: Vec<(String, SampleOutcome)> = self
            .samples
            .iter()
            .map(|s| s.id().to_string())
            .zip(sink.into_ordered())
            .collect();

        let failures = outcomes.iter().filter(|(_, o)| o.is_err()).count();
        for (_, outcome) in &outcomes {
            if let Err(e) = outcome {
                tracing::warn!(sample = %e.sample, error = %e.source, "sample evaluation failed");
            }
        }
        tracing::info!(
            samples = outcomes.len(),
            failures,
            parallel = self.config.parallel,
            "evaluated session"
        );
        SessionResults { outcomes }
    }
}

/// Per-sample outcomes of a session, in sample order.
#[derive(Debug, Clone)]
pub struct SessionResults {
    outcomes: Vec<(String, SampleOutcome)>,
}

impl SessionResults {
    /// Outcome of a sample by id (the first one, if ids repeat).
    pub fn get(&self, sample_id: &str) -> Option<&SampleOutcome> {
        self.outcomes
            .iter()
            .find(|(id, _)| id == sample_id)
            .map(|(_, outcome)| outcome)
    }

    /// `(sample id, outcome)` pairs in sample order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &SampleOutcome)> {
        self.outcomes.iter().map(|(id, o)| (id.as_str(), o))
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    /// Whether the session had no samples.
    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// Failed samples.
    pub fn failures(&self) -> Vec<&EvaluationError> {
        self.outcomes
            .iter()
            .filter_map(|(_, o)| o.as_ref().err())
            .collect()
    }

    /// Report rows of every successful sample, in sample then tree order.
    pub fn report(&self) -> Vec<ReportRow> {
        self.outcomes
            .iter()
            .filter_map(|(_, o)| o.as_ref().ok())
            .flat_map(GatingResults::report)
            .collect()
    }

    /// The report as pretty JSON.
    pub fn report_json(&self) -> Result<String, serde_json::Error> {
        #[derive(Serialize)]
        struct Report<'a> {
            rows: &'a [ReportRow],
            failures: Vec<String>,
        }
        let rows = self.report();
        serde_json::to_string_pretty(&Report {
            rows: &rows,
            failures: self.failures().iter().map(|e| e.to_string()).collect(),
        })
    }
}
