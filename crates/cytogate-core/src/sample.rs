//! # Samples and Event Matrices
//!
//! A [`Sample`] owns one immutable [`EventMatrix`]: rows are events,
//! columns are channels. Storage is column-major because every consumer
//! (transforms, compensation, gates) works on whole channel columns.
//!
//! Ingestion validates shape and finiteness up front so that nothing
//! downstream has to re-check it.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::SampleError;

/// Display scale recorded by the instrument for a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayHint {
    /// Linear display.
    Linear,
    /// Logarithmic display.
    Logarithmic,
}

/// Metadata for one measured parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    /// Short channel name (detector), e.g. `FL1-H`. Unique per sample.
    pub name: String,
    /// Optional descriptive label, usually the stain or marker.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Fluorochrome measured on this channel.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fluorochrome: Option<String>,
    /// Detector voltage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voltage: Option<f64>,
    /// Display scale hint from acquisition.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display: Option<DisplayHint>,
}

impl Channel {
    /// A channel with only a name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            label: None,
            fluorochrome: None,
            voltage: None,
            display: None,
        }
    }

    /// Attach a descriptive label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Attach a fluorochrome.
    pub fn with_fluorochrome(mut self, fluorochrome: impl Into<String>) -> Self {
        self.fluorochrome = Some(fluorochrome.into());
        self
    }

    /// Attach a detector voltage.
    pub fn with_voltage(mut self, voltage: f64) -> Self {
        self.voltage = Some(voltage);
        self
    }

    /// Attach a display hint.
    pub fn with_display(mut self, display: DisplayHint) -> Self {
        self.display = Some(display);
        self
    }
}

/// Immutable events × channels table.
#[derive(Debug, Clone, PartialEq)]
pub struct EventMatrix {
    channels: Vec<Channel>,
    columns: Vec<Vec<f64>>,
    index: HashMap<String, usize>,
    event_count: usize,
}

impl EventMatrix {
    /// Build from per-channel columns.
    pub fn from_columns(channels: Vec<Channel>, columns: Vec<Vec<f64>>) -> Result<Self, SampleError> {
        if columns.len() != channels.len() {
            return Err(SampleError::ChannelCountMismatch {
                expected: channels.len(),
                found: columns.len(),
                event: 0,
            });
        }
        let index = build_index(&channels)?;
        let event_count = columns.first().map_or(0, Vec::len);
        for (channel, column) in channels.iter().zip(&columns) {
            if column.len() != event_count {
                return Err(SampleError::EventCountMismatch {
                    channel: channel.name.clone(),
                    expected: event_count,
                    found: column.len(),
                });
            }
            if let Some(event) = column.iter().position(|v| !v.is_finite()) {
                return Err(SampleError::NonFinite {
                    channel: channel.name.clone(),
                    event,
                });
            }
        }
        Ok(Self {
            channels,
            columns,
            index,
            event_count,
        })
    }

    /// Build from per-event rows.
    pub fn from_rows(channels: Vec<Channel>, rows: &[Vec<f64>]) -> Result<Self, SampleError> {
        let width = channels.len();
        let mut columns = vec![Vec::with_capacity(rows.len()); width];
        for (event, row) in rows.iter().enumerate() {
            if row.len() != width {
                return Err(SampleError::ChannelCountMismatch {
                    expected: width,
                    found: row.len(),
                    event,
                });
            }
            for (column, value) in columns.iter_mut().zip(row) {
                column.push(*value);
            }
        }
        Self::from_columns(channels, columns)
    }

    /// Number of events (rows).
    pub fn event_count(&self) -> usize {
        self.event_count
    }

    /// Number of channels (columns).
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Ordered channel metadata.
    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    /// Position of a channel by name.
    pub fn channel_index(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Column for a channel name.
    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.channel_index(name).map(|i| self.columns[i].as_slice())
    }

    /// Column by position.
    pub fn column_at(&self, index: usize) -> Option<&[f64]> {
        self.columns.get(index).map(Vec::as_slice)
    }

    /// One event as a row vector.
    pub fn row(&self, event: usize) -> Option<Vec<f64>> {
        if event >= self.event_count {
            return None;
        }
        Some(self.columns.iter().map(|c| c[event]).collect())
    }
}

fn build_index(channels: &[Channel]) -> Result<HashMap<String, usize>, SampleError> {
    let mut index = HashMap::with_capacity(channels.len());
    for (i, channel) in channels.iter().enumerate() {
        if index.insert(channel.name.clone(), i).is_some() {
            return Err(SampleError::DuplicateChannel(channel.name.clone()));
        }
    }
    Ok(index)
}

/// Spillover matrix recorded by the instrument alongside the events.
///
/// Kept as plain data here; the compensation layer turns it into an
/// operator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddedSpillover {
    /// Detector (channel) names, in matrix order.
    pub detectors: Vec<String>,
    /// Row-major spillover coefficients, `detectors.len()` squared.
    pub values: Vec<Vec<f64>>,
}

/// One acquired sample: identifier, events, optional embedded spillover.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    id: String,
    events: EventMatrix,
    spillover: Option<EmbeddedSpillover>,
}

impl Sample {
    /// Create a sample without an embedded spillover matrix.
    pub fn new(id: impl Into<String>, events: EventMatrix) -> Self {
        Self {
            id: id.into(),
            events,
            spillover: None,
        }
    }

    /// Attach the instrument spillover matrix.
    pub fn with_spillover(mut self, spillover: EmbeddedSpillover) -> Self {
        self.spillover = Some(spillover);
        self
    }

    /// Sample identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The event matrix.
    pub fn events(&self) -> &EventMatrix {
        &self.events
    }

    /// Embedded spillover, if the instrument recorded one.
    pub fn spillover(&self) -> Option<&EmbeddedSpillover> {
        self.spillover.as_ref()
    }

    /// Number of events.
    pub fn event_count(&self) -> usize {
        self.events.event_count()
    }
}

impl fmt::Display for Sample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Sample({}, {} channels, {} events)",
            self.id,
            self.events.channel_count(),
            self.events.event_count()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channels(names: &[&str]) -> Vec<Channel> {
        names.iter().map(|n| Channel::new(*n)).collect()
    }

    #[test]
    fn rows_are_transposed_into_columns() {
        let m = EventMatrix::from_rows(
            channels(&["FSC-A", "SSC-A"]),
            &[vec![1.0, 10.0], vec![2.0, 20.0], vec![3.0, 30.0]],
        )
        .unwrap();
        assert_eq!(m.event_count(), 3);
        assert_eq!(m.column("SSC-A").unwrap(), &[10.0, 20.0, 30.0]);
        assert_eq!(m.row(1).unwrap(), vec![2.0, 20.0]);
        assert!(m.row(3).is_none());
    }

    #[test]
    fn ragged_rows_are_rejected() {
        let err = EventMatrix::from_rows(channels(&["A", "B"]), &[vec![1.0, 2.0], vec![1.0]])
            .unwrap_err();
        assert_eq!(
            err,
            SampleError::ChannelCountMismatch {
                expected: 2,
                found: 1,
                event: 1
            }
        );
    }

    #[test]
    fn non_finite_values_are_rejected() {
        let err = EventMatrix::from_columns(channels(&["A"]), vec![vec![1.0, f64::NAN]]).unwrap_err();
        assert!(matches!(err, SampleError::NonFinite { event: 1, .. }));
    }

    #[test]
    fn duplicate_channels_are_rejected() {
        let err = EventMatrix::from_columns(channels(&["A", "A"]), vec![vec![], vec![]]).unwrap_err();
        assert_eq!(err, SampleError::DuplicateChannel("A".into()));
    }

    #[test]
    fn unequal_columns_are_rejected() {
        let err = EventMatrix::from_columns(channels(&["A", "B"]), vec![vec![1.0], vec![]])
            .unwrap_err();
        assert!(matches!(err, SampleError::EventCountMismatch { .. }));
    }

    #[test]
    fn sample_display() {
        let m = EventMatrix::from_rows(channels(&["A", "B"]), &[vec![0.0, 1.0]]).unwrap();
        let s = Sample::new("B07", m);
        assert_eq!(s.to_string(), "Sample(B07, 2 channels, 1 events)");
        assert!(s.spillover().is_none());
    }
}
