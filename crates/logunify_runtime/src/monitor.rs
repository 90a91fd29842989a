//! Event metrics and the telemetry sink.
//!
//! Used in place of the viewer when no terminal UI runs: every event is
//! counted per column and traced, and a summary is logged at the end.

use async_trait::async_trait;
use logunify_core::{Column, Event, EventSink, SinkError};
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::{info, trace};

/// Counters for one column
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ColumnMetrics {
    /// Events seen
    pub events: u64,
    /// Text bytes seen
    pub bytes: u64,
}

/// Event metrics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metrics {
    /// Events seen over all columns
    pub events: u64,
    /// Text bytes seen over all columns
    pub bytes: u64,
    columns: BTreeMap<Column, ColumnMetrics>,
}

impl Metrics {
    /// Create empty metrics
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one event
    pub fn record(&mut self, event: &Event) {
        let bytes = event.text.len() as u64;
        self.events += 1;
        self.bytes += bytes;
        let column = self.columns.entry(event.column).or_default();
        column.events += 1;
        column.bytes += bytes;
    }

    /// Counters for `column`, zero if it never produced output
    #[must_use]
    pub fn column(&self, column: Column) -> ColumnMetrics {
        self.columns.get(&column).copied().unwrap_or_default()
    }

    /// Columns that produced output, in column order
    pub fn columns(&self) -> impl Iterator<Item = (Column, ColumnMetrics)> + '_ {
        self.columns.iter().map(|(column, metrics)| (*column, *metrics))
    }

    /// Reset metrics
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Sink that only counts and traces events
#[derive(Debug)]
pub struct TelemetrySink {
    metrics: Metrics,
    started: Instant,
}

impl TelemetrySink {
    /// Create a sink with empty metrics
    #[must_use]
    pub fn new() -> Self {
        Self {
            metrics: Metrics::new(),
            started: Instant::now(),
        }
    }

    /// Metrics gathered so far
    #[must_use]
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }
}

impl Default for TelemetrySink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventSink for TelemetrySink {
    fn name(&self) -> &str {
        "telemetry"
    }

    async fn write(&mut self, event: &Event) -> Result<(), SinkError> {
        self.metrics.record(event);
        trace!(
            column = %event.column,
            at = %event.timestamp.format_stamp(),
            text = %event.text.trim_end(),
            "event"
        );
        Ok(())
    }

    async fn finish(&mut self) -> Result<(), SinkError> {
        for (column, metrics) in self.metrics.columns() {
            info!(%column, events = metrics.events, bytes = metrics.bytes, "column summary");
        }
        info!(
            events = self.metrics.events,
            bytes = self.metrics.bytes,
            elapsed_ms = self.started.elapsed().as_millis() as u64,
            "telemetry summary"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_per_column() {
        let mut metrics = Metrics::new();
        metrics.record(&Event::now(Column::new(1), "abc"));
        metrics.record(&Event::now(Column::new(2), "de"));
        metrics.record(&Event::now(Column::new(1), "f"));

        assert_eq!(metrics.events, 3);
        assert_eq!(metrics.bytes, 6);
        assert_eq!(metrics.column(Column::new(1)), ColumnMetrics { events: 2, bytes: 4 });
        assert_eq!(metrics.column(Column::new(7)), ColumnMetrics::default());
        assert_eq!(metrics.columns().count(), 2);

        metrics.reset();
        assert_eq!(metrics, Metrics::new());
    }

    #[tokio::test]
    async fn test_telemetry_sink_counts() {
        let mut sink = TelemetrySink::new();
        sink.write(&Event::now(Column::new(3), "hello\n")).await.unwrap();
        sink.finish().await.unwrap();
        assert_eq!(sink.name(), "telemetry");
        assert_eq!(sink.metrics().column(Column::new(3)).bytes, 6);
    }
}
