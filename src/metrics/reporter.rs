// ============================================================================
// Metrics Reporter
// Periodic pull from the collector into pluggable exporters
// ============================================================================

use crate::engine::StopSignal;
use crate::error::ExportError;
use crate::interfaces::MetricsExporter;
use std::io::Write;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use super::{MetricsCollector, MetricsReport};

/// Writes each report as structured `tracing` events.
#[derive(Debug, Default)]
pub struct TracingExporter;

impl MetricsExporter for TracingExporter {
    fn export(&mut self, report: &MetricsReport) -> Result<(), ExportError> {
        tracing::info!(
            orders = report.totals.orders,
            trades = report.totals.trades,
            cancels = report.totals.cancels,
            unknown_cancels = report.totals.unknown_cancels,
            rejected = report.totals.rejected,
            dropped_trades = report.totals.dropped_trades,
            samples = report.latency.samples,
            p50_ns = report.latency.p50,
            p99_ns = report.latency.p99,
            p999_ns = report.latency.p999,
            max_ns = report.latency.max,
            "metrics"
        );
        for thread in &report.threads {
            tracing::debug!(
                slot = thread.slot,
                label = %thread.label,
                samples = thread.latency.samples,
                p99_ns = thread.latency.p99,
                overwritten = thread.overwritten_samples,
                "thread metrics"
            );
        }
        Ok(())
    }
}

const CSV_HEADER: &str = "generated_at,orders,trades,cancels,unknown_cancels,rejected,\
dropped_trades,samples,p50_ns,p99_ns,p999_ns,max_ns,mean_ns";

/// One CSV row per report; the header goes out with the first row.
pub struct CsvExporter<W: Write + Send> {
    writer: W,
    header_written: bool,
}

impl<W: Write + Send> CsvExporter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            header_written: false,
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Send> MetricsExporter for CsvExporter<W> {
    fn export(&mut self, report: &MetricsReport) -> Result<(), ExportError> {
        if !self.header_written {
            writeln!(self.writer, "{CSV_HEADER}")?;
            self.header_written = true;
        }
        let totals = &report.totals;
        let latency = &report.latency;
        writeln!(
            self.writer,
            "{},{},{},{},{},{},{},{},{},{},{},{},{:.1}",
            report.generated_at.to_rfc3339(),
            totals.orders,
            totals.trades,
            totals.cancels,
            totals.unknown_cancels,
            totals.rejected,
            totals.dropped_trades,
            latency.samples,
            latency.p50,
            latency.p99,
            latency.p999,
            latency.max,
            latency.mean
        )?;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), ExportError> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Newline-delimited JSON, one report per line.
#[cfg(feature = "serde")]
pub struct JsonExporter<W: Write + Send> {
    writer: W,
}

#[cfg(feature = "serde")]
impl<W: Write + Send> JsonExporter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

#[cfg(feature = "serde")]
impl<W: Write + Send> MetricsExporter for JsonExporter<W> {
    fn export(&mut self, report: &MetricsReport) -> Result<(), ExportError> {
        serde_json::to_writer(&mut self.writer, report)
            .map_err(|err| ExportError::Serialize(err.to_string()))?;
        writeln!(self.writer)?;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), ExportError> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Collect and export every `interval` until `stop` fires, then export a
/// final report. The thread returns how many reports it exported.
pub fn spawn_reporter<E>(
    collector: Arc<MetricsCollector>,
    mut exporter: E,
    interval: Duration,
    stop: StopSignal,
) -> std::io::Result<JoinHandle<Result<u64, ExportError>>>
where
    E: MetricsExporter + 'static,
{
    std::thread::Builder::new()
        .name("metrics-reporter".into())
        .spawn(move || {
            let mut exported = 0;
            while !stop.sleep(interval) {
                exporter.export(&collector.collect())?;
                exported += 1;
            }
            exporter.export(&collector.collect())?;
            exporter.finish()?;
            tracing::debug!(reports = exported + 1, "metrics reporter stopped");
            Ok(exported + 1)
        })
}
