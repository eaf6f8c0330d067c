// ============================================================================
// Metrics Exporter Interface
// ============================================================================

use crate::error::ExportError;
use crate::metrics::MetricsReport;

/// Destination for periodic metrics reports.
///
/// Exporters run on the reporter thread, never on the engine thread, so they
/// are free to block on I/O.
pub trait MetricsExporter: Send {
    fn export(&mut self, report: &MetricsReport) -> Result<(), ExportError>;

    /// Flush buffered output; called once when the reporter stops.
    fn finish(&mut self) -> Result<(), ExportError> {
        Ok(())
    }
}

impl<E: MetricsExporter + ?Sized> MetricsExporter for Box<E> {
    fn export(&mut self, report: &MetricsReport) -> Result<(), ExportError> {
        (**self).export(report)
    }

    fn finish(&mut self) -> Result<(), ExportError> {
        (**self).finish()
    }
}
