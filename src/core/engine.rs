use crate::core::Pipeline;
use crate::utils::error::Result;
use crate::utils::monitor::RunMonitor;

pub struct AuditEngine<P: Pipeline> {
    pipeline: P,
    monitor: RunMonitor,
}

impl<P: Pipeline> AuditEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self::new_with_monitoring(pipeline, false)
    }

    pub fn new_with_monitoring(pipeline: P, monitor_enabled: bool) -> Self {
        Self {
            pipeline,
            monitor: RunMonitor::new(monitor_enabled),
        }
    }

    /// Returns the report location, or `None` when there was nothing to report.
    pub async fn run(&self) -> Result<Option<String>> {
        tracing::info!("Starting 802.1x audit...");

        let outcome = self.pipeline.extract().await?;
        tracing::info!(
            "Collected {} access interface rows from {} switches ({} skipped)",
            outcome.rows.len(),
            outcome.switches_audited,
            outcome.skipped.len()
        );
        self.monitor.log_stage("Extract");

        if outcome.rows.is_empty() {
            tracing::info!("No access interfaces found with/without Dot1x configuration. Exiting.");
            self.monitor.log_final();
            return Ok(None);
        }

        let report = self.pipeline.transform(outcome).await?;
        self.monitor.log_stage("Transform");

        tracing::info!("Exporting results...");
        let output_path = self.pipeline.load(report).await?;
        self.monitor.log_stage("Load");
        self.monitor.log_final();

        tracing::info!("Report exported to {}", output_path);
        Ok(Some(output_path))
    }
}
