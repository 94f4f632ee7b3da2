use crate::adapters::ControllerClient;
use crate::core::aggregate::summarize;
use crate::core::audit::FleetAuditor;
use crate::core::{AuditOutcome, AuditReport, ConfigProvider, ControllerApi, Pipeline, Storage};
use crate::utils::error::{AuditError, Result};
use serde::Serialize;
use std::io::Write;
use std::sync::Arc;
use zip::write::{FileOptions, ZipWriter};

pub const DETAIL_FILE: &str = "dot1x_access_interfaces.csv";
pub const SUMMARY_FILE: &str = "dot1x_summary.csv";
pub const SKIPPED_FILE: &str = "skipped_devices.csv";
pub const SUMMARY_JSON_FILE: &str = "summary.json";

#[derive(Debug, Serialize)]
struct SummaryLine {
    #[serde(rename = "Dot1x Configured")]
    label: String,
    #[serde(rename = "Interface Count")]
    count: usize,
}

fn to_csv<T: Serialize>(records: &[T]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for record in records {
        writer.serialize(record)?;
    }
    writer
        .into_inner()
        .map_err(|e| AuditError::IoError(e.into_error()))
}

/// Collects the audit from the controller and writes the zipped report.
pub struct Dot1xAuditPipeline<S: Storage, C: ConfigProvider, A: ControllerApi + 'static> {
    storage: S,
    config: C,
    auditor: FleetAuditor<A>,
}

impl<S: Storage, C: ConfigProvider> Dot1xAuditPipeline<S, C, ControllerClient> {
    pub fn from_config(storage: S, config: C) -> Result<Self> {
        let client = ControllerClient::from_config(&config)?;
        Ok(Self::new(storage, config, Arc::new(client)))
    }
}

impl<S: Storage, C: ConfigProvider, A: ControllerApi + 'static> Dot1xAuditPipeline<S, C, A> {
    pub fn new(storage: S, config: C, api: Arc<A>) -> Self {
        let auditor = FleetAuditor::new(api)
            .with_policy(config.failure_policy())
            .with_concurrency(config.concurrency());
        Self {
            storage,
            config,
            auditor,
        }
    }

    fn build_archive(&self, report: &AuditReport) -> Result<Vec<u8>> {
        let summary_lines: Vec<SummaryLine> = report
            .summary
            .by_count()
            .into_iter()
            .map(|(label, count)| SummaryLine {
                label: label.to_string(),
                count,
            })
            .collect();

        let summary_json = serde_json::json!({
            "generated_at": report.generated_at.to_rfc3339(),
            "switches_audited": report.switches_audited,
            "access_interfaces": report.rows.len(),
            "counts": report.summary,
            "skipped_devices": report.skipped.len(),
        });

        let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));

        zip.start_file::<_, ()>(DETAIL_FILE, FileOptions::default())?;
        zip.write_all(&to_csv(&report.rows)?)?;

        zip.start_file::<_, ()>(SUMMARY_FILE, FileOptions::default())?;
        zip.write_all(&to_csv(&summary_lines)?)?;

        if !report.skipped.is_empty() {
            zip.start_file::<_, ()>(SKIPPED_FILE, FileOptions::default())?;
            zip.write_all(&to_csv(&report.skipped)?)?;
        }

        zip.start_file::<_, ()>(SUMMARY_JSON_FILE, FileOptions::default())?;
        zip.write_all(serde_json::to_string_pretty(&summary_json)?.as_bytes())?;

        let cursor = zip.finish()?;
        Ok(cursor.into_inner())
    }
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider, A: ControllerApi + 'static> Pipeline
    for Dot1xAuditPipeline<S, C, A>
{
    async fn extract(&self) -> Result<AuditOutcome> {
        tracing::debug!("Auditing controller at {}", self.config.base_url());
        self.auditor.run(&self.config.credentials()).await
    }

    async fn transform(&self, outcome: AuditOutcome) -> Result<AuditReport> {
        tracing::info!("Generating summary...");
        let summary = summarize(&outcome.rows);
        for (label, count) in summary.by_count() {
            tracing::info!("Dot1x configured {}: {} interfaces", label, count);
        }

        Ok(AuditReport {
            generated_at: chrono::Utc::now(),
            switches_audited: outcome.switches_audited,
            rows: outcome.rows,
            summary,
            skipped: outcome.skipped,
        })
    }

    async fn load(&self, report: AuditReport) -> Result<String> {
        let archive = self.build_archive(&report)?;
        let report_name = self.config.report_name();

        tracing::debug!("Writing report archive ({} bytes) to storage", archive.len());
        self.storage.write_file(report_name, &archive).await?;

        Ok(format!(
            "{}/{}",
            self.config.output_path().trim_end_matches('/'),
            report_name
        ))
    }
}
