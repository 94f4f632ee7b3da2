use crate::core::aggregate::Aggregator;
use crate::core::filter::filter_switches;
use crate::core::resolver::Dot1xResolver;
use crate::domain::model::{AuditOutcome, Device, ReportRow, SkippedDevice};
use crate::domain::ports::{ControllerApi, Credentials, FailurePolicy, Session};
use crate::utils::error::{AuditError, Result};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Runs every switch in the inventory through the resolver.
pub struct FleetAuditor<A: ControllerApi + 'static> {
    api: Arc<A>,
    resolver: Dot1xResolver<A>,
    policy: FailurePolicy,
    concurrency: usize,
}

impl<A: ControllerApi + 'static> FleetAuditor<A> {
    pub fn new(api: Arc<A>) -> Self {
        Self {
            resolver: Dot1xResolver::new(Arc::clone(&api)),
            api,
            policy: FailurePolicy::default(),
            concurrency: 1,
        }
    }

    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Authenticate, list the inventory, keep the switches and audit them.
    pub async fn run(&self, credentials: &Credentials) -> Result<AuditOutcome> {
        tracing::info!("Requesting authentication token from the controller...");
        let session = self.api.authenticate(credentials).await?;
        tracing::info!("Authentication successful.");

        tracing::info!("Fetching all network devices from inventory...");
        let devices = self.api.list_devices(&session).await?;
        tracing::info!("Total devices found: {}", devices.len());

        let switches = filter_switches(devices);
        tracing::info!("Total switches in inventory: {}", switches.len());

        self.audit(&session, switches).await
    }

    pub async fn audit(&self, session: &Session, switches: Vec<Device>) -> Result<AuditOutcome> {
        if self.concurrency > 1 && switches.len() > 1 {
            self.audit_concurrent(session, switches).await
        } else {
            self.audit_sequential(session, switches).await
        }
    }

    async fn audit_sequential(&self, session: &Session, switches: Vec<Device>) -> Result<AuditOutcome> {
        let total = switches.len();
        let mut aggregator = Aggregator::new();
        let mut skipped = Vec::new();

        for (idx, device) in switches.iter().enumerate() {
            log_device_start(idx, total, device);
            let result = self.resolver.resolve(session, device).await;
            self.absorb(device, result, &mut aggregator, &mut skipped)?;
        }

        Ok(AuditOutcome {
            switches_audited: total,
            rows: aggregator.into_rows(),
            skipped,
        })
    }

    async fn audit_concurrent(&self, session: &Session, switches: Vec<Device>) -> Result<AuditOutcome> {
        let total = switches.len();
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut tasks = JoinSet::new();

        tracing::debug!("Auditing {} switches with {} workers", total, self.concurrency);

        for (idx, device) in switches.into_iter().enumerate() {
            let permit = Arc::clone(&semaphore)
                .acquire_owned()
                .await
                .map_err(|e| AuditError::ProcessingError {
                    message: format!("worker pool closed: {}", e),
                })?;
            let resolver = self.resolver.clone();
            let session = session.clone();

            tasks.spawn(async move {
                let _permit = permit;
                log_device_start(idx, total, &device);
                let result = resolver.resolve(&session, &device).await;
                (idx, device, result)
            });
        }

        let mut finished = Vec::with_capacity(total);
        while let Some(joined) = tasks.join_next().await {
            let entry = joined.map_err(|e| AuditError::ProcessingError {
                message: format!("device task failed: {}", e),
            })?;
            finished.push(entry);
        }

        // 依照清單順序重組，輸出與循序模式一致
        finished.sort_by_key(|(idx, _, _)| *idx);

        let mut aggregator = Aggregator::new();
        let mut skipped = Vec::new();
        for (_, device, result) in finished {
            self.absorb(&device, result, &mut aggregator, &mut skipped)?;
        }

        Ok(AuditOutcome {
            switches_audited: total,
            rows: aggregator.into_rows(),
            skipped,
        })
    }

    fn absorb(
        &self,
        device: &Device,
        result: Result<Vec<ReportRow>>,
        aggregator: &mut Aggregator,
        skipped: &mut Vec<SkippedDevice>,
    ) -> Result<()> {
        match result {
            Ok(rows) => {
                aggregator.extend(rows);
                Ok(())
            }
            Err(e) => match self.policy {
                FailurePolicy::Abort => Err(e),
                FailurePolicy::Skip => {
                    tracing::error!(
                        "❌ Skipping switch '{}' (ID: {}): {}",
                        device.display_name(),
                        device.id,
                        e
                    );
                    skipped.push(SkippedDevice {
                        device_name: device.display_name().to_string(),
                        device_id: device.id.clone(),
                        reason: e.to_string(),
                    });
                    Ok(())
                }
            },
        }
    }
}

fn log_device_start(idx: usize, total: usize, device: &Device) {
    tracing::info!(
        "[{}/{}] Checking switch '{}' (ID: {}) for Dot1x global status...",
        idx + 1,
        total,
        device.display_name(),
        device.id
    );
}
