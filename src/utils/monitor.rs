use std::time::{Duration, Instant};
#[cfg(feature = "cli")]
use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System};

#[derive(Debug, Clone)]
pub struct RunStats {
    pub memory_mb: u64,
    pub peak_memory_mb: u64,
    pub elapsed: Duration,
}

/// Tracks process memory and wall time across the audit stages.
#[cfg(feature = "cli")]
pub struct RunMonitor {
    system: std::sync::Mutex<System>,
    pid: Option<Pid>,
    start: Instant,
    peak_memory_mb: std::sync::atomic::AtomicU64,
    enabled: bool,
}

#[cfg(feature = "cli")]
impl RunMonitor {
    pub fn new(enabled: bool) -> Self {
        let pid = if enabled {
            sysinfo::get_current_pid().ok()
        } else {
            None
        };

        Self {
            system: std::sync::Mutex::new(System::new()),
            pid,
            start: Instant::now(),
            peak_memory_mb: std::sync::atomic::AtomicU64::new(0),
            enabled,
        }
    }

    pub fn snapshot(&self) -> Option<RunStats> {
        if !self.enabled {
            return None;
        }
        let pid = self.pid?;

        let mut system = self.system.lock().ok()?;
        system.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[pid]),
            true,
            ProcessRefreshKind::nothing().with_memory(),
        );
        let memory_mb = system.process(pid)?.memory() / 1024 / 1024;

        let peak = self
            .peak_memory_mb
            .fetch_max(memory_mb, std::sync::atomic::Ordering::Relaxed)
            .max(memory_mb);

        Some(RunStats {
            memory_mb,
            peak_memory_mb: peak,
            elapsed: self.start.elapsed(),
        })
    }

    pub fn log_stage(&self, stage: &str) {
        if let Some(stats) = self.snapshot() {
            tracing::info!(
                "📊 {} - Memory: {}MB, Peak: {}MB, Elapsed: {:?}",
                stage,
                stats.memory_mb,
                stats.peak_memory_mb,
                stats.elapsed
            );
        }
    }

    pub fn log_final(&self) {
        if let Some(stats) = self.snapshot() {
            tracing::info!(
                "📊 Audit finished in {:?}, peak memory {}MB",
                stats.elapsed,
                stats.peak_memory_mb
            );
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

// Without the cli feature only wall time is tracked.
#[cfg(not(feature = "cli"))]
pub struct RunMonitor {
    start: Instant,
    enabled: bool,
}

#[cfg(not(feature = "cli"))]
impl RunMonitor {
    pub fn new(enabled: bool) -> Self {
        Self {
            start: Instant::now(),
            enabled,
        }
    }

    pub fn snapshot(&self) -> Option<RunStats> {
        self.enabled.then(|| RunStats {
            memory_mb: 0,
            peak_memory_mb: 0,
            elapsed: self.start.elapsed(),
        })
    }

    pub fn log_stage(&self, stage: &str) {
        if let Some(stats) = self.snapshot() {
            tracing::info!("📊 {} - Elapsed: {:?}", stage, stats.elapsed);
        }
    }

    pub fn log_final(&self) {
        if let Some(stats) = self.snapshot() {
            tracing::info!("📊 Audit finished in {:?}", stats.elapsed);
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

impl Default for RunMonitor {
    fn default() -> Self {
        Self::new(false)
    }
}
