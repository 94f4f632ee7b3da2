use crate::domain::model::{AuditOutcome, AuditReport, Device, Interface};
use crate::utils::error::Result;
use async_trait::async_trait;
use secrecy::SecretString;
use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: SecretString,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: SecretString::from(password.into()),
        }
    }
}

/// Authenticated controller session. Acquired once per run and passed
/// explicitly to every call.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    token: String,
}

impl Session {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session").field("token", &"[REDACTED]").finish()
    }
}

/// Network controller operations the audit depends on.
#[async_trait]
pub trait ControllerApi: Send + Sync {
    async fn authenticate(&self, credentials: &Credentials) -> Result<Session>;

    async fn list_devices(&self, session: &Session) -> Result<Vec<Device>>;

    /// Never fails: rate limiting, errors and exhausted retries all
    /// resolve to `false`.
    async fn global_dot1x_enabled(&self, session: &Session, device_id: &str) -> bool;

    async fn interfaces(&self, session: &Session, device_id: &str) -> Result<Vec<Interface>>;

    async fn dot1x_interface_names(
        &self,
        session: &Session,
        device_id: &str,
    ) -> Result<HashSet<String>>;
}

/// Clock used for rate-limit backoff.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

pub trait Storage: Send + Sync {
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TlsMode {
    /// Use the system certificate store.
    Verify,
    /// Trust an additional CA from the given PEM file.
    CustomCa(PathBuf),
    /// Accept any certificate. Must be requested explicitly.
    AcceptInvalid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Log the device, record it as skipped and keep going.
    #[default]
    Skip,
    /// Stop the whole run on the first per-device failure.
    Abort,
}

impl std::str::FromStr for FailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "skip" => Ok(FailurePolicy::Skip),
            "abort" => Ok(FailurePolicy::Abort),
            other => Err(format!("unknown failure policy '{}', expected skip or abort", other)),
        }
    }
}

pub trait ConfigProvider: Send + Sync {
    fn base_url(&self) -> String;
    fn credentials(&self) -> Credentials;
    fn tls_mode(&self) -> TlsMode;
    fn request_timeout(&self) -> Duration;
    fn max_retries(&self) -> u32;
    fn default_retry_after(&self) -> Duration;
    /// Request budget shared by all workers.
    fn requests_per_second(&self) -> u32;
    fn concurrency(&self) -> usize;
    fn failure_policy(&self) -> FailurePolicy;
    fn output_path(&self) -> &str;
    fn report_name(&self) -> &str;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<AuditOutcome>;
    async fn transform(&self, outcome: AuditOutcome) -> Result<AuditReport>;
    async fn load(&self, report: AuditReport) -> Result<String>;
}
