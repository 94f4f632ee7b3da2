use crate::config::{
    resolve_base_url, validate_provider, DEFAULT_CONCURRENCY, DEFAULT_OUTPUT_PATH,
    DEFAULT_REPORT_NAME, DEFAULT_TIMEOUT_SECS,
};
use crate::core::retry::{DEFAULT_MAX_RETRIES, DEFAULT_REQUESTS_PER_SECOND, DEFAULT_RETRY_AFTER};
use crate::core::ConfigProvider;
use crate::domain::ports::{Credentials, FailurePolicy, TlsMode};
use crate::utils::error::{AuditError, Result};
use crate::utils::validation::Validate;
use clap::{Parser, ValueEnum};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Clone, Parser)]
#[command(name = "dot1x-audit")]
#[command(about = "Audit 802.1x configuration on access ports across a Catalyst Center fleet")]
#[command(version)]
pub struct CliConfig {
    /// Controller address; the API base becomes https://<host>/dna
    #[arg(long, env = "DNAC_IP")]
    pub host: Option<String>,

    /// Full API base URL, overrides --host
    #[arg(long, env = "DNAC_BASE_URL")]
    pub base_url: Option<String>,

    #[arg(long, env = "DNAC_USERNAME", default_value = "")]
    pub username: String,

    #[arg(long, env = "DNAC_PASSWORD", default_value = "", hide_env_values = true)]
    pub password: String,

    /// Skip TLS certificate verification (self-signed controllers)
    #[arg(long, env = "DNAC_INSECURE")]
    pub insecure: bool,

    /// Extra CA certificate (PEM) to trust for the controller
    #[arg(long, value_name = "PEM")]
    pub ca_cert: Option<PathBuf>,

    #[arg(long, default_value_t = DEFAULT_MAX_RETRIES)]
    pub max_retries: u32,

    /// Wait used when a 429 response has no usable Retry-After header
    #[arg(long, value_name = "SECONDS", default_value_t = DEFAULT_RETRY_AFTER.as_secs())]
    pub retry_after_default: u64,

    /// Shared request budget towards the controller across all workers
    #[arg(long, default_value_t = DEFAULT_REQUESTS_PER_SECOND)]
    pub requests_per_second: u32,

    #[arg(long, value_name = "SECONDS", default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout: u64,

    /// Number of switches audited in parallel
    #[arg(long, default_value_t = DEFAULT_CONCURRENCY)]
    pub concurrency: usize,

    /// What to do when a switch's interface data cannot be fetched: skip or abort
    #[arg(long, default_value = "skip")]
    pub on_device_failure: FailurePolicy,

    #[arg(long, default_value = DEFAULT_OUTPUT_PATH)]
    pub output_path: String,

    #[arg(long, default_value = DEFAULT_REPORT_NAME)]
    pub report_name: String,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Log memory and timing after each stage")]
    pub monitor: bool,

    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

impl fmt::Debug for CliConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CliConfig")
            .field("host", &self.host)
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("insecure", &self.insecure)
            .field("ca_cert", &self.ca_cert)
            .field("max_retries", &self.max_retries)
            .field("retry_after_default", &self.retry_after_default)
            .field("requests_per_second", &self.requests_per_second)
            .field("timeout", &self.timeout)
            .field("concurrency", &self.concurrency)
            .field("on_device_failure", &self.on_device_failure)
            .field("output_path", &self.output_path)
            .field("report_name", &self.report_name)
            .finish()
    }
}

impl ConfigProvider for CliConfig {
    fn base_url(&self) -> String {
        resolve_base_url(self.base_url.as_deref(), self.host.as_deref())
    }

    fn credentials(&self) -> Credentials {
        Credentials::new(self.username.clone(), self.password.clone())
    }

    fn tls_mode(&self) -> TlsMode {
        if self.insecure {
            TlsMode::AcceptInvalid
        } else if let Some(path) = &self.ca_cert {
            TlsMode::CustomCa(path.clone())
        } else {
            TlsMode::Verify
        }
    }

    fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    fn max_retries(&self) -> u32 {
        self.max_retries
    }

    fn default_retry_after(&self) -> Duration {
        Duration::from_secs(self.retry_after_default)
    }

    fn requests_per_second(&self) -> u32 {
        self.requests_per_second
    }

    fn concurrency(&self) -> usize {
        self.concurrency
    }

    fn failure_policy(&self) -> FailurePolicy {
        self.on_device_failure
    }

    fn output_path(&self) -> &str {
        &self.output_path
    }

    fn report_name(&self) -> &str {
        &self.report_name
    }
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        if self.insecure && self.ca_cert.is_some() {
            return Err(AuditError::ConfigValidationError {
                field: "insecure".to_string(),
                message: "--insecure and --ca-cert cannot be combined".to_string(),
            });
        }
        validate_provider(self)
    }
}
