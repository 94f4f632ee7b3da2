use crate::config::{
    resolve_base_url, validate_provider, DEFAULT_CONCURRENCY, DEFAULT_OUTPUT_PATH,
    DEFAULT_REPORT_NAME, DEFAULT_TIMEOUT_SECS,
};
use crate::core::retry::{DEFAULT_MAX_RETRIES, DEFAULT_REQUESTS_PER_SECOND, DEFAULT_RETRY_AFTER};
use crate::core::ConfigProvider;
use crate::domain::ports::{Credentials, FailurePolicy, TlsMode};
use crate::utils::error::{AuditError, Result};
use crate::utils::validation::Validate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    pub controller: ControllerConfig,
    #[serde(default)]
    pub audit: AuditConfig,
    #[serde(default)]
    pub report: ReportConfig,
    #[serde(default)]
    pub error_handling: ErrorHandlingConfig,
    pub monitoring: Option<MonitoringConfig>,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ControllerConfig {
    pub host: Option<String>,
    pub base_url: Option<String>,
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub insecure: bool,
    pub ca_cert: Option<PathBuf>,
    pub timeout_seconds: Option<u64>,
}

impl std::fmt::Debug for ControllerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControllerConfig")
            .field("host", &self.host)
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("insecure", &self.insecure)
            .field("ca_cert", &self.ca_cert)
            .field("timeout_seconds", &self.timeout_seconds)
            .finish()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuditConfig {
    pub max_retries: Option<u32>,
    pub retry_after_default_seconds: Option<u64>,
    pub requests_per_second: Option<u32>,
    pub concurrency: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportConfig {
    pub output_path: Option<String>,
    pub filename: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorHandlingConfig {
    pub on_device_failure: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    pub enabled: bool,
    pub log_format: Option<String>,
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(AuditError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| AuditError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${DNAC_PASSWORD})，未設定的保留原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| AuditError::ConfigError {
            message: format!("invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn monitoring_enabled(&self) -> bool {
        self.monitoring.as_ref().map(|m| m.enabled).unwrap_or(false)
    }

    pub fn json_logs(&self) -> bool {
        self.monitoring
            .as_ref()
            .and_then(|m| m.log_format.as_deref())
            .is_some_and(|f| f.eq_ignore_ascii_case("json"))
    }

    fn parsed_failure_policy(&self) -> Result<FailurePolicy> {
        match self.error_handling.on_device_failure.as_deref() {
            None => Ok(FailurePolicy::default()),
            Some(value) => value
                .parse::<FailurePolicy>()
                .map_err(|reason| AuditError::InvalidConfigValueError {
                    field: "error_handling.on_device_failure".to_string(),
                    value: value.to_string(),
                    reason,
                }),
        }
    }
}

impl ConfigProvider for TomlConfig {
    fn base_url(&self) -> String {
        resolve_base_url(
            self.controller.base_url.as_deref(),
            self.controller.host.as_deref(),
        )
    }

    fn credentials(&self) -> Credentials {
        Credentials::new(
            self.controller.username.clone(),
            self.controller.password.clone(),
        )
    }

    fn tls_mode(&self) -> TlsMode {
        if self.controller.insecure {
            TlsMode::AcceptInvalid
        } else if let Some(path) = &self.controller.ca_cert {
            TlsMode::CustomCa(path.clone())
        } else {
            TlsMode::Verify
        }
    }

    fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.controller.timeout_seconds.unwrap_or(DEFAULT_TIMEOUT_SECS))
    }

    fn max_retries(&self) -> u32 {
        self.audit.max_retries.unwrap_or(DEFAULT_MAX_RETRIES)
    }

    fn default_retry_after(&self) -> Duration {
        self.audit
            .retry_after_default_seconds
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_RETRY_AFTER)
    }

    fn requests_per_second(&self) -> u32 {
        self.audit
            .requests_per_second
            .unwrap_or(DEFAULT_REQUESTS_PER_SECOND)
    }

    fn concurrency(&self) -> usize {
        self.audit.concurrency.unwrap_or(DEFAULT_CONCURRENCY)
    }

    fn failure_policy(&self) -> FailurePolicy {
        self.parsed_failure_policy().unwrap_or_default()
    }

    fn output_path(&self) -> &str {
        self.report.output_path.as_deref().unwrap_or(DEFAULT_OUTPUT_PATH)
    }

    fn report_name(&self) -> &str {
        self.report.filename.as_deref().unwrap_or(DEFAULT_REPORT_NAME)
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.parsed_failure_policy()?;
        if self.controller.insecure && self.controller.ca_cert.is_some() {
            return Err(AuditError::ConfigValidationError {
                field: "controller.insecure".to_string(),
                message: "insecure and ca_cert cannot be combined".to_string(),
            });
        }
        validate_provider(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const BASIC: &str = r#"
[controller]
host = "10.10.20.85"
username = "admin"
password = "Cisco123"

[audit]
max_retries = 3
concurrency = 4
requests_per_second = 4

[report]
output_path = "./reports"

[error_handling]
on_device_failure = "abort"
"#;

    #[test]
    fn test_parse_basic_toml_config() {
        let config = TomlConfig::from_toml_str(BASIC).unwrap();

        assert_eq!(config.base_url(), "https://10.10.20.85/dna");
        assert_eq!(config.max_retries(), 3);
        assert_eq!(config.concurrency(), 4);
        assert_eq!(config.requests_per_second(), 4);
        assert_eq!(config.default_retry_after(), Duration::from_secs(60));
        assert_eq!(config.failure_policy(), FailurePolicy::Abort);
        assert_eq!(config.output_path(), "./reports");
        assert_eq!(config.report_name(), DEFAULT_REPORT_NAME);
        assert_eq!(config.tls_mode(), TlsMode::Verify);
        assert!(!config.monitoring_enabled());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("DOT1X_TEST_PASSWORD", "from-env");

        let toml_content = r#"
[controller]
base_url = "https://dnac.example.com/dna"
username = "admin"
password = "${DOT1X_TEST_PASSWORD}"
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.credentials().password.expose_secret(), "from-env");

        std::env::remove_var("DOT1X_TEST_PASSWORD");
    }

    #[test]
    fn test_unresolved_variable_fails_validation() {
        let toml_content = r#"
[controller]
host = "dnac"
username = "${DOT1X_TEST_SURELY_UNSET_USER}"
password = "pw"
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();
        assert!(matches!(
            config.validate(),
            Err(AuditError::MissingConfigError { .. })
        ));
    }

    #[test]
    fn test_bad_failure_policy_is_rejected() {
        let toml_content = r#"
[controller]
host = "dnac"
username = "admin"
password = "pw"

[error_handling]
on_device_failure = "ignore"
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();
        assert!(matches!(
            config.validate(),
            Err(AuditError::InvalidConfigValueError { .. })
        ));
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(BASIC.as_bytes()).unwrap();

        let config = TomlConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.controller.username, "admin");
        assert!(!format!("{:?}", config).contains("Cisco123"));
    }
}
