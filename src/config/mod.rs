#[cfg(feature = "cli")]
pub mod cli;
pub mod toml_config;

use crate::core::ConfigProvider;
use crate::domain::ports::TlsMode;
use crate::utils::error::{AuditError, Result};
use crate::utils::validation::{
    validate_file_name, validate_non_empty_string, validate_path, validate_range, validate_url,
};
use secrecy::ExposeSecret;

pub const DEFAULT_OUTPUT_PATH: &str = "./output";
pub const DEFAULT_REPORT_NAME: &str = "dot1x_access_interface_report.zip";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONCURRENCY: usize = 1;
pub const MAX_CONCURRENCY: usize = 64;

/// Catalyst Center serves its REST API under `/dna`.
pub fn base_url_for_host(host: &str) -> String {
    format!("https://{}/dna", host.trim().trim_end_matches('/'))
}

pub(crate) fn resolve_base_url(base_url: Option<&str>, host: Option<&str>) -> String {
    match (base_url, host) {
        (Some(url), _) if !url.trim().is_empty() => url.trim().to_string(),
        (_, Some(host)) if !host.trim().is_empty() => base_url_for_host(host),
        _ => String::new(),
    }
}

/// Checks shared by every configuration source.
pub fn validate_provider<C: ConfigProvider>(config: &C) -> Result<()> {
    let base_url = config.base_url();
    if base_url.is_empty() {
        return Err(AuditError::MissingConfigError {
            field: "controller host (DNAC_IP) or base_url".to_string(),
        });
    }
    validate_url("base_url", &base_url)?;

    let credentials = config.credentials();
    validate_non_empty_string("username", &credentials.username)?;
    validate_non_empty_string("password", credentials.password.expose_secret())?;
    for (field, value) in [
        ("username", credentials.username.as_str()),
        ("password", credentials.password.expose_secret()),
    ] {
        if value.contains("${") {
            return Err(AuditError::MissingConfigError {
                field: format!("{} (unresolved environment variable)", field),
            });
        }
    }

    validate_range("max_retries", config.max_retries(), 1, 100)?;
    validate_range("concurrency", config.concurrency(), 1, MAX_CONCURRENCY)?;
    validate_range("requests_per_second", config.requests_per_second(), 1, 1000)?;
    validate_range("timeout", config.request_timeout().as_secs(), 1, 600)?;
    validate_path("output_path", config.output_path())?;
    validate_file_name("report_name", config.report_name())?;

    if let TlsMode::CustomCa(path) = config.tls_mode() {
        if !path.exists() {
            return Err(AuditError::InvalidConfigValueError {
                field: "ca_cert".to_string(),
                value: path.display().to_string(),
                reason: "CA certificate file does not exist".to_string(),
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_from_host() {
        assert_eq!(base_url_for_host("10.10.20.85"), "https://10.10.20.85/dna");
        assert_eq!(
            resolve_base_url(Some("http://localhost:9000/dna"), Some("ignored")),
            "http://localhost:9000/dna"
        );
        assert_eq!(resolve_base_url(None, Some(" dnac.lab ")), "https://dnac.lab/dna");
        assert_eq!(resolve_base_url(Some(""), None), "");
    }
}
