use crate::core::retry::{
    parse_retry_after, Attempt, RateLimitRetry, RetryOutcome, TokioSleeper,
    DEFAULT_REQUESTS_PER_SECOND,
};
use crate::domain::model::{
    lenient_string, Device, Interface, RawDevice, RawInterface, DOT1X_INTERFACE_CONFIG_TYPE,
    MISSING_HOSTNAME,
};
use crate::domain::ports::{ConfigProvider, ControllerApi, Credentials, Session, TlsMode};
use crate::utils::error::{AuditError, Result};
use async_trait::async_trait;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use reqwest::header::RETRY_AFTER;
use reqwest::{Client, StatusCode};
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashSet;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

pub const AUTH_HEADER: &str = "X-Auth-Token";
pub const AUTH_PATH: &str = "/system/api/v1/auth/token";
pub const DEVICES_PATH: &str = "/intent/api/v1/network-device";

pub fn global_config_path(device_id: &str) -> String {
    format!(
        "/intent/api/v1/wired/networkDevices/{}/configFeatures/deployed/layer2/dot1xGlobalConfig",
        device_id
    )
}

pub fn interfaces_path(device_id: &str) -> String {
    format!("/intent/api/v1/interface/network-device/{}", device_id)
}

pub fn interface_config_path(device_id: &str) -> String {
    format!(
        "/intent/api/v1/wired/networkDevices/{}/configFeatures/deployed/layer2/dot1xInterfaceConfig",
        device_id
    )
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(rename = "Token")]
    token: String,
}

/// `{"response": ...}` wrapper used by every intent endpoint.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    response: Option<T>,
}

impl<T: Default> Envelope<T> {
    fn into_inner(self) -> T {
        self.response.unwrap_or_default()
    }
}

#[derive(Debug, Deserialize)]
struct ItemList<T> {
    #[serde(default)]
    items: Vec<T>,
}

impl<T> Default for ItemList<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GlobalConfigResponse {
    #[serde(default)]
    dot1x_global_config: Option<ItemList<GlobalConfigItem>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GlobalConfigItem {
    #[serde(default)]
    is_dot1x_enabled: Option<bool>,
}

impl GlobalConfigResponse {
    /// Only the first item counts, as the controller reports one per device.
    fn is_enabled(&self) -> bool {
        self.dot1x_global_config
            .as_ref()
            .and_then(|c| c.items.first())
            .and_then(|item| item.is_dot1x_enabled)
            .unwrap_or(false)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InterfaceConfigResponse {
    #[serde(default)]
    dot1x_interface_config: Option<ItemList<InterfaceConfigItem>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InterfaceConfigItem {
    #[serde(default, deserialize_with = "lenient_string")]
    interface_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    config_type: Option<String>,
}

impl InterfaceConfigResponse {
    fn dot1x_names(self) -> HashSet<String> {
        self.dot1x_interface_config
            .unwrap_or_default()
            .items
            .into_iter()
            .filter(|item| item.config_type.as_deref() == Some(DOT1X_INTERFACE_CONFIG_TYPE))
            .filter_map(|item| item.interface_name)
            .collect()
    }
}

pub fn build_http_client(tls: &TlsMode, timeout: Duration) -> Result<Client> {
    let mut builder = Client::builder()
        .timeout(timeout)
        .user_agent(concat!("dot1x-audit/", env!("CARGO_PKG_VERSION")));

    match tls {
        TlsMode::Verify => {}
        TlsMode::CustomCa(path) => {
            let cert_pem = std::fs::read(path)?;
            let cert = reqwest::Certificate::from_pem(&cert_pem)?;
            builder = builder.add_root_certificate(cert);
        }
        TlsMode::AcceptInvalid => {
            tracing::warn!("⚠️ TLS certificate verification is disabled for controller requests");
            builder = builder.danger_accept_invalid_certs(true);
        }
    }

    Ok(builder.build()?)
}

pub type ControllerRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Token bucket shared by every request the client sends, so parallel
/// workers draw from one budget.
pub fn build_rate_limiter(requests_per_second: u32) -> Arc<ControllerRateLimiter> {
    let rate = NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN);
    Arc::new(RateLimiter::direct(Quota::per_second(rate)))
}

/// HTTP client plus the shared limiter; every request waits for a token.
struct Transport {
    http: Client,
    limiter: Arc<ControllerRateLimiter>,
}

impl Transport {
    async fn get(&self, url: &str, token: &str) -> reqwest::Result<reqwest::Response> {
        self.limiter.until_ready().await;
        self.http.get(url).header(AUTH_HEADER, token).send().await
    }
}

/// reqwest-backed client for the controller REST API.
pub struct ControllerClient {
    transport: Transport,
    base_url: String,
    retry: RateLimitRetry,
}

impl ControllerClient {
    pub fn new(base_url: &str, tls: &TlsMode, timeout: Duration) -> Result<Self> {
        Ok(Self {
            transport: Transport {
                http: build_http_client(tls, timeout)?,
                limiter: build_rate_limiter(DEFAULT_REQUESTS_PER_SECOND),
            },
            base_url: base_url.trim_end_matches('/').to_string(),
            retry: RateLimitRetry::default(),
        })
    }

    pub fn from_config<C: ConfigProvider>(config: &C) -> Result<Self> {
        let client = Self::new(
            &config.base_url(),
            &config.tls_mode(),
            config.request_timeout(),
        )?;
        Ok(client
            .with_retry(RateLimitRetry::new(
                config.max_retries(),
                config.default_retry_after(),
                Arc::new(TokioSleeper),
            ))
            .with_rate_limiter(build_rate_limiter(config.requests_per_second())))
    }

    pub fn with_retry(mut self, retry: RateLimitRetry) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_rate_limiter(mut self, limiter: Arc<ControllerRateLimiter>) -> Self {
        self.transport.limiter = limiter;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Single GET without 429 backoff; a rate-limited response is a `Fetch` error.
    async fn get_once<T: DeserializeOwned>(&self, session: &Session, path: &str) -> Result<T> {
        let url = self.url(path);
        tracing::debug!("GET {}", url);
        match get_attempt::<T>(&self.transport, &url, session.token(), path).await? {
            Attempt::Done(value) => Ok(value),
            Attempt::RateLimited { .. } => {
                tracing::warn!("HTTP 429 from {}", path);
                Err(AuditError::Fetch {
                    endpoint: path.to_string(),
                    status: StatusCode::TOO_MANY_REQUESTS.as_u16(),
                    message: "rate limited".to_string(),
                })
            }
        }
    }

    /// GET with 429 backoff. Any other non-success status is a `Fetch` error.
    async fn get_json<T: DeserializeOwned>(&self, session: &Session, path: &str) -> Result<T> {
        let url = self.url(path);
        let transport = &self.transport;
        let url = url.as_str();
        let token = session.token();

        let outcome = self
            .retry
            .run(path, move |attempt| {
                tracing::debug!("GET {} (attempt {})", url, attempt);
                get_attempt::<T>(transport, url, token, path)
            })
            .await?;

        match outcome {
            RetryOutcome::Resolved { value, .. } => Ok(value),
            RetryOutcome::Exhausted { attempts } => Err(AuditError::RateLimitExhausted {
                endpoint: path.to_string(),
                attempts,
            }),
        }
    }
}

async fn get_attempt<T: DeserializeOwned>(
    transport: &Transport,
    url: &str,
    token: &str,
    path: &str,
) -> Result<Attempt<T>> {
    let response = transport.get(url, token).await?;
    let status = response.status();

    if status == StatusCode::TOO_MANY_REQUESTS {
        return Ok(Attempt::RateLimited {
            retry_after: parse_retry_after(response.headers().get(RETRY_AFTER)),
        });
    }

    if !status.is_success() {
        let message = response.text().await.unwrap_or_default();
        tracing::warn!("HTTP {} from {}", status.as_u16(), path);
        return Err(AuditError::Fetch {
            endpoint: path.to_string(),
            status: status.as_u16(),
            message,
        });
    }

    Ok(Attempt::Done(response.json::<T>().await?))
}

/// Single dot1xGlobalConfig request. Everything except a 429 resolves to a
/// final answer; failures mean "not enabled".
async fn global_status_attempt(
    transport: &Transport,
    url: &str,
    token: &str,
    device_id: &str,
) -> Result<Attempt<bool>> {
    let response = match transport.get(url, token).await {
        Ok(response) => response,
        Err(e) => {
            tracing::warn!(
                "Request error during dot1xGlobal check for device {}: {}",
                device_id,
                e
            );
            return Ok(Attempt::Done(false));
        }
    };
    let status = response.status();

    if status == StatusCode::TOO_MANY_REQUESTS {
        return Ok(Attempt::RateLimited {
            retry_after: parse_retry_after(response.headers().get(RETRY_AFTER)),
        });
    }

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        tracing::warn!(
            "Error HTTP {} during dot1xGlobal check for device {}: {}",
            status.as_u16(),
            device_id,
            body
        );
        return Ok(Attempt::Done(false));
    }

    match response.json::<Envelope<GlobalConfigResponse>>().await {
        Ok(envelope) => Ok(Attempt::Done(envelope.into_inner().is_enabled())),
        Err(e) => {
            tracing::warn!(
                "Unreadable dot1xGlobal response for device {}: {}",
                device_id,
                e
            );
            Ok(Attempt::Done(false))
        }
    }
}

#[async_trait]
impl ControllerApi for ControllerClient {
    async fn authenticate(&self, credentials: &Credentials) -> Result<Session> {
        self.transport.limiter.until_ready().await;
        let response = self
            .transport
            .http
            .post(self.url(AUTH_PATH))
            .basic_auth(
                &credentials.username,
                Some(credentials.password.expose_secret()),
            )
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(AuditError::Auth {
                status: status.as_u16(),
                message,
            });
        }

        let body: TokenResponse = response.json().await?;
        Ok(Session::new(body.token))
    }

    async fn list_devices(&self, session: &Session) -> Result<Vec<Device>> {
        let envelope: Envelope<Vec<RawDevice>> = self.get_once(session, DEVICES_PATH).await?;
        Ok(envelope
            .into_inner()
            .into_iter()
            .enumerate()
            .filter_map(|(idx, raw)| {
                let hostname = raw.hostname.clone();
                let device = raw.normalize();
                if device.is_none() {
                    tracing::warn!(
                        "Ignoring inventory entry {} ({}) without a device id",
                        idx,
                        hostname.as_deref().unwrap_or(MISSING_HOSTNAME)
                    );
                }
                device
            })
            .collect())
    }

    async fn global_dot1x_enabled(&self, session: &Session, device_id: &str) -> bool {
        let path = global_config_path(device_id);
        let url = self.url(&path);
        let transport = &self.transport;
        let url = url.as_str();
        let token = session.token();

        let outcome = self
            .retry
            .run(device_id, move |attempt| {
                tracing::debug!("GET {} (attempt {})", url, attempt);
                global_status_attempt(transport, url, token, device_id)
            })
            .await;

        match outcome {
            Ok(RetryOutcome::Resolved { value, .. }) => value,
            Ok(RetryOutcome::Exhausted { .. }) => {
                tracing::warn!("Max retries exceeded for device {}. Skipping.", device_id);
                false
            }
            Err(e) => {
                tracing::warn!("dot1xGlobal check failed for device {}: {}", device_id, e);
                false
            }
        }
    }

    async fn interfaces(&self, session: &Session, device_id: &str) -> Result<Vec<Interface>> {
        let envelope: Envelope<Vec<RawInterface>> =
            self.get_json(session, &interfaces_path(device_id)).await?;
        Ok(envelope
            .into_inner()
            .into_iter()
            .filter_map(RawInterface::normalize)
            .collect())
    }

    async fn dot1x_interface_names(
        &self,
        session: &Session,
        device_id: &str,
    ) -> Result<HashSet<String>> {
        let envelope: Envelope<InterfaceConfigResponse> = self
            .get_json(session, &interface_config_path(device_id))
            .await?;
        Ok(envelope.into_inner().dot1x_names())
    }
}
