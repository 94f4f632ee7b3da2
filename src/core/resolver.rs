use crate::domain::model::{Device, Interface, ReportRow};
use crate::domain::ports::{ControllerApi, Session};
use crate::utils::error::Result;
use std::collections::HashSet;
use std::sync::Arc;

/// Joins the interface inventory with the 802.1x-configured names.
/// Only access interfaces produce rows; duplicates are kept.
pub fn correlate(
    device: &Device,
    interfaces: &[Interface],
    configured: &HashSet<String>,
) -> Vec<ReportRow> {
    interfaces
        .iter()
        .filter(|iface| iface.is_access())
        .map(|iface| ReportRow {
            device_name: device.display_name().to_string(),
            device_id: device.id.clone(),
            interface_name: iface.name.clone(),
            configured: configured.contains(&iface.name),
        })
        .collect()
}

/// Works out the 802.1x rows for one switch.
pub struct Dot1xResolver<A: ControllerApi> {
    api: Arc<A>,
}

impl<A: ControllerApi> Clone for Dot1xResolver<A> {
    fn clone(&self) -> Self {
        Self {
            api: Arc::clone(&self.api),
        }
    }
}

impl<A: ControllerApi> Dot1xResolver<A> {
    pub fn new(api: Arc<A>) -> Self {
        Self { api }
    }

    pub async fn resolve(&self, session: &Session, device: &Device) -> Result<Vec<ReportRow>> {
        let hostname = device.display_name();

        if !self.api.global_dot1x_enabled(session, &device.id).await {
            tracing::info!(
                "Dot1x is NOT globally enabled on {}. Skipping interface check.",
                hostname
            );
            return Ok(Vec::new());
        }

        tracing::info!(
            "Dot1x is globally enabled on {}. Gathering interface data...",
            hostname
        );

        let (interfaces, configured) = tokio::join!(
            self.api.interfaces(session, &device.id),
            self.api.dot1x_interface_names(session, &device.id)
        );
        let interfaces = interfaces?;
        let configured = configured?;

        tracing::debug!(
            "{}: {} interfaces, {} with DOT1X_INTERFACE config",
            hostname,
            interfaces.len(),
            configured.len()
        );

        let rows = correlate(device, &interfaces, &configured);
        tracing::info!("{}: {} access interfaces recorded", hostname, rows.len());
        Ok(rows)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::domain::ports::Credentials;
    use crate::utils::error::AuditError;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Clone, Default)]
    pub(crate) struct FakeDevice {
        pub(crate) global: bool,
        pub(crate) interfaces: Vec<Interface>,
        pub(crate) configured: Vec<&'static str>,
        pub(crate) fail_interfaces: bool,
    }

    /// Scripted controller that counts every call.
    #[derive(Default)]
    pub(crate) struct FakeController {
        pub(crate) devices: Vec<Device>,
        pub(crate) per_device: HashMap<String, FakeDevice>,
        pub(crate) global_calls: AtomicUsize,
        pub(crate) interface_calls: AtomicUsize,
        pub(crate) config_calls: AtomicUsize,
    }

    impl FakeController {
        pub(crate) fn with_device(mut self, device: Device, fake: FakeDevice) -> Self {
            self.per_device.insert(device.id.clone(), fake);
            self.devices.push(device);
            self
        }

        pub(crate) fn interface_level_calls(&self) -> usize {
            self.interface_calls.load(Ordering::SeqCst) + self.config_calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ControllerApi for FakeController {
        async fn authenticate(&self, _credentials: &Credentials) -> Result<Session> {
            Ok(Session::new("fake-token"))
        }

        async fn list_devices(&self, _session: &Session) -> Result<Vec<Device>> {
            Ok(self.devices.clone())
        }

        async fn global_dot1x_enabled(&self, _session: &Session, device_id: &str) -> bool {
            self.global_calls.fetch_add(1, Ordering::SeqCst);
            self.per_device.get(device_id).is_some_and(|d| d.global)
        }

        async fn interfaces(&self, _session: &Session, device_id: &str) -> Result<Vec<Interface>> {
            self.interface_calls.fetch_add(1, Ordering::SeqCst);
            let fake = self.per_device.get(device_id).cloned().unwrap_or_default();
            if fake.fail_interfaces {
                return Err(AuditError::Fetch {
                    endpoint: format!("/intent/api/v1/interface/network-device/{}", device_id),
                    status: 500,
                    message: "boom".to_string(),
                });
            }
            Ok(fake.interfaces)
        }

        async fn dot1x_interface_names(
            &self,
            _session: &Session,
            device_id: &str,
        ) -> Result<HashSet<String>> {
            self.config_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self
                .per_device
                .get(device_id)
                .map(|d| d.configured.iter().map(|s| s.to_string()).collect())
                .unwrap_or_default())
        }
    }

    fn switch() -> Device {
        Device::new("dev-1", Some("access-sw-01"), Some("Cisco Catalyst 9300 Switch"))
    }

    #[tokio::test]
    async fn test_disabled_device_makes_no_interface_calls() {
        let api = Arc::new(FakeController::default().with_device(
            switch(),
            FakeDevice {
                global: false,
                interfaces: vec![Interface::new("Gi1/0/1", Some("access"))],
                configured: vec!["Gi1/0/1"],
                ..Default::default()
            },
        ));
        let resolver = Dot1xResolver::new(api.clone());

        let rows = resolver.resolve(&Session::new("t"), &switch()).await.unwrap();

        assert!(rows.is_empty());
        assert_eq!(api.global_calls.load(Ordering::SeqCst), 1);
        assert_eq!(api.interface_level_calls(), 0);
    }

    #[tokio::test]
    async fn test_configured_access_interface() {
        let api = Arc::new(FakeController::default().with_device(
            switch(),
            FakeDevice {
                global: true,
                interfaces: vec![Interface::new("Gi1/0/1", Some("access"))],
                configured: vec!["Gi1/0/1"],
                ..Default::default()
            },
        ));
        let resolver = Dot1xResolver::new(api.clone());

        let rows = resolver.resolve(&Session::new("t"), &switch()).await.unwrap();

        assert_eq!(
            rows,
            vec![ReportRow {
                device_name: "access-sw-01".to_string(),
                device_id: "dev-1".to_string(),
                interface_name: "Gi1/0/1".to_string(),
                configured: true,
            }]
        );
        assert_eq!(api.interface_level_calls(), 2);
    }

    #[tokio::test]
    async fn test_interface_fetch_error_propagates() {
        let api = Arc::new(FakeController::default().with_device(
            switch(),
            FakeDevice {
                global: true,
                fail_interfaces: true,
                ..Default::default()
            },
        ));
        let resolver = Dot1xResolver::new(api);

        let result = resolver.resolve(&Session::new("t"), &switch()).await;
        assert!(matches!(result, Err(AuditError::Fetch { status: 500, .. })));
    }

    #[test]
    fn test_correlate_is_set_membership() {
        let device = switch();
        let interfaces = vec![
            Interface::new("Gi1/0/1", Some("access")),
            Interface::new("Gi1/0/2", Some("Access")),
            Interface::new("Gi1/0/3", Some("trunk")),
            Interface::new("Gi1/0/4", None),
            Interface::new("gi1/0/5", Some("access")),
        ];
        let configured: HashSet<String> = ["Gi1/0/1", "Gi1/0/3", "Gi1/0/5"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        let rows = correlate(&device, &interfaces, &configured);
        let flags: Vec<(&str, bool)> = rows
            .iter()
            .map(|r| (r.interface_name.as_str(), r.configured))
            .collect();

        assert_eq!(
            flags,
            vec![("Gi1/0/1", true), ("Gi1/0/2", false), ("gi1/0/5", false)]
        );
    }

    #[test]
    fn test_correlate_keeps_duplicates_and_missing_hostname() {
        let device = Device::new("dev-9", None, Some("Switch"));
        let interfaces = vec![
            Interface::new("Gi1/0/1", Some("access")),
            Interface::new("Gi1/0/1", Some("access")),
        ];

        let rows = correlate(&device, &interfaces, &HashSet::new());
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.device_name == "N/A" && !r.configured));
    }
}
