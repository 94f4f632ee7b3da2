use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// Interface names the controller uses when it has nothing better.
pub const UNKNOWN_INTERFACE: &str = "Unknown";
pub const MISSING_HOSTNAME: &str = "N/A";
pub const SWITCH_MARKER: &str = "Switch";
pub const ACCESS_MODE: &str = "access";
pub const DOT1X_INTERFACE_CONFIG_TYPE: &str = "DOT1X_INTERFACE";

/// Accepts any JSON value and keeps it only when it is a string.
pub(crate) fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        _ => None,
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Device {
    pub id: String,
    pub hostname: Option<String>,
    #[serde(rename = "type")]
    pub device_type: Option<String>,
}

/// Inventory entry as the controller sends it. Every field is optional so a
/// single malformed entry cannot fail the whole inventory decode.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawDevice {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub hostname: Option<String>,
    #[serde(rename = "type", default, deserialize_with = "lenient_string")]
    pub device_type: Option<String>,
}

impl RawDevice {
    /// Returns `None` when the entry has no usable id.
    pub fn normalize(self) -> Option<Device> {
        let id = self.id.filter(|id| !id.trim().is_empty())?;
        Some(Device {
            id,
            hostname: self.hostname,
            device_type: self.device_type,
        })
    }
}

impl Device {
    pub fn new(id: impl Into<String>, hostname: Option<&str>, device_type: Option<&str>) -> Self {
        Self {
            id: id.into(),
            hostname: hostname.map(str::to_string),
            device_type: device_type.map(str::to_string),
        }
    }

    pub fn display_name(&self) -> &str {
        self.hostname.as_deref().unwrap_or(MISSING_HOSTNAME)
    }

    pub fn is_switch(&self) -> bool {
        self.device_type
            .as_deref()
            .is_some_and(|t| t.contains(SWITCH_MARKER))
    }
}

/// One interface after field-name normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interface {
    pub name: String,
    pub mode: Option<String>,
}

impl Interface {
    pub fn new(name: impl Into<String>, mode: Option<&str>) -> Self {
        Self {
            name: name.into(),
            mode: mode.map(str::to_string),
        }
    }

    pub fn is_access(&self) -> bool {
        self.mode
            .as_deref()
            .is_some_and(|m| m.eq_ignore_ascii_case(ACCESS_MODE))
    }
}

/// Interface record as the controller sends it. Depending on the API
/// version the name and mode arrive under different keys.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawInterface {
    #[serde(default, deserialize_with = "lenient_string")]
    pub port_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub interface_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub port_mode: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub interface_mode: Option<String>,
}

impl RawInterface {
    /// Maps either response shape onto [`Interface`]. Returns `None` when
    /// no usable name is present.
    pub fn normalize(self) -> Option<Interface> {
        let usable_name = |n: &String| !n.is_empty() && n != UNKNOWN_INTERFACE;
        let name = self
            .port_name
            .filter(usable_name)
            .or_else(|| self.interface_name.filter(usable_name))?;

        let mode = self
            .port_mode
            .filter(|m| !m.is_empty())
            .or_else(|| self.interface_mode.filter(|m| !m.is_empty()));

        Some(Interface { name, mode })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Dot1xConfigured {
    Yes,
    No,
}

impl From<bool> for Dot1xConfigured {
    fn from(configured: bool) -> Self {
        if configured {
            Dot1xConfigured::Yes
        } else {
            Dot1xConfigured::No
        }
    }
}

impl fmt::Display for Dot1xConfigured {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dot1xConfigured::Yes => f.write_str("Yes"),
            Dot1xConfigured::No => f.write_str("No"),
        }
    }
}

fn yes_no<S: Serializer>(configured: &bool, serializer: S) -> Result<S::Ok, S::Error> {
    Dot1xConfigured::from(*configured).serialize(serializer)
}

/// One access interface on a switch with 802.1x globally enabled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportRow {
    #[serde(rename = "Device Name")]
    pub device_name: String,
    #[serde(rename = "Device ID")]
    pub device_id: String,
    #[serde(rename = "Interface Name")]
    pub interface_name: String,
    #[serde(rename = "Dot1x Configured", serialize_with = "yes_no")]
    pub configured: bool,
}

impl ReportRow {
    pub fn label(&self) -> Dot1xConfigured {
        Dot1xConfigured::from(self.configured)
    }
}

/// Row counts keyed by Yes/No. A key with no rows is absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SummaryCount {
    counts: BTreeMap<Dot1xConfigured, usize>,
}

impl SummaryCount {
    pub fn increment(&mut self, label: Dot1xConfigured) {
        *self.counts.entry(label).or_insert(0) += 1;
    }

    pub fn get(&self, label: Dot1xConfigured) -> Option<usize> {
        self.counts.get(&label).copied()
    }

    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Largest count first; ties keep Yes before No.
    pub fn by_count(&self) -> Vec<(Dot1xConfigured, usize)> {
        let mut entries: Vec<_> = self.counts.iter().map(|(k, v)| (*k, *v)).collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        entries
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedDevice {
    #[serde(rename = "Device Name")]
    pub device_name: String,
    #[serde(rename = "Device ID")]
    pub device_id: String,
    #[serde(rename = "Reason")]
    pub reason: String,
}

/// Everything gathered from the controller in one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditOutcome {
    pub switches_audited: usize,
    pub rows: Vec<ReportRow>,
    pub skipped: Vec<SkippedDevice>,
}

#[derive(Debug, Clone)]
pub struct AuditReport {
    pub generated_at: DateTime<Utc>,
    pub switches_audited: usize,
    pub rows: Vec<ReportRow>,
    pub summary: SummaryCount,
    pub skipped: Vec<SkippedDevice>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(value: serde_json::Value) -> RawInterface {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_normalize_prefers_port_fields() {
        let iface = raw(json!({
            "portName": "Gi1/0/1",
            "interfaceName": "GigabitEthernet1/0/1",
            "portMode": "access",
            "interfaceMode": "trunk"
        }))
        .normalize()
        .unwrap();

        assert_eq!(iface.name, "Gi1/0/1");
        assert_eq!(iface.mode.as_deref(), Some("access"));
    }

    #[test]
    fn test_normalize_falls_back_to_interface_fields() {
        let iface = raw(json!({"interfaceName": "Gi1/0/2", "interfaceMode": "Access"}))
            .normalize()
            .unwrap();

        assert_eq!(iface.name, "Gi1/0/2");
        assert!(iface.is_access());
    }

    #[test]
    fn test_normalize_drops_nameless_interfaces() {
        assert!(raw(json!({"portMode": "access"})).normalize().is_none());
        assert!(raw(json!({"portName": null, "portMode": "access"}))
            .normalize()
            .is_none());
        assert!(raw(json!({"portName": "Unknown"})).normalize().is_none());
        assert!(raw(json!({"portName": 42, "interfaceName": ""}))
            .normalize()
            .is_none());
    }

    #[test]
    fn test_empty_port_mode_falls_back() {
        let iface = raw(json!({"portName": "Gi1/0/3", "portMode": "", "interfaceMode": "access"}))
            .normalize()
            .unwrap();
        assert!(iface.is_access());
    }

    #[test]
    fn test_access_mode_is_case_insensitive_and_exact() {
        assert!(Interface::new("Gi1/0/1", Some("ACCESS")).is_access());
        assert!(Interface::new("Gi1/0/1", Some("access")).is_access());
        assert!(!Interface::new("Gi1/0/1", Some("Trunk")).is_access());
        assert!(!Interface::new("Gi1/0/1", Some("access ")).is_access());
        assert!(!Interface::new("Gi1/0/1", None).is_access());
    }

    #[test]
    fn test_device_deserialization_tolerates_odd_types() {
        let device = serde_json::from_value::<RawDevice>(json!({
            "id": "abc",
            "hostname": null,
            "type": 7
        }))
        .unwrap()
        .normalize()
        .unwrap();

        assert_eq!(device.display_name(), "N/A");
        assert!(device.device_type.is_none());
        assert!(!device.is_switch());
    }

    #[test]
    fn test_device_without_id_is_dropped() {
        let raw = |value| serde_json::from_value::<RawDevice>(value).unwrap();

        assert!(raw(json!({"hostname": "ap-unmanaged", "type": "Unified AP"}))
            .normalize()
            .is_none());
        assert!(raw(json!({"id": 42, "type": "Cisco Catalyst 9300 Switch"}))
            .normalize()
            .is_none());
        assert!(raw(json!({"id": " ", "type": "Switch"})).normalize().is_none());
        assert_eq!(
            raw(json!({"id": "d1", "type": "Switch"})).normalize(),
            Some(Device::new("d1", None, Some("Switch")))
        );
    }

    #[test]
    fn test_summary_orders_by_count() {
        let mut summary = SummaryCount::default();
        summary.increment(Dot1xConfigured::No);
        summary.increment(Dot1xConfigured::No);
        summary.increment(Dot1xConfigured::Yes);

        assert_eq!(
            summary.by_count(),
            vec![(Dot1xConfigured::No, 2), (Dot1xConfigured::Yes, 1)]
        );
        assert_eq!(summary.total(), 3);
        assert_eq!(
            serde_json::to_value(&summary).unwrap(),
            json!({"Yes": 1, "No": 2})
        );
    }
}
