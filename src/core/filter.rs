use crate::domain::model::Device;

/// Keeps switch-class devices in inventory order. Devices without a
/// string type classifier are dropped.
pub fn filter_switches(devices: Vec<Device>) -> Vec<Device> {
    devices.into_iter().filter(Device::is_switch).collect()
}
