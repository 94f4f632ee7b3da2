// Adapters layer: concrete implementations for external systems.

pub mod controller;
pub mod storage;

pub use controller::ControllerClient;
pub use storage::LocalStorage;
