pub mod aggregate;
pub mod audit;
pub mod engine;
pub mod filter;
pub mod resolver;
pub mod retry;

pub use crate::domain::model::{AuditOutcome, AuditReport, Device, Interface, ReportRow};
pub use crate::domain::ports::{ConfigProvider, ControllerApi, Pipeline, Storage};
pub use crate::utils::error::Result;
