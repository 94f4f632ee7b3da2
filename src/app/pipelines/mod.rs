pub mod dot1x_pipeline;

pub use dot1x_pipeline::Dot1xAuditPipeline;
