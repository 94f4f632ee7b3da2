use clap::Parser;
use dot1x_audit::config::cli::LogFormat;
use dot1x_audit::core::ConfigProvider;
use dot1x_audit::utils::{logger, validation::Validate};
use dot1x_audit::{AuditEngine, CliConfig, Dot1xAuditPipeline, LocalStorage};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = CliConfig::parse();

    logger::init_logger(config.verbose, config.log_format == LogFormat::Json);

    tracing::info!("Starting dot1x-audit");
    if config.verbose {
        tracing::debug!("CLI config: {:?}", config);
    }

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(e.exit_code());
    }

    let monitor_enabled = config.monitor;
    let storage = LocalStorage::new(config.output_path().to_string());
    let pipeline = match Dot1xAuditPipeline::from_config(storage, config) {
        Ok(pipeline) => pipeline,
        Err(e) => {
            eprintln!("❌ {}", e.user_friendly_message());
            std::process::exit(e.exit_code());
        }
    };

    let engine = AuditEngine::new_with_monitoring(pipeline, monitor_enabled);

    match engine.run().await {
        Ok(Some(output_path)) => {
            println!("✅ Audit completed successfully!");
            println!("📁 Report saved to: {}", output_path);
        }
        Ok(None) => {
            println!("ℹ️ No access interfaces found on switches with Dot1x enabled; no report written.");
        }
        Err(e) => {
            tracing::error!(
                "❌ Audit failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 {}", e.recovery_suggestion());

            let exit_code = e.exit_code();
            if exit_code > 0 {
                std::process::exit(exit_code);
            }
        }
    }

    Ok(())
}
