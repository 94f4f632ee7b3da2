use anyhow::Context;
use clap::Parser;
use dot1x_audit::adapters::controller::{
    global_config_path, interface_config_path, interfaces_path, AUTH_PATH, DEVICES_PATH,
};
use dot1x_audit::config::toml_config::TomlConfig;
use dot1x_audit::core::ConfigProvider;
use dot1x_audit::domain::ports::TlsMode;
use dot1x_audit::utils::{logger, validation::Validate};
use dot1x_audit::{AuditEngine, Dot1xAuditPipeline, LocalStorage};

#[derive(Parser)]
#[command(name = "toml-audit")]
#[command(about = "802.1x access-port audit driven by a TOML configuration file")]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "dot1x-audit.toml")]
    config: String,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Override monitoring setting from config
    #[arg(long)]
    monitor: Option<bool>,

    /// Show the resolved endpoints and settings without contacting the controller
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // 載入 TOML 配置
    let config = TomlConfig::from_file(&args.config)
        .with_context(|| format!("failed to load config file '{}'", args.config))?;

    logger::init_logger(args.verbose, config.json_logs());

    tracing::info!("🚀 Starting TOML-based dot1x audit");
    tracing::info!("📁 Configuration loaded from: {}", args.config);

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(e.exit_code());
    }

    display_config_summary(&config, &args);

    if args.dry_run {
        tracing::info!("🔍 DRY RUN MODE - no requests will be sent");
        perform_dry_run(&config);
        return Ok(());
    }

    let monitor_enabled = args.monitor.unwrap_or_else(|| config.monitoring_enabled());
    if monitor_enabled {
        tracing::info!("🔍 System monitoring enabled");
    }

    let storage = LocalStorage::new(config.output_path().to_string());
    let pipeline = Dot1xAuditPipeline::from_config(storage, config)?;
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
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 {}", e.recovery_suggestion());
            std::process::exit(e.exit_code());
        }
    }

    Ok(())
}

fn display_config_summary(config: &TomlConfig, args: &Args) {
    println!("📋 Configuration Summary:");
    println!("  Controller: {}", config.base_url());
    println!("  Username: {}", config.controller.username);
    println!("  Password: [REDACTED]");
    println!("  TLS: {}", describe_tls(&config.tls_mode()));
    println!("  Max Retries: {}", config.max_retries());
    println!(
        "  Default Retry-After: {}s",
        config.default_retry_after().as_secs()
    );
    println!("  Requests/second: {}", config.requests_per_second());
    println!("  Concurrency: {}", config.concurrency());
    println!("  On Device Failure: {:?}", config.failure_policy());
    println!("  Output: {}/{}", config.output_path(), config.report_name());

    if args.dry_run {
        println!("  🔍 DRY RUN MODE ENABLED");
    }

    println!();
}

fn describe_tls(mode: &TlsMode) -> String {
    match mode {
        TlsMode::Verify => "verify (system roots)".to_string(),
        TlsMode::CustomCa(path) => format!("verify with CA {}", path.display()),
        TlsMode::AcceptInvalid => "certificate verification DISABLED".to_string(),
    }
}

fn perform_dry_run(config: &TomlConfig) {
    let base = config.base_url();
    let base = base.trim_end_matches('/');

    println!("🔍 Dry Run Analysis:");
    println!();
    println!("📡 Requests that would be issued:");
    println!("  POST {}{}", base, AUTH_PATH);
    println!("  GET  {}{}", base, DEVICES_PATH);
    println!("  Per switch (<id>):");
    println!("    GET {}{}", base, global_config_path("<id>"));
    println!("    GET {}{}", base, interfaces_path("<id>"));
    println!("    GET {}{}", base, interface_config_path("<id>"));

    println!();
    println!("💾 Output Configuration:");
    println!("  Archive: {}/{}", config.output_path(), config.report_name());

    println!();
    println!("✅ Dry run completed - configuration looks valid");
}
