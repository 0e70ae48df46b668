//! rolloutd - Entry Point
//!
//! One-shot mode (default) performs a single rollout and exits 0 on success,
//! 1 on failure. Serve mode (`--serve`) runs the webhook receiver that
//! triggers rollout subprocesses on authenticated POSTs.

use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;

use rolloutd::app::options::AppOptions;
use rolloutd::app::run::{run_rollout, run_server};
use rolloutd::filesys::file::File;
use rolloutd::logs::{init_logging, LogOptions};
use rolloutd::models::rollout::RolloutOutcome;
use rolloutd::storage::layout::StorageLayout;
use rolloutd::storage::settings::Settings;
use rolloutd::utils::version_info;

use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();
    let mut cli_args: HashMap<String, String> = HashMap::new();

    for arg in args.iter().skip(1) {
        if let Some((key, value)) = arg.split_once('=') {
            // Handle --key=value format
            let clean_key = key.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), value.to_string());
        } else if arg.starts_with("--") {
            // Handle standalone flags like --version
            let clean_key = arg.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), "true".to_string());
        }
    }

    // Print version and exit
    let version = version_info();
    if cli_args.contains_key("version") {
        println!("{}", serde_json::to_string_pretty(&version).unwrap());
        return ExitCode::SUCCESS;
    }

    // Resolve storage layout and the settings file
    let layout = match cli_args.get("base-dir") {
        Some(dir) => StorageLayout::new(dir),
        None => StorageLayout::default(),
    };
    let settings_path = cli_args.get("settings").map(PathBuf::from);
    let settings_file = match &settings_path {
        Some(path) => File::new(path),
        None => layout.settings_file(),
    };

    // Missing settings are fine (defaults apply); unreadable settings are not
    let settings = if settings_file.exists().await {
        match settings_file.read_json::<Settings>().await {
            Ok(settings) => settings,
            Err(e) => {
                eprintln!(
                    "Unable to read settings file {}: {}",
                    settings_file.path().display(),
                    e
                );
                return ExitCode::FAILURE;
            }
        }
    } else {
        Settings::default()
    };

    // Initialize logging
    let log_options = LogOptions {
        log_level: settings.log_level.clone(),
        log_dir: Some(layout.logs_dir().path().to_path_buf()),
        json_format: settings.json_logs,
        ..Default::default()
    };
    let _log_guard = match init_logging(log_options) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            None
        }
    };

    let options = AppOptions::from_settings(&settings, layout, settings_path);

    if cli_args.contains_key("serve") {
        info!("Running rolloutd webhook receiver");
        match run_server(&options, await_shutdown_signal()).await {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                error!("Webhook receiver failed: {e}");
                ExitCode::FAILURE
            }
        }
    } else {
        info!(
            "Running one-shot rollout of {} into container '{}'",
            options.request.image_ref(),
            options.request.container_name
        );
        match run_rollout(&options).await {
            Ok(report) => {
                match report.outcome {
                    RolloutOutcome::Succeeded => info!("Rollout {} succeeded", report.run_id),
                    RolloutOutcome::Failed => error!(
                        "Rollout {} failed: {}",
                        report.run_id,
                        report.reason.as_deref().unwrap_or("unknown")
                    ),
                }
                ExitCode::from(report.exit_code() as u8)
            }
            Err(e) => {
                error!("Rollout could not run: {e}");
                ExitCode::FAILURE
            }
        }
    }
}

async fn await_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate()).unwrap();
        let mut sigint = signal(SignalKind::interrupt()).unwrap();

        tokio::select! {
            _ = sigterm.recv() => {
                info!("SIGTERM received, shutting down...");
            }
            _ = sigint.recv() => {
                info!("SIGINT received, shutting down...");
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Ctrl+C received, shutting down...");
            }
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await.expect("Failed to listen for Ctrl+C");
        info!("Ctrl+C received, shutting down...");
    }
}
