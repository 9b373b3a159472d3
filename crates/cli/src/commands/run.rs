//! `run` command implementation.

use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::cli::RunArgs;
use crate::error::{CliError, Result};
use crate::pipeline::{Pipeline, PipelineConfig};

/// Execute the `run` command
pub async fn run_pipeline(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    if !args.config.exists() {
        return Err(CliError::ConfigNotFound(args.config.clone()));
    }

    let blueprint = config_loader::ConfigLoader::load_from_path(&args.config)?;

    info!(
        belt_speed = blueprint.line.belt_speed,
        cameras = blueprint.cameras.len(),
        routes = blueprint.routes.len(),
        notifiers = blueprint.notifiers.len(),
        "Configuration loaded"
    );

    // Dry run - just validate and exit
    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&blueprint);
        return Ok(());
    }

    // Build pipeline configuration
    let pipeline_config = PipelineConfig {
        blueprint,
        max_windows: if args.max_windows == 0 {
            None
        } else {
            Some(args.max_windows)
        },
        timeout: if args.timeout == 0 {
            None
        } else {
            Some(Duration::from_secs(args.timeout))
        },
        buffer_size: args.buffer_size,
        metrics_port: if args.metrics_port == 0 {
            None
        } else {
            Some(args.metrics_port)
        },
        mock_fps: args.mock_fps,
    };

    // Create and run pipeline
    let pipeline = Pipeline::new(pipeline_config);

    // Graceful shutdown: the pipeline drains its current window before
    // returning, so signal it instead of dropping the future.
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        wait_for_shutdown_signal().await;
        warn!("Received shutdown signal, stopping pipeline...");
        let _ = shutdown_tx.send(true);
    });

    info!("Starting pipeline...");

    match pipeline.run(shutdown_rx).await {
        Ok(stats) => {
            info!(
                windows = stats.windows_complete,
                forced_advances = stats.windows_forced,
                matches = stats.matches_ok,
                notifications = stats.notifications_sent,
                duration_secs = stats.duration.as_secs_f64(),
                "Pipeline completed"
            );

            // Print detailed statistics
            stats.print_summary();
        }
        Err(e) => {
            return Err(CliError::Pipeline(e.context("Pipeline execution failed")));
        }
    }

    info!("Parcel Track finished");
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM
async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Print configuration summary for dry-run mode
fn print_config_summary(blueprint: &contracts::LineBlueprint) {
    println!("\n=== Configuration Summary ===\n");
    println!("Line:");
    println!("  Belt speed: {} m/s", blueprint.line.belt_speed);
    println!(
        "  Default total distance: {} m",
        blueprint.line.default_total_distance
    );

    println!("\nCameras ({}):", blueprint.cameras.len());
    for camera in blueprint.cameras_in_order() {
        println!(
            "  - {} at {} ({:?})",
            camera.id, camera.stage, camera.transport
        );
    }

    println!("\nRoutes ({}):", blueprint.routes.len());
    for route in &blueprint.routes {
        println!(
            "  - {}: {} stages, {} m to pickup",
            route.code,
            route.stages.len(),
            route.total_distance
        );
    }

    match &blueprint.scanner {
        Some(scanner) => println!("\nScanner: {}:{}", scanner.host, scanner.port),
        None => println!("\nScanner: (none configured)"),
    }

    if !blueprint.notifiers.is_empty() {
        println!("\nNotifiers ({}):", blueprint.notifiers.len());
        for notifier in &blueprint.notifiers {
            println!("  - {} ({:?})", notifier.name, notifier.notifier_type);
        }
    }

    println!();
}
