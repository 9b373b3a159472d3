//! `validate` command implementation.

use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;
use crate::error::{CliError, Result};

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    belt_speed: f64,
    camera_count: usize,
    transition_count: usize,
    route_count: usize,
    notifier_count: usize,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        Err(CliError::ValidationFailed(
            result.error.unwrap_or_else(|| result.config_path),
        ))
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    // Check file exists
    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    // Try to load and validate
    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(blueprint) => {
            let warnings = collect_warnings(&blueprint);

            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(ConfigSummary {
                    version: format!("{:?}", blueprint.version),
                    belt_speed: blueprint.line.belt_speed,
                    camera_count: blueprint.cameras.len(),
                    transition_count: blueprint.transitions.len(),
                    route_count: blueprint.routes.len(),
                    notifier_count: blueprint.notifiers.len(),
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(blueprint: &contracts::LineBlueprint) -> Vec<String> {
    let mut warnings = Vec::new();

    if blueprint.notifiers.is_empty() {
        warnings.push("No notifiers configured - tracking events will be dropped".to_string());
    }

    if blueprint.scanner.is_none() {
        warnings.push(
            "No scanner configured - no master records will be created".to_string(),
        );
    }

    if blueprint.local_camera().is_none() {
        warnings.push(
            "No local-transport camera configured - thumbnails disabled".to_string(),
        );
    }

    // The last camera needs an end-of-line band to close out full-length routes
    if let Some(last) = blueprint.cameras_in_order().last() {
        if last.eol_y_rate.is_none() {
            warnings.push(format!(
                "Camera '{}' is last on the line but has no end-of-line band",
                last.id
            ));
        }
    }

    for route in &blueprint.routes {
        if route.pickup_stages.is_empty() {
            warnings.push(format!(
                "Route '{}' has no pickup stages - parcels can only disappear",
                route.code
            ));
        }
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Belt speed: {} m/s", summary.belt_speed);
            println!("  Cameras: {}", summary.camera_count);
            println!("  Transitions: {}", summary.transition_count);
            println!("  Routes: {}", summary.route_count);
            println!("  Notifiers: {}", summary.notifier_count);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}
