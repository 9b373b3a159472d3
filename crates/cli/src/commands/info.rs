//! `info` command implementation.

use serde::Serialize;
use tracing::info;

use crate::cli::InfoArgs;
use crate::error::{CliError, Result};

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    line: LineInfo,
    cameras: Vec<CameraInfo>,
    transitions: Vec<TransitionInfo>,
    routes: Vec<RouteInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    scanner: Option<ScannerInfo>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    notifiers: Vec<NotifierInfo>,
}

#[derive(Serialize)]
struct LineInfo {
    belt_speed: f64,
    default_total_distance: f64,
    window_s: f64,
    max_wait_wall_s: f64,
}

#[derive(Serialize)]
struct CameraInfo {
    id: String,
    stage: String,
    transport: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    roi_y_rate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    eol_y_rate: Option<f64>,
}

#[derive(Serialize)]
struct TransitionInfo {
    from: String,
    to: String,
    avg_travel_s: f64,
    margin_s: f64,
}

#[derive(Serialize)]
struct RouteInfo {
    code: String,
    stages: Vec<String>,
    pickup_stages: Vec<String>,
    total_distance: f64,
}

#[derive(Serialize)]
struct ScannerInfo {
    host: String,
    port: u16,
}

#[derive(Serialize)]
struct NotifierInfo {
    name: String,
    notifier_type: String,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    if !args.config.exists() {
        return Err(CliError::ConfigNotFound(args.config.clone()));
    }

    let blueprint = config_loader::ConfigLoader::load_from_path(&args.config)?;

    if args.json {
        let info = build_config_info(&blueprint, args);
        let json = serde_json::to_string_pretty(&info)?;
        println!("{}", json);
    } else {
        print_config_info(&blueprint, args);
    }

    Ok(())
}

fn build_config_info(blueprint: &contracts::LineBlueprint, args: &InfoArgs) -> ConfigInfo {
    let cameras = blueprint
        .cameras_in_order()
        .iter()
        .map(|c| CameraInfo {
            id: c.id.clone(),
            stage: c.stage.to_string(),
            transport: format!("{:?}", c.transport),
            roi_y_rate: if args.cameras { Some(c.roi_y_rate) } else { None },
            eol_y_rate: if args.cameras { c.eol_y_rate } else { None },
        })
        .collect();

    let transitions = blueprint
        .transitions
        .iter()
        .map(|t| TransitionInfo {
            from: t.from.to_string(),
            to: t.to.to_string(),
            avg_travel_s: t.avg_travel_s,
            margin_s: t.margin_s,
        })
        .collect();

    let routes = blueprint
        .routes
        .iter()
        .map(|r| RouteInfo {
            code: r.code.clone(),
            stages: r.stages.iter().map(|s| s.to_string()).collect(),
            pickup_stages: r.pickup_stages.iter().map(|s| s.to_string()).collect(),
            total_distance: r.total_distance,
        })
        .collect();

    let notifiers = if args.notifiers {
        blueprint
            .notifiers
            .iter()
            .map(|n| NotifierInfo {
                name: n.name.clone(),
                notifier_type: format!("{:?}", n.notifier_type),
            })
            .collect()
    } else {
        Vec::new()
    };

    ConfigInfo {
        version: format!("{:?}", blueprint.version),
        line: LineInfo {
            belt_speed: blueprint.line.belt_speed,
            default_total_distance: blueprint.line.default_total_distance,
            window_s: blueprint.sync.window_s,
            max_wait_wall_s: blueprint.sync.max_wait_wall_s,
        },
        cameras,
        transitions,
        routes,
        scanner: blueprint.scanner.as_ref().map(|s| ScannerInfo {
            host: s.host.clone(),
            port: s.port,
        }),
        notifiers,
    }
}

fn print_config_info(blueprint: &contracts::LineBlueprint, args: &InfoArgs) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║               Parcel Track Configuration                     ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    // Line info
    println!("📍 Line");
    println!("   ├─ Version: {:?}", blueprint.version);
    println!("   ├─ Belt speed: {} m/s", blueprint.line.belt_speed);
    println!(
        "   ├─ Default total distance: {} m",
        blueprint.line.default_total_distance
    );
    println!(
        "   └─ Window: {}s (max wait {}s)",
        blueprint.sync.window_s, blueprint.sync.max_wait_wall_s
    );

    // Cameras
    let cameras = blueprint.cameras_in_order();
    println!("\n📷 Cameras ({})", cameras.len());
    for (i, camera) in cameras.iter().enumerate() {
        let is_last = i == cameras.len() - 1;
        let prefix = if is_last { "└─" } else { "├─" };
        let child_prefix = if is_last { "   " } else { "│  " };

        println!(
            "   {} {} at {} ({:?})",
            prefix, camera.id, camera.stage, camera.transport
        );

        if args.cameras {
            println!(
                "   {}  ├─ primary line: y_rate={}, margin_rate={}",
                child_prefix, camera.roi_y_rate, camera.roi_margin_rate
            );
            match camera.eol_y_rate {
                Some(rate) => println!("   {}  └─ eol line: y_rate={}", child_prefix, rate),
                None => println!("   {}  └─ eol line: (none)", child_prefix),
            }
        }
    }

    // Transitions
    println!("\n⏱  Transitions ({})", blueprint.transitions.len());
    for (i, transition) in blueprint.transitions.iter().enumerate() {
        let is_last = i == blueprint.transitions.len() - 1;
        let prefix = if is_last { "└─" } else { "├─" };
        println!(
            "   {} {} → {}: {}s ± {}s",
            prefix, transition.from, transition.to, transition.avg_travel_s, transition.margin_s
        );
    }

    // Routes
    println!("\n🧭 Routes ({})", blueprint.routes.len());
    for (i, route) in blueprint.routes.iter().enumerate() {
        let is_last = i == blueprint.routes.len() - 1;
        let prefix = if is_last { "└─" } else { "├─" };
        let stages: Vec<String> = route.stages.iter().map(|s| s.to_string()).collect();
        let pickups: Vec<String> = route.pickup_stages.iter().map(|s| s.to_string()).collect();
        println!(
            "   {} {}: {} (pickup: {}, {} m)",
            prefix,
            route.code,
            stages.join(" → "),
            pickups.join(", "),
            route.total_distance
        );
    }

    // Scanner
    match &blueprint.scanner {
        Some(scanner) => {
            println!("\n🔍 Scanner: {}:{}", scanner.host, scanner.port);
        }
        None => {
            println!("\n🔍 Scanner: (none configured)");
        }
    }

    // Notifiers
    if !blueprint.notifiers.is_empty() {
        println!("\n📤 Notifiers ({})", blueprint.notifiers.len());
        for (i, notifier) in blueprint.notifiers.iter().enumerate() {
            let is_last = i == blueprint.notifiers.len() - 1;
            let prefix = if is_last { "└─" } else { "├─" };
            println!(
                "   {} {} ({:?})",
                prefix, notifier.name, notifier.notifier_type
            );
        }
    }

    println!();
}
