//! Configuration validation
//!
//! Rules:
//! - camera ids unique, at most one camera per stage
//! - at most one local-transport camera
//! - belt_speed > 0, sync windows > 0
//! - geometry rates within [0, 1], forward_sign is +1/-1
//! - transitions go downstream with positive travel times
//! - route stages strictly downstream, starting at the scanner
//! - notifier required fields present

use std::collections::HashSet;

use contracts::{LineBlueprint, NotifierType, Stage, TrackError, Transport};

/// Validate a LineBlueprint
///
/// Returns the first error encountered, or Ok(()).
pub fn validate(blueprint: &LineBlueprint) -> Result<(), TrackError> {
    validate_line(blueprint)?;
    validate_sync(blueprint)?;
    validate_cameras(blueprint)?;
    validate_transitions(blueprint)?;
    validate_routes(blueprint)?;
    validate_notifiers(blueprint)?;
    Ok(())
}

fn validate_line(blueprint: &LineBlueprint) -> Result<(), TrackError> {
    if blueprint.line.belt_speed <= 0.0 {
        return Err(TrackError::config_validation(
            "line.belt_speed",
            format!("belt_speed must be > 0, got {}", blueprint.line.belt_speed),
        ));
    }
    if blueprint.line.default_total_distance <= 0.0 {
        return Err(TrackError::config_validation(
            "line.default_total_distance",
            "default_total_distance must be > 0",
        ));
    }
    Ok(())
}

fn validate_sync(blueprint: &LineBlueprint) -> Result<(), TrackError> {
    let sync = &blueprint.sync;
    if sync.window_s <= 0.0 {
        return Err(TrackError::config_validation(
            "sync.window_s",
            format!("window_s must be > 0, got {}", sync.window_s),
        ));
    }
    if sync.max_wait_wall_s < 0.0 {
        return Err(TrackError::config_validation(
            "sync.max_wait_wall_s",
            "max_wait_wall_s must be >= 0",
        ));
    }
    if sync.buffer_max_per_camera == 0 {
        return Err(TrackError::config_validation(
            "sync.buffer_max_per_camera",
            "buffer_max_per_camera must be > 0",
        ));
    }
    Ok(())
}

fn validate_cameras(blueprint: &LineBlueprint) -> Result<(), TrackError> {
    if blueprint.cameras.is_empty() {
        return Err(TrackError::config_validation(
            "cameras",
            "at least one camera is required",
        ));
    }

    let mut seen_ids = HashSet::new();
    let mut seen_stages = HashSet::new();
    let mut locals = 0usize;

    for camera in &blueprint.cameras {
        if !seen_ids.insert(&camera.id) {
            return Err(TrackError::config_validation(
                format!("cameras[id={}]", camera.id),
                "duplicate camera id",
            ));
        }
        if !camera.stage.is_camera() {
            return Err(TrackError::config_validation(
                format!("cameras[{}].stage", camera.id),
                format!("'{}' is not a camera stage", camera.stage),
            ));
        }
        if !seen_stages.insert(camera.stage) {
            return Err(TrackError::config_validation(
                format!("cameras[{}].stage", camera.id),
                format!("duplicate stage '{}'", camera.stage),
            ));
        }
        if camera.transport == Transport::Local {
            locals += 1;
        }
        if camera.forward_sign != 1 && camera.forward_sign != -1 {
            return Err(TrackError::config_validation(
                format!("cameras[{}].forward_sign", camera.id),
                format!("forward_sign must be 1 or -1, got {}", camera.forward_sign),
            ));
        }

        for (field, rate) in [
            ("roi_y_rate", Some(camera.roi_y_rate)),
            ("roi_margin_rate", Some(camera.roi_margin_rate)),
            ("eol_y_rate", camera.eol_y_rate),
            ("eol_margin_rate", camera.eol_margin_rate),
            ("dist_eps_rate", Some(camera.dist_eps_rate)),
            ("max_dy_rate", Some(camera.max_dy_rate)),
        ] {
            if let Some(rate) = rate {
                if !(0.0..=1.0).contains(&rate) {
                    return Err(TrackError::config_validation(
                        format!("cameras[{}].{field}", camera.id),
                        format!("rate must be within [0, 1], got {rate}"),
                    ));
                }
            }
        }
    }

    if locals > 1 {
        return Err(TrackError::config_validation(
            "cameras",
            format!("at most one local-transport camera allowed, got {locals}"),
        ));
    }

    Ok(())
}

fn validate_transitions(blueprint: &LineBlueprint) -> Result<(), TrackError> {
    let mut seen = HashSet::new();
    for (idx, transition) in blueprint.transitions.iter().enumerate() {
        if transition.from >= transition.to {
            return Err(TrackError::config_validation(
                format!("transitions[{idx}]"),
                format!(
                    "'{}' -> '{}' does not go downstream",
                    transition.from, transition.to
                ),
            ));
        }
        if !seen.insert((transition.from, transition.to)) {
            return Err(TrackError::config_validation(
                format!("transitions[{idx}]"),
                format!(
                    "duplicate transition '{}' -> '{}'",
                    transition.from, transition.to
                ),
            ));
        }
        if transition.avg_travel_s <= 0.0 {
            return Err(TrackError::config_validation(
                format!("transitions[{idx}].avg_travel_s"),
                "avg_travel_s must be > 0",
            ));
        }
        if transition.margin_s < 0.0 {
            return Err(TrackError::config_validation(
                format!("transitions[{idx}].margin_s"),
                "margin_s must be >= 0",
            ));
        }
    }
    Ok(())
}

fn validate_routes(blueprint: &LineBlueprint) -> Result<(), TrackError> {
    if blueprint.routes.is_empty() {
        return Err(TrackError::config_validation(
            "routes",
            "at least one route is required",
        ));
    }

    let mut seen_codes = HashSet::new();
    for route in &blueprint.routes {
        let field = format!("routes[code={}]", route.code);

        if route.code.is_empty() {
            return Err(TrackError::config_validation(
                "routes",
                "route code cannot be empty",
            ));
        }
        if !seen_codes.insert(&route.code) {
            return Err(TrackError::config_validation(field, "duplicate route code"));
        }
        if route.stages.first() != Some(&Stage::Scanner) {
            return Err(TrackError::config_validation(
                field,
                "route stages must start at the scanner",
            ));
        }
        if !route.stages.windows(2).all(|w| w[0] < w[1]) {
            return Err(TrackError::config_validation(
                field,
                "route stages must be strictly downstream",
            ));
        }
        if route.pickup_stages.is_empty() {
            return Err(TrackError::config_validation(
                field,
                "route needs at least one pickup stage",
            ));
        }
        if route.total_distance <= 0.0 {
            return Err(TrackError::config_validation(
                field,
                "total_distance must be > 0",
            ));
        }
    }
    Ok(())
}

fn validate_notifiers(blueprint: &LineBlueprint) -> Result<(), TrackError> {
    for (idx, notifier) in blueprint.notifiers.iter().enumerate() {
        if notifier.name.is_empty() {
            return Err(TrackError::config_validation(
                format!("notifiers[{idx}].name"),
                "notifier name cannot be empty",
            ));
        }
        if notifier.notifier_type == NotifierType::Http
            && !notifier.params.contains_key("base_url")
        {
            return Err(TrackError::config_validation(
                format!("notifiers[{idx}].params.base_url"),
                "http notifier requires a base_url param",
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{
        CameraConfig, ConfigVersion, LineConfig, NotifierConfig, RouteConfig, SyncSettings,
        TransitionConfig,
    };
    use std::collections::HashMap;

    fn camera(id: &str, stage: Stage, transport: Transport) -> CameraConfig {
        CameraConfig {
            id: id.into(),
            stage,
            transport,
            roi_y_rate: 0.5,
            roi_margin_rate: 0.05,
            eol_y_rate: None,
            eol_margin_rate: None,
            dist_eps_rate: 0.15,
            max_dy_rate: 0.1,
            forward_sign: 1,
            rotate: 0,
        }
    }

    fn minimal_blueprint() -> LineBlueprint {
        LineBlueprint {
            version: ConfigVersion::V1,
            line: LineConfig {
                belt_speed: 0.366,
                default_total_distance: 12.8,
                thumbnail_dir: None,
            },
            sync: SyncSettings::default(),
            cameras: vec![
                camera("usb_local", Stage::Cam0, Transport::Local),
                camera("rpi_usb1", Stage::Cam1, Transport::Network),
            ],
            transitions: vec![TransitionConfig {
                from: Stage::Scanner,
                to: Stage::Cam0,
                avg_travel_s: 2.5,
                margin_s: 3.0,
            }],
            routes: vec![RouteConfig {
                code: "XSEA".into(),
                stages: vec![Stage::Scanner, Stage::Cam0, Stage::Cam1],
                pickup_stages: vec![Stage::Cam1],
                total_distance: 9.47,
            }],
            scanner: None,
            notifiers: vec![NotifierConfig {
                name: "log".into(),
                notifier_type: NotifierType::Log,
                queue_capacity: 100,
                params: HashMap::new(),
            }],
        }
    }

    #[test]
    fn test_valid_config() {
        assert!(validate(&minimal_blueprint()).is_ok());
    }

    #[test]
    fn test_duplicate_camera_id() {
        let mut bp = minimal_blueprint();
        let mut dup = bp.cameras[0].clone();
        dup.stage = Stage::Cam2;
        bp.cameras.push(dup);
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("duplicate camera id"), "got: {err}");
    }

    #[test]
    fn test_duplicate_stage() {
        let mut bp = minimal_blueprint();
        bp.cameras.push(camera("other", Stage::Cam1, Transport::Network));
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("duplicate stage"), "got: {err}");
    }

    #[test]
    fn test_two_local_cameras() {
        let mut bp = minimal_blueprint();
        bp.cameras.push(camera("second_local", Stage::Cam2, Transport::Local));
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("local-transport"), "got: {err}");
    }

    #[test]
    fn test_invalid_belt_speed() {
        let mut bp = minimal_blueprint();
        bp.line.belt_speed = 0.0;
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("belt_speed"), "got: {err}");
    }

    #[test]
    fn test_rate_out_of_range() {
        let mut bp = minimal_blueprint();
        bp.cameras[0].roi_y_rate = 1.5;
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("within [0, 1]"), "got: {err}");
    }

    #[test]
    fn test_upstream_transition_rejected() {
        let mut bp = minimal_blueprint();
        bp.transitions.push(TransitionConfig {
            from: Stage::Cam2,
            to: Stage::Cam1,
            avg_travel_s: 1.0,
            margin_s: 1.0,
        });
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("downstream"), "got: {err}");
    }

    #[test]
    fn test_route_must_start_at_scanner() {
        let mut bp = minimal_blueprint();
        bp.routes[0].stages = vec![Stage::Cam0, Stage::Cam1];
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("start at the scanner"), "got: {err}");
    }

    #[test]
    fn test_route_stages_must_descend_the_belt() {
        let mut bp = minimal_blueprint();
        bp.routes[0].stages = vec![Stage::Scanner, Stage::Cam1, Stage::Cam0];
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("strictly downstream"), "got: {err}");
    }

    #[test]
    fn test_http_notifier_requires_base_url() {
        let mut bp = minimal_blueprint();
        bp.notifiers.push(NotifierConfig {
            name: "sorter".into(),
            notifier_type: NotifierType::Http,
            queue_capacity: 100,
            params: HashMap::new(),
        });
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("base_url"), "got: {err}");
    }
}
