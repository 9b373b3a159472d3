//! # Integration Tests
//!
//! Cross-crate tests for the tracking pipeline:
//! - configuration round-trips into the synchronizer and matcher
//! - full parcel journeys driven through real windows
//! - mock e2e runs (ingestion -> sync -> matcher -> dispatcher)

#[cfg(test)]
const LINE_TOML: &str = r#"
[line]
belt_speed = 0.366
default_total_distance = 12.8

[sync]
window_s = 0.5
max_wait_wall_s = 0.5
pending_extra_margin_s = 0.0

[[cameras]]
id = "usb_local"
stage = "cam0"
transport = "local"

[[cameras]]
id = "rpi_usb1"
stage = "cam1"

[[cameras]]
id = "rpi_usb2"
stage = "cam2"

[[cameras]]
id = "rpi_usb3"
stage = "cam3"
eol_y_rate = 0.9
eol_margin_rate = 0.03

[[transitions]]
from = "scanner"
to = "cam0"
avg_travel_s = 2.5
margin_s = 3.0

[[transitions]]
from = "cam0"
to = "cam1"
avg_travel_s = 18.38
margin_s = 2.5

[[transitions]]
from = "cam1"
to = "cam2"
avg_travel_s = 9.8
margin_s = 2.0

[[transitions]]
from = "cam2"
to = "cam3"
avg_travel_s = 9.1
margin_s = 2.0

[[transitions]]
from = "cam3"
to = "eol"
avg_travel_s = 3.5
margin_s = 2.0

[[routes]]
code = "XSEA"
stages = ["scanner", "cam0", "cam1", "cam2", "cam3"]
pickup_stages = ["cam2", "cam3"]
total_distance = 9.47

[[routes]]
code = "XSEB"
stages = ["scanner", "cam0", "cam1", "cam2", "cam3", "eol"]
pickup_stages = ["cam3", "eol"]
total_distance = 12.8

[scanner]
host = "192.168.0.50"
port = 9001

[[notifiers]]
name = "log"
notifier_type = "log"
"#;

#[cfg(test)]
fn load_blueprint() -> contracts::LineBlueprint {
    config_loader::ConfigLoader::load_from_str(LINE_TOML, config_loader::ConfigFormat::Toml)
        .expect("fixture config must load")
}

#[cfg(test)]
fn packet(camera: &str, capture_time: f64, receive_time: f64) -> contracts::FramePacket {
    use bytes::Bytes;
    use contracts::{ImageData, ImageFormat};

    contracts::FramePacket {
        camera_id: camera.into(),
        capture_time,
        receive_time,
        image: ImageData {
            width: 8,
            height: 8,
            format: ImageFormat::Gray8,
            data: Bytes::from(vec![0u8; 64]),
        },
    }
}

#[cfg(test)]
mod config_tests {
    use super::*;
    use contracts::Stage;

    #[test]
    fn blueprint_feeds_both_engines() {
        let bp = load_blueprint();

        let sync_config = bp.to_sync_config();
        assert_eq!(sync_config.cameras.len(), 4);
        assert_eq!(sync_config.window_s, 0.5);
        // usb_local has local transport, so it anchors set selection
        assert_eq!(
            sync_config.local_camera.as_deref(),
            Some("usb_local")
        );

        let matcher_config = bp.to_matcher_config();
        assert_eq!(matcher_config.transitions.len(), 5);
        assert_eq!(
            matcher_config
                .transitions
                .get(&(Stage::Cam0, Stage::Cam1))
                .map(|t| t.avg_travel_s),
            Some(18.38)
        );
        assert_eq!(matcher_config.total_distance("XSEA"), 9.47);
        // Unknown routes fall back to the line default
        assert_eq!(matcher_config.total_distance("????"), 12.8);
    }

    #[test]
    fn toml_round_trip_preserves_order() {
        let bp = load_blueprint();
        let toml = config_loader::ConfigLoader::to_toml(&bp).unwrap();
        let reloaded =
            config_loader::ConfigLoader::load_from_str(&toml, config_loader::ConfigFormat::Toml)
                .unwrap();

        let ids: Vec<&str> = reloaded
            .cameras_in_order()
            .iter()
            .map(|c| c.id.as_str())
            .collect();
        assert_eq!(ids, ["usb_local", "rpi_usb1", "rpi_usb2", "rpi_usb3"]);
        assert_eq!(reloaded.routes.len(), 2);
    }
}

#[cfg(test)]
mod journey_tests {
    use super::*;
    use frame_sync::{FrameSynchronizer, WindowExtract};
    use matcher::{
        MatchOutcome, MasterStatus, PendingDecision, ScanEvent, Stage, StageMatcher,
    };

    fn scan(uid: &str, route: &str, time_s: f64) -> ScanEvent {
        ScanEvent {
            uid: uid.into(),
            route_code: route.into(),
            time_s,
        }
    }

    /// One parcel through every checkpoint, frames delivered through
    /// real synchronizer windows.
    #[test]
    fn parcel_tracked_across_windows() {
        let bp = load_blueprint();
        let mut sync = FrameSynchronizer::new(bp.to_sync_config());
        let mut matcher = StageMatcher::new(bp.to_matcher_config());

        matcher.on_scan_event(&scan("20260130_100000_000", "XSEB", 36000.0));

        // The parcel shows up at each camera near its expected time;
        // stations it is not at still produce (empty-handed) frames.
        let journey = [
            ("usb_local", Stage::Cam0, 36002.5),
            ("rpi_usb1", Stage::Cam1, 36020.9),
            ("rpi_usb2", Stage::Cam2, 36030.7),
            ("rpi_usb3", Stage::Cam3, 36039.8),
        ];

        for &(seen_at, stage, time_s) in &journey {
            for camera in bp.cameras_in_order() {
                sync.put(packet(&camera.id, time_s, time_s + 0.05));
            }

            let start = sync.min_head_receive_time().unwrap();
            let set = match sync.extract_set(start, start + bp.sync.window_s) {
                WindowExtract::Complete(set) => set,
                WindowExtract::Incomplete { missing } => {
                    panic!("window should be complete, missing {missing:?}")
                }
            };

            let frame = set.get(seen_at).unwrap();
            let outcome = matcher.attempt_match(stage, frame.capture_time, 50, 1);
            assert_eq!(
                outcome,
                MatchOutcome::Matched {
                    uid: "20260130_100000_000".into()
                }
            );
        }

        let master = matcher.master("20260130_100000_000").unwrap();
        assert_eq!(master.status, MasterStatus::Tracking);
        assert_eq!(master.last_stage, Stage::Cam3);

        // End-of-line detection via the last camera's eol band
        let outcome = matcher.attempt_match(Stage::EndOfLine, 36043.3, 50, 2);
        assert_eq!(
            outcome,
            MatchOutcome::Matched {
                uid: "20260130_100000_000".into()
            }
        );
        assert_eq!(
            matcher.master("20260130_100000_000").unwrap().last_stage,
            Stage::EndOfLine
        );
    }

    /// Distance reporting dedup: the quantized step only changes every
    /// 0.5 m of belt travel.
    #[test]
    fn distance_steps_are_edge_triggered() {
        let bp = load_blueprint();
        let mut matcher = StageMatcher::new(bp.to_matcher_config());
        matcher.on_scan_event(&scan("u1", "XSEB", 36000.0));

        let quantize = |d: f64| (d / 0.5).round() * 0.5;

        let master = matcher.master_mut("u1").unwrap();

        // 12.8 m total at 0.366 m/s: 5.0 s in leaves 10.97 m
        let rem = master.remaining_distance(36005.0, bp.line.belt_speed).unwrap();
        assert!((rem - 10.97).abs() < 1e-9);
        master.last_sent_distance = Some(quantize(rem));
        assert_eq!(master.last_sent_distance, Some(11.0));

        // 0.2 s later the step is unchanged, so nothing new is sent
        let rem = master.remaining_distance(36005.2, bp.line.belt_speed).unwrap();
        assert_eq!(master.last_sent_distance, Some(quantize(rem)));

        // Remaining distance never goes negative
        let rem = master.remaining_distance(36000.0 + 1e6, bp.line.belt_speed).unwrap();
        assert_eq!(rem, 0.0);
    }

    /// A parcel that vanishes between cam2 and cam3 on XSEA resolves to
    /// pickup: cam3 is inside its pickup zone.
    #[test]
    fn vanished_parcel_resolves_to_pickup() {
        let bp = load_blueprint();
        let mut matcher = StageMatcher::new(bp.to_matcher_config());

        matcher.on_scan_event(&scan("u1", "XSEA", 36000.0));
        for (stage, t) in [
            (Stage::Cam0, 36002.5),
            (Stage::Cam1, 36020.9),
            (Stage::Cam2, 36030.7),
        ] {
            let outcome = matcher.attempt_match(stage, t, 40, 1);
            assert!(matches!(outcome, MatchOutcome::Matched { .. }));
        }
        matcher.mark_pending("u1", Stage::Cam2);

        // Deadline: 36030.7 + 9.1 + 2.0 = 36041.8
        assert!(matcher.resolve_pending("u1", 36041.0).is_none());
        let resolution = matcher.resolve_pending("u1", 36042.0).unwrap();
        assert_eq!(resolution.decision, PendingDecision::Pickup);
        assert_eq!(matcher.master("u1").unwrap().status, MasterStatus::Pickup);

        // Terminal masters drop out of the live set
        assert!(matcher.live_uids().is_empty());
    }

    /// An incomplete window leaves buffers untouched until the caller
    /// gives up and discards the interval.
    #[test]
    fn incomplete_window_then_forced_advance() {
        let bp = load_blueprint();
        let mut sync = FrameSynchronizer::new(bp.to_sync_config());

        // rpi_usb3 never delivers
        for camera in ["usb_local", "rpi_usb1", "rpi_usb2"] {
            sync.put(packet(camera, 36000.0, 36000.1));
        }

        match sync.extract_set(36000.0, 36000.5) {
            WindowExtract::Incomplete { missing } => {
                assert_eq!(missing.len(), 1);
                assert_eq!(missing[0], "rpi_usb3");
            }
            WindowExtract::Complete(_) => panic!("set cannot be complete"),
        }

        // Still buffered: the late camera could yet catch up
        let stats = sync.stats_and_reset();
        assert_eq!(stats.iter().map(|s| s.buffered).sum::<usize>(), 3);

        sync.remove_interval(36000.0, 36000.5);
        let stats = sync.stats_and_reset();
        assert_eq!(stats.iter().map(|s| s.buffered).sum::<usize>(), 0);
        assert_eq!(sync.min_head_receive_time(), None);
    }

    /// Two parcels scanned back to back stay in belt order through the
    /// whole chain, even when the second is a different route.
    #[test]
    fn two_parcels_keep_belt_order() {
        let bp = load_blueprint();
        let mut matcher = StageMatcher::new(bp.to_matcher_config());

        matcher.on_scan_event(&scan("first", "XSEA", 36000.0));
        matcher.on_scan_event(&scan("second", "XSEB", 36004.0));

        let outcome = matcher.attempt_match(Stage::Cam0, 36002.5, 50, 1);
        assert_eq!(outcome, MatchOutcome::Matched { uid: "first".into() });
        let outcome = matcher.attempt_match(Stage::Cam0, 36006.5, 50, 2);
        assert_eq!(outcome, MatchOutcome::Matched { uid: "second".into() });

        let outcome = matcher.attempt_match(Stage::Cam1, 36020.9, 50, 3);
        assert_eq!(outcome, MatchOutcome::Matched { uid: "first".into() });
        let outcome = matcher.attempt_match(Stage::Cam1, 36024.9, 50, 4);
        assert_eq!(outcome, MatchOutcome::Matched { uid: "second".into() });
    }
}

#[cfg(test)]
mod e2e_tests {
    use super::*;
    use std::time::Duration;

    use contracts::{Notification, NotifierConfig, NotifierType};
    use frame_sync::{FrameSynchronizer, WindowExtract};
    use ingestion::{IngestionPipeline, MockCameraSource};
    use notifier::create_dispatcher;
    use tokio::sync::mpsc;

    /// Mock sources through the ingestion pipeline into the
    /// synchronizer: a wide-open window over everything received must
    /// come back complete.
    #[tokio::test]
    async fn mock_cameras_fill_a_window() {
        let bp = load_blueprint();
        let mut pipeline = IngestionPipeline::new(100);

        for camera in bp.cameras_in_order() {
            let source = MockCameraSource::with_id(&camera.id, 30.0, 16, 16);
            pipeline.register_camera(camera.id.clone(), Box::new(source), None);
        }
        pipeline.start_all();
        let frame_rx = pipeline.take_receiver().unwrap();

        let mut sync = FrameSynchronizer::new(bp.to_sync_config());

        // Collect until every camera delivered a few frames
        let mut counts: std::collections::HashMap<String, usize> = Default::default();
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        while counts.len() < 4 || counts.values().any(|&n| n < 2) {
            let packet = tokio::time::timeout_at(deadline, frame_rx.recv())
                .await
                .expect("mock cameras must deliver in time")
                .expect("ingestion channel closed early");
            *counts.entry(packet.camera_id.to_string()).or_default() += 1;
            sync.put(packet);
        }
        pipeline.stop_all();

        let start = sync.min_head_receive_time().unwrap();
        match sync.extract_set(start, start + 10.0) {
            WindowExtract::Complete(set) => {
                assert_eq!(set.len(), 4);
                for camera in bp.cameras_in_order() {
                    assert!(set.get(&camera.id).is_some());
                }
            }
            WindowExtract::Incomplete { missing } => {
                panic!("all cameras were running, missing {missing:?}")
            }
        }
    }

    /// Every notification kind through a config-built dispatcher.
    #[tokio::test]
    async fn dispatcher_drains_before_exit() {
        let (tx, rx) = mpsc::channel(16);
        let configs = vec![NotifierConfig {
            name: "e2e_log".to_string(),
            notifier_type: NotifierType::Log,
            queue_capacity: 16,
            params: Default::default(),
        }];

        let dispatcher = create_dispatcher(configs, rx).unwrap();
        let handle = dispatcher.spawn();

        let events = [
            Notification::Position {
                uid: "u1".into(),
                distance: 11.0,
                thumbnail: None,
            },
            Notification::Pickup { uid: "u1".into() },
            Notification::Missing { uid: "u2".into() },
            Notification::Disappear { uid: "u3".into() },
            Notification::Eol { uid: "u4".into() },
        ];
        for event in events {
            tx.send(event).await.unwrap();
        }

        // Closing the input drains and stops the dispatcher
        drop(tx);
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("dispatcher must drain and exit")
            .unwrap();
    }
}
