//! Operator control tests over scripted transports

use super::*;
use crate::driver::CapturePhase;
use crate::recording::RecordingSink;
use crate::test_utils::{FailingSink, MemorySink, ScriptedTransport, encode_stream, records};
use crate::{PacketFormat, SampleRecord};
use std::time::Duration;

const WAIT: Duration = Duration::from_secs(5);

fn config() -> MonitorConfig {
    MonitorConfig { read_timeout_ms: 10, ..MonitorConfig::default() }
}

fn memory_monitor() -> (Monitor, Arc<std::sync::Mutex<crate::test_utils::MemoryLog>>) {
    let (sink, log) = MemorySink::new();
    let monitor = Monitor::new(config())
        .unwrap()
        .with_recording_destination(move || -> Result<Box<dyn RecordingSink>> {
            Ok(Box::new(sink.clone()))
        });
    (monitor, log)
}

async fn wait_status(monitor: &Monitor, predicate: impl Fn(&CaptureStatus) -> bool) {
    let mut rx = monitor.status_rx.clone();
    tokio::time::timeout(WAIT, rx.wait_for(|s| predicate(s)))
        .await
        .expect("status did not change in time")
        .unwrap();
}

#[tokio::test]
async fn idle_monitor_reports_idle() {
    let monitor = Monitor::new(config()).unwrap();
    assert_eq!(monitor.status(), "Idle");
    assert!(!monitor.is_capturing());
    assert!(monitor.latest_snapshot().is_none());
    assert!(matches!(monitor.set_recording(true), Err(MonitorError::Closed)));
}

#[tokio::test]
async fn split_header_yields_one_record() {
    let mut monitor = Monitor::new(config()).unwrap();
    let mut rest = vec![0x5A, 0x01];
    rest.resize(16, 0);

    let transport = ScriptedTransport::new().chunk(vec![0xA5]).chunk(rest).hold_open();
    monitor.start_capture(transport).unwrap();

    let snapshot = monitor.wait_for_samples(1, WAIT).await.unwrap();
    assert_eq!(snapshot.total_inserted(), 1);
    assert_eq!(snapshot.latest(), Some(&SampleRecord::new(1, [0, 0])));
    assert_eq!(snapshot.len(), crate::ring::RING_CAPACITY);

    monitor.stop_capture().await.unwrap();
    assert_eq!(monitor.status(), "Capture stopped");
    assert_eq!(monitor.status_report().phase, CapturePhase::Stopped);
}

#[tokio::test]
async fn second_start_is_rejected() {
    let mut monitor = Monitor::new(config()).unwrap();
    monitor.start_capture(ScriptedTransport::new().hold_open()).unwrap();

    let err = monitor.start_capture(ScriptedTransport::new()).unwrap_err();
    assert!(matches!(err, MonitorError::AlreadyRunning));

    monitor.stop_capture().await.unwrap();
    assert!(matches!(monitor.stop_capture().await, Err(MonitorError::Closed)));
}

#[tokio::test]
async fn capture_can_restart_after_transport_closes() {
    let format = PacketFormat::default();
    let mut monitor = Monitor::new(config()).unwrap();

    let first = ScriptedTransport::new().chunk(encode_stream(&format, &records(3), &[]));
    monitor.start_capture(first).unwrap();
    wait_status(&monitor, |s| s.message == "Transport closed").await;
    monitor.stop_capture().await.unwrap();
    assert_eq!(monitor.status(), "Transport closed");

    let second = ScriptedTransport::new().chunk(encode_stream(&format, &records(5), &[])).hold_open();
    monitor.start_capture(second).unwrap();

    // fresh ring per session
    let snapshot = monitor.wait_for_samples(5, WAIT).await.unwrap();
    assert_eq!(snapshot.total_inserted(), 5);
    monitor.stop_capture().await.unwrap();
}

#[tokio::test]
async fn recording_captures_only_enabled_window() {
    let format = PacketFormat::default();
    let input = records(6);
    let (mut monitor, log) = memory_monitor();

    let transport = ScriptedTransport::new().hold_open();
    let feed = transport.feeder();
    monitor.start_capture(transport).unwrap();

    feed.send(encode_stream(&format, &input[..2], &[])).unwrap();
    wait_status(&monitor, |s| s.stats.packets == 2).await;

    monitor.set_recording(true).unwrap();
    wait_status(&monitor, |s| s.recording).await;
    assert_eq!(monitor.status(), "Recording started");

    feed.send(encode_stream(&format, &input[2..4], &[])).unwrap();
    wait_status(&monitor, |s| s.stats.packets == 4).await;

    monitor.set_recording(false).unwrap();
    wait_status(&monitor, |s| !s.recording).await;
    assert_eq!(monitor.status(), "Recording stopped");

    feed.send(encode_stream(&format, &input[4..], &[])).unwrap();
    wait_status(&monitor, |s| s.stats.packets == 6).await;
    monitor.stop_capture().await.unwrap();

    let log = log.lock().unwrap();
    assert_eq!(log.records, input[2..4].to_vec());
    assert_eq!(log.finished, 1);
}

#[tokio::test]
async fn sink_failure_stops_recording_but_not_capture() {
    let format = PacketFormat::default();
    let mut monitor = Monitor::new(config())
        .unwrap()
        .with_recording_destination(|| -> Result<Box<dyn RecordingSink>> {
            Ok(Box::new(FailingSink::after(1)))
        });

    let transport = ScriptedTransport::new().hold_open();
    let feed = transport.feeder();
    monitor.start_capture(transport).unwrap();

    monitor.set_recording(true).unwrap();
    wait_status(&monitor, |s| s.recording).await;

    feed.send(encode_stream(&format, &records(3), &[])).unwrap();
    wait_status(&monitor, |s| s.message.starts_with("Recording error:")).await;
    assert!(!monitor.status_report().recording);

    feed.send(encode_stream(&format, &records(2), &[])).unwrap();
    let snapshot = monitor.wait_for_samples(5, WAIT).await.unwrap();
    assert_eq!(snapshot.total_inserted(), 5);
    assert!(monitor.is_capturing());

    monitor.stop_capture().await.unwrap();
}

#[tokio::test]
async fn transport_fault_is_reported_in_status() {
    let mut monitor = Monitor::new(config()).unwrap();
    monitor.start_capture(ScriptedTransport::new().fault("port vanished")).unwrap();

    wait_status(&monitor, |s| s.phase == CapturePhase::Faulted).await;
    assert!(monitor.status().starts_with("Read error:"));
    assert!(monitor.status().contains("port vanished"));
}

#[tokio::test]
async fn wait_for_samples_times_out_without_data() {
    let mut monitor = Monitor::new(config()).unwrap();
    monitor.start_capture(ScriptedTransport::new().hold_open()).unwrap();

    let err = monitor.wait_for_samples(1, Duration::from_millis(50)).await.unwrap_err();
    assert!(matches!(err, MonitorError::Timeout { .. }));
    monitor.stop_capture().await.unwrap();
}

#[tokio::test]
async fn native_subscription_sees_latest_records() {
    let format = PacketFormat::default();
    let mut monitor = Monitor::new(config()).unwrap();
    let mut snapshots = monitor.subscribe(UpdateRate::Native);

    let transport = ScriptedTransport::new().hold_open();
    let feed = transport.feeder();
    monitor.start_capture(transport).unwrap();

    let input = records(4);
    feed.send(encode_stream(&format, &input, &[])).unwrap();

    let seen = tokio::time::timeout(WAIT, async {
        while let Some(snapshot) = snapshots.next().await {
            if snapshot.total_inserted() == 4 {
                return snapshot;
            }
        }
        panic!("snapshot stream ended");
    })
    .await
    .unwrap();

    assert_eq!(&seen.records()[crate::ring::RING_CAPACITY - 4..], &input[..]);
    monitor.stop_capture().await.unwrap();
}

#[tokio::test]
async fn status_stream_starts_with_current_value() {
    let monitor = Monitor::new(config()).unwrap();
    let mut updates = monitor.status_updates();
    let first = updates.next().await.unwrap();
    assert_eq!(first.phase, CapturePhase::Idle);
}

#[test]
fn invalid_config_is_rejected() {
    let config = MonitorConfig { read_size: 0, ..MonitorConfig::default() };
    assert!(matches!(Monitor::new(config), Err(MonitorError::Config { .. })));
}
