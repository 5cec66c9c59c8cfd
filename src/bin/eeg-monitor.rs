//! CLI entry point for eeg-monitor
//!
//! Captures from a serial amplifier or replays a raw byte capture, prints a
//! periodic summary of the latest snapshot and optionally records every
//! decoded sample to CSV.
//!
//! # Usage
//!
//! Live capture with recording:
//! ```bash
//! eeg-monitor --port /dev/ttyUSB0 --record eeg_data.csv
//! ```
//!
//! Replay a capture at device speed:
//! ```bash
//! eeg-monitor --replay session.bin --realtime
//! ```

use anyhow::{Context, Result, bail};
use clap::Parser;
use eeg_monitor::transports::ReplayTransport;
use eeg_monitor::{
    CapturePhase, Monitor, MonitorConfig, PacketFormat, Snapshot, SnapshotConsumer, UpdateRate,
    run_consumer,
};
use futures::StreamExt;
use std::path::PathBuf;
use std::time::Duration;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "eeg-monitor")]
#[command(about = "Capture and monitor a two-channel serial EEG stream", long_about = None)]
struct Cli {
    /// YAML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Serial port to capture from (overrides the configured port)
    #[arg(long, conflicts_with = "replay")]
    port: Option<String>,

    /// Replay a raw byte capture instead of opening a serial port
    #[arg(long)]
    replay: Option<PathBuf>,

    /// Pace replay at the device byte rate
    #[arg(long, requires = "replay")]
    realtime: bool,

    /// Record decoded samples to this CSV file
    #[arg(long)]
    record: Option<PathBuf>,

    /// Summary lines per second; 0 prints every snapshot
    #[arg(long, default_value_t = 4)]
    rate: u32,

    /// Use the ModularEEG P2 packet layout (version byte before the counter)
    #[arg(long)]
    legacy_format: bool,

    /// Stop after this many seconds
    #[arg(long)]
    duration: Option<u64>,
}

/// Prints one line per delivered snapshot
#[derive(Default)]
struct SummaryPrinter {
    printed: u64,
}

impl SnapshotConsumer for SummaryPrinter {
    fn on_snapshot_ready(&mut self, snapshot: &Snapshot) {
        let Some(latest) = snapshot.latest() else {
            return;
        };
        if snapshot.total_inserted() == 0 {
            return;
        }

        let span = |index| {
            snapshot
                .channel(index)
                .skip(snapshot.len() - snapshot.filled())
                .fold((u16::MAX, u16::MIN), |(lo, hi), v| (lo.min(v), hi.max(v)))
        };
        let (lo1, hi1) = span(0);
        let (lo2, hi2) = span(1);

        println!(
            "#{:>3}  ch1 {:>4} [{:>4}..{:>4}]  ch2 {:>4} [{:>4}..{:>4}]  total {}",
            latest.sequence_id,
            latest.channels[0],
            lo1,
            hi1,
            latest.channels[1],
            lo2,
            hi2,
            snapshot.total_inserted()
        );
        self.printed += 1;
    }
}

fn load_config(cli: &Cli) -> Result<MonitorConfig> {
    let mut config = match &cli.config {
        Some(path) => MonitorConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => MonitorConfig::default(),
    };

    if let Some(port) = &cli.port {
        config.serial.port = port.clone();
    }
    if cli.legacy_format {
        config.packet = PacketFormat::modular_eeg_p2();
    }
    if let Some(path) = &cli.record {
        config.recording_path = Some(path.clone());
    }

    config.validate()?;
    Ok(config)
}

fn start(monitor: &mut Monitor, cli: &Cli) -> Result<()> {
    match &cli.replay {
        Some(path) => {
            let mut transport = ReplayTransport::open(path)?;
            if cli.realtime {
                transport = transport.paced(monitor.config().bytes_per_second());
            }
            monitor.start_capture(transport)?;
            Ok(())
        }
        None => start_serial(monitor),
    }
}

#[cfg(feature = "serial")]
fn start_serial(monitor: &mut Monitor) -> Result<()> {
    let transport = eeg_monitor::transports::SerialTransport::open(&monitor.config().serial)
        .context("opening serial port")?;
    monitor.start_capture(transport)?;
    Ok(())
}

#[cfg(not(feature = "serial"))]
fn start_serial(_monitor: &mut Monitor) -> Result<()> {
    bail!("built without serial support; use --replay")
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;
    let mut monitor = Monitor::new(config)?;

    let cancel = CancellationToken::new();
    let printer_cancel = cancel.clone();
    let snapshots = monitor.subscribe(UpdateRate::Max(cli.rate));
    let printer = tokio::spawn(async move {
        let mut printer = SummaryPrinter::default();
        run_consumer(snapshots, &mut printer, printer_cancel).await;
        printer.printed
    });

    start(&mut monitor, &cli)?;
    if cli.record.is_some() {
        monitor.set_recording(true)?;
    }

    let mut status = monitor.status_updates();
    let mut last_message = String::new();
    let deadline = async {
        match cli.duration {
            Some(secs) => tokio::time::sleep(Duration::from_secs(secs)).await,
            None => std::future::pending().await,
        }
    };
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            _ = signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
            _ = &mut deadline => {
                info!("Duration elapsed");
                break;
            }
            update = status.next() => {
                let Some(update) = update else { break };
                if update.message != last_message {
                    info!(packets = update.stats.packets, "{}", update);
                    last_message.clone_from(&update.message);
                }
                if matches!(update.phase, CapturePhase::Stopped | CapturePhase::Faulted) {
                    break;
                }
            }
        }
    }

    // joins the capture task so the log is finalized before exit
    monitor.stop_capture().await?;

    let report = monitor.status_report();
    cancel.cancel();
    let printed = printer.await.unwrap_or_default();

    info!(
        packets = report.stats.packets,
        skipped = report.stats.skipped_bytes,
        recorded = report.stats.recorded,
        printed,
        "{}",
        report
    );

    if report.phase == CapturePhase::Faulted {
        warn!("Capture ended with a transport fault");
        bail!("{}", report.message);
    }
    Ok(())
}
