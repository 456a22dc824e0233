//! # DualSense Bus
//!
//! Demo driver for an emulated DualSense controller.
//!
//! Plugs a controller into an in-process loopback bus, sweeps the right
//! stick in a circle at the configured report rate, and logs every host
//! feedback event as JSON.

use std::f32::consts::TAU;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::time::interval;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use dualsense_bus::config::Config;
use dualsense_bus::controller::DualSenseController;
use dualsense_bus::feedback::{FeedbackEvent, LightbarColor};
use dualsense_bus::transport::LoopbackBus;

/// Index of the right stick X axis in the axis catalog
const RIGHT_THUMB_X: usize = 2;

/// Index of the right stick Y axis in the axis catalog
const RIGHT_THUMB_Y: usize = 3;

/// Reports per full stick revolution
const SWEEP_STEPS: u32 = 120;

/// Number of reports between status log messages
const LOG_INTERVAL_REPORTS: u64 = 600;

/// Main entry point
///
/// # Control Flow
///
/// 1. Load configuration from the path given as the first argument, or use
///    defaults when none is given
/// 2. Set up logging (`RUST_LOG` overrides the configured level)
/// 3. Connect a controller on a loopback bus and subscribe a JSON feedback
///    logger
/// 4. Submit a report per tick until Ctrl+C; every
///    [`LOG_INTERVAL_REPORTS`] the host side answers with feedback and an
///    output report, which the controller awaits
/// 5. Disconnect and exit
///
/// # Errors
///
/// Returns error if the configuration cannot be loaded or the controller
/// fails to connect.
#[tokio::main]
async fn main() -> Result<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => Config::load(&path).with_context(|| format!("loading {}", path))?,
        None => Config::default(),
    };

    let (writer, _guard) = tracing_appender::non_blocking(std::io::stdout());
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .with_writer(writer)
        .init();

    info!("DualSense Bus v{} starting...", env!("CARGO_PKG_VERSION"));

    let bus = Arc::new(LoopbackBus::new());
    let mut controller = DualSenseController::from_config(Arc::clone(&bus), &config.target);
    controller.connect().context("connecting controller")?;

    controller.subscribe(|event: &FeedbackEvent| match serde_json::to_string(event) {
        Ok(json) => info!("Feedback: {}", json),
        Err(e) => warn!("Failed to serialize feedback: {}", e),
    });

    let mut report_interval = interval(config.output.report_period());

    info!(
        "Sweeping right stick at {}Hz on {}",
        config.output.report_rate_hz,
        controller.device_ids()
    );
    info!("Press Ctrl+C to exit");

    let mut step: u32 = 0;
    let mut report_count: u64 = 0;

    loop {
        tokio::select! {
            _ = report_interval.tick() => {
                let (x, y) = sweep_position(step);
                step = (step + 1) % SWEEP_STEPS;

                // One submission for both axes
                controller.set_auto_submit(false);
                let edit = controller
                    .set_axis_value_at(RIGHT_THUMB_X, x)
                    .and_then(|()| controller.set_axis_value_at(RIGHT_THUMB_Y, y));
                controller.set_auto_submit(config.target.auto_submit);

                if let Err(e) = edit.and_then(|()| controller.submit_report()) {
                    debug!("Failed to submit report: {}", e);
                    continue;
                }

                report_count += 1;

                if report_count % LOG_INTERVAL_REPORTS == 0 {
                    info!("Submitted {} reports", report_count);
                    host_round_trip(&bus, &mut controller, &config).await;
                }
            }

            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down...");
                info!("Total reports submitted: {}", report_count);
                break;
            }
        }
    }

    controller.disconnect().context("disconnecting controller")?;
    Ok(())
}

/// Right stick position for a sweep step, on a full-deflection circle.
fn sweep_position(step: u32) -> (i16, i16) {
    let angle = TAU * (step % SWEEP_STEPS) as f32 / SWEEP_STEPS as f32;
    let x = (angle.cos() * f32::from(i16::MAX)) as i16;
    let y = (angle.sin() * f32::from(i16::MAX)) as i16;
    (x, y)
}

/// Play the host: send feedback and an output report, then await it.
async fn host_round_trip(
    bus: &LoopbackBus,
    controller: &mut DualSenseController<LoopbackBus>,
    config: &Config,
) {
    let target = controller.target();
    let shade = (controller.report().right_thumb_x(), controller.report().right_thumb_y());
    bus.emit_feedback(target, 0x40, 0x20, LightbarColor::new(shade.0, shade.1, 0xFF));
    bus.push_output_report(target, &[0x02, 0x40, 0x20]);

    let result = match config.output.await_timeout() {
        Some(timeout) => controller.await_output_report_timeout_async(timeout).await,
        None => controller.await_output_report_async().await,
    };

    match result {
        Ok(output) => debug!("Output report: {:02x?}", &output[..3]),
        Err(e) => warn!("Failed to receive output report: {}", e),
    }
}
