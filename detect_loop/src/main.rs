use anyhow::Result;
use cam_source::RscamSource;
use clap::Parser;
use detect_loop::{
    controller::DetectLoop,
    meter::spawn_meter_logger,
    nn::SsdMobilenetModel,
    publish::DetectionBus,
    scheduler::IntervalScheduler,
    sink::TextSink,
    state::{Component, InitError, Slot},
};
use env_logger::TimestampPrecision;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Parser)]
#[command(about = "Continuous webcam object detection")]
struct Args {
    /// Video device to capture from.
    #[arg(long, default_value = "/dev/video0")]
    device: String,

    /// Pin the capture width instead of using the device maximum.
    #[arg(long, requires = "height")]
    width: Option<u32>,

    /// Pin the capture height instead of using the device maximum.
    #[arg(long, requires = "width")]
    height: Option<u32>,

    /// Minimum confidence for a detection to be reported.
    #[arg(long, default_value_t = 0.5)]
    min_confidence: f32,

    /// Maximum intersection-over-union before a box is suppressed.
    #[arg(long, default_value_t = 0.5)]
    max_iou: f32,

    /// Label whose detections are echoed to the diagnostic log.
    #[arg(long, default_value = "playing card")]
    watch_label: String,

    /// Detection cycles per second.
    #[arg(long, default_value_t = 30)]
    cycle_hz: u32,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::builder()
        .format_timestamp(Some(TimestampPrecision::Millis))
        .init();

    let args = Args::parse();

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                log::info!("Shutdown requested");
                cancel.cancel();
            }
        });
    }

    // Camera access and model load race independently; the loop below
    // starts ticking right away and gates detection on both.
    let (camera_tx, camera_rx) = oneshot::channel();
    let device = args.device.clone();
    let resolution = args.width.zip(args.height);
    tokio::spawn(async move {
        let result =
            tokio::task::spawn_blocking(move || RscamSource::open(&device, resolution, None))
                .await
                .map_err(|e| InitError::Camera(e.to_string()))
                .and_then(|opened| opened.map_err(|e| InitError::Camera(e.to_string())));
        camera_tx.send(result).ok();
    });

    let (model_tx, model_rx) = oneshot::channel();
    let (min_confidence, max_iou) = (args.min_confidence, args.max_iou);
    tokio::spawn(async move {
        let result = SsdMobilenetModel::load(min_confidence, max_iou)
            .await
            .map_err(|e| InitError::Model(format!("{:#}", e)));
        model_tx.send(result).ok();
    });

    spawn_meter_logger();

    let mut detect_loop = DetectLoop::new(
        Slot::pending(Component::Camera, camera_rx),
        Slot::pending(Component::Model, model_rx),
        TextSink::stdout(Some(args.watch_label)),
        IntervalScheduler::from_hz(args.cycle_hz),
        DetectionBus::new(),
        cancel,
    );
    detect_loop.run().await;

    Ok(())
}
