//! Detection loop controller.
//!
//! Drives the repeating capture → detect → publish cycle. Every loop
//! iteration awaits the frame scheduler once, unconditionally; the cycle
//! body only runs once both the camera and the model slot are ready.
//! Detection is awaited within the cycle, so at most one inference is in
//! flight at any time.
use common::CameraSource;
use tokio_util::sync::CancellationToken;

use crate::{
    meter::METER,
    nn::DetectionModel,
    publish::DetectionBus,
    scheduler::FrameScheduler,
    sink::PresentationSink,
    state::{Component, SessionStatus, Slot, SlotEvent},
    surface::FrameSurface,
};

pub struct DetectLoop<C, M, S, Sch> {
    camera: Slot<C>,
    model: Slot<M>,
    sink: S,
    scheduler: Sch,
    surface: FrameSurface,
    bus: DetectionBus,
    cancel: CancellationToken,
    running_announced: bool,
}

impl<C, M, S, Sch> DetectLoop<C, M, S, Sch>
where
    C: CameraSource,
    M: DetectionModel,
    S: PresentationSink,
    Sch: FrameScheduler,
{
    pub fn new(
        camera: Slot<C>,
        model: Slot<M>,
        sink: S,
        scheduler: Sch,
        bus: DetectionBus,
        cancel: CancellationToken,
    ) -> Self {
        debug_assert_eq!(camera.component(), Component::Camera);
        debug_assert_eq!(model.component(), Component::Model);

        Self {
            camera,
            model,
            sink,
            scheduler,
            surface: FrameSurface::new(),
            bus,
            cancel,
            running_announced: false,
        }
    }

    /// Run until the cancellation token fires.
    ///
    /// The loop never terminates on its own: init failures and per-cycle
    /// errors are logged and surfaced to the sink, after which the loop
    /// keeps ticking and skipping detection.
    pub async fn run(&mut self) {
        self.sink.on_status(SessionStatus::Initializing);

        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    log::info!("Detection loop cancelled");
                    break;
                }
                _ = self.scheduler.next_tick() => {}
            }

            METER.tick_cycle();
            self.cycle().await;
        }
    }

    /// One detection cycle: poll readiness, then capture, detect and
    /// publish if both prerequisites are ready.
    async fn cycle(&mut self) {
        self.poll_readiness();

        if !(self.camera.is_ready() && self.model.is_ready()) {
            return;
        }

        let frame = {
            // Both slots checked ready above.
            let camera = self.camera.get_mut().unwrap();
            match camera.grab() {
                Ok(frame) => frame,
                Err(err) => {
                    log::warn!("Skipping cycle, {}", err);
                    return;
                }
            }
        };

        if let Err(err) = self.surface.blit(&frame) {
            log::warn!("Skipping cycle, {}", err);
            return;
        }

        let model = self.model.get().unwrap();
        match model.detect(self.surface.image()).await {
            Ok(detections) => {
                METER.tick_inference();
                log::debug!("Detected {} objects", detections.len());
                self.bus.publish(detections.clone());
                self.sink.publish(&detections);
            }
            Err(err) => {
                // The previous detection set stays current.
                log::warn!("Inference failed: {:#}", err);
            }
        }
    }

    /// Check both init channels and surface any state transition.
    fn poll_readiness(&mut self) {
        for event in [self.camera.poll(), self.model.poll()] {
            match event {
                Some(SlotEvent::BecameReady) => {}
                Some(SlotEvent::BecameFailed(err)) => {
                    log::error!("{}", err);
                    self.sink.on_status(SessionStatus::Failed(err));
                }
                None => {}
            }
        }

        if !self.running_announced && self.camera.is_ready() && self.model.is_ready() {
            self.running_announced = true;
            log::info!("Camera and model ready, detection active");
            self.sink.on_status(SessionStatus::Running);
        }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn bus(&self) -> &DetectionBus {
        &self.bus
    }

    pub fn scheduler(&self) -> &Sch {
        &self.scheduler
    }

    pub fn surface(&self) -> &FrameSurface {
        &self.surface
    }
}
