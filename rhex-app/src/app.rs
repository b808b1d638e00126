use crate::camera::Camera;
use anyhow::Result;
use pixels::{Pixels, SurfaceTexture};
use rhex_core::Demographics;
use rhex_experiment::{ExperimentConfig, ParticipantId, RunnerEvent, Session, SessionOutputs, Signal};
use rhex_timing::HighPrecisionTimer;
use rhex_video::{frame_channel, CaptureStatus, ChannelFrameSource, FrameSize, FrameSource};
use std::sync::Arc;
use winit::{
    application::ApplicationHandler,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Fullscreen, Window, WindowId},
};

/// Frames the capture thread may run ahead of the display.
const CAPTURE_QUEUE: usize = 4;

pub struct App {
    window: Option<Arc<Window>>,
    pixels: Option<Pixels<'static>>,
    session: Session<HighPrecisionTimer>,
    // dropped before the camera so a blocked send sees the hang-up
    source: ChannelFrameSource,
    _camera: Camera,
    capture_size: FrameSize,
    refresh_rate: Option<f64>,
    camera_lost: bool,
    should_exit: bool,
}

impl App {
    pub fn new(
        config: &ExperimentConfig,
        participant: ParticipantId,
        demographics: &Demographics,
        outputs: SessionOutputs,
    ) -> Result<Self> {
        let session = Session::start(
            config,
            participant,
            demographics,
            HighPrecisionTimer::new(),
            outputs,
        )?;

        let capture_size = FrameSize::new(config.video.width, config.video.height);
        let (producer, source) = frame_channel(CAPTURE_QUEUE);
        let camera = Camera::spawn(capture_size, config.video.nominal_fps, producer)?;

        Ok(Self {
            window: None,
            pixels: None,
            session,
            source,
            _camera: camera,
            capture_size,
            refresh_rate: None,
            camera_lost: false,
            should_exit: false,
        })
    }

    pub fn run(mut self) -> Result<()> {
        let event_loop = EventLoop::new()?;
        log::info!(
            "rhex on {} ({}), participant {}",
            std::env::consts::OS,
            std::env::consts::ARCH,
            self.session.participant()
        );
        log::info!("keys: SPACE proceed, P preview, BACKSPACE abort trial, ESC quit");

        let result = event_loop.run_app(&mut self);
        log::info!("capture: {}", self.session.capture_summary());
        result.map_err(Into::into)
    }

    fn create_window_and_surface(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let primary_monitor = event_loop
            .primary_monitor()
            .or_else(|| event_loop.available_monitors().next())
            .ok_or_else(|| anyhow::anyhow!("No monitor available"))?;

        self.refresh_rate = primary_monitor
            .refresh_rate_millihertz()
            .map(|rate| rate as f64 / 1000.0);

        let window_attributes = Window::default_attributes()
            .with_title("rhex")
            .with_fullscreen(Some(Fullscreen::Borderless(Some(primary_monitor))))
            .with_resizable(false);

        let window = Arc::new(event_loop.create_window(window_attributes)?);
        let physical_size = window.inner_size();

        log::info!(
            "display {}×{} at scale {:.2}{}",
            physical_size.width,
            physical_size.height,
            window.scale_factor(),
            self.refresh_rate
                .map(|hz| format!(", {hz:.1} Hz"))
                .unwrap_or_default()
        );

        // the buffer stays at capture size; pixels scales it to the surface
        let surface_texture =
            SurfaceTexture::new(physical_size.width, physical_size.height, window.clone());
        self.pixels = Some(Pixels::new(
            self.capture_size.width,
            self.capture_size.height,
            surface_texture,
        )?);

        window.set_cursor_visible(false);
        window.request_redraw();
        self.window = Some(window);
        Ok(())
    }

    /// Drains captured frames in order, then lets the runner look at the clock.
    fn update(&mut self) -> Result<()> {
        while self.source.poll() {
            if let Some(frame) = self.source.latest() {
                self.session.on_frame(frame)?;
            }
        }
        if self.source.is_disconnected() && !self.camera_lost {
            log::error!("camera stream ended; the display keeps the last frame");
            self.camera_lost = true;
        }

        let events = self.session.advance(Signal::Tick)?;
        self.report(&events);
        Ok(())
    }

    fn render(&mut self) -> Result<()> {
        let Some(pix) = self.pixels.as_mut() else {
            return Ok(());
        };
        let buffer = pix.frame_mut();
        let shown = self
            .source
            .latest()
            .and_then(|live| self.session.present(live));

        match shown {
            Some(frame) if frame.size() == self.capture_size => buffer.copy_from_slice(frame.data()),
            _ => {
                for px in buffer.chunks_exact_mut(4) {
                    px.copy_from_slice(&[0, 0, 0, 255]);
                }
            }
        }
        pix.render()?;
        Ok(())
    }

    fn report(&self, events: &[RunnerEvent]) {
        for event in events {
            match event {
                RunnerEvent::TrialReady { trial_id } => {
                    let (started, total) = self.session.runner().progress();
                    log::info!("[{started}/{total}] {trial_id}: press SPACE when ready");
                }
                RunnerEvent::ResponseRequested(form) => {
                    log::info!("waiting for {form:?} questionnaire on the console");
                }
                RunnerEvent::PracticeCompleted => log::info!("practice finished"),
                RunnerEvent::SessionComplete => {
                    log::info!("session complete, press ESC to quit");
                }
                other => log::debug!("{other:?}"),
            }
        }
    }

    fn handle_input(&mut self, key: PhysicalKey, event_loop: &ActiveEventLoop) {
        let PhysicalKey::Code(code) = key else {
            return;
        };
        let signal = match code {
            KeyCode::Space => Signal::Proceed,
            KeyCode::KeyP => Signal::TogglePreview,
            KeyCode::Backspace => Signal::Abort,
            KeyCode::Escape => {
                self.cleanup_and_exit(event_loop);
                return;
            }
            _ => return,
        };
        if signal == Signal::TogglePreview && self.session.capture_status() != CaptureStatus::Ready {
            log::warn!("no camera image to preview yet");
        }
        match self.session.advance(signal) {
            Ok(events) => self.report(&events),
            Err(e) => {
                log::error!("{e:#}");
                self.cleanup_and_exit(event_loop);
            }
        }
    }

    fn handle_resize(&mut self, width: u32, height: u32) {
        if let Some(pixels) = &mut self.pixels {
            if let Err(e) = pixels.resize_surface(width, height) {
                log::error!("Failed to resize surface: {e}");
            }
        }
        log::debug!("display resized to {width}×{height}");
    }

    fn cleanup_and_exit(&mut self, event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.set_cursor_visible(true);
        }
        let runner = self.session.runner();
        log::info!(
            "{}: {} trials saved, {} aborted{}",
            self.session.participant(),
            runner.trial_counter(),
            runner.aborted(),
            if runner.is_finished() { "" } else { ", session incomplete" }
        );
        self.should_exit = true;
        event_loop.exit();
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_none() {
            if let Err(e) = self.create_window_and_surface(event_loop) {
                log::error!("Failed to create window and surface: {e:#}");
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => self.cleanup_and_exit(event_loop),
            WindowEvent::RedrawRequested => {
                if let Err(e) = self.update().and_then(|_| self.render()) {
                    log::error!("{e:#}");
                    self.cleanup_and_exit(event_loop);
                    return;
                }
                if let Some(win) = &self.window {
                    win.request_redraw();
                }
            }
            WindowEvent::KeyboardInput { event, .. } if event.state.is_pressed() && !event.repeat => {
                self.handle_input(event.physical_key, event_loop);
            }
            WindowEvent::Resized(sz) => self.handle_resize(sz.width, sz.height),
            WindowEvent::ScaleFactorChanged { .. } => {
                if let Some(window) = &self.window {
                    let sz = window.inner_size();
                    self.handle_resize(sz.width, sz.height);
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.should_exit {
            event_loop.exit();
        }
    }
}
