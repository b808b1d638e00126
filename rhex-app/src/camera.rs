use anyhow::{Context, Result};
use rhex_timing::{HighPrecisionTimer, Timer};
use rhex_video::{Frame, FrameProducer, FrameSize};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tiny_skia::{Color, FillRule, Paint, PathBuilder, Pixmap, Rect, Transform};

/// Frames delivered at placeholder size before the real stream starts,
/// like webcam backends that report 16×16 until the device is open.
const PLACEHOLDER_FRAMES: u64 = 5;
const PLACEHOLDER: FrameSize = FrameSize::new(16, 16);

/// Test-pattern camera: a bright disc sweeping left and right over a dark
/// background, with a strip along the top that advances once per frame.
/// Delayed playback is easy to judge by eye against the live view.
struct Scene {
    pixmap: Pixmap,
    fps: u32,
}

impl Scene {
    fn new(size: FrameSize, fps: u32) -> Option<Self> {
        Some(Self {
            pixmap: Pixmap::new(size.width, size.height)?,
            fps,
        })
    }

    fn draw(&mut self, sequence: u64, frame: &mut Frame) -> Result<()> {
        let w = self.pixmap.width() as f32;
        let h = self.pixmap.height() as f32;
        let t = sequence as f32 / self.fps as f32;

        self.pixmap.fill(Color::from_rgba8(32, 32, 36, 255));

        let mut paint = Paint::default();
        paint.set_color(Color::from_rgba8(230, 190, 160, 255));
        let radius = h * 0.12;
        let cx = w * 0.5 + (t * std::f32::consts::PI).sin() * w * 0.35;
        let mut pb = PathBuilder::new();
        pb.push_circle(cx, h * 0.5, radius);
        let disc = pb.finish().context("building disc path")?;
        self.pixmap
            .fill_path(&disc, &paint, FillRule::Winding, Transform::identity(), None);

        paint.set_color(Color::from_rgba8(80, 200, 120, 255));
        let strip_w = w * ((sequence % self.fps as u64) as f32 + 1.0) / self.fps as f32;
        if let Some(strip) = Rect::from_xywh(0.0, 0.0, strip_w, 6.0) {
            self.pixmap.fill_rect(strip, &paint, Transform::identity(), None);
        }

        // opaque, so premultiplied RGBA is plain RGBA
        frame.data_mut().copy_from_slice(self.pixmap.data());
        Ok(())
    }
}

/// Running capture thread. Dropping it stops and joins the thread.
pub struct Camera {
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl Camera {
    pub fn spawn(size: FrameSize, fps: u32, producer: FrameProducer) -> Result<Self> {
        let mut scene = Scene::new(size, fps)
            .with_context(|| format!("cannot allocate a {size} camera image"))?;
        let stop = Arc::new(AtomicBool::new(false));
        let flag = stop.clone();

        let thread = thread::Builder::new()
            .name("camera".into())
            .spawn(move || {
                if let Err(e) = run(&mut scene, size, fps, &producer, &flag) {
                    log::error!("camera stopped: {e:#}");
                }
            })
            .context("spawning camera thread")?;

        log::info!("synthetic camera {size} at {fps} fps");
        Ok(Self {
            stop,
            thread: Some(thread),
        })
    }
}

fn run(
    scene: &mut Scene,
    size: FrameSize,
    fps: u32,
    producer: &FrameProducer,
    stop: &AtomicBool,
) -> Result<()> {
    let timer = HighPrecisionTimer::new();
    let period = Duration::from_secs_f64(1.0 / fps.max(1) as f64);
    let mut next_due = Duration::ZERO;
    let mut sequence = 0u64;

    while !stop.load(Ordering::Relaxed) {
        let mut frame = if sequence < PLACEHOLDER_FRAMES {
            let mut f = producer.buffer(PLACEHOLDER);
            f.fill([0, 0, 0, 255]);
            f
        } else {
            let mut f = producer.buffer(size);
            scene.draw(sequence, &mut f)?;
            f
        };
        frame.set_sequence(sequence);

        if producer.send(frame).is_err() {
            log::debug!("display side closed after {sequence} frames");
            break;
        }
        sequence += 1;

        next_due += period;
        let now = Duration::from_nanos(timer.now());
        if next_due > now {
            timer.sleep(next_due - now);
        }
    }
    Ok(())
}

impl Drop for Camera {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                log::error!("camera thread panicked");
            }
        }
    }
}
