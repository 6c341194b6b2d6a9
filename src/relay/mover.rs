//! Anti-idle mouse mover
//!
//! Draws small pointer patterns through the mouse gadget to keep the host
//! awake. Toggled by tapping a trigger key several times in a short window.
//! The mover writes motion regardless of the activation flag so it keeps
//! working while normal relaying is paused.

use std::collections::VecDeque;
use std::f64::consts::TAU;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use rand::seq::SliceRandom;
use rand::Rng;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::MoverConfig;
use crate::gadget::GadgetManager;

/// Counts key taps inside a sliding window
pub struct TapTracker {
    window: Duration,
    required: usize,
    taps: VecDeque<Instant>,
}

impl TapTracker {
    pub fn new(required: usize, window: Duration) -> Self {
        Self {
            window,
            required,
            taps: VecDeque::new(),
        }
    }

    /// Record a tap at `now`. Returns true when the threshold is reached; the
    /// tap history is cleared so the next trigger needs a fresh run of taps.
    pub fn record(&mut self, now: Instant) -> bool {
        while let Some(&oldest) = self.taps.front() {
            if now.duration_since(oldest) > self.window {
                self.taps.pop_front();
            } else {
                break;
            }
        }
        self.taps.push_back(now);
        if self.taps.len() >= self.required {
            self.taps.clear();
            true
        } else {
            false
        }
    }
}

/// The three basic movement shapes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Circle,
    Zigzag,
    Square,
}

const ALL_SHAPES: [Shape; 3] = [Shape::Circle, Shape::Zigzag, Shape::Square];

/// Upper bound on waiting for the mover task to unwind after an abort
const STOP_TIMEOUT: Duration = Duration::from_secs(1);

/// Configured pattern selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternChoice {
    Fixed(Shape),
    /// Rotate through all three shapes, time-sliced
    Mix,
    /// Pick a random shape, re-picking on an interval
    Random,
}

impl PatternChoice {
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "circle" => Some(PatternChoice::Fixed(Shape::Circle)),
            "zigzag" => Some(PatternChoice::Fixed(Shape::Zigzag)),
            "square" => Some(PatternChoice::Fixed(Shape::Square)),
            "mix" => Some(PatternChoice::Mix),
            "random" => Some(PatternChoice::Random),
            _ => None,
        }
    }
}

/// Point on a circle of the given radius, `step` of `steps` around.
pub fn circle_point(step: u32, steps: u32, radius: f64) -> (f64, f64) {
    let angle = TAU * f64::from(step) / f64::from(steps.max(1));
    (radius * angle.cos(), radius * angle.sin())
}

/// Point on a four-peak zigzag sweep across `width`.
pub fn zigzag_point(step: u32, steps: u32, width: f64, height: f64) -> (f64, f64) {
    let t = f64::from(step) / f64::from(steps.max(1));
    let x = width * t;
    let phase = (t * 4.0).fract();
    let y = if phase < 0.5 {
        height * phase * 2.0
    } else {
        height * (2.0 - phase * 2.0)
    };
    (x, y)
}

/// Point on the perimeter of a square with the given side length.
pub fn square_point(step: u32, steps: u32, size: f64) -> (f64, f64) {
    let t = f64::from(step) / f64::from(steps.max(1));
    let d = 4.0 * size * t;
    if d < size {
        (d, 0.0)
    } else if d < 2.0 * size {
        (size, d - size)
    } else if d < 3.0 * size {
        (size - (d - 2.0 * size), size)
    } else {
        (0.0, size - (d - 3.0 * size))
    }
}

fn sample_range_f64(range: [f64; 2]) -> f64 {
    if range[0] >= range[1] {
        return range[0];
    }
    rand::thread_rng().gen_range(range[0]..=range[1])
}

fn sample_range_u32(range: [u32; 2]) -> u32 {
    if range[0] >= range[1] {
        return range[0].max(1);
    }
    rand::thread_rng().gen_range(range[0]..=range[1])
}

fn random_shape() -> Shape {
    *ALL_SHAPES
        .choose(&mut rand::thread_rng())
        .unwrap_or(&Shape::Circle)
}

/// Plan for one traced cycle of a shape
struct Cycle {
    steps: u32,
    delay: Duration,
    point: Box<dyn Fn(u32) -> (f64, f64) + Send>,
}

fn plan_cycle(shape: Shape, cfg: &MoverConfig) -> Cycle {
    match shape {
        Shape::Circle => {
            let radius = sample_range_f64(cfg.circle.radius);
            let steps = sample_range_u32(cfg.circle.steps);
            Cycle {
                steps,
                delay: Duration::from_millis(cfg.circle.delay_ms),
                point: Box::new(move |s| circle_point(s, steps, radius)),
            }
        }
        Shape::Zigzag => {
            let width = sample_range_f64(cfg.zigzag.width);
            let height = sample_range_f64(cfg.zigzag.height);
            let steps = sample_range_u32(cfg.zigzag.steps);
            Cycle {
                steps,
                delay: Duration::from_millis(cfg.zigzag.delay_ms),
                point: Box::new(move |s| zigzag_point(s, steps, width, height)),
            }
        }
        Shape::Square => {
            let size = sample_range_f64(cfg.square.size);
            let steps = sample_range_u32(cfg.square.steps);
            Cycle {
                steps,
                delay: Duration::from_millis(cfg.square.delay_ms),
                point: Box::new(move |s| square_point(s, steps, size)),
            }
        }
    }
}

/// Background pointer mover, one shared instance per process
pub struct MouseMover {
    gadgets: Arc<GadgetManager>,
    cfg: MoverConfig,
    active: Arc<AtomicBool>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl MouseMover {
    pub fn new(gadgets: Arc<GadgetManager>, cfg: MoverConfig) -> Self {
        Self {
            gadgets,
            cfg,
            active: Arc::new(AtomicBool::new(false)),
            task: Mutex::new(None),
        }
    }

    pub fn is_running(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Flip the mover on or off.
    pub async fn toggle(&self) {
        if self.is_running() {
            self.stop().await;
        } else {
            self.start();
        }
    }

    pub fn start(&self) {
        if self.active.swap(true, Ordering::AcqRel) {
            return;
        }
        // drop anything held on the host so trigger taps don't leave a key stuck
        if let Some(keyboard) = self.gadgets.keyboard() {
            if let Err(e) = keyboard.release_all() {
                warn!("failed to release keyboard before moving: {e}");
            }
        }
        info!("mouse mover started (pattern {:?})", self.cfg.default_pattern);

        let gadgets = self.gadgets.clone();
        let cfg = self.cfg.clone();
        let active = self.active.clone();
        let handle = tokio::spawn(mover_loop(gadgets, cfg, active));
        if let Some(old) = self.task.lock().replace(handle) {
            old.abort();
        }
    }

    /// Stop the mover and wait (bounded) for its task to end, so no motion
    /// report is in flight once this returns.
    pub async fn stop(&self) {
        let was_running = self.active.swap(false, Ordering::AcqRel);
        let handle = self.task.lock().take();
        if let Some(handle) = handle {
            handle.abort();
            if tokio::time::timeout(STOP_TIMEOUT, handle).await.is_err() {
                warn!("mover task did not end within {STOP_TIMEOUT:?}");
            }
        }
        if was_running {
            info!("mouse mover stopped");
        }
    }
}

async fn mover_loop(gadgets: Arc<GadgetManager>, cfg: MoverConfig, active: Arc<AtomicBool>) {
    let choice = PatternChoice::parse(&cfg.default_pattern).unwrap_or_else(|| {
        warn!(
            "unknown mover pattern {:?}, falling back to random",
            cfg.default_pattern
        );
        PatternChoice::Random
    });

    let reselect_interval = Duration::from_secs(cfg.random_pattern_change_interval_secs);
    let mix_slice = Duration::from_secs(cfg.mix.duration_per_pattern_secs.max(1));
    let mut current = match choice {
        PatternChoice::Fixed(shape) => shape,
        PatternChoice::Mix => Shape::Circle,
        PatternChoice::Random => random_shape(),
    };
    let mut shape_since = Instant::now();
    let mut mix_index = 0usize;
    let mut consecutive_errors = 0u32;

    while active.load(Ordering::Acquire) {
        match choice {
            PatternChoice::Random if shape_since.elapsed() >= reselect_interval => {
                current = random_shape();
                shape_since = Instant::now();
                debug!("mover switched to {current:?}");
            }
            PatternChoice::Mix if shape_since.elapsed() >= mix_slice => {
                mix_index = (mix_index + 1) % ALL_SHAPES.len();
                current = ALL_SHAPES[mix_index];
                shape_since = Instant::now();
                debug!("mover switched to {current:?}");
            }
            _ => {}
        }

        let cycle = plan_cycle(current, &cfg);
        let mut sent = (0i64, 0i64);
        for step in 1..=cycle.steps {
            if !active.load(Ordering::Acquire) {
                return;
            }
            let (x, y) = (cycle.point)(step);
            let dx = (x.round() as i64) - sent.0;
            let dy = (y.round() as i64) - sent.1;
            sent.0 += dx;
            sent.1 += dy;

            let result = match gadgets.mouse() {
                Some(mouse) => mouse.move_rel(dx as i32, dy as i32, 0),
                None => {
                    warn!("mouse gadget unavailable, stopping mover");
                    active.store(false, Ordering::Release);
                    return;
                }
            };
            match result {
                Ok(()) => consecutive_errors = 0,
                Err(e) => {
                    consecutive_errors += 1;
                    debug!("mover write failed ({consecutive_errors}): {e}");
                    if consecutive_errors >= cfg.max_consecutive_errors {
                        warn!("mouse mover stopping after {consecutive_errors} consecutive write failures");
                        active.store(false, Ordering::Release);
                        return;
                    }
                }
            }
            tokio::time::sleep(cycle.delay).await;
        }
    }
}
