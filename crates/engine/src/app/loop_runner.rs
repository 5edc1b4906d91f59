use std::thread;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::render::{DrawList, Renderer};
use crate::world::WorldError;
use crate::StartupError;

use super::metrics::MetricsAccumulator;
use super::{InputSource, Scene, SceneCommand};

#[derive(Debug, Clone)]
pub struct LoopConfig {
    pub target_tps: u32,
    pub max_frame_delta: Duration,
    pub max_ticks_per_frame: u32,
    pub metrics_log_interval: Duration,
    /// Stop after this many simulation ticks.
    pub max_ticks: Option<u64>,
    /// Pace frames against the wall clock; otherwise run one tick per frame
    /// as fast as possible.
    pub realtime: bool,
    pub view_size: (u32, u32),
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            target_tps: 60,
            max_frame_delta: Duration::from_millis(250),
            max_ticks_per_frame: 5,
            metrics_log_interval: Duration::from_secs(1),
            max_ticks: None,
            realtime: true,
            view_size: (320, 240),
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Startup(#[from] StartupError),
    #[error("scene failed: {0}")]
    Scene(#[from] WorldError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    TickLimit,
    QuitRequested,
    SceneQuit,
}

impl StopReason {
    pub fn name(self) -> &'static str {
        match self {
            StopReason::TickLimit => "tick_limit",
            StopReason::QuitRequested => "quit_requested",
            StopReason::SceneQuit => "scene_quit",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopSummary {
    pub ticks: u64,
    pub frames: u64,
    /// Frames that dropped simulation backlog.
    pub clamped_frames: u64,
    pub stop_reason: StopReason,
}

pub fn run_app(
    config: LoopConfig,
    scene: &mut dyn Scene,
    input: &mut dyn InputSource,
    renderer: &mut dyn Renderer,
) -> Result<LoopSummary, AppError> {
    let target_tps = config.target_tps.max(1);
    let max_frame_delta =
        normalize_non_zero_duration(config.max_frame_delta, Duration::from_millis(250));
    let max_ticks_per_frame = config.max_ticks_per_frame.max(1);
    let metrics_log_interval =
        normalize_non_zero_duration(config.metrics_log_interval, Duration::from_secs(1));
    let fixed_dt = Duration::from_secs_f64(1.0 / target_tps as f64);

    scene.load()?;
    info!(
        target_tps,
        max_frame_delta_ms = max_frame_delta.as_millis() as u64,
        max_ticks_per_frame,
        metrics_log_interval_ms = metrics_log_interval.as_millis() as u64,
        max_ticks = config.max_ticks.unwrap_or(0),
        realtime = config.realtime,
        view_width = config.view_size.0,
        view_height = config.view_size.1,
        "loop_config"
    );

    let mut accumulator = Duration::ZERO;
    let mut last_frame_instant = Instant::now();
    let mut metrics = MetricsAccumulator::new(metrics_log_interval, last_frame_instant);
    let mut frame = DrawList::new();
    let mut frames = 0u64;
    let mut last_title: Option<String> = None;

    let stop_reason = 'frames: loop {
        let frame_start = Instant::now();
        let raw_frame_dt = if config.realtime {
            frame_start.saturating_duration_since(last_frame_instant)
        } else {
            fixed_dt
        };
        last_frame_instant = frame_start;

        accumulator = accumulator.saturating_add(clamp_frame_delta(raw_frame_dt, max_frame_delta));
        let step_plan = plan_sim_steps(accumulator, fixed_dt, max_ticks_per_frame);
        accumulator = step_plan.remaining_accumulator;

        for _ in 0..step_plan.ticks_to_run {
            if config
                .max_ticks
                .is_some_and(|limit| metrics.total_ticks() >= limit)
            {
                break 'frames StopReason::TickLimit;
            }
            let snapshot = input.snapshot_for_tick(metrics.total_ticks());
            if snapshot.quit_requested() {
                break 'frames StopReason::QuitRequested;
            }
            let command = scene.update(&snapshot)?;
            metrics.record_tick();
            if command == SceneCommand::Quit {
                break 'frames StopReason::SceneQuit;
            }
        }

        let clamped = step_plan.dropped_backlog > Duration::ZERO;
        if clamped {
            warn!(
                dropped_backlog_ms = step_plan.dropped_backlog.as_millis() as u64,
                max_ticks_per_frame, "sim_clamp_triggered"
            );
        }

        frame.clear();
        scene.render(&mut frame);
        renderer.present(&frame);
        frames = frames.saturating_add(1);
        metrics.record_frame(raw_frame_dt, clamped);

        let title = scene.debug_title();
        if title != last_title {
            if let Some(title) = &title {
                debug!(title = title.as_str(), "scene_title");
            }
            last_title = title;
        }

        let now = Instant::now();
        if let Some(snapshot) = metrics.maybe_snapshot(now) {
            info!(
                fps = snapshot.fps,
                tps = snapshot.tps,
                frame_time_ms = snapshot.frame_time_ms,
                clamped_frames = snapshot.clamped_frames,
                total_ticks = snapshot.total_ticks,
                "loop_metrics"
            );
        }

        if config.realtime {
            let frame_elapsed = now.saturating_duration_since(frame_start);
            let pacing_sleep = compute_pacing_sleep(frame_elapsed, fixed_dt);
            if pacing_sleep > Duration::ZERO {
                thread::sleep(pacing_sleep);
            }
        }
    };

    scene.unload();
    let summary = LoopSummary {
        ticks: metrics.total_ticks(),
        frames,
        clamped_frames: metrics.total_clamped_frames(),
        stop_reason,
    };
    info!(
        ticks = summary.ticks,
        frames = summary.frames,
        clamped_frames = summary.clamped_frames,
        reason = stop_reason.name(),
        "shutdown"
    );
    Ok(summary)
}

#[derive(Debug, Clone, Copy)]
struct StepPlan {
    ticks_to_run: u32,
    remaining_accumulator: Duration,
    dropped_backlog: Duration,
}

/// Consumes whole ticks from the accumulator, at most `max_ticks_per_frame`.
/// Backlog beyond the cap is dropped rather than carried forward.
fn plan_sim_steps(
    mut accumulator: Duration,
    fixed_dt: Duration,
    max_ticks_per_frame: u32,
) -> StepPlan {
    let mut ticks_to_run = 0u32;
    while accumulator >= fixed_dt && ticks_to_run < max_ticks_per_frame {
        accumulator = accumulator.saturating_sub(fixed_dt);
        ticks_to_run = ticks_to_run.saturating_add(1);
    }

    let dropped_backlog = if accumulator >= fixed_dt {
        std::mem::take(&mut accumulator)
    } else {
        Duration::ZERO
    };
    StepPlan {
        ticks_to_run,
        remaining_accumulator: accumulator,
        dropped_backlog,
    }
}

fn clamp_frame_delta(frame_dt: Duration, max_frame_delta: Duration) -> Duration {
    frame_dt.min(max_frame_delta)
}

fn normalize_non_zero_duration(value: Duration, fallback: Duration) -> Duration {
    if value.is_zero() {
        fallback
    } else {
        value
    }
}

fn compute_pacing_sleep(elapsed: Duration, target: Duration) -> Duration {
    target.saturating_sub(elapsed)
}
