use std::process::ExitCode;

use ninja_engine::{run_app, DrawCommand, DrawList, Renderer};
use tracing::{error, info, warn};

use super::assets_manifest::LoadedAssets;
use super::bootstrap::AppWiring;

/// Stand-in for a window: checks every frame against the asset manifest and
/// keeps draw statistics.
#[derive(Debug)]
pub(crate) struct HeadlessRenderer {
    assets: LoadedAssets,
    frames: u64,
    images: u64,
    polygons: u64,
    unknown_images: u64,
}

impl HeadlessRenderer {
    pub(crate) fn new(assets: LoadedAssets) -> Self {
        Self {
            assets,
            frames: 0,
            images: 0,
            polygons: 0,
            unknown_images: 0,
        }
    }

    pub(crate) fn frames(&self) -> u64 {
        self.frames
    }

    pub(crate) fn unknown_images(&self) -> u64 {
        self.unknown_images
    }

    fn log_summary(&self) {
        info!(
            frames = self.frames,
            images = self.images,
            polygons = self.polygons,
            unknown_images = self.unknown_images,
            "renderer_summary"
        );
    }
}

impl Renderer for HeadlessRenderer {
    fn present(&mut self, frame: &DrawList) {
        self.frames += 1;
        for command in frame.commands() {
            match command {
                DrawCommand::Image { image, .. } => {
                    self.images += 1;
                    if self.assets.image_path(*image).is_none() {
                        if self.unknown_images == 0 {
                            warn!(image = image.0, frame = self.frames, "unknown_image_drawn");
                        }
                        self.unknown_images += 1;
                    }
                }
                DrawCommand::Polygon { .. } => self.polygons += 1,
            }
        }
    }
}

pub(crate) fn run(mut app: AppWiring) -> ExitCode {
    let result = run_app(
        app.config,
        &mut app.session,
        app.input.as_mut(),
        &mut app.renderer,
    );
    app.renderer.log_summary();
    if app.renderer.unknown_images() > 0 {
        warn!(
            count = app.renderer.unknown_images(),
            frames = app.renderer.frames(),
            "manifest_missing_drawn_images"
        );
    }
    let summary = match result {
        Ok(summary) => summary,
        Err(err) => {
            error!(error = %err, "run_failed");
            return ExitCode::FAILURE;
        }
    };
    info!(
        level = app.session.level(),
        deaths = app.session.deaths(),
        kills = app.session.kills(),
        ticks = summary.ticks,
        clamped_frames = summary.clamped_frames,
        reason = summary.stop_reason.name(),
        "session_summary"
    );
    if summary.clamped_frames > 0 {
        warn!(
            clamped_frames = summary.clamped_frames,
            frames = summary.frames,
            "simulation_fell_behind"
        );
    }

    ExitCode::SUCCESS
}
