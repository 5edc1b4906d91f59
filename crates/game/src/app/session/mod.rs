use ninja_engine::content::AssetError;
use ninja_engine::world::{Camera2D, WorldEvent};
use ninja_engine::{
    read_level, AppPaths, AssetTable, DrawList, ImageId, InputSnapshot, Scene, SceneCommand,
    Vec2, World, WorldError,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info};

use super::projectiles::Projectiles;

/// Steps after a death before the level restarts.
pub(crate) const RESPAWN_DELAY: u32 = 40;
/// Steps after a death before the fade-out starts.
const DEATH_FADE_DELAY: u32 = 10;
/// Length of the fade in and out around level loads.
pub(crate) const TRANSITION_STEPS: i32 = 30;
const PROJECTILE_ASSET_KEY: &str = "projectile";

#[derive(Debug, Clone)]
pub(crate) struct SessionConfig {
    pub(crate) paths: AppPaths,
    pub(crate) level_count: usize,
    pub(crate) start_level: usize,
    pub(crate) seed: u64,
    pub(crate) view_size: (u32, u32),
}

/// Game state around the world: level progression, death and respawn,
/// screenshake, the camera and enemy projectiles.
pub(crate) struct Session {
    config: SessionConfig,
    assets: AssetTable,
    projectile_image: ImageId,
    level: usize,
    loads: u64,
    world: Option<World>,
    camera: Camera2D,
    projectiles: Projectiles,
    dead: u32,
    deaths: u32,
    kills: u32,
    screenshake: f32,
    transition: i32,
    shake_rng: ChaCha8Rng,
}

impl Session {
    pub(crate) fn new(config: SessionConfig, assets: AssetTable) -> Result<Self, WorldError> {
        let projectile_image = assets
            .images(PROJECTILE_ASSET_KEY)?
            .images
            .first()
            .copied()
            .ok_or_else(|| AssetError::Empty {
                key: PROJECTILE_ASSET_KEY.to_string(),
            })?;
        Ok(Self {
            level: config.start_level,
            shake_rng: ChaCha8Rng::seed_from_u64(config.seed),
            config,
            assets,
            projectile_image,
            loads: 0,
            world: None,
            camera: Camera2D::default(),
            projectiles: Projectiles::default(),
            dead: 0,
            deaths: 0,
            kills: 0,
            screenshake: 0.0,
            transition: 0,
        })
    }

    pub(crate) fn level(&self) -> usize {
        self.level
    }

    pub(crate) fn deaths(&self) -> u32 {
        self.deaths
    }

    pub(crate) fn kills(&self) -> u32 {
        self.kills
    }

    fn load_level(&mut self, index: usize) -> Result<(), WorldError> {
        let path = self.config.paths.level_path(index);
        let level = read_level(&path)?;
        let world = World::new(&level, &self.assets, self.config.seed.wrapping_add(self.loads))?;

        let view = view_vec(self.config.view_size);
        self.camera.center_on(world.player().rect().center(), view);
        info!(
            level = index,
            path = %path.display(),
            enemies = world.enemies().len(),
            "level_started"
        );

        self.world = Some(world);
        self.level = index;
        self.loads += 1;
        self.projectiles.clear();
        self.dead = 0;
        self.transition = -TRANSITION_STEPS;
        Ok(())
    }

    fn handle_event(&mut self, event: WorldEvent) {
        match event {
            WorldEvent::PlaySfx(sfx) => debug!(sfx = sfx.name(), "play_sfx"),
            WorldEvent::Screenshake { intensity } => {
                self.screenshake = self.screenshake.max(intensity);
            }
            WorldEvent::SpawnProjectile { origin, velocity_x } => {
                self.projectiles.spawn(origin, velocity_x);
            }
            WorldEvent::PlayerDied => {
                if self.dead == 0 {
                    self.dead = 1;
                    self.deaths += 1;
                    info!(level = self.level, deaths = self.deaths, "player_died");
                }
            }
            WorldEvent::EnemyKilled { .. } => self.kills += 1,
        }
    }
}

#[cfg(test)]
impl Session {
    pub(crate) fn world(&self) -> Option<&World> {
        self.world.as_ref()
    }

    /// Steps since the player died, 0 while alive.
    pub(crate) fn dead_timer(&self) -> u32 {
        self.dead
    }

    pub(crate) fn screenshake(&self) -> f32 {
        self.screenshake
    }

    /// Negative while fading in, positive while fading out.
    pub(crate) fn transition(&self) -> i32 {
        self.transition
    }

    pub(crate) fn projectiles(&self) -> &Projectiles {
        &self.projectiles
    }
}

impl Scene for Session {
    fn load(&mut self) -> Result<(), WorldError> {
        self.load_level(self.config.start_level)
    }

    fn update(&mut self, input: &InputSnapshot) -> Result<SceneCommand, WorldError> {
        self.screenshake = (self.screenshake - 1.0).max(0.0);
        let Some(world) = self.world.as_mut() else {
            return Ok(SceneCommand::None);
        };

        if world.enemies().is_empty() {
            self.transition += 1;
            if self.transition > TRANSITION_STEPS {
                let next = (self.level + 1).min(self.config.level_count.saturating_sub(1));
                info!(level = self.level, next, "level_cleared");
                self.load_level(next)?;
                return Ok(SceneCommand::None);
            }
        }
        if self.transition < 0 {
            self.transition += 1;
        }

        if self.dead > 0 {
            self.dead += 1;
            if self.dead >= DEATH_FADE_DELAY {
                self.transition = (self.transition + 1).min(TRANSITION_STEPS);
            }
            if self.dead > RESPAWN_DELAY {
                self.load_level(self.level)?;
                return Ok(SceneCommand::None);
            }
        }

        world.apply_input(input);
        world.update();
        self.projectiles.update(world);
        let events = world.drain_events();
        for event in events {
            self.handle_event(event);
        }
        Ok(SceneCommand::None)
    }

    fn render(&mut self, frame: &mut DrawList) {
        let Some(world) = self.world.as_ref() else {
            return;
        };
        let view = view_vec(self.config.view_size);
        if world.player_active() {
            self.camera.follow(world.player().rect().center(), view);
        }

        let (scroll_x, scroll_y) = self.camera.render_scroll();
        let (shake_x, shake_y) = shake_offset(&mut self.shake_rng, self.screenshake);
        let offset = (scroll_x + shake_x, scroll_y + shake_y);
        world.render_into(frame, offset, self.config.view_size);
        let scroll = Vec2::new(offset.0 as f32, offset.1 as f32);
        self.projectiles.render(frame, self.projectile_image, scroll);
    }

    fn unload(&mut self) {
        self.world = None;
        self.projectiles.clear();
    }

    fn debug_title(&self) -> Option<String> {
        let world = self.world.as_ref()?;
        Some(format!(
            "level {} | enemies {} | shots {} | deaths {}",
            self.level,
            world.enemies().len(),
            self.projectiles.active().len(),
            self.deaths
        ))
    }
}

fn view_vec(view_size: (u32, u32)) -> Vec2 {
    Vec2::new(view_size.0 as f32, view_size.1 as f32)
}

/// Random render offset within `intensity / 2` of zero on each axis.
fn shake_offset<R: Rng + ?Sized>(rng: &mut R, intensity: f32) -> (i32, i32) {
    if intensity <= 0.0 {
        return (0, 0);
    }
    let x = rng.random::<f32>() * intensity - intensity / 2.0;
    let y = rng.random::<f32>() * intensity - intensity / 2.0;
    (x as i32, y as i32)
}
