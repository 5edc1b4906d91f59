mod animation;
mod camera;
mod clouds;
mod effects;
mod enemy;
mod events;
mod math;
mod physics;
mod player;
mod tilemap;

use std::collections::HashMap;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use thiserror::Error;
use tracing::{info, warn};

use crate::app::InputSnapshot;
use crate::content::{AssetError, AssetTable, ImageId, ImageSet, LevelError, LevelFile};
use crate::render::DrawList;

pub use animation::{Animation, AnimationTemplate, DEFAULT_FRAME_DURATION};
pub use camera::{Camera2D, CAMERA_FOLLOW_DIVISOR};
pub use clouds::{Cloud, Clouds, CLOUD_COUNT};
pub use effects::{EffectTemplates, Effects, Particle, ParticleKind, Spark};
pub use enemy::{Enemy, PATROL_SPEED, PROJECTILE_SPEED};
pub use events::{SfxId, WorldEvent, WorldEventBus, WorldEventKind};
pub use math::{Rect, Vec2};
pub use physics::{
    resolve_move, Action, AnimationSet, CollisionFlags, EntityKind, PhysicsBody, GRAVITY_ACCEL,
    MAX_FALL_SPEED, RENDER_OFFSET,
};
pub use player::{
    Player, DASH_ACTIVE_THRESHOLD, DASH_DURATION, DASH_SPEED, FALL_DEATH_AIR_TIME,
    MAX_JUMP_CHARGES,
};
pub use tilemap::{
    ExtractedTile, OffgridTile, Tile, TileCoord, TileKey, TileKind, Tilemap, NEIGHBOR_OFFSETS,
};

pub const PLAYER_SPAWN_VARIANT: u32 = 0;
pub const ENEMY_SPAWN_VARIANT: u32 = 1;
/// Trees that shed leaves.
pub const LEAF_TREE: (TileKind, u32) = (TileKind::LargeDecor, 2);
pub const DEATH_SHAKE: f32 = 16.0;

/// Leaf spawn area relative to the tree sprite origin.
const LEAF_AREA_INSET: Vec2 = Vec2::new(4.0, 4.0);
const LEAF_AREA_SIZE: Vec2 = Vec2::new(23.0, 13.0);
/// Per-step spawn odds are `area / LEAF_SPAWN_SCALE`.
const LEAF_SPAWN_SCALE: f32 = 49_999.0;
const LEAF_VELOCITY: Vec2 = Vec2::new(-0.1, 0.2);
const LEAF_MAX_START_FRAME: u32 = 20;
const FALLBACK_PLAYER_SPAWN: Vec2 = Vec2::new(50.0, 50.0);

#[derive(Debug, Error)]
pub enum WorldError {
    #[error(transparent)]
    Level(#[from] LevelError),
    #[error(transparent)]
    Asset(#[from] AssetError),
    #[error("tile kind '{kind}' has no art for variant {variant}")]
    MissingTileArt { kind: &'static str, variant: u32 },
}

#[derive(Debug, Clone)]
struct WorldArt {
    background: ImageSet,
    tiles: HashMap<TileKind, ImageSet>,
}

impl WorldArt {
    fn resolve(assets: &AssetTable) -> Result<Self, AssetError> {
        let mut tiles = HashMap::new();
        for kind in TileKind::ALL {
            tiles.insert(kind, assets.images(kind.asset_key())?.clone());
        }
        Ok(Self {
            background: assets.images("background")?.clone(),
            tiles,
        })
    }

    fn tile_image(&self, kind: TileKind, variant: u32) -> Option<ImageId> {
        self.tiles
            .get(&kind)
            .and_then(|set| set.images.get(variant as usize))
            .copied()
    }

    fn validate(&self, tilemap: &Tilemap) -> Result<(), WorldError> {
        let grid = tilemap.tiles().map(|tile| (tile.kind, tile.variant));
        let offgrid = tilemap.offgrid().iter().map(|tile| (tile.kind, tile.variant));
        for (kind, variant) in grid.chain(offgrid) {
            if self.tile_image(kind, variant).is_none() {
                return Err(WorldError::MissingTileArt {
                    kind: kind.asset_key(),
                    variant,
                });
            }
        }
        Ok(())
    }
}

/// Everything one loaded level simulates: the grid, the player, enemies and
/// effects, driven by a single seeded rng.
#[derive(Debug)]
pub struct World {
    tilemap: Tilemap,
    art: WorldArt,
    player: Player,
    player_active: bool,
    spawn_point: Vec2,
    enemies: Vec<Enemy>,
    effects: Effects,
    clouds: Clouds,
    leaf_spawners: Vec<Rect>,
    movement: Vec2,
    events: WorldEventBus,
    rng: ChaCha8Rng,
}

impl World {
    pub fn new(level: &LevelFile, assets: &AssetTable, seed: u64) -> Result<Self, WorldError> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut tilemap = Tilemap::load(level)?;
        tilemap.autotile();

        let leaf_spawners = tilemap
            .extract(&[LEAF_TREE], true)
            .into_iter()
            .map(|tree| Rect::from_origin_size(tree.pos + LEAF_AREA_INSET, LEAF_AREA_SIZE))
            .collect::<Vec<_>>();

        let player_animations = AnimationSet::resolve(assets, EntityKind::Player)?;
        let enemy_animations = AnimationSet::resolve(assets, EntityKind::Enemy)?;
        let effects = Effects::new(EffectTemplates::resolve(assets)?);
        let clouds = Clouds::new(assets.images("clouds")?, CLOUD_COUNT, &mut rng);
        let art = WorldArt::resolve(assets)?;

        let spawners = tilemap.extract(
            &[
                (TileKind::Spawners, PLAYER_SPAWN_VARIANT),
                (TileKind::Spawners, ENEMY_SPAWN_VARIANT),
            ],
            false,
        );
        let mut spawn_point = None;
        let mut enemies = Vec::new();
        for spawner in spawners {
            if spawner.variant != PLAYER_SPAWN_VARIANT {
                enemies.push(Enemy::new(spawner.pos, enemy_animations.clone()));
            } else if spawn_point.is_none() {
                spawn_point = Some(spawner.pos);
            }
        }
        let spawn_point = spawn_point.unwrap_or_else(|| {
            warn!(x = FALLBACK_PLAYER_SPAWN.x, y = FALLBACK_PLAYER_SPAWN.y, "player_spawn_missing");
            FALLBACK_PLAYER_SPAWN
        });

        art.validate(&tilemap)?;

        info!(
            tiles = tilemap.tile_count(),
            offgrid = tilemap.offgrid().len(),
            enemies = enemies.len(),
            leaf_spawners = leaf_spawners.len(),
            seed,
            "level_loaded"
        );

        Ok(Self {
            tilemap,
            art,
            player: Player::new(spawn_point, player_animations),
            player_active: true,
            spawn_point,
            enemies,
            effects,
            clouds,
            leaf_spawners,
            movement: Vec2::ZERO,
            events: WorldEventBus::default(),
            rng,
        })
    }

    pub fn tilemap(&self) -> &Tilemap {
        &self.tilemap
    }

    pub fn player(&self) -> &Player {
        &self.player
    }

    pub fn player_active(&self) -> bool {
        self.player_active
    }

    pub fn spawn_point(&self) -> Vec2 {
        self.spawn_point
    }

    pub fn enemies(&self) -> &[Enemy] {
        &self.enemies
    }

    pub fn effects(&self) -> &Effects {
        &self.effects
    }

    pub fn effects_mut(&mut self) -> &mut Effects {
        &mut self.effects
    }

    pub fn clouds(&self) -> &Clouds {
        &self.clouds
    }

    pub fn leaf_spawners(&self) -> &[Rect] {
        &self.leaf_spawners
    }

    pub fn rng(&mut self) -> &mut ChaCha8Rng {
        &mut self.rng
    }

    /// Held movement takes effect on the next `update`; jump and dash fire
    /// immediately.
    pub fn apply_input(&mut self, input: &InputSnapshot) {
        self.movement = Vec2::new(input.movement_x(), 0.0);
        if !self.player_active {
            return;
        }
        if input.jump_pressed() {
            self.player.jump(&mut self.events);
        }
        if input.dash_pressed() {
            self.player.dash(&mut self.events);
        }
    }

    pub fn update(&mut self) {
        self.clouds.update();
        self.spawn_leaves();

        if self.player_active {
            let fell = self.player.update(
                &self.tilemap,
                self.movement,
                &mut self.effects,
                &mut self.events,
                &mut self.rng,
            );
            if fell {
                self.player_active = false;
            }
        }

        let Self {
            tilemap,
            player,
            enemies,
            effects,
            events,
            rng,
            ..
        } = self;
        enemies.retain_mut(|enemy| !enemy.update(tilemap, player, effects, events, rng));

        self.effects.update();
    }

    fn spawn_leaves(&mut self) {
        for rect in &self.leaf_spawners {
            if self.rng.random::<f32>() * LEAF_SPAWN_SCALE >= rect.w * rect.h {
                continue;
            }
            let pos = Vec2::new(
                rect.x + self.rng.random::<f32>() * rect.w,
                rect.y + self.rng.random::<f32>() * rect.h,
            );
            let start_frame = self.rng.random_range(0..=LEAF_MAX_START_FRAME);
            self.effects
                .spawn_particle(ParticleKind::Leaf, pos, LEAF_VELOCITY, start_frame);
        }
    }

    /// Sparks and particles thrown out from `center`, shared by every kind
    /// of hit.
    pub fn hit_burst(&mut self, center: Vec2) {
        self.effects.hit_burst(&mut self.rng, center);
    }

    /// Kills the player from outside the world (projectile hit). Returns
    /// false if the player was already down.
    pub fn kill_player(&mut self) -> bool {
        if !self.player_active {
            return false;
        }
        self.player_active = false;
        let center = self.player.rect().center();
        self.hit_burst(center);
        self.events.emit(WorldEvent::Screenshake {
            intensity: DEATH_SHAKE,
        });
        self.events.emit(WorldEvent::PlaySfx(SfxId::Hit));
        self.events.emit(WorldEvent::PlayerDied);
        true
    }

    pub fn events(&self) -> &WorldEventBus {
        &self.events
    }

    pub fn drain_events(&mut self) -> Vec<WorldEvent> {
        self.events.drain()
    }

    pub fn render(&self, offset: (i32, i32), view_size: (u32, u32)) -> DrawList {
        let mut frame = DrawList::new();
        self.render_into(&mut frame, offset, view_size);
        frame
    }

    /// Appends this frame's commands back to front: background, clouds,
    /// decor, tiles, enemies, player, particles, sparks.
    pub fn render_into(&self, frame: &mut DrawList, offset: (i32, i32), view_size: (u32, u32)) {
        let scroll = Vec2::new(offset.0 as f32, offset.1 as f32);
        let view = Vec2::new(view_size.0 as f32, view_size.1 as f32);

        if let Some(&background) = self.art.background.images.first() {
            frame.image(background, Vec2::ZERO, false);
        }
        for cloud in self.clouds.clouds() {
            let pos = cloud.screen_pos(scroll, view, self.clouds.image_size());
            frame.image(cloud.image(), pos, false);
        }

        for tile in self.tilemap.offgrid() {
            if let Some(image) = self.art.tile_image(tile.kind, tile.variant) {
                frame.image(image, tile.pixel_pos() - scroll, false);
            }
        }
        for tile in self.tilemap.visible_tiles(offset, view_size) {
            if let Some(image) = self.art.tile_image(tile.kind, tile.variant) {
                let origin = self.tilemap.cell_rect(tile.pos).origin();
                frame.image(image, origin - scroll, false);
            }
        }

        for enemy in &self.enemies {
            render_body(frame, enemy.body(), scroll);
        }
        if self.player_active && self.player.is_visible() {
            render_body(frame, self.player.body(), scroll);
        }

        for particle in self.effects.particles() {
            if let Some(image) = particle.current_image() {
                frame.image_centered(image, particle.pos() - scroll);
            }
        }
        for spark in self.effects.sparks() {
            frame.polygon(spark.polygon().map(|point| point - scroll));
        }
    }
}

fn render_body(frame: &mut DrawList, body: &PhysicsBody, scroll: Vec2) {
    if let Some(image) = body.current_image() {
        frame.image(image, body.pos() - scroll + RENDER_OFFSET, body.flip());
    }
}
