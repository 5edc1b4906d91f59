use std::f32::consts::PI;

use rand::Rng;
use tracing::info;

use super::effects::Effects;
use super::events::{SfxId, WorldEvent, WorldEventBus};
use super::math::{Rect, Vec2};
use super::physics::{Action, AnimationSet, EntityKind, PhysicsBody};
use super::player::Player;
use super::tilemap::Tilemap;

pub const PATROL_SPEED: f32 = 0.5;
pub const PATROL_START_CHANCE: f64 = 0.01;
pub const PATROL_MIN_STEPS: u32 = 30;
pub const PATROL_MAX_STEPS: u32 = 120;
pub const PROJECTILE_SPEED: f32 = 1.5;
pub const KILL_SHAKE: f32 = 16.0;

/// Horizontal reach of the ground probe and the muzzle from the box center.
const PROBE_REACH: f32 = 7.0;
/// Measured from the box top; lands in the cell under the feet.
const PROBE_DEPTH: f32 = 23.0;
const LINE_OF_SIGHT_HEIGHT: f32 = 16.0;
const MUZZLE_SPARKS: usize = 4;

#[derive(Debug, Clone)]
pub struct Enemy {
    body: PhysicsBody,
    patrol_timer: u32,
}

impl Enemy {
    pub fn new(pos: Vec2, animations: AnimationSet) -> Self {
        Self {
            body: PhysicsBody::new(EntityKind::Enemy, pos, animations),
            patrol_timer: 0,
        }
    }

    pub fn body(&self) -> &PhysicsBody {
        &self.body
    }

    pub fn pos(&self) -> Vec2 {
        self.body.pos()
    }

    pub fn rect(&self) -> Rect {
        self.body.rect()
    }

    pub fn patrol_timer(&self) -> u32 {
        self.patrol_timer
    }

    pub fn start_patrol(&mut self, steps: u32) {
        self.patrol_timer = steps;
    }

    /// Advances one step against the already-updated player. Returns true
    /// when a dashing player ran through this enemy; the caller removes it.
    pub fn update<R: Rng + ?Sized>(
        &mut self,
        grid: &Tilemap,
        player: &Player,
        effects: &mut Effects,
        events: &mut WorldEventBus,
        rng: &mut R,
    ) -> bool {
        let mut movement = Vec2::ZERO;

        if self.patrol_timer > 0 {
            movement.x = self.patrol(grid);
            self.patrol_timer -= 1;
            if self.patrol_timer == 0 {
                self.try_shoot(player, effects, events, rng);
            }
        } else if rng.random_bool(PATROL_START_CHANCE) {
            self.patrol_timer = rng.random_range(PATROL_MIN_STEPS..=PATROL_MAX_STEPS);
        }

        self.body.step(grid, movement);
        if movement.x != 0.0 {
            self.body.set_action(Action::Run);
        } else {
            self.body.set_action(Action::Idle);
        }

        if player.is_dashing() && self.rect().overlaps(&player.rect()) {
            let center = self.rect().center();
            effects.hit_burst(rng, center);
            events.emit(WorldEvent::Screenshake {
                intensity: KILL_SHAKE,
            });
            events.emit(WorldEvent::PlaySfx(SfxId::Hit));
            events.emit(WorldEvent::EnemyKilled { position: center });
            info!(x = center.x, y = center.y, "enemy_killed");
            return true;
        }
        false
    }

    /// Walks toward the ledge ahead and turns around at walls and drops.
    /// Contact flags are the ones left over from the previous step.
    fn patrol(&mut self, grid: &Tilemap) -> f32 {
        let rect = self.rect();
        let reach = if self.body.flip { -PROBE_REACH } else { PROBE_REACH };
        let probe = Vec2::new(rect.center().x + reach, self.body.pos.y + PROBE_DEPTH);

        if !grid.is_solid_at(probe) || self.body.collisions().any_horizontal() {
            self.body.flip = !self.body.flip;
            return 0.0;
        }
        if self.body.flip {
            -PATROL_SPEED
        } else {
            PATROL_SPEED
        }
    }

    fn try_shoot<R: Rng + ?Sized>(
        &self,
        player: &Player,
        effects: &mut Effects,
        events: &mut WorldEventBus,
        rng: &mut R,
    ) {
        let offset = player.pos() - self.pos();
        if offset.y.abs() >= LINE_OF_SIGHT_HEIGHT {
            return;
        }
        let facing_player = if self.body.flip {
            offset.x < 0.0
        } else {
            offset.x > 0.0
        };
        if !facing_player {
            return;
        }

        let (reach, velocity_x, spark_turn) = if self.body.flip {
            (-PROBE_REACH, -PROJECTILE_SPEED, PI)
        } else {
            (PROBE_REACH, PROJECTILE_SPEED, 0.0)
        };
        let center = self.rect().center();
        let origin = Vec2::new(center.x + reach, center.y);

        events.emit(WorldEvent::SpawnProjectile { origin, velocity_x });
        events.emit(WorldEvent::PlaySfx(SfxId::Shoot));
        for _ in 0..MUZZLE_SPARKS {
            let angle = rng.random_range(-0.5..0.5) + spark_turn;
            let speed = rng.random_range(2.0..3.0);
            effects.spawn_spark(origin, angle, speed);
        }
    }
}
