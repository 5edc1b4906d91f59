use std::f32::consts::PI;

use ninja_engine::world::DASH_ACTIVE_THRESHOLD;
use ninja_engine::{DrawList, ImageId, Vec2, World};
use rand::Rng;

/// Steps a projectile survives without hitting anything.
pub(crate) const PROJECTILE_LIFETIME: u32 = 360;
const WALL_SPARKS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Projectile {
    pos: Vec2,
    velocity_x: f32,
    age: u32,
}

impl Projectile {
    pub(crate) fn pos(&self) -> Vec2 {
        self.pos
    }
}

/// Enemy shots in flight. They live outside the world and are spawned from
/// its `SpawnProjectile` events.
#[derive(Debug, Default)]
pub(crate) struct Projectiles {
    active: Vec<Projectile>,
}

impl Projectiles {
    pub(crate) fn spawn(&mut self, origin: Vec2, velocity_x: f32) {
        self.active.push(Projectile {
            pos: origin,
            velocity_x,
            age: 0,
        });
    }

    pub(crate) fn active(&self) -> &[Projectile] {
        &self.active
    }

    pub(crate) fn clear(&mut self) {
        self.active.clear();
    }

    /// Moves every projectile one step. Walls absorb them with a few sparks;
    /// a player who is not mid-dash is killed. Returns true if this step
    /// killed the player.
    pub(crate) fn update(&mut self, world: &mut World) -> bool {
        let mut killed_player = false;
        self.active.retain_mut(|projectile| {
            projectile.pos.x += projectile.velocity_x;
            projectile.age += 1;

            if world.tilemap().is_solid_at(projectile.pos) {
                let base_angle = if projectile.velocity_x > 0.0 { PI } else { 0.0 };
                for _ in 0..WALL_SPARKS {
                    let angle = world.rng().random::<f32>() - 0.5 + base_angle;
                    let speed = 2.0 + world.rng().random::<f32>();
                    world.effects_mut().spawn_spark(projectile.pos, angle, speed);
                }
                return false;
            }
            if projectile.age > PROJECTILE_LIFETIME {
                return false;
            }

            let player = world.player();
            let exposed = player.dash_timer().abs() < DASH_ACTIVE_THRESHOLD;
            if world.player_active() && exposed && player.rect().contains_point(projectile.pos) {
                killed_player |= world.kill_player();
                return false;
            }
            true
        });
        killed_player
    }

    pub(crate) fn render(&self, frame: &mut DrawList, image: ImageId, scroll: Vec2) {
        for projectile in &self.active {
            frame.image_centered(image, projectile.pos() - scroll);
        }
    }
}
