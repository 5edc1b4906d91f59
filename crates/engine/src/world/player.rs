use rand::Rng;
use tracing::debug;

use super::effects::{Effects, ParticleKind};
use super::events::{SfxId, WorldEvent, WorldEventBus};
use super::math::{Rect, Vec2};
use super::physics::{Action, AnimationSet, EntityKind, PhysicsBody};
use super::tilemap::Tilemap;

pub const MAX_JUMP_CHARGES: u32 = 1;
pub const JUMP_VELOCITY: f32 = -3.0;
pub const WALL_JUMP_VELOCITY: Vec2 = Vec2::new(3.5, -2.5);
/// Airborne steps after which the player counts as jumping/falling.
pub const AIRBORNE_THRESHOLD: u32 = 4;
pub const WALL_SLIDE_MAX_FALL: f32 = 0.5;
pub const FALL_DEATH_AIR_TIME: u32 = 120;
pub const DASH_DURATION: i32 = 60;
/// Dash is "active" (fast, invisible, lethal to enemies) above this.
pub const DASH_ACTIVE_THRESHOLD: i32 = 50;
pub const DASH_SPEED: f32 = 8.0;
pub const FRICTION: f32 = 0.1;
pub const FALL_DEATH_SHAKE: f32 = 16.0;

const AIR_TIME_AFTER_JUMP: u32 = 5;
const DASH_BURST_PARTICLES: usize = 20;
const DASH_TRAIL_MAX_SPEED: f32 = 3.0;
const DASH_END_SLOWDOWN: f32 = 0.1;

#[derive(Debug, Clone)]
pub struct Player {
    body: PhysicsBody,
    air_time: u32,
    jump_charges: u32,
    wall_sliding: bool,
    dash_timer: i32,
    fall_death_reported: bool,
}

impl Player {
    pub fn new(pos: Vec2, animations: AnimationSet) -> Self {
        Self {
            body: PhysicsBody::new(EntityKind::Player, pos, animations),
            air_time: 0,
            jump_charges: MAX_JUMP_CHARGES,
            wall_sliding: false,
            dash_timer: 0,
            fall_death_reported: false,
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

    pub fn air_time(&self) -> u32 {
        self.air_time
    }

    pub fn jump_charges(&self) -> u32 {
        self.jump_charges
    }

    pub fn is_wall_sliding(&self) -> bool {
        self.wall_sliding
    }

    pub fn dash_timer(&self) -> i32 {
        self.dash_timer
    }

    pub fn is_dashing(&self) -> bool {
        self.dash_timer.abs() > DASH_ACTIVE_THRESHOLD
    }

    /// The sprite is hidden during the fast part of a dash.
    pub fn is_visible(&self) -> bool {
        !self.is_dashing()
    }

    /// Advances one step. Returns true on the step the player is first
    /// reported dead from falling; later steps of the same fall stay quiet.
    pub fn update<R: Rng + ?Sized>(
        &mut self,
        grid: &Tilemap,
        movement: Vec2,
        effects: &mut Effects,
        events: &mut WorldEventBus,
        rng: &mut R,
    ) -> bool {
        self.body.step(grid, movement);
        let collisions = self.body.collisions();

        self.air_time = self.air_time.saturating_add(1);
        if collisions.down {
            self.air_time = 0;
            self.jump_charges = MAX_JUMP_CHARGES;
            self.fall_death_reported = false;
        }

        self.wall_sliding = collisions.any_horizontal() && self.air_time > AIRBORNE_THRESHOLD;
        if self.wall_sliding {
            self.body.velocity.y = self.body.velocity.y.min(WALL_SLIDE_MAX_FALL);
            self.body.flip = !collisions.right;
            self.body.set_action(Action::WallSlide);
        } else if self.air_time > AIRBORNE_THRESHOLD {
            self.body.set_action(Action::Jump);
        } else if movement.x != 0.0 {
            self.body.set_action(Action::Run);
        } else {
            self.body.set_action(Action::Idle);
        }

        let mut fell = false;
        if self.air_time > FALL_DEATH_AIR_TIME && !self.wall_sliding && !self.fall_death_reported {
            self.fall_death_reported = true;
            fell = true;
            debug!(air_time = self.air_time, "player_fall_death");
            events.emit(WorldEvent::Screenshake {
                intensity: FALL_DEATH_SHAKE,
            });
            events.emit(WorldEvent::PlayerDied);
        }

        self.update_dash(effects, rng);
        fell
    }

    fn update_dash<R: Rng + ?Sized>(&mut self, effects: &mut Effects, rng: &mut R) {
        let center = self.body.rect().center();
        let magnitude = self.dash_timer.abs();
        if magnitude == DASH_DURATION || magnitude == DASH_ACTIVE_THRESHOLD {
            effects.radial_burst(rng, center, DASH_BURST_PARTICLES);
        }
        self.dash_timer -= self.dash_timer.signum();

        let vx = self.body.velocity.x;
        self.body.velocity.x = if vx > 0.0 {
            (vx - FRICTION).max(0.0)
        } else {
            (vx + FRICTION).min(0.0)
        };

        if self.is_dashing() {
            let direction = self.dash_timer.signum() as f32;
            self.body.velocity.x = direction * DASH_SPEED;
            if self.dash_timer.abs() == DASH_ACTIVE_THRESHOLD + 1 {
                self.body.velocity.x *= DASH_END_SLOWDOWN;
            }
            let trail = Vec2::new(direction * rng.random_range(0.0..DASH_TRAIL_MAX_SPEED), 0.0);
            let start_frame = rng.random_range(0..=7);
            effects.spawn_particle(ParticleKind::Particle, center, trail, start_frame);
        }
    }

    /// While wall sliding, kicks against the last held direction and fails
    /// if nothing was held. Otherwise a normal jump if a charge is left.
    /// Returns whether a jump happened.
    pub fn jump(&mut self, events: &mut WorldEventBus) -> bool {
        if self.wall_sliding {
            let held = self.body.last_movement().x;
            if held == 0.0 {
                return false;
            }
            let away = -held.signum();
            self.body.velocity = Vec2::new(WALL_JUMP_VELOCITY.x * away, WALL_JUMP_VELOCITY.y);
            self.jump_charges = self.jump_charges.saturating_sub(1);
        } else if self.jump_charges > 0 {
            self.body.velocity.y = JUMP_VELOCITY;
            self.jump_charges -= 1;
        } else {
            return false;
        }

        self.air_time = AIR_TIME_AFTER_JUMP;
        events.emit(WorldEvent::PlaySfx(SfxId::Jump));
        true
    }

    /// Starts a dash in the facing direction unless one is still running or
    /// cooling down.
    pub fn dash(&mut self, events: &mut WorldEventBus) -> bool {
        if self.dash_timer != 0 {
            return false;
        }
        self.dash_timer = if self.body.flip {
            -DASH_DURATION
        } else {
            DASH_DURATION
        };
        events.emit(WorldEvent::PlaySfx(SfxId::Dash));
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::test_support::full_asset_table;
    use crate::world::effects::EffectTemplates;
    use crate::world::events::WorldEventKind;
    use crate::world::tilemap::{Tile, TileCoord, TileKind};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    struct Harness {
        grid: Tilemap,
        player: Player,
        effects: Effects,
        events: WorldEventBus,
        rng: ChaCha8Rng,
    }

    impl Harness {
        fn new(cells: &[(i32, i32)], pos: Vec2) -> Self {
            let assets = full_asset_table();
            let mut grid = Tilemap::new(16);
            for &(x, y) in cells {
                grid.insert(Tile {
                    kind: TileKind::Stone,
                    variant: 0,
                    pos: TileCoord::new(x, y),
                });
            }
            let animations =
                AnimationSet::resolve(&assets, EntityKind::Player).expect("animations");
            Self {
                grid,
                player: Player::new(pos, animations),
                effects: Effects::new(EffectTemplates::resolve(&assets).expect("effects")),
                events: WorldEventBus::default(),
                rng: ChaCha8Rng::seed_from_u64(11),
            }
        }

        fn step(&mut self, movement_x: f32) -> bool {
            self.player.update(
                &self.grid,
                Vec2::new(movement_x, 0.0),
                &mut self.effects,
                &mut self.events,
                &mut self.rng,
            )
        }

        fn land(&mut self) {
            for _ in 0..200 {
                self.step(0.0);
                if self.player.body().collisions().down {
                    return;
                }
            }
            panic!("player never landed");
        }
    }

    fn floor() -> Vec<(i32, i32)> {
        (-2..6).map(|x| (x, 1)).collect()
    }

    #[test]
    fn grounded_jump_consumes_single_charge() {
        let mut h = Harness::new(&floor(), Vec2::new(20.0, 0.0));
        h.land();
        assert_eq!(h.player.jump_charges(), MAX_JUMP_CHARGES);

        assert!(h.player.jump(&mut h.events));
        assert_eq!(h.player.body().velocity().y, JUMP_VELOCITY);
        assert_eq!(h.player.air_time(), 5);
        assert_eq!(h.player.jump_charges(), 0);

        h.step(0.0);
        let vy = h.player.body().velocity().y;
        assert!(!h.player.jump(&mut h.events));
        assert_eq!(h.player.jump_charges(), 0);
        assert_eq!(h.player.body().velocity().y, vy);
        assert_eq!(h.events.count(WorldEventKind::PlaySfx), 1);
    }

    #[test]
    fn landing_refills_charges_and_resets_air_time() {
        let mut h = Harness::new(&floor(), Vec2::new(20.0, 0.0));
        h.land();
        assert!(h.player.jump(&mut h.events));

        h.land();

        assert_eq!(h.player.air_time(), 0);
        assert_eq!(h.player.jump_charges(), MAX_JUMP_CHARGES);
    }

    #[test]
    fn dash_runs_at_full_speed_then_slows_and_reappears() {
        let mut h = Harness::new(&floor(), Vec2::new(20.0, 0.0));
        h.land();

        assert!(h.player.dash(&mut h.events));
        assert!(!h.player.dash(&mut h.events));
        assert_eq!(h.player.dash_timer(), DASH_DURATION);

        h.step(0.0);
        assert_eq!(h.player.dash_timer(), 59);
        assert_eq!(h.player.body().velocity().x, DASH_SPEED);
        assert!(!h.player.is_visible());
        // ignition burst plus one trail particle
        assert_eq!(h.effects.particles().len(), DASH_BURST_PARTICLES + 1);

        for _ in 0..8 {
            h.step(0.0);
        }
        assert_eq!(h.player.dash_timer(), 51);
        assert!((h.player.body().velocity().x - 0.8).abs() < 1e-5);

        h.step(0.0);
        assert_eq!(h.player.dash_timer(), 50);
        assert!(h.player.is_visible());
        assert!((h.player.body().velocity().x - 0.7).abs() < 1e-5);
    }

    #[test]
    fn dash_timer_stays_bounded_and_follows_facing() {
        let mut h = Harness::new(&floor(), Vec2::new(20.0, 0.0));
        h.land();
        h.step(-1.0);
        assert!(h.player.body().flip());

        assert!(h.player.dash(&mut h.events));
        assert_eq!(h.player.dash_timer(), -DASH_DURATION);
        for _ in 0..80 {
            h.step(0.0);
            let timer = h.player.dash_timer();
            assert!((-DASH_DURATION..=0).contains(&timer), "timer={timer}");
            if h.player.is_dashing() {
                let vx = h.player.body().velocity().x;
                assert!(vx < 0.0, "timer={timer} vx={vx}");
            }
        }
        assert_eq!(h.player.dash_timer(), 0);
        assert!(h.player.dash(&mut h.events));
    }

    #[test]
    fn walking_off_a_ledge_keeps_one_airborne_jump() {
        // single floor cell under the start, open air to the right
        let mut h = Harness::new(&[(1, 1)], Vec2::new(20.0, 0.0));
        h.land();
        for _ in 0..40 {
            h.step(1.0);
            if h.player.air_time() > AIRBORNE_THRESHOLD {
                break;
            }
        }
        assert!(h.player.air_time() > AIRBORNE_THRESHOLD);
        assert!(!h.player.body().collisions().down);
        assert_eq!(h.player.jump_charges(), MAX_JUMP_CHARGES);

        assert!(h.player.jump(&mut h.events));
        assert_eq!(h.player.body().velocity().y, JUMP_VELOCITY);
        assert_eq!(h.player.jump_charges(), 0);

        h.step(0.0);
        assert!(!h.player.jump(&mut h.events));
        assert_eq!(h.player.jump_charges(), 0);
        assert_eq!(h.events.count(WorldEventKind::PlaySfx), 1);
    }

    fn wall_harness() -> Harness {
        // wall column on the left, no floor
        let wall = (0..6).map(|y| (0, y)).collect::<Vec<_>>();
        Harness::new(&wall, Vec2::new(16.0, 20.0))
    }

    #[test]
    fn pushing_into_wall_while_airborne_starts_wall_slide() {
        let mut h = wall_harness();
        for _ in 0..5 {
            h.step(-1.0);
            assert!(h.player.body().collisions().left);
        }

        assert!(h.player.is_wall_sliding());
        assert!(h.player.body().flip());
        assert!(h.player.body().velocity().y <= WALL_SLIDE_MAX_FALL);
        assert_eq!(h.player.body().action(), Action::WallSlide);
    }

    #[test]
    fn wall_jump_kicks_away_from_wall() {
        let mut h = wall_harness();
        for _ in 0..5 {
            h.step(-1.0);
        }

        assert!(h.player.jump(&mut h.events));

        assert_eq!(h.player.body().velocity(), Vec2::new(3.5, -2.5));
        assert_eq!(h.player.air_time(), 5);
        assert_eq!(h.player.jump_charges(), 0);
    }

    #[test]
    fn wall_jump_kicks_against_last_held_direction() {
        let mut h = wall_harness();
        // leftover velocity keeps the player on the left wall while right is held
        h.player.body.velocity.x = -3.0;
        for _ in 0..5 {
            h.step(1.0);
            assert!(h.player.body().collisions().left);
        }
        assert!(h.player.is_wall_sliding());
        assert!(h.player.body().flip());

        assert!(h.player.jump(&mut h.events));

        assert_eq!(h.player.body().velocity(), Vec2::new(-3.5, -2.5));
        assert_eq!(h.player.jump_charges(), 0);
    }

    #[test]
    fn wall_slide_without_intent_cannot_jump() {
        let mut h = wall_harness();
        h.player.body.velocity.x = -0.5;
        for _ in 0..5 {
            h.step(0.0);
        }
        assert!(h.player.is_wall_sliding());
        let velocity = h.player.body().velocity();

        assert!(!h.player.jump(&mut h.events));
        assert_eq!(h.player.body().velocity(), velocity);
        assert_eq!(h.events.count(WorldEventKind::PlaySfx), 0);
    }

    #[test]
    fn long_fall_reports_death_once() {
        let mut h = Harness::new(&[], Vec2::ZERO);

        let mut reports = 0;
        for step in 1..=200 {
            if h.step(0.0) {
                reports += 1;
                assert_eq!(step, FALL_DEATH_AIR_TIME + 1);
            }
        }

        assert_eq!(reports, 1);
        assert_eq!(h.events.count(WorldEventKind::PlayerDied), 1);
        assert_eq!(h.events.count(WorldEventKind::Screenshake), 1);
    }

    #[test]
    fn animation_follows_airborne_and_running_state() {
        let mut h = Harness::new(&floor(), Vec2::new(20.0, 0.0));
        h.land();
        h.step(1.0);
        assert_eq!(h.player.body().action(), Action::Run);

        h.player.jump(&mut h.events);
        h.step(0.0);
        assert_eq!(h.player.body().action(), Action::Jump);
    }
}
