use std::f32::consts::{PI, TAU};

use rand::Rng;

use super::animation::{Animation, AnimationTemplate};
use super::math::Vec2;
use crate::content::{AssetError, AssetTable, ImageId};

const SPARK_DECAY_PER_STEP: f32 = 0.1;
const LEAF_DRIFT_FREQUENCY: f32 = 0.035;
const LEAF_DRIFT_AMPLITUDE: f32 = 0.3;
const PARTICLE_MAX_START_FRAME: u32 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParticleKind {
    Leaf,
    Particle,
}

impl ParticleKind {
    pub fn asset_key(self) -> &'static str {
        match self {
            Self::Leaf => "particle/leaf",
            Self::Particle => "particle/particle",
        }
    }

    fn drifts(self) -> bool {
        matches!(self, Self::Leaf)
    }
}

#[derive(Debug, Clone)]
pub struct EffectTemplates {
    leaf: AnimationTemplate,
    particle: AnimationTemplate,
}

impl EffectTemplates {
    pub fn resolve(assets: &AssetTable) -> Result<Self, AssetError> {
        Ok(Self {
            leaf: assets.animation(ParticleKind::Leaf.asset_key())?.clone(),
            particle: assets.animation(ParticleKind::Particle.asset_key())?.clone(),
        })
    }

    fn template(&self, kind: ParticleKind) -> &AnimationTemplate {
        match kind {
            ParticleKind::Leaf => &self.leaf,
            ParticleKind::Particle => &self.particle,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Particle {
    kind: ParticleKind,
    pos: Vec2,
    velocity: Vec2,
    animation: Animation,
}

impl Particle {
    pub fn new(
        kind: ParticleKind,
        template: &AnimationTemplate,
        pos: Vec2,
        velocity: Vec2,
        start_frame: u32,
    ) -> Self {
        Self {
            kind,
            pos,
            velocity,
            animation: template.instance_at(start_frame),
        }
    }

    /// Returns true when the particle should be dropped. Expiry is observed
    /// before integrating, so a particle lives one step past its last frame.
    pub fn update(&mut self) -> bool {
        let expired = self.animation.is_done();
        self.pos += self.velocity;
        self.animation.update();
        expired
    }

    pub fn kind(&self) -> ParticleKind {
        self.kind
    }

    pub fn pos(&self) -> Vec2 {
        self.pos
    }

    pub fn velocity(&self) -> Vec2 {
        self.velocity
    }

    pub fn current_image(&self) -> Option<ImageId> {
        self.animation.current_image()
    }

    /// Frame size is owned by the renderer; the particle is drawn centered.
    pub fn animation(&self) -> &Animation {
        &self.animation
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Spark {
    pos: Vec2,
    angle: f32,
    speed: f32,
}

impl Spark {
    pub fn new(pos: Vec2, angle: f32, speed: f32) -> Self {
        Self {
            pos,
            angle,
            speed: speed.max(0.0),
        }
    }

    pub fn update(&mut self) -> bool {
        self.pos += Vec2::from_angle(self.angle) * self.speed;
        self.speed = (self.speed - SPARK_DECAY_PER_STEP).max(0.0);
        self.speed == 0.0
    }

    pub fn pos(&self) -> Vec2 {
        self.pos
    }

    pub fn angle(&self) -> f32 {
        self.angle
    }

    pub fn speed(&self) -> f32 {
        self.speed
    }

    /// Diamond stretched along the travel direction: long tips at +-3*speed,
    /// short sides at +-0.5*speed.
    pub fn polygon(&self) -> [Vec2; 4] {
        let along =
            |angle: f32, scale: f32| self.pos + Vec2::from_angle(angle) * (self.speed * scale);
        [
            along(self.angle, 3.0),
            along(self.angle + PI * 0.5, 0.5),
            along(self.angle + PI, 3.0),
            along(self.angle - PI * 0.5, 0.5),
        ]
    }
}

#[derive(Debug, Clone)]
pub struct Effects {
    templates: EffectTemplates,
    particles: Vec<Particle>,
    sparks: Vec<Spark>,
}

impl Effects {
    pub fn new(templates: EffectTemplates) -> Self {
        Self {
            templates,
            particles: Vec::new(),
            sparks: Vec::new(),
        }
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn sparks(&self) -> &[Spark] {
        &self.sparks
    }

    pub fn clear(&mut self) {
        self.particles.clear();
        self.sparks.clear();
    }

    pub fn spawn_particle(
        &mut self,
        kind: ParticleKind,
        pos: Vec2,
        velocity: Vec2,
        start_frame: u32,
    ) {
        let template = self.templates.template(kind);
        let particle = Particle::new(kind, template, pos, velocity, start_frame);
        self.particles.push(particle);
    }

    pub fn spawn_spark(&mut self, pos: Vec2, angle: f32, speed: f32) {
        self.sparks.push(Spark::new(pos, angle, speed));
    }

    /// Omnidirectional ring of slow particles, used at dash ignition and release.
    pub fn radial_burst<R: Rng + ?Sized>(&mut self, rng: &mut R, center: Vec2, count: usize) {
        for _ in 0..count {
            let angle = rng.random_range(0.0..TAU);
            let speed = rng.random_range(0.5..1.0);
            let start_frame = rng.random_range(0..=PARTICLE_MAX_START_FRAME);
            self.spawn_particle(
                ParticleKind::Particle,
                center,
                Vec2::from_angle(angle) * speed,
                start_frame,
            );
        }
    }

    /// Sparks flying outward with particles thrown the opposite way, plus two
    /// fast horizontal streaks.
    pub fn hit_burst<R: Rng + ?Sized>(&mut self, rng: &mut R, center: Vec2) {
        for _ in 0..30 {
            let angle = rng.random_range(0.0..TAU);
            let speed = rng.random_range(0.0..5.0);
            let spark_speed = 2.0 + rng.random_range(0.0..1.0);
            self.spawn_spark(center, angle, spark_speed);
            let start_frame = rng.random_range(0..=PARTICLE_MAX_START_FRAME);
            self.spawn_particle(
                ParticleKind::Particle,
                center,
                Vec2::from_angle(angle + PI) * (speed * 0.5),
                start_frame,
            );
        }
        self.spawn_spark(center, 0.0, 5.0 + rng.random_range(0.0..1.0));
        self.spawn_spark(center, PI, 5.0 + rng.random_range(0.0..1.0));
    }

    /// Advances every effect once and drops the expired ones in place.
    pub fn update(&mut self) {
        self.particles.retain_mut(|particle| {
            let expired = particle.update();
            if particle.kind.drifts() {
                let phase = particle.animation.cursor() as f32 * LEAF_DRIFT_FREQUENCY;
                particle.pos.x += phase.sin() * LEAF_DRIFT_AMPLITUDE;
            }
            !expired
        });
        self.sparks.retain_mut(|spark| !spark.update());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::test_support::full_asset_table;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn effects() -> Effects {
        Effects::new(EffectTemplates::resolve(&full_asset_table()).expect("templates"))
    }

    #[test]
    fn particle_expires_one_step_after_final_frame() {
        // particle/particle: 4 frames x 6 steps, one-shot
        let mut effects = effects();
        effects.spawn_particle(ParticleKind::Particle, Vec2::ZERO, Vec2::new(1.0, 0.0), 0);

        for _ in 0..23 {
            effects.update();
        }
        assert_eq!(effects.particles().len(), 1);
        assert_eq!(effects.particles()[0].pos(), Vec2::new(23.0, 0.0));

        effects.update();
        assert!(effects.particles().is_empty());
    }

    #[test]
    fn leaf_drift_is_added_after_integration() {
        let mut effects = effects();
        effects.spawn_particle(ParticleKind::Leaf, Vec2::ZERO, Vec2::new(-0.1, 0.2), 10);

        effects.update();

        let particle = &effects.particles()[0];
        let expected_x = -0.1 + (11.0_f32 * 0.035).sin() * 0.3;
        assert!((particle.pos().x - expected_x).abs() < 1e-6);
        assert!((particle.pos().y - 0.2).abs() < 1e-6);
    }

    #[test]
    fn spark_slows_and_expires_at_zero_speed() {
        let mut spark = Spark::new(Vec2::ZERO, 0.0, 0.25);

        assert!(!spark.update());
        assert!((spark.pos().x - 0.25).abs() < 1e-6);
        assert!(!spark.update());
        assert!(spark.update());
        assert_eq!(spark.speed(), 0.0);
    }

    #[test]
    fn spark_polygon_is_centered_on_position() {
        let spark = Spark::new(Vec2::new(10.0, 5.0), 0.0, 2.0);
        let points = spark.polygon();

        assert!((points[0].x - 16.0).abs() < 1e-5);
        assert!((points[2].x - 4.0).abs() < 1e-5);
        assert!((points[1].y - 6.0).abs() < 1e-5);
        assert!((points[3].y - 4.0).abs() < 1e-5);
    }

    #[test]
    fn removal_during_update_visits_every_entry_once() {
        let mut effects = effects();
        for speed in [0.05, 1.0, 0.05, 0.05, 2.0] {
            effects.spawn_spark(Vec2::ZERO, 0.0, speed);
        }

        effects.update();

        let survivors = effects.sparks().iter().map(|spark| spark.pos().x).collect::<Vec<_>>();
        assert_eq!(survivors, vec![1.0, 2.0]);
    }

    #[test]
    fn hit_burst_spawns_thirty_particles_and_thirty_two_sparks() {
        let mut effects = effects();
        let mut rng = ChaCha8Rng::seed_from_u64(7);

        effects.hit_burst(&mut rng, Vec2::new(5.0, 5.0));

        assert_eq!(effects.particles().len(), 30);
        assert_eq!(effects.sparks().len(), 32);
        assert!(effects.sparks().iter().all(|spark| spark.speed() >= 2.0));
    }

    #[test]
    fn radial_burst_speeds_stay_in_range() {
        let mut effects = effects();
        let mut rng = ChaCha8Rng::seed_from_u64(3);

        effects.radial_burst(&mut rng, Vec2::ZERO, 20);

        assert_eq!(effects.particles().len(), 20);
        for particle in effects.particles() {
            let v = particle.velocity();
            let speed = (v.x * v.x + v.y * v.y).sqrt();
            assert!((0.5 - 1e-5..1.0 + 1e-5).contains(&speed), "speed={speed}");
        }
    }
}
