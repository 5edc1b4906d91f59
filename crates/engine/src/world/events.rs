use super::math::Vec2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SfxId {
    Jump,
    Dash,
    Hit,
    Shoot,
}

impl SfxId {
    pub fn name(self) -> &'static str {
        match self {
            Self::Jump => "jump",
            Self::Dash => "dash",
            Self::Hit => "hit",
            Self::Shoot => "shoot",
        }
    }
}

/// Side-channel signals for collaborators outside the core (audio, camera,
/// projectiles, game state). Emitting never blocks the simulation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WorldEvent {
    PlaySfx(SfxId),
    Screenshake { intensity: f32 },
    SpawnProjectile { origin: Vec2, velocity_x: f32 },
    PlayerDied,
    EnemyKilled { position: Vec2 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorldEventKind {
    PlaySfx,
    Screenshake,
    SpawnProjectile,
    PlayerDied,
    EnemyKilled,
}

impl WorldEvent {
    pub fn kind(&self) -> WorldEventKind {
        match self {
            Self::PlaySfx(_) => WorldEventKind::PlaySfx,
            Self::Screenshake { .. } => WorldEventKind::Screenshake,
            Self::SpawnProjectile { .. } => WorldEventKind::SpawnProjectile,
            Self::PlayerDied => WorldEventKind::PlayerDied,
            Self::EnemyKilled { .. } => WorldEventKind::EnemyKilled,
        }
    }
}

#[derive(Debug, Default)]
pub struct WorldEventBus {
    pending: Vec<WorldEvent>,
}

impl WorldEventBus {
    pub fn emit(&mut self, event: WorldEvent) {
        self.pending.push(event);
    }

    pub fn pending(&self) -> &[WorldEvent] {
        &self.pending
    }

    pub fn count(&self, kind: WorldEventKind) -> usize {
        self.pending
            .iter()
            .filter(|event| event.kind() == kind)
            .count()
    }

    pub fn drain(&mut self) -> Vec<WorldEvent> {
        std::mem::take(&mut self.pending)
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }
}
