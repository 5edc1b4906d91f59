use tracing::warn;

use super::animation::{Animation, AnimationTemplate};
use super::math::{Rect, Vec2};
use super::tilemap::Tilemap;
use crate::content::{AssetError, AssetTable, ImageId};

pub const GRAVITY_ACCEL: f32 = 0.1;
pub const MAX_FALL_SPEED: f32 = 5.0;
/// Sprites are drawn this far up-left of the collision box.
pub const RENDER_OFFSET: Vec2 = Vec2::new(-3.0, -3.0);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CollisionFlags {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
}

impl CollisionFlags {
    pub fn any_horizontal(&self) -> bool {
        self.left || self.right
    }

    pub fn any_vertical(&self) -> bool {
        self.up || self.down
    }
}

/// Moves a box of `size` at `position` by `displacement`, resolving X fully
/// before Y. Each overlapping solid rect clamps the box in neighborhood
/// order. Displacement per axis must stay below one tile.
pub fn resolve_move(
    grid: &Tilemap,
    position: Vec2,
    size: Vec2,
    displacement: Vec2,
) -> (Vec2, CollisionFlags) {
    let mut flags = CollisionFlags::default();
    let mut pos = position;

    pos.x += displacement.x;
    let mut rect = Rect::from_origin_size(pos, size);
    for solid in grid.solid_rects_around(pos) {
        if !rect.overlaps(&solid) {
            continue;
        }
        if displacement.x > 0.0 {
            rect.set_right(solid.left());
            flags.right = true;
        }
        if displacement.x < 0.0 {
            rect.set_left(solid.right());
            flags.left = true;
        }
        pos.x = rect.x;
    }

    pos.y += displacement.y;
    let mut rect = Rect::from_origin_size(pos, size);
    for solid in grid.solid_rects_around(pos) {
        if !rect.overlaps(&solid) {
            continue;
        }
        if displacement.y > 0.0 {
            rect.set_bottom(solid.top());
            flags.down = true;
        }
        if displacement.y < 0.0 {
            rect.set_top(solid.bottom());
            flags.up = true;
        }
        pos.y = rect.y;
    }

    (pos, flags)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Player,
    Enemy,
}

impl EntityKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::Player => "player",
            Self::Enemy => "enemy",
        }
    }

    pub fn size(self) -> Vec2 {
        match self {
            Self::Player => Vec2::new(8.0, 15.0),
            Self::Enemy => Vec2::new(8.0, 15.0),
        }
    }

    /// Every action this kind can switch to; all must exist in the asset table.
    pub fn actions(self) -> &'static [Action] {
        match self {
            Self::Player => &[Action::Idle, Action::Run, Action::Jump, Action::WallSlide],
            Self::Enemy => &[Action::Idle, Action::Run],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Idle,
    Run,
    Jump,
    WallSlide,
}

impl Action {
    pub fn name(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Run => "run",
            Self::Jump => "jump",
            Self::WallSlide => "wall_slide",
        }
    }
}

/// Templates for every action of one entity kind, resolved up front so that
/// switching actions mid-frame cannot hit a missing asset.
#[derive(Debug, Clone)]
pub struct AnimationSet {
    templates: Vec<(Action, AnimationTemplate)>,
}

impl AnimationSet {
    pub fn resolve(assets: &AssetTable, kind: EntityKind) -> Result<Self, AssetError> {
        let templates = kind
            .actions()
            .iter()
            .map(|&action| {
                let key = format!("{}/{}", kind.name(), action.name());
                assets
                    .animation(&key)
                    .map(|template| (action, template.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { templates })
    }

    fn template(&self, action: Action) -> Option<&AnimationTemplate> {
        self.templates
            .iter()
            .find(|(candidate, _)| *candidate == action)
            .map(|(_, template)| template)
    }
}

/// State shared by every moving entity: box, velocity, contacts, facing and
/// the current action's animation.
#[derive(Debug, Clone)]
pub struct PhysicsBody {
    kind: EntityKind,
    pub(crate) pos: Vec2,
    size: Vec2,
    pub(crate) velocity: Vec2,
    collisions: CollisionFlags,
    pub(crate) flip: bool,
    action: Action,
    animation: Animation,
    animations: AnimationSet,
    last_movement: Vec2,
}

impl PhysicsBody {
    pub fn new(kind: EntityKind, pos: Vec2, animations: AnimationSet) -> Self {
        let animation = animations
            .template(Action::Idle)
            .map(AnimationTemplate::instance)
            .unwrap_or_else(|| AnimationTemplate::new(Vec::new(), 1, true).instance());
        Self {
            kind,
            pos,
            size: kind.size(),
            velocity: Vec2::ZERO,
            collisions: CollisionFlags::default(),
            flip: false,
            action: Action::Idle,
            animation,
            animations,
            last_movement: Vec2::ZERO,
        }
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn pos(&self) -> Vec2 {
        self.pos
    }

    pub fn size(&self) -> Vec2 {
        self.size
    }

    pub fn velocity(&self) -> Vec2 {
        self.velocity
    }

    pub fn collisions(&self) -> CollisionFlags {
        self.collisions
    }

    pub fn flip(&self) -> bool {
        self.flip
    }

    pub fn action(&self) -> Action {
        self.action
    }

    pub fn animation(&self) -> &Animation {
        &self.animation
    }

    pub fn last_movement(&self) -> Vec2 {
        self.last_movement
    }

    pub fn rect(&self) -> Rect {
        Rect::from_origin_size(self.pos, self.size)
    }

    pub fn current_image(&self) -> Option<ImageId> {
        self.animation.current_image()
    }

    /// Restarts the animation only when the action actually changes.
    pub fn set_action(&mut self, action: Action) {
        if action == self.action {
            return;
        }
        if let Some(template) = self.animations.template(action) {
            self.action = action;
            self.animation = template.instance();
        } else {
            warn!(
                entity = self.kind.name(),
                action = action.name(),
                "missing_action_animation"
            );
        }
    }

    /// One physics step: contacts are recomputed from scratch, then gravity
    /// and the animation advance.
    pub fn step(&mut self, grid: &Tilemap, movement: Vec2) {
        self.collisions = CollisionFlags::default();

        let displacement = movement + self.velocity;
        let (pos, collisions) = resolve_move(grid, self.pos, self.size, displacement);
        self.pos = pos;
        self.collisions = collisions;

        if movement.x > 0.0 {
            self.flip = false;
        } else if movement.x < 0.0 {
            self.flip = true;
        }
        self.last_movement = movement;

        self.velocity.y = (self.velocity.y + GRAVITY_ACCEL).min(MAX_FALL_SPEED);
        if self.collisions.any_vertical() {
            self.velocity.y = 0.0;
        }

        self.animation.update();
    }
}
