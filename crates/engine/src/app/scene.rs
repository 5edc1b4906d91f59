use crate::render::DrawList;
use crate::world::WorldError;

use super::InputSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneCommand {
    None,
    Quit,
}

/// Game-side driver the loop runner ticks. `update` runs at the fixed rate,
/// `render` once per loop frame after all of that frame's ticks.
pub trait Scene {
    fn load(&mut self) -> Result<(), WorldError>;
    fn update(&mut self, input: &InputSnapshot) -> Result<SceneCommand, WorldError>;
    fn render(&mut self, frame: &mut DrawList);
    fn unload(&mut self);
    fn debug_title(&self) -> Option<String> {
        None
    }
}

/// Where per-tick input comes from: a keyboard translator, a script, a test.
pub trait InputSource {
    fn snapshot_for_tick(&mut self, tick: u64) -> InputSnapshot;
}

impl InputSource for super::InputCollector {
    fn snapshot_for_tick(&mut self, _tick: u64) -> InputSnapshot {
        super::InputCollector::snapshot_for_tick(self)
    }
}
