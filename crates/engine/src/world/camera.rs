use super::math::Vec2;

/// Fraction of the remaining distance closed per frame.
pub const CAMERA_FOLLOW_DIVISOR: f32 = 30.0;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Camera2D {
    pub scroll: Vec2,
}

impl Camera2D {
    /// Eases the view toward keeping `target` centered in a `view`-sized
    /// window.
    pub fn follow(&mut self, target: Vec2, view: Vec2) {
        self.scroll.x += (target.x - view.x / 2.0 - self.scroll.x) / CAMERA_FOLLOW_DIVISOR;
        self.scroll.y += (target.y - view.y / 2.0 - self.scroll.y) / CAMERA_FOLLOW_DIVISOR;
    }

    /// Jumps straight to the target, used on level load.
    pub fn center_on(&mut self, target: Vec2, view: Vec2) {
        self.scroll = Vec2::new(target.x - view.x / 2.0, target.y - view.y / 2.0);
    }

    /// Whole-pixel scroll handed to the renderer (truncated toward zero).
    pub fn render_scroll(&self) -> (i32, i32) {
        (self.scroll.x as i32, self.scroll.y as i32)
    }
}
