use crate::content::ImageId;
use crate::world::Vec2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    TopLeft,
    /// Used for particles, whose frame size only the renderer knows.
    Center,
}

/// One primitive for the external renderer, in screen pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DrawCommand {
    Image {
        image: ImageId,
        position: Vec2,
        flip_x: bool,
        anchor: Anchor,
    },
    Polygon {
        points: [Vec2; 4],
    },
}

/// Back-to-front command list produced once per rendered frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DrawList {
    commands: Vec<DrawCommand>,
}

impl DrawList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.commands.clear();
    }

    pub fn image(&mut self, image: ImageId, position: Vec2, flip_x: bool) {
        self.commands.push(DrawCommand::Image {
            image,
            position,
            flip_x,
            anchor: Anchor::TopLeft,
        });
    }

    pub fn image_centered(&mut self, image: ImageId, position: Vec2) {
        self.commands.push(DrawCommand::Image {
            image,
            position,
            flip_x: false,
            anchor: Anchor::Center,
        });
    }

    pub fn polygon(&mut self, points: [Vec2; 4]) {
        self.commands.push(DrawCommand::Polygon { points });
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn images(&self) -> impl Iterator<Item = ImageId> + '_ {
        self.commands.iter().filter_map(|command| match command {
            DrawCommand::Image { image, .. } => Some(*image),
            DrawCommand::Polygon { .. } => None,
        })
    }

    pub fn polygon_count(&self) -> usize {
        self.commands
            .iter()
            .filter(|command| matches!(command, DrawCommand::Polygon { .. }))
            .count()
    }
}

/// Consumer of finished frames. Drawing and presenting are entirely the
/// implementor's business.
pub trait Renderer {
    fn present(&mut self, frame: &DrawList);
}
