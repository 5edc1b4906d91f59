use rand::Rng;

use super::math::Vec2;
use crate::content::{ImageId, ImageSet};

pub const CLOUD_COUNT: usize = 16;
const SPAWN_RANGE: f32 = 99_999.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cloud {
    pos: Vec2,
    image: ImageId,
    speed: f32,
    /// Parallax factor; far clouds (small depth) scroll slower.
    depth: f32,
}

impl Cloud {
    pub fn new(pos: Vec2, image: ImageId, speed: f32, depth: f32) -> Self {
        Self {
            pos,
            image,
            speed,
            depth,
        }
    }

    pub fn pos(&self) -> Vec2 {
        self.pos
    }

    pub fn depth(&self) -> f32 {
        self.depth
    }

    pub fn image(&self) -> ImageId {
        self.image
    }

    fn update(&mut self) {
        self.pos.x += self.speed;
    }

    /// Screen position for a camera at `scroll`, wrapped so the cloud keeps
    /// reappearing inside a `view`-sized window.
    pub fn screen_pos(&self, scroll: Vec2, view: Vec2, image_size: Vec2) -> Vec2 {
        let render = Vec2::new(
            self.pos.x - scroll.x * self.depth,
            self.pos.y - scroll.y * self.depth,
        );
        Vec2::new(
            render.x.rem_euclid(view.x + image_size.x) - image_size.x,
            render.y.rem_euclid(view.y + image_size.y) - image_size.y,
        )
    }
}

/// Background cloud layer, kept sorted back to front.
#[derive(Debug, Clone)]
pub struct Clouds {
    clouds: Vec<Cloud>,
    image_size: Vec2,
}

impl Clouds {
    pub fn new<R: Rng + ?Sized>(images: &ImageSet, count: usize, rng: &mut R) -> Self {
        let mut clouds = Vec::with_capacity(count);
        if !images.images.is_empty() {
            for _ in 0..count {
                let pos = Vec2::new(
                    rng.random_range(0.0..SPAWN_RANGE),
                    rng.random_range(0.0..SPAWN_RANGE),
                );
                let image = images.images[rng.random_range(0..images.images.len())];
                let speed = rng.random_range(0.05..0.1);
                let depth = rng.random_range(0.2..0.8);
                clouds.push(Cloud::new(pos, image, speed, depth));
            }
        }
        clouds.sort_by(|a, b| a.depth.total_cmp(&b.depth));

        Self {
            clouds,
            image_size: Vec2::new(images.width as f32, images.height as f32),
        }
    }

    pub fn clouds(&self) -> &[Cloud] {
        &self.clouds
    }

    pub fn image_size(&self) -> Vec2 {
        self.image_size
    }

    pub fn update(&mut self) {
        for cloud in &mut self.clouds {
            cloud.update();
        }
    }
}
