use std::sync::Arc;

use crate::content::ImageId;

pub const DEFAULT_FRAME_DURATION: u32 = 5;

/// Shared, read-only frame sequence. Cloning is cheap; every entity takes its
/// own [`Animation`] instance so cursors never collide.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationTemplate {
    frames: Arc<[ImageId]>,
    frame_duration: u32,
    looping: bool,
}

impl AnimationTemplate {
    pub fn new(frames: Vec<ImageId>, frame_duration: u32, looping: bool) -> Self {
        Self {
            frames: frames.into(),
            frame_duration: frame_duration.max(1),
            looping,
        }
    }

    pub fn frames(&self) -> &[ImageId] {
        &self.frames
    }

    pub fn frame_duration(&self) -> u32 {
        self.frame_duration
    }

    pub fn is_looping(&self) -> bool {
        self.looping
    }

    fn span(&self) -> u32 {
        (self.frame_duration * self.frames.len() as u32).max(1)
    }

    pub fn instance(&self) -> Animation {
        self.instance_at(0)
    }

    /// Starts partway through the sequence; `cursor` is clamped into range.
    pub fn instance_at(&self, cursor: u32) -> Animation {
        Animation {
            template: self.clone(),
            cursor: cursor.min(self.span() - 1),
            done: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Animation {
    template: AnimationTemplate,
    cursor: u32,
    done: bool,
}

impl Animation {
    pub fn update(&mut self) {
        let span = self.template.span();
        if self.template.looping {
            self.cursor = (self.cursor + 1) % span;
        } else {
            self.cursor = (self.cursor + 1).min(span - 1);
            if self.cursor >= span - 1 {
                self.done = true;
            }
        }
    }

    pub fn current_image(&self) -> Option<ImageId> {
        let index = (self.cursor / self.template.frame_duration) as usize;
        self.template.frames.get(index).copied()
    }

    pub fn cursor(&self) -> u32 {
        self.cursor
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    pub fn template(&self) -> &AnimationTemplate {
        &self.template
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frames(count: u32) -> Vec<ImageId> {
        (0..count).map(ImageId).collect()
    }

    #[test]
    fn looping_animation_wraps_to_first_frame() {
        let mut animation = AnimationTemplate::new(frames(2), 3, true).instance();

        let mut seen = Vec::new();
        for _ in 0..7 {
            seen.push(animation.current_image().expect("frame").0);
            animation.update();
        }

        assert_eq!(seen, vec![0, 0, 0, 1, 1, 1, 0]);
        assert!(!animation.is_done());
    }

    #[test]
    fn one_shot_animation_clamps_and_stays_done() {
        let mut animation = AnimationTemplate::new(frames(3), 2, false).instance();

        for _ in 0..4 {
            animation.update();
            assert!(!animation.is_done());
        }
        animation.update();
        assert!(animation.is_done());
        assert_eq!(animation.cursor(), 5);

        for _ in 0..10 {
            animation.update();
        }
        assert!(animation.is_done());
        assert_eq!(animation.cursor(), 5);
        assert_eq!(animation.current_image(), Some(ImageId(2)));
    }

    #[test]
    fn instance_at_clamps_start_cursor() {
        let template = AnimationTemplate::new(frames(4), 5, false);

        assert_eq!(template.instance_at(7).current_image(), Some(ImageId(1)));
        assert_eq!(template.instance_at(500).cursor(), 19);
    }

    #[test]
    fn zero_frame_duration_is_raised_to_one() {
        let template = AnimationTemplate::new(frames(2), 0, true);
        assert_eq!(template.frame_duration(), 1);
    }

    #[test]
    fn instances_do_not_share_cursors() {
        let template = AnimationTemplate::new(frames(4), 1, true);
        let mut first = template.instance();
        let second = template.instance();

        first.update();

        assert_eq!(first.cursor(), 1);
        assert_eq!(second.cursor(), 0);
    }
}
