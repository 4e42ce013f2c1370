use std::{mem::size_of, sync::Arc, time::Duration};

use epaint::{Color32, ColorImage};

use crate::{
    error::{EmojiError, Result},
    rendering::FidelityPolicy,
};

/// Delays at or below this are what encoders write when they mean "as fast as you like".
/// Browsers show such frames for [`DEFAULT_FRAME_DELAY`] instead, and so do we.
const MIN_FRAME_DELAY: Duration = Duration::from_millis(10);

const DEFAULT_FRAME_DELAY: Duration = Duration::from_millis(100);

/// Frames and how long each should be shown.
#[derive(Clone, Debug)]
pub struct AnimatedImage {
    frames: Vec<(Arc<ColorImage>, Duration)>,
}

impl AnimatedImage {
    /// Build an animation, dropping frames according to `policy`.
    ///
    /// A dropped frame's delay is added to the frame before it, so the animation keeps its length.
    ///
    /// # Errors
    /// If there are no frames.
    pub fn new(
        frames: impl IntoIterator<Item = (Arc<ColorImage>, Duration)>,
        policy: FidelityPolicy,
    ) -> Result<Self> {
        let mut kept: Vec<(Arc<ColorImage>, Duration)> = Vec::new();
        for (index, (image, delay)) in frames.into_iter().enumerate() {
            let delay = if delay <= MIN_FRAME_DELAY {
                DEFAULT_FRAME_DELAY
            } else {
                delay
            };
            match kept.last_mut() {
                Some((_, previous)) if !policy.keeps_frame(index) => *previous += delay,
                _ => kept.push((image, delay)),
            }
        }

        if kept.is_empty() {
            return Err(EmojiError::Decode("animation has no frames".to_owned()));
        }
        Ok(Self { frames: kept })
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Gets image at index, wrapping around.
    pub fn get_image(&self, index: usize) -> Arc<ColorImage> {
        Arc::clone(&self.frames[index % self.frames.len()].0)
    }

    pub fn delay(&self, index: usize) -> Duration {
        self.frames[index % self.frames.len()].1
    }

    /// One loop of the animation.
    pub fn total_duration(&self) -> Duration {
        self.frames.iter().map(|(_, delay)| *delay).sum()
    }

    /// Which frame is showing `elapsed` after the animation started. Loops forever.
    pub fn frame_index_at(&self, elapsed: Duration) -> usize {
        let total = self.total_duration().as_nanos();
        if total == 0 {
            return 0;
        }
        let mut position = elapsed.as_nanos() % total;
        for (index, (_, delay)) in self.frames.iter().enumerate() {
            let delay = delay.as_nanos();
            if position < delay {
                return index;
            }
            position -= delay;
        }
        self.frames.len() - 1
    }

    pub fn byte_len(&self) -> usize {
        size_of::<Self>()
            + self
                .frames
                .iter()
                .map(|(image, _)| {
                    image.pixels.len() * size_of::<Color32>() + size_of::<Duration>()
                })
                .sum::<usize>()
    }
}

/// Decoded image data for one emoji.
#[derive(Clone, Debug)]
pub enum EmojiImage {
    Static(Arc<ColorImage>),
    Animated(Arc<AnimatedImage>),
}

impl EmojiImage {
    pub fn is_animated(&self) -> bool {
        matches!(self, Self::Animated(animation) if animation.len() > 1)
    }

    /// The frame showing `elapsed` after display started.
    pub fn frame_at(&self, elapsed: Duration) -> (usize, Arc<ColorImage>) {
        match self {
            Self::Static(image) => (0, Arc::clone(image)),
            Self::Animated(animation) => {
                let index = animation.frame_index_at(elapsed);
                (index, animation.get_image(index))
            }
        }
    }

    pub fn byte_len(&self) -> usize {
        match self {
            Self::Static(image) => image.pixels.len() * size_of::<Color32>(),
            Self::Animated(animation) => animation.byte_len(),
        }
    }
}
