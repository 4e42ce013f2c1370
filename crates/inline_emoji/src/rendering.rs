use serde::{Deserialize, Serialize};

/// How much decoding work to spend on animated emoji.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Quality {
    /// Every frame is played.
    Highest,

    #[default]
    High,

    Medium,

    /// For text with many animated emoji.
    Low,

    /// Slideshow-like playback.
    Lowest,
}

/// Rendering options for a text view's emoji.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EmojiRendering {
    pub quality: Quality,
}

impl EmojiRendering {
    pub const HIGHEST: Self = Self::new(Quality::Highest);
    pub const HIGH: Self = Self::new(Quality::High);
    pub const MEDIUM: Self = Self::new(Quality::Medium);
    pub const LOW: Self = Self::new(Quality::Low);
    pub const LOWEST: Self = Self::new(Quality::Lowest);

    pub const fn new(quality: Quality) -> Self {
        Self { quality }
    }

    /// The frame-skipping policy used when decoding animations.
    pub fn fidelity(self) -> FidelityPolicy {
        match self.quality {
            Quality::Highest => FidelityPolicy::NO_FRAME_SKIPPING,
            Quality::High => FidelityPolicy::DEFAULT,
            Quality::Medium => FidelityPolicy::MANY_ANIMATIONS,
            Quality::Low => FidelityPolicy::TOO_MANY_ANIMATIONS,
            Quality::Lowest => FidelityPolicy::SLIDESHOW,
        }
    }
}

/// Fraction of the frames of an animation that survive decoding.
///
/// Ordered: a higher policy keeps more frames.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd)]
pub struct FidelityPolicy {
    /// In `(0, 1]`. `1.0` keeps every frame.
    pub level_of_integrity: f32,
}

impl FidelityPolicy {
    pub const NO_FRAME_SKIPPING: Self = Self {
        level_of_integrity: 1.0,
    };
    pub const DEFAULT: Self = Self {
        level_of_integrity: 0.8,
    };
    pub const MANY_ANIMATIONS: Self = Self {
        level_of_integrity: 0.5,
    };
    pub const TOO_MANY_ANIMATIONS: Self = Self {
        level_of_integrity: 0.2,
    };
    pub const SLIDESHOW: Self = Self {
        level_of_integrity: 0.1,
    };

    /// Does the frame at `index` survive decoding?
    ///
    /// Frames are dropped evenly: out of any run of `n` frames, about
    /// `n * level_of_integrity` are kept. The first frame is always kept.
    pub fn keeps_frame(self, index: usize) -> bool {
        if index == 0 {
            return true;
        }
        let integrity = f64::from(self.level_of_integrity.clamp(0.01, 1.0));
        let step = |i: usize| (i as f64 * integrity + 1e-6).floor() as u64;
        step(index) != step(index - 1)
    }

    /// How many of `frame_count` frames survive decoding.
    pub fn kept_frames(self, frame_count: usize) -> usize {
        (0..frame_count).filter(|&i| self.keeps_frame(i)).count()
    }
}

impl Default for FidelityPolicy {
    fn default() -> Self {
        Self::DEFAULT
    }
}
