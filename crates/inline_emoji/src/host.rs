//! What the emoji engine needs from its surroundings.
//!
//! The host owns the text model and its layout, and knows how to get image bytes.
//! Default implementations of the loading traits live in [`crate::loaders`].

use std::{fmt::Debug, ops::Deref, sync::Arc};

use emath::Rect;
use epaint::Color32;

use crate::{
    animation::EmojiImage,
    error::Result,
    rendering::FidelityPolicy,
    text::{AttributedText, CharRange},
};

/// An editable text view that can lay out its text.
///
/// All methods are called from the UI thread.
pub trait TextHost {
    fn attributed_text(&self) -> &AttributedText;

    /// Replace the whole text content.
    fn set_attributed_text(&mut self, text: AttributedText);

    fn selection(&self) -> CharRange;

    fn set_selection(&mut self, selection: CharRange);

    /// Where the glyphs of `range` are, in the coordinate space overlays are placed in.
    fn bounding_rect_for(&self, range: CharRange) -> Rect;

    /// Height of one line in the current font. Emoji are this size.
    fn font_line_height(&self) -> f32;

    /// Painted behind each emoji overlay, so the placeholder glyph does not shine through.
    fn background_color(&self) -> Color32 {
        Color32::TRANSPARENT
    }
}

/// Raw image file contents, either baked into the binary or loaded at runtime.
///
/// Cloning never copies the bytes, so one download can be handed to the decoder thread.
#[derive(Clone)]
pub enum Bytes {
    Static(&'static [u8]),
    Shared(Arc<[u8]>),
}

impl Debug for Bytes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Static(bytes) => f.debug_tuple("Static").field(&bytes.len()).finish(),
            Self::Shared(bytes) => f.debug_tuple("Shared").field(&bytes.len()).finish(),
        }
    }
}

impl From<&'static [u8]> for Bytes {
    #[inline]
    fn from(value: &'static [u8]) -> Self {
        Self::Static(value)
    }
}

impl<const N: usize> From<&'static [u8; N]> for Bytes {
    #[inline]
    fn from(value: &'static [u8; N]) -> Self {
        Self::Static(value)
    }
}

impl From<Vec<u8>> for Bytes {
    #[inline]
    fn from(value: Vec<u8>) -> Self {
        Self::Shared(value.into())
    }
}

impl Deref for Bytes {
    type Target = [u8];

    #[inline]
    fn deref(&self) -> &Self::Target {
        match self {
            Self::Static(bytes) => bytes,
            Self::Shared(bytes) => bytes,
        }
    }
}

/// Image files bundled with the application.
pub trait AssetStore: Send + Sync {
    /// The raw bytes of the asset, or `None` if there is no such asset.
    fn load(&self, name: &str) -> Option<Bytes>;

    /// Every version of the asset, preferred one first.
    ///
    /// A store that keeps e.g. both an animation and a still image under one name returns both,
    /// and the render cache uses the first one that decodes.
    fn load_all(&self, name: &str) -> Vec<Bytes> {
        self.load(name).into_iter().collect()
    }
}

pub type FetchCallback = Box<dyn FnOnce(Result<Bytes>) + Send + 'static>;

/// Downloads images.
pub trait Fetcher: Send + Sync {
    /// Start downloading `url`. Must not block.
    ///
    /// `on_done` is called exactly once, on any thread, possibly before `fetch` returns.
    fn fetch(&self, url: &str, on_done: FetchCallback);
}

/// Turns image file bytes into frames.
pub trait ImageDecoder: Send + Sync {
    /// Decode an animation, or a still image if `bytes` are not animated.
    ///
    /// May be called on a background thread.
    ///
    /// # Errors
    /// If the bytes are neither a valid animation nor a valid still image.
    fn decode(&self, bytes: &[u8], policy: FidelityPolicy) -> Result<EmojiImage>;
}
