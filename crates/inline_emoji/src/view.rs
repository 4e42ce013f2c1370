use std::sync::Arc;

use emath::Rect;
use epaint::{Color32, ColorImage};
use parking_lot::Mutex;

use crate::cache::{Frame, RenderHandle, Subscription};

/// What an [`EmojiView`] is showing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OverlayKind {
    /// Nothing: not bound yet, or the emoji could not be resolved.
    Unbound,

    /// A text label.
    Character,

    /// Whatever frame the shared render pipeline is on.
    Image,
}

enum Binding {
    Unbound,
    Character(String),
    Image {
        /// Kept for its `Drop`, which stops the mirroring.
        _subscription: Subscription,
    },
}

/// The overlay drawn on top of one attachment marker.
///
/// There is one per marker occurrence. Image emoji don't own their pixels: they mirror
/// the current frame of a [`RenderHandle`] shared by every occurrence of the same emoji.
pub struct EmojiView {
    rect: Rect,
    background: Color32,
    binding: Binding,
    image: Arc<Mutex<Frame>>,
}

impl std::fmt::Debug for EmojiView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmojiView")
            .field("rect", &self.rect)
            .field("kind", &self.kind())
            .field("label", &self.label())
            .finish_non_exhaustive()
    }
}

impl EmojiView {
    pub fn new(rect: Rect, background: Color32) -> Self {
        Self {
            rect,
            background,
            binding: Binding::Unbound,
            image: Default::default(),
        }
    }

    pub fn rect(&self) -> Rect {
        self.rect
    }

    pub fn background(&self) -> Color32 {
        self.background
    }

    pub fn kind(&self) -> OverlayKind {
        match self.binding {
            Binding::Unbound => OverlayKind::Unbound,
            Binding::Character(_) => OverlayKind::Character,
            Binding::Image { .. } => OverlayKind::Image,
        }
    }

    /// Show `character` as a text label. Final until the view is destroyed.
    pub fn bind_character(&mut self, character: impl Into<String>) {
        *self.image.lock() = None;
        self.binding = Binding::Character(character.into());
    }

    /// Mirror the frames of `handle`, starting with its current frame.
    pub fn bind_render_handle(&mut self, handle: &RenderHandle) {
        // Stop mirroring whatever we mirrored before.
        self.binding = Binding::Unbound;

        let image = Arc::clone(&self.image);
        let subscription = handle.subscribe(move |frame| {
            *image.lock() = frame.cloned();
        });
        self.binding = Binding::Image {
            _subscription: subscription,
        };
    }

    /// The label text, for character emoji.
    pub fn label(&self) -> Option<&str> {
        match &self.binding {
            Binding::Character(character) => Some(character),
            Binding::Unbound | Binding::Image { .. } => None,
        }
    }

    /// Point size for the label, so the glyph fills the overlay.
    pub fn label_font_size(&self) -> f32 {
        self.rect.width() / 1.1
    }

    /// The frame to draw, for image emoji that have loaded.
    pub fn image(&self) -> Option<Arc<ColorImage>> {
        self.image.lock().clone()
    }

    /// Remove the view, releasing its hold on the shared pipeline.
    pub fn destroy(self) {}
}
