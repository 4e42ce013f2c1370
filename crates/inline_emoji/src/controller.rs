//! Keeps emoji overlays in sync with the text of one text view.

use std::time::Duration;

use emath::Rect;

use crate::{
    cache::RenderCache,
    config::EmojiOptions,
    encoder::{insert_emojis, Shortcodes},
    error::{self, EmojiError},
    host::TextHost,
    rendering::EmojiRendering,
    text::AttachmentMarker,
    view::EmojiView,
    EmojiSource,
};

/// Custom emoji for one editable text view.
///
/// Owns the host text view and the overlays drawn on top of it.
/// Every method must be called from the UI thread.
///
/// ```
/// # use inline_emoji::{*, text::*};
/// # use emath::{pos2, vec2, Rect};
/// # #[derive(Default)]
/// # struct MyTextView { text: AttributedText, selection: CharRange }
/// # impl TextHost for MyTextView {
/// #     fn attributed_text(&self) -> &AttributedText { &self.text }
/// #     fn set_attributed_text(&mut self, text: AttributedText) { self.text = text; }
/// #     fn selection(&self) -> CharRange { self.selection }
/// #     fn set_selection(&mut self, selection: CharRange) { self.selection = selection; }
/// #     fn bounding_rect_for(&self, range: CharRange) -> Rect {
/// #         Rect::from_min_size(pos2(range.start as f32 * 10.0, 0.0), vec2(10.0, 20.0))
/// #     }
/// #     fn font_line_height(&self) -> f32 { 20.0 }
/// # }
/// let shortcodes = Shortcodes::new().with("wave", EmojiSource::Character("👋".to_owned()));
/// let mut view = EmojiTextView::configure_emojis(
///     MyTextView::default(),
///     shortcodes,
///     EmojiRendering::default(),
///     RenderCache::default(),
/// );
///
/// view.edit(|host| host.text.push_str("hi :wave:"));
/// view.update(Duration::from_millis(16));
///
/// assert_eq!(view.overlays().len(), 1);
/// assert_eq!(view.overlays()[0].label(), Some("👋"));
/// # use std::time::Duration;
/// ```
pub struct EmojiTextView<H: TextHost> {
    host: H,
    shortcodes: Shortcodes,
    rendering: EmojiRendering,
    cache: RenderCache,
    overlays: Vec<EmojiView>,

    /// The text changed since the last synchronization.
    dirty: bool,
}

impl<H: TextHost> EmojiTextView<H> {
    /// Start showing `shortcodes` as emoji in `host`, and synchronize once.
    ///
    /// `cache` may be shared with other text views.
    pub fn configure_emojis(
        host: H,
        shortcodes: Shortcodes,
        rendering: EmojiRendering,
        cache: RenderCache,
    ) -> Self {
        let mut view = Self {
            host,
            shortcodes,
            rendering,
            cache,
            overlays: Vec::new(),
            dirty: false,
        };
        view.synchronize();
        view
    }

    /// Like [`Self::configure_emojis`], with rendering and alias depth from `options`.
    pub fn configure_with_options(
        host: H,
        mut shortcodes: Shortcodes,
        options: &EmojiOptions,
        cache: RenderCache,
    ) -> Self {
        shortcodes.max_alias_depth = options.max_alias_depth;
        Self::configure_emojis(host, shortcodes, options.rendering, cache)
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    /// Change the host without telling the emoji engine. See [`Self::edit`].
    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn into_host(self) -> H {
        self.host
    }

    /// Change the host's text, and schedule a synchronization.
    pub fn edit<R>(&mut self, edit: impl FnOnce(&mut H) -> R) -> R {
        let result = edit(&mut self.host);
        self.text_changed();
        result
    }

    pub fn shortcodes(&self) -> &Shortcodes {
        &self.shortcodes
    }

    pub fn rendering(&self) -> EmojiRendering {
        self.rendering
    }

    pub fn cache(&self) -> &RenderCache {
        &self.cache
    }

    /// One overlay per attachment marker in the text, in text order.
    pub fn overlays(&self) -> &[EmojiView] {
        &self.overlays
    }

    /// The host's text-changed notification.
    ///
    /// Any number of these between two [`Self::run_pending`] calls cause a single synchronization.
    pub fn text_changed(&mut self) {
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Synchronize if the text changed. Returns `true` if it did.
    pub fn run_pending(&mut self) -> bool {
        if std::mem::take(&mut self.dirty) {
            self.synchronize();
            true
        } else {
            false
        }
    }

    /// Everything a host needs to call once per frame:
    /// run a pending synchronization, apply finished loads, and animate.
    pub fn update(&mut self, dt: Duration) {
        self.run_pending();
        self.cache.poll();
        self.cache.advance(dt);
    }

    /// Re-encode the text, rebuild every overlay, and put the selection back where the user sees it.
    pub fn synchronize(&mut self) {
        self.dirty = false;

        let selection = self.host.selection();
        let old_count = self.host.attributed_text().char_count();

        let encoded = insert_emojis(
            self.host.attributed_text(),
            &self.shortcodes,
            self.host.font_line_height(),
        );
        let location = selection
            .start
            .saturating_sub(encoded.removed_before(selection.start));
        self.host.set_attributed_text(encoded.text);
        let new_count = self.host.attributed_text().char_count();

        // Bind the new overlays while the old ones still hold their pipelines,
        // so nothing on screen gets evicted and loaded again.
        let overlays = self.build_overlays();
        for overlay in std::mem::replace(&mut self.overlays, overlays) {
            overlay.destroy();
        }

        self.host
            .set_selection(selection.moved_to(location, new_count));

        log::trace!(
            "synchronized {} emoji overlays, text {old_count} -> {new_count} chars",
            self.overlays.len()
        );
    }

    fn build_overlays(&self) -> Vec<EmojiView> {
        let background = self.host.background_color();
        self.host
            .attributed_text()
            .attachments()
            .map(|(range, marker)| {
                let rect = overlay_rect(self.host.bounding_rect_for(range), marker);
                let mut view = EmojiView::new(rect, background);
                if let Some(source) = error::absorb(marker.source(), &"attachment marker") {
                    self.bind(&mut view, source);
                }
                view
            })
            .collect()
    }

    fn bind(&self, view: &mut EmojiView, source: EmojiSource) {
        match source {
            EmojiSource::Character(character) => view.bind_character(character),
            EmojiSource::ImageUrl(_) | EmojiSource::ImageAsset(_) => {
                let handle = self.cache.get_or_create(&source, self.rendering);
                if let Some(handle) = error::absorb(handle, &source) {
                    view.bind_render_handle(&handle);
                }
            }
            EmojiSource::Alias(shortcode) => {
                error::absorb::<()>(Err(EmojiError::UnresolvedAlias(shortcode.clone())), &shortcode);
            }
        }
    }
}

/// Where the overlay for `marker` goes, given where the layout put its character.
fn overlay_rect(layout_rect: Rect, marker: &AttachmentMarker) -> Rect {
    Rect::from_min_size(layout_rect.min - marker.offset, marker.size)
}

impl<H: TextHost + std::fmt::Debug> std::fmt::Debug for EmojiTextView<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmojiTextView")
            .field("host", &self.host)
            .field("rendering", &self.rendering)
            .field("overlays", &self.overlays)
            .field("dirty", &self.dirty)
            .finish_non_exhaustive()
    }
}
