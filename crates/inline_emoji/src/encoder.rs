//! Replaces `:shortcode:` tokens in text with attachment markers.

use ahash::HashMap;
use emath::Vec2;

use crate::{
    text::{AttachmentMarker, AttributedText, CharRange, Span},
    EmojiSource,
};

/// The emoji a text view knows about, keyed by shortcode (without the colons).
#[derive(Clone, Debug, PartialEq)]
pub struct Shortcodes {
    emojis: HashMap<String, EmojiSource>,

    /// How many [`EmojiSource::Alias`] hops to follow before giving up.
    pub max_alias_depth: usize,
}

impl Default for Shortcodes {
    fn default() -> Self {
        Self {
            emojis: Default::default(),
            max_alias_depth: 8,
        }
    }
}

impl Shortcodes {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn with(mut self, shortcode: impl Into<String>, source: EmojiSource) -> Self {
        self.insert(shortcode, source);
        self
    }

    pub fn insert(&mut self, shortcode: impl Into<String>, source: EmojiSource) -> Option<EmojiSource> {
        self.emojis.insert(shortcode.into(), source)
    }

    pub fn get(&self, shortcode: &str) -> Option<&EmojiSource> {
        self.emojis.get(shortcode)
    }

    pub fn len(&self) -> usize {
        self.emojis.len()
    }

    pub fn is_empty(&self) -> bool {
        self.emojis.is_empty()
    }

    /// Look up a shortcode, following aliases.
    ///
    /// Returns `None` for unknown shortcodes. A dangling or cyclic alias chain
    /// resolves to the last alias seen, which renders blank.
    pub fn resolve(&self, shortcode: &str) -> Option<EmojiSource> {
        let mut source = self.emojis.get(shortcode)?;
        for _ in 0..self.max_alias_depth {
            let EmojiSource::Alias(target) = source else {
                return Some(source.clone());
            };
            match self.emojis.get(target) {
                Some(next) => source = next,
                None => break,
            }
        }
        Some(source.clone())
    }
}

impl<S: Into<String>> FromIterator<(S, EmojiSource)> for Shortcodes {
    fn from_iter<T: IntoIterator<Item = (S, EmojiSource)>>(iter: T) -> Self {
        let mut shortcodes = Self::default();
        for (shortcode, source) in iter {
            shortcodes.insert(shortcode, source);
        }
        shortcodes
    }
}

/// Output of [`insert_emojis`].
#[derive(Clone, Debug, PartialEq)]
pub struct Encoded {
    pub text: AttributedText,

    /// How many chars shorter the text got.
    pub removed_chars: usize,

    /// The ranges of the input text that became markers, in order.
    pub replaced: Vec<CharRange>,
}

impl Encoded {
    /// How many chars before `offset` in the input text are gone from the output.
    ///
    /// An offset inside a replaced token lands on the token's marker.
    pub fn removed_before(&self, offset: usize) -> usize {
        let mut removed = 0;
        for range in &self.replaced {
            if range.end <= offset {
                removed += range.len() - 1;
            } else {
                if range.start < offset {
                    removed += offset - range.start;
                }
                break;
            }
        }
        removed
    }
}

/// Replace every known `:shortcode:` in the plain runs of `text` with an attachment marker
/// `line_height` points square.
///
/// Existing markers are kept as they are, so encoding twice changes nothing.
/// Unknown tokens stay as text; their closing colon can still open the next token,
/// so `:nope:wave:` finds `:wave:`.
pub fn insert_emojis(text: &AttributedText, shortcodes: &Shortcodes, line_height: f32) -> Encoded {
    let size = Vec2::splat(line_height);
    let mut encoded = AttributedText::new();
    let mut replaced = Vec::new();
    let mut offset = 0;

    for span in text.spans() {
        match span {
            Span::Text(plain) => {
                encode_run(plain, offset, shortcodes, size, &mut encoded, &mut replaced);
                offset += plain.chars().count();
            }
            Span::Attachment(marker) => {
                encoded.push_attachment(marker.clone());
                offset += 1;
            }
        }
    }

    let removed_chars = text.char_count().saturating_sub(encoded.char_count());
    Encoded {
        text: encoded,
        removed_chars,
        replaced,
    }
}

/// `offset` is where `rest` starts in the input text.
fn encode_run(
    mut rest: &str,
    mut offset: usize,
    shortcodes: &Shortcodes,
    size: Vec2,
    out: &mut AttributedText,
    replaced: &mut Vec<CharRange>,
) {
    loop {
        let Some(open) = rest.find(':') else {
            break;
        };
        let after_open = &rest[open + 1..];
        let Some(close) = after_open.find(':') else {
            break;
        };
        let name = &after_open[..close];
        let source = if name.is_empty() {
            None
        } else {
            shortcodes.resolve(name)
        };

        match source {
            Some(source) => {
                let before = &rest[..open];
                out.push_str(before);
                out.push_attachment(AttachmentMarker::new(&source, size));

                let token = CharRange::at(offset + before.chars().count(), name.chars().count() + 2);
                replaced.push(token);
                offset = token.end;
                rest = &after_open[close + 1..];
            }
            None => {
                let kept = &rest[..=open];
                out.push_str(kept);
                offset += kept.chars().count();
                rest = after_open;
            }
        }
    }
    out.push_str(rest);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wave() -> EmojiSource {
        EmojiSource::Character("👋".to_owned())
    }

    fn shortcodes() -> Shortcodes {
        Shortcodes::new()
            .with("wave", wave())
            .with("party", EmojiSource::ImageUrl("https://example.com/party.gif".to_owned()))
            .with("hi", EmojiSource::Alias("wave".to_owned()))
    }

    fn encode(text: &str) -> Encoded {
        insert_emojis(&text.into(), &shortcodes(), 20.0)
    }

    #[test]
    fn replaces_known_shortcodes() {
        let encoded = encode("hi :wave:");
        assert_eq!(encoded.text.plain_text(), "hi \u{FFFC}");
        assert_eq!(encoded.removed_chars, 5);

        let attachments: Vec<_> = encoded.text.attachments().collect();
        assert_eq!(attachments.len(), 1);
        let (range, marker) = attachments[0];
        assert_eq!(range, CharRange::at(3, 1));
        assert_eq!(marker.source(), Ok(wave()));
        assert_eq!(marker.size, Vec2::splat(20.0));
    }

    #[test]
    fn leaves_unknown_tokens_alone() {
        for text in ["", "no emoji", ":", "::", ":nope:", "12:30", "wave:", ":wave"] {
            let encoded = encode(text);
            assert_eq!(encoded.text.plain_text(), text);
            assert_eq!(encoded.removed_chars, 0);
        }
    }

    #[test]
    fn closing_colon_of_unknown_token_can_open_the_next() {
        assert_eq!(encode(":nope:wave:").text.plain_text(), ":nope\u{FFFC}");
        assert_eq!(encode("::wave::").text.plain_text(), ":\u{FFFC}:");
        assert_eq!(encode(":wave::party:").text.attachment_count(), 2);
    }

    #[test]
    fn encoding_is_idempotent() {
        for text in [
            "hi :wave:",
            ":wave::wave:",
            "::wave::",
            ":nope:wave:party:",
            "a:b:c:wave:d:",
            "👋 :party: and :hi:!",
        ] {
            let once = encode(text);
            let twice = insert_emojis(&once.text, &shortcodes(), 20.0);
            assert_eq!(twice.text, once.text, "{text:?}");
            assert_eq!(twice.removed_chars, 0);
        }
    }

    #[test]
    fn reports_what_was_removed_before_an_offset() {
        // 0123456789012345678
        // ab :wave: cd :hi: e
        let encoded = encode("ab :wave: cd :hi: e");
        assert_eq!(encoded.replaced, vec![CharRange::new(3, 9), CharRange::new(13, 17)]);
        assert_eq!(encoded.removed_chars, 5 + 3);

        assert_eq!(encoded.removed_before(2), 0, "tokens after the offset do not count");
        assert_eq!(encoded.removed_before(3), 0);
        assert_eq!(encoded.removed_before(9), 5);
        assert_eq!(encoded.removed_before(12), 5);
        assert_eq!(encoded.removed_before(17), 8);
        assert_eq!(encoded.removed_before(19), 8);

        assert_eq!(encoded.removed_before(6), 3, "inside a token lands on its marker");
    }

    #[test]
    fn offsets_count_existing_markers_as_one_char() {
        let once = encode(":wave: x");
        let mut text = once.text.clone();
        text.push_str(" :party:");
        let twice = insert_emojis(&text, &shortcodes(), 20.0);
        assert_eq!(twice.replaced, vec![CharRange::new(4, 11)]);
        assert_eq!(twice.removed_before(11), 6);
    }

    #[test]
    fn aliases_are_substituted() {
        let encoded = encode(":hi:");
        let (_, marker) = encoded.text.attachments().next().unwrap();
        assert_eq!(marker.source(), Ok(wave()));
    }

    #[test]
    fn broken_aliases_stay_aliases() {
        let shortcodes = Shortcodes::new()
            .with("a", EmojiSource::Alias("b".to_owned()))
            .with("b", EmojiSource::Alias("a".to_owned()))
            .with("dangling", EmojiSource::Alias("gone".to_owned()));

        assert!(matches!(shortcodes.resolve("a"), Some(EmojiSource::Alias(_))));
        assert_eq!(
            shortcodes.resolve("dangling"),
            Some(EmojiSource::Alias("gone".to_owned()))
        );
        assert_eq!(shortcodes.resolve("missing"), None);
    }
}
