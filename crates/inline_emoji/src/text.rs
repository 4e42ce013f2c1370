//! A minimal attributed-text model: plain text interleaved with atomic attachment markers.

use emath::Vec2;

use crate::EmojiSource;

/// What an attachment marker looks like in [`AttributedText::plain_text`].
pub const OBJECT_REPLACEMENT_CHARACTER: char = '\u{FFFC}';

/// A range of `char` offsets, `start..end`.
///
/// Attachment markers count as one `char`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct CharRange {
    pub start: usize,
    pub end: usize,
}

impl CharRange {
    pub fn new(start: usize, end: usize) -> Self {
        Self {
            start,
            end: end.max(start),
        }
    }

    /// A range starting at `location`, `length` chars long.
    pub fn at(location: usize, length: usize) -> Self {
        Self::new(location, location + length)
    }

    /// A collapsed range, i.e. a cursor.
    pub fn cursor(location: usize) -> Self {
        Self::at(location, 0)
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn contains(&self, offset: usize) -> bool {
        self.start <= offset && offset < self.end
    }

    /// Move the range so it starts at `location`, keeping its length,
    /// then shrink it until it fits in a text of `char_count` chars.
    pub fn moved_to(self, location: usize, char_count: usize) -> Self {
        let start = location.min(char_count);
        let end = (start + self.len()).min(char_count);
        Self { start, end }
    }
}

/// An inline placeholder for one emoji.
///
/// Occupies exactly one character in the text it is part of.
#[derive(Clone, Debug, PartialEq)]
pub struct AttachmentMarker {
    /// A serialized [`EmojiSource`].
    pub payload: Vec<u8>,

    /// The intrinsic display size, usually one line height square.
    pub size: Vec2,

    /// Offset of the glyph relative to the laid out character box.
    ///
    /// Subtracted from the layout rectangle's origin when placing the overlay.
    pub offset: Vec2,
}

impl AttachmentMarker {
    pub fn new(source: &EmojiSource, size: Vec2) -> Self {
        Self {
            payload: source.to_payload(),
            size,
            offset: Vec2::ZERO,
        }
    }

    #[inline]
    pub fn with_offset(mut self, offset: Vec2) -> Self {
        self.offset = offset;
        self
    }

    /// # Errors
    /// If the payload is not a serialized [`EmojiSource`].
    pub fn source(&self) -> crate::Result<EmojiSource> {
        EmojiSource::from_payload(&self.payload)
    }
}

/// One run of an [`AttributedText`].
#[derive(Clone, Debug, PartialEq)]
pub enum Span {
    Text(String),
    Attachment(AttachmentMarker),
}

/// Text with inline attachment markers.
///
/// Adjacent text runs are always merged, and there are no empty text runs,
/// so two texts with the same content compare equal.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AttributedText {
    spans: Vec<Span>,
}

impl AttributedText {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spans(&self) -> &[Span] {
        &self.spans
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    pub fn push_str(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        if let Some(Span::Text(last)) = self.spans.last_mut() {
            last.push_str(text);
        } else {
            self.spans.push(Span::Text(text.to_owned()));
        }
    }

    pub fn push_attachment(&mut self, marker: AttachmentMarker) {
        self.spans.push(Span::Attachment(marker));
    }

    fn push_span(&mut self, span: Span) {
        match span {
            Span::Text(text) => self.push_str(&text),
            Span::Attachment(marker) => self.push_attachment(marker),
        }
    }

    /// Length in chars, counting each attachment as one.
    pub fn char_count(&self) -> usize {
        self.spans
            .iter()
            .map(|span| match span {
                Span::Text(text) => text.chars().count(),
                Span::Attachment(_) => 1,
            })
            .sum()
    }

    /// The text with every attachment replaced by [`OBJECT_REPLACEMENT_CHARACTER`].
    pub fn plain_text(&self) -> String {
        let mut plain = String::new();
        for span in &self.spans {
            match span {
                Span::Text(text) => plain.push_str(text),
                Span::Attachment(_) => plain.push(OBJECT_REPLACEMENT_CHARACTER),
            }
        }
        plain
    }

    /// Every attachment marker, in order, with the one-char range it occupies.
    pub fn attachments(&self) -> impl Iterator<Item = (CharRange, &AttachmentMarker)> + '_ {
        let mut offset = 0;
        self.spans.iter().filter_map(move |span| match span {
            Span::Text(text) => {
                offset += text.chars().count();
                None
            }
            Span::Attachment(marker) => {
                let range = CharRange::at(offset, 1);
                offset += 1;
                Some((range, marker))
            }
        })
    }

    pub fn attachment_count(&self) -> usize {
        self.spans
            .iter()
            .filter(|span| matches!(span, Span::Attachment(_)))
            .count()
    }

    /// Replace the chars in `range` with plain text, like a user edit does.
    ///
    /// Attachments inside the range are destroyed.
    pub fn replace_range(&mut self, range: CharRange, replacement: &str) {
        let count = self.char_count();
        let range = CharRange::new(range.start.min(count), range.end.min(count));

        let mut edited = Self::new();
        let mut pending = Some(replacement);
        let mut offset = 0;

        for span in std::mem::take(&mut self.spans) {
            match span {
                Span::Text(text) => {
                    let mut kept = String::new();
                    for c in text.chars() {
                        if offset == range.start {
                            kept.push_str(pending.take().unwrap_or_default());
                        }
                        if !range.contains(offset) {
                            kept.push(c);
                        }
                        offset += 1;
                    }
                    edited.push_str(&kept);
                }
                Span::Attachment(marker) => {
                    if offset == range.start {
                        edited.push_str(pending.take().unwrap_or_default());
                    }
                    if !range.contains(offset) {
                        edited.push_attachment(marker);
                    }
                    offset += 1;
                }
            }
        }
        if let Some(replacement) = pending {
            edited.push_str(replacement);
        }

        *self = edited;
    }

    /// Insert plain text before the char at `offset`.
    pub fn insert_str(&mut self, offset: usize, text: &str) {
        self.replace_range(CharRange::cursor(offset), text);
    }
}

impl From<&str> for AttributedText {
    fn from(text: &str) -> Self {
        let mut attributed = Self::new();
        attributed.push_str(text);
        attributed
    }
}

impl From<String> for AttributedText {
    fn from(text: String) -> Self {
        Self::from(text.as_str())
    }
}

impl FromIterator<Span> for AttributedText {
    fn from_iter<T: IntoIterator<Item = Span>>(iter: T) -> Self {
        let mut text = Self::new();
        for span in iter {
            text.push_span(span);
        }
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn marker(c: &str) -> AttachmentMarker {
        AttachmentMarker::new(&EmojiSource::Character(c.to_owned()), Vec2::splat(16.0))
    }

    fn sample() -> AttributedText {
        [
            Span::Text("ab".to_owned()),
            Span::Attachment(marker("x")),
            Span::Text("cd".to_owned()),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn counts_markers_as_one_char() {
        let text = sample();
        assert_eq!(text.char_count(), 5);
        assert_eq!(text.plain_text(), "ab\u{FFFC}cd");
        let ranges: Vec<_> = text.attachments().map(|(range, _)| range).collect();
        assert_eq!(ranges, vec![CharRange::at(2, 1)]);
    }

    #[test]
    fn adjacent_text_is_merged() {
        let mut text = AttributedText::from("a");
        text.push_str("");
        text.push_str("b");
        assert_eq!(text.spans(), &[Span::Text("ab".to_owned())]);
    }

    #[test]
    fn insert_before_marker() {
        let mut text = sample();
        text.insert_str(1, "xyz");
        assert_eq!(text.plain_text(), "axyzb\u{FFFC}cd");
        assert_eq!(text.attachments().next().map(|(r, _)| r), Some(CharRange::at(5, 1)));
    }

    #[test]
    fn insert_at_marker_and_end() {
        let mut text = sample();
        text.insert_str(2, "!");
        assert_eq!(text.plain_text(), "ab!\u{FFFC}cd");

        text.insert_str(100, "?");
        assert_eq!(text.plain_text(), "ab!\u{FFFC}cd?");
    }

    #[test]
    fn editing_over_a_marker_destroys_it() {
        let mut text = sample();
        text.replace_range(CharRange::new(1, 4), "-");
        assert_eq!(text.plain_text(), "a-d");
        assert_eq!(text.attachment_count(), 0);
        assert_eq!(text, AttributedText::from("a-d"));
    }

    #[test]
    fn moved_to_clamps() {
        let selection = CharRange::at(3, 4);
        assert_eq!(selection.moved_to(1, 10), CharRange::at(1, 4));
        assert_eq!(selection.moved_to(8, 10), CharRange::new(8, 10));
        assert_eq!(selection.moved_to(12, 10), CharRange::cursor(10));
    }
}
