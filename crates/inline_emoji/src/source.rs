use serde::{Deserialize, Serialize};

use crate::error::{self, EmojiError, Result};

/// Where the glyph of one custom emoji comes from.
///
/// Used as the cache key: two sources are the same emoji iff they have the same
/// variant and the same payload.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EmojiSource {
    /// A plain character (or grapheme cluster), e.g. `"👋"`. Drawn as a label.
    Character(String),

    /// An image (possibly animated) downloaded from this URL.
    ImageUrl(String),

    /// An image (possibly animated) bundled with the application under this name.
    ImageAsset(String),

    /// Another shortcode. Resolved by the encoder; never rendered.
    Alias(String),
}

fn payload_config() -> bincode::config::Configuration {
    bincode::config::standard()
}

impl EmojiSource {
    /// Is this drawn from image data (and thus shared through the render cache)?
    pub fn is_image(&self) -> bool {
        matches!(self, Self::ImageUrl(_) | Self::ImageAsset(_))
    }

    /// Serialize into the compact payload stored inside attachment markers.
    ///
    /// The layout is a variant tag followed by the length-prefixed string.
    /// If serialization fails, the failure is logged and the payload is empty,
    /// which [`Self::from_payload`] rejects: the marker then renders blank.
    pub fn to_payload(&self) -> Vec<u8> {
        let payload = bincode::serde::encode_to_vec(self, payload_config())
            .map_err(|err| EmojiError::MalformedPayload(err.to_string()));
        error::absorb(payload, self).unwrap_or_default()
    }

    /// Parse a payload produced by [`Self::to_payload`].
    ///
    /// # Errors
    /// [`EmojiError::MalformedPayload`] on truncated or foreign bytes.
    pub fn from_payload(bytes: &[u8]) -> Result<Self> {
        let (source, read) = bincode::serde::decode_from_slice(bytes, payload_config())
            .map_err(|err| EmojiError::MalformedPayload(err.to_string()))?;
        if read != bytes.len() {
            return Err(EmojiError::MalformedPayload(format!(
                "{} trailing bytes",
                bytes.len() - read
            )));
        }
        Ok(source)
    }
}

impl std::fmt::Display for EmojiSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Character(character) => f.write_str(character),
            Self::ImageUrl(url) => write!(f, "url:{url}"),
            Self::ImageAsset(name) => write!(f, "asset:{name}"),
            Self::Alias(shortcode) => write!(f, "alias:{shortcode}"),
        }
    }
}
