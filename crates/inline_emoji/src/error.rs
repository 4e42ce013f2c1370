/// Why an emoji could not be shown.
///
/// Emoji are decoration: none of these ever reach the host application.
/// They are produced by the loaders and the cache, and dropped in [`absorb`].
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum EmojiError {
    /// An attachment marker carried bytes that are not a valid [`crate::EmojiSource`].
    #[error("malformed emoji payload: {0}")]
    MalformedPayload(String),

    /// The image could not be downloaded.
    #[error("failed to fetch {url:?}: {message}")]
    Fetch { url: String, message: String },

    /// The image bytes could not be decoded, neither as an animation nor as a static image.
    #[error("failed to decode image: {0}")]
    Decode(String),

    /// The asset store has nothing under this name.
    #[error("no asset named {0:?}")]
    AssetMissing(String),

    /// A [`crate::EmojiSource::Character`] was asked for image data.
    #[error("{0:?} is a character, not an image")]
    NotAnImage(String),

    /// An [`crate::EmojiSource::Alias`] reached the renderer without being resolved.
    #[error("unresolved emoji alias {0:?}")]
    UnresolvedAlias(String),
}

pub type Result<T, E = EmojiError> = std::result::Result<T, E>;

/// The one place where emoji failures are dropped.
///
/// Returns the value on success. On failure the error is logged and `None` is returned,
/// so the affected overlay renders blank and nothing else is disturbed.
/// `what` names the emoji in the log.
pub fn absorb<T>(result: Result<T>, what: &dyn std::fmt::Display) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(err @ (EmojiError::UnresolvedAlias(_) | EmojiError::NotAnImage(_))) => {
            log::warn!("rendering {what} blank: {err}");
            None
        }
        Err(err) => {
            log::debug!("rendering {what} blank: {err}");
            None
        }
    }
}
