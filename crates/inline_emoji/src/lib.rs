//! Inline custom emoji for editable text views.
//!
//! Type `:wave:` and see 👋, or an animated image, in its place:
//!
//! 1. The [`encoder`] replaces each known `:shortcode:` with an attachment marker,
//!    an atomic one-char placeholder carrying a serialized [`EmojiSource`].
//! 2. [`EmojiTextView`] re-encodes the text on every change, places one [`EmojiView`]
//!    overlay over each marker using the host's text layout, and keeps the cursor where the user sees it.
//! 3. Image emoji are decoded and animated once per distinct source by the [`RenderCache`];
//!    every overlay showing that emoji mirrors the same frames.
//!
//! The text view itself is yours: implement [`TextHost`] for it.
//! Downloading, asset lookup and decoding go through the traits in [`host`],
//! with default implementations in [`loaders`].
//!
//! Emoji are decoration. Nothing in here fails loudly: an emoji that cannot be shown is left blank,
//! and the failure is logged with the [`log`](https://docs.rs/log) crate.
//!
//! ## Feature flags
#![cfg_attr(feature = "document-features", doc = document_features::document_features!())]
//!

#![forbid(unsafe_code)]

pub mod animation;
pub mod cache;
mod config;
mod controller;
pub mod encoder;
mod error;
pub mod host;
pub mod loaders;
mod rendering;
mod source;
pub mod text;
mod view;

pub use crate::{
    cache::{HandleState, RenderCache, RenderHandle, Subscription},
    config::EmojiOptions,
    controller::EmojiTextView,
    encoder::{insert_emojis, Encoded, Shortcodes},
    error::{absorb, EmojiError, Result},
    host::TextHost,
    rendering::{EmojiRendering, FidelityPolicy, Quality},
    source::EmojiSource,
    view::{EmojiView, OverlayKind},
};
