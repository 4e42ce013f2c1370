//! Default implementations of the [`crate::host`] loading traits.
//!
//! ⚠ Without the `http` feature nothing can be downloaded, and without the `image` feature
//! nothing can be decoded: image emoji will render blank. Both are on by default.

use std::sync::Arc;

use crate::{
    animation::EmojiImage,
    error::{EmojiError, Result},
    host::{AssetStore, FetchCallback, Fetcher, ImageDecoder},
    rendering::FidelityPolicy,
};

mod asset_store;

#[cfg(feature = "http")]
mod ehttp_fetcher;

#[cfg(feature = "image")]
mod image_decoder;

pub use asset_store::{FileAssetStore, MemoryAssetStore};

#[cfg(feature = "http")]
pub use ehttp_fetcher::EhttpFetcher;

#[cfg(feature = "image")]
pub use image_decoder::{load_image_bytes, ImageCrateDecoder};

/// Everything the render cache needs to turn an [`crate::EmojiSource`] into frames.
#[derive(Clone)]
pub struct Loaders {
    pub assets: Arc<dyn AssetStore>,
    pub fetcher: Arc<dyn Fetcher>,
    pub decoder: Arc<dyn ImageDecoder>,
}

impl Loaders {
    #[inline]
    pub fn with_assets(mut self, assets: impl AssetStore + 'static) -> Self {
        self.assets = Arc::new(assets);
        self
    }

    #[inline]
    pub fn with_fetcher(mut self, fetcher: impl Fetcher + 'static) -> Self {
        self.fetcher = Arc::new(fetcher);
        self
    }

    #[inline]
    pub fn with_decoder(mut self, decoder: impl ImageDecoder + 'static) -> Self {
        self.decoder = Arc::new(decoder);
        self
    }
}

/// No assets, plus whatever fetcher and decoder the enabled features provide.
impl Default for Loaders {
    fn default() -> Self {
        #[cfg(feature = "http")]
        let fetcher: Arc<dyn Fetcher> = Arc::new(EhttpFetcher);
        #[cfg(not(feature = "http"))]
        let fetcher: Arc<dyn Fetcher> = Arc::new(NoFetcher);

        #[cfg(feature = "image")]
        let decoder: Arc<dyn ImageDecoder> = Arc::new(ImageCrateDecoder);
        #[cfg(not(feature = "image"))]
        let decoder: Arc<dyn ImageDecoder> = Arc::new(NoDecoder);

        Self {
            assets: Arc::new(MemoryAssetStore::default()),
            fetcher,
            decoder,
        }
    }
}

impl std::fmt::Debug for Loaders {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Loaders").finish_non_exhaustive()
    }
}

/// Fails every download.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoFetcher;

impl Fetcher for NoFetcher {
    fn fetch(&self, url: &str, on_done: FetchCallback) {
        on_done(Err(EmojiError::Fetch {
            url: url.to_owned(),
            message: "no fetcher installed (enable the `http` feature)".to_owned(),
        }));
    }
}

/// Fails every decode.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoDecoder;

impl ImageDecoder for NoDecoder {
    fn decode(&self, _bytes: &[u8], _policy: FidelityPolicy) -> Result<EmojiImage> {
        Err(EmojiError::Decode(
            "no decoder installed (enable the `image` feature)".to_owned(),
        ))
    }
}
