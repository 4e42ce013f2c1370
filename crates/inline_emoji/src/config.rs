use serde::{Deserialize, Serialize};

use crate::rendering::EmojiRendering;

/// Settings for emoji in text views.
///
/// All fields have defaults, so a config file only needs to name what it changes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmojiOptions {
    pub rendering: EmojiRendering,

    /// How many distinct image emoji the [`crate::RenderCache`] keeps decoded.
    pub cache_capacity: usize,

    /// How many alias hops to follow when resolving a shortcode.
    pub max_alias_depth: usize,

    /// Tried in order by [`crate::loaders::FileAssetStore`].
    pub asset_extensions: Vec<String>,
}

impl Default for EmojiOptions {
    fn default() -> Self {
        Self {
            rendering: EmojiRendering::HIGH,
            cache_capacity: 256,
            max_alias_depth: 8,
            asset_extensions: vec!["gif".to_owned(), "png".to_owned()],
        }
    }
}

impl EmojiOptions {
    /// A [`crate::loaders::FileAssetStore`] for `root` using [`Self::asset_extensions`].
    pub fn file_asset_store(&self, root: impl Into<std::path::PathBuf>) -> crate::loaders::FileAssetStore {
        crate::loaders::FileAssetStore::new(root).with_extensions(self.asset_extensions.iter().cloned())
    }
}
