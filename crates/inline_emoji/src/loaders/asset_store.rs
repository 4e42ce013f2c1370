use std::path::{Path, PathBuf};

use ahash::HashMap;
use parking_lot::RwLock;

use crate::host::{AssetStore, Bytes};

/// Assets kept in memory, e.g. from `include_bytes!`.
#[derive(Default)]
pub struct MemoryAssetStore {
    assets: RwLock<HashMap<String, Bytes>>,
}

impl MemoryAssetStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn with(self, name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        self.insert(name, bytes);
        self
    }

    pub fn insert(&self, name: impl Into<String>, bytes: impl Into<Bytes>) {
        self.assets.write().insert(name.into(), bytes.into());
    }

    pub fn len(&self) -> usize {
        self.assets.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.read().is_empty()
    }
}

impl AssetStore for MemoryAssetStore {
    fn load(&self, name: &str) -> Option<Bytes> {
        self.assets.read().get(name).cloned()
    }
}

/// Assets stored as files in one directory.
///
/// `load("party")` tries `party`, then `party.gif`, `party.png`, … in the order of
/// [`Self::extensions`], so an animated version wins over a still one.
#[derive(Clone, Debug)]
pub struct FileAssetStore {
    root: PathBuf,
    pub extensions: Vec<String>,
}

impl FileAssetStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            extensions: vec!["gif".to_owned(), "png".to_owned()],
        }
    }

    #[inline]
    pub fn with_extensions(mut self, extensions: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    fn candidates(&self, name: &str) -> impl Iterator<Item = PathBuf> {
        let plain = self.root.join(name);
        let with_extension = self
            .extensions
            .iter()
            .map(move |extension| self.root.join(format!("{name}.{extension}")));
        std::iter::once(plain).chain(with_extension)
    }
}

/// Asset names are names, not paths.
fn is_valid_name(name: &str) -> bool {
    !name.is_empty() && !name.contains(['/', '\\']) && name != ".."
}

fn read_asset(path: &Path) -> Option<Bytes> {
    if !path.is_file() {
        return None;
    }
    match std::fs::read(path) {
        Ok(bytes) => Some(bytes.into()),
        Err(err) => {
            log::debug!("failed to read asset {path:?}: {err}");
            None
        }
    }
}

impl AssetStore for FileAssetStore {
    fn load(&self, name: &str) -> Option<Bytes> {
        if !is_valid_name(name) {
            return None;
        }
        self.candidates(name).find_map(|path| read_asset(&path))
    }

    fn load_all(&self, name: &str) -> Vec<Bytes> {
        if !is_valid_name(name) {
            return Vec::new();
        }
        self.candidates(name)
            .filter_map(|path| read_asset(&path))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store() {
        let store = MemoryAssetStore::new().with("party", b"GIF89a");
        assert_eq!(store.len(), 1);
        assert_eq!(store.load("party").as_deref(), Some(&b"GIF89a"[..]));
        assert!(store.load("nope").is_none());
    }

    #[test]
    fn file_store_prefers_extensions_in_order() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("party.png"), b"png").unwrap();
        std::fs::write(dir.path().join("party.gif"), b"gif").unwrap();
        std::fs::write(dir.path().join("still.png"), b"still").unwrap();

        let store = FileAssetStore::new(dir.path());
        assert_eq!(store.load("party").as_deref(), Some(&b"gif"[..]));
        assert_eq!(store.load("still").as_deref(), Some(&b"still"[..]));
        assert!(store.load("missing").is_none());
        assert!(store.load("../party").is_none());

        let store = store.with_extensions(["png"]);
        assert_eq!(store.load("party").as_deref(), Some(&b"png"[..]));
    }

    #[test]
    fn file_store_lists_every_version() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("party.gif"), b"gif").unwrap();
        std::fs::write(dir.path().join("party.png"), b"png").unwrap();

        let store = FileAssetStore::new(dir.path());
        let all: Vec<Vec<u8>> = store.load_all("party").iter().map(|b| b.to_vec()).collect();
        assert_eq!(all, vec![b"gif".to_vec(), b"png".to_vec()]);
        assert!(store.load_all("missing").is_empty());
        assert!(store.load_all("../party").is_empty());

        let memory = MemoryAssetStore::new().with("party", b"gif");
        assert_eq!(memory.load_all("party").len(), 1);
    }
}
