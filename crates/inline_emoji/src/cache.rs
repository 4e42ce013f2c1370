//! One shared decode/animate pipeline per distinct image emoji.
//!
//! ```text,ignore
//! RenderCache::get_or_create(source)
//! └► RenderHandle (Pending)
//!    └► Fetcher::fetch / AssetStore::load      (any thread)
//!       └► ImageDecoder::decode                (any thread)
//!          └► channel ──► RenderCache::poll    (UI thread)
//!                         └► RenderHandle (Ready) ──► subscribers
//! ```
//!
//! Results of background work only ever travel over the channel;
//! handles and their subscribers are touched exclusively by [`RenderCache::poll`]
//! and [`RenderCache::advance`], which the host calls from the UI thread.

use std::{
    sync::{
        mpsc::{self, Receiver, Sender},
        Arc, Weak,
    },
    time::Duration,
};

use ahash::HashMap;
use epaint::ColorImage;
use parking_lot::Mutex;

use crate::{
    animation::EmojiImage,
    config::EmojiOptions,
    error::{self, EmojiError, Result},
    host::Bytes,
    loaders::Loaders,
    rendering::{EmojiRendering, FidelityPolicy},
    EmojiSource,
};

/// The current frame of a pipeline, if there is one.
pub type Frame = Option<Arc<ColorImage>>;

type Callback = Box<dyn FnMut(Option<&Arc<ColorImage>>) + Send>;

/// Where a [`RenderHandle`] is in its life.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HandleState {
    /// Waiting for bytes or for the decode.
    Pending,

    /// Showing frames.
    Ready,

    /// Loading failed. Stays blank forever.
    Blank,
}

enum Pipeline {
    Pending,
    Ready {
        image: EmojiImage,
        elapsed: Duration,
        frame_index: usize,
    },
    Blank,
}

struct Subscriber {
    id: u64,
    callback: Callback,
}

struct HandleInner {
    source: EmojiSource,
    pipeline: Pipeline,
    current: Frame,
    subscribers: Vec<Subscriber>,
    next_subscriber_id: u64,

    /// Set while subscriber callbacks run, with the subscribers taken out.
    publishing: bool,

    /// Subscriptions dropped while [`Self::publishing`].
    dropped_while_publishing: Vec<u64>,
}

/// A shared decode/animate pipeline for one [`EmojiSource`].
///
/// Cheap to clone; all clones are the same pipeline. Compare with `==` for identity.
#[derive(Clone)]
pub struct RenderHandle {
    inner: Arc<Mutex<HandleInner>>,
}

impl PartialEq for RenderHandle {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for RenderHandle {}

impl std::fmt::Debug for RenderHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("RenderHandle")
            .field("source", &inner.source)
            .field("subscribers", &inner.subscribers.len())
            .finish_non_exhaustive()
    }
}

impl RenderHandle {
    fn new(source: EmojiSource) -> Self {
        Self {
            inner: Arc::new(Mutex::new(HandleInner {
                source,
                pipeline: Pipeline::Pending,
                current: None,
                subscribers: Vec::new(),
                next_subscriber_id: 0,
                publishing: false,
                dropped_while_publishing: Vec::new(),
            })),
        }
    }

    pub fn source(&self) -> EmojiSource {
        self.inner.lock().source.clone()
    }

    pub fn state(&self) -> HandleState {
        match self.inner.lock().pipeline {
            Pipeline::Pending => HandleState::Pending,
            Pipeline::Ready { .. } => HandleState::Ready,
            Pipeline::Blank => HandleState::Blank,
        }
    }

    /// The frame currently showing.
    pub fn current_frame(&self) -> Frame {
        self.inner.lock().current.clone()
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.lock().subscribers.len()
    }

    /// Call `callback` with the current frame now, and again every time the frame changes.
    ///
    /// The callback runs on the UI thread, until the returned [`Subscription`] is dropped.
    pub fn subscribe(
        &self,
        callback: impl FnMut(Option<&Arc<ColorImage>>) + Send + 'static,
    ) -> Subscription {
        let mut callback: Callback = Box::new(callback);
        let current = self.current_frame();
        callback(current.as_ref());

        let mut inner = self.inner.lock();
        let id = inner.next_subscriber_id;
        inner.next_subscriber_id += 1;
        inner.subscribers.push(Subscriber { id, callback });

        Subscription {
            handle: Arc::downgrade(&self.inner),
            id,
        }
    }

    fn unsubscribe(inner: &Mutex<HandleInner>, id: u64) {
        let mut inner = inner.lock();
        let before = inner.subscribers.len();
        inner.subscribers.retain(|subscriber| subscriber.id != id);
        if inner.subscribers.len() == before && inner.publishing {
            inner.dropped_while_publishing.push(id);
        }
    }

    /// Show `frame` and tell every subscriber. Subscribers run without the lock held.
    fn publish(&self, frame: Frame) {
        let mut subscribers = {
            let mut inner = self.inner.lock();
            inner.current = frame.clone();
            inner.publishing = true;
            std::mem::take(&mut inner.subscribers)
        };

        for subscriber in &mut subscribers {
            (subscriber.callback)(frame.as_ref());
        }

        let mut inner = self.inner.lock();
        let dropped = std::mem::take(&mut inner.dropped_while_publishing);
        subscribers.retain(|subscriber| !dropped.contains(&subscriber.id));
        subscribers.append(&mut inner.subscribers);
        inner.subscribers = subscribers;
        inner.publishing = false;
    }

    /// Apply the outcome of loading. Called from [`RenderCache::poll`].
    fn resolve(&self, image: Option<EmojiImage>) {
        let first_frame = {
            let mut inner = self.inner.lock();
            match image {
                Some(image) => {
                    let (frame_index, frame) = image.frame_at(Duration::ZERO);
                    inner.pipeline = Pipeline::Ready {
                        image,
                        elapsed: Duration::ZERO,
                        frame_index,
                    };
                    Some(frame)
                }
                None => {
                    inner.pipeline = Pipeline::Blank;
                    None
                }
            }
        };
        self.publish(first_frame);
    }

    /// Move an animation forward by `dt`, publishing if the visible frame changed.
    fn advance(&self, dt: Duration) {
        let changed_frame = {
            let mut inner = self.inner.lock();
            let Pipeline::Ready {
                image,
                elapsed,
                frame_index,
            } = &mut inner.pipeline
            else {
                return;
            };
            if !image.is_animated() {
                return;
            }
            *elapsed += dt;
            let (index, frame) = image.frame_at(*elapsed);
            if index == *frame_index {
                return;
            }
            *frame_index = index;
            frame
        };
        self.publish(Some(changed_frame));
    }
}

/// Keeps a [`RenderHandle::subscribe`] callback alive. Unsubscribes when dropped.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    handle: Weak<Mutex<HandleInner>>,
    id: u64,
}

impl Subscription {
    pub fn unsubscribe(self) {}

    /// Is this subscription to `handle`?
    pub fn is_for(&self, handle: &RenderHandle) -> bool {
        std::ptr::eq(self.handle.as_ptr(), Arc::as_ptr(&handle.inner))
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.handle.upgrade() {
            RenderHandle::unsubscribe(&inner, self.id);
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

/// Loading finished (or failed) for one handle.
struct Resolution {
    handle: Weak<Mutex<HandleInner>>,
    source: EmojiSource,
    result: Result<EmojiImage>,
}

struct Entry {
    handle: RenderHandle,
    last_used: u64,
}

struct CacheInner {
    entries: HashMap<EmojiSource, Entry>,
    generation: u64,
    capacity: usize,
    resolved_tx: Sender<Resolution>,
    resolved_rx: Receiver<Resolution>,
}

impl CacheInner {
    /// Make room for one more entry by dropping the least recently used idle ones.
    ///
    /// Entries that still have subscribers are never evicted,
    /// so the capacity is exceeded when everything is in use.
    fn evict_to_fit(&mut self) {
        while self.entries.len() >= self.capacity {
            let victim = self
                .entries
                .iter()
                .filter(|(_, entry)| entry.handle.subscriber_count() == 0)
                .min_by_key(|(_, entry)| entry.last_used)
                .map(|(source, _)| source.clone());
            let Some(victim) = victim else {
                break;
            };
            log::trace!("evicting {victim:?}");
            self.entries.remove(&victim);
        }
    }
}

/// Shared image pipelines, keyed by [`EmojiSource`].
///
/// Create one per application (or session) and hand clones to every text view:
/// all clones share the same entries, so each image is downloaded and decoded once.
#[derive(Clone)]
pub struct RenderCache {
    inner: Arc<Mutex<CacheInner>>,
    loaders: Loaders,
}

impl Default for RenderCache {
    fn default() -> Self {
        Self::new(Loaders::default(), EmojiOptions::default().cache_capacity)
    }
}

impl std::fmt::Debug for RenderCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("RenderCache")
            .field("entries", &inner.entries.len())
            .field("capacity", &inner.capacity)
            .finish_non_exhaustive()
    }
}

impl RenderCache {
    /// `capacity` is the number of distinct sources kept around; see [`Self::get_or_create`].
    pub fn new(loaders: Loaders, capacity: usize) -> Self {
        let (resolved_tx, resolved_rx) = mpsc::channel();
        Self {
            inner: Arc::new(Mutex::new(CacheInner {
                entries: Default::default(),
                generation: 0,
                capacity: capacity.max(1),
                resolved_tx,
                resolved_rx,
            })),
            loaders,
        }
    }

    pub fn from_options(loaders: Loaders, options: &EmojiOptions) -> Self {
        Self::new(loaders, options.cache_capacity)
    }

    /// The pipeline for `source`, created and started if this is the first time it is asked for.
    ///
    /// Call from the UI thread only.
    ///
    /// When a new entry would exceed the capacity, the least recently used entry
    /// without subscribers is dropped first.
    ///
    /// # Errors
    /// [`EmojiError::NotAnImage`] for characters and [`EmojiError::UnresolvedAlias`] for aliases.
    pub fn get_or_create(&self, source: &EmojiSource, rendering: EmojiRendering) -> Result<RenderHandle> {
        match source {
            EmojiSource::Character(character) => {
                return Err(EmojiError::NotAnImage(character.clone()));
            }
            EmojiSource::Alias(shortcode) => {
                return Err(EmojiError::UnresolvedAlias(shortcode.clone()));
            }
            EmojiSource::ImageUrl(_) | EmojiSource::ImageAsset(_) => {}
        }

        let mut inner = self.inner.lock();
        inner.generation += 1;
        let generation = inner.generation;

        if let Some(entry) = inner.entries.get_mut(source) {
            entry.last_used = generation;
            return Ok(entry.handle.clone());
        }

        inner.evict_to_fit();
        let handle = RenderHandle::new(source.clone());
        inner.entries.insert(
            source.clone(),
            Entry {
                handle: handle.clone(),
                last_used: generation,
            },
        );
        let resolved_tx = inner.resolved_tx.clone();
        drop(inner);

        self.start_loading(source, &handle, rendering, resolved_tx);
        Ok(handle)
    }

    fn start_loading(
        &self,
        source: &EmojiSource,
        handle: &RenderHandle,
        rendering: EmojiRendering,
        resolved_tx: Sender<Resolution>,
    ) {
        let policy = rendering.fidelity();
        let weak_handle = Arc::downgrade(&handle.inner);
        let send = move |source: EmojiSource, result: Result<EmojiImage>| {
            // The receiver lives as long as the cache; if the cache is gone, nobody is listening.
            let _ = resolved_tx.send(Resolution {
                handle: weak_handle,
                source,
                result,
            });
        };

        match source {
            EmojiSource::ImageUrl(url) => {
                let decoder = Arc::clone(&self.loaders.decoder);
                let source = source.clone();
                self.loaders.fetcher.fetch(
                    url,
                    Box::new(move |bytes: Result<Bytes>| {
                        let result = bytes.and_then(|bytes| decoder.decode(&bytes, policy));
                        send(source, result);
                    }),
                );
            }
            EmojiSource::ImageAsset(name) => {
                log::trace!("started loading asset {name:?}");
                let result = self.decode_asset(name, policy);
                log::trace!("finished loading asset {name:?}");
                send(source.clone(), result);
            }
            EmojiSource::Character(_) | EmojiSource::Alias(_) => {}
        }
    }

    /// The first version of the asset that decodes, e.g. the still image when the animation is broken.
    fn decode_asset(&self, name: &str, policy: FidelityPolicy) -> Result<EmojiImage> {
        let mut last_error = EmojiError::AssetMissing(name.to_owned());
        for bytes in self.loaders.assets.load_all(name) {
            match self.loaders.decoder.decode(&bytes, policy) {
                Ok(image) => return Ok(image),
                Err(err) => {
                    log::debug!("asset {name:?}: {err}");
                    last_error = err;
                }
            }
        }
        Err(last_error)
    }

    /// Apply finished loads, pushing their first frame to subscribers.
    ///
    /// Call from the UI thread, e.g. once per frame. Returns the number of loads applied.
    pub fn poll(&self) -> usize {
        let resolutions: Vec<Resolution> = self.inner.lock().resolved_rx.try_iter().collect();
        let count = resolutions.len();
        for Resolution {
            handle,
            source,
            result,
        } in resolutions
        {
            let Some(inner) = handle.upgrade() else {
                // Evicted while loading.
                continue;
            };
            let image = error::absorb(result, &source);
            RenderHandle { inner }.resolve(image);
        }
        count
    }

    /// Move every animation forward by `dt`.
    ///
    /// Call from the UI thread.
    pub fn advance(&self, dt: Duration) {
        let handles: Vec<RenderHandle> = self
            .inner
            .lock()
            .entries
            .values()
            .map(|entry| entry.handle.clone())
            .collect();
        for handle in handles {
            handle.advance(dt);
        }
    }

    /// Drop the entry for `source`. Existing handles keep working but are no longer shared.
    pub fn evict(&self, source: &EmojiSource) -> bool {
        self.inner.lock().entries.remove(source).is_some()
    }

    pub fn contains(&self, source: &EmojiSource) -> bool {
        self.inner.lock().entries.contains_key(source)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.inner.lock().capacity
    }

    /// Decoded bytes held by ready pipelines.
    pub fn byte_size(&self) -> usize {
        self.inner
            .lock()
            .entries
            .values()
            .map(|entry| match &entry.handle.inner.lock().pipeline {
                Pipeline::Ready { image, .. } => image.byte_len(),
                Pipeline::Pending | Pipeline::Blank => 0,
            })
            .sum()
    }
}
