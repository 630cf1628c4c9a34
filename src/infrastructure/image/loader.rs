//! Async image loading orchestrator.
//!
//! One loader drives one image slot: cache lookup, a single in-flight
//! network fetch, decoding on the blocking pool and publication of the
//! result through a watch channel.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tracing::{debug, trace, warn};

use crate::domain::entities::{DecodedImage, LoadState, LoaderSnapshot, ResourceKey};
use crate::domain::errors::LoadError;
use crate::domain::ports::{ImageCachePort, ImageDecoder, ImageTransport};

use super::decoder::ImageCrateDecoder;
use super::http_transport::{HttpConfig, HttpTransport};
use super::memory_cache::MemoryImageCache;

/// Builder for [`ImageLoader`].
#[derive(Default)]
pub struct ImageLoaderBuilder {
    cache: Option<Arc<dyn ImageCachePort>>,
    transport: Option<Arc<dyn ImageTransport>>,
    decoder: Option<Arc<dyn ImageDecoder>>,
    preload: Option<ResourceKey>,
    runtime: Option<Handle>,
}

impl ImageLoaderBuilder {
    /// Uses `cache` instead of the process-wide [`MemoryImageCache::shared`].
    #[must_use]
    pub fn cache(mut self, cache: Arc<dyn ImageCachePort>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Uses `transport` instead of an [`HttpTransport`] with default settings.
    #[must_use]
    pub fn transport(mut self, transport: Arc<dyn ImageTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Uses `decoder` instead of [`ImageCrateDecoder`].
    #[must_use]
    pub fn decoder(mut self, decoder: Arc<dyn ImageDecoder>) -> Self {
        self.decoder = Some(decoder);
        self
    }

    /// Starts loading `key` as soon as the loader is built.
    #[must_use]
    pub fn preload(mut self, key: ResourceKey) -> Self {
        self.preload = Some(key);
        self
    }

    /// Spawns fetch tasks on `runtime` instead of the ambient one.
    #[must_use]
    pub fn runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// Builds the loader.
    ///
    /// # Errors
    /// Returns error if no runtime was given and none is current, or if the
    /// default HTTP transport cannot be created.
    pub fn build(self) -> Result<ImageLoader, LoadError> {
        let runtime = match self.runtime {
            Some(runtime) => runtime,
            None => Handle::try_current().map_err(|e| LoadError::runtime(e.to_string()))?,
        };
        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(HttpTransport::new(&HttpConfig::default())?),
        };
        let cache = self
            .cache
            .unwrap_or_else(|| MemoryImageCache::shared() as Arc<dyn ImageCachePort>);
        let decoder = self
            .decoder
            .unwrap_or_else(|| Arc::new(ImageCrateDecoder::default()));

        let (published, _) = watch::channel(LoaderSnapshot::default());

        let loader = ImageLoader {
            shared: Arc::new(Shared {
                cache,
                transport,
                decoder,
                runtime,
                inner: Mutex::new(Inner {
                    state: LoadState::Idle,
                    generation: 0,
                }),
                published,
            }),
        };

        if let Some(key) = self.preload {
            loader.load(key);
        }

        Ok(loader)
    }
}

/// Coordinates loading of one image at a time.
///
/// `load`, `reload` and `cancel` never block on I/O; they return as soon as
/// the state change is published and any fetch is scheduled. Observers read
/// [`LoaderSnapshot`]s through [`ImageLoader::subscribe`].
///
/// Dropping the loader cancels the in-flight fetch; nothing is published
/// afterwards.
pub struct ImageLoader {
    shared: Arc<Shared>,
}

struct Shared {
    cache: Arc<dyn ImageCachePort>,
    transport: Arc<dyn ImageTransport>,
    decoder: Arc<dyn ImageDecoder>,
    runtime: Handle,
    inner: Mutex<Inner>,
    published: watch::Sender<LoaderSnapshot>,
}

struct Inner {
    state: LoadState,
    /// Bumped whenever the in-flight fetch stops being the current one.
    generation: u64,
}

impl ImageLoader {
    /// Returns a builder with default collaborators.
    #[must_use]
    pub fn builder() -> ImageLoaderBuilder {
        ImageLoaderBuilder::default()
    }

    /// Creates a loader using the shared cache and an HTTP transport.
    ///
    /// # Errors
    /// See [`ImageLoaderBuilder::build`].
    pub fn new() -> Result<Self, LoadError> {
        Self::builder().build()
    }

    /// Makes `key` the current target.
    ///
    /// Does nothing if `key` is already loading or loaded. Serves from the
    /// cache when possible, otherwise starts a fetch. A fetch in flight for a
    /// different key is cancelled first.
    pub fn load(&self, key: ResourceKey) {
        let mut inner = self.shared.inner.lock();
        self.shared.load_locked(&mut inner, key);
    }

    /// Cancels any in-flight fetch, then loads `key` ignoring the current state.
    pub fn reload(&self, key: ResourceKey) {
        let mut inner = self.shared.inner.lock();
        self.shared.cancel_locked(&mut inner);
        inner.state = LoadState::Idle;
        self.shared.load_locked(&mut inner, key);
    }

    /// Cancels the in-flight fetch, if any.
    /// An already published image is left untouched.
    pub fn cancel(&self) {
        let mut inner = self.shared.inner.lock();
        self.shared.cancel_locked(&mut inner);
    }

    /// Subscribes to published snapshots.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<LoaderSnapshot> {
        self.shared.published.subscribe()
    }

    /// Returns the latest published snapshot.
    #[must_use]
    pub fn snapshot(&self) -> LoaderSnapshot {
        self.shared.published.borrow().clone()
    }

    /// Returns the latest published image.
    #[must_use]
    pub fn image(&self) -> Option<DecodedImage> {
        self.shared.published.borrow().image.clone()
    }

    /// Returns true while a fetch is in flight.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.shared.published.borrow().is_loading
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> LoadState {
        self.shared.inner.lock().state.clone()
    }

    /// Returns the cache this loader reads and populates.
    #[must_use]
    pub fn cache(&self) -> &Arc<dyn ImageCachePort> {
        &self.shared.cache
    }

    /// Waits until no fetch is in flight and returns the snapshot.
    pub async fn settled(&self) -> LoaderSnapshot {
        let mut rx = self.subscribe();
        let settled = rx.wait_for(|s| !s.is_loading).await.map(|s| (*s).clone());
        settled.unwrap_or_else(|_| self.snapshot())
    }
}

impl Drop for ImageLoader {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl std::fmt::Debug for ImageLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.shared.inner.lock();
        f.debug_struct("ImageLoader")
            .field("state", &inner.state)
            .field("generation", &inner.generation)
            .finish_non_exhaustive()
    }
}

impl Shared {
    fn load_locked(self: &Arc<Self>, inner: &mut Inner, key: ResourceKey) {
        if inner.state.is_current_for(&key) {
            trace!(key = %key, "Already loading or loaded");
            return;
        }

        if inner.state.is_loading() {
            self.cancel_locked(inner);
        }

        if let Some(image) = self.cache.get(&key) {
            debug!(key = %key, source = "cache", "Image loaded");
            inner.state = LoadState::Loaded {
                key,
                image: image.clone(),
            };
            self.published.send_replace(LoaderSnapshot {
                image: Some(image),
                is_loading: false,
            });
            return;
        }

        inner.generation += 1;
        let generation = inner.generation;
        inner.state = LoadState::Loading { key: key.clone() };
        self.published.send_modify(|s| s.is_loading = true);
        debug!(key = %key, generation, "Starting image fetch");

        let weak = Arc::downgrade(self);
        let transport = self.transport.clone();
        let decoder = self.decoder.clone();
        self.runtime.spawn(async move {
            let result = fetch_and_decode(transport, decoder, &key).await;
            finish(&weak, generation, key, result);
        });
    }

    fn cancel_locked(&self, inner: &mut Inner) {
        inner.generation += 1;
        if let LoadState::Loading { key } = &inner.state {
            debug!(key = %key, "Cancelled image load");
            inner.state = LoadState::Idle;
            self.published.send_modify(|s| s.is_loading = false);
        }
    }

    fn complete(&self, generation: u64, key: ResourceKey, result: Result<DecodedImage, LoadError>) {
        let mut inner = self.inner.lock();
        if inner.generation != generation {
            trace!(key = %key, generation, "Discarding result of superseded load");
            return;
        }

        match result {
            Ok(image) => {
                debug!(key = %key, source = "network", "Image loaded");
                self.cache.set(key.clone(), image.clone());
                inner.state = LoadState::Loaded {
                    key,
                    image: image.clone(),
                };
                self.published.send_replace(LoaderSnapshot {
                    image: Some(image),
                    is_loading: false,
                });
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Image load failed");
                inner.state = LoadState::Failed { key };
                self.published.send_replace(LoaderSnapshot {
                    image: None,
                    is_loading: false,
                });
            }
        }
    }
}

fn finish(
    shared: &Weak<Shared>,
    generation: u64,
    key: ResourceKey,
    result: Result<DecodedImage, LoadError>,
) {
    match shared.upgrade() {
        Some(shared) => shared.complete(generation, key, result),
        None => trace!(key = %key, "Loader dropped before fetch completed"),
    }
}

async fn fetch_and_decode(
    transport: Arc<dyn ImageTransport>,
    decoder: Arc<dyn ImageDecoder>,
    key: &ResourceKey,
) -> Result<DecodedImage, LoadError> {
    let bytes = transport.fetch(key).await?;

    tokio::task::spawn_blocking(move || decoder.decode(&bytes))
        .await
        .map_err(|e| {
            if e.is_cancelled() {
                LoadError::Cancelled
            } else {
                LoadError::decode(format!("Decode task panicked: {e}"))
            }
        })?
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::time::Duration;

    use bytes::Bytes;

    use crate::domain::ports::mocks::{MockImageDecoder, MockTransport};

    const URL: &str = "https://x/img.png";

    fn key(s: &str) -> ResourceKey {
        ResourceKey::parse(s).unwrap()
    }

    fn png(width: u32, height: u32) -> Bytes {
        let mut buf = Vec::new();
        image::DynamicImage::new_rgb8(width, height)
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        Bytes::from(buf)
    }

    struct Fixture {
        cache: Arc<MemoryImageCache>,
        transport: Arc<MockTransport>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                cache: Arc::new(MemoryImageCache::with_default_limits()),
                transport: Arc::new(MockTransport::new()),
            }
        }

        fn loader(&self) -> ImageLoader {
            ImageLoader::builder()
                .cache(self.cache.clone())
                .transport(self.transport.clone())
                .build()
                .unwrap()
        }
    }

    async fn wait_until(cond: impl Fn() -> bool) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while !cond() {
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
        })
        .await
        .expect("condition not reached in time");
    }

    /// Gives a released fetch time to decode and reach the publish gate.
    async fn let_stale_task_finish(transport: &MockTransport, completed: usize) {
        wait_until(|| transport.completed_count() >= completed).await;
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    #[tokio::test]
    async fn test_network_load_populates_cache_and_publishes() {
        let fx = Fixture::new();
        let u = key(URL);
        fx.transport.respond(&u, Ok(png(8, 6)));
        let loader = fx.loader();

        loader.load(u.clone());
        assert!(loader.is_loading());
        assert_eq!(loader.state(), LoadState::Loading { key: u.clone() });

        let snapshot = loader.settled().await;
        let image = snapshot.image.expect("image published");
        assert_eq!((image.width(), image.height()), (8, 6));
        assert!(!snapshot.is_loading);
        assert_eq!(fx.cache.get(&u), Some(image.clone()));
        assert_eq!(loader.state(), LoadState::Loaded { key: u, image });
        assert_eq!(fx.transport.fetch_count(), 1);
    }

    #[tokio::test]
    async fn test_cache_hit_skips_network() {
        let fx = Fixture::new();
        let u = key(URL);
        let cached = DecodedImage::new(image::DynamicImage::new_rgb8(3, 3));
        fx.cache.set(u.clone(), cached.clone());
        let loader = fx.loader();

        loader.load(u);

        assert_eq!(loader.image(), Some(cached));
        assert!(!loader.is_loading());
        assert_eq!(fx.transport.fetch_count(), 0);
    }

    #[tokio::test]
    async fn test_http_error_publishes_none() {
        let fx = Fixture::new();
        let u = key(URL);
        fx.transport
            .respond(&u, Err(LoadError::http_status(500, u.as_str())));
        let loader = fx.loader();

        loader.load(u.clone());
        let snapshot = loader.settled().await;

        assert!(snapshot.image.is_none());
        assert!(!snapshot.is_loading);
        assert!(fx.cache.is_empty());
        assert_eq!(loader.state(), LoadState::Failed { key: u });
    }

    #[tokio::test]
    async fn test_decode_failure_publishes_none() {
        let fx = Fixture::new();
        let u = key(URL);
        fx.transport.respond(&u, Ok(Bytes::from_static(b"junk")));
        let mut decoder = MockImageDecoder::new();
        decoder
            .expect_decode()
            .times(1)
            .returning(|_| Err(LoadError::decode("unsupported")));
        let loader = ImageLoader::builder()
            .cache(fx.cache.clone())
            .transport(fx.transport.clone())
            .decoder(Arc::new(decoder))
            .build()
            .unwrap();

        loader.load(u.clone());
        let snapshot = loader.settled().await;

        assert!(snapshot.image.is_none());
        assert!(fx.cache.get(&u).is_none());
        assert_eq!(loader.state(), LoadState::Failed { key: u });
    }

    #[tokio::test]
    async fn test_duplicate_load_fetches_once() {
        let fx = Fixture::new();
        let u = key(URL);
        fx.transport.respond(&u, Ok(png(2, 2)));
        fx.transport.hold(&u);
        let loader = fx.loader();

        loader.load(u.clone());
        loader.load(u.clone());
        wait_until(|| fx.transport.fetch_count() == 1).await;
        loader.load(u.clone());
        assert!(loader.is_loading());

        fx.transport.release(&u);
        let snapshot = loader.settled().await;
        assert!(snapshot.image.is_some());

        // Loaded: another load is a no-op too.
        let mut rx = loader.subscribe();
        rx.borrow_and_update();
        loader.load(u.clone());
        assert!(!rx.has_changed().unwrap());
        assert_eq!(fx.transport.fetch_count_for(&u), 1);
    }

    #[tokio::test]
    async fn test_reload_discards_stale_result() {
        let fx = Fixture::new();
        let u = key("https://x/u.png");
        let v = key("https://x/v.png");
        fx.transport.respond(&u, Ok(png(1, 1)));
        fx.transport.respond(&v, Ok(png(2, 2)));
        fx.transport.hold(&u);
        fx.transport.hold(&v);
        let loader = fx.loader();

        loader.load(u.clone());
        wait_until(|| fx.transport.fetch_count_for(&u) == 1).await;
        loader.reload(v.clone());

        fx.transport.release(&u);
        let_stale_task_finish(&fx.transport, 1).await;

        assert!(loader.image().is_none());
        assert!(loader.is_loading());
        assert_eq!(loader.state(), LoadState::Loading { key: v.clone() });
        assert!(fx.cache.get(&u).is_none());

        fx.transport.release(&v);
        let snapshot = loader.settled().await;
        assert_eq!(snapshot.image, fx.cache.get(&v));
        assert_eq!(snapshot.image.map(|i| i.width()), Some(2));
    }

    #[tokio::test]
    async fn test_stale_completion_never_overwrites_newer_image() {
        let fx = Fixture::new();
        let u = key("https://x/u.png");
        let v = key("https://x/v.png");
        fx.transport
            .respond(&u, Err(LoadError::network("connection reset")));
        fx.transport.respond(&v, Ok(png(4, 4)));
        fx.transport.hold(&u);
        let loader = fx.loader();

        loader.load(u.clone());
        wait_until(|| fx.transport.fetch_count_for(&u) == 1).await;
        loader.reload(v.clone());
        let published = loader.settled().await.image;
        assert!(published.is_some());

        // The stale fetch fails late; the newer image must survive.
        fx.transport.release(&u);
        let_stale_task_finish(&fx.transport, 2).await;

        assert_eq!(loader.image(), published);
        assert!(matches!(loader.state(), LoadState::Loaded { key, .. } if key == v));
    }

    #[tokio::test]
    async fn test_cancel_clears_loading_once() {
        let fx = Fixture::new();
        let u = key(URL);
        fx.transport.respond(&u, Ok(png(2, 2)));
        fx.transport.hold(&u);
        let loader = fx.loader();
        let mut rx = loader.subscribe();

        loader.load(u.clone());
        assert!(rx.borrow_and_update().is_loading);

        loader.cancel();
        assert!(rx.has_changed().unwrap());
        let snapshot = rx.borrow_and_update().clone();
        assert!(!snapshot.is_loading);
        assert!(snapshot.image.is_none());
        assert_eq!(loader.state(), LoadState::Idle);

        // Neither a second cancel nor the late fetch publishes anything.
        loader.cancel();
        wait_until(|| fx.transport.fetch_count() == 1).await;
        fx.transport.release(&u);
        let_stale_task_finish(&fx.transport, 1).await;

        assert!(!rx.has_changed().unwrap());
        assert!(fx.cache.get(&u).is_none());
        assert_eq!(loader.state(), LoadState::Idle);
    }

    #[tokio::test]
    async fn test_cancel_keeps_published_image() {
        let fx = Fixture::new();
        let u = key(URL);
        fx.transport.respond(&u, Ok(png(2, 2)));
        let loader = fx.loader();

        loader.load(u.clone());
        let image = loader.settled().await.image;
        loader.cancel();

        assert!(image.is_some());
        assert_eq!(loader.image(), image);
        assert!(matches!(loader.state(), LoadState::Loaded { .. }));
    }

    #[tokio::test]
    async fn test_drop_cancels_in_flight_fetch() {
        let fx = Fixture::new();
        let u = key(URL);
        fx.transport.respond(&u, Ok(png(2, 2)));
        fx.transport.hold(&u);
        let loader = fx.loader();
        let rx = loader.subscribe();

        loader.load(u.clone());
        wait_until(|| fx.transport.fetch_count() == 1).await;
        drop(loader);

        assert!(!rx.borrow().is_loading);
        fx.transport.release(&u);
        let_stale_task_finish(&fx.transport, 1).await;

        assert!(rx.borrow().image.is_none());
        assert!(fx.cache.get(&u).is_none());
    }

    #[tokio::test]
    async fn test_preload_starts_at_build() {
        let fx = Fixture::new();
        let u = key(URL);
        fx.transport.respond(&u, Ok(png(2, 2)));
        let loader = ImageLoader::builder()
            .cache(fx.cache.clone())
            .transport(fx.transport.clone())
            .preload(u.clone())
            .build()
            .unwrap();

        assert!(loader.is_loading());
        let snapshot = loader.settled().await;
        assert!(snapshot.image.is_some());

        loader.load(u);
        assert_eq!(fx.transport.fetch_count(), 1);
    }

    #[tokio::test]
    async fn test_reload_same_url_uses_cache() {
        let fx = Fixture::new();
        let u = key(URL);
        fx.transport.respond(&u, Ok(png(2, 2)));
        let loader = fx.loader();

        loader.load(u.clone());
        let first = loader.settled().await.image;
        loader.reload(u.clone());

        assert_eq!(loader.image(), first);
        assert!(!loader.is_loading());
        assert_eq!(fx.transport.fetch_count(), 1);
    }

    #[tokio::test]
    async fn test_load_after_failure_retries() {
        let fx = Fixture::new();
        let u = key(URL);
        fx.transport.respond(&u, Err(LoadError::network("offline")));
        let loader = fx.loader();

        loader.load(u.clone());
        assert!(loader.settled().await.image.is_none());

        fx.transport.respond(&u, Ok(png(2, 2)));
        loader.load(u.clone());
        assert!(loader.settled().await.image.is_some());
        assert_eq!(fx.transport.fetch_count_for(&u), 2);
    }

    #[tokio::test]
    async fn test_load_different_url_supersedes() {
        let fx = Fixture::new();
        let u = key("https://x/u.png");
        let v = key("https://x/v.png");
        fx.transport.respond(&u, Ok(png(1, 1)));
        fx.transport.respond(&v, Ok(png(3, 3)));
        fx.transport.hold(&u);
        let loader = fx.loader();

        loader.load(u.clone());
        loader.load(v.clone());
        assert_eq!(loader.state(), LoadState::Loading { key: v.clone() });

        let snapshot = loader.settled().await;
        assert_eq!(snapshot.image.map(|i| i.width()), Some(3));

        fx.transport.release(&u);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(fx.cache.get(&u).is_none());
    }

    #[tokio::test]
    async fn test_loaders_share_cache() {
        let fx = Fixture::new();
        let u = key(URL);
        fx.transport.respond(&u, Ok(png(2, 2)));
        let first = fx.loader();
        let second = fx.loader();

        first.load(u.clone());
        let image = first.settled().await.image;
        second.load(u);

        assert_eq!(second.image(), image);
        assert_eq!(fx.transport.fetch_count(), 1);
    }

    #[test]
    fn test_build_without_runtime_fails() {
        let result = ImageLoader::builder()
            .transport(Arc::new(MockTransport::new()))
            .build();
        assert!(matches!(result, Err(LoadError::Runtime { .. })));
    }

    #[test]
    fn test_build_with_explicit_runtime() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let loader = ImageLoader::builder()
            .cache(Arc::new(MemoryImageCache::with_default_limits()))
            .transport(Arc::new(MockTransport::new()))
            .runtime(runtime.handle().clone());
        tokio_test::assert_ok!(loader.build());
    }
}
