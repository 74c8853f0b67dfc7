//! Process-wide, coalescing cache of level assets.
//!
//! Every path maps to one shared load future. The first request starts the
//! fetch and parse; later requests (concurrent or not) receive a clone of the
//! same future and therefore the same `Arc<SceneAsset>`. A post-load hook runs
//! on the owned asset before it is published, so nothing mutates an asset
//! after other callers can see it.
//!
//! With a runtime attached, every new load is spawned as soon as it is
//! created, so callers may just poll the cache. Without one, whoever awaits
//! the shared future drives it.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
};

use futures::{
    FutureExt,
    future::{BoxFuture, Shared},
};
use once_cell::sync::OnceCell;

use crate::{
    data_structures::scene_graph::SceneAsset,
    error::LoadError,
    resources::{gltf_loader::load_scene_gltf, source::AssetSource},
};

/// Result shared by every caller waiting on the same path.
pub type LoadResult = Result<Arc<SceneAsset>, LoadError>;

/// A cloneable handle to an in-flight or finished load.
pub type SharedLoad = Shared<BoxFuture<'static, LoadResult>>;

/// Initialization applied once to each freshly parsed asset.
pub type PostLoad = fn(&mut SceneAsset);

static GLOBAL: OnceCell<Arc<AssetLoader>> = OnceCell::new();

pub struct AssetLoader {
    source: Arc<dyn AssetSource>,
    post_load: Option<PostLoad>,
    runtime: Option<tokio::runtime::Handle>,
    entries: Mutex<HashMap<String, SharedLoad>>,
}

impl AssetLoader {
    pub fn new(source: impl AssetSource + 'static) -> Self {
        Self {
            source: Arc::new(source),
            post_load: None,
            runtime: None,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_post_load(mut self, hook: PostLoad) -> Self {
        self.post_load = Some(hook);
        self
    }

    /// Drives every load this loader starts on `runtime`.
    pub fn with_runtime(mut self, runtime: tokio::runtime::Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// Installs `make()` as the process-wide loader unless one exists already.
    ///
    /// The first installation wins; later calls get the existing loader back.
    pub fn global(make: impl FnOnce() -> AssetLoader) -> Arc<AssetLoader> {
        GLOBAL.get_or_init(|| Arc::new(make())).clone()
    }

    /// Returns the shared load for `path`, starting it if needed.
    ///
    /// A load that finished with an error is replaced, so an explicit remount
    /// retries instead of replaying the old failure.
    pub fn load(&self, path: &str) -> SharedLoad {
        let path = normalize(path);
        let mut entries = self.entries();
        if let Some(existing) = entries.get(path) {
            match existing.peek() {
                Some(Err(err)) => log::info!("Retrying {} after failed load: {}", path, err),
                _ => return existing.clone(),
            }
        }
        let load = Self::fetch_and_parse(self.source.clone(), path.to_string(), self.post_load)
            .boxed()
            .shared();
        if let Some(runtime) = &self.runtime {
            runtime.spawn(load.clone().map(|_| ()));
        }
        entries.insert(path.to_string(), load.clone());
        load
    }

    /// Starts loading `path` ahead of the first mount.
    ///
    /// The returned future still has to be driven, usually by spawning it on
    /// the application runtime.
    pub fn preload(&self, path: &str) -> SharedLoad {
        log::info!("Preloading {}", path);
        self.load(path)
    }

    /// The finished result for `path`, if its load has completed.
    pub fn peek(&self, path: &str) -> Option<LoadResult> {
        self.entries()
            .get(normalize(path))
            .and_then(|load| load.peek().cloned())
    }

    pub fn is_requested(&self, path: &str) -> bool {
        self.entries().contains_key(normalize(path))
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, SharedLoad>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    async fn fetch_and_parse(
        source: Arc<dyn AssetSource>,
        path: String,
        post_load: Option<PostLoad>,
    ) -> LoadResult {
        log::info!("Loading level asset {}", path);
        let mut asset = match load_scene_gltf(source.as_ref(), &path).await {
            Ok(asset) => asset,
            Err(err) => {
                log::error!("{}", err);
                return Err(err);
            }
        };
        if let Some(hook) = post_load {
            hook(&mut asset);
        }
        log::info!(
            "Loaded {}: {} top-level nodes, {} nodes total",
            path,
            asset.children().len(),
            asset.node_count()
        );
        Ok(Arc::new(asset))
    }
}

/// Cache key for `path`; sources resolve paths relative to their root.
fn normalize(path: &str) -> &str {
    path.trim_start_matches('/')
}
