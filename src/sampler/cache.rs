// Buffer cache - decoded samples kept for the session, keyed by path
// Missing buffers are fetched concurrently and joined before playback.

use crate::audio::buffer::SampleBuffer;
use crate::error::{PracticeError, PracticeResult};
use crate::sampler::loader::load_sample;
use futures_util::future::join_all;
use std::collections::{BTreeSet, HashMap};
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

/// Maps a sample path to a decoded buffer (network, disk, bundled assets...)
pub trait SampleFetcher {
    fn fetch(&self, path: &str) -> impl Future<Output = Result<SampleBuffer, String>>;
}

/// Fetcher reading files below a root directory
#[derive(Debug, Clone)]
pub struct FileSampleFetcher {
    root: PathBuf,
}

impl FileSampleFetcher {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &std::path::Path {
        &self.root
    }
}

impl SampleFetcher for FileSampleFetcher {
    fn fetch(&self, path: &str) -> impl Future<Output = Result<SampleBuffer, String>> {
        let full_path = self.root.join(path);
        async move { load_sample(&full_path) }
    }
}

/// Session cache of decoded buffers
#[derive(Debug, Default, Clone)]
pub struct BufferCache {
    buffers: HashMap<String, Arc<SampleBuffer>>,
}

impl BufferCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: &str) -> Option<Arc<SampleBuffer>> {
        self.buffers.get(path).cloned()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.buffers.contains_key(path)
    }

    pub fn insert(&mut self, path: impl Into<String>, buffer: SampleBuffer) -> Arc<SampleBuffer> {
        let buffer = Arc::new(buffer);
        self.buffers.insert(path.into(), Arc::clone(&buffer));
        buffer
    }

    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }

    pub fn clear(&mut self) {
        self.buffers.clear();
    }

    /// Distinct paths not cached yet, in sorted order
    pub fn missing<'a>(&self, paths: impl IntoIterator<Item = &'a str>) -> Vec<String> {
        paths
            .into_iter()
            .filter(|p| !p.is_empty() && !self.contains(p))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    /// Fetch every missing buffer concurrently and wait for all of them.
    ///
    /// Successful buffers are cached even when others fail, so a retry only
    /// refetches what is still missing. Returns how many buffers were added.
    pub async fn preload<'a, F: SampleFetcher>(
        &mut self,
        fetcher: &F,
        paths: impl IntoIterator<Item = &'a str>,
    ) -> PracticeResult<usize> {
        let missing = self.missing(paths);
        if missing.is_empty() {
            log::debug!("All sample buffers already cached");
            return Ok(0);
        }

        log::info!("Fetching {} sample buffer(s)", missing.len());
        let results = join_all(missing.iter().map(|path| async move {
            let result = fetcher.fetch(path).await;
            (path.clone(), result)
        }))
        .await;

        let mut loaded = 0;
        let mut failures = Vec::new();
        for (path, result) in results {
            match result {
                Ok(buffer) => {
                    self.insert(path, buffer);
                    loaded += 1;
                }
                Err(e) => {
                    log::warn!("Failed to load sample {}: {}", path, e);
                    failures.push(format!("{} ({})", path, e));
                }
            }
        }

        if failures.is_empty() {
            Ok(loaded)
        } else {
            Err(PracticeError::Resource(format!(
                "Failed to load sample(s): {}",
                failures.join(", ")
            )))
        }
    }
}
