// Sound asset cache
// Fetch and decode each sound effect only once, keyed by URL

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::decoder::{AudioDecode, DecodedAudio};
use crate::error::LoadError;

/// Retrieves the raw bytes behind a sound URL
#[async_trait]
pub trait AssetFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, LoadError>;
}

/// Reads `file://` URLs and plain paths from disk.
/// Relative paths resolve under `root`.
#[derive(Debug, Clone)]
pub struct FileFetcher {
    root: PathBuf,
}

impl FileFetcher {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn resolve(&self, url: &str) -> PathBuf {
        let path = Path::new(url.strip_prefix("file://").unwrap_or(url));
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}

#[async_trait]
impl AssetFetcher for FileFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, LoadError> {
        tokio::fs::read(self.resolve(url))
            .await
            .map_err(|source| LoadError::Fetch {
                url: url.to_string(),
                source,
            })
    }
}

/// Memoized fetch + decode.
///
/// Two overlapping first loads of one URL may both do the work; the later
/// insert wins. Failed loads leave no entry behind.
pub struct SoundCache {
    fetcher: Arc<dyn AssetFetcher>,
    decoder: Arc<dyn AudioDecode>,
    buffers: Mutex<HashMap<String, Arc<DecodedAudio>>>,
}

impl SoundCache {
    pub fn new(fetcher: Arc<dyn AssetFetcher>, decoder: Arc<dyn AudioDecode>) -> Self {
        Self {
            fetcher,
            decoder,
            buffers: Mutex::new(HashMap::new()),
        }
    }

    pub async fn load(&self, url: &str) -> Result<Arc<DecodedAudio>, LoadError> {
        let cached = self.buffers.lock().get(url).cloned();
        if let Some(buffer) = cached {
            return Ok(buffer);
        }

        let bytes = self.fetcher.fetch(url).await?;

        // Decoding is CPU bound; keep it off the async workers
        let decoder = Arc::clone(&self.decoder);
        let extension = Path::new(url)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase());
        let decoded = tokio::task::spawn_blocking(move || decoder.decode(bytes, extension.as_deref()))
            .await
            .map_err(|_| LoadError::Interrupted { url: url.to_string() })?
            .map_err(|reason| LoadError::Decode {
                url: url.to_string(),
                reason,
            })?;

        let decoded = Arc::new(decoded);
        self.buffers.lock().insert(url.to_string(), Arc::clone(&decoded));
        tracing::debug!("Cached sound {} ({} frames)", url, decoded.frames());
        Ok(decoded)
    }

    pub fn contains(&self, url: &str) -> bool {
        self.buffers.lock().contains_key(url)
    }

    pub fn len(&self) -> usize {
        self.buffers.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingFetcher {
        fetches: AtomicUsize,
        fail: AtomicBool,
    }

    #[async_trait]
    impl AssetFetcher for CountingFetcher {
        async fn fetch(&self, url: &str) -> Result<Vec<u8>, LoadError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            if self.fail.load(Ordering::SeqCst) {
                return Err(LoadError::Fetch {
                    url: url.to_string(),
                    source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
                });
            }
            Ok(vec![1, 2, 3, 4])
        }
    }

    #[derive(Default)]
    struct CountingDecoder {
        decodes: AtomicUsize,
    }

    impl AudioDecode for CountingDecoder {
        fn decode(&self, bytes: Vec<u8>, extension: Option<&str>) -> Result<DecodedAudio, String> {
            self.decodes.fetch_add(1, Ordering::SeqCst);
            if extension != Some("wav") {
                return Err("not a wav".to_string());
            }
            Ok(DecodedAudio {
                sample_rate: 8000,
                channels: 1,
                samples: bytes.iter().map(|b| *b as f32).collect(),
            })
        }
    }

    fn cache() -> (SoundCache, Arc<CountingFetcher>, Arc<CountingDecoder>) {
        let fetcher = Arc::new(CountingFetcher::default());
        let decoder = Arc::new(CountingDecoder::default());
        (SoundCache::new(fetcher.clone(), decoder.clone()), fetcher, decoder)
    }

    #[tokio::test]
    async fn test_second_load_is_memoized() {
        let (cache, fetcher, decoder) = cache();

        let first = cache.load("sounds/enter.wav").await.unwrap();
        let second = cache.load("sounds/enter.wav").await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(fetcher.fetches.load(Ordering::SeqCst), 1);
        assert_eq!(decoder.decodes.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_failed_fetch_is_not_cached() {
        let (cache, fetcher, _) = cache();
        fetcher.fail.store(true, Ordering::SeqCst);

        let err = cache.load("sounds/enter.wav").await.unwrap_err();
        assert!(matches!(err, LoadError::Fetch { .. }));
        assert!(!cache.contains("sounds/enter.wav"));

        // Retry succeeds once the source recovers
        fetcher.fail.store(false, Ordering::SeqCst);
        cache.load("sounds/enter.wav").await.unwrap();
        assert_eq!(fetcher.fetches.load(Ordering::SeqCst), 2);
        assert!(cache.contains("sounds/enter.wav"));
    }

    #[tokio::test]
    async fn test_failed_decode_is_not_cached() {
        let (cache, _, decoder) = cache();

        let err = cache.load("sounds/enter.mp3").await.unwrap_err();
        assert!(matches!(err, LoadError::Decode { .. }));
        assert!(cache.is_empty());

        cache.load("sounds/enter.mp3").await.unwrap_err();
        assert_eq!(decoder.decodes.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_file_fetcher_resolves_relative_paths() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("sounds")).unwrap();
        std::fs::write(dir.path().join("sounds/ping.wav"), [7u8, 8, 9]).unwrap();

        let fetcher = FileFetcher::new(dir.path());
        assert_eq!(fetcher.fetch("sounds/ping.wav").await.unwrap(), vec![7, 8, 9]);

        let absolute = format!("file://{}", dir.path().join("sounds/ping.wav").display());
        assert_eq!(fetcher.fetch(&absolute).await.unwrap(), vec![7, 8, 9]);

        assert!(matches!(
            fetcher.fetch("sounds/missing.wav").await,
            Err(LoadError::Fetch { .. })
        ));
    }
}
