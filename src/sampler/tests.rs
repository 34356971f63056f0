#[cfg(test)]
mod tests {
    use crate::audio::buffer::SampleBuffer;
    use crate::error::PracticeError;
    use crate::sampler::cache::{BufferCache, FileSampleFetcher, SampleFetcher};
    use crate::sampler::loader::*;
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::future::Future;
    use std::io::Cursor;
    use std::path::{Path, PathBuf};
    use tempfile::tempdir;

    fn write_wav_i16(path: &Path, channels: u16, samples: &[i16]) {
        let spec = hound::WavSpec {
            channels,
            sample_rate: 44100,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for s in samples {
            writer.write_sample(*s).unwrap();
        }
        writer.finalize().unwrap();
    }

    /// In-memory fetcher that records every request
    struct MapFetcher {
        buffers: HashMap<String, Vec<f32>>,
        requests: RefCell<Vec<String>>,
    }

    impl MapFetcher {
        fn new(paths: &[&str]) -> Self {
            Self {
                buffers: paths
                    .iter()
                    .map(|p| (p.to_string(), vec![0.25; 16]))
                    .collect(),
                requests: RefCell::new(Vec::new()),
            }
        }
    }

    impl SampleFetcher for MapFetcher {
        fn fetch(&self, path: &str) -> impl Future<Output = Result<SampleBuffer, String>> {
            self.requests.borrow_mut().push(path.to_string());
            let result = self
                .buffers
                .get(path)
                .map(|data| SampleBuffer::new(path, 48000, data.clone()))
                .ok_or_else(|| "404 not found".to_string());
            async move { result }
        }
    }

    #[test]
    fn test_load_wav_downmixes_to_mono() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("kick.wav");
        write_wav_i16(&path, 2, &[16384, 0, -16384, -16384]);

        let buffer = load_sample(&path).unwrap();
        assert_eq!(buffer.name, "kick.wav");
        assert_eq!(buffer.sample_rate, 44100);
        assert_eq!(buffer.len(), 2);
        assert!((buffer.data[0] - 0.25).abs() < 1e-4);
        assert!((buffer.data[1] + 0.5).abs() < 1e-4);
    }

    #[test]
    fn test_load_float_wav() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("snare.wav");
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 48000,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for s in [0.1f32, -0.2, 0.3] {
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();

        let buffer = load_sample(&path).unwrap();
        assert_eq!(buffer.data, vec![0.1, -0.2, 0.3]);
    }

    #[test]
    fn test_decode_wav_bytes() {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 22050,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
            writer.write_sample(i16::MAX).unwrap();
            writer.write_sample(0i16).unwrap();
            writer.finalize().unwrap();
        }

        let buffer = decode_wav_bytes("hat.wav", &cursor.into_inner()).unwrap();
        assert_eq!(buffer.sample_rate, 22050);
        assert_eq!(buffer.len(), 2);
        assert!(buffer.data[0] > 0.99);
    }

    #[test]
    fn test_unsupported_and_missing_files() {
        let err = load_sample(&PathBuf::from("loop.ogg")).unwrap_err();
        assert!(err.contains("Unsupported file format"));

        let err = load_sample(&PathBuf::from("does/not/exist.wav")).unwrap_err();
        assert!(err.starts_with("exist.wav"));

        assert!(decode_flac_bytes("broken.flac", b"not a flac").is_err());
    }

    #[test]
    fn test_cache_missing_is_distinct_and_sorted() {
        let mut cache = BufferCache::new();
        cache.insert("b.wav", SampleBuffer::new("b", 48000, vec![0.0]));

        let missing = cache.missing(["c.wav", "a.wav", "b.wav", "c.wav", ""]);
        assert_eq!(missing, vec!["a.wav".to_string(), "c.wav".to_string()]);
    }

    #[tokio::test]
    async fn test_preload_fetches_each_path_once() {
        let fetcher = MapFetcher::new(&["kick.wav", "snare.wav"]);
        let mut cache = BufferCache::new();

        let loaded = cache
            .preload(&fetcher, ["kick.wav", "snare.wav", "kick.wav"])
            .await
            .unwrap();
        assert_eq!(loaded, 2);
        assert_eq!(cache.len(), 2);
        assert_eq!(fetcher.requests.borrow().len(), 2);

        // Second preload is a no-op
        let loaded = cache.preload(&fetcher, ["kick.wav"]).await.unwrap();
        assert_eq!(loaded, 0);
        assert_eq!(fetcher.requests.borrow().len(), 2);
    }

    #[tokio::test]
    async fn test_preload_failure_keeps_successes() {
        let fetcher = MapFetcher::new(&["kick.wav"]);
        let mut cache = BufferCache::new();

        let err = cache
            .preload(&fetcher, ["kick.wav", "missing.wav"])
            .await
            .unwrap_err();
        match err {
            PracticeError::Resource(msg) => assert!(msg.contains("missing.wav (404 not found)")),
            other => panic!("Expected resource error, got {:?}", other),
        }
        assert!(cache.contains("kick.wav"));
        assert!(!cache.contains("missing.wav"));

        // Retry only asks for the path that failed
        fetcher.requests.borrow_mut().clear();
        let _ = cache.preload(&fetcher, ["kick.wav", "missing.wav"]).await;
        assert_eq!(*fetcher.requests.borrow(), vec!["missing.wav".to_string()]);
    }

    #[tokio::test]
    async fn test_file_fetcher_reads_below_root() {
        let dir = tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("samples")).unwrap();
        write_wav_i16(&dir.path().join("samples/tom.wav"), 1, &[1000, 2000]);

        let fetcher = FileSampleFetcher::new(dir.path());
        let buffer = fetcher.fetch("samples/tom.wav").await.unwrap();
        assert_eq!(buffer.len(), 2);
    }
}
