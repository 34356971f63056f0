pub mod cache;
pub mod loader;

pub use cache::{BufferCache, FileSampleFetcher, SampleFetcher};
pub use loader::{decode_flac_bytes, decode_wav_bytes, load_sample};

#[cfg(test)]
mod tests;
