// Sample decoding - WAV (hound) and FLAC (claxon) into mono f32 buffers

use crate::audio::buffer::SampleBuffer;
use claxon::FlacReader;
use hound::{SampleFormat, WavReader};
use std::io::{Cursor, Read};
use std::path::Path;

/// Decode an audio file into a mono buffer, picking the codec from the extension
pub fn load_sample(path: &Path) -> Result<SampleBuffer, String> {
    let extension = path.extension().and_then(|s| s.to_str()).unwrap_or("");
    let name = path
        .file_name()
        .unwrap_or_default()
        .to_string_lossy()
        .to_string();

    match extension.to_lowercase().as_str() {
        "wav" => {
            let reader = WavReader::open(path).map_err(|e| format!("{}: {}", name, e))?;
            decode_wav(name, reader)
        }
        "flac" => {
            let reader = FlacReader::open(path).map_err(|e| format!("{}: {}", name, e))?;
            decode_flac(name, reader)
        }
        _ => Err(format!("Unsupported file format: {}", extension)),
    }
}

/// Decode WAV bytes already in memory (e.g. fetched over the network)
pub fn decode_wav_bytes(name: &str, bytes: &[u8]) -> Result<SampleBuffer, String> {
    let reader = WavReader::new(Cursor::new(bytes)).map_err(|e| format!("{}: {}", name, e))?;
    decode_wav(name.to_string(), reader)
}

/// Decode FLAC bytes already in memory
pub fn decode_flac_bytes(name: &str, bytes: &[u8]) -> Result<SampleBuffer, String> {
    let reader = FlacReader::new(Cursor::new(bytes)).map_err(|e| format!("{}: {}", name, e))?;
    decode_flac(name.to_string(), reader)
}

fn decode_wav<R: Read>(name: String, reader: WavReader<R>) -> Result<SampleBuffer, String> {
    let spec = reader.spec();

    let interleaved: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<Result<_, _>>()
            .map_err(|e| format!("{}: {}", name, e))?,
        SampleFormat::Int => {
            let scale = (1i64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<Result<_, _>>()
                .map_err(|e| format!("{}: {}", name, e))?
        }
    };

    if interleaved.is_empty() {
        return Err(format!("{}: file contains no audio", name));
    }

    Ok(SampleBuffer::from_interleaved(
        name,
        spec.sample_rate,
        spec.channels,
        &interleaved,
    ))
}

fn decode_flac<R: Read>(name: String, mut reader: FlacReader<R>) -> Result<SampleBuffer, String> {
    let info = reader.streaminfo();
    let scale = (1i64 << (info.bits_per_sample.saturating_sub(1))) as f32;

    let interleaved: Vec<f32> = reader
        .samples()
        .map(|s| s.map(|v| v as f32 / scale))
        .collect::<Result<_, _>>()
        .map_err(|e| format!("{}: {}", name, e))?;

    if interleaved.is_empty() {
        return Err(format!("{}: file contains no audio", name));
    }

    Ok(SampleBuffer::from_interleaved(
        name,
        info.sample_rate,
        info.channels as u16,
        &interleaved,
    ))
}
