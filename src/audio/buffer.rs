// Decoded audio buffers
// Mono, f32, at the sample rate of the source file

/// A decoded, reusable audio buffer
#[derive(Debug, Clone, PartialEq)]
pub struct SampleBuffer {
    pub name: String,
    pub sample_rate: u32,
    pub data: Vec<f32>,
}

impl SampleBuffer {
    pub fn new(name: impl Into<String>, sample_rate: u32, data: Vec<f32>) -> Self {
        Self {
            name: name.into(),
            sample_rate,
            data,
        }
    }

    /// Downmix interleaved frames to mono
    pub fn from_interleaved(
        name: impl Into<String>,
        sample_rate: u32,
        channels: u16,
        interleaved: &[f32],
    ) -> Self {
        let channels = channels.max(1) as usize;
        let data = if channels == 1 {
            interleaved.to_vec()
        } else {
            interleaved
                .chunks(channels)
                .map(|frame| frame.iter().sum::<f32>() / channels as f32)
                .collect()
        };
        Self::new(name, sample_rate, data)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn duration_seconds(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.data.len() as f64 / self.sample_rate as f64
    }

    /// Linear interpolation at a fractional position (0.0 past the end)
    #[inline]
    pub fn sample_at(&self, position: f64) -> f32 {
        let index = position as usize;
        let frac = position.fract() as f32;
        let a = self.data.get(index).copied().unwrap_or(0.0);
        let b = self.data.get(index + 1).copied().unwrap_or(0.0);
        a + (b - a) * frac
    }
}
