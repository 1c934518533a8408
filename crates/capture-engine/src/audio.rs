//! Microphone audio and the gain stage in front of the recorder.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use camlayer_common::error::{CamlayerError, CamlayerResult};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// Capacity of the gained audio broadcast channel, in chunks.
pub const AUDIO_CHANNEL_CAPACITY: usize = 256;

/// A block of interleaved `f32` samples.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioChunk {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u16,
    /// Nanoseconds since the session clock epoch.
    pub timestamp_ns: u64,
}

impl AudioChunk {
    /// Number of sample frames (samples per channel).
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels.max(1) as usize
    }

    /// Little-endian byte representation, as expected by raw `F32LE` sinks.
    pub fn to_le_bytes(&self) -> Vec<u8> {
        self.samples
            .iter()
            .flat_map(|sample| sample.to_le_bytes())
            .collect()
    }
}

/// A shared gain scalar. Clones observe the same value.
#[derive(Debug, Clone)]
pub struct GainControl {
    bits: Arc<AtomicU32>,
}

impl GainControl {
    pub fn new(initial: f32) -> CamlayerResult<Self> {
        let control = Self::default();
        control.set(initial)?;
        Ok(control)
    }

    /// Set the gain. Negative values clamp to zero; NaN and infinities are
    /// rejected and leave the current gain untouched.
    pub fn set(&self, value: f32) -> CamlayerResult<f32> {
        if !value.is_finite() {
            return Err(CamlayerError::capture(format!(
                "Gain must be a finite number, got {value}"
            )));
        }
        let value = value.max(0.0);
        self.bits.store(value.to_bits(), Ordering::Relaxed);
        Ok(value)
    }

    pub fn get(&self) -> f32 {
        f32::from_bits(self.bits.load(Ordering::Relaxed))
    }

    /// Scale every sample by the current gain.
    pub fn apply(&self, chunk: &mut AudioChunk) {
        let gain = self.get();
        if gain == 1.0 {
            return;
        }
        for sample in &mut chunk.samples {
            *sample *= gain;
        }
    }
}

impl Default for GainControl {
    fn default() -> Self {
        Self {
            bits: Arc::new(AtomicU32::new(1.0f32.to_bits())),
        }
    }
}

/// Source -> gain -> destination.
///
/// Forwards every microphone chunk through the gain stage onto a new
/// broadcast channel. The gain is read per chunk, so a change only
/// affects audio captured after it.
#[derive(Debug)]
pub struct GainedAudio {
    tx: broadcast::Sender<AudioChunk>,
    task: JoinHandle<()>,
}

impl GainedAudio {
    pub fn connect(mut source: broadcast::Receiver<AudioChunk>, gain: GainControl) -> Self {
        let (tx, _rx) = broadcast::channel(AUDIO_CHANNEL_CAPACITY);
        let destination = tx.clone();

        let task = tokio::spawn(async move {
            loop {
                match source.recv().await {
                    Ok(mut chunk) => {
                        gain.apply(&mut chunk);
                        // No subscribers outside of a recording.
                        let _ = destination.send(chunk);
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Audio gain stage fell behind; chunks dropped");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        tracing::debug!("Microphone stream closed");
                        break;
                    }
                }
            }
        });

        Self { tx, task }
    }

    /// Receive gained chunks produced from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<AudioChunk> {
        self.tx.subscribe()
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for GainedAudio {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(samples: Vec<f32>) -> AudioChunk {
        AudioChunk {
            samples,
            sample_rate: 48_000,
            channels: 1,
            timestamp_ns: 0,
        }
    }

    #[test]
    fn test_gain_defaults_to_unity() {
        let gain = GainControl::default();
        let mut c = chunk(vec![0.25, -0.5]);
        gain.apply(&mut c);
        assert_eq!(c.samples, vec![0.25, -0.5]);
    }

    #[test]
    fn test_gain_clamps_negative_and_rejects_nan() {
        let gain = GainControl::new(2.0).unwrap();
        assert_eq!(gain.set(-3.0).unwrap(), 0.0);
        assert!(gain.set(f32::NAN).is_err());
        assert!(gain.set(f32::INFINITY).is_err());
        assert_eq!(gain.get(), 0.0);
    }

    #[test]
    fn test_clones_share_value() {
        let gain = GainControl::default();
        let other = gain.clone();
        other.set(0.5).unwrap();
        let mut c = chunk(vec![1.0, 0.5]);
        gain.apply(&mut c);
        assert_eq!(c.samples, vec![0.5, 0.25]);
    }

    #[test]
    fn test_le_bytes_layout() {
        let c = AudioChunk {
            samples: vec![1.0, 0.0],
            sample_rate: 8_000,
            channels: 2,
            timestamp_ns: 0,
        };
        assert_eq!(c.frames(), 1);
        assert_eq!(c.to_le_bytes(), [1.0f32.to_le_bytes(), 0.0f32.to_le_bytes()].concat());
    }

    #[tokio::test]
    async fn test_gain_change_affects_later_chunks_only() {
        let (mic, mic_rx) = broadcast::channel(16);
        let gain = GainControl::default();
        let graph = GainedAudio::connect(mic_rx, gain.clone());
        let mut out = graph.subscribe();

        mic.send(chunk(vec![0.5])).unwrap();
        assert_eq!(out.recv().await.unwrap().samples, vec![0.5]);

        gain.set(2.0).unwrap();
        mic.send(chunk(vec![0.5])).unwrap();
        assert_eq!(out.recv().await.unwrap().samples, vec![1.0]);
    }
}
