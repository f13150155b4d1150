//! Audio output for synthesized speech.
//!
//! Provides cross-platform playback using cpal, with high-quality resampling via rubato.

mod playback;
pub mod resampler;
pub mod util;

use anyhow::Result;
use tracing::info;

pub use playback::Player;

/// Destination for synthesized speech.
///
/// `play` blocks until the audio has been delivered; callers on the async runtime run it on
/// the blocking pool.
pub trait AudioSink: Send + Sync {
    fn play(&self, samples: &[f32], sample_rate: u32) -> Result<()>;
}

/// Sink that discards audio (used with `--no-playback`).
pub struct NullSink;

impl AudioSink for NullSink {
    fn play(&self, samples: &[f32], sample_rate: u32) -> Result<()> {
        info!("🔇 Discarding {:.1}s of audio (playback disabled)", samples.len() as f32 / sample_rate.max(1) as f32);
        Ok(())
    }
}
