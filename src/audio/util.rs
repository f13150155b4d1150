//! Shared audio utilities for playback and decoding.

use anyhow::Result;
use cpal::traits::DeviceTrait;
use cpal::{Device, SampleFormat, SupportedStreamConfig, SupportedStreamConfigRange};

/// Get a human-readable device name.
///
/// # Arguments
/// * `device` - The audio device
///
/// # Returns
/// Device name string, or "Unknown" if the name cannot be retrieved.
pub fn get_device_name(device: &Device) -> String {
    device.description().ok().map(|desc| desc.name().to_string()).unwrap_or_else(|| "Unknown".to_string())
}

/// Find the best matching audio configuration.
///
/// Searches for a configuration that:
/// 1. Supports mono or stereo (max 2 channels)
/// 2. Uses F32 sample format (universally supported on modern hardware)
/// 3. Matches the target sample rate, or uses the closest available rate
///
/// # Arguments
/// * `configs` - Iterator of supported stream configurations
/// * `target_sample_rate` - Desired sample rate (e.g., 48000 for most output devices)
///
/// # Returns
/// The best matching `SupportedStreamConfig`, or an error if no suitable config found.
pub fn find_best_config(configs: impl Iterator<Item = SupportedStreamConfigRange>, target_sample_rate: u32) -> Result<SupportedStreamConfig> {
    let f32_configs: Vec<SupportedStreamConfigRange> = configs.filter(|config| config.channels() <= 2 && config.sample_format() == SampleFormat::F32).collect();

    if f32_configs.is_empty() {
        anyhow::bail!("No F32 audio configuration found - this is unexpected on modern hardware");
    }

    // Find config that supports target sample rate, or use first available
    for config in &f32_configs {
        if (config.min_sample_rate()..=config.max_sample_rate()).contains(&target_sample_rate) {
            return Ok((*config).with_sample_rate(target_sample_rate));
        }
    }

    // Use first config with closest sample rate
    let config = &f32_configs[0];
    let rate = if target_sample_rate < config.min_sample_rate() {
        config.min_sample_rate()
    } else {
        config.max_sample_rate()
    };
    Ok((*config).with_sample_rate(rate))
}

/// Decode 16-bit little-endian mono PCM into f32 samples in [-1.0, 1.0).
///
/// A trailing odd byte is ignored.
pub fn pcm16_to_f32(bytes: &[u8]) -> Vec<f32> {
    bytes.chunks_exact(2).map(|pair| i16::from_le_bytes([pair[0], pair[1]]) as f32 / 32768.0).collect()
}
