//! Audio playback module using cpal.
//!
//! Plays synthesized speech through the default output device.
//! Includes automatic resampling when the device sample rate differs from the speech rate.
//! Uses lock-free ring buffer to avoid mutex contention in audio callback.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Condvar, Mutex as StdMutex};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Stream, StreamConfig};
use parking_lot::Mutex;
use ringbuf::HeapRb;
use ringbuf::traits::{Consumer, Observer, Producer, Split};
use tracing::{debug, info, warn};

use super::AudioSink;
use super::resampler::resample;
use super::util::{find_best_config, get_device_name};

/// Size of the playback ring buffer in samples (~11 seconds at 48kHz)
const PLAYBACK_RING_SIZE: usize = 524288;

/// Audio player that outputs samples to the speaker.
/// Uses a lock-free ring buffer for the audio callback to avoid priority inversion.
pub struct Player {
    /// Kept alive to maintain the audio stream
    _stream: Stream,
    /// Sample rate of the audio device
    device_sample_rate: u32,
    /// Ring buffer producer; held for the whole utterance so utterances never interleave
    producer: Mutex<ringbuf::HeapProd<f32>>,
    /// Flag telling the callback to output silence
    silence: Arc<AtomicBool>,
    /// Flag to indicate playback is active
    playing: Arc<AtomicBool>,
    /// Mutex and Condvar for efficient waiting on playback completion
    playing_mutex: Arc<StdMutex<()>>,
    playback_complete: Arc<Condvar>,
}

impl Player {
    /// Create a new audio player on the default output device.
    ///
    /// # Errors
    /// Returns an error if:
    /// - No output device is available
    /// - Failed to get supported output configurations
    /// - Failed to build output stream
    pub fn new() -> Result<Self> {
        let host = cpal::default_host();
        let device = host.default_output_device().context("No output device available")?;

        info!("Using output device: {}", get_device_name(&device));

        // Query device's preferred sample rate for better compatibility
        let device_sample_rate = match device.default_output_config() {
            Ok(default_config) => default_config.sample_rate(),
            Err(_) => {
                let supported_configs = device.supported_output_configs().context("Failed to get supported output configs")?;
                find_best_config(supported_configs, 48000)?.sample_rate()
            }
        };

        let supported_configs = device.supported_output_configs().context("Failed to get supported output configs")?;
        let config = find_best_config(supported_configs, device_sample_rate)?;

        debug!("Audio playback config: {} Hz, {} channels, {:?}", device_sample_rate, config.channels(), config.sample_format());

        // Create lock-free ring buffer for audio callback
        let ring = HeapRb::<f32>::new(PLAYBACK_RING_SIZE);
        let (producer, mut consumer) = ring.split();

        let silence = Arc::new(AtomicBool::new(false));
        let playing = Arc::new(AtomicBool::new(false));
        let playing_mutex = Arc::new(StdMutex::new(()));
        let playback_complete = Arc::new(Condvar::new());

        let silence_clone = silence.clone();
        let playing_clone = playing.clone();
        let playing_mutex_clone = playing_mutex.clone();
        let playback_complete_clone = playback_complete.clone();

        let channels = config.channels() as usize;
        let stream_config: StreamConfig = config.config();

        let err_fn = |err| {
            tracing::error!("Audio playback error: {}", err);
        };

        let stream = device.build_output_stream(
            &stream_config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                let silenced = silence_clone.load(Ordering::Relaxed);
                if silenced {
                    consumer.clear();
                }

                for frame in data.chunks_mut(channels) {
                    let sample = if silenced { 0.0 } else { consumer.try_pop().unwrap_or(0.0) };

                    // Duplicate mono sample to all channels
                    for channel in frame.iter_mut() {
                        *channel = sample;
                    }
                }

                if consumer.is_empty() || silenced {
                    playing_clone.store(false, Ordering::SeqCst);
                    if let Ok(_guard) = playing_mutex_clone.lock() {
                        playback_complete_clone.notify_all();
                    }
                }
            },
            err_fn,
            None,
        )?;

        stream.play().context("Failed to start playback stream")?;

        info!("Audio playback configured at {} Hz (lock-free)", device_sample_rate);

        Ok(Self {
            _stream: stream,
            device_sample_rate,
            producer: Mutex::new(producer),
            silence,
            playing,
            playing_mutex,
            playback_complete,
        })
    }

    /// Play audio samples, blocking until they have been played.
    ///
    /// Concurrent callers are queued: one utterance at a time reaches the device.
    ///
    /// # Errors
    /// Returns an error if resampling fails or playback does not finish in time.
    pub fn play(&self, samples: &[f32], sample_rate: u32) -> Result<()> {
        if samples.is_empty() {
            return Ok(());
        }

        let samples_to_play = resample(samples, sample_rate, self.device_sample_rate)?;
        if sample_rate != self.device_sample_rate {
            debug!("Resampled {} -> {} samples ({} Hz -> {} Hz)", samples.len(), samples_to_play.len(), sample_rate, self.device_sample_rate);
        }

        let mut producer = self.producer.lock();

        let duration_secs = samples_to_play.len() as f64 / self.device_sample_rate as f64;
        let deadline = Instant::now() + Duration::from_secs_f64(duration_secs + 1.0);

        // Feed the ring buffer as space frees up; long utterances exceed its capacity
        let mut pos = 0;
        while pos < samples_to_play.len() {
            let written = producer.push_slice(&samples_to_play[pos..]);
            pos += written;
            self.playing.store(true, Ordering::SeqCst);

            if pos < samples_to_play.len() {
                if Instant::now() > deadline {
                    warn!("Playback timeout exceeded, dropped {} samples", samples_to_play.len() - pos);
                    self.clear();
                    anyhow::bail!("playback timed out");
                }
                std::thread::sleep(Duration::from_millis(20));
            }
        }

        debug!("Playing {} samples at {} Hz", samples_to_play.len(), self.device_sample_rate);

        // Use condition variable to wait efficiently instead of busy-polling
        while self.playing.load(Ordering::Relaxed) {
            if Instant::now() > deadline {
                warn!("Playback timeout exceeded");
                self.clear();
                anyhow::bail!("playback timed out");
            }

            let guard = self.playing_mutex.lock().map_err(|_| anyhow::anyhow!("playback state poisoned"))?;
            let _ = self.playback_complete.wait_timeout(guard, Duration::from_millis(50)).map_err(|_| anyhow::anyhow!("playback state poisoned"))?;
        }

        drop(producer);
        debug!("Playback completed");
        Ok(())
    }

    /// Drain the buffer by making the callback output silence for a moment.
    fn clear(&self) {
        self.silence.store(true, Ordering::SeqCst);
        self.playing.store(false, Ordering::SeqCst);

        // Brief sleep to let the callback drain any remaining buffered samples
        std::thread::sleep(Duration::from_millis(20));
        self.silence.store(false, Ordering::SeqCst);
    }
}

impl AudioSink for Player {
    fn play(&self, samples: &[f32], sample_rate: u32) -> Result<()> {
        Player::play(self, samples, sample_rate)
    }
}

impl Drop for Player {
    fn drop(&mut self) {
        self.silence.store(true, Ordering::SeqCst);
        self.playing.store(false, Ordering::SeqCst);
    }
}
