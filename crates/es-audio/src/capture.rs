use std::sync::Arc;

use anyhow::Result;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

use crate::error::AudioError;
use crate::ring::RingBuffer;

/// Audio capture via cpal.
///
/// The input callback writes each interleaved block straight into a shared
/// [`RingBuffer`]: no allocation, no lock, bounded work. The analysis thread
/// reads the freshest window from the same ring.
///
/// # Example
/// ```no_run
/// use es_audio::capture::AudioCapture;
/// let capture = AudioCapture::start_default(4096).unwrap();
/// let ring = capture.ring();
/// ```
pub struct AudioCapture {
    stream: cpal::Stream,
    ring: Arc<RingBuffer>,
    sample_rate: u32,
}

impl AudioCapture {
    /// Reference to the underlying cpal stream (kept alive for capture).
    pub fn stream(&self) -> &cpal::Stream {
        &self.stream
    }

    /// Start capturing from the default input device into a ring of
    /// `buffer_size` frames.
    ///
    /// # Errors
    /// Returns an error if the audio device is unavailable, does not deliver
    /// `f32` samples, or the stream cannot be started.
    pub fn start_default(buffer_size: usize) -> Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or(AudioError::NoInputDevice)?;

        let config = device.default_input_config()?;
        if config.sample_format() != cpal::SampleFormat::F32 {
            return Err(AudioError::UnsupportedFormat(config.sample_format().to_string()).into());
        }
        let sample_rate = config.sample_rate().0;
        let channels = usize::from(config.channels());

        let ring = Arc::new(RingBuffer::new(channels, buffer_size));
        let producer = Arc::clone(&ring);

        let stream = device
            .build_input_stream(
                &config.into(),
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    producer.write(data, channels);
                },
                |err| {
                    log::error!("Audio input error: {err}");
                },
                None,
            )
            .map_err(|e| AudioError::StreamError(e.to_string()))?;

        stream
            .play()
            .map_err(|e| AudioError::StreamError(e.to_string()))?;
        log::info!("Capture micro démarrée @ {sample_rate}Hz, {channels} canal(aux)");

        Ok(Self {
            stream,
            ring,
            sample_rate,
        })
    }

    /// Shared ring the callback writes into.
    #[must_use]
    pub fn ring(&self) -> Arc<RingBuffer> {
        Arc::clone(&self.ring)
    }

    /// The sample rate of the capture stream.
    #[must_use]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}
