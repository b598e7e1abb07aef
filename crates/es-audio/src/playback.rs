use std::sync::Arc;

use anyhow::Result;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

use crate::error::AudioError;
use crate::oscillator::{ToneControl, ToneOscillator};

/// Émission de la sonde sur la sortie par défaut.
///
/// The output callback only runs [`ToneOscillator::fill`]; frequency and
/// amplitude changes arrive through the shared [`ToneControl`].
///
/// # Example
/// ```no_run
/// use std::sync::Arc;
/// use es_audio::oscillator::ToneControl;
/// use es_audio::playback::TonePlayback;
/// use es_core::config::ToneConfig;
///
/// let control = Arc::new(ToneControl::new(&ToneConfig::default()));
/// let playback = TonePlayback::start_default(Arc::clone(&control)).unwrap();
/// control.set_frequency(19_000.0);
/// ```
pub struct TonePlayback {
    stream: cpal::Stream,
    sample_rate: u32,
}

impl TonePlayback {
    /// Reference to the underlying cpal stream (kept alive for playback).
    pub fn stream(&self) -> &cpal::Stream {
        &self.stream
    }

    /// Start emitting the probe tone on the default output device.
    ///
    /// # Errors
    /// Returns an error if no output device exists or the stream cannot be
    /// built or started.
    pub fn start_default(control: Arc<ToneControl>) -> Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or(AudioError::NoOutputDevice)?;

        let default_config = device.default_output_config()?;
        let sample_rate = default_config.sample_rate().0;
        let channels = usize::from(default_config.channels());

        let output_config = cpal::StreamConfig {
            channels: default_config.channels(),
            sample_rate: cpal::SampleRate(sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let mut oscillator = ToneOscillator::new(control, sample_rate);

        let stream = device
            .build_output_stream(
                &output_config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    oscillator.fill(data, channels);
                },
                |err| {
                    log::error!("Audio output error: {err}");
                },
                None,
            )
            .map_err(|e| AudioError::StreamError(e.to_string()))?;

        stream
            .play()
            .map_err(|e| AudioError::StreamError(e.to_string()))?;
        log::info!("Émission de la sonde démarrée @ {sample_rate}Hz");

        Ok(Self {
            stream,
            sample_rate,
        })
    }

    /// The sample rate of the output stream.
    #[must_use]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}
