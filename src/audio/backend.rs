//! Device access: microphone capture and file playback through cpal.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SampleFormat, SizedSample, StreamConfig};
use std::any::Any;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::decode::DecodedClip;
use super::tap::SampleTap;
use super::SourceError;

/// A running device stream plus what we learned while opening it
pub struct OpenedStream {
    pub device_name: String,
    pub sample_rate: u32,
    /// Keeps the device stream alive until dropped
    pub guard: Box<dyn Any>,
}

/// Seam between the source adapter and the audio device layer
///
/// Methods are called on the worker thread that will own the returned
/// stream, since device streams are generally not `Send`.
pub trait AudioBackend: Send + Sync {
    /// Open the default input device, feeding captured audio into `tap`
    fn open_microphone(&self, tap: SampleTap) -> Result<OpenedStream, SourceError>;

    /// Start playing `clip`, feeding what is played into `tap` and raising
    /// `finished` once the last frame has been output
    fn open_playback(
        &self,
        clip: Arc<DecodedClip>,
        tap: SampleTap,
        finished: Arc<AtomicBool>,
    ) -> Result<OpenedStream, SourceError>;
}

/// Production backend on the default cpal host
#[derive(Debug, Default)]
pub struct CpalBackend;

impl AudioBackend for CpalBackend {
    fn open_microphone(&self, tap: SampleTap) -> Result<OpenedStream, SourceError> {
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or_else(|| SourceError::DeviceAcquisition("no audio input device found".into()))?;

        let supported = device.default_input_config().map_err(|e| {
            SourceError::DeviceAcquisition(format!("failed to get input config: {}", e))
        })?;
        let sample_format = supported.sample_format();
        let config: StreamConfig = supported.into();
        let device_name = device.name().unwrap_or_else(|_| "Unknown".to_string());

        log::info!(
            "Microphone: {} @ {}Hz, {} channel(s)",
            device_name,
            config.sample_rate.0,
            config.channels
        );

        let stream = match sample_format {
            SampleFormat::F32 => build_input_stream::<f32>(&device, &config, tap),
            SampleFormat::I16 => build_input_stream::<i16>(&device, &config, tap),
            SampleFormat::I32 => build_input_stream::<i32>(&device, &config, tap),
            SampleFormat::U16 => build_input_stream::<u16>(&device, &config, tap),
            other => {
                return Err(SourceError::DeviceAcquisition(format!(
                    "unsupported input sample format {:?}",
                    other
                )))
            }
        }?;

        stream.play().map_err(|e| {
            SourceError::DeviceAcquisition(format!("failed to start input stream: {}", e))
        })?;

        Ok(OpenedStream {
            device_name,
            sample_rate: config.sample_rate.0,
            guard: Box::new(stream),
        })
    }

    fn open_playback(
        &self,
        clip: Arc<DecodedClip>,
        tap: SampleTap,
        finished: Arc<AtomicBool>,
    ) -> Result<OpenedStream, SourceError> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| SourceError::DeviceAcquisition("no audio output device found".into()))?;

        let supported = device.default_output_config().map_err(|e| {
            SourceError::DeviceAcquisition(format!("failed to get output config: {}", e))
        })?;
        let sample_format = supported.sample_format();
        let config: StreamConfig = supported.into();
        let device_name = device.name().unwrap_or_else(|_| "Unknown".to_string());

        log::info!(
            "Playback: {} @ {}Hz ({:.1}s clip at {}Hz)",
            device_name,
            config.sample_rate.0,
            clip.duration_secs(),
            clip.sample_rate
        );

        let cursor = PlaybackCursor::new(clip, config.sample_rate.0);
        let stream = match sample_format {
            SampleFormat::F32 => build_output_stream::<f32>(&device, &config, cursor, tap, finished),
            SampleFormat::I16 => build_output_stream::<i16>(&device, &config, cursor, tap, finished),
            SampleFormat::I32 => build_output_stream::<i32>(&device, &config, cursor, tap, finished),
            SampleFormat::U16 => build_output_stream::<u16>(&device, &config, cursor, tap, finished),
            other => {
                return Err(SourceError::DeviceAcquisition(format!(
                    "unsupported output sample format {:?}",
                    other
                )))
            }
        }?;

        stream.play().map_err(|e| {
            SourceError::DeviceAcquisition(format!("failed to start playback: {}", e))
        })?;

        Ok(OpenedStream {
            device_name,
            sample_rate: config.sample_rate.0,
            guard: Box::new(stream),
        })
    }
}

fn build_input_stream<T>(
    device: &cpal::Device,
    config: &StreamConfig,
    tap: SampleTap,
) -> Result<cpal::Stream, SourceError>
where
    T: SizedSample,
    f32: FromSample<T>,
{
    let channels = config.channels as usize;
    device
        .build_input_stream(
            config,
            move |data: &[T], _: &cpal::InputCallbackInfo| {
                let samples: Vec<f32> = data.iter().map(|&s| f32::from_sample(s)).collect();
                tap.push_interleaved(&samples, channels);
            },
            |err| log::error!("Input stream error: {}", err),
            None,
        )
        .map_err(|e| SourceError::DeviceAcquisition(format!("failed to build input stream: {}", e)))
}

fn build_output_stream<T>(
    device: &cpal::Device,
    config: &StreamConfig,
    mut cursor: PlaybackCursor,
    tap: SampleTap,
    finished: Arc<AtomicBool>,
) -> Result<cpal::Stream, SourceError>
where
    T: SizedSample + FromSample<f32>,
{
    let channels = config.channels as usize;
    device
        .build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                let mut mono = Vec::with_capacity(data.len() / channels.max(1));

                for frame in data.chunks_mut(channels) {
                    match cursor.next_frame() {
                        Some(source) => {
                            for (c, out) in frame.iter_mut().enumerate() {
                                // Extra device channels repeat the last clip channel
                                let sample = source[c.min(source.len() - 1)];
                                *out = T::from_sample(sample);
                            }
                            mono.push(source.iter().sum::<f32>() / source.len() as f32);
                        }
                        None => {
                            frame.fill(T::EQUILIBRIUM);
                            finished.store(true, Ordering::Release);
                        }
                    }
                }

                tap.push(&mono);
            },
            |err| log::error!("Playback stream error: {}", err),
            None,
        )
        .map_err(|e| SourceError::DeviceAcquisition(format!("failed to build playback stream: {}", e)))
}

/// Walks a decoded clip at the device rate (nearest-frame resampling)
pub struct PlaybackCursor {
    clip: Arc<DecodedClip>,
    position: f64,
    step: f64,
}

impl PlaybackCursor {
    pub fn new(clip: Arc<DecodedClip>, device_rate: u32) -> Self {
        let step = clip.sample_rate as f64 / device_rate.max(1) as f64;
        Self {
            clip,
            position: 0.0,
            step,
        }
    }

    /// Next interleaved frame, or None once the clip is exhausted
    pub fn next_frame(&mut self) -> Option<&[f32]> {
        let index = self.position as usize;
        if index >= self.clip.frames() {
            return None;
        }
        self.position += self.step;

        let channels = self.clip.channels as usize;
        let start = index * channels;
        Some(&self.clip.samples[start..start + channels])
    }
}
