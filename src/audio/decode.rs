//! Audio file decoding into interleaved f32 samples.
//!
//! RIFF/WAVE input goes through `hound`; anything else is probed by
//! `symphonia` (MP3, FLAC, Ogg Vorbis, AAC, ...).

use std::io::Cursor;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use super::SourceError;

/// Fully decoded audio held in memory for playback
#[derive(Debug, Clone)]
pub struct DecodedClip {
    /// Interleaved samples in [-1, 1]
    pub samples: Vec<f32>,
    pub channels: u16,
    pub sample_rate: u32,
}

impl DecodedClip {
    /// Number of frames (samples per channel)
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels.max(1) as usize
    }

    pub fn duration_secs(&self) -> f32 {
        self.frames() as f32 / self.sample_rate as f32
    }
}

/// Decode an in-memory audio file
pub fn decode_audio(bytes: &[u8]) -> Result<DecodedClip, SourceError> {
    let clip = if is_wav(bytes) {
        decode_wav(bytes)?
    } else {
        decode_compressed(bytes)?
    };

    if clip.samples.is_empty() || clip.channels == 0 || clip.sample_rate == 0 {
        return Err(SourceError::Decode("file contains no audio".to_string()));
    }
    Ok(clip)
}

fn is_wav(bytes: &[u8]) -> bool {
    bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WAVE"
}

fn decode_wav(bytes: &[u8]) -> Result<DecodedClip, SourceError> {
    let reader = hound::WavReader::new(Cursor::new(bytes))
        .map_err(|e| SourceError::Decode(format!("invalid WAV: {}", e)))?;
    let spec = reader.spec();

    let samples = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<Result<Vec<_>, _>>(),
        hound::SampleFormat::Int => {
            let scale = 1.0 / (1u64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 * scale))
                .collect::<Result<Vec<_>, _>>()
        }
    }
    .map_err(|e| SourceError::Decode(format!("corrupt WAV data: {}", e)))?;

    Ok(DecodedClip {
        samples,
        channels: spec.channels,
        sample_rate: spec.sample_rate,
    })
}

fn decode_compressed(bytes: &[u8]) -> Result<DecodedClip, SourceError> {
    let stream = MediaSourceStream::new(Box::new(Cursor::new(bytes.to_vec())), Default::default());
    let probed = symphonia::default::get_probe()
        .format(
            &Hint::new(),
            stream,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| SourceError::Decode(format!("unrecognized format: {}", e)))?;

    let mut format = probed.format;
    let track = format
        .default_track()
        .ok_or_else(|| SourceError::Decode("no audio track".to_string()))?;
    let track_id = track.id;
    let mut sample_rate = track.codec_params.sample_rate.unwrap_or(0);
    let mut channels = track
        .codec_params
        .channels
        .map(|c| c.count() as u16)
        .unwrap_or(0);

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| SourceError::Decode(format!("unsupported codec: {}", e)))?;

    let mut samples = Vec::new();
    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(SourceError::Decode(e.to_string())),
        };
        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            // Skip a damaged packet, keep the rest of the stream
            Err(SymphoniaError::DecodeError(e)) => {
                log::warn!("Skipping undecodable packet: {}", e);
                continue;
            }
            Err(e) => return Err(SourceError::Decode(e.to_string())),
        };

        let spec = *decoded.spec();
        sample_rate = spec.rate;
        channels = spec.channels.count() as u16;
        let mut buffer = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
        buffer.copy_interleaved_ref(decoded);
        samples.extend_from_slice(buffer.samples());
    }

    Ok(DecodedClip {
        samples,
        channels,
        sample_rate,
    })
}
