//! Audio capture, decoding and FFT analysis.
//!
//! A single active source (microphone or decoded file) writes into a shared
//! sample tap; the analyzer turns the tap into per-frame snapshots.

mod analyzer;
mod backend;
mod decode;
mod source;
mod tap;

use thiserror::Error;

// Re-export public types
pub use analyzer::{blackman_window, Analyzer};
pub use backend::{AudioBackend, CpalBackend, OpenedStream, PlaybackCursor};
pub use decode::{decode_audio, DecodedClip};
pub use source::{SourceAdapter, SourceEvent, SourceKind, SourceState, StreamInfo};
pub use tap::SampleTap;

/// Source errors surfaced to the user as a single message
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SourceError {
    #[error("an audio source is already active; stop it first")]
    Conflict,

    #[error("could not acquire audio device: {0}")]
    DeviceAcquisition(String),

    #[error("could not decode audio: {0}")]
    Decode(String),
}
