//! Shared sample buffer between the audio callback and the analyzer.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug)]
struct TapState {
    samples: VecDeque<f32>,
    capacity: usize,
    /// Total samples pushed since the last clear
    written: u64,
}

/// Bounded mono sample buffer (thread-safe, cheap to clone)
///
/// The audio callback appends, the analyzer reads the most recent window.
/// Oldest samples are dropped once `capacity` is reached.
#[derive(Debug, Clone)]
pub struct SampleTap {
    inner: Arc<Mutex<TapState>>,
}

impl SampleTap {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(TapState {
                samples: VecDeque::with_capacity(capacity),
                capacity,
                written: 0,
            })),
        }
    }

    // A panic elsewhere must not take the audio callback down with it
    fn lock(&self) -> MutexGuard<'_, TapState> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Append mono samples
    pub fn push(&self, samples: &[f32]) {
        let mut state = self.lock();
        state.written += samples.len() as u64;
        for &sample in samples {
            if state.samples.len() == state.capacity {
                state.samples.pop_front();
            }
            state.samples.push_back(sample);
        }
    }

    /// Append interleaved frames, averaging channels down to mono
    pub fn push_interleaved(&self, data: &[f32], channels: usize) {
        if channels <= 1 {
            self.push(data);
            return;
        }
        let mono: Vec<f32> = data
            .chunks(channels)
            .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
            .collect();
        self.push(&mono);
    }

    /// Copy the most recent `out.len()` samples into `out`, zero-padding the front
    ///
    /// Returns the write counter at the time of the copy.
    pub fn copy_latest(&self, out: &mut [f32]) -> u64 {
        let state = self.lock();
        let available = state.samples.len().min(out.len());
        let pad = out.len() - available;
        out[..pad].fill(0.0);
        let start = state.samples.len() - available;
        for (dst, src) in out[pad..].iter_mut().zip(state.samples.range(start..)) {
            *dst = *src;
        }
        state.written
    }

    /// Samples pushed since the last clear
    pub fn written(&self) -> u64 {
        self.lock().written
    }

    /// Drop all samples (called when a source is torn down)
    pub fn clear(&self) {
        let mut state = self.lock();
        state.samples.clear();
        state.written = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evicts_oldest_at_capacity() {
        let tap = SampleTap::new(4);
        tap.push(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);

        let mut out = [0.0; 4];
        tap.copy_latest(&mut out);
        assert_eq!(out, [3.0, 4.0, 5.0, 6.0]);
        assert_eq!(tap.written(), 6);
    }

    #[test]
    fn test_zero_pads_front() {
        let tap = SampleTap::new(8);
        tap.push(&[0.5, -0.5]);

        let mut out = [9.0; 4];
        tap.copy_latest(&mut out);
        assert_eq!(out, [0.0, 0.0, 0.5, -0.5]);
    }

    #[test]
    fn test_downmixes_interleaved() {
        let tap = SampleTap::new(8);
        tap.push_interleaved(&[1.0, 0.0, 0.5, 0.5], 2);

        let mut out = [0.0; 2];
        tap.copy_latest(&mut out);
        assert_eq!(out, [0.5, 0.5]);
    }

    #[test]
    fn test_clear_resets_counter() {
        let tap = SampleTap::new(8);
        tap.push(&[1.0]);
        tap.clear();
        assert_eq!(tap.written(), 0);
    }
}
