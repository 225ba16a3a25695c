//! Sample stream handed to the audio output.
//!
//! A [`SampleStream`] pulls blocks of interleaved stereo frames from a
//! [`SampleFeed`] and yields them one sample at a time, the shape rodio
//! expects. Every completed frame advances the shared [`PlaybackClock`], so
//! the reported position follows what the output actually consumed.

use crate::config::MAX_FRAMES;
use crate::song::CHANNELS;
use rodio::Source;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Source of interleaved stereo frames for a stream.
pub trait SampleFeed: Send {
    /// Writes frames starting at `start_frame` into `out`.
    ///
    /// Returns the number of frames written. Zero ends the stream.
    fn fill(&mut self, start_frame: usize, out: &mut [f32]) -> usize;
}

/// Playback position shared between a player and its stream.
/// Uses atomics for lock-free access from the audio thread.
#[derive(Debug)]
pub struct PlaybackClock {
    sample_rate: u32,
    /// Frames consumed by the output so far.
    frames: AtomicU64,
    /// Set once the feed is exhausted.
    finished: AtomicBool,
}

impl PlaybackClock {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            frames: AtomicU64::new(0),
            finished: AtomicBool::new(false),
        }
    }

    /// Returns the number of frames played.
    pub fn frames(&self) -> u64 {
        self.frames.load(Ordering::Relaxed)
    }

    /// Returns the playback position in seconds.
    pub fn seconds(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames() as f64 / self.sample_rate as f64
    }

    /// Returns whether the stream has run out of frames.
    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Acquire)
    }

    fn advance(&self) {
        self.frames.fetch_add(1, Ordering::Relaxed);
    }

    fn finish(&self) {
        self.finished.store(true, Ordering::Release);
    }
}

/// Interleaved stereo sample iterator driven by a [`SampleFeed`].
pub struct SampleStream {
    feed: Box<dyn SampleFeed>,
    clock: Arc<PlaybackClock>,
    /// Interleaved samples of the current block.
    buffer: Vec<f32>,
    /// Valid samples in `buffer`.
    buf_len: usize,
    /// Current position in the buffer.
    buf_pos: usize,
    /// First frame of the next block to request.
    next_frame: usize,
    total_frames: Option<usize>,
}

impl SampleStream {
    /// Creates a stream that requests `block_frames` frames at a time.
    ///
    /// The block size is clamped to `1..=MAX_FRAMES`.
    pub fn new(
        feed: Box<dyn SampleFeed>,
        clock: Arc<PlaybackClock>,
        block_frames: usize,
        total_frames: Option<usize>,
    ) -> Self {
        Self {
            feed,
            clock,
            buffer: vec![0.0; block_frames.clamp(1, MAX_FRAMES) * CHANNELS as usize],
            buf_len: 0,
            buf_pos: 0,
            next_frame: 0,
            total_frames,
        }
    }

    /// Copies up to `out.len()` samples into `out` and returns how many were
    /// written. Fewer than requested means the stream ended.
    pub fn read(&mut self, out: &mut [f32]) -> usize {
        let mut written = 0;
        for slot in out.iter_mut() {
            match self.next() {
                Some(sample) => {
                    *slot = sample;
                    written += 1;
                }
                None => break,
            }
        }
        written
    }
}

impl Iterator for SampleStream {
    type Item = f32;

    fn next(&mut self) -> Option<f32> {
        // Render a new block when we've exhausted the current one
        if self.buf_pos >= self.buf_len {
            if self.clock.is_finished() {
                return None;
            }
            let frames = self.feed.fill(self.next_frame, &mut self.buffer);
            if frames == 0 {
                self.clock.finish();
                return None;
            }
            self.next_frame += frames;
            self.buf_len = frames * CHANNELS as usize;
            self.buf_pos = 0;
        }

        let sample = self.buffer[self.buf_pos];
        self.buf_pos += 1;

        // A frame is complete once its right channel has been handed out
        if self.buf_pos % CHANNELS as usize == 0 {
            self.clock.advance();
        }

        Some(sample)
    }
}

impl Source for SampleStream {
    fn current_frame_len(&self) -> Option<usize> {
        None
    }

    fn channels(&self) -> u16 {
        CHANNELS
    }

    fn sample_rate(&self) -> u32 {
        self.clock.sample_rate
    }

    fn total_duration(&self) -> Option<Duration> {
        let frames = self.total_frames?;
        Some(Duration::from_secs_f64(
            frames as f64 / self.clock.sample_rate.max(1) as f64,
        ))
    }
}
