//! Start-once wiring between a player's feed and its audio output.

use super::output::AudioOutput;
use super::stream::{PlaybackClock, SampleFeed, SampleStream};
use super::PlayerState;
use crate::error::Result;
use std::sync::Arc;

type FeedFactory = Box<dyn Fn() -> Box<dyn SampleFeed> + Send>;

pub(crate) struct Transport {
    clock: Arc<PlaybackClock>,
    output: Box<dyn AudioOutput>,
    make_feed: FeedFactory,
    block_frames: usize,
    total_frames: usize,
    started: bool,
}

impl Transport {
    pub(crate) fn new(
        sample_rate: u32,
        total_frames: usize,
        block_frames: usize,
        output: Box<dyn AudioOutput>,
        make_feed: FeedFactory,
    ) -> Self {
        Self {
            clock: Arc::new(PlaybackClock::new(sample_rate)),
            output,
            make_feed,
            block_frames,
            total_frames,
            started: false,
        }
    }

    /// Hands a fresh stream to the output. Does nothing once started; a
    /// failed start leaves the transport ready to try again.
    pub(crate) fn start(&mut self) -> Result<()> {
        if self.started {
            tracing::debug!("Playback already started");
            return Ok(());
        }

        let stream = SampleStream::new(
            (self.make_feed)(),
            Arc::clone(&self.clock),
            self.block_frames,
            Some(self.total_frames),
        );
        self.output.start(stream)?;
        self.started = true;
        Ok(())
    }

    pub(crate) fn position(&self) -> f64 {
        self.clock.seconds()
    }

    pub(crate) fn state(&self) -> PlayerState {
        if !self.started {
            PlayerState::Ready
        } else if self.clock.is_finished() {
            PlayerState::Finished
        } else {
            PlayerState::Playing
        }
    }
}
