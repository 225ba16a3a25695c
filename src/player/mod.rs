//! Player library.
//!
//! Two player variants drive a [`Song`] through a rayon render pool into an
//! [`AudioOutput`]:
//! - [`RealtimePlayer`] renders blocks while playing, with a thread count that
//!   leaves room for the audio callback and the host
//! - [`PrerenderPlayer`] renders the whole song up front on every processor,
//!   reporting progress, then plays the buffer
//!
//! [`create_player`] picks the variant and its thread count from a
//! [`PlayerMode`].

pub mod output;
pub mod prerender;
pub mod realtime;
pub mod stream;
pub mod threads;
mod transport;

pub use output::{default_output, AudioOutput, ManualOutput, RodioOutput};
pub use prerender::{PrerenderPlayer, ProgressCallback, RawProgressFn};
pub use realtime::RealtimePlayer;
pub use stream::{PlaybackClock, SampleFeed, SampleStream};
pub use threads::{logical_processors, prerender_thread_count, realtime_thread_count};

use crate::config::AudioConfig;
use crate::error::Result;
use crate::song::Song;
use std::sync::Arc;

/// Lifecycle of a player once constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerState {
    /// Constructed (and, for pre-render, fully rendered); not yet playing.
    Ready,
    /// Output is consuming the stream.
    Playing,
    /// The stream ran past the end of the song.
    Finished,
}

/// Common operations of both player variants.
pub trait Player: Send {
    /// Starts playback. Calling it again while playing does nothing.
    fn play(&mut self) -> Result<()>;

    /// Returns the playback position in seconds; 0.0 until playback starts.
    fn position(&self) -> f64;

    fn state(&self) -> PlayerState;

    /// Returns the number of render threads the player was built with.
    fn thread_count(&self) -> usize;
}

/// Which variant to build.
#[derive(Debug, Clone, Copy)]
pub enum PlayerMode {
    Realtime,
    /// Pre-render, reporting progress through the callback.
    Prerender(ProgressCallback),
}

impl PlayerMode {
    /// Builds a mode from the C interface's flag, callback and context.
    pub fn from_flag(is_prerender: bool, callback: ProgressCallback) -> Self {
        if is_prerender {
            PlayerMode::Prerender(callback)
        } else {
            PlayerMode::Realtime
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            PlayerMode::Realtime => "realtime",
            PlayerMode::Prerender(_) => "prerender",
        }
    }
}

/// The active player.
pub enum PlayerVariant {
    Realtime(RealtimePlayer),
    Prerender(PrerenderPlayer),
}

impl PlayerVariant {
    fn inner(&self) -> &dyn Player {
        match self {
            PlayerVariant::Realtime(player) => player,
            PlayerVariant::Prerender(player) => player,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn Player {
        match self {
            PlayerVariant::Realtime(player) => player,
            PlayerVariant::Prerender(player) => player,
        }
    }

    /// Returns whether this is the pre-render variant.
    pub fn is_prerender(&self) -> bool {
        matches!(self, PlayerVariant::Prerender(_))
    }
}

impl Player for PlayerVariant {
    fn play(&mut self) -> Result<()> {
        self.inner_mut().play()
    }

    fn position(&self) -> f64 {
        self.inner().position()
    }

    fn state(&self) -> PlayerState {
        self.inner().state()
    }

    fn thread_count(&self) -> usize {
        self.inner().thread_count()
    }
}

/// Builds the player for `mode` on a host with `processors` logical
/// processors.
///
/// In pre-render mode this blocks until the whole song is rendered.
///
/// # Errors
///
/// Returns error if the render thread pool cannot be created.
pub fn create_player(
    mode: PlayerMode,
    song: Arc<dyn Song>,
    processors: usize,
    config: &AudioConfig,
    output: Box<dyn AudioOutput>,
) -> Result<PlayerVariant> {
    match mode {
        PlayerMode::Realtime => {
            let threads = realtime_thread_count(processors);
            tracing::info!(
                "Creating realtime player ({} processors, {} render threads)",
                processors,
                threads
            );
            RealtimePlayer::new(song, threads, config, output).map(PlayerVariant::Realtime)
        }
        PlayerMode::Prerender(callback) => {
            let threads = prerender_thread_count(processors);
            tracing::info!(
                "Creating pre-render player ({} processors, {} render threads)",
                processors,
                threads
            );
            PrerenderPlayer::new(song, threads, callback, config, output)
                .map(PlayerVariant::Prerender)
        }
    }
}
