//! Realtime player: renders the song block by block while it plays.

use super::output::AudioOutput;
use super::stream::SampleFeed;
use super::transport::Transport;
use super::{Player, PlayerState};
use crate::config::AudioConfig;
use crate::error::Result;
use crate::song::Song;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::sync::Arc;

/// Renders blocks on demand, splitting each block across the render pool.
struct RealtimeFeed {
    song: Arc<dyn Song>,
    pool: Arc<ThreadPool>,
}

impl SampleFeed for RealtimeFeed {
    fn fill(&mut self, start_frame: usize, out: &mut [f32]) -> usize {
        let remaining = self.song.length_frames().saturating_sub(start_frame);
        let frames = (out.len() / 2).min(remaining);
        if frames == 0 {
            return 0;
        }

        render_parallel(
            self.song.as_ref(),
            &self.pool,
            start_frame,
            &mut out[..frames * 2],
        );
        frames
    }
}

/// Renders `out` (interleaved stereo from `start_frame`) as one contiguous
/// slice per pool thread.
fn render_parallel(song: &dyn Song, pool: &ThreadPool, start_frame: usize, out: &mut [f32]) {
    let frames = out.len() / 2;
    let per_thread = frames.div_ceil(pool.current_num_threads()).max(1);

    pool.install(|| {
        out.par_chunks_mut(per_thread * 2)
            .enumerate()
            .for_each(|(i, chunk)| song.render(start_frame + i * per_thread, chunk));
    });
}

/// Player for live playback against the output device clock.
pub struct RealtimePlayer {
    thread_count: usize,
    transport: Transport,
}

impl RealtimePlayer {
    /// Creates a realtime player with `thread_count` render threads.
    ///
    /// # Errors
    ///
    /// Returns error if the render thread pool cannot be created.
    pub fn new(
        song: Arc<dyn Song>,
        thread_count: usize,
        config: &AudioConfig,
        output: Box<dyn AudioOutput>,
    ) -> Result<Self> {
        let pool = Arc::new(
            ThreadPoolBuilder::new()
                .num_threads(thread_count)
                .thread_name(|i| format!("introplay-render-{}", i))
                .build()?,
        );

        let transport = Transport::new(
            song.sample_rate(),
            song.length_frames(),
            config.block_frames,
            output,
            Box::new(move || -> Box<dyn SampleFeed> {
                Box::new(RealtimeFeed {
                    song: Arc::clone(&song),
                    pool: Arc::clone(&pool),
                })
            }),
        );

        Ok(Self {
            thread_count,
            transport,
        })
    }
}

impl Player for RealtimePlayer {
    fn play(&mut self) -> Result<()> {
        tracing::info!(
            "Starting realtime playback on {} render threads",
            self.thread_count
        );
        self.transport.start()
    }

    fn position(&self) -> f64 {
        self.transport.position()
    }

    fn state(&self) -> PlayerState {
        self.transport.state()
    }

    fn thread_count(&self) -> usize {
        self.thread_count
    }
}
