//! Pre-render player: renders the whole song up front, then plays it back.
//!
//! Rendering happens inside [`PrerenderPlayer::new`] on the calling thread,
//! fanned out over a pool sized to the whole machine. Progress is reported
//! through a C-style callback after every batch of chunks.

use super::output::AudioOutput;
use super::stream::SampleFeed;
use super::transport::Transport;
use super::{Player, PlayerState};
use crate::config::AudioConfig;
use crate::error::{AudioError, Result};
use crate::song::Song;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::ffi::c_void;
use std::sync::Arc;

/// Signature of a pre-render progress callback: `(progress, context)`.
pub type RawProgressFn = extern "C" fn(f64, *mut c_void);

/// A progress callback together with the opaque context it is called with.
#[derive(Debug, Clone, Copy)]
pub struct ProgressCallback {
    func: Option<RawProgressFn>,
    context: *mut c_void,
}

// SAFETY: the context pointer is never dereferenced here, only handed back
// to `func`. The host that supplied both is responsible for what the
// callback does with it.
unsafe impl Send for ProgressCallback {}

impl ProgressCallback {
    pub fn new(func: Option<RawProgressFn>, context: *mut c_void) -> Self {
        Self { func, context }
    }

    /// A callback that reports nothing.
    pub fn none() -> Self {
        Self::new(None, std::ptr::null_mut())
    }

    /// Returns the context pointer exactly as supplied.
    pub fn context(&self) -> *mut c_void {
        self.context
    }

    /// Invokes the callback, if any, with `progress` and the stored context.
    pub fn report(&self, progress: f64) {
        if let Some(func) = self.func {
            func(progress, self.context);
        }
    }
}

impl Default for ProgressCallback {
    fn default() -> Self {
        Self::none()
    }
}

/// Renders every frame of `song` into one interleaved buffer.
///
/// Work is split into chunks of `chunk_frames`; each batch holds one chunk
/// per pool thread. `progress` sees the fraction of frames rendered after
/// each batch, ending with exactly 1.0.
///
/// # Errors
///
/// Returns error if the buffer or batch size overflows `usize`.
fn render_song(
    song: &dyn Song,
    pool: &ThreadPool,
    chunk_frames: usize,
    progress: &ProgressCallback,
) -> Result<Vec<f32>> {
    let total_frames = song.length_frames();
    let total_samples = total_frames
        .checked_mul(2)
        .ok_or(AudioError::InvalidArgument("song is too long to pre-render"))?;
    let mut buffer = vec![0.0f32; total_samples];

    if total_frames == 0 {
        progress.report(1.0);
        return Ok(buffer);
    }

    let chunk_frames = chunk_frames.max(1);
    let batch_samples = chunk_frames
        .checked_mul(pool.current_num_threads())
        .and_then(|frames| frames.checked_mul(2))
        .ok_or_else(|| {
            AudioError::Config(format!(
                "prerender_chunk_frames {} is too large for {} threads",
                chunk_frames,
                pool.current_num_threads()
            ))
        })?;
    let batch_frames = batch_samples / 2;
    let mut rendered = 0usize;

    for (batch_index, batch) in buffer.chunks_mut(batch_samples).enumerate() {
        let batch_start = batch_index * batch_frames;

        pool.install(|| {
            batch
                .par_chunks_mut(chunk_frames * 2)
                .enumerate()
                .for_each(|(i, chunk)| song.render(batch_start + i * chunk_frames, chunk));
        });

        rendered += batch.len() / 2;
        let fraction = if rendered == total_frames {
            1.0
        } else {
            rendered as f64 / total_frames as f64
        };
        tracing::debug!("Pre-rendered {}/{} frames", rendered, total_frames);
        progress.report(fraction);
    }

    Ok(buffer)
}

/// Plays back a fully rendered buffer.
struct BufferFeed {
    samples: Arc<[f32]>,
}

impl SampleFeed for BufferFeed {
    fn fill(&mut self, start_frame: usize, out: &mut [f32]) -> usize {
        let start = (start_frame * 2).min(self.samples.len());
        let count = (self.samples.len() - start).min(out.len());
        out[..count].copy_from_slice(&self.samples[start..start + count]);
        count / 2
    }
}

/// Player that renders the complete song before playback starts.
pub struct PrerenderPlayer {
    thread_count: usize,
    callback: ProgressCallback,
    transport: Transport,
}

impl PrerenderPlayer {
    /// Renders `song` on `thread_count` threads and prepares it for playback.
    ///
    /// Blocks until rendering completes; `callback` is invoked on the calling
    /// thread as rendering progresses.
    ///
    /// # Errors
    ///
    /// Returns error if the render thread pool cannot be created.
    pub fn new(
        song: Arc<dyn Song>,
        thread_count: usize,
        callback: ProgressCallback,
        config: &AudioConfig,
        output: Box<dyn AudioOutput>,
    ) -> Result<Self> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(thread_count)
            .thread_name(|i| format!("introplay-prerender-{}", i))
            .build()?;

        tracing::info!(
            "Pre-rendering {:.1}s of audio on {} threads",
            song.duration().as_secs_f64(),
            thread_count
        );
        let samples: Arc<[f32]> = render_song(
            song.as_ref(),
            &pool,
            config.prerender_chunk_frames,
            &callback,
        )?
        .into();

        let transport = Transport::new(
            song.sample_rate(),
            song.length_frames(),
            config.block_frames,
            output,
            Box::new(move || -> Box<dyn SampleFeed> {
                Box::new(BufferFeed {
                    samples: Arc::clone(&samples),
                })
            }),
        );

        Ok(Self {
            thread_count,
            callback,
            transport,
        })
    }

    /// Returns the progress callback this player was created with.
    pub fn callback(&self) -> &ProgressCallback {
        &self.callback
    }
}

impl Player for PrerenderPlayer {
    fn play(&mut self) -> Result<()> {
        tracing::info!("Starting playback of pre-rendered audio");
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::output::ManualOutput;
    use crate::song::PcmSong;
    use parking_lot::Mutex;

    extern "C" fn record_progress(progress: f64, context: *mut c_void) {
        let log = unsafe { &*(context as *const Mutex<Vec<f64>>) };
        log.lock().push(progress);
    }

    fn ramp_song(frames: usize) -> Arc<dyn Song> {
        Arc::new(PcmSong::from_samples(
            100,
            (0..frames * 2).map(|i| i as f32).collect(),
        ))
    }

    #[test]
    fn test_render_song_matches_song_and_reports_progress() {
        let song = ramp_song(1000);
        let pool = ThreadPoolBuilder::new().num_threads(3).build().unwrap();
        let log: Mutex<Vec<f64>> = Mutex::new(Vec::new());
        let callback = ProgressCallback::new(
            Some(record_progress),
            &log as *const _ as *mut c_void,
        );

        let buffer = render_song(song.as_ref(), &pool, 64, &callback).unwrap();

        let expected: Vec<f32> = (0..2000).map(|i| i as f32).collect();
        assert_eq!(buffer, expected);

        let progress = log.lock().clone();
        // 1000 frames in batches of 3 * 64 = 192 frames
        assert_eq!(progress.len(), 6);
        assert!(progress.windows(2).all(|w| w[0] <= w[1]));
        assert!(progress.iter().all(|&p| p > 0.0 && p <= 1.0));
        assert_eq!(progress.last(), Some(&1.0));
    }

    #[test]
    fn test_empty_song_reports_completion_once() {
        let song = ramp_song(0);
        let pool = ThreadPoolBuilder::new().num_threads(2).build().unwrap();
        let log: Mutex<Vec<f64>> = Mutex::new(Vec::new());
        let callback = ProgressCallback::new(
            Some(record_progress),
            &log as *const _ as *mut c_void,
        );

        let buffer = render_song(song.as_ref(), &pool, 64, &callback).unwrap();
        assert!(buffer.is_empty());
        assert_eq!(*log.lock(), vec![1.0]);
    }

    #[test]
    fn test_missing_callback_is_silent() {
        let song = ramp_song(10);
        let pool = ThreadPoolBuilder::new().num_threads(1).build().unwrap();
        let buffer = render_song(song.as_ref(), &pool, 4, &ProgressCallback::none()).unwrap();
        assert_eq!(buffer.len(), 20);
    }

    #[test]
    fn test_oversized_chunk_is_an_error() {
        let song = ramp_song(10);
        let pool = ThreadPoolBuilder::new().num_threads(1).build().unwrap();
        let log: Mutex<Vec<f64>> = Mutex::new(Vec::new());
        let callback = ProgressCallback::new(
            Some(record_progress),
            &log as *const _ as *mut c_void,
        );

        let result = render_song(song.as_ref(), &pool, 1 << (usize::BITS - 1), &callback);
        assert!(matches!(result, Err(AudioError::Config(_))));
        assert!(log.lock().is_empty());
    }

    #[test]
    fn test_player_plays_rendered_buffer() {
        let output = ManualOutput::new();
        let config = AudioConfig {
            block_frames: 7,
            prerender_chunk_frames: 5,
            ..AudioConfig::default()
        };
        let mut player = PrerenderPlayer::new(
            ramp_song(50),
            4,
            ProgressCallback::none(),
            &config,
            Box::new(output.clone()),
        )
        .unwrap();

        assert_eq!(player.thread_count(), 4);
        assert_eq!(player.state(), PlayerState::Ready);
        assert_eq!(player.position(), 0.0);
        assert_eq!(output.pull(&mut [0.0; 4]), 0);

        player.play().unwrap();
        let mut pulled = vec![0.0; 200];
        assert_eq!(output.pull(&mut pulled), 100);
        let expected: Vec<f32> = (0..100).map(|i| i as f32).collect();
        assert_eq!(pulled[..100], expected[..]);
        assert_eq!(player.state(), PlayerState::Finished);
        assert!((player.position() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_callback_context_is_kept() {
        let mut marker = 7u32;
        let context = &mut marker as *mut u32 as *mut c_void;
        let player = PrerenderPlayer::new(
            ramp_song(4),
            1,
            ProgressCallback::new(None, context),
            &AudioConfig::default(),
            Box::new(ManualOutput::new()),
        )
        .unwrap();
        assert_eq!(player.callback().context(), context);
    }
}
