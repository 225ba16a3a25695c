//! Audio outputs a player can stream into.

use super::stream::SampleStream;
use crate::error::{AudioError, Result};
use parking_lot::Mutex;
use rodio::OutputStream;
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;

/// Destination for a player's sample stream.
pub trait AudioOutput: Send {
    /// Starts consuming `stream`. Called at most once per player.
    fn start(&mut self, stream: SampleStream) -> Result<()>;
}

/// Plays through the default output device with rodio.
///
/// The rodio output stream stops when dropped and cannot move between
/// threads, so it is opened on, and owned by, a dedicated thread that lives
/// for the rest of the process.
#[derive(Debug, Default)]
pub struct RodioOutput;

impl AudioOutput for RodioOutput {
    fn start(&mut self, stream: SampleStream) -> Result<()> {
        let (ready_tx, ready_rx) = mpsc::channel();

        thread::Builder::new()
            .name("introplay-output".into())
            .spawn(move || {
                let (_stream, handle) = match OutputStream::try_default() {
                    Ok(pair) => pair,
                    Err(e) => {
                        let _ = ready_tx.send(Err(AudioError::Output(format!(
                            "Failed to open audio output: {}",
                            e
                        ))));
                        return;
                    }
                };

                if let Err(e) = handle.play_raw(stream) {
                    let _ = ready_tx.send(Err(AudioError::Output(format!(
                        "Failed to start audio playback: {}",
                        e
                    ))));
                    return;
                }

                let _ = ready_tx.send(Ok(()));
                loop {
                    thread::park();
                }
            })?;

        ready_rx
            .recv()
            .map_err(|_| AudioError::Output("audio output thread exited".into()))??;

        tracing::debug!("Audio output started");
        Ok(())
    }
}

/// Output driven by the caller: samples are produced only when pulled.
///
/// Clones share the same stream, so a host can keep one handle and give the
/// other to a player.
#[derive(Clone, Default)]
pub struct ManualOutput {
    stream: Arc<Mutex<Option<SampleStream>>>,
}

impl ManualOutput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns whether a player has started streaming into this output.
    pub fn is_started(&self) -> bool {
        self.stream.lock().is_some()
    }

    /// Pulls up to `out.len()` interleaved samples.
    ///
    /// Returns the number of samples written; zero before the player starts
    /// or after the song ends.
    pub fn pull(&self, out: &mut [f32]) -> usize {
        match self.stream.lock().as_mut() {
            Some(stream) => stream.read(out),
            None => 0,
        }
    }
}

impl AudioOutput for ManualOutput {
    fn start(&mut self, stream: SampleStream) -> Result<()> {
        *self.stream.lock() = Some(stream);
        Ok(())
    }
}

/// Returns the output used when the host does not choose one.
pub fn default_output() -> Box<dyn AudioOutput> {
    Box::new(RodioOutput)
}
