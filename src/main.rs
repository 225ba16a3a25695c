//! introplay - Plays a WAV song through the realtime or pre-render player.
//!
//! Drives the same facade a C host reaches through `AudioInit`, `AudioPlay`
//! and `AudioGetPos`, and prints the position while the song plays.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- song.wav              # Realtime playback
//! cargo run -- song.wav --prerender  # Render first, then play
//! ```

use anyhow::{Context, Result};
use introplay::player::ProgressCallback;
use introplay::{PcmSong, PlayerMode, PlayerState, Song};
use std::ffi::c_void;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Interval between position reports.
const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Command-line options for the application.
struct CliOptions {
    /// WAV file to play.
    song: PathBuf,
    /// Render the whole song before playing.
    prerender: bool,
    /// Stop after this many seconds instead of at the end of the song.
    seconds: Option<f64>,
}

impl CliOptions {
    /// Parses command-line arguments.
    ///
    /// Supports:
    /// - `--prerender` or `-p`: Use the pre-render player
    /// - `--seconds <n>` or `-s <n>`: Stop after n seconds
    /// - `--help` or `-h`: Print help and exit
    fn parse() -> Result<Self> {
        let args: Vec<String> = std::env::args().collect();
        let mut song: Option<PathBuf> = None;
        let mut prerender = false;
        let mut seconds: Option<f64> = None;
        let mut i = 1;

        while i < args.len() {
            match args[i].as_str() {
                "--prerender" | "-p" => prerender = true,
                "--seconds" | "-s" => {
                    i += 1;
                    let value = args
                        .get(i)
                        .context("--seconds requires a number argument")?;
                    seconds = Some(
                        value
                            .parse()
                            .with_context(|| format!("Invalid --seconds value: {}", value))?,
                    );
                }
                "--help" | "-h" => {
                    eprintln!("introplay - Realtime / pre-render song player");
                    eprintln!();
                    eprintln!(
                        "Usage: {} <song.wav> [OPTIONS]",
                        args.first().map(String::as_str).unwrap_or("introplay")
                    );
                    eprintln!();
                    eprintln!("Options:");
                    eprintln!("  -p, --prerender   Render the whole song before playing");
                    eprintln!("  -s, --seconds N   Stop after N seconds");
                    eprintln!("  -h, --help        Print this help message");
                    eprintln!();
                    eprintln!("Set INTROPLAY_CONFIG to a JSON file to tune thread and block sizes.");
                    std::process::exit(0);
                }
                other if other.starts_with('-') => {
                    anyhow::bail!("Unknown option: {} (use --help for usage)", other);
                }
                other => song = Some(PathBuf::from(other)),
            }
            i += 1;
        }

        Ok(Self {
            song: song.context("No song given (use --help for usage)")?,
            prerender,
            seconds,
        })
    }
}

extern "C" fn print_progress(progress: f64, _context: *mut c_void) {
    eprint!("\rRendering: {:5.1}%", progress * 100.0);
    if progress >= 1.0 {
        eprintln!();
    }
}

/// Main entry point.
fn main() -> Result<()> {
    let cli = CliOptions::parse()?;

    introplay::logging::init();
    tracing::debug!("Configuration: {:?}", introplay::facade::global().config());

    let song = PcmSong::from_wav(&cli.song)
        .with_context(|| format!("Failed to load song: {}", cli.song.display()))?;
    let length = song.duration().as_secs_f64();
    let stop_at = cli.seconds.map_or(length, |s| s.min(length));
    introplay::install_song(Arc::new(song))?;

    let mode = if cli.prerender {
        PlayerMode::Prerender(ProgressCallback::new(
            Some(print_progress),
            std::ptr::null_mut(),
        ))
    } else {
        PlayerMode::Realtime
    };
    introplay::init(mode).context("Failed to initialize player")?;
    introplay::play().context("Failed to start playback")?;

    loop {
        let position = introplay::position()?;
        eprint!("\r{:7.2}s / {:.2}s", position, length);
        let finished = introplay::facade::global().state()? == PlayerState::Finished;
        if finished || position >= stop_at {
            eprintln!();
            break;
        }
        std::thread::sleep(POLL_INTERVAL);
    }

    Ok(())
}
