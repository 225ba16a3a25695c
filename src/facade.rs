//! Process-wide audio facade.
//!
//! The facade owns the single player of the process and the song it plays.
//! Both slots are filled at most once:
//! - the song with [`AudioFacade::install_song`]
//! - the player with [`AudioFacade::init`], which picks the variant
//!
//! After that, [`AudioFacade::play`] and [`AudioFacade::position`] forward
//! to the player. Calls made out of order return an error instead of
//! touching an empty slot.
//!
//! Nothing is ever torn down: the player, its render pool and the output
//! thread live until the process exits.

use crate::config::AudioConfig;
use crate::error::{AudioError, Result};
use crate::player::{
    create_player, default_output, logical_processors, AudioOutput, Player, PlayerMode,
    PlayerState, PlayerVariant,
};
use crate::song::Song;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

type OutputFactory = Box<dyn Fn() -> Box<dyn AudioOutput> + Send + Sync>;

/// Owner of the process's song and player.
pub struct AudioFacade {
    config: AudioConfig,
    make_output: OutputFactory,
    song: OnceLock<Arc<dyn Song>>,
    /// Claimed by the first `init` so that construction can run unlocked.
    initializing: AtomicBool,
    player: OnceLock<Mutex<PlayerVariant>>,
}

impl AudioFacade {
    /// Creates a facade that plays through the default audio device.
    pub fn new(config: AudioConfig) -> Self {
        Self::with_output(config, default_output)
    }

    /// Creates a facade whose player streams into outputs from `make_output`.
    pub fn with_output<F>(config: AudioConfig, make_output: F) -> Self
    where
        F: Fn() -> Box<dyn AudioOutput> + Send + Sync + 'static,
    {
        Self {
            config,
            make_output: Box::new(make_output),
            song: OnceLock::new(),
            initializing: AtomicBool::new(false),
            player: OnceLock::new(),
        }
    }

    /// Returns the configuration players of this facade are built with.
    pub fn config(&self) -> &AudioConfig {
        &self.config
    }

    /// Sets the song every player of this facade will play.
    ///
    /// # Errors
    ///
    /// Returns [`AudioError::SongAlreadyInstalled`] if a song is already set.
    pub fn install_song(&self, song: Arc<dyn Song>) -> Result<()> {
        self.song
            .set(song)
            .map_err(|_| AudioError::SongAlreadyInstalled)
    }

    /// Returns whether a song has been installed.
    pub fn has_song(&self) -> bool {
        self.song.get().is_some()
    }

    /// Builds the player for `mode`.
    ///
    /// Pre-render mode renders the whole song before returning, invoking the
    /// progress callback on this thread.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - No song has been installed
    /// - A player already exists or is being built by another thread
    /// - The player could not be constructed; the facade stays
    ///   uninitialized and `init` may be called again
    ///
    /// Callers racing the thread that is building the player get
    /// [`AudioError::AlreadyInitialized`] at once. If that build then fails,
    /// no player exists despite their error, and [`is_initialized`] stays
    /// false until a later `init` succeeds.
    ///
    /// [`is_initialized`]: AudioFacade::is_initialized
    pub fn init(&self, mode: PlayerMode) -> Result<()> {
        let song = self.song.get().cloned().ok_or(AudioError::NoSong)?;

        if self
            .initializing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(AudioError::AlreadyInitialized);
        }

        let processors = self.config.processors.unwrap_or_else(logical_processors);
        tracing::info!("Initializing {} player", mode.name());

        match create_player(mode, song, processors, &self.config, (self.make_output)()) {
            Ok(player) => {
                // Only the thread that won `initializing` gets here
                let _ = self.player.set(Mutex::new(player));
                Ok(())
            }
            Err(e) => {
                self.initializing.store(false, Ordering::Release);
                Err(e)
            }
        }
    }

    /// Returns whether `init` has completed.
    pub fn is_initialized(&self) -> bool {
        self.player.get().is_some()
    }

    fn player(&self) -> Result<&Mutex<PlayerVariant>> {
        self.player.get().ok_or(AudioError::NotInitialized)
    }

    /// Starts playback of the active player.
    pub fn play(&self) -> Result<()> {
        self.player()?.lock().play()
    }

    /// Returns the playback position in seconds.
    pub fn position(&self) -> Result<f64> {
        Ok(self.player()?.lock().position())
    }

    /// Returns the active player's state.
    pub fn state(&self) -> Result<PlayerState> {
        Ok(self.player()?.lock().state())
    }

    /// Returns the active player's render thread count.
    pub fn thread_count(&self) -> Result<usize> {
        Ok(self.player()?.lock().thread_count())
    }

    /// Returns whether the active player is the pre-render variant.
    pub fn is_prerender(&self) -> Result<bool> {
        Ok(self.player()?.lock().is_prerender())
    }
}

/// The facade behind the crate-level functions and the C interface.
///
/// Created on first use with [`AudioConfig::from_env`] and the default
/// audio output.
pub fn global() -> &'static AudioFacade {
    static FACADE: OnceLock<AudioFacade> = OnceLock::new();
    FACADE.get_or_init(|| AudioFacade::new(AudioConfig::from_env()))
}

/// Installs the song on the global facade.
pub fn install_song(song: Arc<dyn Song>) -> Result<()> {
    global().install_song(song)
}

/// Initializes the global facade's player.
pub fn init(mode: PlayerMode) -> Result<()> {
    global().init(mode)
}

/// Starts playback on the global facade.
pub fn play() -> Result<()> {
    global().play()
}

/// Returns the global facade's playback position in seconds.
pub fn position() -> Result<f64> {
    global().position()
}
