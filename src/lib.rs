//! introplay - A C-callable song player for size- and startup-sensitive hosts.
//!
//! This library provides:
//! - A global allocator that sends every allocation straight to the system heap
//! - A three-call facade (`AudioInit`, `AudioPlay`, `AudioGetPos`) that builds
//!   a realtime or pre-render player and forwards to it

pub mod allocator;
pub mod config;
pub mod error;
pub mod facade;
pub mod ffi;
pub mod logging;
pub mod player;
pub mod song;

#[cfg(feature = "global-allocator")]
#[global_allocator]
static GLOBAL: allocator::SystemHeapAllocator = allocator::SystemHeapAllocator;

// Re-export commonly used types
pub use config::AudioConfig;
pub use error::{AudioError, Result};
pub use facade::{init, install_song, play, position, AudioFacade};
pub use player::{Player, PlayerMode, PlayerState, PlayerVariant, ProgressCallback};
pub use song::{PcmSong, Song};
