//! C interface.
//!
//! Flat `extern "C"` entry points over the global [`crate::facade`] and the
//! system heap allocator. See `include/introplay.h` for the matching header.
//!
//! A failed facade call is logged, its [`AudioError::code`] is stored for
//! [`AudioLastError`], and the call returns a neutral value.

#![allow(non_snake_case)]

use crate::error::{AudioError, Result};
use crate::facade;
use crate::player::{PlayerMode, ProgressCallback, RawProgressFn};
use crate::song::PcmSong;
use std::cell::Cell;
use std::ffi::{c_char, c_void, CStr};
use std::path::PathBuf;
use std::sync::Arc;

/// Value returned by [`AudioGetPos`] when there is no position to report.
pub const POSITION_UNAVAILABLE: f64 = -1.0;

thread_local! {
    static LAST_ERROR: Cell<i32> = const { Cell::new(0) };
}

/// Records the outcome of a facade call, returning `fallback` on error.
fn record<T>(operation: &str, result: Result<T>, fallback: T) -> T {
    match result {
        Ok(value) => {
            LAST_ERROR.with(|e| e.set(0));
            value
        }
        Err(e) => {
            tracing::error!("{} failed: {}", operation, e);
            LAST_ERROR.with(|last| last.set(e.code()));
            fallback
        }
    }
}

/// Constructs the process's player.
///
/// With `is_prerender` non-zero the whole song is rendered before this
/// returns, calling `prerender_callback(progress, prerender_data)` along the
/// way. Otherwise a realtime player is created and the callback is unused.
#[no_mangle]
pub extern "C" fn AudioInit(
    is_prerender: u8,
    prerender_callback: Option<RawProgressFn>,
    prerender_data: *mut c_void,
) {
    crate::logging::init();
    let mode = PlayerMode::from_flag(
        is_prerender != 0,
        ProgressCallback::new(prerender_callback, prerender_data),
    );
    record("AudioInit", facade::init(mode), ());
}

/// Starts playback.
#[no_mangle]
pub extern "C" fn AudioPlay() {
    record("AudioPlay", facade::play(), ());
}

/// Returns the playback position in seconds, or -1.0 on failure.
#[no_mangle]
pub extern "C" fn AudioGetPos() -> f64 {
    record("AudioGetPos", facade::position(), POSITION_UNAVAILABLE)
}

/// Returns the error code of the calling thread's last facade call; 0 if it
/// succeeded.
#[no_mangle]
pub extern "C" fn AudioLastError() -> i32 {
    LAST_ERROR.with(Cell::get)
}

/// Loads a WAV file and installs it as the song. Returns 0 or an error code.
///
/// # Safety
///
/// `wav_path` must be null or point to a NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn AudioLoadSong(wav_path: *const c_char) -> i32 {
    let result = if wav_path.is_null() {
        Err(AudioError::InvalidArgument("song path is null"))
    } else {
        let path = path_from_c(CStr::from_ptr(wav_path));
        PcmSong::from_wav(&path).and_then(|song| facade::install_song(Arc::new(song)))
    };
    record("AudioLoadSong", result, ());
    AudioLastError()
}

/// Converts a C path string without losing bytes that are not UTF-8.
#[cfg(unix)]
fn path_from_c(path: &CStr) -> PathBuf {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    PathBuf::from(OsStr::from_bytes(path.to_bytes()))
}

/// Converts a C path string. Paths are expected to be UTF-8 here.
#[cfg(not(unix))]
fn path_from_c(path: &CStr) -> PathBuf {
    PathBuf::from(path.to_string_lossy().into_owned())
}

/// Allocates `size` bytes from the system heap; null on failure.
#[no_mangle]
pub extern "C" fn AudioHeapAlloc(size: usize) -> *mut c_void {
    crate::allocator::heap_alloc(size).cast()
}

/// Array form of [`AudioHeapAlloc`].
#[no_mangle]
pub extern "C" fn AudioHeapAllocArray(size: usize) -> *mut c_void {
    crate::allocator::heap_alloc_array(size).cast()
}

/// Releases a block from [`AudioHeapAlloc`]. Null is ignored.
///
/// # Safety
///
/// `ptr` must be null or a live block from one of the `AudioHeapAlloc*`
/// functions.
#[no_mangle]
pub unsafe extern "C" fn AudioHeapFree(ptr: *mut c_void) {
    crate::allocator::heap_free(ptr.cast())
}

/// Sized form of [`AudioHeapFree`]; `size` is ignored.
///
/// # Safety
///
/// Same contract as [`AudioHeapFree`].
#[no_mangle]
pub unsafe extern "C" fn AudioHeapFreeSized(ptr: *mut c_void, size: usize) {
    crate::allocator::heap_free_sized(ptr.cast(), size)
}

/// Array form of [`AudioHeapFree`].
///
/// # Safety
///
/// Same contract as [`AudioHeapFree`].
#[no_mangle]
pub unsafe extern "C" fn AudioHeapFreeArray(ptr: *mut c_void) {
    crate::allocator::heap_free_array(ptr.cast())
}

/// Sized array form of [`AudioHeapFree`]; `size` is ignored.
///
/// # Safety
///
/// Same contract as [`AudioHeapFree`].
#[no_mangle]
pub unsafe extern "C" fn AudioHeapFreeArraySized(ptr: *mut c_void, size: usize) {
    crate::allocator::heap_free_array_sized(ptr.cast(), size)
}
