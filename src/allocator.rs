//! System heap allocator.
//!
//! [`SystemHeapAllocator`] routes every Rust allocation to the platform heap
//! (`HeapAlloc` on the process heap on Windows, `malloc` elsewhere), and the
//! `heap_*` functions give C callers the same heap with `new`/`delete`-shaped
//! entry points: scalar and array forms, each with a sized and an unsized
//! release.
//!
//! Nothing here logs, panics or aborts. A failed allocation is a null pointer
//! and is left for the caller to handle.

use std::alloc::{GlobalAlloc, Layout, System};
use std::ptr;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Bytes reserved in front of every `heap_alloc` block to record its size.
/// Also the alignment of the returned pointer.
const HEADER_SIZE: usize = 16;

static ALLOCATIONS: AtomicU64 = AtomicU64::new(0);
static DEALLOCATIONS: AtomicU64 = AtomicU64::new(0);
static LIVE_BYTES: AtomicUsize = AtomicUsize::new(0);

/// Global allocator that forwards to the system heap.
///
/// The heap handle is resolved once by `std` and reused, so there is no
/// per-call lookup and no static-initialization ordering to worry about.
pub struct SystemHeapAllocator;

unsafe impl GlobalAlloc for SystemHeapAllocator {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        let ptr = System.alloc(layout);
        if !ptr.is_null() {
            record_alloc(layout.size());
        }
        ptr
    }

    unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        let ptr = System.alloc_zeroed(layout);
        if !ptr.is_null() {
            record_alloc(layout.size());
        }
        ptr
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        System.dealloc(ptr, layout);
        record_dealloc(layout.size());
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        let new_ptr = System.realloc(ptr, layout, new_size);
        if !new_ptr.is_null() {
            LIVE_BYTES.fetch_sub(layout.size(), Ordering::Relaxed);
            LIVE_BYTES.fetch_add(new_size, Ordering::Relaxed);
        }
        new_ptr
    }
}

#[inline]
fn record_alloc(size: usize) {
    ALLOCATIONS.fetch_add(1, Ordering::Relaxed);
    LIVE_BYTES.fetch_add(size, Ordering::Relaxed);
}

#[inline]
fn record_dealloc(size: usize) {
    DEALLOCATIONS.fetch_add(1, Ordering::Relaxed);
    LIVE_BYTES.fetch_sub(size, Ordering::Relaxed);
}

/// Snapshot of allocator activity since process start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocStats {
    /// Successful allocations (including zeroed ones).
    pub allocations: u64,
    /// Deallocations.
    pub deallocations: u64,
    /// Bytes currently handed out, as requested by callers.
    pub live_bytes: usize,
}

/// Returns the current allocator counters.
///
/// Counters are updated with relaxed atomics, so a snapshot taken while other
/// threads allocate is approximate.
pub fn stats() -> AllocStats {
    AllocStats {
        allocations: ALLOCATIONS.load(Ordering::Relaxed),
        deallocations: DEALLOCATIONS.load(Ordering::Relaxed),
        live_bytes: LIVE_BYTES.load(Ordering::Relaxed),
    }
}

fn header_layout(size: usize) -> Option<Layout> {
    let total = size.checked_add(HEADER_SIZE)?;
    Layout::from_size_align(total, HEADER_SIZE).ok()
}

/// Allocates at least `size` bytes from the system heap.
///
/// Returns null if the heap is exhausted or `size` is too large to describe.
/// The block is 16-byte aligned and must be released with one of the
/// `heap_free*` functions.
pub fn heap_alloc(size: usize) -> *mut u8 {
    let Some(layout) = header_layout(size) else {
        return ptr::null_mut();
    };

    // SAFETY: `layout` has a non-zero size because it includes the header.
    unsafe {
        let base = SystemHeapAllocator.alloc(layout);
        if base.is_null() {
            return base;
        }
        (base as *mut usize).write(layout.size());
        base.add(HEADER_SIZE)
    }
}

/// Array form of [`heap_alloc`]. Identical behavior.
pub fn heap_alloc_array(size: usize) -> *mut u8 {
    heap_alloc(size)
}

/// Releases a block returned by [`heap_alloc`] or [`heap_alloc_array`].
///
/// A null `ptr` is a no-op.
///
/// # Safety
///
/// `ptr` must be null or a live block from this module's allocation functions.
pub unsafe fn heap_free(ptr: *mut u8) {
    if ptr.is_null() {
        return;
    }

    let base = ptr.sub(HEADER_SIZE);
    let total = (base as *const usize).read();
    let layout = Layout::from_size_align_unchecked(total, HEADER_SIZE);
    SystemHeapAllocator.dealloc(base, layout);
}

/// Sized form of [`heap_free`]. `size` is accepted but not used.
///
/// # Safety
///
/// Same contract as [`heap_free`].
pub unsafe fn heap_free_sized(ptr: *mut u8, _size: usize) {
    heap_free(ptr)
}

/// Array form of [`heap_free`].
///
/// # Safety
///
/// Same contract as [`heap_free`].
pub unsafe fn heap_free_array(ptr: *mut u8) {
    heap_free(ptr)
}

/// Sized array form of [`heap_free`]. `size` is accepted but not used.
///
/// # Safety
///
/// Same contract as [`heap_free`].
pub unsafe fn heap_free_array_sized(ptr: *mut u8, _size: usize) {
    heap_free(ptr)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alloc_is_aligned_and_writable() {
        let ptr = heap_alloc(100);
        assert!(!ptr.is_null());
        assert_eq!(ptr as usize % HEADER_SIZE, 0);
        unsafe {
            ptr::write_bytes(ptr, 0xAB, 100);
            assert_eq!(*ptr.add(99), 0xAB);
            heap_free(ptr);
        }
    }

    #[test]
    fn test_zero_size_alloc() {
        let a = heap_alloc(0);
        let b = heap_alloc_array(0);
        assert!(!a.is_null());
        assert!(!b.is_null());
        assert_ne!(a, b);
        unsafe {
            heap_free_sized(a, 0);
            heap_free_array_sized(b, 0);
        }
    }

    #[test]
    fn test_null_free_is_noop() {
        unsafe {
            heap_free(ptr::null_mut());
            heap_free_sized(ptr::null_mut(), 16);
            heap_free_array(ptr::null_mut());
            heap_free_array_sized(ptr::null_mut(), 16);
        }
    }

    #[test]
    fn test_oversized_alloc_returns_null() {
        assert!(heap_alloc(usize::MAX).is_null());
        assert!(heap_alloc_array(usize::MAX - 1).is_null());
    }

    #[test]
    fn test_size_argument_is_ignored() {
        let ptr = heap_alloc_array(64);
        assert!(!ptr.is_null());
        // A wrong size must not change what gets released.
        unsafe { heap_free_array_sized(ptr, 1) };
    }

    #[test]
    fn test_stats_track_heap_calls() {
        let before = stats();
        let ptr = heap_alloc(32);
        let during = stats();
        unsafe { heap_free(ptr) };
        let after = stats();

        assert!(during.allocations > before.allocations);
        assert!(after.deallocations > during.deallocations);
    }

    #[test]
    fn test_global_alloc_realloc_preserves_contents() {
        unsafe {
            let layout = Layout::from_size_align(8, 8).unwrap();
            let ptr = SystemHeapAllocator.alloc_zeroed(layout);
            assert!(!ptr.is_null());
            assert_eq!(*ptr, 0);
            *ptr = 42;
            let grown = SystemHeapAllocator.realloc(ptr, layout, 4096);
            assert!(!grown.is_null());
            assert_eq!(*grown, 42);
            SystemHeapAllocator.dealloc(grown, Layout::from_size_align(4096, 8).unwrap());
        }
    }
}
