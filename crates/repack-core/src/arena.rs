//! Scratch memory for one mesh-processing call.
//!
//! Every scratch buffer records its allocation when created and its release
//! exactly once when dropped, so early returns through `?` cannot leak. The
//! counters make the discipline observable to callers and tests.

use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Allocation counters shared by all arenas opened against one owner.
#[derive(Debug, Default)]
pub struct ArenaStats {
    allocations: AtomicUsize,
    releases: AtomicUsize,
    bytes_in_use: AtomicUsize,
}

impl ArenaStats {
    pub const fn new() -> Self {
        Self {
            allocations: AtomicUsize::new(0),
            releases: AtomicUsize::new(0),
            bytes_in_use: AtomicUsize::new(0),
        }
    }

    pub(crate) fn record_allocation(&self, bytes: usize) {
        self.allocations.fetch_add(1, Ordering::Relaxed);
        self.bytes_in_use.fetch_add(bytes, Ordering::Relaxed);
    }

    pub(crate) fn record_release(&self, bytes: usize) {
        self.releases.fetch_add(1, Ordering::Relaxed);
        self.bytes_in_use.fetch_sub(bytes, Ordering::Relaxed);
    }

    pub fn allocations(&self) -> usize {
        self.allocations.load(Ordering::Relaxed)
    }

    pub fn releases(&self) -> usize {
        self.releases.load(Ordering::Relaxed)
    }

    /// Allocations not yet released.
    pub fn live(&self) -> usize {
        self.allocations().saturating_sub(self.releases())
    }

    pub fn bytes_in_use(&self) -> usize {
        self.bytes_in_use.load(Ordering::Relaxed)
    }
}

/// Factory for the scratch buffers of a single mesh.
#[derive(Debug, Clone, Copy)]
pub struct ScratchArena<'s> {
    stats: &'s ArenaStats,
}

impl<'s> ScratchArena<'s> {
    pub fn new(stats: &'s ArenaStats) -> Self {
        Self { stats }
    }

    /// Allocates `len` zeroed elements.
    pub fn alloc<T: Copy + Default>(&self, len: usize) -> ScratchBuffer<'s, T> {
        ScratchBuffer::new(self.stats, vec![T::default(); len])
    }

    /// Allocates a scratch copy of `src`.
    pub fn alloc_copy<T: Copy>(&self, src: &[T]) -> ScratchBuffer<'s, T> {
        ScratchBuffer::new(self.stats, src.to_vec())
    }
}

/// Owned scratch region; released on drop.
#[derive(Debug)]
pub struct ScratchBuffer<'s, T> {
    data: Vec<T>,
    bytes: usize,
    stats: &'s ArenaStats,
}

impl<'s, T: Copy> ScratchBuffer<'s, T> {
    fn new(stats: &'s ArenaStats, data: Vec<T>) -> Self {
        let bytes = data.len() * std::mem::size_of::<T>();
        stats.record_allocation(bytes);
        Self { data, bytes, stats }
    }

    /// Copies the first `len` elements into caller-owned memory.
    pub fn copy_out(&self, len: usize) -> Vec<T> {
        self.data[..len].to_vec()
    }
}

impl<T> Deref for ScratchBuffer<'_, T> {
    type Target = [T];

    fn deref(&self) -> &Self::Target {
        &self.data
    }
}

impl<T> DerefMut for ScratchBuffer<'_, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.data
    }
}

impl<T> Drop for ScratchBuffer<'_, T> {
    fn drop(&mut self) {
        self.stats.record_release(self.bytes);
    }
}
