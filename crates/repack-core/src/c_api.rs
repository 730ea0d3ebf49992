//! C API layer for the repack codec
//!
//! Mirrors the narrow native boundary used by web front ends: a process-wide
//! block size configured once, raw-pointer repack and index remap entry
//! points, and counted allocation primitives for staging buffers.

use std::alloc::{self, Layout};
use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_int, c_void};
use std::ptr;
use std::slice;
use std::sync::OnceLock;

use tracing::warn;

use crate::arena::ArenaStats;
use crate::block::BlockSize;
use crate::data_types::IndexWidth;
use crate::delta::repack_into;
use crate::error::{ErrorKind, RepackError};
use crate::remap::apply_remap;
use crate::source::VertexView;

/// Status codes for the C API. Capacity overflow doubles as the `-1`
/// sentinel returned by [`repack_mesh_uint16`].
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(non_camel_case_types)]
pub enum repack_status_t {
    REPACK_STATUS_OK = 0,
    REPACK_STATUS_CAPACITY_OVERFLOW = -1,
    REPACK_STATUS_UNSUPPORTED_INPUT = -2,
    REPACK_STATUS_INVALID_PARAMETER = -3,
    REPACK_STATUS_CONFIGURATION = -4,
    REPACK_STATUS_NOT_CONFIGURED = -5,
}

impl Default for repack_status_t {
    fn default() -> Self {
        repack_status_t::REPACK_STATUS_OK
    }
}

static BLOCK_SIZE: OnceLock<BlockSize> = OnceLock::new();
static FFI_ARENA: ArenaStats = ArenaStats::new();

/// Header in front of every `repack_alloc` block, holding the requested size.
const ALLOC_HEADER: usize = 16;

thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = RefCell::new(None);
}

fn set_last_error(error_msg: &str) {
    let msg = CString::new(error_msg.replace('\0', " ")).ok();
    LAST_ERROR.with(|last_error| {
        *last_error.borrow_mut() = msg;
    });
}

fn status_from_error(error: &RepackError) -> repack_status_t {
    set_last_error(&error.to_string());
    match error.kind() {
        ErrorKind::CapacityOverflow => repack_status_t::REPACK_STATUS_CAPACITY_OVERFLOW,
        ErrorKind::UnsupportedInput => repack_status_t::REPACK_STATUS_UNSUPPORTED_INPUT,
        ErrorKind::InvalidInput => repack_status_t::REPACK_STATUS_INVALID_PARAMETER,
        ErrorKind::Configuration => repack_status_t::REPACK_STATUS_CONFIGURATION,
    }
}

fn invalid(msg: &str) -> repack_status_t {
    set_last_error(msg);
    repack_status_t::REPACK_STATUS_INVALID_PARAMETER
}

// ===== Configuration =====

/// Sets the process-wide block size. Must be called once before
/// `repack_mesh_uint16`; calling it again with the same value is a no-op,
/// with a different value an error.
#[no_mangle]
pub extern "C" fn repack_set_block_size(block_size: c_int) -> repack_status_t {
    let requested = u32::try_from(block_size).unwrap_or(0);
    let size = match BlockSize::new(requested) {
        Ok(size) => size,
        Err(e) => return status_from_error(&e),
    };
    let current = *BLOCK_SIZE.get_or_init(|| size);
    if current != size {
        return status_from_error(&RepackError::BlockSizeAlreadySet { current: current.get(), requested });
    }
    repack_status_t::REPACK_STATUS_OK
}

/// Returns the configured block size, or 0 when unset.
#[no_mangle]
pub extern "C" fn repack_get_block_size() -> c_int {
    BLOCK_SIZE.get().map_or(0, |b| b.get() as c_int)
}

// ===== Codec =====

/// Repacks `vertex_count` 16-bit positions read from `input` every `stride`
/// samples.
///
/// Buffer sizes the caller must provide:
/// - `anchors_out`: `(ceil(max_output_vertices / block_size) + 1) * 3` samples
/// - `deltas_out`: `max_output_vertices` codes
/// - `remap_out`: `vertex_count` entries
///
/// Returns the output vertex count, `-1` when `max_output_vertices` is too
/// small, or another negative `repack_status_t` on invalid arguments.
///
/// # Safety
/// Every pointer must be valid for the sizes above.
#[no_mangle]
pub unsafe extern "C" fn repack_mesh_uint16(
    vertex_count: u32,
    input: *const u16,
    anchors_out: *mut u16,
    deltas_out: *mut u32,
    remap_out: *mut u32,
    stride: u32,
    max_output_vertices: u32,
) -> c_int {
    let block_size = match BLOCK_SIZE.get() {
        Some(b) => *b,
        None => {
            set_last_error("block size not configured; call repack_set_block_size first");
            return repack_status_t::REPACK_STATUS_NOT_CONFIGURED as c_int;
        }
    };
    if max_output_vertices > i32::MAX as u32 {
        return invalid("max_output_vertices exceeds the return range") as c_int;
    }

    let count = vertex_count as usize;
    let stride = stride as usize;
    let max = max_output_vertices as usize;
    let input_len = match count {
        0 => 0,
        n => (n - 1).saturating_mul(stride).saturating_add(3),
    };
    let anchor_len = block_size.anchor_capacity(max);

    if (input_len > 0 && input.is_null())
        || (max > 0 && (deltas_out.is_null() || anchors_out.is_null()))
        || (count > 0 && remap_out.is_null())
    {
        return invalid("null buffer pointer") as c_int;
    }

    let input = if input_len == 0 { &[][..] } else { slice::from_raw_parts(input, input_len) };
    let anchors: &mut [[u16; 3]] = if max == 0 {
        &mut []
    } else {
        slice::from_raw_parts_mut(anchors_out as *mut [u16; 3], anchor_len)
    };
    let deltas: &mut [u32] = if max == 0 { &mut [] } else { slice::from_raw_parts_mut(deltas_out, max) };
    let remap: &mut [u32] = if count == 0 { &mut [] } else { slice::from_raw_parts_mut(remap_out, count) };

    let result = VertexView::new(input, stride, count)
        .and_then(|view| repack_into(block_size, &view, max, anchors, deltas, remap));
    match result {
        Ok(output_vertices) => output_vertices as c_int,
        Err(e) => {
            warn!(vertex_count, max_output_vertices, error = %e, "native repack failed");
            status_from_error(&e) as c_int
        }
    }
}

/// Rewrites `index_count` indices in place through `remap`. `width_bytes`
/// selects 16-bit (2) or 32-bit (4) elements; the width never changes.
///
/// Unlike the four-argument `apply_remap(count, indices, remap, width)`
/// entry point older front ends call, this takes the table length as
/// `remap_len`, between `remap` and `width_bytes`. Indices at or past
/// `remap_len` fail with `REPACK_STATUS_INVALID_PARAMETER` instead of
/// reading past the table.
///
/// # Safety
/// `indices` must hold `index_count` elements of the given width and
/// `remap` must hold `remap_len` entries.
#[no_mangle]
pub unsafe extern "C" fn repack_apply_remap(
    index_count: u32,
    indices: *mut c_void,
    remap: *const u32,
    remap_len: u32,
    width_bytes: u32,
) -> repack_status_t {
    if index_count == 0 {
        return repack_status_t::REPACK_STATUS_OK;
    }
    if indices.is_null() || (remap.is_null() && remap_len > 0) {
        return invalid("null buffer pointer");
    }
    let remap = if remap_len == 0 { &[][..] } else { slice::from_raw_parts(remap, remap_len as usize) };
    let count = index_count as usize;

    let width = match IndexWidth::from_byte_length(width_bytes as usize) {
        Some(width) => width,
        None => return invalid(&format!("index width must be 2 or 4 bytes, got {}", width_bytes)),
    };
    let result = match width {
        IndexWidth::U16 => apply_remap(slice::from_raw_parts_mut(indices as *mut u16, count), remap),
        IndexWidth::U32 => apply_remap(slice::from_raw_parts_mut(indices as *mut u32, count), remap),
    };
    match result {
        Ok(()) => repack_status_t::REPACK_STATUS_OK,
        Err(e) => status_from_error(&e),
    }
}

// ===== Allocation =====

/// Allocates `size` bytes, 16-byte aligned. Returns null on failure.
/// Every block must be released with exactly one `repack_free`.
#[no_mangle]
pub extern "C" fn repack_alloc(size: usize) -> *mut c_void {
    let layout = match size.checked_add(ALLOC_HEADER).and_then(|n| Layout::from_size_align(n, ALLOC_HEADER).ok()) {
        Some(layout) => layout,
        None => {
            set_last_error("allocation size overflow");
            return ptr::null_mut();
        }
    };
    // SAFETY: layout has a non-zero size.
    unsafe {
        let base = alloc::alloc(layout);
        if base.is_null() {
            set_last_error("out of memory");
            return ptr::null_mut();
        }
        (base as *mut usize).write(size);
        FFI_ARENA.record_allocation(size);
        base.add(ALLOC_HEADER) as *mut c_void
    }
}

/// Releases a block from `repack_alloc`. Null is ignored.
///
/// # Safety
/// `ptr` must come from `repack_alloc` and not have been freed already.
#[no_mangle]
pub unsafe extern "C" fn repack_free(ptr: *mut c_void) {
    if ptr.is_null() {
        return;
    }
    let base = (ptr as *mut u8).sub(ALLOC_HEADER);
    let size = (base as *const usize).read();
    FFI_ARENA.record_release(size);
    alloc::dealloc(base, Layout::from_size_align_unchecked(size + ALLOC_HEADER, ALLOC_HEADER));
}

/// Number of `repack_alloc` blocks not yet freed.
#[no_mangle]
pub extern "C" fn repack_live_allocations() -> usize {
    FFI_ARENA.live()
}

// ===== Error Handling =====

/// Returns the last error message of the calling thread, or null. The
/// pointer stays valid until the next failing call on the same thread.
#[no_mangle]
pub extern "C" fn repack_get_last_error() -> *const c_char {
    LAST_ERROR.with(|error| match error.borrow().as_ref() {
        Some(msg) => msg.as_ptr(),
        None => ptr::null(),
    })
}

#[no_mangle]
pub extern "C" fn repack_clear_error() {
    LAST_ERROR.with(|error| {
        *error.borrow_mut() = None;
    });
}

/// Returns the library version string.
#[no_mangle]
pub extern "C" fn repack_version() -> *const c_char {
    const VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), "\0");
    match CStr::from_bytes_with_nul(VERSION.as_bytes()) {
        Ok(v) => v.as_ptr(),
        Err(_) => ptr::null(),
    }
}
