//! C ABI for AFL++-style custom mutator hosts.
//!
//! `afl_custom_init` builds a [`Session`] from the environment and hands the
//! driver an opaque handle; every other entry point takes that handle back.
//! The handle also owns the output buffer returned by `afl_custom_fuzz`, which
//! stays valid until the next call on the same handle.

use crate::config::RespweaveConfig;
use crate::session::Session;
use std::ffi::{c_uint, c_void};
use std::ptr;
use tracing::warn;

pub struct AflMutator {
    session: Session,
    output: Vec<u8>,
}

impl AflMutator {
    pub fn new(session: Session) -> Self {
        Self {
            session,
            output: Vec::new(),
        }
    }

    fn into_handle(self) -> *mut c_void {
        Box::into_raw(Box::new(self)).cast()
    }
}

/// Borrows `len` bytes at `ptr`, treating null as empty.
///
/// # Safety
/// A non-null `ptr` must be valid for reads of `len` bytes for `'a`.
unsafe fn raw_bytes<'a>(ptr: *const u8, len: usize) -> &'a [u8] {
    if ptr.is_null() || len == 0 {
        &[]
    } else {
        unsafe { std::slice::from_raw_parts(ptr, len) }
    }
}

/// Returns null when the configuration is rejected, which makes the driver
/// abort before any input is decoded.
#[unsafe(no_mangle)]
pub extern "C" fn afl_custom_init(_afl: *mut c_void, _seed: c_uint) -> *mut c_void {
    match RespweaveConfig::from_env().and_then(Session::init) {
        Ok(session) => AflMutator::new(session).into_handle(),
        Err(err) => {
            warn!(error = %err, "rejecting mutator configuration");
            ptr::null_mut()
        }
    }
}

/// # Safety
/// `data` must be a live handle from [`afl_custom_init`]. `buf` and `add_buf`
/// must be null or valid for their stated sizes, and `out_buf` must be
/// writable.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn afl_custom_fuzz(
    data: *mut c_void,
    buf: *mut u8,
    buf_size: usize,
    out_buf: *mut *mut u8,
    add_buf: *mut u8,
    add_buf_size: usize,
    max_size: usize,
) -> usize {
    if data.is_null() || out_buf.is_null() {
        return 0;
    }
    let handle = unsafe { &mut *data.cast::<AflMutator>() };
    let buffer = unsafe { raw_bytes(buf, buf_size) };
    let donor = if add_buf.is_null() {
        None
    } else {
        Some(unsafe { raw_bytes(add_buf, add_buf_size) })
    };
    handle.output = handle.session.mutate(buffer, donor, max_size);
    unsafe { *out_buf = handle.output.as_mut_ptr() };
    handle.output.len()
}

/// # Safety
/// `data` must be null or a live handle from [`afl_custom_init`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn afl_custom_fuzz_count(
    data: *mut c_void,
    buf: *const u8,
    buf_size: usize,
) -> u32 {
    if data.is_null() {
        return 0;
    }
    let handle = unsafe { &*data.cast::<AflMutator>() };
    let buffer = unsafe { raw_bytes(buf, buf_size) };
    handle.session.iteration_count(buffer)
}

/// # Safety
/// `data` must be null or a handle from [`afl_custom_init`] that has not been
/// released yet. The handle is invalid afterwards.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn afl_custom_deinit(data: *mut c_void) {
    if data.is_null() {
        return;
    }
    let handle = unsafe { Box::from_raw(data.cast::<AflMutator>()) };
    handle.session.deinit();
}
