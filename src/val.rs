use crate::ffi;
use std::{ptr, slice};

/// Wraps a borrowed byte slice as an `MDB_val` for passing into LMDB.
///
/// LMDB never writes through the data pointer of an input value, so handing
/// it a pointer derived from a shared slice is fine.
#[inline]
pub fn from_slice(bytes: &[u8]) -> ffi::MDB_val {
    ffi::MDB_val {
        mv_size: bytes.len(),
        mv_data: bytes.as_ptr() as *mut _,
    }
}

/// An empty value slot for LMDB to fill in.
#[inline]
pub fn empty() -> ffi::MDB_val {
    ffi::MDB_val {
        mv_size: 0,
        mv_data: ptr::null_mut(),
    }
}

/// Views an `MDB_val` filled in by LMDB as a byte slice.
///
/// # Safety
///
/// `val` must have been produced by LMDB within a transaction that outlives
/// `'a`, and must not be invalidated by a later write in that transaction
/// while the slice is alive.
#[inline]
pub unsafe fn as_slice<'a>(val: &ffi::MDB_val) -> &'a [u8] {
    if val.mv_data.is_null() || val.mv_size == 0 {
        &[]
    } else {
        // SAFETY: upheld by the caller.
        unsafe { slice::from_raw_parts(val.mv_data as *const u8, val.mv_size) }
    }
}
