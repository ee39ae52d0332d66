//! Transaction procedures and the scoped [`Txn`] handle.

use crate::env::Env;
use crate::error::{Error, Result, check};
use crate::ffi;
use libc::c_uint;
use std::marker::PhantomData;
use std::mem;
use std::ptr::{self, NonNull};

/// Begins a transaction, nested inside `parent` when it is non-null.
///
/// # Safety
///
/// `env` must be a live, opened handle; `parent` must be null or a live write
/// transaction of the same environment.
pub unsafe fn txn_begin(
    env: *mut ffi::MDB_env,
    parent: *mut ffi::MDB_txn,
    flags: c_uint,
) -> Result<NonNull<ffi::MDB_txn>> {
    let mut txn: *mut ffi::MDB_txn = ptr::null_mut();
    check("mdb_txn_begin", unsafe { ffi::mdb_txn_begin(env, parent, flags, &mut txn) })?;
    NonNull::new(txn).ok_or_else(|| Error::from_code("mdb_txn_begin", libc::ENOMEM))
}

/// # Safety
///
/// `txn` must be a live handle.
pub unsafe fn txn_env(txn: *mut ffi::MDB_txn) -> *mut ffi::MDB_env {
    unsafe { ffi::mdb_txn_env(txn) }
}

/// # Safety
///
/// `txn` must be a live handle.
pub unsafe fn txn_id(txn: *mut ffi::MDB_txn) -> usize {
    unsafe { ffi::mdb_txn_id(txn) as usize }
}

/// Commits `txn`. The handle is freed whether or not the commit succeeds.
///
/// # Safety
///
/// `txn` must be live and must not be used again afterwards.
pub unsafe fn txn_commit(txn: *mut ffi::MDB_txn) -> Result<()> {
    check("mdb_txn_commit", unsafe { ffi::mdb_txn_commit(txn) })
}

/// Abandons `txn` and frees the handle. Never fails.
///
/// # Safety
///
/// `txn` must be live and must not be used again afterwards.
pub unsafe fn txn_abort(txn: *mut ffi::MDB_txn) {
    unsafe { ffi::mdb_txn_abort(txn) }
}

/// Releases the snapshot of a read-only transaction, keeping the handle for
/// [`txn_renew`]. Never fails.
///
/// # Safety
///
/// `txn` must be a live read-only transaction.
pub unsafe fn txn_reset(txn: *mut ffi::MDB_txn) {
    unsafe { ffi::mdb_txn_reset(txn) }
}

/// # Safety
///
/// `txn` must be a read-only transaction previously passed to [`txn_reset`].
pub unsafe fn txn_renew(txn: *mut ffi::MDB_txn) -> Result<()> {
    check("mdb_txn_renew", unsafe { ffi::mdb_txn_renew(txn) })
}

/// A transaction borrowed from an [`Env`].
///
/// Dropping a `Txn` that was not committed aborts it.
#[derive(Debug)]
pub struct Txn<'env> {
    raw: NonNull<ffi::MDB_txn>,
    read_only: bool,
    _env: PhantomData<&'env Env>,
}

impl<'env> Txn<'env> {
    /// Begins a top-level transaction. An environment that was never opened
    /// successfully is refused with `EINVAL`.
    pub fn begin(env: &'env Env, flags: c_uint) -> Result<Self> {
        env.ensure_open("mdb_txn_begin")?;
        // SAFETY: `env` is opened and outlives the transaction through `'env`.
        let raw = unsafe { txn_begin(env.as_ptr(), ptr::null_mut(), flags) }?;
        Ok(Self {
            raw,
            read_only: flags & ffi::MDB_RDONLY != 0,
            _env: PhantomData,
        })
    }

    pub fn begin_read(env: &'env Env) -> Result<Self> {
        Self::begin(env, ffi::MDB_RDONLY)
    }

    pub fn begin_write(env: &'env Env) -> Result<Self> {
        Self::begin(env, 0)
    }

    /// Begins a child transaction. The parent is unusable until the child ends.
    pub fn nested(&mut self) -> Result<Txn<'_>> {
        // SAFETY: `self` is a live transaction and stays borrowed, and so
        // unusable, until the child ends.
        let env = unsafe { txn_env(self.as_ptr()) };
        let raw = unsafe { txn_begin(env, self.as_ptr(), 0) }?;
        Ok(Txn {
            raw,
            read_only: false,
            _env: PhantomData,
        })
    }

    pub fn id(&self) -> usize {
        // SAFETY: live handle.
        unsafe { txn_id(self.as_ptr()) }
    }

    #[inline]
    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub fn commit(self) -> Result<()> {
        let raw = self.as_ptr();
        mem::forget(self);
        // SAFETY: ownership of `raw` moves into LMDB, which frees it.
        unsafe { txn_commit(raw) }
    }

    pub fn abort(self) {
        let raw = self.as_ptr();
        mem::forget(self);
        // SAFETY: as in `commit`, `raw` is released exactly once.
        unsafe { txn_abort(raw) }
    }

    /// Drops the read snapshot of a read-only transaction until [`renew`](Txn::renew).
    ///
    /// Has no effect on write transactions.
    pub fn reset(&mut self) {
        if self.read_only {
            // SAFETY: live read-only handle; `renew` is the only way back.
            unsafe { txn_reset(self.as_ptr()) }
        }
    }

    /// Re-acquires a snapshot after [`reset`](Txn::reset). LMDB rejects this
    /// with `EINVAL` for write transactions and for read transactions that
    /// were never reset.
    pub fn renew(&mut self) -> Result<()> {
        // SAFETY: live handle; LMDB validates its state.
        unsafe { txn_renew(self.as_ptr()) }
    }

    #[inline]
    pub fn as_ptr(&self) -> *mut ffi::MDB_txn {
        self.raw.as_ptr()
    }
}

impl Drop for Txn<'_> {
    fn drop(&mut self) {
        if !self.read_only {
            tracing::debug!(txn = self.id(), "aborting uncommitted write transaction");
        }
        // SAFETY: commit and abort forget `self`, so the handle is still live.
        unsafe { txn_abort(self.as_ptr()) }
    }
}
