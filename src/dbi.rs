//! Database-handle procedures and the [`Dbi`] handle.
//!
//! A database handle is a small integer owned by the environment; it is
//! opened inside a transaction and stays valid until the environment closes
//! or the database is dropped.

use crate::env::Env;
use crate::error::{Error, Result, check};
use crate::ffi;
use crate::txn::Txn;
use crate::val;
use libc::{c_int, c_uint};
use std::ffi::{CStr, CString};
use std::mem::MaybeUninit;
use std::ptr;

/// Opens (or with `MDB_CREATE`, creates) a database. `None` selects the
/// unnamed main database.
///
/// # Safety
///
/// `txn` must be a live transaction.
pub unsafe fn dbi_open(txn: *mut ffi::MDB_txn, name: Option<&CStr>, flags: c_uint) -> Result<ffi::MDB_dbi> {
    let name = name.map_or(ptr::null(), CStr::as_ptr);
    let mut dbi: ffi::MDB_dbi = 0;
    check("mdb_dbi_open", unsafe { ffi::mdb_dbi_open(txn, name, flags, &mut dbi) })?;
    Ok(dbi)
}

/// # Safety
///
/// `txn` must be a live transaction and `dbi` open in its environment.
pub unsafe fn dbi_stat(txn: *mut ffi::MDB_txn, dbi: ffi::MDB_dbi) -> Result<ffi::MDB_stat> {
    let mut stat = MaybeUninit::<ffi::MDB_stat>::uninit();
    check("mdb_stat", unsafe { ffi::mdb_stat(txn, dbi, stat.as_mut_ptr()) })?;
    // SAFETY: filled in by LMDB on success.
    Ok(unsafe { stat.assume_init() })
}

/// # Safety
///
/// `txn` must be a live transaction and `dbi` open in its environment.
pub unsafe fn dbi_flags(txn: *mut ffi::MDB_txn, dbi: ffi::MDB_dbi) -> Result<c_uint> {
    let mut flags: c_uint = 0;
    check("mdb_dbi_flags", unsafe { ffi::mdb_dbi_flags(txn, dbi, &mut flags) })?;
    Ok(flags)
}

/// Releases a database handle. Never fails.
///
/// # Safety
///
/// No transaction may be using `dbi`, and it must not be used afterwards.
pub unsafe fn dbi_close(env: *mut ffi::MDB_env, dbi: ffi::MDB_dbi) {
    unsafe { ffi::mdb_dbi_close(env, dbi) }
}

/// Empties the database, or with `delete` removes it and closes the handle.
///
/// # Safety
///
/// `txn` must be a live write transaction and `dbi` open in its environment.
pub unsafe fn dbi_drop(txn: *mut ffi::MDB_txn, dbi: ffi::MDB_dbi, delete: bool) -> Result<()> {
    check("mdb_drop", unsafe { ffi::mdb_drop(txn, dbi, delete as c_int) })
}

/// Looks up `key`. A miss is reported as [`Error::NotFound`].
///
/// # Safety
///
/// `txn` must be live for `'a` and `dbi` open in its environment. The slice
/// is invalidated by the next write in `txn`.
pub unsafe fn dbi_get<'a>(txn: *mut ffi::MDB_txn, dbi: ffi::MDB_dbi, key: &[u8]) -> Result<&'a [u8]> {
    let mut key = val::from_slice(key);
    let mut data = val::empty();
    check("mdb_get", unsafe { ffi::mdb_get(txn, dbi, &mut key, &mut data) })?;
    Ok(unsafe { val::as_slice(&data) })
}

/// Stores `data` under `key`. With `MDB_NOOVERWRITE` (or `MDB_NODUPDATA`) an
/// existing entry is reported as [`Error::KeyExist`].
///
/// # Safety
///
/// `txn` must be a live write transaction and `dbi` open in its environment.
pub unsafe fn dbi_put(
    txn: *mut ffi::MDB_txn,
    dbi: ffi::MDB_dbi,
    key: &[u8],
    data: &[u8],
    flags: c_uint,
) -> Result<()> {
    let mut key = val::from_slice(key);
    let mut data = val::from_slice(data);
    check("mdb_put", unsafe { ffi::mdb_put(txn, dbi, &mut key, &mut data, flags) })
}

/// Deletes `key`, or only the `(key, data)` pair in a `MDB_DUPSORT` database.
/// A miss is reported as [`Error::NotFound`].
///
/// # Safety
///
/// `txn` must be a live write transaction and `dbi` open in its environment.
pub unsafe fn dbi_del(txn: *mut ffi::MDB_txn, dbi: ffi::MDB_dbi, key: &[u8], data: Option<&[u8]>) -> Result<()> {
    let mut key = val::from_slice(key);
    let mut data = data.map(val::from_slice);
    let data_ptr = data.as_mut().map_or(ptr::null_mut(), |d| d as *mut ffi::MDB_val);
    check("mdb_del", unsafe { ffi::mdb_del(txn, dbi, &mut key, data_ptr) })
}

/// A handle to one database inside an environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Dbi(ffi::MDB_dbi);

impl Dbi {
    pub fn open(txn: &Txn<'_>, name: Option<&str>, flags: c_uint) -> Result<Self> {
        let name = name
            .map(|n| CString::new(n).map_err(|_| Error::from_code("mdb_dbi_open", libc::EINVAL)))
            .transpose()?;
        // SAFETY: `txn` is live for the duration of the borrow.
        let dbi = unsafe { dbi_open(txn.as_ptr(), name.as_deref(), flags) }?;
        Ok(Self(dbi))
    }

    /// Opens the unnamed main database.
    pub fn main(txn: &Txn<'_>) -> Result<Self> {
        Self::open(txn, None, 0)
    }

    pub fn get<'t>(&self, txn: &'t Txn<'_>, key: &[u8]) -> Result<&'t [u8]> {
        // SAFETY: writes need `&mut Txn`, so the page cannot change while the
        // slice borrows `txn`.
        unsafe { dbi_get(txn.as_ptr(), self.0, key) }
    }

    pub fn put(&self, txn: &mut Txn<'_>, key: &[u8], data: &[u8], flags: c_uint) -> Result<()> {
        // SAFETY: exclusive borrow of a live txn; LMDB rejects read-only ones.
        unsafe { dbi_put(txn.as_ptr(), self.0, key, data, flags) }
    }

    /// Stores `data` only if `key` is not present yet.
    pub fn insert(&self, txn: &mut Txn<'_>, key: &[u8], data: &[u8]) -> Result<()> {
        self.put(txn, key, data, ffi::MDB_NOOVERWRITE)
    }

    pub fn del(&self, txn: &mut Txn<'_>, key: &[u8], data: Option<&[u8]>) -> Result<()> {
        // SAFETY: as for `put`.
        unsafe { dbi_del(txn.as_ptr(), self.0, key, data) }
    }

    pub fn stat(&self, txn: &Txn<'_>) -> Result<ffi::MDB_stat> {
        // SAFETY: live txn; the result is copied out.
        unsafe { dbi_stat(txn.as_ptr(), self.0) }
    }

    pub fn flags(&self, txn: &Txn<'_>) -> Result<c_uint> {
        // SAFETY: live txn.
        unsafe { dbi_flags(txn.as_ptr(), self.0) }
    }

    /// Removes every entry, keeping the database.
    pub fn clear(&self, txn: &mut Txn<'_>) -> Result<()> {
        // SAFETY: exclusive borrow, so no slice into the database survives.
        unsafe { dbi_drop(txn.as_ptr(), self.0, false) }
    }

    /// Deletes the database from the environment and closes the handle.
    pub fn delete(self, txn: &mut Txn<'_>) -> Result<()> {
        // SAFETY: as for `clear`; `self` is consumed with the handle.
        unsafe { dbi_drop(txn.as_ptr(), self.0, true) }
    }

    /// Releases the handle.
    ///
    /// # Safety
    ///
    /// No live transaction may still be using this handle, and no copy of it
    /// may be used afterwards.
    pub unsafe fn close(self, env: &Env) {
        // SAFETY: upheld by the caller.
        unsafe { dbi_close(env.as_ptr(), self.0) }
    }

    #[inline]
    pub(crate) fn from_raw(dbi: ffi::MDB_dbi) -> Self {
        Self(dbi)
    }

    #[inline]
    pub fn raw(&self) -> ffi::MDB_dbi {
        self.0
    }
}
