//! Cursor procedures and the scoped [`Cursor`] handle.

use crate::dbi::Dbi;
use crate::error::{Error, Result, check};
use crate::ffi;
use crate::txn::Txn;
use crate::val;
use libc::c_uint;
use std::marker::PhantomData;
use std::ptr::{self, NonNull};

/// # Safety
///
/// `txn` must be a live transaction and `dbi` open in its environment.
pub unsafe fn cursor_open(txn: *mut ffi::MDB_txn, dbi: ffi::MDB_dbi) -> Result<NonNull<ffi::MDB_cursor>> {
    let mut cursor: *mut ffi::MDB_cursor = ptr::null_mut();
    check("mdb_cursor_open", unsafe { ffi::mdb_cursor_open(txn, dbi, &mut cursor) })?;
    NonNull::new(cursor).ok_or_else(|| Error::from_code("mdb_cursor_open", libc::ENOMEM))
}

/// Frees the cursor. Never fails.
///
/// # Safety
///
/// `cursor` must be live and must not be used again afterwards.
pub unsafe fn cursor_close(cursor: *mut ffi::MDB_cursor) {
    unsafe { ffi::mdb_cursor_close(cursor) }
}

/// Rebinds a read-only cursor to a new read-only transaction.
///
/// # Safety
///
/// Both handles must be live and `txn` read-only.
pub unsafe fn cursor_renew(txn: *mut ffi::MDB_txn, cursor: *mut ffi::MDB_cursor) -> Result<()> {
    check("mdb_cursor_renew", unsafe { ffi::mdb_cursor_renew(txn, cursor) })
}

/// # Safety
///
/// `cursor` must be live.
pub unsafe fn cursor_txn(cursor: *mut ffi::MDB_cursor) -> *mut ffi::MDB_txn {
    unsafe { ffi::mdb_cursor_txn(cursor) }
}

/// # Safety
///
/// `cursor` must be live.
pub unsafe fn cursor_dbi(cursor: *mut ffi::MDB_cursor) -> ffi::MDB_dbi {
    unsafe { ffi::mdb_cursor_dbi(cursor) }
}

/// Positions the cursor according to `op` and returns the pair under it.
/// Running off either end is reported as [`Error::NotFound`].
///
/// # Safety
///
/// `cursor` must be live and its transaction must outlive `'a`. For ops that
/// leave the key untouched (`MDB_SET`, `MDB_GET_CURRENT` on some databases)
/// the returned key is the input slice, hence the shared lifetime.
pub unsafe fn cursor_get<'a>(
    cursor: *mut ffi::MDB_cursor,
    key: Option<&'a [u8]>,
    data: Option<&'a [u8]>,
    op: ffi::MDB_cursor_op,
) -> Result<(&'a [u8], &'a [u8])> {
    let mut key = key.map_or_else(val::empty, val::from_slice);
    let mut data = data.map_or_else(val::empty, val::from_slice);
    check("mdb_cursor_get", unsafe { ffi::mdb_cursor_get(cursor, &mut key, &mut data, op) })?;
    Ok(unsafe { (val::as_slice(&key), val::as_slice(&data)) })
}

/// # Safety
///
/// `cursor` must be live and belong to a write transaction.
pub unsafe fn cursor_put(cursor: *mut ffi::MDB_cursor, key: &[u8], data: &[u8], flags: c_uint) -> Result<()> {
    let mut key = val::from_slice(key);
    let mut data = val::from_slice(data);
    check("mdb_cursor_put", unsafe { ffi::mdb_cursor_put(cursor, &mut key, &mut data, flags) })
}

/// Deletes the pair under the cursor, or every duplicate with `MDB_NODUPDATA`.
///
/// # Safety
///
/// `cursor` must be live, positioned, and belong to a write transaction.
pub unsafe fn cursor_del(cursor: *mut ffi::MDB_cursor, flags: c_uint) -> Result<()> {
    check("mdb_cursor_del", unsafe { ffi::mdb_cursor_del(cursor, flags) })
}

/// Number of duplicates for the current key (`MDB_DUPSORT` only).
///
/// # Safety
///
/// `cursor` must be live and positioned.
pub unsafe fn cursor_count(cursor: *mut ffi::MDB_cursor) -> Result<usize> {
    let mut count = 0;
    check("mdb_cursor_count", unsafe { ffi::mdb_cursor_count(cursor, &mut count) })?;
    Ok(count as usize)
}

/// A read cursor over one database, closed on drop.
///
/// It has no write methods, so the transaction it borrows cannot change while
/// it lives and the pairs it returns stay valid for the transaction's
/// lifetime. Writing through a cursor takes an [`RwCursor`].
#[derive(Debug)]
pub struct Cursor<'txn> {
    raw: NonNull<ffi::MDB_cursor>,
    _txn: PhantomData<&'txn ()>,
}

impl<'txn> Cursor<'txn> {
    pub fn open(txn: &'txn Txn<'_>, dbi: Dbi) -> Result<Self> {
        // SAFETY: `txn` is live for `'txn`, which the cursor cannot outlive.
        let raw = unsafe { cursor_open(txn.as_ptr(), dbi.raw()) }?;
        Ok(Self {
            raw,
            _txn: PhantomData,
        })
    }

    pub fn get(&mut self, key: Option<&'txn [u8]>, op: ffi::MDB_cursor_op) -> Result<(&'txn [u8], &'txn [u8])> {
        // SAFETY: nothing can write to the transaction while it is shared with
        // this cursor, so the returned pages stay put for `'txn`.
        unsafe { cursor_get(self.as_ptr(), key, None, op) }
    }

    pub fn first(&mut self) -> Result<(&'txn [u8], &'txn [u8])> {
        self.get(None, ffi::MDB_FIRST)
    }

    pub fn last(&mut self) -> Result<(&'txn [u8], &'txn [u8])> {
        self.get(None, ffi::MDB_LAST)
    }

    pub fn next(&mut self) -> Result<(&'txn [u8], &'txn [u8])> {
        self.get(None, ffi::MDB_NEXT)
    }

    pub fn prev(&mut self) -> Result<(&'txn [u8], &'txn [u8])> {
        self.get(None, ffi::MDB_PREV)
    }

    /// Positions at the first key greater than or equal to `key`.
    pub fn seek(&mut self, key: &'txn [u8]) -> Result<(&'txn [u8], &'txn [u8])> {
        self.get(Some(key), ffi::MDB_SET_RANGE)
    }

    pub fn count(&self) -> Result<usize> {
        // SAFETY: live cursor; LMDB checks that it is positioned.
        unsafe { cursor_count(self.as_ptr()) }
    }

    /// Rebinds the cursor to another read-only transaction.
    pub fn renew(&mut self, txn: &'txn Txn<'_>) -> Result<()> {
        // SAFETY: both handles are live for `'txn`; LMDB rejects write txns.
        unsafe { cursor_renew(txn.as_ptr(), self.as_ptr()) }
    }

    pub fn dbi(&self) -> Dbi {
        // SAFETY: live cursor.
        Dbi::from_raw(unsafe { cursor_dbi(self.as_ptr()) })
    }

    /// Walks the database from the first key onwards.
    pub fn iter(&mut self) -> Iter<'_, 'txn> {
        Iter {
            cursor: self,
            op: ffi::MDB_FIRST,
            pending: None,
            done: false,
        }
    }

    /// Walks the database from the first key `>= key` onwards.
    ///
    /// A failed seek other than `MDB_NOTFOUND` is the iterator's first item.
    pub fn iter_from(&mut self, key: &'txn [u8]) -> Iter<'_, 'txn> {
        let mut iter = self.iter();
        match iter.cursor.seek(key) {
            Ok(_) => iter.op = ffi::MDB_GET_CURRENT,
            Err(Error::NotFound { .. }) => iter.done = true,
            Err(e) => iter.pending = Some(e),
        }
        iter
    }

    #[inline]
    pub fn as_ptr(&self) -> *mut ffi::MDB_cursor {
        self.raw.as_ptr()
    }
}

impl Drop for Cursor<'_> {
    fn drop(&mut self) {
        // SAFETY: closed exactly once, before the transaction ends.
        unsafe { cursor_close(self.as_ptr()) }
    }
}

/// Iterator over key/data pairs, ending at `MDB_NOTFOUND`.
///
/// Any other error is yielded once and ends the iteration.
pub struct Iter<'c, 'txn> {
    cursor: &'c mut Cursor<'txn>,
    op: ffi::MDB_cursor_op,
    pending: Option<Error>,
    done: bool,
}

impl<'txn> Iterator for Iter<'_, 'txn> {
    type Item = Result<(&'txn [u8], &'txn [u8])>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(e) = self.pending.take() {
            self.done = true;
            return Some(Err(e));
        }
        if self.done {
            return None;
        }
        let item = self.cursor.get(None, self.op);
        self.op = ffi::MDB_NEXT;
        match item {
            Ok(pair) => Some(Ok(pair)),
            Err(Error::NotFound { .. }) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// A cursor that may write, holding its transaction exclusively.
///
/// Writes through the cursor can move or free the pages earlier reads pointed
/// into, so every pair it returns borrows the cursor and must be dropped
/// before the next [`put`](RwCursor::put) or [`del`](RwCursor::del).
///
/// ```compile_fail
/// # use lmdb_shim::{Dbi, RwCursor, Txn};
/// # fn overwrite(txn: &mut Txn<'_>, dbi: Dbi) -> lmdb_shim::Result<()> {
/// let mut cursor = RwCursor::open(txn, dbi)?;
/// let (_, data) = cursor.first()?;
/// cursor.put(b"a", b"new", 0)?;
/// assert_eq!(data, b"old");
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct RwCursor<'txn> {
    raw: NonNull<ffi::MDB_cursor>,
    _txn: PhantomData<&'txn mut ()>,
}

impl<'txn> RwCursor<'txn> {
    pub fn open(txn: &'txn mut Txn<'_>, dbi: Dbi) -> Result<Self> {
        // SAFETY: `txn` is live and exclusively borrowed for `'txn`.
        let raw = unsafe { cursor_open(txn.as_ptr(), dbi.raw()) }?;
        Ok(Self {
            raw,
            _txn: PhantomData,
        })
    }

    pub fn get<'c>(&'c mut self, key: Option<&'c [u8]>, op: ffi::MDB_cursor_op) -> Result<(&'c [u8], &'c [u8])> {
        // SAFETY: the pair borrows the cursor, so no write can happen while it
        // is alive.
        unsafe { cursor_get(self.as_ptr(), key, None, op) }
    }

    pub fn first(&mut self) -> Result<(&[u8], &[u8])> {
        self.get(None, ffi::MDB_FIRST)
    }

    pub fn last(&mut self) -> Result<(&[u8], &[u8])> {
        self.get(None, ffi::MDB_LAST)
    }

    pub fn next(&mut self) -> Result<(&[u8], &[u8])> {
        self.get(None, ffi::MDB_NEXT)
    }

    pub fn prev(&mut self) -> Result<(&[u8], &[u8])> {
        self.get(None, ffi::MDB_PREV)
    }

    /// Positions at the first key greater than or equal to `key`.
    pub fn seek<'c>(&'c mut self, key: &'c [u8]) -> Result<(&'c [u8], &'c [u8])> {
        self.get(Some(key), ffi::MDB_SET_RANGE)
    }

    pub fn put(&mut self, key: &[u8], data: &[u8], flags: c_uint) -> Result<()> {
        // SAFETY: the cursor belongs to a write transaction it holds exclusively.
        unsafe { cursor_put(self.as_ptr(), key, data, flags) }
    }

    /// Deletes the pair under the cursor.
    pub fn del(&mut self, flags: c_uint) -> Result<()> {
        // SAFETY: as for `put`; LMDB checks that the cursor is positioned.
        unsafe { cursor_del(self.as_ptr(), flags) }
    }

    pub fn count(&self) -> Result<usize> {
        // SAFETY: live cursor; LMDB checks that it is positioned.
        unsafe { cursor_count(self.as_ptr()) }
    }

    pub fn dbi(&self) -> Dbi {
        // SAFETY: live cursor.
        Dbi::from_raw(unsafe { cursor_dbi(self.as_ptr()) })
    }

    #[inline]
    pub fn as_ptr(&self) -> *mut ffi::MDB_cursor {
        self.raw.as_ptr()
    }
}

impl Drop for RwCursor<'_> {
    fn drop(&mut self) {
        // SAFETY: closed exactly once, before the transaction ends.
        unsafe { cursor_close(self.as_ptr()) }
    }
}
