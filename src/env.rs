//! Environment procedures and the owned [`Env`] handle.
//!
//! Each `env_*` function forwards to exactly one LMDB primitive and turns its
//! status code into a [`Result`]. They take raw `MDB_env` pointers and are
//! `unsafe`: the caller vouches that the handle is live and was produced by
//! [`env_create`]. [`Env`] owns such a handle and releases it on drop.

use crate::error::{Error, Result, check};
use crate::ffi;
use libc::{c_char, c_int, c_uint};
use std::ffi::{CStr, CString};
use std::mem::MaybeUninit;
use std::path::{Path, PathBuf};
use std::ptr::{self, NonNull};

/// Unix permission bits for the data and lock files.
pub type Mode = ffi::mdb_mode_t;

/// Creates an unopened environment handle.
pub fn env_create() -> Result<NonNull<ffi::MDB_env>> {
    let mut env: *mut ffi::MDB_env = ptr::null_mut();
    // SAFETY: `env` is a valid out-slot; LMDB only writes it on success.
    check("mdb_env_create", unsafe { ffi::mdb_env_create(&mut env) })?;
    NonNull::new(env).ok_or_else(|| Error::from_code("mdb_env_create", libc::ENOMEM))
}

/// Opens the store at `path`.
///
/// # Safety
///
/// `env` must be a live handle from [`env_create`] that has not been opened.
pub unsafe fn env_open(env: *mut ffi::MDB_env, path: &CStr, flags: c_uint, mode: Mode) -> Result<()> {
    check("mdb_env_open", unsafe { ffi::mdb_env_open(env, path.as_ptr(), flags, mode) })
}

/// Releases every resource held by `env`. Never fails.
///
/// # Safety
///
/// `env` must be live and must not be used again afterwards, including by a
/// second close.
pub unsafe fn env_close(env: *mut ffi::MDB_env) {
    unsafe { ffi::mdb_env_close(env) }
}

/// Sets (`onoff == true`) or clears the runtime flags in `flags`.
///
/// # Safety
///
/// `env` must be a live handle.
pub unsafe fn env_set_flags(env: *mut ffi::MDB_env, flags: c_uint, onoff: bool) -> Result<()> {
    check("mdb_env_set_flags", unsafe {
        ffi::mdb_env_set_flags(env, flags, onoff as c_int)
    })
}

/// # Safety
///
/// `env` must be a live handle with no active transactions.
pub unsafe fn env_set_map_size(env: *mut ffi::MDB_env, size: usize) -> Result<()> {
    check("mdb_env_set_mapsize", unsafe { ffi::mdb_env_set_mapsize(env, size as _) })
}

/// # Safety
///
/// `env` must be a live, unopened handle.
pub unsafe fn env_set_max_readers(env: *mut ffi::MDB_env, count: c_uint) -> Result<()> {
    check("mdb_env_set_maxreaders", unsafe { ffi::mdb_env_set_maxreaders(env, count) })
}

/// # Safety
///
/// `env` must be a live, unopened handle.
pub unsafe fn env_set_max_dbs(env: *mut ffi::MDB_env, count: ffi::MDB_dbi) -> Result<()> {
    check("mdb_env_set_maxdbs", unsafe { ffi::mdb_env_set_maxdbs(env, count) })
}

/// Flushes buffered writes. With `force` the flush is synchronous even when
/// the environment was opened with `MDB_NOSYNC` or `MDB_MAPASYNC`.
///
/// # Safety
///
/// `env` must be a live, opened handle.
pub unsafe fn env_sync(env: *mut ffi::MDB_env, force: bool) -> Result<()> {
    check("mdb_env_sync", unsafe { ffi::mdb_env_sync(env, force as c_int) })
}

/// Writes a consistent copy of the environment into the directory `path`.
///
/// # Safety
///
/// `env` must be a live, opened handle.
pub unsafe fn env_copy(env: *mut ffi::MDB_env, path: &CStr) -> Result<()> {
    check("mdb_env_copy", unsafe { ffi::mdb_env_copy(env, path.as_ptr()) })
}

/// Like [`env_copy`], with `MDB_CP_COMPACT` available in `flags`.
///
/// # Safety
///
/// `env` must be a live, opened handle.
pub unsafe fn env_copy2(env: *mut ffi::MDB_env, path: &CStr, flags: c_uint) -> Result<()> {
    check("mdb_env_copy2", unsafe { ffi::mdb_env_copy2(env, path.as_ptr(), flags) })
}

/// # Safety
///
/// `env` must be a live, opened handle.
pub unsafe fn env_stat(env: *mut ffi::MDB_env) -> Result<ffi::MDB_stat> {
    let mut stat = MaybeUninit::<ffi::MDB_stat>::uninit();
    check("mdb_env_stat", unsafe { ffi::mdb_env_stat(env, stat.as_mut_ptr()) })?;
    // SAFETY: filled in by LMDB on success.
    Ok(unsafe { stat.assume_init() })
}

/// # Safety
///
/// `env` must be a live, opened handle.
pub unsafe fn env_info(env: *mut ffi::MDB_env) -> Result<ffi::MDB_envinfo> {
    let mut info = MaybeUninit::<ffi::MDB_envinfo>::uninit();
    check("mdb_env_info", unsafe { ffi::mdb_env_info(env, info.as_mut_ptr()) })?;
    // SAFETY: filled in by LMDB on success.
    Ok(unsafe { info.assume_init() })
}

/// # Safety
///
/// `env` must be a live handle.
pub unsafe fn env_get_flags(env: *mut ffi::MDB_env) -> Result<c_uint> {
    let mut flags: c_uint = 0;
    check("mdb_env_get_flags", unsafe { ffi::mdb_env_get_flags(env, &mut flags) })?;
    Ok(flags)
}

/// Returns the path the environment was opened with.
///
/// # Safety
///
/// `env` must be a live, opened handle; the returned string borrows from it.
pub unsafe fn env_get_path<'a>(env: *mut ffi::MDB_env) -> Result<&'a CStr> {
    let mut path: *const c_char = ptr::null();
    check("mdb_env_get_path", unsafe { ffi::mdb_env_get_path(env, &mut path) })?;
    if path.is_null() {
        return Err(Error::from_code("mdb_env_get_path", libc::EINVAL));
    }
    // SAFETY: LMDB hands back the NUL-terminated path it stores for `env`.
    Ok(unsafe { CStr::from_ptr(path) })
}

/// # Safety
///
/// `env` must be a live handle.
pub unsafe fn env_get_max_readers(env: *mut ffi::MDB_env) -> Result<c_uint> {
    let mut count: c_uint = 0;
    check("mdb_env_get_maxreaders", unsafe { ffi::mdb_env_get_maxreaders(env, &mut count) })?;
    Ok(count)
}

/// Largest key (and `MDB_DUPSORT` data item) the environment accepts.
///
/// # Safety
///
/// `env` must be a live handle.
pub unsafe fn env_get_max_key_size(env: *mut ffi::MDB_env) -> usize {
    unsafe { ffi::mdb_env_get_maxkeysize(env) as usize }
}

/// Clears reader slots left behind by dead processes and returns how many.
///
/// # Safety
///
/// `env` must be a live, opened handle.
pub unsafe fn env_reader_check(env: *mut ffi::MDB_env) -> Result<usize> {
    let mut dead: c_int = 0;
    check("mdb_reader_check", unsafe { ffi::mdb_reader_check(env, &mut dead) })?;
    Ok(dead as usize)
}

pub(crate) fn path_to_cstring(origin: &'static str, path: &Path) -> Result<CString> {
    #[cfg(unix)]
    let bytes = {
        use std::os::unix::ffi::OsStrExt;
        path.as_os_str().as_bytes().to_vec()
    };
    #[cfg(not(unix))]
    let bytes = match path.to_str() {
        Some(s) => s.as_bytes().to_vec(),
        None => return Err(Error::from_code(origin, libc::EINVAL)),
    };
    CString::new(bytes).map_err(|_| Error::from_code(origin, libc::EINVAL))
}

/// An owned LMDB environment.
///
/// Dropping an `Env` always closes the underlying handle, whether or not
/// [`open`](Env::open) ever succeeded. Until an open succeeds only the
/// configuration setters and flag queries reach LMDB; everything that needs a
/// mapped store reports `EINVAL` under its own origin instead.
#[derive(Debug)]
pub struct Env {
    raw: NonNull<ffi::MDB_env>,
    opened: bool,
}

// LMDB environments may be shared between threads.
unsafe impl Send for Env {}
unsafe impl Sync for Env {}

impl Env {
    /// Creates an unopened environment. Configure it, then call [`open`](Env::open).
    pub fn create() -> Result<Self> {
        Ok(Self {
            raw: env_create()?,
            opened: false,
        })
    }

    /// Opens the store at `path`.
    ///
    /// A failed open leaves the handle unopened; it can still be configured,
    /// retried or dropped.
    ///
    /// # Safety
    ///
    /// LMDB must not have the same store open elsewhere in this process: two
    /// environments on one path defeat its locking.
    pub unsafe fn open(&mut self, path: impl AsRef<Path>, flags: c_uint, mode: Mode) -> Result<()> {
        let path = path.as_ref();
        let c_path = path_to_cstring("mdb_env_open", path)?;
        // SAFETY: `self.raw` is live for as long as `self`.
        unsafe { env_open(self.as_ptr(), &c_path, flags, mode) }?;
        self.opened = true;
        tracing::debug!(path = %path.display(), flags, "opened lmdb environment");
        Ok(())
    }

    #[inline]
    pub fn is_open(&self) -> bool {
        self.opened
    }

    pub(crate) fn ensure_open(&self, origin: &'static str) -> Result<()> {
        if self.opened {
            Ok(())
        } else {
            Err(Error::from_code(origin, libc::EINVAL))
        }
    }

    pub fn set_flags(&self, flags: c_uint, onoff: bool) -> Result<()> {
        // SAFETY: the handle is live; flags may change before and after open.
        unsafe { env_set_flags(self.as_ptr(), flags, onoff) }
    }

    /// Resizes the memory map.
    ///
    /// LMDB remaps the store on resize, so no transaction may be alive; the
    /// exclusive borrow rules that out because every [`Txn`](crate::Txn)
    /// borrows its `Env`.
    ///
    /// ```compile_fail
    /// # use lmdb_shim::{Env, Txn};
    /// # fn resize(env: &mut Env) -> lmdb_shim::Result<()> {
    /// let txn = Txn::begin_read(env)?;
    /// env.set_map_size(1 << 30)?;
    /// drop(txn);
    /// # Ok(())
    /// # }
    /// ```
    pub fn set_map_size(&mut self, size: usize) -> Result<()> {
        // SAFETY: `&mut self` guarantees no transaction borrows this env.
        unsafe { env_set_map_size(self.as_ptr(), size) }
    }

    pub fn set_max_readers(&self, count: u32) -> Result<()> {
        // SAFETY: live handle; LMDB itself rejects the call once opened.
        unsafe { env_set_max_readers(self.as_ptr(), count as c_uint) }
    }

    pub fn set_max_dbs(&self, count: u32) -> Result<()> {
        // SAFETY: live handle; LMDB itself rejects the call once opened.
        unsafe { env_set_max_dbs(self.as_ptr(), count as ffi::MDB_dbi) }
    }

    pub fn sync(&self, force: bool) -> Result<()> {
        self.ensure_open("mdb_env_sync")?;
        // SAFETY: opened above.
        unsafe { env_sync(self.as_ptr(), force) }
    }

    /// Copies the environment into the existing, empty directory `path`.
    pub fn copy_to(&self, path: impl AsRef<Path>, compact: bool) -> Result<()> {
        self.ensure_open("mdb_env_copy2")?;
        let c_path = path_to_cstring("mdb_env_copy2", path.as_ref())?;
        let flags = if compact { ffi::MDB_CP_COMPACT } else { 0 };
        // SAFETY: opened above.
        unsafe { env_copy2(self.as_ptr(), &c_path, flags) }
    }

    pub fn stat(&self) -> Result<ffi::MDB_stat> {
        self.ensure_open("mdb_env_stat")?;
        // SAFETY: opened above, so the meta pages are mapped.
        unsafe { env_stat(self.as_ptr()) }
    }

    pub fn info(&self) -> Result<ffi::MDB_envinfo> {
        self.ensure_open("mdb_env_info")?;
        // SAFETY: opened above, so the meta pages are mapped.
        unsafe { env_info(self.as_ptr()) }
    }

    pub fn flags(&self) -> Result<c_uint> {
        // SAFETY: reads a field of the live handle.
        unsafe { env_get_flags(self.as_ptr()) }
    }

    pub fn path(&self) -> Result<PathBuf> {
        self.ensure_open("mdb_env_get_path")?;
        // SAFETY: opened above; the path is copied before `self` can go away.
        let path = unsafe { env_get_path(self.as_ptr()) }?;
        Ok(PathBuf::from(path.to_string_lossy().into_owned()))
    }

    pub fn max_readers(&self) -> Result<u32> {
        // SAFETY: reads a field of the live handle.
        unsafe { env_get_max_readers(self.as_ptr()) }.map(|n| n as u32)
    }

    pub fn max_key_size(&self) -> usize {
        // SAFETY: reads a compile-time limit through the live handle.
        unsafe { env_get_max_key_size(self.as_ptr()) }
    }

    pub fn reader_check(&self) -> Result<usize> {
        self.ensure_open("mdb_reader_check")?;
        // SAFETY: opened above.
        unsafe { env_reader_check(self.as_ptr()) }
    }

    #[inline]
    pub fn as_ptr(&self) -> *mut ffi::MDB_env {
        self.raw.as_ptr()
    }
}

impl Drop for Env {
    fn drop(&mut self) {
        // SAFETY: `raw` came from env_create and is closed exactly once here.
        unsafe { env_close(self.as_ptr()) };
        tracing::debug!("closed lmdb environment");
    }
}
