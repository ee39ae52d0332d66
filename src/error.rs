use crate::ffi;
use libc::c_int;
use std::ffi::CStr;
use std::sync::Mutex;

/// Result alias used by every fallible procedure in this crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// An LMDB failure, tagged with the primitive that reported it.
///
/// The variant is selected solely by the status code: `MDB_KEYEXIST` and
/// `MDB_NOTFOUND` get their own variants so callers can match on them as
/// recoverable conditions, and every other non-zero code lands in
/// [`Error::Other`]. All three carry the same `(origin, code)` pair and share
/// the [`code`](Error::code) / [`origin`](Error::origin) accessors.
///
/// The message is never stored: `Display` renders `"{origin}: {engine text}"`
/// into fresh storage each time it is asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// `MDB_KEYEXIST`: the key/data pair already exists.
    #[error("{origin}: {}", describe(.code))]
    KeyExist { origin: &'static str, code: c_int },
    /// `MDB_NOTFOUND`: no matching key/data pair.
    #[error("{origin}: {}", describe(.code))]
    NotFound { origin: &'static str, code: c_int },
    /// Any other non-zero status code, passed through verbatim.
    #[error("{origin}: {}", describe(.code))]
    Other { origin: &'static str, code: c_int },
}

impl Error {
    /// Classifies a non-zero status code reported by `origin`.
    ///
    /// Callers check for `MDB_SUCCESS` first; a zero code handed in here is
    /// classified like any other unknown code.
    pub fn from_code(origin: &'static str, code: c_int) -> Self {
        match code {
            ffi::MDB_KEYEXIST => Error::KeyExist { origin, code },
            ffi::MDB_NOTFOUND => Error::NotFound { origin, code },
            _ => Error::Other { origin, code },
        }
    }

    /// The raw LMDB (or system `errno`) status code.
    #[inline]
    pub fn code(&self) -> c_int {
        match *self {
            Error::KeyExist { code, .. } | Error::NotFound { code, .. } | Error::Other { code, .. } => {
                code
            }
        }
    }

    /// Name of the LMDB primitive that failed, e.g. `"mdb_env_open"`.
    #[inline]
    pub fn origin(&self) -> &'static str {
        match *self {
            Error::KeyExist { origin, .. }
            | Error::NotFound { origin, .. }
            | Error::Other { origin, .. } => origin,
        }
    }

    /// Formats the diagnostic message. Equivalent to `to_string()`.
    pub fn message(&self) -> String {
        self.to_string()
    }

    #[inline]
    pub fn is_key_exist(&self) -> bool {
        matches!(self, Error::KeyExist { .. })
    }

    #[inline]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }
}

/// Turns a status code into `Ok(())` or the classified [`Error`].
#[inline]
pub fn check(origin: &'static str, rc: c_int) -> Result<()> {
    if rc == ffi::MDB_SUCCESS {
        Ok(())
    } else {
        tracing::trace!(origin, code = rc, "lmdb call failed");
        Err(Error::from_code(origin, rc))
    }
}

// `mdb_strerror` falls back to `strerror(3)` for system codes, which may
// write into a static buffer.
static STRERROR: Mutex<()> = Mutex::new(());

/// LMDB's own text for a status code, copied out into an owned string.
pub fn strerror(code: c_int) -> String {
    let _guard = STRERROR.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    // SAFETY: mdb_strerror always returns a valid NUL-terminated string.
    unsafe {
        let text = ffi::mdb_strerror(code);
        if text.is_null() {
            return format!("unknown error {code}");
        }
        CStr::from_ptr(text).to_string_lossy().into_owned()
    }
}

fn describe(code: &c_int) -> String {
    strerror(*code)
}

/// Opt-in conversion of a miss into `None`.
///
/// The procedures in this crate report absent keys as [`Error::NotFound`];
/// call sites that treat a miss as routine say so explicitly with
/// `.optional()`.
pub trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for Result<T> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(value) => Ok(Some(value)),
            Err(Error::NotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }
}
