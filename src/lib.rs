//! A thin, ownership-aware layer over the LMDB C API.
//!
//! Every procedure in [`env`], [`txn`], [`dbi`] and [`cursor`] forwards to one
//! `mdb_*` primitive and translates its integer status code into a
//! [`Result`]. Failures carry the primitive's name and the raw code; the two
//! codes applications routinely branch on get their own variants:
//!
//! - `MDB_KEYEXIST` becomes [`Error::KeyExist`]
//! - `MDB_NOTFOUND` becomes [`Error::NotFound`]
//! - anything else becomes [`Error::Other`]
//!
//! Release operations (`env_close`, `txn_abort`, `txn_reset`, `dbi_close`,
//! `cursor_close`) never fail, which is what lets [`Env`], [`Txn`] and
//! [`Cursor`] release their handles from `Drop`.
//!
//! ```no_run
//! use lmdb_shim::{Dbi, EnvOptions, Txn, ffi};
//!
//! # fn main() -> lmdb_shim::Result<()> {
//! // SAFETY: nothing else in this process has ./data open.
//! let env = unsafe { EnvOptions::new().map_size(10 * 1024 * 1024).max_dbs(4).open("./data") }?;
//!
//! let mut txn = Txn::begin_write(&env)?;
//! let dbi = Dbi::open(&txn, Some("users"), ffi::MDB_CREATE)?;
//! dbi.put(&mut txn, b"alice", b"admin", 0)?;
//! txn.commit()?;
//!
//! let txn = Txn::begin_read(&env)?;
//! assert_eq!(dbi.get(&txn, b"alice")?, b"admin");
//! # Ok(())
//! # }
//! ```

pub use lmdb_master_sys as ffi;

pub mod builder;
pub mod cursor;
pub mod dbi;
pub mod env;
pub mod error;
pub mod txn;
pub mod val;

pub use builder::EnvOptions;
pub use cursor::{Cursor, RwCursor};
pub use dbi::Dbi;
pub use env::{Env, Mode};
pub use error::{Error, OptionalExt, Result};
pub use txn::Txn;
