//! Acquire/release behaviour of the environment procedures, including every
//! failure origin reachable from a test.

use lmdb_shim::env::{
    env_close, env_create, env_open, env_set_flags, env_set_map_size, env_set_max_dbs,
    env_set_max_readers, env_sync,
};
use lmdb_shim::{Env, Error, Result, Txn, ffi};
use std::ffi::CString;
use tempfile::TempDir;

fn c_path(dir: &std::path::Path) -> CString {
    CString::new(dir.to_str().unwrap()).unwrap()
}

#[test]
fn test_create_then_close_without_open() -> Result<()> {
    let env = env_create()?;
    unsafe { env_close(env.as_ptr()) };
    Ok(())
}

#[test]
fn test_close_after_failed_open() {
    let dir = TempDir::new().unwrap();
    let missing = c_path(&dir.path().join("missing"));

    let env = env_create().unwrap();
    let err = unsafe { env_open(env.as_ptr(), &missing, 0, 0o644) }.unwrap_err();
    assert_eq!(err.origin(), "mdb_env_open");
    unsafe { env_close(env.as_ptr()) };
}

#[test]
fn test_full_procedural_sequence() -> Result<()> {
    let dir = TempDir::new().unwrap();
    let path = c_path(dir.path());

    let env = env_create()?.as_ptr();
    unsafe {
        env_set_map_size(env, 4 * 1024 * 1024)?;
        env_set_max_readers(env, 32)?;
        env_set_max_dbs(env, 8)?;
        env_open(env, &path, 0, 0o644)?;
        env_set_flags(env, ffi::MDB_NOMETASYNC, true)?;
        env_sync(env, true)?;
        env_close(env);
    }
    Ok(())
}

#[test]
fn test_set_flags_origin() {
    let env = Env::create().unwrap();
    // MDB_RDONLY can only be given to mdb_env_open.
    let err = env.set_flags(ffi::MDB_RDONLY, true).unwrap_err();
    assert_eq!(err, Error::Other { origin: "mdb_env_set_flags", code: libc::EINVAL });
}

#[test]
fn test_set_map_size_origin() {
    let dir = TempDir::new().unwrap();
    let mut env = Env::create().unwrap();
    unsafe { env.open(dir.path(), 0, 0o644) }.unwrap();

    // resizing is refused while a write transaction is active; the safe
    // method cannot be reached with one alive, so go through the procedure
    let txn = Txn::begin_write(&env).unwrap();
    let err = unsafe { env_set_map_size(env.as_ptr(), 64 * 1024 * 1024) }.unwrap_err();
    assert_eq!(err, Error::Other { origin: "mdb_env_set_mapsize", code: libc::EINVAL });
    txn.abort();

    env.set_map_size(64 * 1024 * 1024).unwrap();
}

#[test]
fn test_limits_are_fixed_after_open() {
    let dir = TempDir::new().unwrap();
    let mut env = Env::create().unwrap();
    unsafe { env.open(dir.path(), 0, 0o644) }.unwrap();

    let err = env.set_max_readers(64).unwrap_err();
    assert_eq!(err, Error::Other { origin: "mdb_env_set_maxreaders", code: libc::EINVAL });

    let err = env.set_max_dbs(4).unwrap_err();
    assert_eq!(err, Error::Other { origin: "mdb_env_set_maxdbs", code: libc::EINVAL });
}

#[test]
fn test_sync_origin_on_read_only_env() {
    let dir = TempDir::new().unwrap();
    {
        // a read-only open needs an existing store
        let mut env = Env::create().unwrap();
        unsafe { env.open(dir.path(), 0, 0o644) }.unwrap();
    }

    let mut env = Env::create().unwrap();
    unsafe { env.open(dir.path(), ffi::MDB_RDONLY, 0o644) }.unwrap();
    let err = env.sync(true).unwrap_err();
    assert_eq!(err, Error::Other { origin: "mdb_env_sync", code: libc::EACCES });
}

#[test]
fn test_open_origin_for_bad_path() {
    let dir = TempDir::new().unwrap();
    let mut env = Env::create().unwrap();
    let err = unsafe { env.open(dir.path().join("a/b/c"), 0, 0o644) }.unwrap_err();
    assert_eq!(err, Error::Other { origin: "mdb_env_open", code: libc::ENOENT });
    assert!(err.to_string().starts_with("mdb_env_open: "));
}

#[test]
fn test_handle_usable_after_failed_configuration() -> Result<()> {
    let dir = TempDir::new().unwrap();
    let mut env = Env::create()?;
    assert!(env.set_max_readers(0).is_err());
    env.set_max_readers(4)?;
    unsafe { env.open(dir.path(), 0, 0o644) }?;
    assert_eq!(env.max_readers()?, 4);
    Ok(())
}

#[test]
fn test_store_access_needs_successful_open() {
    let dir = TempDir::new().unwrap();
    let einval = |origin| Error::Other { origin, code: libc::EINVAL };

    let mut env = Env::create().unwrap();
    assert_eq!(env.stat().unwrap_err(), einval("mdb_env_stat"));
    assert_eq!(Txn::begin_read(&env).unwrap_err(), einval("mdb_txn_begin"));

    assert!(unsafe { env.open(dir.path().join("missing"), 0, 0o644) }.is_err());
    assert_eq!(env.info().unwrap_err(), einval("mdb_env_info"));
    assert_eq!(Txn::begin_write(&env).unwrap_err(), einval("mdb_txn_begin"));
}
