use crate::env::{Env, Mode};
use crate::error::Result;
use libc::c_uint;
use std::path::Path;

/// Builder for opening an [`Env`].
///
/// Nothing is sent to LMDB until [`open`](EnvOptions::open): settings that are
/// left unset keep the engine's defaults.
#[derive(Debug, Clone)]
pub struct EnvOptions {
    map_size: Option<usize>,
    max_readers: Option<u32>,
    max_dbs: Option<u32>,
    flags: c_uint,
    mode: Mode,
}

impl Default for EnvOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl EnvOptions {
    pub fn new() -> Self {
        Self {
            map_size: None,
            max_readers: None,
            max_dbs: None,
            flags: 0,
            mode: 0o644,
        }
    }

    /// Maximum size of the memory map, and so of the store, in bytes.
    pub fn map_size(&mut self, size: usize) -> &mut Self {
        self.map_size = Some(size);
        self
    }

    pub fn max_readers(&mut self, count: u32) -> &mut Self {
        self.max_readers = Some(count);
        self
    }

    /// Number of named databases the environment may hold.
    pub fn max_dbs(&mut self, count: u32) -> &mut Self {
        self.max_dbs = Some(count);
        self
    }

    /// `MDB_*` environment flags passed to `mdb_env_open`.
    pub fn flags(&mut self, flags: c_uint) -> &mut Self {
        self.flags = flags;
        self
    }

    /// Permission bits for newly created data and lock files.
    pub fn mode(&mut self, mode: Mode) -> &mut Self {
        self.mode = mode;
        self
    }

    /// Creates, configures and opens an environment at `path`.
    ///
    /// If any step fails the half-built environment is closed before the
    /// error is returned.
    ///
    /// # Safety
    ///
    /// Same contract as [`Env::open`]: the store must not already be open in
    /// this process.
    pub unsafe fn open(&self, path: impl AsRef<Path>) -> Result<Env> {
        let mut env = Env::create()?;
        if let Some(size) = self.map_size {
            env.set_map_size(size)?;
        }
        if let Some(count) = self.max_readers {
            env.set_max_readers(count)?;
        }
        if let Some(count) = self.max_dbs {
            env.set_max_dbs(count)?;
        }
        // SAFETY: forwarded to the caller.
        unsafe { env.open(path, self.flags, self.mode) }?;
        Ok(env)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ffi;
    use tempfile::TempDir;

    #[test]
    fn test_open_with_settings() -> Result<()> {
        let dir = TempDir::new().unwrap();
        let env = unsafe {
            EnvOptions::new()
                .map_size(1 << 20)
                .max_readers(8)
                .max_dbs(2)
                .flags(ffi::MDB_NOSYNC)
                .open(dir.path())
        }?;

        assert_eq!(env.info()?.me_mapsize as usize, 1 << 20);
        assert_eq!(env.max_readers()?, 8);
        assert_ne!(env.flags()? & ffi::MDB_NOSYNC, 0);
        Ok(())
    }

    #[test]
    fn test_failed_open_reports_origin() {
        let dir = TempDir::new().unwrap();
        let err = unsafe { EnvOptions::new().open(dir.path().join("missing")) }.unwrap_err();
        assert_eq!(err.origin(), "mdb_env_open");
    }

    #[test]
    fn test_failed_configuration_reports_origin() {
        let dir = TempDir::new().unwrap();
        // LMDB rejects a reader limit of zero.
        let err = unsafe { EnvOptions::new().max_readers(0).open(dir.path()) }.unwrap_err();
        assert_eq!(err.origin(), "mdb_env_set_maxreaders");
        assert_eq!(err.code(), libc::EINVAL);
    }
}
