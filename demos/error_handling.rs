use lmdb_shim::{Dbi, Env, EnvOptions, Error, OptionalExt, Txn, ffi};

fn main() -> Result<(), Error> {
    let dir = std::env::temp_dir().join("lmdb_shim_error_handling");
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).expect("create example directory");

    // 1. Opening a directory that does not exist
    println!("Opening a missing directory:");
    {
        let mut env = Env::create()?;
        match unsafe { env.open(dir.join("missing"), 0, 0o644) } {
            Ok(()) => println!("  Unexpected success"),
            Err(e) => println!("  origin={} code={} message={}", e.origin(), e.code(), e),
        }
        // the handle survives the failure but refuses store access
        if let Err(e) = env.stat() {
            println!("  stat before a successful open: {e}");
        }
        // `env` is still closed cleanly here
    }

    let env = unsafe { EnvOptions::new().max_dbs(1).open(&dir) }?;
    let mut wtxn = Txn::begin_write(&env)?;
    let db = Dbi::open(&wtxn, Some("items"), ffi::MDB_CREATE)?;

    // 2. Uniqueness conflicts
    println!("\nInserting the same key twice:");
    db.insert(&mut wtxn, b"sku-1", b"widget")?;
    match db.insert(&mut wtxn, b"sku-1", b"gadget") {
        Err(Error::KeyExist { origin, .. }) => println!("  Key already present (from {origin})"),
        Err(e) => return Err(e),
        Ok(()) => println!("  Unexpected success"),
    }
    wtxn.commit()?;

    // 3. Key not found vs actual errors
    println!("\nLooking up keys:");
    let rtxn = Txn::begin_read(&env)?;
    match db.get(&rtxn, b"sku-2") {
        Err(Error::NotFound { .. }) => println!("  sku-2 is absent"),
        Err(e) => return Err(e),
        Ok(value) => println!("  sku-2 => {value:?}"),
    }
    let found = db.get(&rtxn, b"sku-1").optional()?;
    println!("  sku-1 => {:?}", found.map(String::from_utf8_lossy));

    drop(rtxn);
    drop(env);
    let _ = std::fs::remove_dir_all(&dir);
    Ok(())
}
