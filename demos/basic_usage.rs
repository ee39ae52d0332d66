use lmdb_shim::{Cursor, Dbi, EnvOptions, Txn, ffi};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let db_path = "/tmp/lmdb_shim_example";
    if std::path::Path::new(db_path).exists() {
        std::fs::remove_dir_all(db_path)?;
    }
    std::fs::create_dir_all(db_path)?;

    // SAFETY: the directory was just created for this program alone.
    let env = unsafe {
        EnvOptions::new()
            .map_size(10 * 1024 * 1024) // 10MB
            .max_dbs(3)
            .open(db_path)
    }?;

    // Write some data
    {
        let mut wtxn = Txn::begin_write(&env)?;
        let users = Dbi::open(&wtxn, Some("users"), ffi::MDB_CREATE)?;
        users.put(&mut wtxn, b"admin", b"Admin", 0)?;
        users.put(&mut wtxn, b"alice", b"Alice", 0)?;
        users.put(&mut wtxn, b"bob", b"Bob", 0)?;
        wtxn.commit()?;
    }

    // Read data back
    {
        let rtxn = Txn::begin_read(&env)?;
        let users = Dbi::open(&rtxn, Some("users"), 0)?;

        let admin = users.get(&rtxn, b"admin")?;
        println!("admin: {}", String::from_utf8_lossy(admin));

        let mut cursor = Cursor::open(&rtxn, users)?;
        for pair in cursor.iter() {
            let (key, value) = pair?;
            println!("  {} => {}", String::from_utf8_lossy(key), String::from_utf8_lossy(value));
        }
    }

    env.sync(true)?;
    let stat = env.stat()?;
    println!("page size {} bytes, depth {}", stat.ms_psize, stat.ms_depth);

    drop(env);
    std::fs::remove_dir_all(db_path)?;
    Ok(())
}
