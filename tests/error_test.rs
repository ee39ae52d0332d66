use lmdb_shim::error::strerror;
use lmdb_shim::{Error, ffi};
use quickcheck::TestResult;
use quickcheck_macros::quickcheck;
use std::thread;

fn is_distinguished(code: i32) -> bool {
    code == ffi::MDB_SUCCESS || code == ffi::MDB_KEYEXIST || code == ffi::MDB_NOTFOUND
}

#[quickcheck]
fn undistinguished_codes_are_generic(code: i32) -> TestResult {
    if is_distinguished(code) {
        return TestResult::discard();
    }
    let err = Error::from_code("mdb_env_open", code);
    TestResult::from_bool(
        err == Error::Other { origin: "mdb_env_open", code }
            && err.code() == code
            && err.origin() == "mdb_env_open",
    )
}

#[quickcheck]
fn message_joins_origin_and_engine_text(code: i32) -> bool {
    let err = Error::from_code("mdb_env_sync", code);
    err.to_string() == format!("mdb_env_sync: {}", strerror(code))
}

#[test]
fn test_key_exist_is_refined_error() {
    let err = Error::from_code("mdb_put", ffi::MDB_KEYEXIST);
    assert!(matches!(err, Error::KeyExist { .. }));
    assert!(err.is_key_exist());
    assert!(!err.is_not_found());

    // still usable through the shared error surface
    let generic: &dyn std::error::Error = &err;
    assert_eq!(generic.to_string(), format!("mdb_put: {}", strerror(ffi::MDB_KEYEXIST)));
    assert_eq!(err.code(), ffi::MDB_KEYEXIST);
    assert_eq!(err.origin(), "mdb_put");
}

#[test]
fn test_not_found_is_refined_error() {
    let err = Error::from_code("mdb_get", ffi::MDB_NOTFOUND);
    assert!(matches!(err, Error::NotFound { .. }));
    assert!(err.is_not_found());
    assert!(!err.is_key_exist());

    let boxed: Box<dyn std::error::Error + Send + Sync> = Box::new(err);
    assert!(boxed.to_string().starts_with("mdb_get: "));
    assert!(boxed.to_string().contains("MDB_NOTFOUND"));
}

#[test]
fn test_concurrent_formatting_does_not_interfere() {
    let cases = [
        Error::from_code("mdb_put", ffi::MDB_KEYEXIST),
        Error::from_code("mdb_env_open", libc::ENOENT),
        Error::from_code("mdb_get", ffi::MDB_NOTFOUND),
        Error::from_code("mdb_env_sync", libc::EACCES),
    ];
    let expected: Vec<String> = cases.iter().map(|e| format!("{}: {}", e.origin(), strerror(e.code()))).collect();

    thread::scope(|s| {
        for (err, expected) in cases.iter().zip(&expected) {
            s.spawn(move || {
                for _ in 0..2_000 {
                    let first = err.to_string();
                    let second = err.message();
                    assert_eq!(&first, expected);
                    assert_eq!(&second, expected);
                }
            });
        }
    });
}

#[test]
fn test_messages_outlive_each_other() {
    // two messages from the same thread held at once
    let a = Error::from_code("mdb_env_open", libc::ENOENT).to_string();
    let b = Error::from_code("mdb_put", ffi::MDB_KEYEXIST).to_string();
    assert!(a.starts_with("mdb_env_open: "));
    assert!(b.starts_with("mdb_put: "));
    assert_ne!(a, b);
}
