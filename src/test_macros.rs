//! Assertions shared by the unit tests

/// Unwrap an `Ok`, or fail the test with the error
macro_rules! not_err {
    ($e:expr) => {
        match $e {
            Ok(value) => value,
            Err(e) => panic!("{} failed with {:?}", stringify!($e), e),
        }
    };
}

/// Unwrap an `Err`, or fail the test with the value
macro_rules! is_err {
    ($e:expr) => {
        match $e {
            Ok(value) => panic!(
                "{} did not return with an error, but with {:?}",
                stringify!($e),
                value
            ),
            Err(e) => e,
        }
    };
}

macro_rules! assert_matches {
    ($e:expr, $p:pat) => {
        assert_matches!($e, $p, ())
    };
    ($e:expr, $p:pat, $f:expr) => {
        match $e {
            $p => $f,
            other => panic!(
                "{}: Expected pattern {} \ndoes not match {:?}",
                stringify!($e),
                stringify!($p),
                other
            ),
        }
    };
}

/// A denied outcome writes `Vary` and nothing else
macro_rules! assert_only_vary {
    ($outcome:expr) => {
        let outcome = &$outcome;
        assert!(!outcome.is_allowed(), "{:?} is allowed", outcome);
        let names: Vec<&str> = outcome.headers().iter().map(|h| h.name).collect();
        assert_eq!(names, vec![crate::headers::VARY], "{:?}", outcome);
    };
}
