//! Logging shim.
//!
//! With the `tracing-integration` feature the macros forward to `tracing`.
//! Without it they expand to nothing, so call sites never need their own
//! `cfg` attributes.

#[cfg(feature = "tracing-integration")]
pub(crate) use tracing::{debug, error, trace};

#[cfg(not(feature = "tracing-integration"))]
mod noop {
    macro_rules! trace {
        ($($arg:tt)*) => {};
    }

    macro_rules! debug {
        ($($arg:tt)*) => {};
    }

    macro_rules! error {
        ($($arg:tt)*) => {};
    }

    pub(crate) use {debug, error, trace};
}

#[cfg(not(feature = "tracing-integration"))]
pub(crate) use noop::{debug, error, trace};
