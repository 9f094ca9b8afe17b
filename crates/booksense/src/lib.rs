//! BookSense, a reading assistant that recommends books through the Gemini
//! API, with a random cat picture on the side.
//!
//! The crate includes a CLI tool for using in the terminal. And you can also
//! use it as a library to mount both widgets into your own host apps.

#![deny(missing_docs)]

#[allow(unused_imports)]
#[macro_use]
extern crate tracing;

mod session;

pub use session::{QUICK_PROMPTS, Session, SessionBuilder};

/// Re-exports of [`booksense_core`] crate.
pub mod core {
    pub use booksense_core::*;
}
