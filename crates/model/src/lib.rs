//! An abstraction layer for generative-language services.
//!
//! This crate establishes a small protocol for the chat controller to talk
//! to a hosted model, so that the controller never depends on a concrete
//! service or transport. A provider turns a [`ModelRequest`] into a
//! [`ModelResponse`], which streams [`ModelResponseEvent`]s until the reply
//! is complete.
//!
//! Types in this crate don't define any behavior, instead they are the
//! constraints that the implementors should adhere to.

#![deny(missing_docs)]

mod error;
mod provider;
mod request;
mod response;

pub use error::*;
pub use provider::*;
pub use request::*;
pub use response::*;
