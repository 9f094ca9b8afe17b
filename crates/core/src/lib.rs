//! Core logic of the reading assistant: the chat controller, the credential
//! and its local store, and the random image widget.

#![deny(missing_docs)]
#![deny(clippy::missing_safety_doc)]

#[macro_use]
extern crate tracing;

mod chat;
pub mod conversation;
mod credential;
pub mod image;
mod model_client;
pub mod store;

pub use chat::{
    CANCELLED_MESSAGE, Chat, ChatBuilder, ChatState, DEFAULT_MODEL,
    DEFAULT_STARTER, DEFAULT_WELCOME_MESSAGE, EMPTY_REPLY_PLACEHOLDER,
    MISSING_CREDENTIAL_MESSAGE, Rejection, SubmitOutcome,
};
pub use credential::{API_KEY_SLOT, Credential};
