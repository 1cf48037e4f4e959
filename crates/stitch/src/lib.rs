//! An out-of-the-box crochet pattern assistant that assembles the dialogue
//! core, a session store and a model provider.
//!
//! The crate includes a CLI tool for using in the terminal. And you can also
//! use it as a library to serve the dialogue from your own host apps.

#![deny(missing_docs)]

#[macro_use]
extern crate tracing;

mod config;
mod service;
pub mod store;

pub use config::{Config, ConfigError};
pub use service::{
    AdvanceResponse, ConversationSnapshot, PatternService,
    PatternServiceBuilder, ServiceError,
};
pub use store::{MemorySessionStore, SessionId, SessionRecord, SessionStore};

/// Re-exports of [`stitch_core`] crate.
pub mod core {
    pub use stitch_core::*;
}
