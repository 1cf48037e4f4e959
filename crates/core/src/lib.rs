//! Core logic of the crochet pattern dialogue: slot filling, step selection,
//! question rendering and pattern composition.

#![deny(missing_docs)]

#[macro_use]
extern crate tracing;

mod composer;
pub mod conversation;
pub mod extract;
mod model_client;
mod pattern;
mod question;
pub mod slot;
pub mod step;

pub use composer::{ComposeError, PatternComposer};
pub use conversation::{ConversationState, Role, Turn, greeting};
pub use extract::{extract, extract_answer};
pub use pattern::Pattern;
pub use slot::{CollectedData, Slot};
pub use step::Step;
