//! An abstraction layer for text-generation models.
//!
//! This crate establishes a small protocol for composing prompts and reading
//! streamed completions, so that the pattern composer can switch between
//! model providers without modifying the core codebase.
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
