//! Provider-neutral protocol between the agents and hosted LLMs.
//!
//! The agents in `reflexion-core` only ever talk to a model through the
//! types defined here. A concrete provider (an OpenAI-compatible endpoint,
//! a scripted fake for tests, ...) translates these types to its own wire
//! format and streams the answer back as [`ModelResponseEvent`]s.
//!
//! This crate holds data contracts only. Retry policies, prompt rendering
//! and result decoding belong to the callers.

#![deny(missing_docs)]

mod error;
mod opaque;
mod provider;
mod request;
mod response;

pub use error::*;
pub use opaque::*;
pub use provider::*;
pub use request::*;
pub use response::*;
