//! Agents built on top of the model protocol.
//!
//! The centerpiece is the [`reflexion`] loop: draft an answer, research it
//! with web searches, revise it with citations, and repeat a bounded number
//! of times. The crate also ships the building blocks it is made of
//! (structured-output [`chain`]s, the [`tool`] framework, [`search`]
//! abstraction) and two smaller agents using them: a tool-calling
//! [`react`] agent and a generate/critique [`reflection`] loop.

#![deny(missing_docs)]
#![deny(clippy::missing_safety_doc)]

#[macro_use]
extern crate tracing;

pub mod chain;
pub mod conversation;
mod error;
mod model_client;
pub mod react;
pub mod reflection;
pub mod reflexion;
pub mod schema;
pub mod search;
pub mod tool;

pub use error::{Error, ErrorKind, ProviderError};
pub use model_client::{ModelClient, ModelClientResponse};
