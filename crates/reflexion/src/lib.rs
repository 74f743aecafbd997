//! An out-of-the-box reflexion agent wired to Groq and Tavily.
//!
//! The crate includes a CLI tool for using in the terminal. It can also be
//! used as a library for the ready-made tools and records it defines.

#![deny(missing_docs)]

#[allow(unused_imports)]
#[macro_use]
extern crate tracing;

mod country;
pub mod tools;

pub use country::Country;

/// Re-exports of [`reflexion_core`] crate.
pub mod core {
    pub use reflexion_core::*;
}
