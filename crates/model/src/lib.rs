//! Provider-neutral types for talking to a language model.
//!
//! The agent loop only ever sees the types defined here: a request made of
//! conversation messages and tool descriptors, and a response that is
//! polled for events. Concrete providers (Gemini, the scripted test model)
//! translate between these types and their own wire formats.
//!
//! Types in this crate don't define any behavior, they are the contract
//! that the providers and the agent agree on.

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
