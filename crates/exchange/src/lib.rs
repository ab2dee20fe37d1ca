//! Currency conversion backed by a Frankfurter-compatible rate service.
//!
//! [`RateClient`] performs exactly one HTTP request per conversion; nothing
//! is cached or retried. [`ConvertCurrencyTool`] exposes it to the model.

#![deny(missing_docs)]

#[macro_use]
extern crate tracing;

mod client;
mod error;
mod tool;

pub use client::{Conversion, DEFAULT_BASE_URL, RateClient, RateQuote};
pub use error::{Error, ErrorKind};
pub use tool::{ConvertCurrencyTool, ConvertParameters};
