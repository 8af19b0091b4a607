//! CODESTORM generation pipeline: prompt building, model invocation with a
//! quota fallback chain, code extraction, multi-agent code correction and a
//! coordinator that drives design and code generation.

pub mod analysis;
pub mod config;
pub mod coordinator;
pub mod corrector;
pub mod design;
pub mod errors;
pub mod events;
pub mod extract;
pub mod output;
pub mod prompt;
pub mod provider;
pub mod ux;
pub mod wire;

pub use errors::{Result, StudioError};
