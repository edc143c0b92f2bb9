//! Shared services handed to every tool call.

pub mod context;

pub use context::ServiceContext;
