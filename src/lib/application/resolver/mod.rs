//! # Tool Call Resolver
//!
//! Drives one user turn from the first model request to a final answer.
//!
//! ## States
//!
//! ```text
//! AwaitingModel -> ModelResponded -> Done
//!                        |
//!                        +-> Dispatching -> AwaitingModel
//! ```
//!
//! A response whose finish indicator signals tool calls moves to
//! `Dispatching`: every call in the batch is routed by splitting its
//! qualified name, run concurrently, and answered in request order. Routing,
//! argument and execution failures become tool results for the model to
//! read. Only model failures and [`ResolveError::ToolLoopExceeded`] end the
//! turn early.

mod dispatch;
mod errors;
mod models;
mod runner;

#[cfg(test)]
mod tests;

pub use errors::{ResolveError, ToolCallError};
pub use models::{ResolvedTurn, ResolverOptions, ToolStep};
pub use runner::ToolCallResolver;
