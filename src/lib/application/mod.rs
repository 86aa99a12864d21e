//! # Application Module
//!
//! ## Submodules
//!
//! - [`tooling`] - Tool server handles and the registry that owns them
//! - [`catalog`] - Namespaced tool catalog merged from every server
//! - [`conversation`] - Bounded message history
//! - [`resolver`] - Tool-call resolution loop for one user turn
//! - [`session`] - Chat session tying the pieces together
//! - [`stdio`] - Console front end

pub mod catalog;
pub mod conversation;
pub mod resolver;
pub mod session;
pub mod stdio;
pub mod tooling;
