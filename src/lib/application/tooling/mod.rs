//! Tool server handles and the registry that owns them.
//!
//! A [`ToolServerHandle`] is one connected tool-provider. [`McpProcess`] is the
//! stdio JSON-RPC implementation; [`ServerRegistry`] maps aliases to handles
//! for the lifetime of a session and tears them all down at the end.

mod error;
mod interface;
mod process;
mod registry;

pub use error::{RegistryError, ToolInvokeError};
pub use interface::{ServerToolInfo, ToolServerHandle};
pub use process::McpProcess;
pub use registry::{ConnectFailure, ServerRegistry, ShutdownReport};
