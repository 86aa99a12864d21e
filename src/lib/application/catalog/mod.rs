//! # Tool Catalog
//!
//! Flattens the tools of every registered server into one namespaced list.
//! Each tool is advertised to the model as `alias_localname`; the resolver
//! splits the name back on the first separator to route a call.

mod schema;

pub use schema::{ParameterSchema, normalize_schema};

use crate::application::tooling::{ServerRegistry, ServerToolInfo};
use crate::constants::QUALIFIED_NAME_SEPARATOR;
use serde_json::{Value, json};
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// One tool as the model sees it.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolDescriptor {
    pub server_alias: String,
    pub local_name: String,
    pub description: String,
    pub parameters: ParameterSchema,
    qualified_name: String,
}

impl ToolDescriptor {
    pub fn new(
        server_alias: impl Into<String>,
        local_name: impl Into<String>,
        description: impl Into<String>,
        parameters: ParameterSchema,
    ) -> Self {
        let server_alias = server_alias.into();
        let local_name = local_name.into();
        let qualified_name = qualify(&server_alias, &local_name);
        Self {
            server_alias,
            local_name,
            description: description.into(),
            parameters,
            qualified_name,
        }
    }

    pub fn qualified_name(&self) -> &str {
        &self.qualified_name
    }

    /// OpenAI-style `{"type": "function", "function": {...}}` entry.
    pub fn to_function_definition(&self) -> Value {
        json!({
            "type": "function",
            "function": {
                "name": self.qualified_name,
                "description": self.description,
                "parameters": self.parameters.to_value(),
            }
        })
    }
}

pub fn qualify(server_alias: &str, local_name: &str) -> String {
    format!("{server_alias}{QUALIFIED_NAME_SEPARATOR}{local_name}")
}

/// Split a qualified name on the first separator. Both halves must be
/// non-empty.
pub fn split_qualified_name(qualified: &str) -> Option<(&str, &str)> {
    let (alias, local) = qualified.split_once(QUALIFIED_NAME_SEPARATOR)?;
    if alias.is_empty() || local.is_empty() {
        return None;
    }
    Some((alias, local))
}

/// Immutable, ordered set of tools for one session.
#[derive(Debug, Clone, Default)]
pub struct ToolCatalog {
    tools: Vec<ToolDescriptor>,
}

impl ToolCatalog {
    /// Query every handle in registration order and merge what they report.
    ///
    /// A server whose listing fails, and any tool with a non-object schema or
    /// a missing name or description, is left out with a warning.
    pub async fn merge(registry: &ServerRegistry) -> Self {
        let mut tools = Vec::new();
        for handle in registry.iter() {
            let alias = handle.alias();
            match handle.list_tools().await {
                Ok(listed) => {
                    let before = tools.len();
                    collect_server_tools(alias, listed, &mut tools);
                    debug!(server = %alias, count = tools.len() - before, "Merged server tools");
                }
                Err(err) => {
                    warn!(server = %alias, %err, "Failed to list tools; server contributes none");
                }
            }
        }
        info!(count = tools.len(), "Tool catalog built");
        Self { tools }
    }

    pub fn from_descriptors(tools: Vec<ToolDescriptor>) -> Self {
        Self { tools }
    }

    pub fn get(&self, qualified_name: &str) -> Option<&ToolDescriptor> {
        self.tools
            .iter()
            .find(|tool| tool.qualified_name == qualified_name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(ToolDescriptor::qualified_name).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ToolDescriptor> {
        self.tools.iter()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn function_definitions(&self) -> Vec<Value> {
        self.tools
            .iter()
            .map(ToolDescriptor::to_function_definition)
            .collect()
    }
}

fn collect_server_tools(alias: &str, listed: Vec<ServerToolInfo>, out: &mut Vec<ToolDescriptor>) {
    let mut seen = HashSet::new();
    for info in listed {
        let (Some(name), Some(description)) = (info.name, info.description) else {
            warn!(server = %alias, "Skipping tool without name or description");
            continue;
        };
        if name.trim().is_empty() {
            warn!(server = %alias, "Skipping tool with empty name");
            continue;
        }
        let Some(parameters) = normalize_schema(info.input_schema.as_ref()) else {
            warn!(server = %alias, tool = %name, "Skipping tool with non-object input schema");
            continue;
        };
        if !seen.insert(name.clone()) {
            warn!(server = %alias, tool = %name, "Skipping duplicate tool name");
            continue;
        }
        out.push(ToolDescriptor::new(alias, name, description, parameters));
    }
}
