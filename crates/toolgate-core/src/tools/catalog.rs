//! Flattening per-server tool lists into the catalog handed to models
//!
//! Catalog construction is a pure function of its inputs: the same server
//! lists, built-ins and options always give the same entries in the same order.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::types::{normalize_schema, CallableTool, ToolDescriptor, ToolOrigin};

/// How server id and tool name are joined into a catalog name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NamingStyle {
    /// `calc:add`
    #[default]
    Colon,
    /// `calc_add`
    Underscore,
}

impl NamingStyle {
    pub fn separator(&self) -> char {
        match self {
            NamingStyle::Colon => ':',
            NamingStyle::Underscore => '_',
        }
    }

    pub fn qualify(&self, server_id: &str, tool_name: &str) -> String {
        format!("{}{}{}", server_id, self.separator(), tool_name)
    }
}

/// Which entry survives when two servers produce the same catalog name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollisionPolicy {
    /// The later-registered server shadows the earlier one, keeping the earlier position
    #[default]
    LaterWins,
    /// The first entry is kept; later ones are ignored
    FirstWins,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CatalogOptions {
    pub naming: NamingStyle,
    pub collision: CollisionPolicy,
}

/// Tools declared by one connected server
#[derive(Debug, Clone, PartialEq)]
pub struct ServerTools {
    pub server_id: String,
    pub server_name: String,
    pub tools: Vec<ToolDescriptor>,
}

/// Build the catalog from connected servers (in registration order) and built-ins
///
/// Server tools come first, then built-ins. A server tool whose qualified
/// name equals a built-in name is dropped.
pub fn build_catalog(servers: &[ServerTools], builtins: &[ToolDescriptor], options: CatalogOptions) -> Vec<CallableTool> {
    let reserved: HashSet<&str> = builtins.iter().map(|b| b.name.as_str()).collect();
    let mut catalog: Vec<CallableTool> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();

    for server in servers {
        for tool in &server.tools {
            let name = options.naming.qualify(&server.server_id, &tool.name);
            if reserved.contains(name.as_str()) {
                continue;
            }

            let entry = CallableTool {
                description: describe(&server.server_name, &tool.description),
                input_schema: normalize_schema(tool.input_schema.clone()),
                origin: ToolOrigin::Server {
                    server_id: server.server_id.clone(),
                    tool_name: tool.name.clone(),
                },
                name,
            };

            match positions.get(&entry.name) {
                Some(&index) => {
                    if options.collision == CollisionPolicy::LaterWins {
                        catalog[index] = entry;
                    }
                }
                None => {
                    positions.insert(entry.name.clone(), catalog.len());
                    catalog.push(entry);
                }
            }
        }
    }

    let mut seen_builtins = HashSet::new();
    for builtin in builtins {
        if !seen_builtins.insert(builtin.name.as_str()) {
            continue;
        }
        catalog.push(CallableTool {
            name: builtin.name.clone(),
            description: builtin.description.clone(),
            input_schema: normalize_schema(builtin.input_schema.clone()),
            origin: ToolOrigin::Builtin,
        });
    }

    catalog
}

/// Look up a catalog entry by its qualified name
pub fn resolve<'a>(catalog: &'a [CallableTool], name: &str) -> Option<&'a CallableTool> {
    catalog.iter().find(|tool| tool.name == name)
}

fn describe(server_name: &str, description: &str) -> String {
    if description.is_empty() {
        format!("[{}]", server_name)
    } else {
        format!("[{}] {}", server_name, description)
    }
}
