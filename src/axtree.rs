use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::mapping::BackendId;
use crate::normalize::normalize;
use crate::{Error, Result};

const LINK_ROLE: &str = "link";

/// An accessibility node of role "link", in tree traversal order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkNode {
    pub backend_id: BackendId,
    pub node_id: String,
    pub name: String,
    pub normalized_name: String,
}

impl LinkNode {
    pub fn new(backend_id: BackendId, node_id: impl Into<String>, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            backend_id,
            node_id: node_id.into(),
            normalized_name: normalize(&name),
            name,
        }
    }
}

pub fn parse_axtree(text: &str) -> Result<Vec<LinkNode>> {
    let value = serde_json::from_str::<Value>(text)?;
    extract_link_nodes(&value)
}

/// Accepts either a node array or an object whose `nodes` key holds one.
pub fn axtree_nodes(axtree: &Value) -> Result<&[Value]> {
    match axtree {
        Value::Array(nodes) => Ok(nodes.as_slice()),
        Value::Object(object) => match object.get("nodes") {
            Some(Value::Array(nodes)) => Ok(nodes.as_slice()),
            Some(other) => Err(Error::AxTreeShape(format!(
                "`nodes` must be an array, found {}",
                json_kind(other)
            ))),
            None => Err(Error::AxTreeShape("object has no `nodes` array".into())),
        },
        other => Err(Error::AxTreeShape(format!(
            "expected an array or an object with `nodes`, found {}",
            json_kind(other)
        ))),
    }
}

pub fn extract_link_nodes(axtree: &Value) -> Result<Vec<LinkNode>> {
    let nodes = axtree_nodes(axtree)?;

    let mut out = Vec::new();
    let mut missing_backend = 0usize;
    for node in nodes {
        let role = node
            .get("role")
            .and_then(|role| role.get("value"))
            .map(value_text)
            .unwrap_or_default();
        if normalize(&role) != LINK_ROLE {
            continue;
        }

        let node_id = node.get("nodeId").map(value_text).unwrap_or_default();
        let Some(backend_id) = backend_id(node.get("backendDOMNodeId"), &node_id)? else {
            missing_backend += 1;
            continue;
        };

        let name = node
            .get("name")
            .and_then(|name| name.get("value"))
            .map(value_text)
            .unwrap_or_default();
        out.push(LinkNode::new(backend_id, node_id, name));
    }

    debug!(
        nodes = nodes.len(),
        links = out.len(),
        missing_backend,
        "extracted axtree link nodes"
    );
    Ok(out)
}

fn backend_id(raw: Option<&Value>, node_id: &str) -> Result<Option<BackendId>> {
    let invalid = |value: &Value| Error::InvalidBackendId {
        node_id: node_id.to_string(),
        value: value.to_string(),
    };
    match raw {
        None | Some(Value::Null) => Ok(None),
        Some(value @ Value::Number(number)) => number
            .as_i64()
            .or_else(|| number.as_f64().and_then(whole_float_id))
            .map(Some)
            .ok_or_else(|| invalid(value)),
        Some(value @ Value::String(text)) => text
            .trim()
            .parse::<BackendId>()
            .map(Some)
            .map_err(|_| invalid(value)),
        Some(value) => Err(invalid(value)),
    }
}

// 2^63: the first float past `i64::MAX`.
const BACKEND_ID_FLOAT_LIMIT: f64 = 9_223_372_036_854_775_808.0;

fn whole_float_id(value: f64) -> Option<BackendId> {
    let in_range = (-BACKEND_ID_FLOAT_LIMIT..BACKEND_ID_FLOAT_LIMIT).contains(&value);
    (in_range && value.fract() == 0.0).then_some(value as BackendId)
}

// Null reads as empty; other scalars are stringified.
fn value_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
