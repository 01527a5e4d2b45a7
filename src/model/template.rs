//! Stack artifact documents: one stack's template plus its environment.
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::Environment;

/// A stack as stored on disk, either desired (synthesized) or deployed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackArtifact {
    /// Stack name, unique within its environment.
    pub stack_name: String,
    /// Target the stack is deployed to.
    pub environment: Environment,
    /// The stack's template.
    pub template: Template,
    /// Physical identifiers by logical id; empty for desired stacks.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub physical_ids: BTreeMap<String, String>,
}

/// A deployment template. Only `Resources` is interpreted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Template {
    /// Resources keyed by logical id.
    #[serde(rename = "Resources", default)]
    pub resources: BTreeMap<String, TemplateResource>,
    /// Every other top-level section, carried through untouched.
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

/// One resource declaration inside a template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateResource {
    /// Resource type, e.g. `AWS::SQS::Queue`.
    #[serde(rename = "Type")]
    pub resource_type: String,
    /// Resource properties; `Null` when the declaration has none.
    #[serde(rename = "Properties", default, skip_serializing_if = "Value::is_null")]
    pub properties: Value,
    /// Metadata, `DependsOn`, policies and anything else.
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

impl TemplateResource {
    /// Declare a resource of `resource_type` with the given properties.
    #[must_use]
    pub fn new(resource_type: &str, properties: Value) -> Self {
        Self {
            resource_type: resource_type.to_string(),
            properties,
            other: Map::new(),
        }
    }
}

/// Rewrite every intra-template reference to `from` so it points at `to`.
///
/// Covers `Ref`, both `Fn::GetAtt` forms, `${Id}` / `${Id.Attr}` tokens in
/// `Fn::Sub` and `DependsOn` entries.
pub fn rename_references(template: &mut Template, from: &str, to: &str) {
    for resource in template.resources.values_mut() {
        rename_in_value(&mut resource.properties, from, to);
        if let Some(depends_on) = resource.other.get_mut("DependsOn") {
            match depends_on {
                Value::String(s) if s == from => *s = to.to_string(),
                Value::Array(items) => {
                    for item in items {
                        if item.as_str() == Some(from) {
                            *item = Value::String(to.to_string());
                        }
                    }
                }
                _ => {}
            }
        }
    }
    if let Some(outputs) = template.other.get_mut("Outputs") {
        rename_in_value(outputs, from, to);
    }
}

fn rename_in_value(value: &mut Value, from: &str, to: &str) {
    match value {
        Value::Object(map) => {
            if map.len() == 1 {
                if let Some(Value::String(target)) = map.get_mut("Ref")
                    && target == from
                {
                    *target = to.to_string();
                    return;
                }
                if let Some(get_att) = map.get_mut("Fn::GetAtt") {
                    rename_get_att(get_att, from, to);
                    return;
                }
                if let Some(sub) = map.get_mut("Fn::Sub") {
                    rename_sub(sub, from, to);
                    return;
                }
            }
            for v in map.values_mut() {
                rename_in_value(v, from, to);
            }
        }
        Value::Array(items) => {
            for v in items {
                rename_in_value(v, from, to);
            }
        }
        _ => {}
    }
}

fn rename_get_att(get_att: &mut Value, from: &str, to: &str) {
    match get_att {
        Value::Array(parts) => {
            if let Some(Value::String(id)) = parts.first_mut()
                && id == from
            {
                *id = to.to_string();
            }
        }
        Value::String(dotted) => {
            if let Some((id, attr)) = dotted.split_once('.')
                && id == from
            {
                *dotted = format!("{to}.{attr}");
            }
        }
        _ => {}
    }
}

fn rename_sub(sub: &mut Value, from: &str, to: &str) {
    let rewrite = |s: &mut String| {
        *s = s
            .replace(&format!("${{{from}}}"), &format!("${{{to}}}"))
            .replace(&format!("${{{from}."), &format!("${{{to}."));
    };
    match sub {
        Value::String(s) => rewrite(s),
        Value::Array(parts) => {
            if let Some(Value::String(s)) = parts.first_mut() {
                rewrite(s);
            }
            if let Some(vars) = parts.get_mut(1) {
                rename_in_value(vars, from, to);
            }
        }
        _ => {}
    }
}
