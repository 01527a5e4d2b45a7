//! Structural resource fingerprints.
//!
//! A digest is SHA-256 over the resource type and the canonical JSON of its
//! properties, where every reference to another resource of the same
//! template is replaced by *that* resource's digest. Renaming a referenced
//! resource therefore leaves the referencing digest untouched, while a change
//! to what it points at still changes it.
//!
//! `Metadata`, `DependsOn`, `Condition` and the deletion/update policies are
//! not part of the digest. References to parameters, pseudo parameters and
//! unknown ids are hashed verbatim.
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt::Write as _;

use serde_json::{Map, Value};
use sha2::{Digest as _, Sha256};

use super::template::Template;

/// Fingerprint of one resource.
///
/// `confident` is `false` when the resource sits on a reference cycle, in
/// which case equality of `value` is not trusted for matching.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceDigest {
    /// Lowercase hex SHA-256.
    pub value: String,
    /// Whether every reference could be resolved to a digest.
    pub confident: bool,
}

impl ResourceDigest {
    /// A short prefix for display.
    #[must_use]
    pub fn short(&self) -> &str {
        self.value.get(..12).unwrap_or(&self.value)
    }
}

/// Compute the digest of every resource in `template`, keyed by logical id.
#[must_use]
pub fn compute_digests(template: &Template) -> BTreeMap<String, ResourceDigest> {
    let mut hasher = DigestComputer {
        template,
        done: HashMap::new(),
        visiting: HashSet::new(),
    };
    template
        .resources
        .keys()
        .map(|id| (id.clone(), hasher.digest_of(id)))
        .collect()
}

struct DigestComputer<'a> {
    template: &'a Template,
    done: HashMap<String, ResourceDigest>,
    visiting: HashSet<String>,
}

impl DigestComputer<'_> {
    fn digest_of(&mut self, id: &str) -> ResourceDigest {
        if let Some(d) = self.done.get(id) {
            return d.clone();
        }
        let template = self.template;
        let Some(resource) = template.resources.get(id) else {
            return unresolved(id);
        };
        self.visiting.insert(id.to_string());

        let mut confident = true;
        let properties = if resource.properties.is_null() {
            Value::Object(Map::new())
        } else {
            self.normalize(&resource.properties, &mut confident)
        };

        let mut sha = Sha256::new();
        sha.update(resource.resource_type.as_bytes());
        sha.update(b"\n");
        sha.update(properties.to_string().as_bytes());
        let digest = ResourceDigest {
            value: hex(&sha.finalize()),
            confident,
        };

        self.visiting.remove(id);
        self.done.insert(id.to_string(), digest.clone());
        digest
    }

    /// Resolve a referenced logical id to its digest marker, or `None` if
    /// `id` is not a resource of this template.
    fn reference(&mut self, id: &str, confident: &mut bool) -> Option<String> {
        if !self.template.resources.contains_key(id) {
            return None;
        }
        if self.visiting.contains(id) {
            *confident = false;
            return Some("<cycle>".to_string());
        }
        let target = self.digest_of(id);
        *confident &= target.confident;
        Some(format!("<resource:{}>", target.value))
    }

    fn normalize(&mut self, value: &Value, confident: &mut bool) -> Value {
        match value {
            Value::Object(map) if map.len() == 1 => {
                if let Some(Value::String(id)) = map.get("Ref")
                    && let Some(marker) = self.reference(id, confident)
                {
                    return single("Ref", Value::String(marker));
                }
                if let Some(get_att) = map.get("Fn::GetAtt")
                    && let Some(normalized) = self.normalize_get_att(get_att, confident)
                {
                    return single("Fn::GetAtt", normalized);
                }
                if let Some(sub) = map.get("Fn::Sub") {
                    return single("Fn::Sub", self.normalize_sub(sub, confident));
                }
                self.normalize_children(map, confident)
            }
            Value::Object(map) => self.normalize_children(map, confident),
            Value::Array(items) => Value::Array(
                items
                    .iter()
                    .map(|v| self.normalize(v, confident))
                    .collect(),
            ),
            other => other.clone(),
        }
    }

    fn normalize_children(&mut self, map: &Map<String, Value>, confident: &mut bool) -> Value {
        Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), self.normalize(v, confident)))
                .collect(),
        )
    }

    fn normalize_get_att(&mut self, get_att: &Value, confident: &mut bool) -> Option<Value> {
        let (id, attr) = match get_att {
            Value::Array(parts) => (parts.first()?.as_str()?, parts.get(1)?.clone()),
            Value::String(dotted) => {
                let (id, attr) = dotted.split_once('.')?;
                (id, Value::String(attr.to_string()))
            }
            _ => return None,
        };
        let marker = self.reference(id, confident)?;
        Some(Value::Array(vec![Value::String(marker), attr]))
    }

    fn normalize_sub(&mut self, sub: &Value, confident: &mut bool) -> Value {
        match sub {
            Value::String(s) => Value::String(self.substitute_tokens(s, confident)),
            Value::Array(parts) => {
                let mut out: Vec<Value> = Vec::with_capacity(parts.len());
                let mut parts_iter = parts.iter();
                if let Some(first) = parts_iter.next() {
                    out.push(match first {
                        Value::String(s) => Value::String(self.substitute_tokens(s, confident)),
                        other => self.normalize(other, confident),
                    });
                }
                out.extend(parts_iter.map(|v| self.normalize(v, confident)));
                Value::Array(out)
            }
            other => self.normalize(other, confident),
        }
    }

    /// Replace `${Id}` and `${Id.Attr}` tokens naming template resources.
    fn substitute_tokens(&mut self, s: &str, confident: &mut bool) -> String {
        let mut out = String::with_capacity(s.len());
        let mut rest = s;
        while let Some(start) = rest.find("${") {
            let (before, after) = rest.split_at(start);
            out.push_str(before);
            let Some(end) = after.find('}') else {
                out.push_str(after);
                return out;
            };
            let token = after.get(2..end).unwrap_or_default();
            let (id, attr) = token
                .split_once('.')
                .map_or((token, None), |(id, attr)| (id, Some(attr)));
            match self.reference(id, confident) {
                Some(marker) => {
                    out.push_str("${");
                    out.push_str(&marker);
                    if let Some(attr) = attr {
                        out.push('.');
                        out.push_str(attr);
                    }
                    out.push('}');
                }
                None => out.push_str(after.get(..=end).unwrap_or_default()),
            }
            rest = after.get(end + 1..).unwrap_or_default();
        }
        out.push_str(rest);
        out
    }
}

fn single(key: &str, value: Value) -> Value {
    let mut map = Map::new();
    map.insert(key.to_string(), value);
    Value::Object(map)
}

fn unresolved(id: &str) -> ResourceDigest {
    ResourceDigest {
        value: format!("unresolved:{id}"),
        confident: false,
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().fold(String::with_capacity(64), |mut s, b| {
        let _ = write!(s, "{b:02x}");
        s
    })
}
