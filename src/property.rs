//! Property resolution - expands local `$ref` pointers against the root
//! schema's `definitions` / `$defs` so each node is self-contained.

use serde_json::{Map, Value};

use crate::error::ResolveError;
use crate::types::json_type_name;

/// Reusable sub-schemas declared on the root schema, looked up by name.
#[derive(Debug, Clone, Default)]
pub struct Definitions {
    definitions: Map<String, Value>,
    defs: Map<String, Value>,
}

impl Definitions {
    /// Collect `definitions` and `$defs` from a root schema.
    pub fn from_schema(schema: &Value) -> Self {
        let section = |key: &str| {
            schema
                .get(key)
                .and_then(Value::as_object)
                .cloned()
                .unwrap_or_default()
        };
        Self {
            definitions: section("definitions"),
            defs: section("$defs"),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty() && self.defs.is_empty()
    }

    /// Find the sub-schema a `$ref` points at.
    ///
    /// Only local pointers (`#/definitions/...`, `#/$defs/...`) are
    /// supported; JSON Pointer escapes (`~1`, `~0`) are honored.
    pub fn find(&self, reference: &str, path: &str) -> Result<&Value, ResolveError> {
        let missing = || ResolveError::MissingDefinition {
            path: path.to_string(),
            reference: reference.to_string(),
        };

        let (section, rest) = if let Some(rest) = reference.strip_prefix("#/definitions/") {
            (&self.definitions, rest)
        } else if let Some(rest) = reference.strip_prefix("#/$defs/") {
            (&self.defs, rest)
        } else {
            return Err(missing());
        };

        let mut parts = rest.split('/').map(unescape_pointer);
        let first = parts.next().filter(|p| !p.is_empty()).ok_or_else(missing)?;
        let mut current = section.get(&first).ok_or_else(missing)?;
        for part in parts {
            current = current.get(&part).ok_or_else(missing)?;
        }
        Ok(current)
    }

    /// The definitions as schema keywords, for evaluating a detached
    /// sub-schema that may still reference them.
    pub(crate) fn attach_to(&self, schema: &mut Map<String, Value>) {
        if !self.definitions.is_empty() {
            schema
                .entry("definitions")
                .or_insert_with(|| Value::Object(self.definitions.clone()));
        }
        if !self.defs.is_empty() {
            schema
                .entry("$defs")
                .or_insert_with(|| Value::Object(self.defs.clone()));
        }
    }
}

/// A schema node with every `$ref` on it expanded.
#[derive(Debug, Clone, PartialEq)]
pub struct Expanded {
    pub node: Map<String, Value>,
    /// References expanded to produce `node`, outermost first.
    pub refs: Vec<String>,
}

/// Expand the `$ref` chain of a single node.
///
/// The referenced definition is copied and the node's own keywords are laid
/// over it, so local `title`, `ui` and the like win. Repeats until no `$ref`
/// remains. Nested properties are left for the caller to visit.
pub fn retrieve_schema(
    node: &Value,
    definitions: &Definitions,
    path: &str,
) -> Result<Expanded, ResolveError> {
    let Value::Object(map) = node else {
        return Err(ResolveError::InvalidSchema {
            message: format!(
                "schema at {} must be an object, got {}",
                display_path(path),
                json_type_name(node)
            ),
        });
    };

    let mut node = map.clone();
    let mut refs: Vec<String> = Vec::new();

    while let Some(reference) = node.shift_remove("$ref") {
        let Value::String(reference) = reference else {
            return Err(ResolveError::InvalidSchema {
                message: format!("$ref at {} must be a string", display_path(path)),
            });
        };
        if refs.contains(&reference) {
            return Err(ResolveError::CircularReference {
                path: path.to_string(),
                reference,
            });
        }

        let Value::Object(target) = definitions.find(&reference, path)? else {
            return Err(ResolveError::InvalidSchema {
                message: format!("definition {} must be an object", reference),
            });
        };

        let mut merged = target.clone();
        for (key, value) in node {
            merged.insert(key, value);
        }
        node = merged;
        refs.push(reference);
    }

    Ok(Expanded { node, refs })
}

fn unescape_pointer(part: &str) -> String {
    part.replace("~1", "/").replace("~0", "~")
}

pub(crate) fn display_path(path: &str) -> &str {
    if path.is_empty() {
        "/"
    } else {
        path
    }
}
