//! Conditional schema resolution.
//!
//! Folds `allOf` members and the selected `if`/`then`/`else` branch into a
//! node before its properties are merged, so folded-in properties take part
//! in the same pass as the declared ones. Conditions are evaluated once per
//! resolution against a data snapshot; nothing is re-evaluated when the data
//! changes later.

use serde_json::{Map, Value};
use tracing::debug;

use crate::descriptor::{embedded_layer, merge_layers};
use crate::error::ResolveError;
use crate::property::{display_path, retrieve_schema, Definitions};
use crate::types::json_type_name;

/// Resolve every conditional construct on `node` in place.
///
/// `data` is the caller's form data for this node (may be `Null`); it is
/// laid over the node's declared `default` values before `if` is evaluated.
/// `allOf`, `if`, `then` and `else` are removed from the node afterwards.
///
/// # Errors
///
/// `ConditionKey` when `if.properties` or the selected branch's `required`
/// names a property the node does not have, `CircularReference` when a
/// folded member or branch references a definition that includes itself,
/// `InvalidSchema` for malformed composition keywords or an `if` schema the
/// validator rejects.
pub fn resolve_conditions(
    node: &mut Map<String, Value>,
    data: &Value,
    definitions: &Definitions,
    path: &str,
) -> Result<(), ResolveError> {
    resolve_within(node, data, definitions, &mut Vec::new(), path)
}

/// [`resolve_conditions`] for a node reached through the references in
/// `active`, which must not be expanded again below it.
pub(crate) fn resolve_within(
    node: &mut Map<String, Value>,
    data: &Value,
    definitions: &Definitions,
    active: &mut Vec<String>,
    path: &str,
) -> Result<(), ResolveError> {
    if let Some(all_of) = node.shift_remove("allOf") {
        let members = match all_of {
            Value::Array(members) => members,
            other => return Err(invalid(path, "allOf", "array", &other)),
        };
        for (i, member) in members.into_iter().enumerate() {
            let member_path = format!("{path}/allOf/{i}");
            let member = expand(&member, data, definitions, active, &member_path)?;
            fold(node, member, &member_path)?;
        }
    }

    let Some(condition) = node.shift_remove("if") else {
        node.shift_remove("then");
        node.shift_remove("else");
        return Ok(());
    };
    let then_branch = node.shift_remove("then");
    let else_branch = node.shift_remove("else");
    if then_branch.is_none() && else_branch.is_none() {
        return Ok(());
    }

    check_condition_keys(node, &condition, path)?;

    let candidate = candidate_data(node, data, definitions);
    let holds = evaluate(&condition, &candidate, definitions, path)?;
    debug!(path = display_path(path), holds, "conditional branch selected");

    let (branch, branch_path) = if holds {
        (then_branch, format!("{path}/then"))
    } else {
        (else_branch, format!("{path}/else"))
    };
    let branch = match branch {
        None | Some(Value::Bool(_)) => return Ok(()),
        Some(branch @ Value::Object(_)) => {
            expand(&branch, data, definitions, active, &branch_path)?
        }
        Some(other) => return Err(invalid(path, "then/else", "object", &other)),
    };

    let required = string_list(branch.get("required"));
    fold(node, branch, &branch_path)?;

    let properties = node.get("properties").and_then(Value::as_object);
    for key in required {
        if !properties.is_some_and(|p| p.contains_key(&key)) {
            return Err(ResolveError::ConditionKey {
                path: branch_path,
                key,
            });
        }
    }
    Ok(())
}

/// Expand a member or branch's references and resolve its own conditionals.
fn expand(
    fragment: &Value,
    data: &Value,
    definitions: &Definitions,
    active: &mut Vec<String>,
    path: &str,
) -> Result<Map<String, Value>, ResolveError> {
    let expanded = retrieve_schema(fragment, definitions, path)?;
    if let Some(reference) = expanded.refs.iter().find(|r| active.contains(*r)) {
        return Err(ResolveError::CircularReference {
            path: path.to_string(),
            reference: reference.clone(),
        });
    }

    let depth = active.len();
    active.extend(expanded.refs);
    let mut node = expanded.node;
    let result = resolve_within(&mut node, data, definitions, active, path);
    active.truncate(depth);
    result.map(|()| node)
}

/// Form data a condition is evaluated against: the node's declared
/// defaults with the caller's data laid over them.
///
/// Defaults are read through `$ref`s, so a property may inherit its
/// default from the definition it references.
pub fn candidate_data(node: &Map<String, Value>, data: &Value, definitions: &Definitions) -> Value {
    deep_merge(defaults_of(node, definitions, &mut Vec::new()), data)
}

fn defaults_of(
    node: &Map<String, Value>,
    definitions: &Definitions,
    seen: &mut Vec<String>,
) -> Value {
    let mut defaults = Map::new();
    let Some(properties) = node.get("properties").and_then(Value::as_object) else {
        return Value::Object(defaults);
    };
    for (key, property) in properties {
        // A broken reference is reported when the property itself is resolved.
        let Ok(expanded) = retrieve_schema(property, definitions, "") else {
            continue;
        };
        if let Some(default) = expanded.node.get("default") {
            defaults.insert(key.clone(), default.clone());
        } else if expanded.node.contains_key("properties")
            && !expanded.refs.iter().any(|r| seen.contains(r))
        {
            let depth = seen.len();
            seen.extend(expanded.refs);
            defaults.insert(key.clone(), defaults_of(&expanded.node, definitions, seen));
            seen.truncate(depth);
        }
    }
    Value::Object(defaults)
}

fn deep_merge(base: Value, overlay: &Value) -> Value {
    match (base, overlay) {
        (base, Value::Null) => base,
        (Value::Object(mut base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                let merged = match base.shift_remove(key) {
                    Some(existing) => deep_merge(existing, value),
                    None => value.clone(),
                };
                base.insert(key.clone(), merged);
            }
            Value::Object(base)
        }
        (_, overlay) => overlay.clone(),
    }
}

fn check_condition_keys(
    node: &Map<String, Value>,
    condition: &Value,
    path: &str,
) -> Result<(), ResolveError> {
    let Some(keys) = condition.get("properties").and_then(Value::as_object) else {
        return Ok(());
    };
    let properties = node.get("properties").and_then(Value::as_object);
    for key in keys.keys() {
        if !properties.is_some_and(|p| p.contains_key(key)) {
            return Err(ResolveError::ConditionKey {
                path: format!("{path}/if"),
                key: key.clone(),
            });
        }
    }
    Ok(())
}

fn evaluate(
    condition: &Value,
    data: &Value,
    definitions: &Definitions,
    path: &str,
) -> Result<bool, ResolveError> {
    let schema = match condition {
        Value::Bool(holds) => return Ok(*holds),
        Value::Object(map) => {
            let mut map = map.clone();
            definitions.attach_to(&mut map);
            Value::Object(map)
        }
        other => return Err(invalid(path, "if", "object or boolean", other)),
    };

    let validator =
        jsonschema::validator_for(&schema).map_err(|e| ResolveError::InvalidSchema {
            message: format!("if at {}: {}", display_path(path), e),
        })?;
    Ok(validator.is_valid(data))
}

/// Fold a composition fragment into `node`.
///
/// New properties are appended and existing ones extended field by field;
/// `required` is unioned in order; `ui` fragments are merged; any other
/// keyword replaces the node's.
fn fold(
    node: &mut Map<String, Value>,
    fragment: Map<String, Value>,
    path: &str,
) -> Result<(), ResolveError> {
    for (key, value) in fragment {
        match key.as_str() {
            "properties" => {
                let incoming = match value {
                    Value::Object(incoming) => incoming,
                    other => return Err(invalid(path, "properties", "object", &other)),
                };
                let target = node
                    .entry("properties")
                    .or_insert_with(|| Value::Object(Map::new()));
                let Some(target) = target.as_object_mut() else {
                    return Err(ResolveError::InvalidSchema {
                        message: format!("properties at {} must be an object", display_path(path)),
                    });
                };
                for (name, property) in incoming {
                    match target.get_mut(&name) {
                        Some(Value::Object(existing)) if property.is_object() => {
                            if let Value::Object(extra) = property {
                                existing.extend(extra);
                            }
                        }
                        _ => {
                            target.insert(name, property);
                        }
                    }
                }
            }
            "required" => {
                let mut required = string_list(node.get("required"));
                for name in string_list(Some(&value)) {
                    if !required.contains(&name) {
                        required.push(name);
                    }
                }
                node.insert(
                    "required".to_string(),
                    Value::Array(required.into_iter().map(Value::String).collect()),
                );
            }
            "ui" => {
                let ui_path = format!("{path}/ui");
                let low = match node.shift_remove("ui") {
                    Some(existing) => embedded_layer(existing, &ui_path)?,
                    None => Map::new(),
                };
                let high = embedded_layer(value, &ui_path)?;
                node.insert(key, Value::Object(merge_layers([&low, &high])));
            }
            // Lookups always go through the root definitions.
            "definitions" | "$defs" => {}
            _ => {
                node.insert(key, value);
            }
        }
    }
    Ok(())
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|arr| {
            arr.iter()
                .filter_map(|v| v.as_str().map(String::from))
                .collect()
        })
        .unwrap_or_default()
}

fn invalid(path: &str, keyword: &str, expected: &str, actual: &Value) -> ResolveError {
    ResolveError::InvalidSchema {
        message: format!(
            "{keyword} at {} must be {expected}, got {}",
            display_path(path),
            json_type_name(actual)
        ),
    }
}
