//! Visibility gating and `required` bookkeeping.

use serde_json::{Map, Value};

use crate::descriptor::UiDescriptor;
use crate::services::AccessControl;

/// Force a visible node hidden when its `acl` requirement is denied.
///
/// An explicit `hidden: true` stands without consulting the service;
/// `hidden: false` is overridden by a denial.
pub fn gate(descriptor: &mut UiDescriptor, acl: Option<&dyn AccessControl>) {
    if descriptor.hidden {
        return;
    }
    if let (Some(token), Some(acl)) = (&descriptor.acl, acl) {
        if !acl.can(token) {
            descriptor.hidden = true;
        }
    }
}

/// Remove hidden property names from a node's `required` list.
///
/// Names that are not listed are ignored. Returns how many were removed.
pub fn prune_required(node: &mut Map<String, Value>, hidden: &[String]) -> usize {
    let Some(Value::Array(required)) = node.get_mut("required") else {
        return 0;
    };
    let before = required.len();
    required.retain(|name| {
        !name
            .as_str()
            .is_some_and(|name| hidden.iter().any(|h| h == name))
    });
    before - required.len()
}
