//! Form data validation against resolved schemas.

use serde_json::Value;

use crate::error::{ResolveError, SchemaError, ValidateError};
use crate::readiness::ValidatorProvider;
use crate::resolver::{cover, resolve_with, Resolved};
use crate::services::Services;
use crate::types::{FormRequest, ResolveOptions};

/// The `jsonschema` validator compiled into this crate; always available.
#[derive(Debug, Clone, Copy, Default)]
pub struct BundledValidator;

impl ValidatorProvider for BundledValidator {
    fn validator_available(&self) -> bool {
        true
    }
}

/// Validate form data against a form schema.
///
/// Resolves the schema and overlay with `data` as the form data snapshot
/// (so conditionals follow the data, and hidden fields are no longer
/// required), then validates `data` against the resolved schema.
///
/// # Errors
///
/// Returns `ValidateError::Resolve` if resolution fails, or
/// `ValidateError::Invalid` if the data doesn't match the schema.
pub fn validate(
    schema: &Value,
    overlay: &Value,
    data: &Value,
    options: &ResolveOptions,
) -> Result<Resolved, ValidateError> {
    validate_with(schema, overlay, data, options, &Services::default())
}

/// [`validate`] with explicit services.
///
/// Access control and translation apply exactly as in
/// [`resolve_with`]: a field hidden by a denied `acl` is not required.
pub fn validate_with(
    schema: &Value,
    overlay: &Value,
    data: &Value,
    options: &ResolveOptions,
    services: &Services<'_>,
) -> Result<Resolved, ValidateError> {
    let options = options.clone().form_data(data.clone());
    let resolved = resolve_with(schema, overlay, &options, services)?;
    validate_against_schema(&resolved.schema, data)?;
    Ok(resolved)
}

/// Validate a request's form data against its own schema and overlay.
///
/// The access-control service matters here: a field hidden by a denied
/// `acl` is not required.
pub fn validate_form(
    request: &FormRequest,
    services: &Services<'_>,
) -> Result<Resolved, ValidateError> {
    let resolved = cover(request, services)?;
    validate_against_schema(&resolved.schema, &request.form_data)?;
    Ok(resolved)
}

/// Validate form data against an already-resolved schema.
///
/// Use this to validate repeatedly without re-resolving.
pub fn validate_against_schema(schema: &Value, data: &Value) -> Result<(), ValidateError> {
    let validator = jsonschema::validator_for(schema).map_err(|e| {
        ValidateError::Resolve(ResolveError::InvalidSchema {
            message: e.to_string(),
        })
    })?;

    let errors: Vec<SchemaError> = validator
        .iter_errors(data)
        .map(|e| SchemaError {
            path: e.instance_path.to_string(),
            message: e.to_string(),
        })
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ValidateError::Invalid { errors })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Layout;
    use serde_json::json;

    fn options() -> ResolveOptions {
        ResolveOptions::new(Layout::Horizontal)
    }

    #[test]
    fn validate_valid_data() {
        let schema = json!({
            "type": "object",
            "properties": { "name": { "type": "string" } },
            "required": ["name"]
        });
        let result = validate(&schema, &Value::Null, &json!({ "name": "Ada" }), &options());
        assert!(result.is_ok());
    }

    #[test]
    fn validate_missing_required_field() {
        let schema = json!({
            "type": "object",
            "properties": { "name": { "type": "string" } },
            "required": ["name"]
        });
        let result = validate(&schema, &Value::Null, &json!({}), &options());
        assert!(matches!(result, Err(ValidateError::Invalid { .. })));
    }

    #[test]
    fn hidden_field_is_not_required() {
        let schema = json!({
            "type": "object",
            "properties": { "name": { "type": "string" } },
            "required": ["name"]
        });
        let overlay = json!({ "$name": { "hidden": true } });
        let result = validate(&schema, &overlay, &json!({}), &options());
        assert!(result.is_ok());
    }

    #[test]
    fn data_selects_conditional_branch() {
        let schema = json!({
            "type": "object",
            "properties": {
                "method": { "type": "string", "enum": ["card", "cash"] }
            },
            "if": { "properties": { "method": { "const": "card" } }, "required": ["method"] },
            "then": {
                "properties": { "card": { "type": "string" } },
                "required": ["card"]
            }
        });

        let result = validate(&schema, &Value::Null, &json!({ "method": "card" }), &options());
        assert!(matches!(result, Err(ValidateError::Invalid { .. })));

        let result = validate(&schema, &Value::Null, &json!({ "method": "cash" }), &options());
        assert!(result.is_ok());
    }

    #[test]
    fn validate_collects_multiple_errors() {
        let schema = json!({
            "type": "object",
            "properties": {
                "name": { "type": "string" },
                "age": { "type": "number" }
            },
            "required": ["name", "age"]
        });
        match validate_against_schema(&schema, &json!({})) {
            Err(ValidateError::Invalid { errors }) => assert_eq!(errors.len(), 2),
            _ => panic!("expected validation error with 2 errors"),
        }
    }

    #[test]
    fn denied_field_is_not_required() {
        let request: FormRequest = serde_json::from_value(json!({
            "schema": {
                "type": "object",
                "properties": { "salary": { "type": "number", "ui": { "acl": "hr" } } },
                "required": ["salary"]
            },
            "formData": {}
        }))
        .unwrap();

        let allow = |_: &Value| true;
        let result = validate_form(&request, &Services::default().with_acl(&allow));
        assert!(matches!(result, Err(ValidateError::Invalid { .. })));

        let deny = |_: &Value| false;
        let resolved = validate_form(&request, &Services::default().with_acl(&deny)).unwrap();
        assert_eq!(resolved.schema["required"], json!([]));
    }

    #[test]
    fn services_reach_validation() {
        let schema = json!({
            "type": "object",
            "properties": { "salary": { "type": "number", "ui": { "acl": "hr" } } },
            "required": ["salary"]
        });

        let result = validate(&schema, &Value::Null, &json!({}), &options());
        assert!(matches!(result, Err(ValidateError::Invalid { .. })));

        let deny = |_: &Value| false;
        let services = Services::default().with_acl(&deny);
        let resolved =
            validate_with(&schema, &Value::Null, &json!({}), &options(), &services).unwrap();
        assert_eq!(resolved.schema["required"], json!([]));
        assert!(resolved.ui.child("salary").unwrap().hidden);
    }

    #[test]
    fn bundled_validator_is_available() {
        assert!(BundledValidator.validator_available());
    }
}
