//! Payload validation hook for remote services.

use crate::{Error, ErrorContext, Result};
use jsonschema::{Draft, JSONSchema};
use serde_json::Value;

/// Checks a raw remote payload before it is decoded.
pub trait Validator: Send + Sync {
    fn validate(&self, value: &Value) -> Result<()>;
}

/// [`Validator`] backed by a compiled JSON Schema (draft 7).
pub struct JsonSchemaValidator {
    schema: JSONSchema,
}

impl JsonSchemaValidator {
    pub fn new(schema: &Value) -> Result<Self> {
        let schema = JSONSchema::options()
            .with_draft(Draft::Draft7)
            .compile(schema)
            .map_err(|e| {
                Error::configuration_with_context(
                    format!("failed to compile schema: {}", e),
                    ErrorContext::new().with_source("schema_validator"),
                )
            })?;
        Ok(Self { schema })
    }

    pub fn from_json_str(schema: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(schema)?;
        Self::new(&value)
    }
}

impl Validator for JsonSchemaValidator {
    fn validate(&self, value: &Value) -> Result<()> {
        if let Err(errors) = self.schema.validate(value) {
            let error_msgs: Vec<String> = errors.map(|e| e.to_string()).collect();
            return Err(Error::validation_with_context(
                "payload does not match schema",
                ErrorContext::new()
                    .with_details(error_msgs.join("; "))
                    .with_source("schema_validator"),
            ));
        }
        Ok(())
    }
}

impl std::fmt::Debug for JsonSchemaValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonSchemaValidator").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_schema_validation() {
        let v = JsonSchemaValidator::new(&json!({
            "type": "object",
            "required": ["id", "name"]
        }))
        .unwrap();
        assert!(v.validate(&json!({"id": "a", "name": "b"})).is_ok());

        let err = v.validate(&json!({"id": "a"})).unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));
        assert!(err.to_string().contains("schema_validator"));
    }

    #[test]
    fn test_bad_schema() {
        let err = JsonSchemaValidator::new(&json!({"type": 42})).unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));
    }
}
