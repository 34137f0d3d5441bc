//! The validator contract and its schema-backed implementation.

use async_trait::async_trait;
use serde_json::Value;

use crate::errors::ApiError;
use crate::schema::Schema;

/// Which part of the request a piece of data originated from. Discriminates
/// which schema applies during validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Body,
    QueryParams,
    PathParams,
}

/// Capability normalizing or rejecting untyped input.
///
/// `response` selects the outgoing-data schema instead of the request-side
/// one; `partial` ignores violations caused solely by absent fields.
#[async_trait]
pub trait Validator: Send + Sync {
    async fn validate(
        &self,
        data: Value,
        source: Source,
        response: bool,
        partial: bool,
    ) -> Result<Value, ApiError>;
}

/// Schema-backed [`Validator`]. Exactly one schema applies per
/// (response, source) combination; a combination with no schema configured
/// passes data through unchanged.
#[derive(Debug, Clone, Default)]
pub struct SchemaValidator {
    pub body_schema: Option<Schema>,
    pub query_schema: Option<Schema>,
    pub response_schema: Option<Schema>,
}

impl SchemaValidator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn body_schema(mut self, schema: Schema) -> Self {
        self.body_schema = Some(schema);
        self
    }

    #[must_use]
    pub fn query_schema(mut self, schema: Schema) -> Self {
        self.query_schema = Some(schema);
        self
    }

    #[must_use]
    pub fn response_schema(mut self, schema: Schema) -> Self {
        self.response_schema = Some(schema);
        self
    }

    fn schema_for(&self, source: Source, response: bool) -> Option<&Schema> {
        if response {
            return self.response_schema.as_ref();
        }
        match source {
            Source::Body => self.body_schema.as_ref(),
            Source::QueryParams => self.query_schema.as_ref(),
            // Path parameters are already constrained by the route matcher.
            Source::PathParams => None,
        }
    }
}

#[async_trait]
impl Validator for SchemaValidator {
    async fn validate(
        &self,
        data: Value,
        source: Source,
        response: bool,
        partial: bool,
    ) -> Result<Value, ApiError> {
        let Some(schema) = self.schema_for(source, response) else {
            return Ok(data);
        };

        match data {
            Value::Object(map) => Ok(Value::Object(schema.validate(&map, partial)?)),
            Value::Array(items) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    match item {
                        Value::Object(map) => {
                            out.push(Value::Object(schema.validate(&map, partial)?));
                        }
                        _ => return Err(ApiError::bad_request("expected a JSON object")),
                    }
                }
                Ok(Value::Array(out))
            }
            _ => Err(ApiError::bad_request("expected a JSON object")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldRule;
    use serde_json::json;

    fn validator() -> SchemaValidator {
        SchemaValidator::new()
            .body_schema(Schema::new().field("name", FieldRule::string().required()))
            .query_schema(Schema::new().field("quantity__lt", FieldRule::integer()))
    }

    #[tokio::test]
    async fn body_schema_applies_to_body_source() {
        let v = validator();
        let ok = v
            .validate(json!({"name": "a"}), Source::Body, false, false)
            .await;
        assert!(ok.is_ok());
        let err = v
            .validate(json!({}), Source::Body, false, false)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::ValidationFailed { .. }));
    }

    #[tokio::test]
    async fn query_schema_applies_to_query_source() {
        let v = validator();
        let out = v
            .validate(
                json!({"quantity__lt": "5"}),
                Source::QueryParams,
                false,
                false,
            )
            .await
            .unwrap();
        assert_eq!(out["quantity__lt"], json!(5));
    }

    #[tokio::test]
    async fn missing_schema_is_a_no_op() {
        let v = SchemaValidator::new();
        let data = json!({"anything": "goes"});
        let out = v
            .validate(data.clone(), Source::Body, false, false)
            .await
            .unwrap();
        assert_eq!(out, data);
    }

    #[tokio::test]
    async fn path_params_are_never_validated() {
        let v = validator();
        let data = json!({"name": 42});
        let out = v
            .validate(data.clone(), Source::PathParams, false, false)
            .await
            .unwrap();
        assert_eq!(out, data);
    }

    #[tokio::test]
    async fn response_schema_validates_each_array_element() {
        let v = SchemaValidator::new()
            .response_schema(Schema::new().field("id", FieldRule::integer().required()));
        let ok = v
            .validate(json!([{"id": 1}, {"id": 2}]), Source::Body, true, false)
            .await;
        assert!(ok.is_ok());
        let err = v
            .validate(json!([{"id": 1}, {}]), Source::Body, true, false)
            .await;
        assert!(err.is_err());
    }

    #[tokio::test]
    async fn scalar_data_is_rejected_when_a_schema_applies() {
        let v = validator();
        let err = v
            .validate(json!("nope"), Source::Body, false, false)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::BadRequest { .. }));
    }
}
