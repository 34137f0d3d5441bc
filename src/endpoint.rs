//! Endpoint composition: one validator + one processor + a verb subset.
//!
//! Each enabled verb maps to a fixed validate → process pipeline. Dispatch
//! selects the pipeline function per verb; there is no inheritance-style
//! merging of behaviors.

use serde_json::{Map, Value};
use std::sync::Arc;

use crate::errors::ApiError;
use crate::processor::Processor;
use crate::validator::{Source, Validator};

/// HTTP verbs an endpoint can expose.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Get,
    Post,
    Patch,
    Delete,
}

/// A CRUD resource endpoint.
///
/// ```rust,ignore
/// let endpoint = CrudEndpoint::new(validator, processor)
///     .with_verbs(&[Verb::Get, Verb::Post]);
/// ```
pub struct CrudEndpoint {
    validator: Arc<dyn Validator>,
    processor: Arc<dyn Processor>,
    verbs: Vec<Verb>,
}

impl CrudEndpoint {
    /// Build an endpoint exposing all four verbs.
    pub fn new(validator: Arc<dyn Validator>, processor: Arc<dyn Processor>) -> Self {
        Self {
            validator,
            processor,
            verbs: vec![Verb::Get, Verb::Post, Verb::Patch, Verb::Delete],
        }
    }

    /// Restrict the endpoint to a subset of verbs.
    #[must_use]
    pub fn with_verbs(mut self, verbs: &[Verb]) -> Self {
        self.verbs = verbs.to_vec();
        self
    }

    #[must_use]
    pub fn supports(&self, verb: Verb) -> bool {
        self.verbs.contains(&verb)
    }

    /// POST pipeline: validate body and query parameters against their
    /// schemas, merge with query values winning on key collision, and insert.
    pub async fn create(
        &self,
        body: Value,
        query: Map<String, Value>,
    ) -> Result<Value, ApiError> {
        let validated_body = self
            .validator
            .validate(body, Source::Body, false, false)
            .await?;
        let validated_query = self
            .validator
            .validate(Value::Object(query), Source::QueryParams, false, false)
            .await?;

        let mut merged = into_object(validated_body)?;
        for (key, value) in into_object(validated_query)? {
            merged.insert(key, value);
        }
        self.processor.post(&merged).await
    }

    /// GET pipeline: validate query parameters and list matching rows.
    pub async fn read(&self, query: Map<String, Value>) -> Result<Vec<Value>, ApiError> {
        let validated = self
            .validator
            .validate(Value::Object(query), Source::QueryParams, false, false)
            .await?;
        self.processor.get(&into_object(validated)?).await
    }

    /// PATCH pipeline: validate the body, merge in raw path parameters (the
    /// route matcher already constrained their types; path values win), and
    /// update.
    pub async fn update(
        &self,
        body: Value,
        path_params: Map<String, Value>,
    ) -> Result<Value, ApiError> {
        let validated = self
            .validator
            .validate(body, Source::Body, false, false)
            .await?;
        let mut merged = into_object(validated)?;
        for (key, value) in path_params {
            merged.insert(key, value);
        }
        self.processor.patch(&merged).await
    }

    /// DELETE pipeline: raw path parameters straight to the processor, no
    /// validation step.
    pub async fn delete(&self, path_params: Map<String, Value>) -> Result<(), ApiError> {
        self.processor.delete(&path_params).await
    }
}

fn into_object(value: Value) -> Result<Map<String, Value>, ApiError> {
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(ApiError::bad_request("request body must be a JSON object")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    /// Records what the endpoint hands to each verb.
    #[derive(Default)]
    struct RecordingProcessor {
        seen: Mutex<Option<Map<String, Value>>>,
    }

    #[async_trait]
    impl Processor for RecordingProcessor {
        async fn post(&self, validated: &Map<String, Value>) -> Result<Value, ApiError> {
            *self.seen.lock().unwrap() = Some(validated.clone());
            Ok(Value::Object(validated.clone()))
        }

        async fn get(&self, validated: &Map<String, Value>) -> Result<Vec<Value>, ApiError> {
            *self.seen.lock().unwrap() = Some(validated.clone());
            Ok(vec![])
        }

        async fn patch(&self, validated: &Map<String, Value>) -> Result<Value, ApiError> {
            *self.seen.lock().unwrap() = Some(validated.clone());
            Ok(Value::Object(validated.clone()))
        }

        async fn delete(&self, validated: &Map<String, Value>) -> Result<(), ApiError> {
            *self.seen.lock().unwrap() = Some(validated.clone());
            Ok(())
        }
    }

    /// Passes everything through unchanged.
    struct NoopValidator;

    #[async_trait]
    impl Validator for NoopValidator {
        async fn validate(
            &self,
            data: Value,
            _source: Source,
            _response: bool,
            _partial: bool,
        ) -> Result<Value, ApiError> {
            Ok(data)
        }
    }

    fn endpoint() -> (CrudEndpoint, Arc<RecordingProcessor>) {
        let processor = Arc::new(RecordingProcessor::default());
        let endpoint = CrudEndpoint::new(Arc::new(NoopValidator), processor.clone());
        (endpoint, processor)
    }

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected an object"),
        }
    }

    #[tokio::test]
    async fn create_merges_query_over_body() {
        let (endpoint, processor) = endpoint();
        endpoint
            .create(
                json!({"name": "body", "kept": 1}),
                object(json!({"name": "query"})),
            )
            .await
            .unwrap();
        let seen = processor.seen.lock().unwrap().clone().unwrap();
        assert_eq!(seen["name"], json!("query"));
        assert_eq!(seen["kept"], json!(1));
    }

    #[tokio::test]
    async fn update_merges_path_params_over_body() {
        let (endpoint, processor) = endpoint();
        endpoint
            .update(json!({"name": "b", "id": 99}), object(json!({"id": 1})))
            .await
            .unwrap();
        let seen = processor.seen.lock().unwrap().clone().unwrap();
        assert_eq!(seen["id"], json!(1));
        assert_eq!(seen["name"], json!("b"));
    }

    #[tokio::test]
    async fn delete_passes_path_params_unvalidated() {
        let (endpoint, processor) = endpoint();
        endpoint.delete(object(json!({"id": 7}))).await.unwrap();
        let seen = processor.seen.lock().unwrap().clone().unwrap();
        assert_eq!(seen["id"], json!(7));
    }

    #[tokio::test]
    async fn non_object_body_is_a_bad_request() {
        let (endpoint, _) = endpoint();
        let err = endpoint
            .create(json!([1, 2]), Map::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::BadRequest { .. }));
    }

    #[test]
    fn verb_subset_is_respected() {
        let (endpoint, _) = endpoint();
        let endpoint = endpoint.with_verbs(&[Verb::Get]);
        assert!(endpoint.supports(Verb::Get));
        assert!(!endpoint.supports(Verb::Post));
        assert!(!endpoint.supports(Verb::Delete));
    }
}
