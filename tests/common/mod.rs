#![allow(dead_code)]

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use crudkit::{
    CrudEndpoint, FieldRule, IdKind, Schema, SchemaValidator, SqlProcessor, SqlQueries, Verb,
    crud_routes,
};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

pub async fn setup_widgets_db() -> DatabaseConnection {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    let db = Database::connect("sqlite::memory:")
        .await
        .expect("failed to connect to sqlite");
    db.execute_unprepared(
        "create table widgets (
            id integer primary key autoincrement,
            name text not null
        )",
    )
    .await
    .expect("failed to create widgets table");
    db
}

pub fn widgets_queries() -> SqlQueries {
    SqlQueries {
        insert: "insert into widgets (name) values (:name) returning *".to_string(),
        select: "select * from widgets where true".to_string(),
        update: "update widgets set name = :name where id = :id returning *".to_string(),
        delete: "delete from widgets where id = :id returning id".to_string(),
    }
}

pub fn widgets_validator() -> SchemaValidator {
    SchemaValidator::new()
        .body_schema(Schema::new().field("name", FieldRule::string().required().min_length(1)))
        .query_schema(
            Schema::new()
                .field("name", FieldRule::string())
                .field("name__like", FieldRule::string())
                .field("id__lt", FieldRule::integer())
                .field("id__lte", FieldRule::integer()),
        )
}

pub fn widgets_endpoint(db: DatabaseConnection) -> Arc<CrudEndpoint> {
    let processor = SqlProcessor::new(db, "widget", widgets_queries());
    Arc::new(CrudEndpoint::new(
        Arc::new(widgets_validator()),
        Arc::new(processor),
    ))
}

pub fn widgets_app(db: DatabaseConnection) -> Router {
    crud_routes("/widgets", widgets_endpoint(db), IdKind::Int)
}

pub fn read_only_widgets_app(db: DatabaseConnection) -> Router {
    let processor = SqlProcessor::new(db, "widget", widgets_queries());
    let endpoint = Arc::new(
        CrudEndpoint::new(Arc::new(widgets_validator()), Arc::new(processor))
            .with_verbs(&[Verb::Get]),
    );
    crud_routes("/widgets", endpoint, IdKind::Int)
}

pub async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Vec<u8>) {
    let request = match body {
        Some(json) => Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_string(&json).unwrap()))
            .unwrap(),
        None => Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, bytes.to_vec())
}

pub fn json_body(bytes: &[u8]) -> Value {
    serde_json::from_slice(bytes).expect("response body was not valid JSON")
}
