//! The processor contract and its SQL-backed implementation.
//!
//! A [`Processor`] executes the actual data operation for one CRUD verb,
//! taking already-validated data. [`SqlProcessor`] is the concrete variant:
//! it holds a shared [`DatabaseConnection`] and four integrator-authored SQL
//! templates with `:name` bind parameters, and translates "zero rows
//! affected" on update/delete into a 404.

use async_trait::async_trait;
use axum::http::StatusCode;
use sea_orm::{ConnectionTrait, DatabaseConnection, DbBackend, FromQueryResult, JsonValue, QueryResult, Statement};
use serde_json::{Map, Value};

use crate::errors::ApiError;
use crate::filter::where_clause;

/// Capability set executing one data operation per CRUD verb.
///
/// Every method has a default stub failing with 405, so a concrete processor
/// only implements the verbs its resource supports. `put` is part of the
/// contract for integrators that call processors directly; no route is wired
/// to it.
#[async_trait]
pub trait Processor: Send + Sync {
    async fn get(&self, validated: &Map<String, Value>) -> Result<Vec<Value>, ApiError> {
        let _ = validated;
        Err(unsupported("get"))
    }

    async fn post(&self, validated: &Map<String, Value>) -> Result<Value, ApiError> {
        let _ = validated;
        Err(unsupported("post"))
    }

    async fn put(&self, validated: &Map<String, Value>) -> Result<Value, ApiError> {
        let _ = validated;
        Err(unsupported("put"))
    }

    async fn patch(&self, validated: &Map<String, Value>) -> Result<Value, ApiError> {
        let _ = validated;
        Err(unsupported("patch"))
    }

    async fn delete(&self, validated: &Map<String, Value>) -> Result<(), ApiError> {
        let _ = validated;
        Err(unsupported("delete"))
    }
}

fn unsupported(verb: &str) -> ApiError {
    ApiError::custom(
        StatusCode::METHOD_NOT_ALLOWED,
        "Method Not Allowed",
        Some(format!("processor does not implement {verb}")),
    )
}

/// Per-resource SQL templates with `:name` bind parameters.
///
/// Conventions:
/// - `insert`, `update` and `delete` must end in a `RETURNING` clause; the
///   returned row (or its absence) drives the response.
/// - `select` must terminate with a WHERE clause the filter fragment can
///   extend, e.g. `select * from widgets where true`.
#[derive(Debug, Clone)]
pub struct SqlQueries {
    pub insert: String,
    pub select: String,
    pub update: String,
    pub delete: String,
}

/// [`Processor`] issuing parameterized queries against a shared database
/// connection. Rows come back as JSON objects keyed by column name.
pub struct SqlProcessor {
    db: DatabaseConnection,
    resource: String,
    queries: SqlQueries,
}

impl SqlProcessor {
    pub fn new(db: DatabaseConnection, resource: impl Into<String>, queries: SqlQueries) -> Self {
        Self {
            db,
            resource: resource.into(),
            queries,
        }
    }

    fn backend(&self) -> DbBackend {
        self.db.get_database_backend()
    }

    async fn fetch_one(
        &self,
        sql: &str,
        values: &Map<String, Value>,
    ) -> Result<Option<Value>, ApiError> {
        let stmt = bind_named(self.backend(), sql, values)?;
        tracing::debug!(sql = %stmt.sql, "executing query");
        let row = self.db.query_one(stmt).await?;
        row.as_ref().map(row_to_json).transpose()
    }

    fn not_found(&self, validated: &Map<String, Value>) -> ApiError {
        let id = validated.get("id").map(|v| match v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        });
        ApiError::not_found(self.resource.clone(), id)
    }
}

#[async_trait]
impl Processor for SqlProcessor {
    /// Insert a row and return it. Constraint violations and other database
    /// failures propagate untranslated (a 500 at the response boundary).
    async fn post(&self, validated: &Map<String, Value>) -> Result<Value, ApiError> {
        self.fetch_one(&self.queries.insert, validated)
            .await?
            .ok_or_else(|| {
                ApiError::internal(
                    "A database error occurred".to_string(),
                    Some("insert query returned no row; is RETURNING present?".to_string()),
                )
            })
    }

    /// Select all rows matching the filter derived from the validated query
    /// parameters. An empty result set is an empty vec, not an error.
    async fn get(&self, validated: &Map<String, Value>) -> Result<Vec<Value>, ApiError> {
        let (clause, values) = where_clause(validated)?;
        let sql = format!("{}{clause}", self.queries.select);
        let stmt = bind_named(self.backend(), &sql, &values)?;
        tracing::debug!(sql = %stmt.sql, "executing query");
        let rows = self.db.query_all(stmt).await?;
        rows.iter().map(row_to_json).collect()
    }

    /// Update a row; zero rows matched is a 404.
    async fn patch(&self, validated: &Map<String, Value>) -> Result<Value, ApiError> {
        self.fetch_one(&self.queries.update, validated)
            .await?
            .ok_or_else(|| self.not_found(validated))
    }

    /// Delete a row; zero rows matched is a 404.
    async fn delete(&self, validated: &Map<String, Value>) -> Result<(), ApiError> {
        self.fetch_one(&self.queries.delete, validated)
            .await?
            .map(|_| ())
            .ok_or_else(|| self.not_found(validated))
    }
}

fn row_to_json(row: &QueryResult) -> Result<Value, ApiError> {
    Ok(JsonValue::from_query_result(row, "")?)
}

/// Rewrite `:name` placeholders to the backend's positional form and collect
/// bind values in order of appearance. Quoted literals are copied verbatim
/// and `::` casts are left alone. A placeholder naming a field absent from
/// `values` is a configuration error (500), never a client error.
fn bind_named(
    backend: DbBackend,
    sql: &str,
    values: &Map<String, Value>,
) -> Result<Statement, ApiError> {
    let mut out = String::with_capacity(sql.len());
    let mut binds: Vec<sea_orm::Value> = Vec::new();
    let mut chars = sql.char_indices().peekable();

    while let Some((_, c)) = chars.next() {
        match c {
            '\'' => {
                out.push(c);
                for (_, q) in chars.by_ref() {
                    out.push(q);
                    if q == '\'' {
                        break;
                    }
                }
            }
            ':' => {
                if matches!(chars.peek(), Some((_, ':'))) {
                    chars.next();
                    out.push_str("::");
                    continue;
                }
                let mut name = String::new();
                while let Some(&(_, nc)) = chars.peek() {
                    if nc.is_ascii_alphanumeric() || nc == '_' {
                        name.push(nc);
                        chars.next();
                    } else {
                        break;
                    }
                }
                if name.is_empty() {
                    out.push(':');
                    continue;
                }
                let value = values.get(&name).ok_or_else(|| {
                    ApiError::internal(
                        "Internal server error".to_string(),
                        Some(format!("no bind value for :{name}")),
                    )
                })?;
                binds.push(to_sea_value(value));
                if backend == DbBackend::Postgres {
                    out.push_str(&format!("${}", binds.len()));
                } else {
                    out.push('?');
                }
            }
            _ => out.push(c),
        }
    }

    Ok(Statement::from_sql_and_values(backend, out, binds))
}

fn to_sea_value(v: &Value) -> sea_orm::Value {
    match v {
        Value::Null => sea_orm::Value::String(None),
        Value::Bool(b) => (*b).into(),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                i.into()
            } else if let Some(u) = n.as_u64() {
                u.into()
            } else {
                n.as_f64().unwrap_or(0.0).into()
            }
        }
        Value::String(s) => s.clone().into(),
        other => sea_orm::Value::Json(Some(Box::new(other.clone()))),
    }
}
