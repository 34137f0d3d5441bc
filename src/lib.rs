pub mod endpoint;
pub mod errors;
pub mod filter;
pub mod processor;
pub mod routes;
pub mod schema;
pub mod validator;

pub use endpoint::{CrudEndpoint, Verb};
pub use errors::ApiError;
pub use filter::{where_clause, FilterOp};
pub use processor::{Processor, SqlProcessor, SqlQueries};
pub use routes::{crud_routes, IdKind};
pub use schema::{FieldRule, FieldType, Schema, ValidationError, ValidationErrors};
pub use validator::{SchemaValidator, Source, Validator};
