//! Query-filter to SQL WHERE-fragment translation.
//!
//! Filter keys are field names optionally suffixed with an operator token,
//! e.g. `name__like` or `quantity__lt`. The translator turns a validated
//! query-parameter mapping into a clause fragment plus a bind mapping:
//!
//! ```rust
//! use crudkit::filter::where_clause;
//! use serde_json::{json, Map};
//!
//! let mut params = Map::new();
//! params.insert("name__like".to_string(), json!("a%"));
//! let (clause, binds) = where_clause(&params).unwrap();
//! assert_eq!(clause, " and name like :name");
//! assert_eq!(binds["name"], json!("a%"));
//! ```

use serde_json::{Map, Value};
use std::fmt;

/// Separator between field name and operator suffix in a filter key.
pub const SEPARATOR: &str = "__";

/// Comparison operator decoded from a filter-key suffix. A bare key means
/// equality.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Like,
    Lt,
    Lte,
}

impl FilterOp {
    /// SQL symbol for this operator. Total: every variant renders.
    #[must_use]
    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Like => "like",
            Self::Lt => "<",
            Self::Lte => "<=",
        }
    }

    /// Look up a key suffix. `None` for unrecognized tokens.
    #[must_use]
    pub fn from_suffix(suffix: &str) -> Option<Self> {
        match suffix {
            "like" => Some(Self::Like),
            "lt" => Some(Self::Lt),
            "lte" => Some(Self::Lte),
            _ => None,
        }
    }
}

/// A malformed filter key. These indicate a misconfigured query schema, not
/// a client mistake: keys reach the translator only after validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterError {
    /// Key contains more than one `__` separator.
    TooManySeparators { key: String },
    /// Key suffix is not a known operator token.
    UnknownOperator { key: String, suffix: String },
}

impl fmt::Display for FilterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooManySeparators { key } => {
                write!(f, "filter key '{key}' contains more than one '{SEPARATOR}'")
            }
            Self::UnknownOperator { key, suffix } => {
                write!(f, "filter key '{key}' has unknown operator suffix '{suffix}'")
            }
        }
    }
}

impl std::error::Error for FilterError {}

/// Translate a validated query-parameter mapping into a WHERE-clause suffix
/// and its bind values.
///
/// Entries are visited in mapping order; entries with a `null` value are
/// skipped. Each accepted entry appends ` and <field> <op> :<field>` and
/// records the value under the bare field name. Two keys differing only by
/// operator suffix therefore overwrite each other's bind value while both
/// clauses remain in the fragment — unchanged legacy behavior.
///
/// # Errors
///
/// Fails on malformed keys; see [`FilterError`].
pub fn where_clause(
    params: &Map<String, Value>,
) -> Result<(String, Map<String, Value>), FilterError> {
    let mut clause = String::new();
    let mut values = Map::new();

    for (key, value) in params {
        if value.is_null() {
            continue;
        }

        let parts: Vec<&str> = key.split(SEPARATOR).collect();
        let (field, op) = match parts.as_slice() {
            [field] => (*field, FilterOp::Eq),
            [field, suffix] => {
                let op = FilterOp::from_suffix(suffix).ok_or(FilterError::UnknownOperator {
                    key: key.clone(),
                    suffix: (*suffix).to_string(),
                })?;
                (*field, op)
            }
            _ => return Err(FilterError::TooManySeparators { key: key.clone() }),
        };

        clause.push_str(&format!(" and {field} {} :{field}", op.as_sql()));
        values.insert(field.to_string(), value.clone());
    }

    Ok((clause, values))
}
