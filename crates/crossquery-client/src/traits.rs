//! QueryClient trait definition and the wire-level types it exchanges.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{ClientError, ClientResult};

/// Comparison operator of a filter condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterOp {
    Eq,
    In,
    Gte,
    Lte,
    Exists,
}

/// A single `(field, operator, value)` condition. Conditions in one query are ANDed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterCondition {
    pub field: String,
    pub op: FilterOp,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub value: Value,
}

impl FilterCondition {
    pub fn new(field: impl Into<String>, op: FilterOp, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            op,
            value: value.into(),
        }
    }

    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, FilterOp::Eq, value)
    }

    /// Membership condition. Each element counts against the remote OR-clause limit.
    pub fn in_set<I, V>(field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();
        Self::new(field, FilterOp::In, Value::Array(values))
    }

    pub fn gte(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, FilterOp::Gte, value)
    }

    pub fn lte(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, FilterOp::Lte, value)
    }

    pub fn exists(field: impl Into<String>) -> Self {
        Self::new(field, FilterOp::Exists, Value::Null)
    }

    /// Number of values this condition contributes to the OR-clause budget.
    pub fn or_clause_count(&self) -> usize {
        match (&self.op, &self.value) {
            (FilterOp::In, Value::Array(values)) => values.len(),
            _ => 1,
        }
    }
}

/// Opaque continuation handle for the next page of a query.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cursor(String);

impl Cursor {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A read-only snapshot of one remote entity, keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Map<String, Value>);

impl Record {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// Builds a record from a JSON value, which must be an object.
    pub fn from_value(value: Value) -> ClientResult<Self> {
        match value {
            Value::Object(fields) => Ok(Self(fields)),
            other => Err(ClientError::MalformedResponse {
                message: format!("expected a JSON object, got {other}"),
            }),
        }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field).filter(|v| !v.is_null())
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_fields(self) -> Map<String, Value> {
        self.0
    }

    /// Returns the record identifier. A record without an integer `id` is malformed.
    pub fn id(&self) -> ClientResult<i64> {
        self.int_field("id")?.ok_or_else(|| ClientError::MalformedField {
            field: "id".to_string(),
            message: "record has no identifier".to_string(),
        })
    }

    /// Reads an optional integer field; absent and null both map to `None`.
    pub fn int_field(&self, field: &str) -> ClientResult<Option<i64>> {
        let Some(value) = self.get(field) else {
            return Ok(None);
        };
        if let Some(n) = value.as_i64() {
            return Ok(Some(n));
        }
        // Some remotes serialize integral ids as floats (e.g. 29682885.0).
        match value.as_f64() {
            Some(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => Ok(Some(f as i64)),
            _ => Err(ClientError::MalformedField {
                field: field.to_string(),
                message: format!("expected an integer, got {value}"),
            }),
        }
    }

    pub fn str_field(&self, field: &str) -> ClientResult<Option<&str>> {
        match self.get(field) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.as_str())),
            Some(other) => Err(ClientError::MalformedField {
                field: field.to_string(),
                message: format!("expected a string, got {other}"),
            }),
        }
    }

    pub fn bool_field(&self, field: &str) -> ClientResult<Option<bool>> {
        match self.get(field) {
            None => Ok(None),
            Some(Value::Bool(b)) => Ok(Some(*b)),
            Some(other) => Err(ClientError::MalformedField {
                field: field.to_string(),
                message: format!("expected a boolean, got {other}"),
            }),
        }
    }

    /// Returns a copy holding only `id` plus the requested fields.
    /// An empty projection keeps every field.
    pub fn project(&self, fields: &[String]) -> Self {
        if fields.is_empty() {
            return self.clone();
        }
        let projected = self
            .0
            .iter()
            .filter(|(name, _)| name.as_str() == "id" || fields.iter().any(|f| f == *name))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();
        Self(projected)
    }
}

impl From<Map<String, Value>> for Record {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}

/// One page of query results.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub records: Vec<Record>,
    /// Present when more pages follow this one.
    pub next_cursor: Option<Cursor>,
}

impl Page {
    pub fn is_last(&self) -> bool {
        self.next_cursor.is_none()
    }
}

/// Abstract interface to the remote record-keeping service.
///
/// Implementations must be thread-safe (Send + Sync). Each call is a single
/// request; retries and authentication belong to the implementation.
#[async_trait]
pub trait QueryClient: Send + Sync {
    /// Executes a fresh filtered query against `entity`, returning the first page.
    ///
    /// An empty `fields` projection returns all fields.
    async fn query(
        &self,
        entity: &str,
        filters: &[FilterCondition],
        fields: &[String],
    ) -> ClientResult<Page>;

    /// Follows a continuation cursor returned by a previous page.
    async fn advance(&self, cursor: &Cursor) -> ClientResult<Page>;
}
