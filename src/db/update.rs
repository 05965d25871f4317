//! Partial updates over a whitelisted set of columns.
//!
//! Client values never reach the SQL text: the builder only emits
//! `column = ?` fragments whose column names come from the static whitelist,
//! and every value travels as a bound parameter tagged with its bind kind.

use std::{collections::HashMap, fmt};

use serde_json::{Map, Value};
use thiserror::Error;

/// A request value, classified once at the JSON boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Integer(i64),
    Float(f64),
    Text(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindKind {
    Integer,
    Float,
    Text,
}

impl FieldValue {
    /// `None` for JSON `null`, which counts as "not provided".
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::Number(n) => Some(match n.as_i64() {
                Some(i) => FieldValue::Integer(i),
                None => n
                    .as_f64()
                    .map(FieldValue::Float)
                    .unwrap_or_else(|| FieldValue::Text(n.to_string())),
            }),
            Value::String(s) => Some(FieldValue::Text(s.clone())),
            Value::Bool(b) => Some(FieldValue::Text(if *b { "1" } else { "0" }.to_string())),
            other => Some(FieldValue::Text(other.to_string())),
        }
    }

    /// Integers, and text holding one.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FieldValue::Integer(v) => Some(*v),
            FieldValue::Float(_) => None,
            FieldValue::Text(s) => s.trim().parse().ok(),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Integer(v) => Some(*v as f64),
            FieldValue::Float(v) => Some(*v),
            FieldValue::Text(s) => s.trim().parse().ok().filter(|f: &f64| f.is_finite()),
        }
    }

    /// Empty in the loose sense create validation uses: `""`, `"0"`, `0` and
    /// `0.0`. Whitespace is not empty.
    pub fn is_empty(&self) -> bool {
        match self {
            FieldValue::Integer(v) => *v == 0,
            FieldValue::Float(v) => *v == 0.0,
            FieldValue::Text(s) => s.is_empty() || s == "0",
        }
    }

    /// Lenient integer conversion: floats truncate, text yields its leading
    /// integer (`"12abc"` is 12) and anything unparseable is 0.
    pub fn to_int_lossy(&self) -> i64 {
        match self {
            FieldValue::Integer(v) => *v,
            FieldValue::Float(v) if v.is_finite() => v.trunc() as i64,
            FieldValue::Float(_) => 0,
            FieldValue::Text(s) => {
                let s = s.trim_start();
                let digits = s
                    .char_indices()
                    .take_while(|&(i, c)| c.is_ascii_digit() || (i == 0 && (c == '-' || c == '+')))
                    .count();
                s[..digits].parse().unwrap_or(0)
            }
        }
    }

    pub fn kind(&self) -> BindKind {
        match self {
            FieldValue::Integer(_) => BindKind::Integer,
            FieldValue::Float(_) => BindKind::Float,
            FieldValue::Text(_) => BindKind::Text,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Integer(v) => write!(f, "{v}"),
            FieldValue::Float(v) => write!(f, "{v}"),
            FieldValue::Text(s) => f.write_str(s),
        }
    }
}

pub type FieldMap = HashMap<String, FieldValue>;

/// Classifies every non-null member of a decoded JSON object.
pub fn field_map(body: &Map<String, Value>) -> FieldMap {
    body.iter()
        .filter_map(|(k, v)| FieldValue::from_json(v).map(|fv| (k.clone(), fv)))
        .collect()
}

/// Table metadata the handlers share with the builder.
#[derive(Debug, Clone, Copy)]
pub struct Resource {
    pub table: &'static str,
    pub key: &'static str,
    pub writable: &'static [&'static str],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("No fields to update")]
pub struct EmptyUpdate;

/// `UPDATE <table> SET <columns = ?...> WHERE <key> = ?` plus its bound values.
///
/// `params` lines up with `columns` one to one and ends with the target id.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterizedUpdate {
    pub table: &'static str,
    pub key: &'static str,
    pub columns: Vec<&'static str>,
    pub params: Vec<FieldValue>,
}

impl ParameterizedUpdate {
    pub fn assignments(&self) -> Vec<String> {
        self.columns.iter().map(|c| format!("{c} = ?")).collect()
    }

    pub fn sql(&self) -> String {
        format!(
            "UPDATE {} SET {} WHERE {} = ?",
            self.table,
            self.assignments().join(", "),
            self.key
        )
    }

    pub fn target_id(&self) -> Option<i64> {
        match self.params.last() {
            Some(FieldValue::Integer(id)) => Some(*id),
            _ => None,
        }
    }
}

pub struct UpdateBuilder {
    resource: Resource,
}

impl UpdateBuilder {
    pub fn new(resource: Resource) -> Self {
        Self { resource }
    }

    /// Keeps only whitelisted keys, in whitelist order, and appends the id as
    /// the final integer parameter. Unknown keys are ignored.
    pub fn build(
        &self,
        provided: &FieldMap,
        target_id: i64,
    ) -> Result<ParameterizedUpdate, EmptyUpdate> {
        let mut columns = Vec::new();
        let mut params = Vec::new();
        for &column in self.resource.writable {
            if let Some(value) = provided.get(column) {
                columns.push(column);
                params.push(value.clone());
            }
        }
        if columns.is_empty() {
            return Err(EmptyUpdate);
        }
        params.push(FieldValue::Integer(target_id));

        Ok(ParameterizedUpdate {
            table: self.resource.table,
            key: self.resource.key,
            columns,
            params,
        })
    }
}
