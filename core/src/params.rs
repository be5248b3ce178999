//! Parameter values and their normalization.
//!
//! Path, query, header and form parameters are all carried as [`ParamValue`].
//! Before a request is built every map goes through [`normalize`], which
//! drops absent entries, keeps sequences and file-like content as they are,
//! and renders everything else to text.

use std::collections::BTreeMap;
use std::str::FromStr;

use bytes::Bytes;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;

use crate::error::ApiError;

/// Named parameters of one kind (path, query, header or form).
pub type ParamMap = BTreeMap<String, ParamValue>;

/// File content attached to a multipart request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePart {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub content: Bytes,
}

impl FilePart {
    pub fn new(file_name: impl Into<String>, content: impl Into<Bytes>) -> Self {
        Self {
            file_name: Some(file_name.into()),
            content_type: None,
            content: content.into(),
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

/// A parameter value before or after normalization.
///
/// `Absent` stands for "null or unset". Falsy-looking values such as `0`,
/// `""` and `false` are present.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Absent,
    Text(String),
    Bool(bool),
    Integer(i64),
    Number(f64),
    Date(DateTime<Utc>),
    File(FilePart),
    Bytes(Bytes),
    Sequence(Vec<ParamValue>),
}

impl ParamValue {
    pub fn is_absent(&self) -> bool {
        is_absent(self)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ParamValue::Text(text) => Some(text),
            _ => None,
        }
    }
}

/// True only for null/unset values.
pub fn is_absent(value: &ParamValue) -> bool {
    matches!(value, ParamValue::Absent)
}

/// True for values that must travel as file content rather than text.
pub fn is_file_param(value: &ParamValue) -> bool {
    matches!(value, ParamValue::File(_) | ParamValue::Bytes(_))
}

/// Renders a parameter in its natural string form.
pub fn param_to_string(value: &ParamValue) -> String {
    match value {
        ParamValue::Absent => String::new(),
        ParamValue::Text(text) => text.clone(),
        ParamValue::Bool(flag) => flag.to_string(),
        ParamValue::Integer(n) => n.to_string(),
        ParamValue::Number(n) => number_to_string(*n),
        ParamValue::Date(date) => date.to_rfc3339_opts(SecondsFormat::Millis, true),
        ParamValue::File(file) => String::from_utf8_lossy(&file.content).into_owned(),
        ParamValue::Bytes(bytes) => String::from_utf8_lossy(bytes).into_owned(),
        ParamValue::Sequence(items) => items
            .iter()
            .map(param_to_string)
            .collect::<Vec<_>>()
            .join(","),
    }
}

/// Integral floats print without a fractional part, everything else in
/// shortest round-trip form.
pub(crate) fn number_to_string(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e21 {
        format!("{n:.0}")
    } else if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        let sign = if n > 0.0 { "" } else { "-" };
        format!("{sign}Infinity")
    } else {
        n.to_string()
    }
}

/// Drops absent entries, keeps sequences and file-like values untouched and
/// stringifies the rest.
pub fn normalize(params: &ParamMap) -> ParamMap {
    params
        .iter()
        .filter(|(_, value)| !is_absent(value))
        .map(|(key, value)| {
            let normalized = match value {
                ParamValue::Sequence(_) | ParamValue::File(_) | ParamValue::Bytes(_) => {
                    value.clone()
                }
                other => ParamValue::Text(param_to_string(other)),
            };
            (key.clone(), normalized)
        })
        .collect()
}

/// Array serialization strategies for collection-valued parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionFormat {
    /// Comma-separated values.
    Csv,
    /// Space-separated values.
    Ssv,
    /// Tab-separated values.
    Tsv,
    /// Pipe-separated values.
    Pipes,
    /// Repeated parameter, one value per occurrence.
    Multi,
}

impl CollectionFormat {
    fn separator(self) -> Option<&'static str> {
        match self {
            CollectionFormat::Csv => Some(","),
            CollectionFormat::Ssv => Some(" "),
            CollectionFormat::Tsv => Some("\t"),
            CollectionFormat::Pipes => Some("|"),
            CollectionFormat::Multi => None,
        }
    }
}

impl FromStr for CollectionFormat {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "csv" => Ok(CollectionFormat::Csv),
            "ssv" => Ok(CollectionFormat::Ssv),
            "tsv" => Ok(CollectionFormat::Tsv),
            "pipes" => Ok(CollectionFormat::Pipes),
            "multi" => Ok(CollectionFormat::Multi),
            other => Err(ApiError::UnknownCollectionFormat(other.to_string())),
        }
    }
}

/// Serializes a collection parameter with the given strategy.
///
/// A scalar is treated as a one-element collection. `Multi` keeps the
/// elements apart so the transport repeats the parameter.
pub fn build_collection_param(param: &ParamValue, format: CollectionFormat) -> ParamValue {
    let items: Vec<String> = match param {
        ParamValue::Absent => return ParamValue::Absent,
        ParamValue::Sequence(items) => items.iter().map(param_to_string).collect(),
        other => vec![param_to_string(other)],
    };
    match format.separator() {
        Some(separator) => ParamValue::Text(items.join(separator)),
        None => ParamValue::Sequence(items.into_iter().map(ParamValue::Text).collect()),
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Text(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::Text(value)
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::Bool(value)
    }
}

impl From<i32> for ParamValue {
    fn from(value: i32) -> Self {
        ParamValue::Integer(i64::from(value))
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        ParamValue::Integer(value)
    }
}

impl From<u32> for ParamValue {
    fn from(value: u32) -> Self {
        ParamValue::Integer(i64::from(value))
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        ParamValue::Number(value)
    }
}

impl From<DateTime<Utc>> for ParamValue {
    fn from(value: DateTime<Utc>) -> Self {
        ParamValue::Date(value)
    }
}

impl From<FilePart> for ParamValue {
    fn from(value: FilePart) -> Self {
        ParamValue::File(value)
    }
}

impl From<Bytes> for ParamValue {
    fn from(value: Bytes) -> Self {
        ParamValue::Bytes(value)
    }
}

impl<T: Into<ParamValue>> From<Vec<T>> for ParamValue {
    fn from(values: Vec<T>) -> Self {
        ParamValue::Sequence(values.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<ParamValue>> From<Option<T>> for ParamValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(ParamValue::Absent, Into::into)
    }
}

impl From<Value> for ParamValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => ParamValue::Absent,
            Value::Bool(flag) => ParamValue::Bool(flag),
            Value::Number(n) => match n.as_i64() {
                Some(i) => ParamValue::Integer(i),
                None => ParamValue::Number(n.as_f64().unwrap_or(f64::NAN)),
            },
            Value::String(text) => ParamValue::Text(text),
            Value::Array(items) => {
                ParamValue::Sequence(items.into_iter().map(ParamValue::from).collect())
            }
            object @ Value::Object(_) => ParamValue::Text(object.to_string()),
        }
    }
}
