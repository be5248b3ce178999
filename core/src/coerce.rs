//! Coercion of raw JSON into typed values.
//!
//! # Design
//! The shape of an expected result is declared as a closed [`ResultShape`]
//! tree and matched exhaustively. Coercion never fails: values that do not
//! fit a primitive become `TypedValue::Null`, containers that do not match
//! their shape are passed through as `TypedValue::Opaque`.

use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, LazyLock};

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;
use serde_json::Value;

use crate::params::number_to_string;
use crate::types::Model;

/// Builds a model value from raw data; used by [`ResultShape::Custom`].
pub type ModelFactory = fn(&Value) -> TypedValue;

/// Primitive type tags understood by [`convert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveType {
    Boolean,
    Integer,
    Number,
    String,
    Date,
}

impl FromStr for PrimitiveType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Boolean" => Ok(PrimitiveType::Boolean),
            "Integer" => Ok(PrimitiveType::Integer),
            "Number" => Ok(PrimitiveType::Number),
            "String" => Ok(PrimitiveType::String),
            "Date" => Ok(PrimitiveType::Date),
            other => Err(other.to_string()),
        }
    }
}

/// Declarative description of how to coerce a response body.
#[derive(Clone)]
pub enum ResultShape {
    Primitive(PrimitiveType),
    Array(Box<ResultShape>),
    Map {
        key: PrimitiveType,
        value: Box<ResultShape>,
    },
    Custom(ModelFactory),
    /// Generic structured data, returned as is.
    Opaque,
}

impl fmt::Debug for ResultShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResultShape::Primitive(tag) => f.debug_tuple("Primitive").field(tag).finish(),
            ResultShape::Array(item) => f.debug_tuple("Array").field(item).finish(),
            ResultShape::Map { key, value } => f
                .debug_struct("Map")
                .field("key", key)
                .field("value", value)
                .finish(),
            ResultShape::Custom(_) => f.write_str("Custom(..)"),
            ResultShape::Opaque => f.write_str("Opaque"),
        }
    }
}

impl ResultShape {
    pub fn array(item: ResultShape) -> Self {
        ResultShape::Array(Box::new(item))
    }

    pub fn map(key: PrimitiveType, value: ResultShape) -> Self {
        ResultShape::Map {
            key,
            value: Box::new(value),
        }
    }

    /// Parses a textual type tag.
    ///
    /// `Boolean`, `Integer`, `Number`, `String` and `Date` are primitives,
    /// `[T]` is an array of `T` and `{K:V}` a map. `Object` and any tag
    /// that is not recognized yield `Opaque`, so the raw value comes back
    /// unchanged.
    pub fn from_tag(tag: &str) -> Self {
        let tag = tag.trim();
        if let Some(inner) = tag.strip_prefix('[').and_then(|t| t.strip_suffix(']')) {
            return ResultShape::array(ResultShape::from_tag(inner));
        }
        if let Some(inner) = tag.strip_prefix('{').and_then(|t| t.strip_suffix('}')) {
            if let Some((key, value)) = inner.split_once(':') {
                let key = key.trim().parse().unwrap_or(PrimitiveType::String);
                return ResultShape::map(key, ResultShape::from_tag(value));
            }
            return ResultShape::Opaque;
        }
        match tag.parse() {
            Ok(primitive) => ResultShape::Primitive(primitive),
            Err(_) => ResultShape::Opaque,
        }
    }
}

impl From<PrimitiveType> for ResultShape {
    fn from(tag: PrimitiveType) -> Self {
        ResultShape::Primitive(tag)
    }
}

/// The typed result of coercing raw data through a [`ResultShape`].
#[derive(Debug, Clone)]
pub enum TypedValue {
    Null,
    Bool(bool),
    Integer(i64),
    Number(f64),
    String(String),
    Date(DateTime<Utc>),
    Array(Vec<TypedValue>),
    /// Converted key/value pairs in source order.
    Map(Vec<(TypedValue, TypedValue)>),
    Model(Arc<dyn Model>),
    Opaque(Value),
}

impl TypedValue {
    pub fn is_null(&self) -> bool {
        matches!(self, TypedValue::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            TypedValue::Bool(flag) => Some(*flag),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            TypedValue::Integer(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            TypedValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            TypedValue::String(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<DateTime<Utc>> {
        match self {
            TypedValue::Date(date) => Some(*date),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[TypedValue]> {
        match self {
            TypedValue::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            TypedValue::Opaque(value) => Some(value),
            _ => None,
        }
    }

    /// Downcasts a model value to its concrete type.
    pub fn as_model<T: Model>(&self) -> Option<&T> {
        match self {
            TypedValue::Model(model) => model.as_any().downcast_ref::<T>(),
            _ => None,
        }
    }

    /// Looks up a map entry by the string form of its key.
    pub fn get(&self, key: &str) -> Option<&TypedValue> {
        match self {
            TypedValue::Map(entries) => entries
                .iter()
                .find(|(k, _)| k.key_string().as_deref() == Some(key))
                .map(|(_, v)| v),
            _ => None,
        }
    }

    fn key_string(&self) -> Option<String> {
        match self {
            TypedValue::String(text) => Some(text.clone()),
            TypedValue::Integer(n) => Some(n.to_string()),
            TypedValue::Number(n) => Some(number_to_string(*n)),
            TypedValue::Bool(flag) => Some(flag.to_string()),
            _ => None,
        }
    }

    /// Renders the value back to JSON.
    pub fn to_json(&self) -> Value {
        match self {
            TypedValue::Null => Value::Null,
            TypedValue::Bool(flag) => Value::Bool(*flag),
            TypedValue::Integer(n) => Value::from(*n),
            TypedValue::Number(n) => Value::from(*n),
            TypedValue::String(text) => Value::String(text.clone()),
            TypedValue::Date(date) => Value::String(date.to_rfc3339()),
            TypedValue::Array(items) => Value::Array(items.iter().map(Self::to_json).collect()),
            TypedValue::Map(entries) => Value::Object(
                entries
                    .iter()
                    .map(|(k, v)| {
                        let key = k.key_string().unwrap_or_else(|| k.to_json().to_string());
                        (key, v.to_json())
                    })
                    .collect(),
            ),
            TypedValue::Model(model) => model.to_json(),
            TypedValue::Opaque(value) => value.clone(),
        }
    }
}

impl PartialEq for TypedValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (TypedValue::Null, TypedValue::Null) => true,
            (TypedValue::Bool(a), TypedValue::Bool(b)) => a == b,
            (TypedValue::Integer(a), TypedValue::Integer(b)) => a == b,
            (TypedValue::Number(a), TypedValue::Number(b)) => a == b,
            (TypedValue::String(a), TypedValue::String(b)) => a == b,
            (TypedValue::Date(a), TypedValue::Date(b)) => a == b,
            (TypedValue::Array(a), TypedValue::Array(b)) => a == b,
            (TypedValue::Map(a), TypedValue::Map(b)) => a == b,
            (TypedValue::Model(a), TypedValue::Model(b)) => {
                a.as_any().type_id() == b.as_any().type_id() && a.to_json() == b.to_json()
            }
            (TypedValue::Opaque(a), TypedValue::Opaque(b)) => a == b,
            _ => false,
        }
    }
}

// ---------------------------------------------------------------------------
// Conversion
// ---------------------------------------------------------------------------

/// Converts `raw` to the typed value described by `shape`.
pub fn convert(raw: &Value, shape: &ResultShape) -> TypedValue {
    match shape {
        ResultShape::Primitive(tag) => convert_primitive(raw, *tag),
        ResultShape::Opaque => TypedValue::Opaque(raw.clone()),
        ResultShape::Custom(factory) => factory(raw),
        ResultShape::Array(item) => match raw {
            Value::Array(items) => {
                TypedValue::Array(items.iter().map(|value| convert(value, item)).collect())
            }
            other => TypedValue::Opaque(other.clone()),
        },
        ResultShape::Map { key, value } => match raw {
            Value::Object(entries) => TypedValue::Map(
                entries
                    .iter()
                    .map(|(k, v)| {
                        (
                            convert_primitive(&Value::String(k.clone()), *key),
                            convert(v, value),
                        )
                    })
                    .collect(),
            ),
            other => TypedValue::Opaque(other.clone()),
        },
    }
}

/// Applies a single primitive conversion.
pub fn convert_primitive(raw: &Value, tag: PrimitiveType) -> TypedValue {
    match tag {
        PrimitiveType::Boolean => TypedValue::Bool(to_bool(raw)),
        PrimitiveType::Integer => {
            parse_int(&value_to_string(raw)).map_or(TypedValue::Null, TypedValue::Integer)
        }
        PrimitiveType::Number => {
            parse_float(&value_to_string(raw)).map_or(TypedValue::Null, TypedValue::Number)
        }
        PrimitiveType::String => TypedValue::String(value_to_string(raw)),
        PrimitiveType::Date => {
            parse_date(&value_to_string(raw)).map_or(TypedValue::Null, TypedValue::Date)
        }
    }
}

fn to_bool(raw: &Value) -> bool {
    match raw {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0 && !n.is_nan()),
        Value::String(text) => {
            let text = text.trim();
            !(text.is_empty() || text.eq_ignore_ascii_case("false"))
        }
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// The natural string form of a raw value.
pub fn value_to_string(raw: &Value) -> String {
    match raw {
        Value::Null => "null".to_string(),
        Value::Bool(flag) => flag.to_string(),
        Value::Number(n) => match (n.as_i64(), n.as_u64()) {
            (Some(i), _) => i.to_string(),
            (None, Some(u)) => u.to_string(),
            (None, None) => number_to_string(n.as_f64().unwrap_or(f64::NAN)),
        },
        Value::String(text) => text.clone(),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::Null => String::new(),
                other => value_to_string(other),
            })
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => "[object Object]".to_string(),
    }
}

/// Leading-digits integer parse: whitespace, optional sign, decimal digits.
fn parse_int(text: &str) -> Option<i64> {
    let text = text.trim_start();
    let sign_len = usize::from(text.starts_with(['-', '+']));
    let digits_len = text[sign_len..]
        .bytes()
        .take_while(u8::is_ascii_digit)
        .count();
    if digits_len == 0 {
        return None;
    }
    text[..sign_len + digits_len].parse().ok()
}

static FLOAT_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[+-]?(?:\d+\.?\d*(?:[eE][+-]?\d+)?|\.\d+(?:[eE][+-]?\d+)?|Infinity)")
        .expect("float prefix pattern is valid")
});

/// Longest-prefix float parse.
fn parse_float(text: &str) -> Option<f64> {
    let text = text.trim_start();
    let prefix = FLOAT_PREFIX.find(text)?.as_str();
    match prefix.trim_start_matches(['+', '-']) {
        "Infinity" if prefix.starts_with('-') => Some(f64::NEG_INFINITY),
        "Infinity" => Some(f64::INFINITY),
        _ => prefix.parse().ok(),
    }
}

const OFFSET_FORMATS: [&str; 3] = [
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M%:z",
];

const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M"];

/// Lenient date parse: the first `T` separator becomes a space before
/// parsing. Times without an offset are taken as UTC.
pub fn parse_date(text: &str) -> Option<DateTime<Utc>> {
    let replaced = match text.find(['T', 't']) {
        Some(at) => format!("{} {}", &text[..at], &text[at + 1..]),
        None => text.to_string(),
    };
    let candidate = replaced.trim();

    for format in OFFSET_FORMATS {
        if let Ok(date) = DateTime::parse_from_str(candidate, format) {
            return Some(date.with_timezone(&Utc));
        }
    }

    let naive = candidate
        .strip_suffix(['Z', 'z'])
        .unwrap_or(candidate)
        .trim_end();
    for format in NAIVE_FORMATS {
        if let Ok(date) = NaiveDateTime::parse_from_str(naive, format) {
            return Some(date.and_utc());
        }
    }
    NaiveDate::parse_from_str(naive, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|date| date.and_utc())
}
