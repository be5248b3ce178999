//! Domain models for the pet store API.
//!
//! # Design
//! Models are built field by field from raw response data: each declared
//! field present in the data is converted with its type tag, unknown fields
//! are ignored and missing ones stay `None`. The [`Model`] trait lets
//! `ResultShape::Custom` hand back any model behind one `TypedValue`
//! variant.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::coerce::{convert_primitive, PrimitiveType, ResultShape, TypedValue};

/// A typed record that can travel inside a [`TypedValue`].
pub trait Model: Any + fmt::Debug + Send + Sync {
    fn as_any(&self) -> &dyn Any;

    fn to_json(&self) -> Value;
}

/// A single pet as exposed by the API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pet {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birthday: Option<i64>,
}

impl Pet {
    /// Declared fields and their type tags.
    pub const FIELDS: [(&'static str, PrimitiveType); 2] = [
        ("name", PrimitiveType::String),
        ("birthday", PrimitiveType::Integer),
    ];

    pub fn new(name: impl Into<String>, birthday: i64) -> Self {
        Self {
            name: Some(name.into()),
            birthday: Some(birthday),
        }
    }

    /// Populates `target` (or a fresh `Pet`) from raw data.
    ///
    /// Returns `target` untouched when `data` is null.
    pub fn create(data: &Value, target: Option<Pet>) -> Option<Pet> {
        if data.is_null() {
            return target;
        }
        let mut pet = target.unwrap_or_default();
        for (field, tag) in Self::FIELDS {
            let Some(raw) = data.get(field) else {
                continue;
            };
            let value = convert_primitive(raw, tag);
            match field {
                "name" => pet.name = value.as_str().map(str::to_string),
                "birthday" => pet.birthday = value.as_i64(),
                _ => {}
            }
        }
        Some(pet)
    }

    /// Factory for [`ResultShape::Custom`].
    pub fn build(data: &Value) -> TypedValue {
        match Self::create(data, None) {
            Some(pet) => TypedValue::Model(Arc::new(pet)),
            None => TypedValue::Null,
        }
    }

    pub fn shape() -> ResultShape {
        ResultShape::Custom(Self::build)
    }
}

impl Model for Pet {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}
