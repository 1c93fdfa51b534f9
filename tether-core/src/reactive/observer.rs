//! Object Reactivity
//!
//! `observe` turns a plain JSON object or array into a [`ReactiveObject`]:
//! one [`ReactiveCell`] per own key, in the source's key order. Array
//! elements are keyed by their index in decimal (`"0"`, `"1"`, ...).
//!
//! Observation is shallow. A nested object becomes the plain value of its
//! parent's cell; reading it captures the parent key, and its own fields
//! stay untracked. Scalars (`null`, booleans, numbers, strings) are not
//! observable and `observe` returns `None`.
//!
//! Writes through an observed object use [`loosely_equal`] for the no-op
//! check, so `1` and `1.0` count as the same number.

use indexmap::IndexMap;
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};
use serde_json::{Map, Value};

use super::cell::ReactiveCell;
use crate::error::{ReactiveError, Result};

/// Make every own key of `value` reactive.
///
/// Returns `None` without installing anything when `value` is a scalar.
pub fn observe(value: &Value) -> Option<ReactiveObject> {
    let object = match value {
        Value::Object(map) => {
            let mut object = ReactiveObject::with_capacity(Shape::Object, map.len());
            for (key, field) in map {
                define_reactive(&mut object, key.clone(), field.clone());
            }
            object
        }
        Value::Array(items) => {
            let mut object = ReactiveObject::with_capacity(Shape::Array, items.len());
            for (index, item) in items.iter().enumerate() {
                define_reactive(&mut object, index.to_string(), item.clone());
            }
            object
        }
        _ => {
            tracing::trace!(kind = value_kind(value), "value is not observable");
            return None;
        }
    };

    tracing::debug!(
        kind = value_kind(value),
        properties = object.len(),
        "observed value"
    );
    Some(object)
}

/// Install a reactive property for `key` with initial `value`.
///
/// Installing over an existing key is allowed and keeps its position. The
/// key gets a fresh cell and dependency set; subscribers of the old cell are
/// not carried over.
pub fn define_reactive(
    object: &mut ReactiveObject,
    key: impl Into<String>,
    value: Value,
) -> ReactiveCell<Value> {
    let cell = ReactiveCell::with_equals(value, loosely_equal);
    object.fields.insert(key.into(), cell.clone());
    cell
}

/// Equality for the no-op write check.
///
/// Two numbers are equal when they denote the same numeric value, whatever
/// their representation (`1`, `1.0`, `1e0`). Everything else falls back to
/// `==`.
pub fn loosely_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            if let (Some(x), Some(y)) = (x.as_i64(), y.as_i64()) {
                x == y
            } else if let (Some(x), Some(y)) = (x.as_u64(), y.as_u64()) {
                x == y
            } else {
                x.as_f64() == y.as_f64()
            }
        }
        _ => a == b,
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// What an observed value looked like before observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Shape {
    #[default]
    Object,
    Array,
}

/// A plain object whose properties are reactive cells.
///
/// Reads through [`ReactiveObject::get`] capture the active subscriber;
/// writes through [`ReactiveObject::set`] notify the property's
/// subscribers. Clones share the same cells.
#[derive(Clone, Default)]
pub struct ReactiveObject {
    shape: Shape,
    fields: IndexMap<String, ReactiveCell<Value>>,
}

impl ReactiveObject {
    /// An object with no properties.
    pub fn new() -> Self {
        Self::default()
    }

    fn with_capacity(shape: Shape, capacity: usize) -> Self {
        Self {
            shape,
            fields: IndexMap::with_capacity(capacity),
        }
    }

    /// Whether this was built from an object or an array.
    pub fn shape(&self) -> Shape {
        self.shape
    }

    /// Read `key`, capturing the active subscriber.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.fields.get(key).map(ReactiveCell::get)
    }

    /// Write `key`. Fails if the key was never installed.
    pub fn set(&self, key: &str, value: impl Into<Value>) -> Result<()> {
        self.fields
            .get(key)
            .ok_or_else(|| ReactiveError::UnknownProperty(key.to_owned()))?
            .set(value.into())
    }

    /// The cell behind `key`.
    pub fn cell(&self, key: &str) -> Option<&ReactiveCell<Value>> {
        self.fields.get(key)
    }

    /// See [`define_reactive`].
    pub fn define(&mut self, key: impl Into<String>, value: impl Into<Value>) -> ReactiveCell<Value> {
        define_reactive(self, key, value.into())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    /// Keys in installation order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Plain copy of the current values. Captures nothing.
    ///
    /// Observed arrays come back as arrays, in key order.
    pub fn snapshot(&self) -> Value {
        match self.shape {
            Shape::Object => {
                let map: Map<String, Value> = self
                    .fields
                    .iter()
                    .map(|(key, cell)| (key.clone(), cell.get_untracked()))
                    .collect();
                Value::Object(map)
            }
            Shape::Array => Value::Array(self.fields.values().map(ReactiveCell::get_untracked).collect()),
        }
    }
}

impl Serialize for ReactiveObject {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self.shape {
            Shape::Object => {
                let mut map = serializer.serialize_map(Some(self.fields.len()))?;
                for (key, cell) in &self.fields {
                    map.serialize_entry(key, cell)?;
                }
                map.end()
            }
            Shape::Array => {
                let mut seq = serializer.serialize_seq(Some(self.fields.len()))?;
                for cell in self.fields.values() {
                    seq.serialize_element(cell)?;
                }
                seq.end()
            }
        }
    }
}

impl std::fmt::Debug for ReactiveObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map().entries(self.fields.iter()).finish()
    }
}
