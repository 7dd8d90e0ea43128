//! Two-way mapping between application values and nodes.
//!
//! Types opt in through [`Serializable`] and [`Deserializable`]. Plain data
//! types without either go through serde instead, bridged over
//! `serde_json::Value`.

use crate::error::ConfigError;
use crate::node::Node;
use crate::tree::{Arena, NodeId, Value};
use crate::value::{Key, Scalar};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Number, Value as JsonValue};
use tracing::debug;

/// Populates a node with the values held by `self`.
pub trait Serializable {
    fn to_node(&self, node: &Node);
}

/// Produces a value from a node, using `self` as the field-level default template.
pub trait Deserializable: Sized {
    fn from_node(&self, node: &Node) -> Result<Self, ConfigError>;
}

/// A value that maps both ways.
pub trait ValueType: Serializable + Deserializable {}

impl<T: Serializable + Deserializable> ValueType for T {}

pub(crate) fn to_json(arena: &Arena, id: NodeId) -> JsonValue {
    match arena.value(id) {
        Value::Absent => JsonValue::Null,
        Value::Scalar(Scalar::Bool(v)) => JsonValue::Bool(*v),
        Value::Scalar(Scalar::Int(v)) => JsonValue::Number(Number::from(*v)),
        Value::Scalar(Scalar::Float(v)) => {
            Number::from_f64(*v).map_or(JsonValue::Null, JsonValue::Number)
        }
        Value::Scalar(Scalar::Str(v)) => JsonValue::String(v.clone()),
        Value::List(items) => {
            JsonValue::Array(items.iter().map(|c| to_json(arena, *c)).collect())
        }
        Value::Map(map) => JsonValue::Object(
            map.iter()
                .filter(|(_, c)| *arena.value(**c) != Value::Absent)
                .map(|(k, c)| (k.to_string(), to_json(arena, *c)))
                .collect::<Map<String, JsonValue>>(),
        ),
    }
}

pub(crate) fn from_json(arena: &mut Arena, json: &JsonValue) -> Value {
    match json {
        JsonValue::Null => Value::Absent,
        JsonValue::Bool(v) => Value::Scalar(Scalar::Bool(*v)),
        JsonValue::Number(n) => n
            .as_i64()
            .map(Scalar::Int)
            .or_else(|| n.as_f64().map(Scalar::Float))
            .map_or(Value::Absent, Value::Scalar),
        JsonValue::String(v) => Value::Scalar(Scalar::Str(v.clone())),
        JsonValue::Array(items) => Value::List(
            items
                .iter()
                .map(|item| {
                    let value = from_json(arena, item);
                    arena.alloc(value)
                })
                .collect(),
        ),
        JsonValue::Object(fields) => Value::Map(
            fields
                .iter()
                .map(|(key, item)| {
                    let value = from_json(arena, item);
                    (Key::Name(key.clone()), arena.alloc(value))
                })
                .collect(),
        ),
    }
}

impl Node {
    pub fn to_json(&self) -> JsonValue {
        match self.id() {
            Some(id) => to_json(&self.arena.borrow(), id),
            None => JsonValue::Null,
        }
    }

    /// Replaces this node's value with `json`. `null` clears it.
    pub fn set_json(&self, json: &JsonValue) -> &Self {
        if json.is_null() {
            self.clear();
            return self;
        }
        let id = self.ensure();
        let mut arena = self.arena.borrow_mut();
        let value = from_json(&mut arena, json);
        arena.set_value(id, value);
        self
    }

    /// Clears this node and lets `value` write itself into it.
    pub fn set_value<S: Serializable + ?Sized>(&self, value: &S) -> &Self {
        self.clear();
        value.to_node(self);
        self
    }

    pub fn set_value_at<S: Serializable + ?Sized>(&self, key: impl Into<Key>, value: &S) -> &Self {
        self.child(key).set_value(value);
        self
    }

    /// Reads a value seeded by `default`.
    ///
    /// An empty node, or one `default.from_node` rejects, yields `default`;
    /// with copy-defaults on, `default` is then written back so the next save
    /// persists a valid subtree.
    pub fn get_value<T: ValueType>(&self, default: T) -> T {
        if self.is_empty() {
            self.heal(&default);
            return default;
        }
        match default.from_node(self) {
            Ok(value) => value,
            Err(e) => {
                debug!(error = %e, "Value mapping failed, substituting default");
                self.heal(&default);
                default
            }
        }
    }

    pub fn get_value_at<T: ValueType>(&self, key: impl Into<Key>, default: T) -> T {
        self.child(key).get_value(default)
    }

    fn heal<S: Serializable>(&self, default: &S) {
        if self.options().copy_defaults {
            self.set_value(default);
        }
    }

    fn decode<T: DeserializeOwned>(&self) -> Result<T, ConfigError> {
        Ok(serde_json::from_value(self.to_json())?)
    }

    /// Builds a fresh `T` from this node through serde.
    ///
    /// On success, keys the tree lacks are filled in from the bound value. On
    /// failure `default` is copied into the node and returned. Both writes
    /// only happen when the tree copies defaults.
    pub fn bind<T: Serialize + DeserializeOwned>(&self, default: T) -> T {
        self.bind_with(|| default)
    }

    pub fn bind_with<T, F>(&self, default: F) -> T
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> T,
    {
        let copy_defaults = self.options().copy_defaults;
        match self.decode::<T>() {
            Ok(value) => {
                if copy_defaults {
                    match serde_json::to_value(&value) {
                        Ok(json) => self.fill_missing(&json),
                        Err(e) => {
                            debug!(error = %e, "Bound value does not serialize back");
                        }
                    }
                }
                value
            }
            Err(e) => {
                debug!(error = %e, "Bind failed, substituting default");
                let value = default();
                if copy_defaults {
                    self.copy(&value);
                }
                value
            }
        }
    }

    /// Binds without a default and without touching the tree.
    pub fn try_bind<T: DeserializeOwned>(&self) -> Option<T> {
        self.decode().ok()
    }

    /// Reads through serde, never writing back.
    pub fn get_typed<T: DeserializeOwned>(&self, default: T) -> T {
        self.decode().unwrap_or(default)
    }

    pub fn get_typed_at<T: DeserializeOwned>(&self, key: impl Into<Key>, default: T) -> T {
        self.child(key).get_typed(default)
    }

    /// Serializes `instance` into this node. False if it cannot be serialized.
    pub fn copy<T: Serialize + ?Sized>(&self, instance: &T) -> bool {
        match serde_json::to_value(instance) {
            Ok(json) => {
                self.set_json(&json);
                true
            }
            Err(e) => {
                debug!(error = %e, "Copy failed");
                false
            }
        }
    }

    fn fill_missing(&self, json: &JsonValue) {
        match json {
            JsonValue::Null => {}
            JsonValue::Object(fields) if self.is_map() => {
                for (key, value) in fields {
                    self.child(key.as_str()).fill_missing(value);
                }
            }
            _ if !self.has_value() => {
                self.set_json(json);
            }
            _ => {}
        }
    }
}
