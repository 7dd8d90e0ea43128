use serde::{Deserialize, Serialize};
use std::fmt;

/// A path segment: a map key or a list position.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Key {
    Index(i64),
    Name(String),
}

impl Key {
    /// The list position this key addresses, if any. Canonical numeric names count.
    pub fn as_index(&self) -> Option<usize> {
        match self {
            Key::Index(i) => usize::try_from(*i).ok(),
            Key::Name(s) => s
                .parse::<usize>()
                .ok()
                .filter(|i| i.to_string() == *s),
        }
    }

    /// The other spelling of the same key: `0` for `"0"` and back.
    pub(crate) fn alternate(&self) -> Option<Key> {
        match self {
            Key::Index(i) => Some(Key::Name(i.to_string())),
            Key::Name(s) => s
                .parse::<i64>()
                .ok()
                .filter(|i| i.to_string() == *s)
                .map(Key::Index),
        }
    }

    /// The spelling used for map entries, so `0` and `"0"` share one entry.
    pub(crate) fn named(self) -> Key {
        match self {
            Key::Index(i) => Key::Name(i.to_string()),
            name => name,
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Index(i) => write!(f, "{}", i),
            Key::Name(s) => f.write_str(s),
        }
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Key::Name(s.to_string())
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        Key::Name(s)
    }
}

impl From<&String> for Key {
    fn from(s: &String) -> Self {
        Key::Name(s.clone())
    }
}

impl From<&Key> for Key {
    fn from(k: &Key) -> Self {
        k.clone()
    }
}

impl From<i32> for Key {
    fn from(i: i32) -> Self {
        Key::Index(i64::from(i))
    }
}

impl From<i64> for Key {
    fn from(i: i64) -> Self {
        Key::Index(i)
    }
}

impl From<usize> for Key {
    fn from(i: usize) -> Self {
        i64::try_from(i).map_or_else(|_| Key::Name(i.to_string()), Key::Index)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Bool(v) => write!(f, "{}", v),
            Scalar::Int(v) => write!(f, "{}", v),
            Scalar::Float(v) => write!(f, "{}", v),
            Scalar::Str(v) => f.write_str(v),
        }
    }
}

impl From<bool> for Scalar {
    fn from(v: bool) -> Self {
        Scalar::Bool(v)
    }
}

impl From<i32> for Scalar {
    fn from(v: i32) -> Self {
        Scalar::Int(i64::from(v))
    }
}

impl From<i64> for Scalar {
    fn from(v: i64) -> Self {
        Scalar::Int(v)
    }
}

impl From<f32> for Scalar {
    fn from(v: f32) -> Self {
        Scalar::Float(f64::from(v))
    }
}

impl From<f64> for Scalar {
    fn from(v: f64) -> Self {
        Scalar::Float(v)
    }
}

impl From<&str> for Scalar {
    fn from(v: &str) -> Self {
        Scalar::Str(v.to_string())
    }
}

impl From<String> for Scalar {
    fn from(v: String) -> Self {
        Scalar::Str(v)
    }
}

/// Fallible conversion out of a stored scalar. `None` means the caller's default applies.
pub trait Coerce: Sized + Clone + Into<Scalar> {
    fn coerce(scalar: &Scalar) -> Option<Self>;
}

impl Coerce for bool {
    fn coerce(scalar: &Scalar) -> Option<Self> {
        match scalar {
            Scalar::Bool(v) => Some(*v),
            Scalar::Int(v) => Some(*v != 0),
            Scalar::Float(_) => None,
            Scalar::Str(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" | "on" | "1" => Some(true),
                "false" | "no" | "off" | "0" => Some(false),
                _ => None,
            },
        }
    }
}

impl Coerce for i64 {
    fn coerce(scalar: &Scalar) -> Option<Self> {
        match scalar {
            Scalar::Int(v) => Some(*v),
            Scalar::Float(v) => {
                if v.fract() == 0.0 && *v >= i64::MIN as f64 && *v < i64::MAX as f64 {
                    Some(*v as i64)
                } else {
                    None
                }
            }
            Scalar::Str(s) => s.trim().parse().ok(),
            Scalar::Bool(_) => None,
        }
    }
}

impl Coerce for i32 {
    fn coerce(scalar: &Scalar) -> Option<Self> {
        i64::coerce(scalar).and_then(|v| i32::try_from(v).ok())
    }
}

impl Coerce for f64 {
    fn coerce(scalar: &Scalar) -> Option<Self> {
        match scalar {
            Scalar::Float(v) => Some(*v),
            Scalar::Int(v) => Some(*v as f64),
            Scalar::Str(s) => s.trim().parse().ok(),
            Scalar::Bool(_) => None,
        }
    }
}

impl Coerce for f32 {
    fn coerce(scalar: &Scalar) -> Option<Self> {
        f64::coerce(scalar).map(|v| v as f32)
    }
}

impl Coerce for String {
    fn coerce(scalar: &Scalar) -> Option<Self> {
        Some(scalar.to_string())
    }
}
