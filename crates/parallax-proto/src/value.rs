//! Dynamic wire values.

use rkyv::{Archive, Deserialize, Serialize};

/// A dynamic value carried in call arguments and responses.
///
/// The remoting protocol is duck-typed on the wire: arguments and results
/// are arbitrary trees of scalars, arrays, and objects. Objects may carry a
/// class alias naming the record type the peer serialised them from; see
/// [`crate::ClassAliasRegistry`].
// The recursive variants need explicit serialiser bounds; the derive cannot
// infer them for a self-referential type.
#[derive(Archive, Serialize, Deserialize, Debug, Clone, PartialEq)]
#[rkyv(
    serialize_bounds(
        __S: rkyv::ser::Writer + rkyv::ser::Allocator,
        __S::Error: rkyv::rancor::Source,
    ),
    deserialize_bounds(__D::Error: rkyv::rancor::Source),
    bytecheck(bounds(
        __C: rkyv::validation::ArchiveContext,
        __C::Error: rkyv::rancor::Source,
    )),
)]
pub enum Value {
    /// The null/undefined value.
    Null,
    /// A boolean.
    Bool(bool),
    /// A double-precision number.
    Number(f64),
    /// A UTF-8 string.
    String(String),
    /// An ordered array of values.
    Array(#[rkyv(omit_bounds)] Vec<Value>),
    /// A keyed object, optionally tagged with a class alias.
    Object {
        /// Class alias this object was serialised from, if any.
        class: Option<String>,
        /// Field entries in serialisation order.
        #[rkyv(omit_bounds)]
        entries: Vec<(String, Value)>,
    },
}

impl Value {
    /// Creates an anonymous (untagged) object from field entries.
    #[must_use]
    pub fn object(entries: Vec<(String, Value)>) -> Self {
        Self::Object {
            class: None,
            entries,
        }
    }

    /// Creates a class-tagged object from field entries.
    #[must_use]
    pub fn typed_object(class: impl Into<String>, entries: Vec<(String, Value)>) -> Self {
        Self::Object {
            class: Some(class.into()),
            entries,
        }
    }

    /// Returns the string contents if this is a string value.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the numeric contents if this is a number value.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the element slice if this is an array value.
    #[must_use]
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Looks up an object field by name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Value> {
        match self {
            Self::Object { entries, .. } => {
                entries.iter().find(|(k, _)| k == name).map(|(_, v)| v)
            }
            _ => None,
        }
    }

    /// Returns the class alias if this is a class-tagged object.
    #[must_use]
    pub fn class_alias(&self) -> Option<&str> {
        match self {
            Self::Object {
                class: Some(alias), ..
            } => Some(alias),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}
