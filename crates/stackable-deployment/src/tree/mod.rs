//! The configuration tree as authored by users.
//!
//! A [`Tree`] is an ordered mapping of field names to [`Value`]s. Nested configuration blocks
//! which may appear at most once are stored as a single-element [`Value::List`] containing a
//! [`Value::Block`]. This mirrors how the tree is written in configuration files:
//!
//! ```yaml
//! spec:
//!   - replicas: 3
//!     strategy:
//!       - type: RollingUpdate
//! ```
//!
//! Reading values with the expected shape is done through [`BlockReader`], which reports
//! shape violations together with the dotted path of the offending field.
use std::collections::{BTreeMap, BTreeSet};

use indexmap::IndexMap;

mod path;
mod reader;

pub use path::FieldPath;
pub use reader::{BlockReader, Error, Result};
pub(crate) use reader::UnexpectedTypeSnafu;

/// An ordered mapping of field name to [`Value`].
///
/// Equality does not depend on the insertion order.
pub type Tree = IndexMap<String, Value>;

/// A single value inside a [`Tree`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Value {
    Bool(bool),
    Int(i64),
    String(String),

    /// An ordered list of scalars or of nested blocks.
    List(Vec<Value>),

    /// An unordered set of string scalars.
    Set(BTreeSet<String>),

    /// A mapping of string keys to string values, such as labels or annotations.
    Map(BTreeMap<String, String>),

    /// A nested tree.
    Block(Tree),
}

impl Value {
    /// Builds a [`Value::Block`] from `(key, value)` pairs.
    pub fn block<K>(entries: impl IntoIterator<Item = (K, Value)>) -> Self
    where
        K: Into<String>,
    {
        Self::Block(
            entries
                .into_iter()
                .map(|(key, value)| (key.into(), value))
                .collect(),
        )
    }

    /// Builds the single-element list used for blocks which may appear at most once.
    pub fn single_block<K>(entries: impl IntoIterator<Item = (K, Value)>) -> Vec<Self>
    where
        K: Into<String>,
    {
        vec![Self::block(entries)]
    }

    /// Wraps a whole [`Tree`] into a single-element list.
    pub fn single(tree: Tree) -> Vec<Self> {
        vec![Self::Block(tree)]
    }

    /// Builds a [`Value::Set`] from string-like items.
    pub fn set<S>(items: impl IntoIterator<Item = S>) -> Self
    where
        S: Into<String>,
    {
        Self::Set(items.into_iter().map(Into::into).collect())
    }

    /// Builds a [`Value::Map`] from string-like `(key, value)` pairs.
    pub fn map<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self::Map(
            entries
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }

    /// A short, human readable name of the variant, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::String(_) => "string",
            Self::List(_) => "list",
            Self::Set(_) => "set",
            Self::Map(_) => "map",
            Self::Block(_) => "block",
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Self::List(value)
    }
}

impl From<BTreeMap<String, String>> for Value {
    fn from(value: BTreeMap<String, String>) -> Self {
        Self::Map(value)
    }
}

impl From<Tree> for Value {
    fn from(value: Tree) -> Self {
        Self::Block(value)
    }
}
