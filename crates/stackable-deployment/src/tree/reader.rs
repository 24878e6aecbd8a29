use std::collections::BTreeMap;

use snafu::Snafu;

use super::{FieldPath, Tree, Value};

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// A value in the configuration tree doesn't have the shape the mapping expects.
///
/// The schema layer in front of the mapping is expected to prevent these, so they indicate a
/// defect rather than a user mistake.
#[derive(Debug, PartialEq, Eq, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display("expected {expected} at {path}, found {found}"))]
    UnexpectedType {
        path: FieldPath,
        expected: &'static str,
        found: &'static str,
    },

    #[snafu(display("integer {value} at {path} does not fit into 32 bits"))]
    IntegerOutOfRange { path: FieldPath, value: i64 },
}

/// Typed read access to one block of a configuration [`Tree`].
///
/// Every accessor returns `Ok(None)` if the key is absent and an [`Error`] if the key is present
/// with a different shape than requested.
#[derive(Clone, Debug)]
pub struct BlockReader<'a> {
    tree: &'a Tree,
    path: FieldPath,
}

impl<'a> BlockReader<'a> {
    pub fn new(tree: &'a Tree) -> Self {
        Self {
            tree,
            path: FieldPath::root(),
        }
    }

    /// Reads the first element of a list of blocks.
    ///
    /// Blocks which may appear at most once are stored as single-element lists. Only the first
    /// element is consulted, any further elements are ignored.
    pub fn first(list: &'a [Value]) -> Result<Option<Self>> {
        Self::first_at(list, FieldPath::root())
    }

    fn first_at(list: &'a [Value], path: FieldPath) -> Result<Option<Self>> {
        match list.first() {
            None => Ok(None),
            Some(Value::Block(tree)) => Ok(Some(Self {
                tree,
                path: path.index(0),
            })),
            Some(other) => UnexpectedTypeSnafu {
                path: path.index(0),
                expected: "block",
                found: other.kind(),
            }
            .fail(),
        }
    }

    pub fn tree(&self) -> &'a Tree {
        self.tree
    }

    pub fn path(&self) -> &FieldPath {
        &self.path
    }

    pub fn contains(&self, key: &str) -> bool {
        self.tree.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&'a Value> {
        self.tree.get(key)
    }

    fn unexpected<T>(&self, key: &str, expected: &'static str, found: &Value) -> Result<T> {
        UnexpectedTypeSnafu {
            path: self.path.child(key),
            expected,
            found: found.kind(),
        }
        .fail()
    }

    pub fn int(&self, key: &str) -> Result<Option<i64>> {
        match self.get(key) {
            None => Ok(None),
            Some(Value::Int(value)) => Ok(Some(*value)),
            Some(other) => self.unexpected(key, "int", other),
        }
    }

    /// Like [`Self::int`], but additionally requires the value to fit into an [`i32`], which is
    /// what most Kubernetes integer fields use.
    pub fn int32(&self, key: &str) -> Result<Option<i32>> {
        self.int(key)?
            .map(|value| {
                i32::try_from(value).map_err(|_| Error::IntegerOutOfRange {
                    path: self.path.child(key),
                    value,
                })
            })
            .transpose()
    }

    pub fn bool(&self, key: &str) -> Result<Option<bool>> {
        match self.get(key) {
            None => Ok(None),
            Some(Value::Bool(value)) => Ok(Some(*value)),
            Some(other) => self.unexpected(key, "bool", other),
        }
    }

    pub fn string(&self, key: &str) -> Result<Option<&'a str>> {
        match self.get(key) {
            None => Ok(None),
            Some(Value::String(value)) => Ok(Some(value.as_str())),
            Some(other) => self.unexpected(key, "string", other),
        }
    }

    /// Reads a collection of strings, which can either be a [`Value::Set`] or a [`Value::List`]
    /// of [`Value::String`]s.
    pub fn strings(&self, key: &str) -> Result<Option<Vec<String>>> {
        match self.get(key) {
            None => Ok(None),
            Some(Value::Set(values)) => Ok(Some(values.iter().cloned().collect())),
            Some(Value::List(items)) => {
                let path = self.path.child(key);
                items
                    .iter()
                    .enumerate()
                    .map(|(i, item)| match item {
                        Value::String(value) => Ok(value.clone()),
                        other => UnexpectedTypeSnafu {
                            path: path.index(i),
                            expected: "string",
                            found: other.kind(),
                        }
                        .fail(),
                    })
                    .collect::<Result<Vec<_>>>()
                    .map(Some)
            }
            Some(other) => self.unexpected(key, "set of strings", other),
        }
    }

    pub fn string_map(&self, key: &str) -> Result<Option<&'a BTreeMap<String, String>>> {
        match self.get(key) {
            None => Ok(None),
            Some(Value::Map(map)) => Ok(Some(map)),
            Some(other) => self.unexpected(key, "map", other),
        }
    }

    pub fn list(&self, key: &str) -> Result<Option<&'a [Value]>> {
        match self.get(key) {
            None => Ok(None),
            Some(Value::List(items)) => Ok(Some(items.as_slice())),
            Some(other) => self.unexpected(key, "list", other),
        }
    }

    /// Reads the nested block stored below `key`.
    ///
    /// Returns `Ok(None)` both if the key is absent and if its list is empty. Use
    /// [`Self::contains`] to tell these cases apart.
    pub fn block(&self, key: &str) -> Result<Option<Self>> {
        match self.list(key)? {
            None => Ok(None),
            Some(list) => Self::first_at(list, self.path.child(key)),
        }
    }

    /// Reads every nested block stored in the list below `key`, keeping their order.
    pub fn blocks(&self, key: &str) -> Result<Vec<Self>> {
        match self.list(key)? {
            None => Ok(Vec::new()),
            Some(list) => Self::all_at(list, self.path.child(key)),
        }
    }

    /// Reads every element of a list of blocks, keeping their order.
    pub fn all(list: &'a [Value]) -> Result<Vec<Self>> {
        Self::all_at(list, FieldPath::root())
    }

    fn all_at(list: &'a [Value], path: FieldPath) -> Result<Vec<Self>> {
        list.iter()
            .enumerate()
            .map(|(i, item)| match item {
                Value::Block(tree) => Ok(Self {
                    tree,
                    path: path.index(i),
                }),
                other => UnexpectedTypeSnafu {
                    path: path.index(i),
                    expected: "block",
                    found: other.kind(),
                }
                .fail(),
            })
            .collect()
    }
}
