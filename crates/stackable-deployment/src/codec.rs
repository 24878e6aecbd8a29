//! Conversions between configuration scalars and the API representation.
//!
//! Rolling update bounds are written as strings in the configuration (`"5"` or `"25%"`), but the
//! API expects an [`IntOrString`]. Both expand and the patch generator go through
//! [`parse_int_or_string`], flatten goes through [`render_int_or_string`].
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;

use crate::tree::{Tree, Value};

/// Parses a configuration string into an [`IntOrString`].
///
/// A string which parses as an [`i32`] becomes [`IntOrString::Int`], every other string is kept
/// verbatim as [`IntOrString::String`]. The input is not trimmed and a trailing `%` gets no special
/// treatment. The empty string means "not set" and returns [`None`].
pub fn parse_int_or_string(input: &str) -> Option<IntOrString> {
    if input.is_empty() {
        return None;
    }

    Some(match input.parse::<i32>() {
        Ok(value) => IntOrString::Int(value),
        Err(_) => IntOrString::String(input.to_owned()),
    })
}

/// Renders an [`IntOrString`] back into the string written in the configuration.
pub fn render_int_or_string(value: &IntOrString) -> String {
    match value {
        IntOrString::Int(value) => value.to_string(),
        IntOrString::String(value) => value.clone(),
    }
}

/// Inserts `value` into `tree` only if it is set.
///
/// Optional API fields must stay absent in the flattened tree when they are unset, otherwise an
/// explicit zero and "not set" could no longer be told apart.
pub(crate) fn insert_some<V>(tree: &mut Tree, key: &str, value: Option<V>)
where
    V: Into<Value>,
{
    if let Some(value) = value {
        tree.insert(key.to_owned(), value.into());
    }
}
