//! Path addressing into the document tree.
//!
//! A path is a list of object keys, written either as a dot-separated
//! string (`"sections.hero.heading.en"`) or as explicit segments.

use std::fmt;

use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("path is empty")]
    Empty,

    #[error("path '{0}' contains an empty segment")]
    EmptySegment(String),
}

/// A validated, non-empty key path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldPath {
    segments: Vec<String>,
}

impl FieldPath {
    /// Parse a dot-separated path.
    pub fn parse(path: &str) -> Result<Self, PathError> {
        if path.is_empty() {
            return Err(PathError::Empty);
        }
        let segments: Vec<String> = path.split('.').map(str::to_string).collect();
        if segments.iter().any(String::is_empty) {
            return Err(PathError::EmptySegment(path.to_string()));
        }
        Ok(Self { segments })
    }

    /// Build from explicit segments; segments may contain dots.
    pub fn from_segments<I, S>(segments: I) -> Result<Self, PathError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segments: Vec<String> = segments.into_iter().map(Into::into).collect();
        if segments.is_empty() {
            return Err(PathError::Empty);
        }
        if segments.iter().any(String::is_empty) {
            return Err(PathError::EmptySegment(segments.join(".")));
        }
        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// This path extended by one more key.
    pub fn child(&self, key: impl Into<String>) -> FieldPath {
        let mut segments = self.segments.clone();
        segments.push(key.into());
        FieldPath { segments }
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("."))
    }
}

impl TryFrom<&str> for FieldPath {
    type Error = PathError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        FieldPath::parse(value)
    }
}

impl TryFrom<String> for FieldPath {
    type Error = PathError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        FieldPath::parse(&value)
    }
}

impl TryFrom<&[&str]> for FieldPath {
    type Error = PathError;

    fn try_from(value: &[&str]) -> Result<Self, Self::Error> {
        FieldPath::from_segments(value.iter().copied())
    }
}

impl TryFrom<Vec<String>> for FieldPath {
    type Error = PathError;

    fn try_from(value: Vec<String>) -> Result<Self, Self::Error> {
        FieldPath::from_segments(value)
    }
}

impl TryFrom<&FieldPath> for FieldPath {
    type Error = PathError;

    fn try_from(value: &FieldPath) -> Result<Self, Self::Error> {
        Ok(value.clone())
    }
}

/// Read the value at `path`, following object keys only.
pub fn get_path<'a>(doc: &'a Value, path: &FieldPath) -> Option<&'a Value> {
    path.segments
        .iter()
        .try_fold(doc, |node, key| node.as_object()?.get(key))
}

/// Mutable access to the value at `path`, following object keys only.
pub fn get_path_mut<'a>(doc: &'a mut Value, path: &FieldPath) -> Option<&'a mut Value> {
    path.segments
        .iter()
        .try_fold(doc, |node, key| node.as_object_mut()?.get_mut(key))
}

/// Set `value` at `path` in place, creating intermediate objects.
///
/// Any intermediate node (the root included) that is not an object is
/// replaced by a fresh empty object.
pub fn set_path_in_place(doc: &mut Value, path: &FieldPath, value: Value) {
    let Some((leaf, parents)) = path.segments.split_last() else {
        return;
    };

    let mut node = ensure_object(doc);
    for key in parents {
        let child = node
            .entry(key.clone())
            .or_insert_with(|| Value::Object(Map::new()));
        node = ensure_object(child);
    }
    node.insert(leaf.clone(), value);
}

/// Object node at `path`, created (and non-objects replaced) along the way.
pub fn ensure_object_at<'a>(doc: &'a mut Value, path: &FieldPath) -> &'a mut Map<String, Value> {
    let mut node = ensure_object(doc);
    for key in &path.segments {
        let child = node
            .entry(key.clone())
            .or_insert_with(|| Value::Object(Map::new()));
        node = ensure_object(child);
    }
    node
}

/// Copy `doc`, set `value` at `path` on the copy, and return it.
///
/// The input is never modified.
pub fn set_path(doc: &Value, path: &FieldPath, value: Value) -> Value {
    let mut next = doc.clone();
    set_path_in_place(&mut next, path, value);
    next
}

fn ensure_object(node: &mut Value) -> &mut Map<String, Value> {
    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    match node {
        Value::Object(map) => map,
        _ => unreachable!("node was just replaced by an object"),
    }
}
