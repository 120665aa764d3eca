//! Option documents: the ordered JSON trees the render engine exchanges with the editor.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{EditorError, Result};

/// One step of a [`Path`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    Key(String),
    Index(usize),
}

/// Address of a node inside an [`OptionDocument`], from the root down.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Path(Vec<Segment>);

impl Path {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.0.push(Segment::Key(key.into()));
        self
    }

    pub fn index(mut self, index: usize) -> Self {
        self.0.push(Segment::Index(index));
        self
    }

    /// Appends all segments of `tail`.
    pub fn join(mut self, tail: &Path) -> Self {
        self.0.extend(tail.0.iter().cloned());
        self
    }

    pub fn segments(&self) -> &[Segment] {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Parses dotted paths with bracketed indices, e.g. `editOptions.xAxis.breaks[2]`.
    pub fn parse(text: &str) -> Result<Self> {
        let mut path = Path::root();
        if text.is_empty() {
            return Ok(path);
        }
        for part in text.split('.') {
            let (key, mut rest) = match part.find('[') {
                Some(open) => (&part[..open], &part[open..]),
                None => (part, ""),
            };
            if key.is_empty() && rest.is_empty() {
                return Err(EditorError::invalid_path(text, "empty path segment"));
            }
            if !key.is_empty() {
                path = path.key(key);
            }
            while !rest.is_empty() {
                let close = rest
                    .find(']')
                    .filter(|_| rest.starts_with('['))
                    .ok_or_else(|| EditorError::invalid_path(text, "unbalanced brackets"))?;
                let index = rest[1..close]
                    .parse::<usize>()
                    .map_err(|_| EditorError::invalid_path(text, "array index is not a number"))?;
                path = path.index(index);
                rest = &rest[close + 1..];
            }
        }
        Ok(path)
    }
}

impl FromStr for Path {
    type Err = EditorError;

    fn from_str(s: &str) -> Result<Self> {
        Path::parse(s)
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str(".");
        }
        for (i, segment) in self.0.iter().enumerate() {
            match segment {
                Segment::Key(key) if i == 0 => write!(f, "{key}")?,
                Segment::Key(key) => write!(f, ".{key}")?,
                Segment::Index(index) => write!(f, "[{index}]")?,
            }
        }
        Ok(())
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// A complete plot option tree. Documents are always exchanged whole; equality is structural.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OptionDocument(Value);

impl OptionDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_value(value: Value) -> Self {
        Self(value)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.0).unwrap_or_else(|_| "null".to_string())
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }

    pub fn is_empty(&self) -> bool {
        match &self.0 {
            Value::Null => true,
            Value::Object(map) => map.is_empty(),
            _ => false,
        }
    }

    /// Reads a node. Missing nodes and paths that do not fit the tree both read as absent.
    pub fn get(&self, path: &Path) -> Option<&Value> {
        match self.try_get(path) {
            Ok(found) => found,
            Err(err) => {
                tracing::warn!(%err, "reading option through an invalid path");
                None
            }
        }
    }

    /// Like [`get`](Self::get) but reports structurally inconsistent paths.
    pub fn try_get(&self, path: &Path) -> Result<Option<&Value>> {
        let mut node = &self.0;
        for segment in path.segments() {
            node = match (segment, node) {
                (_, Value::Null) => return Ok(None),
                (Segment::Key(key), Value::Object(map)) => match map.get(key) {
                    Some(child) => child,
                    None => return Ok(None),
                },
                (Segment::Index(index), Value::Array(items)) => match items.get(*index) {
                    Some(child) => child,
                    None => return Ok(None),
                },
                (Segment::Key(key), other) => {
                    return Err(EditorError::invalid_path(
                        path,
                        format!("cannot look up key `{key}` in {}", kind_of(other)),
                    ))
                }
                (Segment::Index(index), other) => {
                    return Err(EditorError::invalid_path(
                        path,
                        format!("cannot index [{index}] into {}", kind_of(other)),
                    ))
                }
            };
        }
        Ok(Some(node))
    }

    pub fn get_str(&self, path: &Path) -> Option<&str> {
        self.get(path).and_then(Value::as_str)
    }

    pub fn get_i64(&self, path: &Path) -> Option<i64> {
        self.get(path).and_then(|v| v.as_i64().or_else(|| v.as_f64().map(|f| f.round() as i64)))
    }

    /// Writes a node, creating missing objects along the way.
    ///
    /// Null and absent intermediate nodes become objects. Array indices must already exist.
    /// A rejected path leaves the document untouched.
    pub fn set(&mut self, path: &Path, value: Value) -> Result<()> {
        self.check_writable(path)?;
        let mut node = &mut self.0;
        for segment in path.segments() {
            node = match segment {
                Segment::Key(key) => {
                    if node.is_null() {
                        *node = Value::Object(Map::new());
                    }
                    match node {
                        Value::Object(map) => map.entry(key.clone()).or_insert(Value::Null),
                        other => {
                            return Err(EditorError::invalid_path(
                                path,
                                format!("cannot set key `{key}` in {}", kind_of(other)),
                            ))
                        }
                    }
                }
                Segment::Index(index) => match node {
                    Value::Array(items) => {
                        let len = items.len();
                        items.get_mut(*index).ok_or_else(|| {
                            EditorError::invalid_path(
                                path,
                                format!("index [{index}] out of bounds for array of length {len}"),
                            )
                        })?
                    }
                    other => {
                        return Err(EditorError::invalid_path(
                            path,
                            format!("cannot index [{index}] into {}", kind_of(other)),
                        ))
                    }
                },
            };
        }
        *node = value;
        Ok(())
    }

    fn check_writable(&self, path: &Path) -> Result<()> {
        // `None` marks a node that `set` would create as an empty object.
        let mut node = Some(&self.0);
        for segment in path.segments() {
            node = match (segment, node) {
                (Segment::Key(_), None | Some(Value::Null)) => None,
                (Segment::Key(key), Some(Value::Object(map))) => map.get(key),
                (Segment::Index(index), Some(Value::Array(items))) => {
                    let len = items.len();
                    Some(items.get(*index).ok_or_else(|| {
                        EditorError::invalid_path(
                            path,
                            format!("index [{index}] out of bounds for array of length {len}"),
                        )
                    })?)
                }
                (Segment::Index(index), None) => {
                    return Err(EditorError::invalid_path(
                        path,
                        format!("cannot index [{index}] into a missing node"),
                    ))
                }
                (Segment::Key(key), Some(other)) => {
                    return Err(EditorError::invalid_path(
                        path,
                        format!("cannot set key `{key}` in {}", kind_of(other)),
                    ))
                }
                (Segment::Index(index), Some(other)) => {
                    return Err(EditorError::invalid_path(
                        path,
                        format!("cannot index [{index}] into {}", kind_of(other)),
                    ))
                }
            };
        }
        Ok(())
    }

    /// Removes and returns a node; absent nodes yield `None`.
    pub fn remove(&mut self, path: &Path) -> Option<Value> {
        let (last, parent) = path.segments().split_last()?;
        let mut node = &mut self.0;
        for segment in parent {
            node = match (segment, node) {
                (Segment::Key(key), Value::Object(map)) => map.get_mut(key)?,
                (Segment::Index(index), Value::Array(items)) => items.get_mut(*index)?,
                _ => return None,
            };
        }
        match (last, node) {
            (Segment::Key(key), Value::Object(map)) => map.shift_remove(key),
            (Segment::Index(index), Value::Array(items)) if *index < items.len() => {
                Some(items.remove(*index))
            }
            _ => None,
        }
    }

    /// Lays `other` over this document.
    ///
    /// Objects merge key by key with `other` winning every key it mentions; keys it does not
    /// mention keep their current value. Arrays and scalars are replaced whole. A null `other`
    /// carries no fields and leaves the document untouched.
    pub fn overlay(&mut self, other: &OptionDocument) {
        if other.0.is_null() {
            return;
        }
        overlay_value(&mut self.0, &other.0);
    }
}

/// One node-level change between two documents.
#[derive(Debug, Clone, PartialEq)]
pub enum DocEdit {
    Set(Path, Value),
    Remove(Path),
}

impl OptionDocument {
    /// The node-level changes that turn `base` into this document.
    ///
    /// Objects are compared key by key; any other differing node is reported whole.
    pub fn edits_since(&self, base: &OptionDocument) -> Vec<DocEdit> {
        let mut edits = Vec::new();
        diff_value(&base.0, &self.0, Path::root(), &mut edits);
        edits
    }

    /// Replays edits from [`edits_since`](Self::edits_since). Edits whose path no longer fits
    /// the document are skipped.
    pub fn apply_edits(&mut self, edits: &[DocEdit]) {
        for edit in edits {
            match edit {
                DocEdit::Set(path, value) => {
                    if let Err(err) = self.set(path, value.clone()) {
                        tracing::warn!(%err, "dropping local edit that no longer fits");
                    }
                }
                DocEdit::Remove(path) => {
                    self.remove(path);
                }
            }
        }
    }
}

fn diff_value(base: &Value, next: &Value, path: Path, edits: &mut Vec<DocEdit>) {
    if base == next {
        return;
    }
    match (base, next) {
        (Value::Object(before), Value::Object(after)) => {
            for (key, value) in after {
                match before.get(key) {
                    Some(old) => diff_value(old, value, path.clone().key(key.as_str()), edits),
                    None => edits.push(DocEdit::Set(path.clone().key(key.as_str()), value.clone())),
                }
            }
            for key in before.keys().filter(|key| !after.contains_key(*key)) {
                edits.push(DocEdit::Remove(path.clone().key(key.as_str())));
            }
        }
        _ => edits.push(DocEdit::Set(path, next.clone())),
    }
}

fn overlay_value(base: &mut Value, top: &Value) {
    match (base, top) {
        (Value::Object(base), Value::Object(top)) => {
            for (key, value) in top {
                match base.get_mut(key) {
                    Some(slot) => overlay_value(slot, value),
                    None => {
                        base.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (base, top) => *base = top.clone(),
    }
}

impl From<Value> for OptionDocument {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

impl From<OptionDocument> for Value {
    fn from(doc: OptionDocument) -> Self {
        doc.0
    }
}
