//! Navigation of nested catalog response trees.
//!
//! Catalog responses are JSON renditions of XML metadata documents: maps
//! keyed by qualified element names, lists where an element repeats, and
//! scalars at the leaves. A repeated element that occurs only once is
//! rendered as a plain map, so [Step::First] accepts either shape.
//!
//! Paths are declared once as [NodePath] constants next to the mapper that
//! uses them; extraction failures name the first key that was missing.

use serde_json::Value;

use crate::error::MappingError;

/// A single step into a response tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Descend into the child with this key.
    Key(&'static str),
    /// Descend into the first element of a list, or stay on a lone map.
    First,
}

/// A named path through a response tree.
#[derive(Debug, Clone, Copy)]
pub struct NodePath {
    /// Human readable name of the extracted field, used in errors.
    pub field: &'static str,
    pub steps: &'static [Step],
}

impl NodePath {
    pub const fn new(field: &'static str, steps: &'static [Step]) -> Self {
        Self { field, steps }
    }

    fn render(steps: &[Step]) -> String {
        steps
            .iter()
            .map(|step| match step {
                Step::Key(key) => (*key).to_string(),
                Step::First => "[0]".to_string(),
            })
            .collect::<Vec<_>>()
            .join("/")
    }

    fn missing(&self, at: usize) -> MappingError {
        let key = match self.steps[at] {
            Step::Key(key) => key.to_string(),
            Step::First => "[0]".to_string(),
        };
        MappingError::MissingField {
            field: self.field,
            key,
            path: Self::render(&self.steps[..at]),
        }
    }

    /// Resolve the node at the end of this path.
    pub fn resolve<'a>(&self, node: &'a Value) -> Result<&'a Value, MappingError> {
        let mut current = node;
        for (at, step) in self.steps.iter().enumerate() {
            let next = match (step, current) {
                (Step::Key(key), Value::Object(map)) => map.get(*key),
                (Step::First, Value::Array(items)) => items.first(),
                (Step::First, Value::Object(_)) => Some(current),
                _ => None,
            };
            current = match next {
                Some(Value::Null) | None => return Err(self.missing(at)),
                Some(next) => next,
            };
        }
        Ok(current)
    }

    /// Resolve a scalar leaf as text.
    ///
    /// Numbers and booleans are rendered as text; an element carrying
    /// attributes is rendered as a map with its text under `#text`.
    pub fn text(&self, node: &Value) -> Result<String, MappingError> {
        let leaf = self.resolve(node)?;
        scalar_text(leaf).ok_or_else(|| MappingError::InvalidValue {
            field: self.field,
            value: leaf.to_string(),
        })
    }

    /// Resolve a decimal leaf given either as a JSON number or as text.
    pub fn decimal(&self, node: &Value) -> Result<f64, MappingError> {
        let leaf = self.resolve(node)?;
        let parsed = match leaf {
            Value::Number(number) => number.as_f64(),
            _ => scalar_text(leaf).and_then(|text| text.trim().parse::<f64>().ok()),
        };
        parsed
            .filter(|value| value.is_finite())
            .ok_or_else(|| MappingError::InvalidValue {
                field: self.field,
                value: leaf.to_string(),
            })
    }

    /// Resolve a leaf holding two whitespace separated decimals.
    pub fn corner(&self, node: &Value) -> Result<(f64, f64), MappingError> {
        let text = self.text(node)?;
        let invalid = || MappingError::InvalidValue {
            field: self.field,
            value: text.clone(),
        };
        let mut parts = text.split_whitespace().map(str::parse::<f64>);
        match (parts.next(), parts.next(), parts.next()) {
            (Some(Ok(first)), Some(Ok(second)), None) => Ok((first, second)),
            _ => Err(invalid()),
        }
    }
}

fn scalar_text(node: &Value) -> Option<String> {
    match node {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Object(map) => map.get("#text").and_then(scalar_text),
        Value::Null | Value::Array(_) => None,
    }
}

/// Treat a node that may be a single item or a list of items as a list.
pub fn as_list(node: &Value) -> Vec<Value> {
    match node {
        Value::Array(items) => items.clone(),
        Value::Null => Vec::new(),
        other => vec![other.clone()],
    }
}
