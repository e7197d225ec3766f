//! Context value model.
//!
//! A render context is a [`Map`] of names to [`Value`]s. Callables are
//! modelled as two explicit variants rather than being detected at lookup
//! time:
//!
//! - [`Value::Lambda`]: a plain callable variable, invoked with the local
//!   context as receiver; its return value takes its place.
//! - [`Value::Section`]: a higher-order section, handed the raw section body
//!   and a callback that renders text against the current context.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::RenderError;

// ---------------------------------------------------------------------------
// Callables
// ---------------------------------------------------------------------------

/// Callback handed to a [`SectionLambda`]; renders a text fragment against the
/// context the section was found in.
pub type RenderFn<'a> = dyn FnMut(&str) -> Result<String, RenderError> + 'a;

type LambdaFn = dyn Fn(&Map) -> Value + Send + Sync;
type SectionFn =
    dyn Fn(&str, &mut RenderFn<'_>) -> Result<String, RenderError> + Send + Sync;

/// A callable variable. Receives the local context, returns the value to use.
#[derive(Clone)]
pub struct Lambda(Arc<LambdaFn>);

impl Lambda {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Map) -> Value + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Invoke with `receiver` bound as the lambda's context.
    pub fn call(&self, receiver: &Map) -> Value {
        (self.0)(receiver)
    }
}

impl fmt::Debug for Lambda {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Lambda(..)")
    }
}

/// A higher-order section callable.
///
/// Called with the unrendered section body and a render callback; the
/// returned text is used verbatim as the section's output.
#[derive(Clone)]
pub struct SectionLambda(Arc<SectionFn>);

impl SectionLambda {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&str, &mut RenderFn<'_>) -> Result<String, RenderError> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    pub fn call(&self, content: &str, render: &mut RenderFn<'_>) -> Result<String, RenderError> {
        (self.0)(content, render)
    }
}

impl fmt::Debug for SectionLambda {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SectionLambda(..)")
    }
}

// ---------------------------------------------------------------------------
// Value
// ---------------------------------------------------------------------------

/// A single context value.
#[derive(Debug, Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<Value>),
    Map(Map),
    Lambda(Lambda),
    Section(SectionLambda),
}

impl Value {
    /// Truthiness used by sections: `null`, `false`, zero, NaN and the empty
    /// string are falsy. Collections are truthy even when empty; sections
    /// check emptiness separately.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Float(f) => *f != 0.0 && !f.is_nan(),
            Value::String(s) => !s.is_empty(),
            Value::List(_) | Value::Map(_) | Value::Lambda(_) | Value::Section(_) => true,
        }
    }

    /// Whether a lookup should stop at this value instead of falling back to
    /// an outer scope. Truthy values qualify, and so do `false` and zero.
    pub fn is_present(&self) -> bool {
        match self {
            Value::Bool(_) | Value::Int(_) => true,
            Value::Float(f) => !f.is_nan(),
            other => other.is_truthy(),
        }
    }

    /// `true` for an empty [`Value::List`].
    pub fn is_empty_list(&self) -> bool {
        matches!(self, Value::List(items) if items.is_empty())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&Map> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Human-readable name of the variant, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Int(_) => "integer",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Lambda(_) => "lambda",
            Value::Section(_) => "section lambda",
        }
    }

    /// Text substituted for a variable tag, before escaping.
    ///
    /// Lists join their elements with `,`. Mappings and callables have no
    /// textual form and render empty; lambdas are invoked by the resolver
    /// before this is reached.
    pub fn to_text(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Bool(b) => b.to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => float_text(*f),
            Value::String(s) => s.clone(),
            Value::List(items) => items
                .iter()
                .map(Value::to_text)
                .collect::<Vec<_>>()
                .join(","),
            Value::Map(_) | Value::Lambda(_) | Value::Section(_) => String::new(),
        }
    }
}

fn float_text(f: f64) -> String {
    if f.is_nan() {
        "NaN".to_string()
    } else if f.is_infinite() {
        let text = if f > 0.0 { "Infinity" } else { "-Infinity" };
        text.to_string()
    } else if f == 0.0 {
        "0".to_string()
    } else if f.fract() == 0.0 && f.abs() < 1e21 {
        format!("{f:.0}")
    } else {
        f.to_string()
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Lambda(a), Value::Lambda(b)) => Arc::ptr_eq(&a.0, &b.0),
            (Value::Section(a), Value::Section(b)) => Arc::ptr_eq(&a.0, &b.0),
            _ => false,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map_or(Value::Null, Into::into)
    }
}

impl From<Map> for Value {
    fn from(m: Map) -> Self {
        Value::Map(m)
    }
}

impl From<Lambda> for Value {
    fn from(l: Lambda) -> Self {
        Value::Lambda(l)
    }
}

impl From<SectionLambda> for Value {
    fn from(s: SectionLambda) -> Self {
        Value::Section(s)
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(obj) => Value::Map(Map::from(obj)),
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        serde_json::Value::deserialize(deserializer).map(Value::from)
    }
}

// ---------------------------------------------------------------------------
// Map
// ---------------------------------------------------------------------------

/// A context scope: variable name → [`Value`].
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct Map(BTreeMap<String, Value>);

impl Map {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a context from any serializable data. The data must serialize
    /// to a mapping.
    pub fn from_serialize<T: Serialize + ?Sized>(data: &T) -> Result<Self, RenderError> {
        match serde_json::to_value(data)? {
            serde_json::Value::Object(obj) => Ok(Map::from(obj)),
            other => Err(RenderError::InvalidContext {
                found: Value::from(other).kind(),
            }),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(name.into(), value.into())
    }

    pub fn contains_key(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }
}

impl From<BTreeMap<String, Value>> for Map {
    fn from(inner: BTreeMap<String, Value>) -> Self {
        Self(inner)
    }
}

impl From<serde_json::Map<String, serde_json::Value>> for Map {
    fn from(obj: serde_json::Map<String, serde_json::Value>) -> Self {
        obj.into_iter().map(|(k, v)| (k, Value::from(v))).collect()
    }
}

impl TryFrom<serde_json::Value> for Map {
    type Error = RenderError;

    fn try_from(json: serde_json::Value) -> Result<Self, Self::Error> {
        match json {
            serde_json::Value::Object(obj) => Ok(Map::from(obj)),
            other => Err(RenderError::InvalidContext {
                found: Value::from(other).kind(),
            }),
        }
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Map {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl IntoIterator for Map {
    type Item = (String, Value);
    type IntoIter = std::collections::btree_map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
