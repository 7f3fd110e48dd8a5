use std::{collections::BTreeMap, fmt};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single scalar attribute supplied by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeatureValue {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl FeatureValue {
    /// Numeric view of the value. Text is accepted when it parses as a number.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FeatureValue::Integer(v) => Some(*v as f64),
            FeatureValue::Float(v) => Some(*v),
            FeatureValue::Bool(v) => Some(if *v { 1.0 } else { 0.0 }),
            FeatureValue::Text(s) => s.trim().parse().ok(),
            FeatureValue::Null => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            FeatureValue::Null => "null",
            FeatureValue::Bool(_) => "bool",
            FeatureValue::Integer(_) => "integer",
            FeatureValue::Float(_) => "float",
            FeatureValue::Text(_) => "text",
        }
    }
}

impl fmt::Display for FeatureValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureValue::Null => f.write_str("null"),
            FeatureValue::Bool(v) => write!(f, "{v}"),
            FeatureValue::Integer(v) => write!(f, "{v}"),
            FeatureValue::Float(v) => write!(f, "{v}"),
            FeatureValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for FeatureValue {
    fn from(value: &str) -> Self {
        FeatureValue::Text(value.to_string())
    }
}

impl From<i64> for FeatureValue {
    fn from(value: i64) -> Self {
        FeatureValue::Integer(value)
    }
}

impl From<f64> for FeatureValue {
    fn from(value: f64) -> Self {
        FeatureValue::Float(value)
    }
}

/// Attempted to build a feature from a JSON array or object.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("feature '{0}' is not a scalar value")]
pub struct NonScalarFeature(pub String);

impl FeatureValue {
    /// Scalar JSON values map one to one; arrays and objects yield `None`.
    pub fn from_json(value: Value) -> Option<Self> {
        match value {
            Value::Null => Some(FeatureValue::Null),
            Value::Bool(v) => Some(FeatureValue::Bool(v)),
            Value::Number(n) => n
                .as_i64()
                .map(FeatureValue::Integer)
                .or_else(|| n.as_f64().map(FeatureValue::Float)),
            Value::String(s) => Some(FeatureValue::Text(s)),
            Value::Array(_) | Value::Object(_) => None,
        }
    }
}

/// Request-scoped mapping from feature name to value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureMap(BTreeMap<String, FeatureValue>);

impl FeatureMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<FeatureValue>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn remove(&mut self, name: &str) -> Option<FeatureValue> {
        self.0.remove(name)
    }

    pub fn get(&self, name: &str) -> Option<&FeatureValue> {
        self.0.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

impl<K: Into<String>, V: Into<FeatureValue>> FromIterator<(K, V)> for FeatureMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl TryFrom<serde_json::Map<String, Value>> for FeatureMap {
    type Error = NonScalarFeature;

    fn try_from(map: serde_json::Map<String, Value>) -> Result<Self, Self::Error> {
        let mut features = BTreeMap::new();
        for (name, value) in map {
            let value =
                FeatureValue::from_json(value).ok_or_else(|| NonScalarFeature(name.clone()))?;
            features.insert(name, value);
        }
        Ok(Self(features))
    }
}

/// A validated feature map laid out in schema order.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    columns: Vec<(String, FeatureValue)>,
}

impl FeatureRow {
    pub(crate) fn from_columns(columns: Vec<(String, FeatureValue)>) -> Self {
        Self { columns }
    }

    pub fn get(&self, name: &str) -> Option<&FeatureValue> {
        self.columns
            .iter()
            .find(|(column, _)| column == name)
            .map(|(_, value)| value)
    }

    pub fn columns(&self) -> impl Iterator<Item = (&str, &FeatureValue)> {
        self.columns.iter().map(|(name, value)| (name.as_str(), value))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductScore {
    pub product: String,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AllPredictions {
    pub predictions: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegistryMetadata {
    pub products: Vec<String>,
    pub required_features: Vec<String>,
}
