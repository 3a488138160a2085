use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Account record returned by the `me` endpoint.
///
/// The payload is kept verbatim, including malformed or partial records; only
/// `username` is interpreted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Account(Value);

impl Account {
    pub fn new(raw: Value) -> Self {
        Self(raw)
    }

    /// Username, or `None` when missing or empty.
    ///
    /// Numeric usernames are rendered as their decimal text.
    pub fn username(&self) -> Option<String> {
        match self.0.get("username")? {
            Value::String(name) if !name.is_empty() => Some(name.clone()),
            Value::Number(num) => Some(num.to_string()),
            _ => None,
        }
    }

    /// Avatar URL under `avatar_base`, or `None` without a username.
    pub fn avatar_url(&self, avatar_base: &str) -> Option<String> {
        let username = self.username()?;
        Some(format!("{}/{username}", avatar_base.trim_end_matches('/')))
    }

    /// The raw record. JSON `null` reads as an empty object.
    pub fn to_object(&self) -> Value {
        match &self.0 {
            Value::Null => Value::Object(Map::new()),
            other => other.clone(),
        }
    }
}

impl From<Value> for Account {
    fn from(raw: Value) -> Self {
        Self(raw)
    }
}
