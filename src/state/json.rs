use serde_json::{Map, Value};

use super::Merge;

/// Dynamic records merge by overwriting top-level keys.
impl Merge for Map<String, Value> {
    type Patch = Map<String, Value>;

    fn merge(&self, patch: Self::Patch) -> Self {
        let mut next = self.clone();
        next.extend(patch);
        next
    }
}

/// A non-object value is replaced wholesale by a non-empty patch.
impl Merge for Value {
    type Patch = Map<String, Value>;

    fn merge(&self, patch: Self::Patch) -> Self {
        match self {
            Value::Object(map) => Value::Object(map.merge(patch)),
            _ if patch.is_empty() => self.clone(),
            _ => Value::Object(patch),
        }
    }
}
