// Diagnostic serializer
//
// Turns values into compact JSON text for failure messages. Encoding goes
// through serde_json; the `Serialize` impl below tracks the identities of the
// shared references currently being encoded and refuses to re-enter one.
// `serialize` never fails: a cycle produces the fixed fallback text instead,
// so building an error message cannot itself raise.

use crate::error::Result;
use crate::value::Value;
use serde::ser::{Error as _, Serialize, SerializeMap, SerializeSeq, Serializer};
use std::cell::RefCell;

/// Text substituted for a value that cannot be encoded because it contains a cycle.
pub const CIRCULAR_STRUCTURE: &str = "TypeError: Converting circular structure to JSON";

/// Serializes a value to compact JSON, falling back to [`CIRCULAR_STRUCTURE`].
///
/// # Example
///
/// ```ignore
/// use xdotoolify::{serialize, SharedValue, Value};
///
/// let value = Value::from(vec![Value::object([("a", 5)]), Value::from(6)]);
/// assert_eq!(serialize(&value), r#"[{"a":5},6]"#);
///
/// let node = SharedValue::new(Value::object::<&str, Value>([]));
/// node.insert("b", Value::Shared(node.clone()));
/// assert_eq!(serialize(&Value::Shared(node)), "TypeError: Converting circular structure to JSON");
/// ```
pub fn serialize(value: &Value) -> String {
    match try_serialize(value) {
        Ok(text) => text,
        Err(e) => {
            tracing::trace!("Falling back to placeholder text: {}", e);
            CIRCULAR_STRUCTURE.to_string()
        }
    }
}

/// Serializes a value to compact JSON, reporting cycles as an error.
pub fn try_serialize(value: &Value) -> Result<String> {
    Ok(serde_json::to_string(value)?)
}

/// Serializes call arguments for diagnostics, comma separated.
pub fn serialize_args(args: &[Value]) -> String {
    args.iter().map(serialize).collect::<Vec<_>>().join(", ")
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let ancestors = RefCell::new(Vec::new());
        Tracked {
            value: self,
            ancestors: &ancestors,
        }
        .serialize(serializer)
    }
}

/// A value paired with the identities of the shared references enclosing it.
struct Tracked<'a> {
    value: &'a Value,
    ancestors: &'a RefCell<Vec<usize>>,
}

impl Tracked<'_> {
    fn child<'b>(&'b self, value: &'b Value) -> Tracked<'b> {
        Tracked {
            value,
            ancestors: self.ancestors,
        }
    }
}

impl Serialize for Tracked<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self.value {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Number(n) => n.serialize(serializer),
            Value::String(s) => serializer.serialize_str(s),
            Value::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(&self.child(item))?;
                }
                seq.end()
            }
            Value::Object(map) => {
                let mut out = serializer.serialize_map(Some(map.len()))?;
                for (key, item) in map {
                    out.serialize_entry(key, &self.child(item))?;
                }
                out.end()
            }
            Value::Shared(shared) => {
                let id = shared.identity();
                if self.ancestors.borrow().contains(&id) {
                    return Err(S::Error::custom(CIRCULAR_STRUCTURE));
                }
                self.ancestors.borrow_mut().push(id);
                let guard = shared.read();
                let result = self.child(&guard).serialize(serializer);
                drop(guard);
                self.ancestors.borrow_mut().pop();
                result
            }
        }
    }
}
