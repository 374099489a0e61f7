// Value - dynamic data observed from a page
//
// Producers return a `Value`. Plain trees behave like JSON, while `Shared`
// references allow aliasing and therefore cycles, which is what makes the
// cycle-safe serializer necessary.

use parking_lot::{RwLock, RwLockReadGuard};
use serde_json::Number;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::Arc;

/// A value produced by a page callback.
///
/// # Example
///
/// ```ignore
/// use xdotoolify::{SharedValue, Value};
///
/// let value = Value::from(vec![Value::object([("a", 5)]), Value::from(6)]);
/// assert_eq!(value.index(0).and_then(|v| v.get("a")), Some(Value::from(5)));
///
/// // A self-referential object
/// let node = SharedValue::new(Value::object::<&str, Value>([]));
/// node.insert("b", Value::Shared(node.clone()));
/// ```
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    Array(Vec<Value>),
    Object(BTreeMap<String, Value>),
    /// Reference to a value that may be aliased elsewhere (or by itself)
    Shared(SharedValue),
}

/// Reference-counted, interior-mutable value.
///
/// Identity is the allocation: two `SharedValue`s are the same object only if
/// they were cloned from one another.
#[derive(Clone)]
pub struct SharedValue(Arc<RwLock<Value>>);

impl SharedValue {
    pub fn new(value: Value) -> Self {
        Self(Arc::new(RwLock::new(value)))
    }

    /// Replaces the referenced value.
    pub fn set(&self, value: Value) {
        *self.0.write() = value;
    }

    /// Inserts a key if the referenced value is an object. Other values are left untouched.
    pub fn insert(&self, key: impl Into<String>, value: Value) {
        if let Value::Object(map) = &mut *self.0.write() {
            map.insert(key.into(), value);
        }
    }

    /// Appends to the referenced value if it is an array.
    pub fn push(&self, value: Value) {
        if let Value::Array(items) = &mut *self.0.write() {
            items.push(value);
        }
    }

    /// Read access. Recursive so that walking a cycle never deadlocks behind a
    /// queued writer.
    pub fn read(&self) -> RwLockReadGuard<'_, Value> {
        self.0.read_recursive()
    }

    /// Address of the shared allocation, used as the object identity.
    pub(crate) fn identity(&self) -> usize {
        Arc::as_ptr(&self.0) as *const () as usize
    }

    pub fn ptr_eq(&self, other: &SharedValue) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for SharedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never recurse: the referenced value may contain this reference.
        write!(f, "Shared({:#x})", self.identity())
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("Null"),
            Value::Bool(b) => write!(f, "Bool({b})"),
            Value::Number(n) => write!(f, "Number({n})"),
            Value::String(s) => write!(f, "String({s:?})"),
            Value::Array(items) => f.debug_list().entries(items).finish(),
            Value::Object(map) => f.debug_map().entries(map).finish(),
            Value::Shared(shared) => fmt::Debug::fmt(shared, f),
        }
    }
}

impl fmt::Display for Value {
    /// Formats through the diagnostic serializer, so cycles never panic.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&crate::serializer::serialize(self))
    }
}

impl Value {
    /// Builds an object from key/value pairs.
    pub fn object<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        Value::Object(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Wraps this value in a new shared reference.
    pub fn shared(self) -> Self {
        Value::Shared(SharedValue::new(self))
    }

    pub fn is_null(&self) -> bool {
        self.resolve(|v| matches!(v, Value::Null))
    }

    pub fn as_bool(&self) -> Option<bool> {
        self.resolve(|v| match v {
            Value::Bool(b) => Some(*b),
            _ => None,
        })
    }

    pub fn as_i64(&self) -> Option<i64> {
        self.resolve(|v| match v {
            Value::Number(n) => n.as_i64(),
            _ => None,
        })
    }

    pub fn as_f64(&self) -> Option<f64> {
        self.resolve(|v| match v {
            Value::Number(n) => n.as_f64(),
            _ => None,
        })
    }

    pub fn as_str(&self) -> Option<String> {
        self.resolve(|v| match v {
            Value::String(s) => Some(s.clone()),
            _ => None,
        })
    }

    /// Looks up a key of an object, following shared references.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.resolve(|v| match v {
            Value::Object(map) => map.get(key).cloned(),
            _ => None,
        })
    }

    /// Looks up an element of an array, following shared references.
    pub fn index(&self, i: usize) -> Option<Value> {
        self.resolve(|v| match v {
            Value::Array(items) => items.get(i).cloned(),
            _ => None,
        })
    }

    /// Runs `f` on the first non-`Shared` value reachable from `self`.
    fn resolve<T, F: FnOnce(&Value) -> T>(&self, f: F) -> T {
        resolve_inner(self, &mut HashSet::new(), f)
    }

    /// Structural equality.
    ///
    /// Numbers compare by numeric value, arrays by position, objects by key set
    /// and per-key equality. Shared references compare through their contents;
    /// a pair of references already under comparison is assumed equal, which
    /// keeps the walk finite on cyclic values.
    pub fn deep_eq(&self, other: &Value) -> bool {
        let mut visiting = HashSet::new();
        deep_eq_inner(self, other, &mut visiting)
    }
}

fn resolve_inner<T, F>(value: &Value, seen: &mut HashSet<usize>, f: F) -> T
where
    F: FnOnce(&Value) -> T,
{
    match value {
        Value::Shared(shared) => {
            // A reference chain that loops without passing through a
            // container has no concrete value; treat it as null.
            if !seen.insert(shared.identity()) {
                return f(&Value::Null);
            }
            let guard = shared.read();
            resolve_inner(&guard, seen, f)
        }
        other => f(other),
    }
}

fn deep_eq_inner(a: &Value, b: &Value, visiting: &mut HashSet<(usize, usize)>) -> bool {
    match (a, b) {
        (Value::Shared(x), Value::Shared(y)) => {
            if x.ptr_eq(y) {
                return true;
            }
            let key = (x.identity(), y.identity());
            if !visiting.insert(key) {
                return true;
            }
            let result = deep_eq_inner(&x.read(), &y.read(), visiting);
            visiting.remove(&key);
            result
        }
        (Value::Shared(x), other) => {
            let key = (x.identity(), 0);
            if !visiting.insert(key) {
                return false;
            }
            let result = deep_eq_inner(&x.read(), other, visiting);
            visiting.remove(&key);
            result
        }
        (other, Value::Shared(y)) => {
            let key = (0, y.identity());
            if !visiting.insert(key) {
                return false;
            }
            let result = deep_eq_inner(other, &y.read(), visiting);
            visiting.remove(&key);
            result
        }
        (Value::Null, Value::Null) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => x == y,
            _ => x.as_f64() == y.as_f64(),
        },
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .zip(ys)
                    .all(|(x, y)| deep_eq_inner(x, y, visiting))
        }
        (Value::Object(xs), Value::Object(ys)) => {
            xs.len() == ys.len()
                && xs.iter().all(|(k, x)| {
                    ys.get(k)
                        .is_some_and(|y| deep_eq_inner(x, y, visiting))
                })
        }
        _ => false,
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.deep_eq(other)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

macro_rules! from_integer {
    ($($t:ty),*) => {
        $(impl From<$t> for Value {
            fn from(n: $t) -> Self {
                Value::Number(Number::from(n))
            }
        })*
    };
}

from_integer!(i8, i16, i32, i64, u8, u16, u32, u64, usize, isize);

impl From<f64> for Value {
    /// Integral floats become integers and non-finite floats become null,
    /// matching how JSON text would carry them.
    fn from(f: f64) -> Self {
        if f.is_finite() && f.fract() == 0.0 && f.abs() < 9_007_199_254_740_992.0 {
            return Value::Number(Number::from(f as i64));
        }
        Number::from_f64(f).map_or(Value::Null, Value::Number)
    }
}

impl From<f32> for Value {
    fn from(f: f32) -> Self {
        Value::from(f as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<SharedValue> for Value {
    fn from(shared: SharedValue) -> Self {
        Value::Shared(shared)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::Array(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map_or(Value::Null, Into::into)
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_f64() {
                Some(f) if n.is_f64() => Value::from(f),
                _ => Value::Number(n),
            },
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::Array(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => {
                Value::Object(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Value::Null
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_object_equality_ignores_key_order() {
        let a = Value::from(json!({"a": 1, "b": 2}));
        let b = Value::object([("b", 2), ("a", 1)]);
        assert_eq!(a, b);
        assert_ne!(a, Value::object([("a", 2), ("b", 2)]));
    }

    #[test]
    fn test_array_equality_is_ordered() {
        assert_eq!(Value::from(vec![1, 2]), Value::from(json!([1, 2])));
        assert_ne!(Value::from(vec![1, 2]), Value::from(vec![2, 1]));
        assert_ne!(Value::from(vec![1, 2]), Value::from(vec![1, 2, 3]));
    }

    #[test]
    fn test_numbers_compare_by_value() {
        assert_eq!(Value::from(10), Value::from(10.0));
        assert_eq!(Value::from(json!(2.0)), Value::from(2));
        assert_ne!(Value::from(1), Value::from("1"));
        assert!(Value::from(f64::NAN).is_null());
    }

    #[test]
    fn test_shared_compares_through_contents() {
        let shared = Value::from(vec![1, 2]).shared();
        assert_eq!(shared, Value::from(vec![1, 2]));
        assert_eq!(Value::from(vec![1, 2]), shared);
    }

    #[test]
    fn test_cyclic_values_compare_without_overflow() {
        let a = SharedValue::new(Value::object::<&str, Value>([]));
        a.insert("b", Value::Shared(a.clone()));
        let b = SharedValue::new(Value::object::<&str, Value>([]));
        b.insert("b", Value::Shared(b.clone()));

        assert_eq!(Value::Shared(a.clone()), Value::Shared(b));
        assert_ne!(Value::Shared(a), Value::object([("b", Value::Null)]));
    }

    #[test]
    fn test_accessors_follow_shared_references() {
        let value = Value::from(vec![Value::object([("a", 5)]), Value::from(6)]).shared();
        assert_eq!(value.index(0).and_then(|v| v.get("a")), Some(Value::from(5)));
        assert_eq!(value.index(1).and_then(|v| v.as_i64()), Some(6));
        assert_eq!(value.index(2), None);
    }

    #[test]
    fn test_debug_does_not_recurse_into_cycles() {
        let node = SharedValue::new(Value::from(Vec::<Value>::new()));
        node.push(Value::Shared(node.clone()));
        let debug = format!("{:?}", Value::Shared(node));
        assert!(debug.starts_with("Shared("));
    }
}
