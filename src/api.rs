//! Host-side helpers for working with script values from Rust.
//!
//! Structured data crosses the boundary as `serde_json::Value`, so
//! embedders can marshal inputs and results without driving the object
//! protocol by hand.
//!
//! # Example
//!
//! ```
//! use es3run::{api, Interpreter};
//!
//! let mut interp = Interpreter::new();
//! let result = interp.eval_str("({ name: 'deck', sizes: [1, 2, 3] })").unwrap();
//! let json = api::value_to_json(&mut interp, &result).unwrap();
//! assert_eq!(json["name"], "deck");
//! assert_eq!(json["sizes"][2], 3.0);
//! ```

use serde_json::{json, Map, Number};

use crate::error::JsError;
use crate::interpreter::Interpreter;
use crate::object::{self, Attrs, JsObjectRef};
use crate::string::JsString;
use crate::value::{to_number, to_uint32, Value};

/// Convert a script value to JSON. Functions and `undefined` become
/// `null`; non-finite numbers become `null` (JSON has no spelling for
/// them); cycles are reported as an error.
pub fn value_to_json(
    interp: &mut Interpreter,
    value: &Value,
) -> Result<serde_json::Value, JsError> {
    let mut visiting = Vec::new();
    convert_to_json(interp, value, &mut visiting)
}

fn convert_to_json(
    interp: &mut Interpreter,
    value: &Value,
    visiting: &mut Vec<*const ()>,
) -> Result<serde_json::Value, JsError> {
    match value {
        Value::Undefined | Value::Null => Ok(serde_json::Value::Null),
        Value::Boolean(b) => Ok(json!(*b)),
        Value::Number(n) => Ok(match Number::from_f64(*n) {
            Some(n) => serde_json::Value::Number(n),
            None => serde_json::Value::Null,
        }),
        Value::String(s) => Ok(json!(s.to_utf8_lossy())),
        Value::Object(obj) => {
            if obj.borrow().has_call() {
                return Ok(serde_json::Value::Null);
            }
            let ptr = obj.as_ptr() as *const ();
            if visiting.contains(&ptr) {
                return Err(JsError::internal("cyclic object graph has no JSON form"));
            }
            visiting.push(ptr);
            let result = convert_object_to_json(interp, obj, visiting);
            visiting.pop();
            result
        }
    }
}

fn convert_object_to_json(
    interp: &mut Interpreter,
    obj: &JsObjectRef,
    visiting: &mut Vec<*const ()>,
) -> Result<serde_json::Value, JsError> {
    if obj.borrow().array_length().is_some() {
        let length_name = interp.intern("length");
        let len = to_uint32(to_number(interp, &object::get(obj, &length_name))?);
        let mut items = Vec::with_capacity(len as usize);
        for i in 0..len {
            let name = interp.intern(&i.to_string());
            let element = object::get(obj, &name);
            items.push(convert_to_json(interp, &element, visiting)?);
        }
        return Ok(serde_json::Value::Array(items));
    }

    let mut map = Map::new();
    for name in object::enumerate(obj) {
        let v = object::get(obj, &name);
        map.insert(name.to_utf8_lossy(), convert_to_json(interp, &v, visiting)?);
    }
    Ok(serde_json::Value::Object(map))
}

/// Build a script value from JSON.
pub fn json_to_value(interp: &mut Interpreter, json: &serde_json::Value) -> Value {
    match json {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Boolean(*b),
        serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
        serde_json::Value::String(s) => Value::String(JsString::from(s.as_str())),
        serde_json::Value::Array(items) => {
            let arr = interp.make_array();
            for (i, item) in items.iter().enumerate() {
                let v = json_to_value(interp, item);
                let name = interp.intern(&i.to_string());
                object::put(&arr, &name, v, Attrs::NONE);
            }
            Value::Object(arr)
        }
        serde_json::Value::Object(map) => {
            let obj =
                crate::object::JsObject::ordinary(Some(interp.object_prototype.clone()));
            for (key, item) in map {
                let v = json_to_value(interp, item);
                let name = interp.intern(key);
                object::put(&obj, &name, v, Attrs::NONE);
            }
            Value::Object(obj)
        }
    }
}

/// Read a named property from the global object.
pub fn global_get(interp: &mut Interpreter, name: &str) -> Value {
    let name = interp.intern(name);
    let global = interp.global.clone();
    object::get(&global, &name)
}

/// Bind a value on the global object.
pub fn global_set(interp: &mut Interpreter, name: &str, value: Value) {
    let name = interp.intern(name);
    let global = interp.global.clone();
    object::put(&global, &name, value, Attrs::NONE);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_through_json() {
        let mut interp = Interpreter::new();
        let original = json!({"a": 1.5, "b": [true, null, "x"], "c": {"d": "e"}});
        let value = json_to_value(&mut interp, &original);
        let back = value_to_json(&mut interp, &value).unwrap();
        assert_eq!(original, back);
    }

    #[test]
    fn functions_serialize_as_null() {
        let mut interp = Interpreter::new();
        let f = interp.eval_str("(function(){ return 1 })").unwrap();
        let json = value_to_json(&mut interp, &f).unwrap();
        assert_eq!(json, serde_json::Value::Null);
    }

    #[test]
    fn global_bindings_visible_to_scripts() {
        let mut interp = Interpreter::new();
        global_set(&mut interp, "answer", Value::Number(42.0));
        let v = interp.eval_str("answer - 2").unwrap();
        assert_eq!(v.as_number(), Some(40.0));
    }
}
