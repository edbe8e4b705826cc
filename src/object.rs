//! Object representation and the uniform object protocol.
//!
//! Every object is a `JsObject` behind a shared `Rc<RefCell<..>>` handle: a
//! `[[Class]]` token, an optional prototype, a table of own named
//! properties, and a data payload distinguishing ordinary objects from the
//! kinds the engine itself must understand (arrays, function instances,
//! native functions, primitive wrappers, activations).
//!
//! The protocol operations that never run script code (get, put, canput,
//! hasproperty, delete, enumerate) live here. DefaultValue, Call,
//! Construct and HasInstance can re-enter the evaluator and are methods on
//! the interpreter.

use std::cell::RefCell;
use std::hash::BuildHasherDefault;
use std::rc::Rc;

use indexmap::IndexMap;
use rustc_hash::{FxHashSet, FxHasher};

type FxBuildHasher = BuildHasherDefault<FxHasher>;

use crate::ast;
use crate::context::ScopeRef;
use crate::error::JsError;
use crate::interpreter::Interpreter;
use crate::string::JsString;
use crate::value::Value;

/// Shared object handle. Objects are owned by their interpreter's object
/// graph and freed when the last handle drops.
pub type JsObjectRef = Rc<RefCell<JsObject>>;

/// Property attribute set: `{ReadOnly, DontEnum, DontDelete}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Attrs(u8);

impl Attrs {
    pub const NONE: Attrs = Attrs(0);
    pub const READ_ONLY: Attrs = Attrs(1);
    pub const DONT_ENUM: Attrs = Attrs(2);
    pub const DONT_DELETE: Attrs = Attrs(4);

    pub const fn union(self, other: Attrs) -> Attrs {
        Attrs(self.0 | other.0)
    }

    pub fn read_only(self) -> bool {
        self.0 & Attrs::READ_ONLY.0 != 0
    }

    pub fn dont_enum(self) -> bool {
        self.0 & Attrs::DONT_ENUM.0 != 0
    }

    pub fn dont_delete(self) -> bool {
        self.0 & Attrs::DONT_DELETE.0 != 0
    }
}

/// A named own property.
#[derive(Debug, Clone)]
pub struct Property {
    pub value: Value,
    pub attrs: Attrs,
}

/// Signature of a host function exposed to scripts. The callee object is
/// passed first (several natives dispatch on it); `this` is None when the
/// call has no base object.
pub type NativeFn = fn(
    &mut Interpreter,
    &JsObjectRef,
    Option<&JsObjectRef>,
    &[Value],
) -> Result<Value, JsError>;

/// Signature of a host constructor. The callee is the constructor object
/// being instantiated.
pub type NativeCtor =
    fn(&mut Interpreter, &JsObjectRef, &[Value]) -> Result<JsObjectRef, JsError>;

/// A function instance: a parsed function plus the scope chain captured
/// where the instance was created.
#[derive(Debug)]
pub struct FunctionData {
    pub func: Rc<ast::Function>,
    pub scope: ScopeRef,
}

/// A host function wrapped as a callable object.
pub struct NativeData {
    pub name: JsString,
    pub call: Option<NativeFn>,
    pub construct: Option<NativeCtor>,
}

impl std::fmt::Debug for NativeData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeData")
            .field("name", &self.name)
            .field("call", &self.call.is_some())
            .field("construct", &self.construct.is_some())
            .finish()
    }
}

/// Payload distinguishing the object kinds the engine special-cases.
#[derive(Debug)]
pub enum ObjectData {
    Ordinary,
    /// Array objects carry `length` outside the property table so index
    /// writes can maintain it.
    Array { length: u32 },
    Function(FunctionData),
    Native(NativeData),
    StringWrapper(JsString),
    NumberWrapper(f64),
    BooleanWrapper(bool),
    /// Per-call variable object. The callee base of a reference rooted in
    /// an activation is dropped, so `this` stays the global object.
    Activation,
}

#[derive(Debug)]
pub struct JsObject {
    /// `[[Class]]` token.
    pub class: &'static str,
    pub prototype: Option<JsObjectRef>,
    pub properties: IndexMap<JsString, Property, FxBuildHasher>,
    pub data: ObjectData,
}

impl JsObject {
    pub fn new(class: &'static str, prototype: Option<JsObjectRef>, data: ObjectData) -> JsObjectRef {
        Rc::new(RefCell::new(JsObject {
            class,
            prototype,
            properties: IndexMap::default(),
            data,
        }))
    }

    pub fn ordinary(prototype: Option<JsObjectRef>) -> JsObjectRef {
        JsObject::new("Object", prototype, ObjectData::Ordinary)
    }

    /// Insert or overwrite an own property with explicit attributes,
    /// bypassing the protocol's ReadOnly check. Used while wiring objects
    /// up.
    pub fn define(&mut self, name: JsString, value: Value, attrs: Attrs) {
        self.properties.insert(name, Property { value, attrs });
    }

    pub fn has_call(&self) -> bool {
        match &self.data {
            ObjectData::Function(_) => true,
            ObjectData::Native(n) => n.call.is_some(),
            _ => false,
        }
    }

    pub fn has_construct(&self) -> bool {
        match &self.data {
            ObjectData::Function(_) => true,
            ObjectData::Native(n) => n.construct.is_some(),
            _ => false,
        }
    }

    pub fn has_hasinstance(&self) -> bool {
        self.has_call()
    }

    pub fn is_activation(&self) -> bool {
        matches!(self.data, ObjectData::Activation)
    }

    pub fn array_length(&self) -> Option<u32> {
        match &self.data {
            ObjectData::Array { length } => Some(*length),
            _ => None,
        }
    }
}

/// `[[Get]]`: own property, engine-maintained specials, then the prototype
/// chain; `undefined` when nothing is found.
pub fn get(obj: &JsObjectRef, name: &JsString) -> Value {
    let mut current = obj.clone();
    loop {
        let next = {
            let borrowed = current.borrow();
            if let Some(prop) = borrowed.properties.get(name) {
                return prop.value.clone();
            }
            if let Some(v) = special_get(&borrowed, name) {
                return v;
            }
            borrowed.prototype.clone()
        };
        match next {
            Some(proto) => current = proto,
            None => return Value::Undefined,
        }
    }
}

fn special_get(obj: &JsObject, name: &JsString) -> Option<Value> {
    match &obj.data {
        ObjectData::Array { length } => {
            if is_length(name) {
                Some(Value::Number(f64::from(*length)))
            } else {
                None
            }
        }
        ObjectData::StringWrapper(s) => {
            if is_length(name) {
                Some(Value::Number(s.len() as f64))
            } else {
                None
            }
        }
        _ => None,
    }
}

fn is_length(name: &JsString) -> bool {
    name.with_units(|u| u.len() == 6 && u.iter().zip(b"length").all(|(&a, &b)| a == u16::from(b)))
}

/// `[[CanPut]]`: own attributes first, then the prototype chain.
pub fn can_put(obj: &JsObjectRef, name: &JsString) -> bool {
    let mut current = obj.clone();
    loop {
        let next = {
            let borrowed = current.borrow();
            if let Some(prop) = borrowed.properties.get(name) {
                return !prop.attrs.read_only();
            }
            match &borrowed.data {
                ObjectData::Array { .. } if is_length(name) => return true,
                ObjectData::StringWrapper(_) if is_length(name) => return false,
                _ => {}
            }
            borrowed.prototype.clone()
        };
        match next {
            Some(proto) => current = proto,
            None => return true,
        }
    }
}

/// `[[Put]]`: a silent no-op when `[[CanPut]]` denies the write.
pub fn put(obj: &JsObjectRef, name: &JsString, value: Value, attrs: Attrs) {
    if !can_put(obj, name) {
        return;
    }

    let mut borrowed = obj.borrow_mut();
    if let ObjectData::Array { length } = &mut borrowed.data {
        if is_length(name) {
            let new_len = crate::value::to_uint32(match &value {
                Value::Number(n) => *n,
                Value::String(s) => crate::value::string_to_number(s, false),
                Value::Boolean(b) => f64::from(*b),
                _ => 0.0,
            });
            let old_len = *length;
            *length = new_len;
            if new_len < old_len {
                borrowed
                    .properties
                    .retain(|k, _| match array_index(k) {
                        Some(i) => i < new_len,
                        None => true,
                    });
            }
            return;
        }
        if let Some(index) = array_index(name) {
            if index >= *length {
                *length = index + 1;
            }
        }
    }

    match borrowed.properties.get_mut(name) {
        Some(prop) => prop.value = value,
        None => {
            borrowed.properties.insert(name.clone(), Property { value, attrs });
        }
    }
}

/// `[[HasProperty]]`: own or anywhere on the prototype chain.
pub fn has_property(obj: &JsObjectRef, name: &JsString) -> bool {
    let mut current = obj.clone();
    loop {
        let next = {
            let borrowed = current.borrow();
            if borrowed.properties.contains_key(name) {
                return true;
            }
            if special_get(&borrowed, name).is_some() {
                return true;
            }
            borrowed.prototype.clone()
        };
        match next {
            Some(proto) => current = proto,
            None => return false,
        }
    }
}

/// `[[Delete]]`: false only when an own `DontDelete` property blocks it.
pub fn delete(obj: &JsObjectRef, name: &JsString) -> bool {
    let mut borrowed = obj.borrow_mut();
    match &borrowed.data {
        ObjectData::Array { .. } if is_length(name) => return false,
        ObjectData::StringWrapper(_) if is_length(name) => return false,
        _ => {}
    }
    let blocked = matches!(
        borrowed.properties.get(name),
        Some(prop) if prop.attrs.dont_delete()
    );
    if blocked {
        return false;
    }
    borrowed.properties.shift_remove(name);
    true
}

/// Own enumerable property names, in insertion order.
pub fn enumerate(obj: &JsObjectRef) -> Vec<JsString> {
    let borrowed = obj.borrow();
    borrowed
        .properties
        .iter()
        .filter(|(_, p)| !p.attrs.dont_enum())
        .map(|(k, _)| k.clone())
        .collect()
}

/// Property names reachable for `for-in`: own plus prototype chain,
/// deduplicated. A property shadowed at a shallower depth hides the deeper
/// one even when the shallow one is `DontEnum`.
pub fn enumerate_chain(obj: &JsObjectRef) -> Vec<JsString> {
    let mut seen: FxHashSet<JsString> = FxHashSet::default();
    let mut names = Vec::new();
    let mut current = Some(obj.clone());
    while let Some(o) = current {
        let borrowed = o.borrow();
        for (name, prop) in borrowed.properties.iter() {
            if seen.contains(name) {
                continue;
            }
            seen.insert(name.clone());
            if !prop.attrs.dont_enum() {
                names.push(name.clone());
            }
        }
        current = borrowed.prototype.clone();
    }
    names
}

/// Parse a canonical array index: the string form of an integer below
/// 2^32-1.
pub fn array_index(name: &JsString) -> Option<u32> {
    name.with_units(|units| {
        if units.is_empty() || units.len() > 10 {
            return None;
        }
        if units.len() > 1 && units[0] == b'0' as u16 {
            return None;
        }
        let mut v: u64 = 0;
        for &u in units {
            if !(b'0' as u16..=b'9' as u16).contains(&u) {
                return None;
            }
            v = v * 10 + u64::from(u - b'0' as u16);
        }
        if v < u64::from(u32::MAX) {
            Some(v as u32)
        } else {
            None
        }
    })
}
