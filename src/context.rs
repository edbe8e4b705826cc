//! Scope chains and execution contexts.
//!
//! A scope chain is a linked list of objects searched head to tail by name
//! lookup; the tail is always the global object. `with` prepends its
//! operand, function entry prepends the activation object, and `catch`
//! prepends a one-property shield object. The list is immutable and
//! shared: prepending builds a new head node over the old chain, so
//! function instances can capture the chain where they were created.

use std::rc::Rc;

use crate::object::{self, Attrs, JsObjectRef};
use crate::string::JsString;
use crate::value::Reference;

/// One link of a scope chain.
#[derive(Debug)]
pub struct Scope {
    pub obj: JsObjectRef,
    pub next: Option<ScopeRef>,
}

pub type ScopeRef = Rc<Scope>;

impl Scope {
    /// A chain consisting of just the global object.
    pub fn root(obj: JsObjectRef) -> ScopeRef {
        Rc::new(Scope { obj, next: None })
    }

    /// Prepend `obj` in front of `next`.
    pub fn prepend(obj: JsObjectRef, next: &ScopeRef) -> ScopeRef {
        Rc::new(Scope {
            obj,
            next: Some(next.clone()),
        })
    }
}

/// §10.1.4 identifier resolution: the first object on the chain that has
/// the property becomes the reference base; a miss yields a base-less
/// reference, which reads as ReferenceError and writes to the global.
pub fn lookup(scope: &ScopeRef, name: &JsString) -> Reference {
    let mut current = Some(scope.clone());
    while let Some(link) = current {
        if object::has_property(&link.obj, name) {
            return Reference {
                base: Some(link.obj.clone()),
                property: name.clone(),
            };
        }
        current = link.next.clone();
    }
    Reference {
        base: None,
        property: name.clone(),
    }
}

/// An execution context: where declarations bind, what `this` is, and the
/// scope chain identifiers resolve against.
#[derive(Debug, Clone)]
pub struct Context {
    pub scope: ScopeRef,
    /// Target of `var` and function-declaration bindings.
    pub variable: JsObjectRef,
    pub this_obj: JsObjectRef,
    /// Attributes applied to declaration bindings (`DontDelete` in
    /// function and global code, none in eval code).
    pub var_attr: Attrs,
}

impl Context {
    /// Replace the scope chain, keeping everything else.
    pub fn with_scope(&self, scope: ScopeRef) -> Context {
        Context {
            scope,
            variable: self.variable.clone(),
            this_obj: self.this_obj.clone(),
            var_attr: self.var_attr,
        }
    }
}
