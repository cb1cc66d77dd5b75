//! Chained variable scopes.
//!
//! Scopes live in an arena owned by [`Context`]; each frame points at its
//! parent by index. The innermost frame is the current scope. Lookups walk
//! from the current frame towards the root, and a child frame may hang off
//! any live frame, which is how a macro body sees the scope it was declared
//! in rather than the scope it is called from.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::value::Value;

static NEXT_CONTEXT_ID: AtomicU64 = AtomicU64::new(0);

/// Handle to a frame of a [`Context`].
///
/// A handle stays valid only while its frame is alive, and only in the
/// context that issued it. The serial number tells a popped frame apart
/// from a new one pushed at the same index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScopeId {
    context: u64,
    index: usize,
    serial: u64,
}

#[derive(Debug)]
struct Frame {
    serial: u64,
    parent: Option<usize>,
    vars: HashMap<String, Value>,
}

#[derive(Debug)]
pub struct Context {
    id: u64,
    frames: Vec<Frame>,
    next_serial: u64,
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl Context {
    /// A context holding a single empty root scope.
    pub fn new() -> Self {
        Self::from_map(HashMap::new())
    }

    /// A context whose root scope holds `vars`.
    pub fn from_map(vars: HashMap<String, Value>) -> Self {
        Self {
            id: NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed),
            frames: vec![Frame {
                serial: 0,
                parent: None,
                vars,
            }],
            next_serial: 1,
        }
    }

    /// Handle to the current (innermost) scope.
    pub fn current(&self) -> ScopeId {
        let index = self.frames.len() - 1;
        ScopeId {
            context: self.id,
            index,
            serial: self.frames[index].serial,
        }
    }

    /// Number of live scopes, root included.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn is_live(&self, scope: ScopeId) -> bool {
        scope.context == self.id
            && self
                .frames
                .get(scope.index)
            .is_some_and(|frame| frame.serial == scope.serial)
    }

    /// Index of the nearest frame, starting at the current one, that binds `name`.
    fn lookup(&self, name: &str) -> Option<usize> {
        let mut index = Some(self.frames.len() - 1);
        while let Some(i) = index {
            let frame = &self.frames[i];
            if frame.vars.contains_key(name) {
                return Some(i);
            }
            index = frame.parent;
        }
        None
    }

    /// True if `name` is visible from the current scope.
    pub fn has(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    /// Nearest binding of `name`, searching outwards from the current scope.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.lookup(name)
            .and_then(|i| self.frames[i].vars.get(name))
    }

    /// Replace an existing binding in whichever scope holds it. Returns
    /// `false`, and binds nothing, if `name` is not visible.
    pub fn overwrite(&mut self, name: &str, value: Value) -> bool {
        match self.lookup(name) {
            Some(i) => {
                self.frames[i].vars.insert(name.to_string(), value);
                true
            }
            None => false,
        }
    }

    /// Assign `name`: overwrite the visible binding if there is one,
    /// otherwise bind it in the current scope.
    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        let name = name.into();
        let index = self
            .lookup(&name)
            .unwrap_or(self.frames.len() - 1);
        self.frames[index].vars.insert(name, value);
    }

    /// Bind `name` in the current scope, shadowing any outer binding.
    pub fn define(&mut self, name: impl Into<String>, value: Value) {
        let index = self.frames.len() - 1;
        self.frames[index].vars.insert(name.into(), value);
    }

    /// Bind every entry in the current scope. Outer scopes are untouched.
    pub fn update<I, K>(&mut self, vars: I)
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        for (name, value) in vars {
            self.define(name, value);
        }
    }

    /// Copy the current-scope bindings of `other` into the current scope.
    pub fn merge(&mut self, other: &Context) {
        let vars = other.locals().map(|(k, v)| (k.clone(), v.clone()));
        self.update(vars);
    }

    /// Bindings of the current scope only.
    pub fn locals(&self) -> impl Iterator<Item = (&String, &Value)> {
        let index = self.frames.len() - 1;
        self.frames[index].vars.iter()
    }

    /// Open a child of the current scope and make it current.
    pub fn inherit(&mut self) -> ScopeId {
        let parent = self.current();
        self.push(parent.index)
    }

    /// Open a child of `parent` and make it current. Returns `None` if
    /// `parent` is no longer alive or was issued by another context.
    pub fn inherit_from(&mut self, parent: ScopeId) -> Option<ScopeId> {
        if !self.is_live(parent) {
            return None;
        }
        Some(self.push(parent.index))
    }

    fn push(&mut self, parent: usize) -> ScopeId {
        let serial = self.next_serial;
        self.next_serial += 1;
        self.frames.push(Frame {
            serial,
            parent: Some(parent),
            vars: HashMap::new(),
        });
        self.current()
    }

    /// Discard the current scope. The root scope is never discarded;
    /// returns whether a scope was removed.
    pub fn pop(&mut self) -> bool {
        if self.frames.len() > 1 {
            self.frames.pop();
            true
        } else {
            false
        }
    }
}

impl FromIterator<(String, Value)> for Context {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self::from_map(iter.into_iter().collect())
    }
}
