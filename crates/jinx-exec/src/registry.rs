//! Named registries for filters, tests and macros.
//!
//! All three share the same rules: `register` refuses a name that is already
//! taken, `replace` refuses a name that is not.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::context::Context;
use crate::value::{Callable, Value};
use crate::varargs::VarArgs;
use crate::ExecError;

/// `value | name(args...)`
pub type FilterFn = Box<dyn Fn(&Value, &VarArgs) -> Value + Send + Sync>;

/// `value is name [arg]`. An `Err` message becomes an evaluation error.
pub type TestFn = Box<dyn Fn(&Value, Option<&Value>) -> Result<bool, String> + Send + Sync>;

pub type FilterSet = Registry<FilterFn>;
pub type TestSet = Registry<TestFn>;
pub type MacroSet = Registry<Arc<dyn Callable>>;

pub struct Registry<T> {
    kind: &'static str,
    entries: HashMap<String, T>,
}

impl<T> Registry<T> {
    /// An empty registry; `kind` names the entries in error messages.
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            entries: HashMap::new(),
        }
    }

    pub fn exists(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&T> {
        self.entries.get(name)
    }

    pub fn register(&mut self, name: impl Into<String>, entry: T) -> Result<(), ExecError> {
        let name = name.into();
        if self.exists(&name) {
            return Err(self.error(name, "already exists"));
        }
        self.entries.insert(name, entry);
        Ok(())
    }

    pub fn replace(&mut self, name: impl Into<String>, entry: T) -> Result<(), ExecError> {
        let name = name.into();
        if !self.exists(&name) {
            return Err(self.error(name, "does not exist (therefore cannot be overridden)"));
        }
        self.entries.insert(name, entry);
        Ok(())
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    fn error(&self, name: String, problem: &'static str) -> ExecError {
        ExecError::Registry {
            kind: self.kind,
            name,
            problem,
        }
    }
}

impl<T> fmt::Debug for Registry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("kind", &self.kind)
            .field("names", &self.names())
            .finish()
    }
}

impl FilterSet {
    pub fn filters() -> Self {
        Self::new("Filter")
    }

    pub fn register_fn(
        &mut self,
        name: impl Into<String>,
        filter: impl Fn(&Value, &VarArgs) -> Value + Send + Sync + 'static,
    ) -> Result<(), ExecError> {
        self.register(name, Box::new(filter))
    }
}

impl TestSet {
    pub fn tests() -> Self {
        Self::new("Test")
    }

    pub fn register_fn(
        &mut self,
        name: impl Into<String>,
        test: impl Fn(&Value, Option<&Value>) -> Result<bool, String> + Send + Sync + 'static,
    ) -> Result<(), ExecError> {
        self.register(name, Box::new(test))
    }
}

impl MacroSet {
    pub fn macros() -> Self {
        Self::new("Macro")
    }

    /// Bind every registered macro in the current scope of `ctx`.
    pub fn export(&self, ctx: &mut Context) {
        for (name, callable) in &self.entries {
            ctx.define(name.clone(), Value::Callable(Arc::clone(callable)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_register_twice_fails() {
        let mut filters = FilterSet::filters();
        filters.register_fn("upper", |v, _| Value::from(v.to_string().to_uppercase())).unwrap();

        let err = filters.register_fn("upper", |v, _| v.clone()).unwrap_err();
        assert_eq!(err.to_string(), "Filter with name 'upper' already exists");
    }

    #[test]
    fn test_replace_requires_existing() {
        let mut tests = TestSet::tests();
        let err = tests.replace("odd", Box::new(|_, _| Ok(true))).unwrap_err();
        assert!(err.to_string().contains("does not exist"));

        tests.register_fn("odd", |_, _| Ok(true)).unwrap();
        tests.replace("odd", Box::new(|_, _| Ok(false))).unwrap();
        let odd = tests.get("odd").unwrap();
        assert_eq!(odd(&Value::Integer(1), None), Ok(false));
    }

    #[test]
    fn test_names_are_sorted() {
        let mut tests = TestSet::tests();
        tests.register_fn("odd", |_, _| Ok(true)).unwrap();
        tests.register_fn("even", |_, _| Ok(true)).unwrap();
        assert_eq!(tests.names(), vec!["even", "odd"]);
        assert!(tests.exists("even"));
        assert!(!tests.exists("none"));
    }
}
